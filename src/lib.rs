//! pwsh-mcp: PowerShell terminal automation over JSON-RPC
//!
//! This library provides a line-delimited JSON-RPC server that drives a
//! PowerShell terminal window on the local desktop: pasting scripts into it,
//! reading the clipboard and capturing screenshots of its output.

pub mod automation;
pub mod config;
pub mod error;
pub mod model;
pub mod rpc;
pub mod tools;
pub mod util;
