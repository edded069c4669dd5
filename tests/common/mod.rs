//! Shared test utilities for integration tests

pub mod rpc_harness;
