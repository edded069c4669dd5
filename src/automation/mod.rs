//! Terminal automation adapter
//!
//! This module defines the [`TerminalAutomation`] trait, the boundary between
//! the tool handlers and the operating system. Handlers only ever talk to an
//! `Arc<dyn TerminalAutomation>`, so tests can substitute [`MockAutomation`]
//! for the native backend.
//!
//! # Backends
//!
//! - [`MockAutomation`]: in-memory clipboard, window and screen; always
//!   available
//! - `WindowsAutomation`: Win32 window focus, `SendInput` keystrokes, GDI
//!   screen capture and the system clipboard (Windows + `windows-backend`
//!   feature)

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    config::{BackendKind, ServerConfig},
    error::AutomationResult,
    model::WindowBounds,
};

pub mod image_buffer;
pub mod matching;
pub mod mock;

#[cfg(all(target_os = "windows", feature = "windows-backend"))]
pub mod windows_backend;

pub use image_buffer::ImageBuffer;
pub use mock::MockAutomation;
#[cfg(all(target_os = "windows", feature = "windows-backend"))]
pub use windows_backend::WindowsAutomation;

/// OS-level primitives needed to drive a terminal window
///
/// Implementations must be `Send + Sync` so they can be shared via `Arc`.
/// None of the methods cache window or clipboard state; every call observes
/// the live desktop.
#[async_trait]
pub trait TerminalAutomation: Send + Sync {
    /// Locates the terminal window, restores and raises it
    ///
    /// Returns the window's outer rectangle in screen coordinates, or
    /// [`crate::error::AutomationError::WindowNotFound`] if no title matches.
    async fn focus_terminal_window(&self) -> AutomationResult<WindowBounds>;

    /// Replaces the clipboard contents with `text`
    async fn set_clipboard(&self, text: &str) -> AutomationResult<()>;

    /// Reads the clipboard as text
    async fn get_clipboard(&self) -> AutomationResult<String>;

    /// Simulates a paste keystroke followed by Enter in the focused window
    async fn paste_and_submit(&self) -> AutomationResult<()>;

    /// Captures a rectangle of the screen
    ///
    /// Fails with [`crate::error::AutomationError::Capture`] if the rectangle is empty or
    /// not fully on screen. Never returns a partial image.
    async fn capture_region(&self, bounds: WindowBounds) -> AutomationResult<ImageBuffer>;

    /// Starts a new terminal process
    async fn launch_terminal(&self) -> AutomationResult<()>;

    /// Short backend name for logs and server info
    fn backend_name(&self) -> &'static str;
}

/// Creates the automation backend selected by `config`
///
/// The native backend is only compiled on Windows with the
/// `windows-backend` feature; elsewhere selecting it fails with
/// [`crate::error::AutomationError::BackendNotAvailable`].
pub fn create_backend(config: &ServerConfig) -> AutomationResult<Arc<dyn TerminalAutomation>> {
    match config.backend {
        BackendKind::Mock => Ok(Arc::new(
            MockAutomation::new().with_patterns(config.window_titles.clone()),
        )),
        BackendKind::Native => native_backend(config),
    }
}

#[cfg(all(target_os = "windows", feature = "windows-backend"))]
fn native_backend(config: &ServerConfig) -> AutomationResult<Arc<dyn TerminalAutomation>> {
    Ok(Arc::new(WindowsAutomation::new(
        config.window_titles.clone(),
        config.operation_timeout,
    )))
}

#[cfg(not(all(target_os = "windows", feature = "windows-backend")))]
fn native_backend(_config: &ServerConfig) -> AutomationResult<Arc<dyn TerminalAutomation>> {
    Err(crate::error::AutomationError::BackendNotAvailable {
        backend: "windows".to_string(),
    })
}
