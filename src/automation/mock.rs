//! Mock automation backend for testing
//!
//! This module provides a `MockAutomation` implementation of the
//! [`TerminalAutomation`] trait for testing and headless development. The mock
//! keeps an in-memory clipboard, a list of fake top-level windows and a
//! synthetic screen, and records every paste so tests can assert what would
//! have been typed into the terminal.
//!
//! # Features
//!
//! - **In-memory clipboard:** `set_clipboard` then `get_clipboard` round-trips
//!   exactly; the clipboard can also be put in a "non-text" state
//! - **Window matching:** focus uses the same title matching as the native
//!   backend
//! - **Synthetic screen:** captures are cropped out of a coordinate-encoding
//!   test pattern
//! - **Launch simulation:** optionally make the terminal window appear when
//!   `launch_terminal` is called
//! - **Configurable Delay / Error Injection:** per operation
//!
//! # Examples
//!
//! ```
//! use pwsh_mcp::automation::{MockAutomation, TerminalAutomation};
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = MockAutomation::new();
//!
//!     backend.set_clipboard("Get-Date").await.unwrap();
//!     backend.focus_terminal_window().await.unwrap();
//!     backend.paste_and_submit().await.unwrap();
//!
//!     assert_eq!(backend.submitted(), vec!["Get-Date".to_string()]);
//! }
//! ```

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::sleep;

use super::{ImageBuffer, TerminalAutomation, matching::find_terminal_window};
use crate::{
    config::DEFAULT_WINDOW_TITLES,
    error::{AutomationError, AutomationResult},
    model::{CaptureRegion, WindowBounds, WindowInfo},
};

/// Title of the window the mock starts with
pub const MOCK_TERMINAL_TITLE: &str = "Windows PowerShell";

/// Outer rectangle of the mock terminal window
pub const MOCK_TERMINAL_BOUNDS: WindowBounds = WindowBounds {
    left: 100,
    top: 100,
    width: 1024,
    height: 768,
};

/// Size of the mock virtual screen
pub const MOCK_SCREEN_SIZE: (u32, u32) = (1920, 1080);

/// Adapter operation, used to target delays and injected errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    /// `focus_terminal_window`
    Focus,
    /// `set_clipboard`
    SetClipboard,
    /// `get_clipboard`
    GetClipboard,
    /// `paste_and_submit`
    PasteAndSubmit,
    /// `capture_region`
    Capture,
    /// `launch_terminal`
    Launch,
}

#[derive(Debug)]
struct MockState {
    /// `None` models non-text clipboard content
    clipboard: Option<String>,
    windows: Vec<(WindowInfo, WindowBounds)>,
    submitted: Vec<String>,
    focus_calls: usize,
    launch_calls: usize,
}

/// Mock automation backend for testing and development
///
/// Thread-safe: state sits behind a `parking_lot::Mutex`, so the mock can be
/// shared via `Arc` like the native backend.
#[derive(Debug)]
pub struct MockAutomation {
    state: Mutex<MockState>,
    patterns: Vec<String>,
    screen: ImageBuffer,
    window_appears_on_launch: bool,
    delay: Option<Duration>,
    errors: HashMap<MockOperation, AutomationError>,
}

impl MockAutomation {
    /// Creates a mock with one "Windows PowerShell" window and an empty
    /// text clipboard
    pub fn new() -> Self {
        let window = WindowInfo {
            id: "mock-0x1".to_string(),
            title: MOCK_TERMINAL_TITLE.to_string(),
        };

        Self {
            state: Mutex::new(MockState {
                clipboard: Some(String::new()),
                windows: vec![(window, MOCK_TERMINAL_BOUNDS)],
                submitted: Vec::new(),
                focus_calls: 0,
                launch_calls: 0,
            }),
            patterns: DEFAULT_WINDOW_TITLES.iter().map(|t| t.to_string()).collect(),
            screen: ImageBuffer::from_test_pattern(MOCK_SCREEN_SIZE.0, MOCK_SCREEN_SIZE.1),
            window_appears_on_launch: false,
            delay: None,
            errors: HashMap::new(),
        }
    }

    /// Removes all windows, so focus fails until a terminal is launched
    pub fn without_window(self) -> Self {
        self.state.lock().windows.clear();
        self
    }

    /// Adds a window with the given title and rectangle
    pub fn with_window(self, title: &str, bounds: WindowBounds) -> Self {
        {
            let mut state = self.state.lock();
            let id = format!("mock-0x{:x}", state.windows.len() + 1);
            state.windows.push((
                WindowInfo {
                    id,
                    title: title.to_string(),
                },
                bounds,
            ));
        }
        self
    }

    /// Overrides the title patterns used by focus
    pub fn with_patterns(mut self, patterns: Vec<String>) -> Self {
        self.patterns = patterns;
        self
    }

    /// Sets the initial clipboard text
    pub fn with_clipboard(self, text: &str) -> Self {
        self.state.lock().clipboard = Some(text.to_string());
        self
    }

    /// Puts non-text data on the clipboard, so reads fail
    pub fn with_non_text_clipboard(self) -> Self {
        self.state.lock().clipboard = None;
        self
    }

    /// Makes `launch_terminal` create the default terminal window
    pub fn with_window_on_launch(mut self) -> Self {
        self.window_appears_on_launch = true;
        self
    }

    /// Sets a delay applied to every async operation
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Injects an error returned by every call of `operation`
    pub fn with_error(mut self, operation: MockOperation, error: AutomationError) -> Self {
        self.errors.insert(operation, error);
        self
    }

    /// Clipboard contents at each `paste_and_submit`, in order
    pub fn submitted(&self) -> Vec<String> {
        self.state.lock().submitted.clone()
    }

    /// Number of `focus_terminal_window` calls so far
    pub fn focus_calls(&self) -> usize {
        self.state.lock().focus_calls
    }

    /// Number of `launch_terminal` calls so far
    pub fn launch_calls(&self) -> usize {
        self.state.lock().launch_calls
    }

    /// Applies configured delay and injected error for `operation`
    async fn enter(&self, operation: MockOperation) -> AutomationResult<()> {
        if let Some(duration) = self.delay {
            sleep(duration).await;
        }
        match self.errors.get(&operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl Default for MockAutomation {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TerminalAutomation for MockAutomation {
    async fn focus_terminal_window(&self) -> AutomationResult<WindowBounds> {
        self.state.lock().focus_calls += 1;
        self.enter(MockOperation::Focus).await?;

        let state = self.state.lock();
        let infos: Vec<WindowInfo> = state.windows.iter().map(|(w, _)| w.clone()).collect();
        let found = find_terminal_window(&self.patterns, &infos).ok_or_else(|| {
            AutomationError::WindowNotFound {
                patterns: self.patterns.clone(),
            }
        })?;

        state
            .windows
            .iter()
            .find(|(w, _)| w.id == found.id)
            .map(|(_, bounds)| *bounds)
            .ok_or_else(|| AutomationError::WindowNotFound {
                patterns: self.patterns.clone(),
            })
    }

    async fn set_clipboard(&self, text: &str) -> AutomationResult<()> {
        self.enter(MockOperation::SetClipboard).await?;
        self.state.lock().clipboard = Some(text.to_string());
        Ok(())
    }

    async fn get_clipboard(&self) -> AutomationResult<String> {
        self.enter(MockOperation::GetClipboard).await?;
        self.state
            .lock()
            .clipboard
            .clone()
            .ok_or_else(|| AutomationError::clipboard("Clipboard does not contain text"))
    }

    async fn paste_and_submit(&self) -> AutomationResult<()> {
        self.enter(MockOperation::PasteAndSubmit).await?;
        let mut state = self.state.lock();
        let pasted = state.clipboard.clone().unwrap_or_default();
        state.submitted.push(pasted);
        Ok(())
    }

    async fn capture_region(&self, bounds: WindowBounds) -> AutomationResult<ImageBuffer> {
        self.enter(MockOperation::Capture).await?;

        let (width, height) = self.screen.dimensions();
        let screen = WindowBounds::new(0, 0, width, height);
        if bounds.is_empty() || !screen.contains(&bounds) {
            return Err(AutomationError::capture(format!(
                "Region {} is outside the screen ({}x{})",
                bounds, width, height
            )));
        }

        self.screen.crop(&CaptureRegion {
            x: bounds.left as u32,
            y: bounds.top as u32,
            width: bounds.width,
            height: bounds.height,
        })
    }

    async fn launch_terminal(&self) -> AutomationResult<()> {
        self.state.lock().launch_calls += 1;
        self.enter(MockOperation::Launch).await?;

        if self.window_appears_on_launch {
            let mut state = self.state.lock();
            if state.windows.is_empty() {
                state.windows.push((
                    WindowInfo {
                        id: "mock-launched".to_string(),
                        title: MOCK_TERMINAL_TITLE.to_string(),
                    },
                    MOCK_TERMINAL_BOUNDS,
                ));
            }
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}
