//! Data models and type definitions for pwsh-mcp
//!
//! This module defines the core types used throughout the application:
//! - Screen geometry (window rectangles and capture regions)
//! - Tool argument structures with JSON Schema support
//! - Tool result payloads

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{AutomationError, AutomationResult};

/// A rectangle in virtual-screen coordinates
///
/// `left`/`top` may be negative on multi-monitor setups where a monitor sits
/// left of or above the primary one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WindowBounds {
    /// X coordinate of the left edge
    pub left: i32,
    /// Y coordinate of the top edge
    pub top: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl WindowBounds {
    /// Creates a new rectangle
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// X coordinate one past the right edge
    pub fn right(&self) -> i64 {
        self.left as i64 + self.width as i64
    }

    /// Y coordinate one past the bottom edge
    pub fn bottom(&self) -> i64 {
        self.top as i64 + self.height as i64
    }

    /// Whether the rectangle covers no pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether `other` lies entirely inside this rectangle
    pub fn contains(&self, other: &WindowBounds) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Returns the area below the title bar
    ///
    /// Fails when the window is not taller than the title bar, since the
    /// remaining client area would be empty.
    pub fn below_titlebar(&self, titlebar_height: u32) -> AutomationResult<WindowBounds> {
        if self.height <= titlebar_height {
            return Err(AutomationError::capture(format!(
                "Window height {} leaves no client area below a {}px title bar",
                self.height, titlebar_height
            )));
        }

        Ok(WindowBounds::new(
            self.left,
            self.top + titlebar_height as i32,
            self.width,
            self.height - titlebar_height,
        ))
    }

    /// Translates a region relative to this rectangle into screen coordinates
    ///
    /// The region must be non-empty and lie fully inside the rectangle;
    /// partial overlaps are rejected rather than clipped.
    pub fn sub_region(&self, region: &CaptureRegion) -> AutomationResult<WindowBounds> {
        if region.width == 0 || region.height == 0 {
            return Err(AutomationError::capture(
                "Region width and height must be greater than 0",
            ));
        }

        let right = region.x as u64 + region.width as u64;
        let bottom = region.y as u64 + region.height as u64;
        if right > self.width as u64 || bottom > self.height as u64 {
            return Err(AutomationError::capture(format!(
                "Region ({}x{} at {},{}) extends beyond the terminal area ({}x{})",
                region.width, region.height, region.x, region.y, self.width, self.height
            )));
        }

        Ok(WindowBounds::new(
            self.left + region.x as i32,
            self.top + region.y as i32,
            region.width,
            region.height,
        ))
    }
}

impl std::fmt::Display for WindowBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} at ({}, {})", self.width, self.height, self.left, self.top)
    }
}

/// A top-level window as seen by the adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    /// Platform-specific window identifier
    pub id: String,
    /// Window title
    pub title: String,
}

/// Region of the terminal to capture
///
/// All coordinates are in pixels relative to the top-left corner of the
/// terminal's client area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct CaptureRegion {
    /// X offset from left edge (pixels)
    pub x: u32,
    /// Y offset from top edge (pixels)
    pub y: u32,
    /// Width of region to capture (pixels)
    pub width: u32,
    /// Height of region to capture (pixels)
    pub height: u32,
}

/// Parameters for the execute_pwsh_script tool
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ExecuteScriptParams {
    /// PowerShell script to execute (single-line or multi-line)
    #[schemars(length(min = 1))]
    pub script: String,

    /// Timeout in seconds, greater than 0 (default: 30, maximum: 300)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(max = 300))]
    pub timeout: Option<f64>,
}

/// Parameters for the get_clipboard tool
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct GetClipboardParams {}

/// Parameters for the capture_pwsh_response tool
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct CaptureResponseParams {
    /// Sub-region of the terminal client area to capture. If omitted,
    /// captures the whole client area.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<CaptureRegion>,

    /// Exclude window title bar from capture (default: true)
    #[serde(default = "default_exclude_titlebar")]
    pub exclude_titlebar: bool,

    /// Optional path to also save the PNG to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_path: Option<String>,
}

impl Default for CaptureResponseParams {
    fn default() -> Self {
        Self {
            region: None,
            exclude_titlebar: default_exclude_titlebar(),
            save_path: None,
        }
    }
}

fn default_exclude_titlebar() -> bool {
    true
}

/// Shape of a submitted script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptKind {
    /// One non-blank line
    #[serde(rename = "single command")]
    SingleCommand,
    /// More than one non-blank line
    #[serde(rename = "multi-line script")]
    MultiLine,
}

impl ScriptKind {
    /// Human-readable label used in status messages
    pub fn label(&self) -> &'static str {
        match self {
            ScriptKind::SingleCommand => "single command",
            ScriptKind::MultiLine => "multi-line script",
        }
    }
}

/// Line structure of a script, computed before pasting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptShape {
    /// Number of non-blank lines
    pub lines: usize,
    /// Single command or multi-line script
    pub kind: ScriptKind,
}

impl ScriptShape {
    /// Counts the non-blank lines of `script`
    pub fn of(script: &str) -> Self {
        let lines = script.lines().filter(|line| !line.trim().is_empty()).count();
        let kind = if lines > 1 {
            ScriptKind::MultiLine
        } else {
            ScriptKind::SingleCommand
        };
        Self { lines, kind }
    }
}

/// Result of the execute_pwsh_script tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteScriptResponse {
    /// Always true; failures are reported as errors
    pub success: bool,
    /// Number of non-blank lines pasted
    pub lines_count: usize,
    /// Whether more than one line was pasted
    pub is_multiline: bool,
    /// Script shape
    pub script_type: ScriptKind,
    /// Timeout in seconds that bounded the wait
    pub timeout_used: f64,
    /// How long the handler waited after submitting
    pub waited_ms: u64,
    /// Human-readable status
    pub message: String,
}

/// Result of the capture_pwsh_response tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureResponse {
    /// Always true; failures are reported as errors
    pub success: bool,
    /// MIME type of `image`
    pub mime_type: String,
    /// Base64-encoded image bytes
    pub image: String,
    /// Width of the captured image in pixels
    pub width: u32,
    /// Height of the captured image in pixels
    pub height: u32,
    /// Whether the title bar was trimmed
    pub exclude_titlebar: bool,
    /// Absolute path of the saved PNG, if one was written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<String>,
    /// Size of the saved PNG, if one was written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,
}
