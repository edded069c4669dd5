//! Windows automation backend
//!
//! Drives a real terminal window through the Win32 API:
//!
//! - **Window discovery**: `EnumWindows` + `GetWindowTextW`, matched against
//!   the configured title patterns
//! - **Focus**: `ShowWindow(SW_RESTORE)` for minimized windows, then
//!   `BringWindowToTop` and `SetForegroundWindow`
//! - **Clipboard**: `arboard`
//! - **Keystrokes**: `SendInput` (Ctrl+V, Enter)
//! - **Capture**: GDI `BitBlt` from the screen DC into a 32-bit DIB
//! - **Launch**: Windows Terminal, falling back to bare PowerShell, in a
//!   new console with no inherited stdio
//!
//! Every Win32 call runs on the blocking pool via `spawn_blocking` and is
//! bounded by the configured operation timeout.

use std::{
    ffi::{OsString, c_void},
    os::windows::{ffi::OsStringExt, process::CommandExt},
    process::{Command, Stdio},
    time::Duration,
};

use async_trait::async_trait;
use windows_sys::{
    Win32::{
        Foundation::{HWND, LPARAM, RECT},
        Graphics::Gdi::{
            BI_RGB, BITMAPINFO, BITMAPINFOHEADER, BitBlt, CreateCompatibleBitmap,
            CreateCompatibleDC, DIB_RGB_COLORS, DeleteDC, DeleteObject, GetDC, GetDIBits,
            ReleaseDC, SRCCOPY, SelectObject,
        },
        System::Threading::CREATE_NEW_CONSOLE,
        UI::{
            Input::KeyboardAndMouse::{
                INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYEVENTF_KEYUP, SendInput,
                VK_CONTROL, VK_RETURN,
            },
            WindowsAndMessaging::{
                BringWindowToTop, EnumWindows, GetSystemMetrics, GetWindowRect,
                GetWindowTextLengthW, GetWindowTextW, IsIconic, IsWindowVisible, SM_CXVIRTUALSCREEN,
                SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN, SM_YVIRTUALSCREEN, SW_RESTORE,
                SetForegroundWindow, ShowWindow,
            },
        },
    },
    core::BOOL,
};

use super::{ImageBuffer, TerminalAutomation, matching::find_terminal_window};
use crate::{
    error::{AutomationError, AutomationResult},
    model::{WindowBounds, WindowInfo},
};

/// Virtual-key code of the V key
const VK_V: u16 = 0x56;

/// Pause after restoring a minimized window so it can repaint
const RESTORE_SETTLE: Duration = Duration::from_millis(500);

/// How long a launched process must survive before it counts as started
const EARLY_EXIT_GRACE: Duration = Duration::from_millis(300);

/// Commands tried, in order, by `launch_terminal`
const LAUNCH_COMMANDS: &[(&str, &[&str])] = &[
    ("wt.exe", &["-p", "PowerShell"]),
    ("wt.exe", &["pwsh.exe"]),
    ("wt.exe", &[]),
    ("pwsh.exe", &[]),
    ("powershell.exe", &[]),
];

/// Native Windows automation backend
///
/// Stateless apart from configuration: windows are re-enumerated and the
/// clipboard reopened on every call.
#[derive(Debug, Clone)]
pub struct WindowsAutomation {
    patterns: Vec<String>,
    operation_timeout: Duration,
}

impl WindowsAutomation {
    /// Creates a backend matching terminal windows by `patterns`
    pub fn new(patterns: Vec<String>, operation_timeout: Duration) -> Self {
        Self {
            patterns,
            operation_timeout,
        }
    }

    /// Runs a blocking Win32 closure on the blocking pool with a time bound
    async fn run_blocking<F, T>(&self, operation: &'static str, f: F) -> AutomationResult<T>
    where
        F: FnOnce() -> AutomationResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let bound = self.operation_timeout;
        let joined = tokio::time::timeout(bound, tokio::task::spawn_blocking(f))
            .await
            .map_err(|_| {
                tracing::warn!("{} timed out after {}ms", operation, bound.as_millis());
                AutomationError::OperationTimeout {
                    operation: operation.to_string(),
                    duration_ms: bound.as_millis() as u64,
                }
            })?;

        joined.map_err(|e| {
            tracing::error!("{} task panicked: {}", operation, e);
            AutomationError::internal(operation, e.to_string())
        })?
    }

    /// Enumerates visible top-level windows that have a title
    ///
    /// Handles are returned as `usize` so they can cross thread boundaries.
    fn enumerate_windows() -> Vec<(usize, WindowInfo)> {
        let mut handles: Vec<usize> = Vec::new();

        unsafe extern "system" fn enum_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
            let handles = unsafe { &mut *(lparam as *mut Vec<usize>) };
            if unsafe { IsWindowVisible(hwnd) } != 0 && unsafe { GetWindowTextLengthW(hwnd) } > 0 {
                handles.push(hwnd as usize);
            }
            1
        }

        unsafe {
            EnumWindows(Some(enum_callback), &mut handles as *mut Vec<usize> as LPARAM);
        }

        tracing::debug!("Enumerated {} window handles", handles.len());
        handles
            .into_iter()
            .filter_map(|handle| {
                let title = window_title(handle as HWND);
                if title.is_empty() {
                    return None;
                }
                Some((
                    handle,
                    WindowInfo {
                        id: format!("{handle:#x}"),
                        title,
                    },
                ))
            })
            .collect()
    }

    fn focus_sync(patterns: Vec<String>) -> AutomationResult<WindowBounds> {
        let windows = Self::enumerate_windows();
        let infos: Vec<WindowInfo> = windows.iter().map(|(_, info)| info.clone()).collect();
        let found = find_terminal_window(&patterns, &infos)
            .ok_or_else(|| AutomationError::WindowNotFound {
                patterns: patterns.clone(),
            })?;
        let handle = windows
            .iter()
            .find(|(_, info)| info.id == found.id)
            .map(|(handle, _)| *handle)
            .ok_or_else(|| AutomationError::WindowNotFound {
                patterns: patterns.clone(),
            })?;

        tracing::info!("Focusing window: {}", found.title);
        let hwnd = handle as HWND;

        unsafe {
            if IsIconic(hwnd) != 0 {
                ShowWindow(hwnd, SW_RESTORE);
                std::thread::sleep(RESTORE_SETTLE);
            }
            BringWindowToTop(hwnd);
            if SetForegroundWindow(hwnd) == 0 {
                // The foreground lock can refuse focus; keystrokes may still
                // land if the window is already active.
                tracing::warn!("SetForegroundWindow refused for '{}'", found.title);
            }
        }

        let mut rect = RECT {
            left: 0,
            top: 0,
            right: 0,
            bottom: 0,
        };
        if unsafe { GetWindowRect(hwnd, &mut rect) } == 0 {
            return Err(AutomationError::capture(format!(
                "GetWindowRect failed for '{}'",
                found.title
            )));
        }

        let bounds = WindowBounds::new(
            rect.left,
            rect.top,
            (rect.right - rect.left).max(0) as u32,
            (rect.bottom - rect.top).max(0) as u32,
        );
        tracing::debug!("Terminal window bounds: {}", bounds);
        Ok(bounds)
    }

    fn send_paste_and_enter() -> AutomationResult<()> {
        let inputs = [
            key_input(VK_CONTROL, false),
            key_input(VK_V, false),
            key_input(VK_V, true),
            key_input(VK_CONTROL, true),
            key_input(VK_RETURN, false),
            key_input(VK_RETURN, true),
        ];

        let sent = unsafe {
            SendInput(
                inputs.len() as u32,
                inputs.as_ptr(),
                std::mem::size_of::<INPUT>() as i32,
            )
        };

        if sent as usize != inputs.len() {
            return Err(AutomationError::input(format!(
                "SendInput accepted {} of {} events",
                sent,
                inputs.len()
            )));
        }
        Ok(())
    }

    fn capture_sync(bounds: WindowBounds) -> AutomationResult<ImageBuffer> {
        let screen = virtual_screen();
        if bounds.is_empty() || !screen.contains(&bounds) {
            return Err(AutomationError::capture(format!(
                "Region {} is outside the virtual screen {}",
                bounds, screen
            )));
        }

        let (width, height) = (bounds.width as i32, bounds.height as i32);

        unsafe {
            let screen_dc = GetDC(std::ptr::null_mut());
            if screen_dc.is_null() {
                return Err(AutomationError::capture("GetDC(NULL) failed"));
            }

            let result = (|| {
                let mem_dc = CreateCompatibleDC(screen_dc);
                if mem_dc.is_null() {
                    return Err(AutomationError::capture("CreateCompatibleDC failed"));
                }
                let bitmap = CreateCompatibleBitmap(screen_dc, width, height);
                if bitmap.is_null() {
                    DeleteDC(mem_dc);
                    return Err(AutomationError::capture("CreateCompatibleBitmap failed"));
                }
                let previous = SelectObject(mem_dc, bitmap);

                let copied = BitBlt(
                    mem_dc, 0, 0, width, height, screen_dc, bounds.left, bounds.top, SRCCOPY,
                );

                let mut pixels = vec![0u8; bounds.width as usize * bounds.height as usize * 4];
                let mut info: BITMAPINFO = std::mem::zeroed();
                info.bmiHeader = BITMAPINFOHEADER {
                    biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: width,
                    // Negative height = top-down rows
                    biHeight: -height,
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB,
                    biSizeImage: 0,
                    biXPelsPerMeter: 0,
                    biYPelsPerMeter: 0,
                    biClrUsed: 0,
                    biClrImportant: 0,
                };

                let lines = if copied != 0 {
                    GetDIBits(
                        mem_dc,
                        bitmap,
                        0,
                        bounds.height,
                        pixels.as_mut_ptr() as *mut c_void,
                        &mut info,
                        DIB_RGB_COLORS,
                    )
                } else {
                    0
                };

                SelectObject(mem_dc, previous);
                DeleteObject(bitmap);
                DeleteDC(mem_dc);

                if copied == 0 {
                    return Err(AutomationError::capture("BitBlt failed"));
                }
                if lines != height {
                    return Err(AutomationError::capture(format!(
                        "GetDIBits returned {} of {} rows",
                        lines, height
                    )));
                }

                ImageBuffer::from_bgra(bounds.width, bounds.height, pixels)
            })();

            ReleaseDC(std::ptr::null_mut(), screen_dc);
            result
        }
    }

    /// Starts the first launch command that spawns and does not fail
    /// straight away
    ///
    /// Children get their own console and no handles to the server's stdio,
    /// which carries the JSON-RPC stream.
    fn launch_sync(commands: &[(&str, &[&str])]) -> AutomationResult<()> {
        let mut attempts = Vec::new();

        for (program, args) in commands {
            let command_line = std::iter::once(*program)
                .chain(args.iter().copied())
                .collect::<Vec<_>>()
                .join(" ");

            let mut child = match console_command(program, args).spawn() {
                Ok(child) => child,
                Err(e) => {
                    tracing::debug!("Launch attempt '{}' failed: {}", command_line, e);
                    attempts.push(command_line);
                    continue;
                }
            };

            std::thread::sleep(EARLY_EXIT_GRACE);
            match child.try_wait() {
                // wt.exe hands off to a running instance and exits 0
                Ok(Some(status)) if !status.success() => {
                    tracing::warn!("'{}' exited immediately with {}", command_line, status);
                    attempts.push(command_line);
                }
                Ok(_) => {
                    tracing::info!("Launched terminal: {} (pid {})", command_line, child.id());
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Could not poll '{}': {}", command_line, e);
                    return Ok(());
                }
            }
        }

        Err(AutomationError::LaunchFailed { attempts })
    }
}

/// Builds a command that opens in a new console, detached from our stdio
fn console_command(program: &str, args: &[&str]) -> Command {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .creation_flags(CREATE_NEW_CONSOLE);
    command
}

fn window_title(hwnd: HWND) -> String {
    unsafe {
        let len = GetWindowTextLengthW(hwnd);
        if len <= 0 {
            return String::new();
        }

        let mut buffer: Vec<u16> = vec![0; (len + 1) as usize];
        let copied = GetWindowTextW(hwnd, buffer.as_mut_ptr(), buffer.len() as i32);
        if copied <= 0 {
            return String::new();
        }

        buffer.truncate(copied as usize);
        OsString::from_wide(&buffer).to_string_lossy().into_owned()
    }
}

/// Bounding rectangle of all monitors
fn virtual_screen() -> WindowBounds {
    unsafe {
        WindowBounds::new(
            GetSystemMetrics(SM_XVIRTUALSCREEN),
            GetSystemMetrics(SM_YVIRTUALSCREEN),
            GetSystemMetrics(SM_CXVIRTUALSCREEN).max(0) as u32,
            GetSystemMetrics(SM_CYVIRTUALSCREEN).max(0) as u32,
        )
    }
}

fn key_input(vk: u16, key_up: bool) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: vk,
                wScan: 0,
                dwFlags: if key_up { KEYEVENTF_KEYUP } else { 0 },
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn clipboard_error(e: arboard::Error) -> AutomationError {
    match e {
        arboard::Error::ContentNotAvailable => {
            AutomationError::clipboard("Clipboard does not contain text")
        }
        other => AutomationError::clipboard(other.to_string()),
    }
}

#[async_trait]
impl TerminalAutomation for WindowsAutomation {
    async fn focus_terminal_window(&self) -> AutomationResult<WindowBounds> {
        let patterns = self.patterns.clone();
        self.run_blocking("focus_terminal_window", move || Self::focus_sync(patterns))
            .await
    }

    async fn set_clipboard(&self, text: &str) -> AutomationResult<()> {
        let text = text.to_string();
        self.run_blocking("set_clipboard", move || {
            let mut clipboard = arboard::Clipboard::new().map_err(clipboard_error)?;
            clipboard.set_text(text).map_err(clipboard_error)
        })
        .await
    }

    async fn get_clipboard(&self) -> AutomationResult<String> {
        self.run_blocking("get_clipboard", || {
            let mut clipboard = arboard::Clipboard::new().map_err(clipboard_error)?;
            clipboard.get_text().map_err(clipboard_error)
        })
        .await
    }

    async fn paste_and_submit(&self) -> AutomationResult<()> {
        self.run_blocking("paste_and_submit", Self::send_paste_and_enter)
            .await
    }

    async fn capture_region(&self, bounds: WindowBounds) -> AutomationResult<ImageBuffer> {
        self.run_blocking("capture_region", move || Self::capture_sync(bounds))
            .await
    }

    async fn launch_terminal(&self) -> AutomationResult<()> {
        self.run_blocking("launch_terminal", || Self::launch_sync(LAUNCH_COMMANDS))
            .await
    }

    fn backend_name(&self) -> &'static str {
        "windows"
    }
}
