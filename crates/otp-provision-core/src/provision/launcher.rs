//! External screen-capture tool launch.
//!
//! Launching is fire-and-forget: the only answer is whether the request
//! went out. Whatever the user captures comes back through the clipboard
//! and the host focus signals, never through this call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::Mutex;

/// Protocol URI of the Windows snipping overlay.
const SCREEN_CLIP_URI: &str = "ms-screenclip:edit";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Launcher trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Starts the external capture tool.
#[async_trait::async_trait]
pub trait CaptureToolLauncher: Send + Sync {
    /// Ask the tool to open after `delay_seconds`.
    async fn launch(&self, delay_seconds: u32) -> Result<(), String>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Screen-clip launcher
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Opens the screen-clip protocol URI through the platform opener.
#[derive(Debug, Clone, Default)]
pub struct ScreenClipLauncher;

impl ScreenClipLauncher {
    pub fn new() -> Self {
        Self
    }
}

/// `ms-screenclip:edit?delayInSeconds=N`
pub fn screen_clip_uri(delay_seconds: u32) -> String {
    format!("{}?delayInSeconds={}", SCREEN_CLIP_URI, delay_seconds)
}

/// Program and arguments that hand `uri` to the desktop's URI handler.
pub fn opener_command(uri: &str) -> (&'static str, Vec<String>) {
    if cfg!(target_os = "windows") {
        (
            "cmd",
            vec!["/C".into(), "start".into(), String::new(), uri.to_string()],
        )
    } else if cfg!(target_os = "macos") {
        ("open", vec![uri.to_string()])
    } else {
        ("xdg-open", vec![uri.to_string()])
    }
}

#[async_trait::async_trait]
impl CaptureToolLauncher for ScreenClipLauncher {
    async fn launch(&self, delay_seconds: u32) -> Result<(), String> {
        let uri = screen_clip_uri(delay_seconds);
        let (program, args) = opener_command(&uri);
        log::debug!("Launching capture tool via {} {}", program, uri);

        let status = Command::new(program)
            .args(&args)
            .status()
            .await
            .map_err(|e| format!("Failed to run {}: {}", program, e))?;

        if status.success() {
            Ok(())
        } else {
            Err(format!("{} exited with {}", program, status))
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Simulated launcher (for testing & offline use)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Records launch requests instead of starting anything.
#[derive(Default)]
pub struct SimulatedLauncher {
    fail: AtomicBool,
    launches: Mutex<Vec<u32>>,
}

impl SimulatedLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make subsequent launches fail.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Delays passed to every launch attempt, failed ones included.
    pub async fn launches(&self) -> Vec<u32> {
        self.launches.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl CaptureToolLauncher for SimulatedLauncher {
    async fn launch(&self, delay_seconds: u32) -> Result<(), String> {
        self.launches.lock().await.push(delay_seconds);
        if self.fail.load(Ordering::SeqCst) {
            Err("capture tool is not installed".to_string())
        } else {
            Ok(())
        }
    }
}
