//! Capture session: hands control to the external clip tool and picks the
//! captured QR code up from the clipboard once the host has focus again.
//!
//! ```text
//!  Idle ──begin_scan──▶ ToolLaunched ──host deactivated──▶ ArmedForClipboard
//!   ▲                        │                                   │
//!   │◀── launch failed ──────┘                          host activated
//!   │                                                            ▼
//!   └──────────────────────── scan finished ◀──────────────── Scanning
//! ```
//!
//! The countdown only bounds how long the tool is expected to matter; it
//! never moves the state machine. Focus signals do.

use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::provision::clipboard::ClipboardSource;
use crate::provision::decoder::QrDecoder;
use crate::provision::launcher::CaptureToolLauncher;
use crate::provision::ticker::{TickControl, TickerHandle};
use crate::provision::types::*;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  States & transitions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where a scan attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    #[default]
    Idle,
    ToolLaunched,
    ArmedForClipboard,
    Scanning,
}

/// Inputs that can move a [`CaptureState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEvent {
    BeginScan,
    LaunchFailed,
    HostDeactivated,
    HostActivated,
    ScanFinished,
    Cancel,
}

impl CaptureState {
    /// Next state for `event`, or `None` when the event does not apply here.
    pub fn transition(self, event: CaptureEvent) -> Option<CaptureState> {
        use CaptureEvent as E;
        use CaptureState as S;
        match (self, event) {
            (S::Idle, E::BeginScan) => Some(S::ToolLaunched),
            (S::ToolLaunched, E::HostDeactivated) => Some(S::ArmedForClipboard),
            (S::ArmedForClipboard, E::HostActivated) => Some(S::Scanning),
            (S::Scanning, E::ScanFinished) => Some(S::Idle),
            // The tool may grab focus before the launch call returns.
            (S::ToolLaunched | S::ArmedForClipboard, E::LaunchFailed) => Some(S::Idle),
            (S::ToolLaunched | S::ArmedForClipboard, E::Cancel) => Some(S::Idle),
            _ => None,
        }
    }

    /// Any state other than `Idle`.
    pub fn is_active(self) -> bool {
        self != Self::Idle
    }

    /// States in which the countdown runs.
    fn counts_down(self) -> bool {
        matches!(self, Self::ToolLaunched | Self::ArmedForClipboard)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
struct SessionInner {
    state: CaptureState,
    seconds_remaining: u32,
    configured_timeout_seconds: u32,
    /// Bumped on every `begin_scan`; ticks from older attempts are ignored.
    attempt: u64,
    ticker: Option<TickerHandle>,
}

impl SessionInner {
    fn apply(&mut self, event: CaptureEvent) -> bool {
        match self.state.transition(event) {
            Some(next) => {
                log::debug!("Capture state {:?} -> {:?} on {:?}", self.state, next, event);
                self.state = next;
                if !next.counts_down() {
                    self.stop_timer();
                }
                true
            }
            None => false,
        }
    }

    fn stop_timer(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.stop();
        }
    }

    fn tick(&mut self, attempt: u64) -> TickControl {
        if self.attempt != attempt || !self.state.counts_down() {
            return TickControl::Stop;
        }
        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);
        if self.seconds_remaining == 0 {
            log::info!("Capture countdown elapsed");
            // Dropping the handle aborts this task; it is already returning Stop.
            self.ticker = None;
            return TickControl::Stop;
        }
        TickControl::Continue
    }
}

/// One scan attempt at a time: launch, focus tracking, countdown, clipboard pick-up.
#[derive(Clone)]
pub struct CaptureSession {
    inner: Arc<Mutex<SessionInner>>,
    launcher: Arc<dyn CaptureToolLauncher>,
    clipboard: Arc<dyn ClipboardSource>,
    decoder: Arc<dyn QrDecoder>,
}

impl CaptureSession {
    pub fn new(
        launcher: Arc<dyn CaptureToolLauncher>,
        clipboard: Arc<dyn ClipboardSource>,
        decoder: Arc<dyn QrDecoder>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner::default())),
            launcher,
            clipboard,
            decoder,
        }
    }

    pub async fn state(&self) -> CaptureState {
        self.inner.lock().await.state
    }

    pub async fn seconds_remaining(&self) -> u32 {
        self.inner.lock().await.seconds_remaining
    }

    pub async fn configured_timeout_seconds(&self) -> u32 {
        self.inner.lock().await.configured_timeout_seconds
    }

    /// Whether a countdown task is currently attached.
    pub async fn is_timer_running(&self) -> bool {
        self.inner
            .lock()
            .await
            .ticker
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    /// Start a scan: arm the countdown and launch the capture tool.
    ///
    /// Only valid from `Idle`; otherwise `ScanInProgress`. A failed launch
    /// puts the session back to `Idle` and reports `LaunchFailed`.
    pub async fn begin_scan(&self, timeout_seconds: u32) -> Result<(), ProvisionError> {
        let attempt = {
            let mut inner = self.inner.lock().await;
            if !inner.apply(CaptureEvent::BeginScan) {
                return Err(ProvisionError::new(
                    ProvisionErrorKind::ScanInProgress,
                    "A scan is already in progress",
                )
                .with_detail(format!("state {:?}", inner.state)));
            }
            inner.attempt += 1;
            let attempt = inner.attempt;
            inner.seconds_remaining = timeout_seconds;
            inner.configured_timeout_seconds = timeout_seconds;
            if timeout_seconds > 0 {
                inner.ticker = Some(self.spawn_countdown(attempt));
            }
            attempt
        };

        log::info!("Launching capture tool with {}s delay", timeout_seconds);
        match self.launcher.launch(timeout_seconds).await {
            Ok(()) => Ok(()),
            Err(e) => {
                log::warn!("Capture tool launch failed: {}", e);
                let mut inner = self.inner.lock().await;
                if inner.attempt == attempt {
                    inner.apply(CaptureEvent::LaunchFailed);
                }
                Err(ProvisionError::new(
                    ProvisionErrorKind::LaunchFailed,
                    "Could not start the screen capture tool",
                )
                .with_detail(e))
            }
        }
    }

    /// Host window lost focus. Arms the clipboard pick-up when the tool was
    /// just launched; ignored otherwise.
    pub async fn on_host_deactivated(&self) -> bool {
        let mut inner = self.inner.lock().await;
        log::debug!("Host deactivated in {:?}", inner.state);
        let armed = inner.apply(CaptureEvent::HostDeactivated);
        if armed {
            log::info!("QR-code scan armed, waiting for the host to regain focus");
        }
        armed
    }

    /// Host window regained focus.
    ///
    /// Returns `None` unless the session was armed. Otherwise reads the
    /// clipboard, decodes it, and returns the payload text or the failure.
    /// The session is back in `Idle` either way.
    pub async fn on_host_activated(&self) -> Option<Result<String, ProvisionError>> {
        {
            let mut inner = self.inner.lock().await;
            log::debug!("Host activated in {:?}", inner.state);
            if !inner.apply(CaptureEvent::HostActivated) {
                return None;
            }
        }

        let result = self.read_payload().await;

        self.inner.lock().await.apply(CaptureEvent::ScanFinished);
        Some(result)
    }

    /// Abandon an attempt that has not started scanning yet.
    pub async fn cancel(&self) -> bool {
        let cancelled = self.inner.lock().await.apply(CaptureEvent::Cancel);
        if cancelled {
            log::info!("Capture session cancelled");
        }
        cancelled
    }

    fn spawn_countdown(&self, attempt: u64) -> TickerHandle {
        let weak: Weak<Mutex<SessionInner>> = Arc::downgrade(&self.inner);
        TickerHandle::spawn(TICK, move || {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(inner) => inner.lock().await.tick(attempt),
                    None => TickControl::Stop,
                }
            }
        })
    }

    async fn read_payload(&self) -> Result<String, ProvisionError> {
        let image = match self.clipboard.read_image().await {
            Ok(Some(image)) => image,
            Ok(None) => {
                log::info!("Clipboard holds no image");
                return Err(ProvisionError::new(
                    ProvisionErrorKind::NoImageAvailable,
                    "No image on the clipboard",
                ));
            }
            Err(e) => {
                log::error!("Failed to read image from clipboard: {}", e);
                return Err(ProvisionError::new(
                    ProvisionErrorKind::DecodeFailed,
                    "Could not read the captured image",
                )
                .with_detail(e));
            }
        };

        let text = self.decoder.decode(&image).map_err(|e| {
            log::warn!("QR decode failed: {}", e);
            ProvisionError::new(ProvisionErrorKind::DecodeFailed, "No readable QR code in the image")
                .with_detail(e)
        })?;

        if text.trim().is_empty() {
            log::warn!("QR decoder returned no text");
            return Err(ProvisionError::new(
                ProvisionErrorKind::DecodeFailed,
                "No readable QR code in the image",
            ));
        }

        // Keep the same image from being processed twice.
        if let Err(e) = self.clipboard.clear().await {
            log::warn!("Could not clear clipboard after scan: {}", e);
        }

        Ok(text)
    }
}
