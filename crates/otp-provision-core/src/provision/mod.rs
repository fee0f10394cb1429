//! Provisioning pipeline: sub-modules.

pub mod types;
pub mod secret;
pub mod uri;
pub mod ticker;
pub mod clipboard;
pub mod launcher;
pub mod decoder;
pub mod capture;
pub mod config;
pub mod store;
pub mod service;

// Re-export top-level items for convenience.
pub use types::*;
pub use secret::{normalize_secret, NormalizedSecret};
pub use uri::parse_payload;
pub use capture::{CaptureSession, CaptureState};
pub use clipboard::{ClipboardImage, ClipboardSource, MemoryClipboard};
pub use launcher::{CaptureToolLauncher, ScreenClipLauncher};
pub use decoder::QrDecoder;
pub use config::{JsonSettingsFile, ScanSettings, SettingsProvider};
pub use store::{AccountStore, InMemoryAccountStore};
pub use service::{ProvisioningService, ProvisioningServiceState};
