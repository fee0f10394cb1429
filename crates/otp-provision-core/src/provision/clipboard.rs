//! Clipboard boundary.
//!
//! The capture tool writes its result to the shared clipboard; the session
//! only ever reads a bitmap from it and clears it after a successful decode.
//! The platform back-end is injected through [`ClipboardSource`].

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Image
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A bitmap taken from the clipboard, as tightly packed RGBA8 rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ClipboardImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Whether the pixel buffer matches the declared dimensions.
    pub fn is_well_formed(&self) -> bool {
        let expected = self.width as usize * self.height as usize * 4;
        expected > 0 && self.pixels.len() == expected
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Source trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Platform clipboard access.
///
/// Implementations must be `Send + Sync` so they can be held behind an
/// `Arc` by the capture session.
#[async_trait::async_trait]
pub trait ClipboardSource: Send + Sync {
    /// Read the current bitmap, `Ok(None)` when the clipboard holds none.
    async fn read_image(&self) -> Result<Option<ClipboardImage>, String>;

    /// Remove the clipboard contents.
    async fn clear(&self) -> Result<(), String>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  In-memory clipboard (tests & headless use)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A clipboard that lives entirely in memory.
#[derive(Default)]
pub struct MemoryClipboard {
    image: Mutex<Option<ClipboardImage>>,
    fail_reads: AtomicBool,
    clear_count: AtomicUsize,
}

impl MemoryClipboard {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Put an image on the clipboard, as the capture tool would.
    pub async fn set_image(&self, image: ClipboardImage) {
        *self.image.lock().await = Some(image);
    }

    pub async fn has_image(&self) -> bool {
        self.image.lock().await.is_some()
    }

    /// Make every read fail until switched off again.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// How many times `clear` has been called.
    pub fn clear_count(&self) -> usize {
        self.clear_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ClipboardSource for MemoryClipboard {
    async fn read_image(&self) -> Result<Option<ClipboardImage>, String> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err("Clipboard is locked by another process".to_string());
        }
        Ok(self.image.lock().await.clone())
    }

    async fn clear(&self) -> Result<(), String> {
        self.clear_count.fetch_add(1, Ordering::SeqCst);
        *self.image.lock().await = None;
        Ok(())
    }
}
