//! QR decoder boundary.
//!
//! Turning a bitmap into text is done by an external decoder; the session
//! only needs the resulting string. Closures implement the trait directly.

use crate::provision::clipboard::ClipboardImage;

/// Image-to-text QR decoder.
pub trait QrDecoder: Send + Sync {
    /// Decode the QR code in `image`. An empty string means nothing was found.
    fn decode(&self, image: &ClipboardImage) -> Result<String, String>;
}

impl<F> QrDecoder for F
where
    F: Fn(&ClipboardImage) -> Result<String, String> + Send + Sync,
{
    fn decode(&self, image: &ClipboardImage) -> Result<String, String> {
        self(image)
    }
}
