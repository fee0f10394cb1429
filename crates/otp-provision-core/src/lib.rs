//! # otp-provision – TOTP Account Provisioning
//!
//! Ingestion side of a TOTP authenticator:
//!
//! - **Payload parsing** – `otpauth://` URIs and bare query strings into typed fields
//! - **Secret normalisation** – Base32 validation with one separator clean-up pass
//! - **Capture session** – launch an external screen-clip tool, follow host focus
//!   changes, and pick the captured QR image up from the clipboard
//! - **Provisioning service** – draft editing, scan outcomes, and submission to an
//!   injected account store

pub mod provision;
