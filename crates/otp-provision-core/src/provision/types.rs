//! Core types for account provisioning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::provision::secret;

/// Digits used when the payload does not say otherwise.
pub const DEFAULT_DIGITS: u32 = 6;
/// TOTP period in seconds used when the payload does not say otherwise.
pub const DEFAULT_PERIOD: u32 = 30;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Algorithm
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Hash algorithm used for HMAC-based OTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Algorithm {
    #[default]
    Sha1,
    Sha256,
    Sha512,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri_name())
    }
}

impl Algorithm {
    /// Case-insensitive lookup of the `algorithm` payload value.
    ///
    /// Only the three plain names are recognised; anything else is `None`
    /// and the caller keeps whatever algorithm it already had.
    pub fn from_payload(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sha1" => Some(Self::Sha1),
            "sha256" => Some(Self::Sha256),
            "sha512" => Some(Self::Sha512),
            _ => None,
        }
    }

    /// URI-safe name for `otpauth://` parameters.
    pub fn uri_name(&self) -> &'static str {
        match self {
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Parsed field
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One recognised key/value pair from a provisioning payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedField {
    Secret(String),
    Label(String),
    Issuer(String),
    Algorithm(Algorithm),
    Period(u32),
    Digits(u32),
}

impl ParsedField {
    /// Payload key this field was read from.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Secret(_) => "secret",
            Self::Label(_) => "label",
            Self::Issuer(_) => "issuer",
            Self::Algorithm(_) => "algorithm",
            Self::Period(_) => "period",
            Self::Digits(_) => "digits",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Account draft
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An account that is still being filled in, either by a scan or by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDraft {
    /// Account label (e.g. "user@example.com").
    pub label: String,
    /// Issuer (e.g. "GitHub").
    pub issuer: String,
    /// Secret as entered. Canonical Base32 once it has been accepted.
    pub secret_raw: String,
    /// Decoded form of the canonical secret; empty while the secret is not valid.
    #[serde(skip)]
    pub secret_bytes: Vec<u8>,
    /// Whether `secret_raw` passed normalisation.
    pub secret_valid: bool,
    pub algorithm: Algorithm,
    pub digits: u32,
    pub period: u32,
}

impl Default for AccountDraft {
    fn default() -> Self {
        Self {
            label: String::new(),
            issuer: String::new(),
            secret_raw: String::new(),
            secret_bytes: Vec::new(),
            secret_valid: false,
            algorithm: Algorithm::default(),
            digits: DEFAULT_DIGITS,
            period: DEFAULT_PERIOD,
        }
    }
}

impl AccountDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a draft from parser output. Last occurrence of a key wins.
    ///
    /// An empty field list is `EmptyPayload`. The secret, if any, is
    /// normalised once after all fields have been applied.
    pub fn from_fields(fields: &[ParsedField]) -> Result<Self, ProvisionError> {
        if fields.is_empty() {
            return Err(ProvisionError::new(
                ProvisionErrorKind::EmptyPayload,
                "Payload contains no account fields",
            ));
        }

        let mut draft = Self::new();
        let mut secret = None;
        for field in fields {
            match field {
                ParsedField::Secret(s) => secret = Some(s.as_str()),
                ParsedField::Label(l) => draft.label = l.clone(),
                ParsedField::Issuer(i) => draft.issuer = i.clone(),
                ParsedField::Algorithm(a) => draft.algorithm = *a,
                ParsedField::Period(p) => draft.period = *p,
                ParsedField::Digits(d) => draft.digits = *d,
            }
        }

        if let Some(s) = secret {
            draft.set_secret(s)?;
        }
        Ok(draft)
    }

    /// Replace the secret, running it through the normaliser.
    ///
    /// On success `secret_raw` holds the canonical form and `secret_bytes`
    /// its decode. On failure the input is kept as typed, the bytes are
    /// cleared and the draft stops being submittable.
    pub fn set_secret(&mut self, input: &str) -> Result<(), ProvisionError> {
        match secret::normalize_secret(input) {
            Ok(Some(normalized)) => {
                self.secret_raw = normalized.encoded;
                self.secret_bytes = normalized.bytes;
                self.secret_valid = true;
                Ok(())
            }
            Ok(None) => {
                self.clear_secret();
                Ok(())
            }
            Err(e) => {
                self.secret_raw = input.to_string();
                self.secret_bytes.clear();
                self.secret_valid = false;
                Err(e)
            }
        }
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn set_issuer(&mut self, issuer: impl Into<String>) {
        self.issuer = issuer.into();
    }

    fn clear_secret(&mut self) {
        self.secret_raw.clear();
        self.secret_bytes.clear();
        self.secret_valid = false;
    }

    /// A draft can be submitted once it has a valid secret and an issuer.
    pub fn is_submittable(&self) -> bool {
        !self.secret_raw.is_empty() && self.secret_valid && !self.issuer.is_empty()
    }

    /// Display name: "Issuer (label)" or whichever of the two is set.
    pub fn display_name(&self) -> String {
        match (self.issuer.is_empty(), self.label.is_empty()) {
            (false, false) => format!("{} ({})", self.issuer, self.label),
            (false, true) => self.issuer.clone(),
            _ => self.label.clone(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Accepted account
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A submitted account, as handed to the account store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotpAccount {
    pub id: String,
    pub label: String,
    pub issuer: String,
    /// Canonical Base32 secret.
    pub secret: String,
    pub algorithm: Algorithm,
    pub digits: u32,
    pub period: u32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AccountDraft> for TotpAccount {
    type Error = ProvisionError;

    fn try_from(draft: AccountDraft) -> Result<Self, Self::Error> {
        if !draft.is_submittable() {
            return Err(ProvisionError::new(
                ProvisionErrorKind::NotSubmittable,
                "Draft needs a valid secret and an issuer",
            ));
        }
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            label: draft.label,
            issuer: draft.issuer,
            secret: draft.secret_raw,
            algorithm: draft.algorithm,
            digits: draft.digits,
            period: draft.period,
            created_at: Utc::now(),
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Provisioning step
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Which page of the add-account flow the caller should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningStep {
    /// Pick between scanning and manual input.
    #[default]
    Selection,
    /// Edit the draft fields.
    Input,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Error type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Error kind for this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvisionErrorKind {
    EmptyPayload,
    InvalidSecretFormat,
    NumericFieldMalformed,
    LaunchFailed,
    NoImageAvailable,
    DecodeFailed,
    ScanInProgress,
    IncompletePayload,
    NotSubmittable,
    StorageError,
    ConfigError,
}

impl ProvisionErrorKind {
    /// Whether the scan flow can simply be retried without user-visible noise.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::LaunchFailed | Self::NoImageAvailable)
    }
}

/// Crate-level error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionError {
    pub kind: ProvisionErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

impl fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)?;
        if let Some(d) = &self.detail {
            write!(f, " ({})", d)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProvisionError {}

impl ProvisionError {
    pub fn new(kind: ProvisionErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl From<ProvisionError> for String {
    fn from(e: ProvisionError) -> String {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Algorithm ────────────────────────────────────────────────

    #[test]
    fn algorithm_default_is_sha1() {
        assert_eq!(Algorithm::default(), Algorithm::Sha1);
    }

    #[test]
    fn algorithm_from_payload_is_case_insensitive() {
        assert_eq!(Algorithm::from_payload("sha1"), Some(Algorithm::Sha1));
        assert_eq!(Algorithm::from_payload("SHA256"), Some(Algorithm::Sha256));
        assert_eq!(Algorithm::from_payload("Sha512"), Some(Algorithm::Sha512));
    }

    #[test]
    fn algorithm_from_payload_rejects_other_names() {
        assert_eq!(Algorithm::from_payload("MD5"), None);
        assert_eq!(Algorithm::from_payload("SHA-256"), None);
        assert_eq!(Algorithm::from_payload(""), None);
    }

    #[test]
    fn algorithm_serde_uses_uri_names() {
        let json = serde_json::to_string(&Algorithm::Sha256).unwrap();
        assert_eq!(json, "\"SHA256\"");
        assert_eq!(Algorithm::Sha512.to_string(), "SHA512");
    }

    // ── AccountDraft ─────────────────────────────────────────────

    #[test]
    fn draft_defaults() {
        let d = AccountDraft::new();
        assert_eq!(d.algorithm, Algorithm::Sha1);
        assert_eq!(d.digits, 6);
        assert_eq!(d.period, 30);
        assert!(!d.is_submittable());
    }

    #[test]
    fn draft_from_no_fields_is_empty_payload() {
        let err = AccountDraft::from_fields(&[]).unwrap_err();
        assert_eq!(err.kind, ProvisionErrorKind::EmptyPayload);
    }

    #[test]
    fn draft_from_fields_last_occurrence_wins() {
        let fields = vec![
            ParsedField::Issuer("First".into()),
            ParsedField::Secret("not valid!".into()),
            ParsedField::Digits(8),
            ParsedField::Issuer("Second".into()),
            ParsedField::Secret("JBSWY3DPEHPK3PXP".into()),
        ];
        let d = AccountDraft::from_fields(&fields).unwrap();
        assert_eq!(d.issuer, "Second");
        assert_eq!(d.digits, 8);
        assert_eq!(d.secret_raw, "JBSWY3DPEHPK3PXP");
        assert!(d.is_submittable());
    }

    #[test]
    fn draft_from_fields_invalid_secret() {
        let fields = vec![ParsedField::Secret("1189".into())];
        let err = AccountDraft::from_fields(&fields).unwrap_err();
        assert_eq!(err.kind, ProvisionErrorKind::InvalidSecretFormat);
    }

    #[test]
    fn set_secret_stores_canonical_form() {
        let mut d = AccountDraft::new();
        d.set_secret("jbsw y3dp-ehpk 3pxp").unwrap();
        assert_eq!(d.secret_raw, "JBSWY3DPEHPK3PXP");
        assert_eq!(d.secret_bytes, b"Hello!\xde\xad\xbe\xef".to_vec());
        assert!(d.secret_valid);
    }

    #[test]
    fn set_secret_failure_blocks_submission() {
        let mut d = AccountDraft::new();
        d.set_issuer("Example");
        d.set_secret("JBSWY3DPEHPK3PXP").unwrap();
        assert!(d.is_submittable());

        assert!(d.set_secret("bad_secret!").is_err());
        assert_eq!(d.secret_raw, "bad_secret!");
        assert!(d.secret_bytes.is_empty());
        assert!(!d.is_submittable());
    }

    #[test]
    fn set_secret_empty_clears() {
        let mut d = AccountDraft::new();
        d.set_secret("JBSWY3DPEHPK3PXP").unwrap();
        d.set_secret("").unwrap();
        assert!(d.secret_raw.is_empty());
        assert!(!d.secret_valid);
    }

    #[test]
    fn submittable_requires_issuer() {
        let mut d = AccountDraft::new();
        d.set_secret("JBSWY3DPEHPK3PXP").unwrap();
        d.set_label("alice");
        assert!(!d.is_submittable());
        d.set_issuer("Example");
        assert!(d.is_submittable());
    }

    #[test]
    fn draft_display_name() {
        let mut d = AccountDraft::new();
        d.set_label("alice");
        assert_eq!(d.display_name(), "alice");
        d.set_issuer("GitHub");
        assert_eq!(d.display_name(), "GitHub (alice)");
    }

    // ── TotpAccount ──────────────────────────────────────────────

    #[test]
    fn account_from_submittable_draft() {
        let mut d = AccountDraft::new();
        d.set_secret("JBSWY3DPEHPK3PXP").unwrap();
        d.set_issuer("Example");
        d.set_label("alice");
        let account = TotpAccount::try_from(d).unwrap();
        assert_eq!(account.secret, "JBSWY3DPEHPK3PXP");
        assert_eq!(account.issuer, "Example");
        assert!(!account.id.is_empty());
    }

    #[test]
    fn account_from_incomplete_draft_fails() {
        let err = TotpAccount::try_from(AccountDraft::new()).unwrap_err();
        assert_eq!(err.kind, ProvisionErrorKind::NotSubmittable);
    }

    // ── Error ────────────────────────────────────────────────────

    #[test]
    fn error_display() {
        let err = ProvisionError::new(ProvisionErrorKind::DecodeFailed, "no QR code")
            .with_detail("blank image");
        let s = err.to_string();
        assert!(s.contains("DecodeFailed"));
        assert!(s.contains("no QR code"));
        assert!(s.contains("blank image"));
    }

    #[test]
    fn error_into_string() {
        let err = ProvisionError::new(ProvisionErrorKind::EmptyPayload, "nothing");
        let s: String = err.into();
        assert!(s.contains("EmptyPayload"));
    }

    #[test]
    fn recoverable_kinds() {
        assert!(ProvisionErrorKind::LaunchFailed.is_recoverable());
        assert!(ProvisionErrorKind::NoImageAvailable.is_recoverable());
        assert!(!ProvisionErrorKind::DecodeFailed.is_recoverable());
        assert!(!ProvisionErrorKind::InvalidSecretFormat.is_recoverable());
    }
}
