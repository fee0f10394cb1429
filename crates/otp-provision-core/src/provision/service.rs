//! High-level orchestrator: owns the draft and the capture session, and
//! hands finished accounts to the store.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::provision::capture::{CaptureSession, CaptureState};
use crate::provision::config::SettingsProvider;
use crate::provision::store::AccountStore;
use crate::provision::types::*;
use crate::provision::uri;

/// Shared service state for the host application.
pub type ProvisioningServiceState = Arc<Mutex<ProvisioningService>>;

/// Add-account flow: scan or type in a secret, review, submit.
pub struct ProvisioningService {
    session: CaptureSession,
    settings: Arc<dyn SettingsProvider>,
    store: Arc<dyn AccountStore>,
    draft: AccountDraft,
    step: ProvisioningStep,
}

impl ProvisioningService {
    pub fn new(
        session: CaptureSession,
        settings: Arc<dyn SettingsProvider>,
        store: Arc<dyn AccountStore>,
    ) -> Self {
        Self {
            session,
            settings,
            store,
            draft: AccountDraft::new(),
            step: ProvisioningStep::Selection,
        }
    }

    /// Same as [`ProvisioningService::new`], wrapped for sharing.
    pub fn new_state(
        session: CaptureSession,
        settings: Arc<dyn SettingsProvider>,
        store: Arc<dyn AccountStore>,
    ) -> ProvisioningServiceState {
        Arc::new(Mutex::new(Self::new(session, settings, store)))
    }

    pub fn draft(&self) -> &AccountDraft {
        &self.draft
    }

    pub fn step(&self) -> ProvisioningStep {
        self.step
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub async fn capture_state(&self) -> CaptureState {
        self.session.state().await
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Scanning
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Launch the capture tool with the configured delay.
    pub async fn begin_scan(&mut self) -> Result<(), ProvisionError> {
        let seconds = self.settings.scan_settings().qr_code_scan_seconds;
        match self.session.begin_scan(seconds).await {
            Ok(()) => Ok(()),
            Err(e) => {
                if e.kind != ProvisionErrorKind::ScanInProgress {
                    self.step = ProvisioningStep::Selection;
                }
                Err(e)
            }
        }
    }

    /// Forward the host "deactivated" signal.
    pub async fn on_focus_lost(&self) -> bool {
        self.session.on_host_deactivated().await
    }

    /// Forward the host "activated" signal.
    ///
    /// `None` when no scan was waiting for it. Otherwise the scanned payload
    /// has been parsed into the draft, or the failure is returned with the
    /// previous draft intact. An empty clipboard keeps the current step;
    /// any other failure goes back to the selection step.
    pub async fn on_focus_regained(&mut self) -> Option<Result<AccountDraft, ProvisionError>> {
        let scanned = self.session.on_host_activated().await?;
        let outcome = match scanned {
            Ok(payload) => self.ingest_payload(&payload),
            // Nothing captured yet; stay where the user was.
            Err(e) if e.kind == ProvisionErrorKind::NoImageAvailable => Err(e),
            Err(e) => {
                self.step = ProvisioningStep::Selection;
                Err(e)
            }
        };
        if let Err(e) = &outcome {
            if e.kind.is_recoverable() {
                log::info!("Scan produced nothing: {}", e);
            } else {
                log::warn!("Scan failed: {}", e);
            }
        }
        Some(outcome)
    }

    pub async fn cancel_scan(&mut self) -> bool {
        let cancelled = self.session.cancel().await;
        if cancelled {
            self.step = ProvisioningStep::Selection;
        }
        cancelled
    }

    /// Parse a decoded QR payload and make it the current draft.
    ///
    /// The draft is replaced only when the payload yields a valid secret and
    /// an issuer; any failure leaves it untouched and returns to selection.
    pub fn ingest_payload(&mut self, raw: &str) -> Result<AccountDraft, ProvisionError> {
        match Self::draft_from_payload(raw) {
            Ok(draft) => {
                log::info!("Payload accepted for {}", draft.display_name());
                self.draft = draft.clone();
                self.step = ProvisioningStep::Input;
                Ok(draft)
            }
            Err(e) => {
                self.step = ProvisioningStep::Selection;
                Err(e)
            }
        }
    }

    fn draft_from_payload(raw: &str) -> Result<AccountDraft, ProvisionError> {
        let fields = uri::parse_payload(raw)?;
        let draft = AccountDraft::from_fields(&fields)?;
        if draft.secret_raw.is_empty() || draft.issuer.is_empty() {
            let missing = match (draft.secret_raw.is_empty(), draft.issuer.is_empty()) {
                (true, true) => "secret, issuer",
                (true, false) => "secret",
                _ => "issuer",
            };
            return Err(ProvisionError::new(
                ProvisionErrorKind::IncompletePayload,
                "Payload does not describe a complete account",
            )
            .with_detail(format!("missing: {}", missing)));
        }
        Ok(draft)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Manual input
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Skip scanning and edit the draft by hand.
    pub fn manual_input(&mut self) {
        self.step = ProvisioningStep::Input;
    }

    pub fn set_secret(&mut self, secret: &str) -> Result<(), ProvisionError> {
        self.draft.set_secret(secret)
    }

    pub fn set_label(&mut self, label: &str) {
        self.draft.set_label(label);
    }

    pub fn set_issuer(&mut self, issuer: &str) {
        self.draft.set_issuer(issuer);
    }

    pub fn is_submittable(&self) -> bool {
        self.draft.is_submittable()
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Submission
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Store the current draft as an account and start over with an empty one.
    pub fn submit(&mut self) -> Result<TotpAccount, ProvisionError> {
        let account = TotpAccount::try_from(self.draft.clone())?;
        self.store.add_account(account.clone()).map_err(|e| {
            log::error!("Failed to store account: {}", e);
            ProvisionError::new(ProvisionErrorKind::StorageError, "Could not save the account")
                .with_detail(e)
        })?;
        log::info!("Account {} added", account.id);
        self.draft = AccountDraft::new();
        self.step = ProvisioningStep::Selection;
        Ok(account)
    }
}
