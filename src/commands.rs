//! Sub-command handlers. Each returns the JSON document printed on stdout.

use std::path::PathBuf;
use std::sync::Arc;

use otp_provision_core::provision::launcher::SimulatedLauncher;
use otp_provision_core::provision::*;
use serde_json::{json, Value};

const APP_DIR: &str = "otp-provision";
const SETTINGS_FILE: &str = "settings.json";

/// `--settings` if given, otherwise the per-user config directory.
pub fn settings_path(explicit: Option<PathBuf>) -> Result<PathBuf, String> {
    match explicit {
        Some(path) => Ok(path),
        None => dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
            .ok_or_else(|| "No configuration directory on this platform; pass --settings".to_string()),
    }
}

fn draft_json(draft: &AccountDraft) -> Result<Value, String> {
    let mut value = serde_json::to_value(draft).map_err(|e| e.to_string())?;
    if let Value::Object(map) = &mut value {
        map.insert("secretHex".into(), Value::String(hex::encode(&draft.secret_bytes)));
        map.insert("submittable".into(), Value::Bool(draft.is_submittable()));
    }
    Ok(value)
}

pub fn parse(payload: &str) -> Result<Value, String> {
    let fields = parse_payload(payload)?;
    log::debug!("Parsed fields: {:?}", fields.iter().map(ParsedField::key).collect::<Vec<_>>());
    let draft = AccountDraft::from_fields(&fields)?;
    draft_json(&draft)
}

pub fn normalize(secret: &str) -> Result<Value, String> {
    match normalize_secret(secret)? {
        Some(s) => Ok(json!({
            "secret": s.encoded,
            "hex": hex::encode(&s.bytes),
            "length": s.bytes.len(),
        })),
        None => Ok(json!({ "secret": null })),
    }
}

pub fn settings(path: PathBuf, scan_seconds: Option<u32>) -> Result<Value, String> {
    let mut file = JsonSettingsFile::open(path)?;
    if let Some(seconds) = scan_seconds {
        file.save(ScanSettings {
            qr_code_scan_seconds: seconds,
        })?;
    }
    Ok(json!({
        "path": file.path().display().to_string(),
        "settings": file.settings(),
    }))
}

/// Drive one scan attempt end to end with in-memory collaborators.
pub async fn simulate(
    settings: Arc<dyn SettingsProvider>,
    payload: String,
    fail_launch: bool,
    no_image: bool,
) -> Result<Value, String> {
    let launcher = SimulatedLauncher::new();
    launcher.set_fail(fail_launch);
    let clipboard = MemoryClipboard::new();
    let decoder = move |_: &ClipboardImage| -> Result<String, String> { Ok(payload.clone()) };
    let session = CaptureSession::new(launcher, clipboard.clone(), Arc::new(decoder));
    let mut service = ProvisioningService::new(session, settings, Arc::new(InMemoryAccountStore::new()));

    service.begin_scan().await?;
    service.on_focus_lost().await;
    if !no_image {
        clipboard
            .set_image(ClipboardImage::new(1, 1, vec![0, 0, 0, 255]))
            .await;
    }

    let draft = match service.on_focus_regained().await {
        Some(result) => result?,
        None => return Err("Scan was not armed".to_string()),
    };
    Ok(json!({
        "step": service.step(),
        "captureState": service.capture_state().await,
        "draft": draft_json(&draft)?,
    }))
}
