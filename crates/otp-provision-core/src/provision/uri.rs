//! Provisioning payload parsing.
//!
//! Accepts either a full key URI or just its query part:
//!
//! `otpauth://totp/ISSUER:LABEL?secret=BASE32&issuer=ISSUER&algorithm=SHA1&digits=6&period=30`
//!
//! The whole payload is percent-decoded before it is split, so encoded
//! separators inside values are not preserved.

use crate::provision::types::*;

const SCHEME: &str = "otpauth://";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Parse
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse a decoded QR payload into recognised fields.
///
/// Unknown keys, pairs without `=`, and unknown algorithm names are
/// skipped. A `period` or `digits` value that is not a base-10 integer
/// fails the whole payload with `NumericFieldMalformed`. An empty result
/// means the payload is not an account definition.
pub fn parse_payload(raw: &str) -> Result<Vec<ParsedField>, ProvisionError> {
    let decoded = url_decode(raw.trim());
    let decoded = decoded.trim();
    if decoded.is_empty() {
        return Ok(Vec::new());
    }

    let mut fields = Vec::new();

    let query = match strip_scheme(decoded) {
        Some(rest) => {
            let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
            push_path_fields(path, &mut fields);
            query
        }
        None => decoded.strip_prefix('?').unwrap_or(decoded),
    };

    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        if let Some(field) = parse_field(key.trim(), value)? {
            fields.push(field);
        }
    }

    log::debug!("Payload yielded {} field(s)", fields.len());
    Ok(fields)
}

fn strip_scheme(s: &str) -> Option<&str> {
    let head = s.get(..SCHEME.len())?;
    if head.eq_ignore_ascii_case(SCHEME) {
        s.get(SCHEME.len()..)
    } else {
        None
    }
}

/// Path is "TYPE/LABEL" or "TYPE/ISSUER:LABEL".
fn push_path_fields(path: &str, fields: &mut Vec<ParsedField>) {
    let Some((otp_type, label)) = path.split_once('/') else {
        return;
    };
    if !otp_type.eq_ignore_ascii_case("totp") {
        log::warn!("Payload declares OTP type '{}', treating it as TOTP", otp_type);
    }

    let label = label.trim();
    if label.is_empty() {
        return;
    }
    match label.split_once(':') {
        Some((issuer, account)) => {
            let issuer = issuer.trim();
            if !issuer.is_empty() {
                fields.push(ParsedField::Issuer(issuer.to_string()));
            }
            fields.push(ParsedField::Label(account.trim().to_string()));
        }
        None => fields.push(ParsedField::Label(label.to_string())),
    }
}

fn parse_field(key: &str, value: &str) -> Result<Option<ParsedField>, ProvisionError> {
    let field = match key {
        "secret" => Some(ParsedField::Secret(value.to_string())),
        "label" => Some(ParsedField::Label(value.to_string())),
        "issuer" => Some(ParsedField::Issuer(value.to_string())),
        "algorithm" => Algorithm::from_payload(value).map(ParsedField::Algorithm),
        "period" => Some(ParsedField::Period(parse_number(key, value)?)),
        "digits" => Some(ParsedField::Digits(parse_number(key, value)?)),
        _ => None,
    };
    Ok(field)
}

fn parse_number(key: &str, value: &str) -> Result<u32, ProvisionError> {
    let n = value.trim().parse::<u32>().map_err(|e| {
        ProvisionError::new(
            ProvisionErrorKind::NumericFieldMalformed,
            format!("'{}' must be a whole number", key),
        )
        .with_detail(e.to_string())
    })?;
    if n == 0 {
        return Err(ProvisionError::new(
            ProvisionErrorKind::NumericFieldMalformed,
            format!("'{}' must be greater than zero", key),
        ));
    }
    Ok(n)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  URL decoding
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Form-style percent decoding: `%XX` escapes and `+` as space.
/// Malformed escapes are kept literally.
pub fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => match (bytes.get(i + 1), bytes.get(i + 2)) {
                (Some(&hi), Some(&lo)) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                    out.push((hex_value(hi) << 4) | hex_value(lo));
                    i += 3;
                }
                _ => {
                    out.push(b'%');
                    i += 1;
                }
            },
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}
