//! Portable export format.
//!
//! ```json
//! {
//!   "format": "strongbox-export",
//!   "metadata": { "id": "...", "timestamp": "...", "size": 42, ... },
//!   "payload": { "iv": "<b64>", "auth_tag": "<b64>", "ciphertext": "<b64>" }
//! }
//! ```
//!
//! The payload stays encrypted under the exporting instance's key; only an
//! instance holding the same key can restore an import.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde_json::{Map, Value};
use strongbox_core::types::{BackupMetadata, EncryptedPayload, IV_LEN, StoredBackup, TAG_LEN};
use strongbox_core::{ArchiveError, Result};

pub const EXPORT_FORMAT: &str = "strongbox-export";

const REQUIRED_METADATA: [&str; 7] = [
    "id",
    "timestamp",
    "size",
    "encrypted",
    "compressed",
    "checksum",
    "version",
];

#[derive(Serialize)]
struct ExportDocument<'a> {
    format: &'a str,
    metadata: &'a BackupMetadata,
    payload: ExportedPayload,
}

#[derive(Serialize)]
struct ExportedPayload {
    iv: String,
    auth_tag: String,
    ciphertext: String,
}

pub fn encode(stored: &StoredBackup) -> Result<String> {
    let document = ExportDocument {
        format: EXPORT_FORMAT,
        metadata: &stored.metadata,
        payload: ExportedPayload {
            iv: STANDARD.encode(stored.payload.iv),
            auth_tag: STANDARD.encode(stored.payload.auth_tag),
            ciphertext: STANDARD.encode(&stored.payload.ciphertext),
        },
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

pub fn decode(exported: &str) -> Result<StoredBackup> {
    let root: Value = serde_json::from_str(exported)
        .map_err(|e| invalid(format!("export is not valid JSON: {e}")))?;
    let root = root
        .as_object()
        .ok_or_else(|| invalid("export must be a JSON object"))?;

    match root.get("format").and_then(Value::as_str) {
        Some(EXPORT_FORMAT) => {}
        Some(other) => return Err(invalid(format!("unsupported export format {other:?}"))),
        None => return Err(invalid("missing field `format`")),
    }

    let metadata_obj = object_field(root, "metadata")?;
    for field in REQUIRED_METADATA {
        if metadata_obj.get(field).is_none_or(Value::is_null) {
            return Err(invalid(format!("missing field `metadata.{field}`")));
        }
    }
    let metadata: BackupMetadata = serde_json::from_value(Value::Object(metadata_obj.clone()))
        .map_err(|e| invalid(format!("malformed metadata: {e}")))?;

    let payload_obj = object_field(root, "payload")?;
    let iv = bytes_field(payload_obj, "iv")?;
    let auth_tag = bytes_field(payload_obj, "auth_tag")?;
    let ciphertext = bytes_field(payload_obj, "ciphertext")?;

    let payload = EncryptedPayload {
        iv: iv
            .try_into()
            .map_err(|v: Vec<u8>| invalid(format!("iv must be {IV_LEN} bytes, got {}", v.len())))?,
        auth_tag: auth_tag.try_into().map_err(|v: Vec<u8>| {
            invalid(format!("auth_tag must be {TAG_LEN} bytes, got {}", v.len()))
        })?,
        ciphertext,
    };

    check_consistency(&metadata, &payload)?;
    Ok(StoredBackup { metadata, payload })
}

fn check_consistency(metadata: &BackupMetadata, payload: &EncryptedPayload) -> Result<()> {
    if metadata.id.trim().is_empty() {
        return Err(invalid("metadata.id is empty"));
    }
    if !metadata.encrypted {
        return Err(invalid("only encrypted backups can be imported"));
    }
    if metadata.checksum.len() != 64 || !metadata.checksum.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid("metadata.checksum is not a SHA-256 hex digest"));
    }
    if metadata.size != payload.ciphertext.len() as u64 {
        return Err(invalid(format!(
            "metadata.size {} does not match ciphertext length {}",
            metadata.size,
            payload.ciphertext.len()
        )));
    }
    Ok(())
}

fn object_field<'a>(obj: &'a Map<String, Value>, field: &str) -> Result<&'a Map<String, Value>> {
    obj.get(field)
        .ok_or_else(|| invalid(format!("missing field `{field}`")))?
        .as_object()
        .ok_or_else(|| invalid(format!("field `{field}` must be an object")))
}

fn bytes_field(obj: &Map<String, Value>, field: &str) -> Result<Vec<u8>> {
    let encoded = obj
        .get(field)
        .ok_or_else(|| invalid(format!("missing field `payload.{field}`")))?
        .as_str()
        .ok_or_else(|| invalid(format!("field `payload.{field}` must be a string")))?;
    STANDARD
        .decode(encoded)
        .map_err(|e| invalid(format!("field `payload.{field}` is not base64: {e}")))
}

fn invalid(msg: impl Into<String>) -> ArchiveError {
    ArchiveError::Validation(msg.into())
}
