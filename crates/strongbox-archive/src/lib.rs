//! Encrypted backup archive: create, restore, verify, export/import and
//! expire encrypted snapshots.
//!
//! Control flow for a backup:
//! `BackupArchiveService::create_backup` → codec encodes → SHA-256 of the
//! plaintext → AES-256-GCM → store persists metadata + payload under a new id.
//! Restore runs the same steps in reverse and rejects anything whose tag or
//! checksum does not verify.

pub mod export;
pub mod lifecycle;
pub mod schedule;
pub mod service;

pub use lifecycle::BackupLifecycle;
pub use schedule::{AutoBackupHandle, AutoBackupStats};
pub use service::{BackupArchiveService, RestoreOptions, ServiceBuilder};
pub use strongbox_core::{ArchiveError, ErrorKind, Result};
