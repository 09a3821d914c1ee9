pub mod clock;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod integrity;
pub mod types;

pub use error::{ArchiveError, ErrorKind, Result};
