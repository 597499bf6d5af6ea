//! Serialization of the distance volume.
//!
//! The core only speaks byte buffers; file paths and I/O belong to the
//! caller. A save holds level 0 alone - mips are always regenerated after
//! load, never persisted.

pub mod compression;
pub mod volume_save;

pub use compression::Codec;
pub use volume_save::{load_volume, save_volume};

/// Result type for persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Errors that can occur while saving or loading a volume. Loads fail hard
/// on any disagreement between the header and the payload; there is no
/// partial or best-effort recovery.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("compression failed: {0}")]
    Compression(String),

    #[error("corrupted volume data: {0}")]
    Corrupted(String),

    #[error("save format version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("resolution mismatch: file holds {found:?}, configured volume is {expected:?}")]
    ResolutionMismatch { expected: [u32; 3], found: [u32; 3] },

    #[error("payload size mismatch: expected {expected} bytes, found {found}")]
    PayloadSize { expected: usize, found: usize },

    #[error("unknown compression codec byte {0}")]
    UnknownCodec(u8),
}
