//! Compression codecs for the volume payload.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression as FlateCompression;

use super::{PersistenceError, PersistenceResult};

/// Selectable payload codec. The codec byte is part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// Raw bytes, no compression.
    None,
    /// Zlib (good ratio, moderate speed).
    Zlib,
    /// LZ4 (fastest).
    Lz4,
}

impl Codec {
    pub fn to_byte(self) -> u8 {
        match self {
            Codec::None => 0,
            Codec::Zlib => 1,
            Codec::Lz4 => 2,
        }
    }

    pub fn from_byte(byte: u8) -> PersistenceResult<Self> {
        match byte {
            0 => Ok(Codec::None),
            1 => Ok(Codec::Zlib),
            2 => Ok(Codec::Lz4),
            other => Err(PersistenceError::UnknownCodec(other)),
        }
    }
}

/// Compress a payload with the given codec.
pub fn compress(codec: Codec, data: &[u8]) -> PersistenceResult<Vec<u8>> {
    match codec {
        Codec::None => Ok(data.to_vec()),
        Codec::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), FlateCompression::default());
            encoder
                .write_all(data)
                .map_err(|e| PersistenceError::Compression(format!("zlib write failed: {}", e)))?;
            encoder
                .finish()
                .map_err(|e| PersistenceError::Compression(format!("zlib finish failed: {}", e)))
        }
        Codec::Lz4 => Ok(lz4_flex::compress_prepend_size(data)),
    }
}

/// Decompress a payload with the given codec.
pub fn decompress(codec: Codec, data: &[u8]) -> PersistenceResult<Vec<u8>> {
    match codec {
        Codec::None => Ok(data.to_vec()),
        Codec::Zlib => {
            let mut decoder = ZlibDecoder::new(data);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| PersistenceError::Compression(format!("zlib decode failed: {}", e)))?;
            Ok(out)
        }
        Codec::Lz4 => lz4_flex::decompress_size_prepended(data)
            .map_err(|e| PersistenceError::Compression(format!("lz4 decode failed: {}", e))),
    }
}
