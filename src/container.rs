//! Framing shared by the container reader and writer.

use std::fmt::Display;

pub const MAGIC: &[u8; 8] = b"NIFITS\0\0";

/// Provenance key on a dynamic part holding the CRC32 (8 lowercase hex
/// digits) of the static part it was written against.
pub const STATIC_CRC_KEY: &str = "STATIC_CRC";

/// Which tables a container holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    Complete,
    /// Only the instrument description tables.
    Static,
    /// Only the observation tables.
    Dynamic,
}

impl Part {
    pub fn as_byte(self) -> u8 {
        match self {
            Part::Complete => 0,
            Part::Static => 1,
            Part::Dynamic => 2,
        }
    }

    pub fn from_byte(b: u8) -> Option<Part> {
        match b {
            0 => Some(Part::Complete),
            1 => Some(Part::Static),
            2 => Some(Part::Dynamic),
            _ => None,
        }
    }
}

impl Display for Part {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Part::Complete => "complete",
                Part::Static => "static",
                Part::Dynamic => "dynamic",
            }
        )
    }
}

/// Every container ends with the CRC32 of everything before it.
pub const TRAILER_LEN: usize = 4;

/// The checksum recorded for a static part: the CRC32 of its body, which is
/// also the value of its trailer.
pub(crate) fn static_crc(static_part: &[u8]) -> String {
    let body = &static_part[..static_part.len().saturating_sub(TRAILER_LEN)];
    format!("{:08x}", crc32fast::hash(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framed(body: &[u8]) -> Vec<u8> {
        let mut bytes = body.to_vec();
        bytes.extend_from_slice(&crc32fast::hash(body).to_le_bytes());
        bytes
    }

    #[test]
    fn static_checksums_tell_parts_apart() {
        let a = framed(b"NIFITS\0\0 one static part");
        let b = framed(b"NIFITS\0\0 another static part");
        assert_ne!(static_crc(&a), static_crc(&b));
        assert_eq!(static_crc(&a), format!("{:08x}", crc32fast::hash(&a[..a.len() - 4])));
    }
}
