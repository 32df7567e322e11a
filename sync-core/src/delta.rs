//! Self-describing binary delta packets.
//!
//! A packet carries the hash of the base content it was generated against,
//! the size of the target content, and a list of operations. The hash is
//! checked before any operation runs, so a packet is never applied to the
//! wrong base.
//!
//! # Wire format
//!
//! Big-endian throughout:
//!
//! ```text
//! [u32 hash_len][hash_len bytes: base-content hash]
//! [u64 new_size]
//! [u32 op_count]
//! repeated op_count times:
//!   [u8 op_type]      // 1 = Replace
//!   [u64 offset]
//!   [u64 length]
//!   [length bytes: payload]
//! ```
//!
//! The base hash is the lowercase hex SHA-256 of the base content, stored
//! as its 64 ASCII bytes.
//!
//! # Generation
//!
//! The generator is a placeholder, not a binary diff: it emits a single
//! Replace at offset 0 holding the first `min(new.len(), old.len() / 10)`
//! bytes of the new content. On apply, the result is zero-padded or
//! truncated to the declared size. That recovery is lossy; see the tests
//! for the exact behavior it produces.

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Operation code for Replace.
pub const OP_REPLACE: u8 = 1;

/// The generator copies at most `old.len() / GENERATE_DIVISOR` bytes.
pub const GENERATE_DIVISOR: usize = 10;

/// Default cap on the size a packet may declare for its output (1 GiB).
pub const DEFAULT_MAX_OUTPUT: u64 = 1024 * 1024 * 1024;

const HEADER_FIXED_LEN: usize = 4 + 8 + 4;
const OP_HEADER_LEN: usize = 1 + 8 + 8;

/// Errors produced while encoding or applying a delta packet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeltaFormatError {
    /// A declared field runs past the end of the packet.
    #[error("truncated delta: {field} needs {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        /// Field being read.
        field: &'static str,
        /// Position in the packet.
        offset: usize,
        /// Bytes the field needs.
        needed: u64,
        /// Bytes left in the packet.
        available: usize,
    },

    /// The base content does not match the hash embedded in the packet.
    #[error("hash mismatch: delta cannot be applied to this file version")]
    HashMismatch,

    /// Operation type byte is not recognized.
    #[error("unknown delta operation type: {0}")]
    UnknownOperation(u8),

    /// The packet could not be encoded.
    #[error("failed to encode delta: {0}")]
    EncodingFailed(String),

    /// The packet declares an output larger than the codec accepts.
    #[error("declared output size {declared} exceeds limit {limit}")]
    SizeLimitExceeded {
        /// Size declared by the packet.
        declared: u64,
        /// Configured limit.
        limit: u64,
    },
}

/// Hex-encoded SHA-256 of `data`.
///
/// This is the hash embedded in delta packets and the content hash local
/// stores record for files.
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// A single delta operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaOp {
    /// Overwrite `payload.len()` bytes starting at `offset`.
    Replace {
        /// Byte offset in the working buffer.
        offset: u64,
        /// Replacement bytes.
        payload: Vec<u8>,
    },
}

impl DeltaOp {
    /// Wire operation code.
    pub fn op_type(&self) -> u8 {
        match self {
            Self::Replace { .. } => OP_REPLACE,
        }
    }

    /// Offset this operation targets.
    pub fn offset(&self) -> u64 {
        match self {
            Self::Replace { offset, .. } => *offset,
        }
    }

    /// Payload bytes.
    pub fn payload(&self) -> &[u8] {
        match self {
            Self::Replace { payload, .. } => payload,
        }
    }
}

/// Typed view of a delta packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaPacket {
    /// Hash of the base content, as embedded on the wire.
    pub base_hash: Vec<u8>,
    /// Length of the content the packet produces.
    pub new_size: u64,
    /// Operations, in application order.
    pub ops: Vec<DeltaOp>,
}

impl DeltaPacket {
    /// Serialize to the wire format.
    pub fn encode(&self) -> Result<Vec<u8>, DeltaFormatError> {
        let hash_len = u32::try_from(self.base_hash.len()).map_err(|_| {
            DeltaFormatError::EncodingFailed(format!(
                "hash of {} bytes does not fit a u32 length",
                self.base_hash.len()
            ))
        })?;
        let op_count = u32::try_from(self.ops.len()).map_err(|_| {
            DeltaFormatError::EncodingFailed(format!("{} operations exceed u32", self.ops.len()))
        })?;

        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&hash_len.to_be_bytes());
        out.extend_from_slice(&self.base_hash);
        out.extend_from_slice(&self.new_size.to_be_bytes());
        out.extend_from_slice(&op_count.to_be_bytes());

        for op in &self.ops {
            out.push(op.op_type());
            out.extend_from_slice(&op.offset().to_be_bytes());
            out.extend_from_slice(&(op.payload().len() as u64).to_be_bytes());
            out.extend_from_slice(op.payload());
        }

        Ok(out)
    }

    /// Parse the wire format without checking the base hash.
    ///
    /// Useful for inspecting a packet. To reconstruct content use
    /// [`DeltaCodec::apply`], which verifies the base first.
    pub fn decode(bytes: &[u8]) -> Result<Self, DeltaFormatError> {
        let mut reader = Reader::new(bytes);
        let hash_len = reader.read_u32("hash length")?;
        let base_hash = reader.read_bytes(u64::from(hash_len), "hash")?.to_vec();
        let new_size = reader.read_u64("new size")?;
        let op_count = reader.read_u32("operation count")?;

        let mut ops = Vec::new();
        for _ in 0..op_count {
            let raw = reader.read_op()?;
            match raw.op_type {
                OP_REPLACE => ops.push(DeltaOp::Replace {
                    offset: raw.offset,
                    payload: raw.payload.to_vec(),
                }),
                other => return Err(DeltaFormatError::UnknownOperation(other)),
            }
        }

        Ok(Self {
            base_hash,
            new_size,
            ops,
        })
    }

    /// Size of the encoded packet in bytes.
    pub fn encoded_len(&self) -> usize {
        HEADER_FIXED_LEN
            + self.base_hash.len()
            + self
                .ops
                .iter()
                .map(|op| OP_HEADER_LEN + op.payload().len())
                .sum::<usize>()
    }
}

/// Generates and applies delta packets.
#[derive(Debug, Clone, Copy)]
pub struct DeltaCodec {
    max_output: u64,
}

impl DeltaCodec {
    /// Create a codec with the default output size limit.
    pub fn new() -> Self {
        Self {
            max_output: DEFAULT_MAX_OUTPUT,
        }
    }

    /// Set the largest output size a packet may declare.
    pub fn with_max_output(mut self, max_output: u64) -> Self {
        self.max_output = max_output;
        self
    }

    /// Build a packet turning `old_data` into `new_data`.
    pub fn generate(&self, old_data: &[u8], new_data: &[u8]) -> Result<Vec<u8>, DeltaFormatError> {
        let delta_size = new_data.len().min(old_data.len() / GENERATE_DIVISOR);

        let packet = DeltaPacket {
            base_hash: content_hash(old_data).into_bytes(),
            new_size: new_data.len() as u64,
            ops: vec![DeltaOp::Replace {
                offset: 0,
                payload: new_data[..delta_size].to_vec(),
            }],
        };

        let encoded = packet.encode()?;
        tracing::debug!(
            "Generated delta: {} bytes (original: {} bytes)",
            encoded.len(),
            new_data.len()
        );
        Ok(encoded)
    }

    /// Apply `packet` to `old_data`.
    ///
    /// Header fields are read in wire order and the base hash is verified
    /// as soon as it is read. Operations run in order against a working
    /// copy; on any error the working copy is dropped.
    pub fn apply(&self, old_data: &[u8], packet: &[u8]) -> Result<Vec<u8>, DeltaFormatError> {
        let mut reader = Reader::new(packet);

        let hash_len = reader.read_u32("hash length")?;
        let hash = reader.read_bytes(u64::from(hash_len), "hash")?;
        if hash != content_hash(old_data).as_bytes() {
            return Err(DeltaFormatError::HashMismatch);
        }

        let new_size = reader.read_u64("new size")?;
        if new_size > self.max_output {
            return Err(DeltaFormatError::SizeLimitExceeded {
                declared: new_size,
                limit: self.max_output,
            });
        }
        let op_count = reader.read_u32("operation count")?;

        let mut result = old_data.to_vec();
        for _ in 0..op_count {
            let raw = reader.read_op()?;
            match raw.op_type {
                OP_REPLACE => replace_range(&mut result, raw.offset, raw.payload),
                other => return Err(DeltaFormatError::UnknownOperation(other)),
            }
        }

        // max_output bounds new_size, so this only fails on targets where
        // the limit was raised past the address space.
        let target = usize::try_from(new_size).map_err(|_| DeltaFormatError::SizeLimitExceeded {
            declared: new_size,
            limit: usize::MAX as u64,
        })?;
        if result.len() != target {
            tracing::warn!(
                "Size mismatch after applying delta: expected {}, got {}",
                target,
                result.len()
            );
            result.resize(target, 0);
        }

        tracing::debug!(
            "Applied delta: {} bytes, resulting in {} bytes",
            packet.len(),
            result.len()
        );
        Ok(result)
    }
}

impl Default for DeltaCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Splice `payload` over `[offset, offset + payload.len())`.
///
/// Bytes before `offset` and after the replaced range are kept. An offset
/// past the end of the buffer leaves it untouched.
fn replace_range(buffer: &mut Vec<u8>, offset: u64, payload: &[u8]) {
    let Ok(start) = usize::try_from(offset) else {
        return;
    };
    if start > buffer.len() {
        return;
    }
    let end = start.saturating_add(payload.len()).min(buffer.len());
    buffer.splice(start..end, payload.iter().copied());
}

struct RawOp<'a> {
    op_type: u8,
    offset: u64,
    payload: &'a [u8],
}

/// Bounds-checked big-endian reader over a packet.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn read_bytes(&mut self, len: u64, field: &'static str) -> Result<&'a [u8], DeltaFormatError> {
        let available = self.bytes.len() - self.pos;
        let truncated = DeltaFormatError::Truncated {
            field,
            offset: self.pos,
            needed: len,
            available,
        };
        let len = usize::try_from(len).map_err(|_| truncated.clone())?;
        if len > available {
            return Err(truncated);
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], DeltaFormatError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N as u64, field)?);
        Ok(out)
    }

    fn read_u8(&mut self, field: &'static str) -> Result<u8, DeltaFormatError> {
        Ok(self.read_array::<1>(field)?[0])
    }

    fn read_u32(&mut self, field: &'static str) -> Result<u32, DeltaFormatError> {
        self.read_array(field).map(u32::from_be_bytes)
    }

    fn read_u64(&mut self, field: &'static str) -> Result<u64, DeltaFormatError> {
        self.read_array(field).map(u64::from_be_bytes)
    }

    /// Read one operation. Offset and length are read before the type is
    /// judged, so a short header reports `Truncated` ahead of an unknown type.
    fn read_op(&mut self) -> Result<RawOp<'a>, DeltaFormatError> {
        let op_type = self.read_u8("operation type")?;
        let offset = self.read_u64("operation offset")?;
        let length = self.read_u64("operation length")?;
        let payload = if op_type == OP_REPLACE {
            self.read_bytes(length, "operation data")?
        } else {
            &[]
        };
        Ok(RawOp {
            op_type,
            offset,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> DeltaCodec {
        DeltaCodec::new()
    }

    #[test]
    fn documented_lossy_example() {
        // 100 bytes of 'A' -> 50 bytes of 'B': the generator keeps only
        // min(50, 100 / 10) = 10 bytes of the new content.
        let old = vec![0x41u8; 100];
        let new = vec![0x42u8; 50];

        let bytes = codec().generate(&old, &new).unwrap();
        let packet = DeltaPacket::decode(&bytes).unwrap();
        assert_eq!(packet.new_size, 50);
        assert_eq!(packet.ops.len(), 1);
        assert_eq!(packet.ops[0].offset(), 0);
        assert_eq!(packet.ops[0].payload(), &[0x42u8; 10][..]);

        let result = codec().apply(&old, &bytes).unwrap();
        let mut expected = vec![0x42u8; 10];
        expected.extend_from_slice(&[0x41u8; 40]);
        assert_eq!(result, expected);
    }

    #[test]
    fn roundtrip_when_payload_covers_new_content() {
        let old = vec![7u8; 400];
        let new = b"short replacement text".to_vec();
        assert!(new.len() <= old.len() / GENERATE_DIVISOR);

        let bytes = codec().generate(&old, &new).unwrap();
        assert_eq!(codec().apply(&old, &bytes).unwrap(), new);
    }

    #[test]
    fn header_layout_matches_wire_format() {
        let old = vec![1u8; 30];
        let new = vec![2u8; 5];
        let bytes = codec().generate(&old, &new).unwrap();

        assert_eq!(&bytes[0..4], &64u32.to_be_bytes());
        assert_eq!(&bytes[4..68], content_hash(&old).as_bytes());
        assert_eq!(&bytes[68..76], &5u64.to_be_bytes());
        assert_eq!(&bytes[76..80], &1u32.to_be_bytes());
        assert_eq!(bytes[80], OP_REPLACE);
        assert_eq!(&bytes[81..89], &0u64.to_be_bytes());
        assert_eq!(&bytes[89..97], &3u64.to_be_bytes());
        assert_eq!(&bytes[97..], &[2u8, 2, 2]);
    }

    #[test]
    fn hash_gate_rejects_other_base() {
        let old = b"the original content of the file".to_vec();
        let other = b"the original content of the filE".to_vec();
        let bytes = codec().generate(&old, b"new").unwrap();

        assert_eq!(
            codec().apply(&other, &bytes),
            Err(DeltaFormatError::HashMismatch)
        );
    }

    #[test]
    fn hash_checked_before_truncated_ops() {
        let old = vec![3u8; 100];
        let mut bytes = codec().generate(&old, &[4u8; 50]).unwrap();
        bytes.truncate(bytes.len() - 3);

        assert_eq!(
            codec().apply(b"different base", &bytes),
            Err(DeltaFormatError::HashMismatch)
        );
        assert!(matches!(
            codec().apply(&old, &bytes),
            Err(DeltaFormatError::Truncated {
                field: "operation data",
                ..
            })
        ));
    }

    #[test]
    fn empty_packet_is_truncated() {
        assert!(matches!(
            codec().apply(b"x", &[]),
            Err(DeltaFormatError::Truncated {
                field: "hash length",
                offset: 0,
                ..
            })
        ));
    }

    #[test]
    fn oversized_hash_length_is_truncated() {
        let mut bytes = u32::MAX.to_be_bytes().to_vec();
        bytes.extend_from_slice(b"abc");
        assert!(matches!(
            codec().apply(b"", &bytes),
            Err(DeltaFormatError::Truncated { field: "hash", .. })
        ));
    }

    #[test]
    fn unknown_operation_is_reported() {
        let old = b"base".to_vec();
        let packet = DeltaPacket {
            base_hash: content_hash(&old).into_bytes(),
            new_size: 4,
            ops: vec![],
        };
        let mut bytes = packet.encode().unwrap();
        // Patch op_count to 1 and append an op with type 9.
        let count_at = bytes.len() - 4;
        bytes[count_at..].copy_from_slice(&1u32.to_be_bytes());
        bytes.push(9);
        bytes.extend_from_slice(&0u64.to_be_bytes());
        bytes.extend_from_slice(&0u64.to_be_bytes());

        assert_eq!(
            codec().apply(&old, &bytes),
            Err(DeltaFormatError::UnknownOperation(9))
        );
        assert_eq!(
            DeltaPacket::decode(&bytes),
            Err(DeltaFormatError::UnknownOperation(9))
        );
    }

    #[test]
    fn replace_preserves_prefix_and_suffix() {
        let old = b"0123456789".to_vec();
        let packet = DeltaPacket {
            base_hash: content_hash(&old).into_bytes(),
            new_size: 10,
            ops: vec![DeltaOp::Replace {
                offset: 3,
                payload: b"abc".to_vec(),
            }],
        };
        let result = codec().apply(&old, &packet.encode().unwrap()).unwrap();
        assert_eq!(result, b"012abc6789");
    }

    #[test]
    fn replace_past_end_is_noop() {
        let old = b"short".to_vec();
        let packet = DeltaPacket {
            base_hash: content_hash(&old).into_bytes(),
            new_size: 5,
            ops: vec![DeltaOp::Replace {
                offset: 6,
                payload: b"zz".to_vec(),
            }],
        };
        let result = codec().apply(&old, &packet.encode().unwrap()).unwrap();
        assert_eq!(result, b"short");
    }

    #[test]
    fn replace_at_end_appends() {
        let old = b"abc".to_vec();
        let packet = DeltaPacket {
            base_hash: content_hash(&old).into_bytes(),
            new_size: 5,
            ops: vec![DeltaOp::Replace {
                offset: 3,
                payload: b"de".to_vec(),
            }],
        };
        let result = codec().apply(&old, &packet.encode().unwrap()).unwrap();
        assert_eq!(result, b"abcde");
    }

    #[test]
    fn short_result_is_zero_padded() {
        let old = b"ab".to_vec();
        let packet = DeltaPacket {
            base_hash: content_hash(&old).into_bytes(),
            new_size: 5,
            ops: vec![],
        };
        let result = codec().apply(&old, &packet.encode().unwrap()).unwrap();
        assert_eq!(result, vec![b'a', b'b', 0, 0, 0]);
    }

    #[test]
    fn operations_apply_in_order() {
        let old = b"aaaaaaaa".to_vec();
        let packet = DeltaPacket {
            base_hash: content_hash(&old).into_bytes(),
            new_size: 8,
            ops: vec![
                DeltaOp::Replace {
                    offset: 0,
                    payload: b"bbbb".to_vec(),
                },
                DeltaOp::Replace {
                    offset: 2,
                    payload: b"cc".to_vec(),
                },
            ],
        };
        let result = codec().apply(&old, &packet.encode().unwrap()).unwrap();
        assert_eq!(result, b"bbccaaaa");
    }

    #[test]
    fn declared_size_over_limit_is_rejected() {
        let old = b"tiny".to_vec();
        let packet = DeltaPacket {
            base_hash: content_hash(&old).into_bytes(),
            new_size: 1 << 40,
            ops: vec![],
        };
        let codec = DeltaCodec::new().with_max_output(1024);
        assert_eq!(
            codec.apply(&old, &packet.encode().unwrap()),
            Err(DeltaFormatError::SizeLimitExceeded {
                declared: 1 << 40,
                limit: 1024
            })
        );
    }

    #[test]
    fn empty_base_yields_empty_payload() {
        let bytes = codec().generate(&[], b"anything").unwrap();
        let packet = DeltaPacket::decode(&bytes).unwrap();
        assert!(packet.ops[0].payload().is_empty());
        assert_eq!(codec().apply(&[], &bytes).unwrap(), vec![0u8; 8]);
    }

    #[test]
    fn encoded_len_matches_encoding() {
        let bytes = codec().generate(&[9u8; 1000], &[1u8; 300]).unwrap();
        let packet = DeltaPacket::decode(&bytes).unwrap();
        assert_eq!(packet.encoded_len(), bytes.len());
        assert_eq!(packet.encode().unwrap(), bytes);
    }

    #[test]
    fn content_hash_is_lowercase_hex_sha256() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
