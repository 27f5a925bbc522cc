//! Keyframe animation binary format (.tskanim)
//!
//! Animation clip format containing one sampled affine transform per bone per
//! frame. POD format with minimal header - no magic bytes.
//!
//! # Layout
//! ```text
//! Header (4 bytes):
//! 0x00: bone_count u8        - Number of bones per frame (max 255)
//! 0x01: flags u8             - Reserved, must be 0
//! 0x02: frame_count u16 LE   - Total number of frames (max 65535)
//!
//! Frame Data (frame_count × bone_count × 48 bytes):
//! Each bone transform is a row-major 3×4 matrix of 12 f32 LE values.
//! ```
//!
//! Frame data is stored sequentially: [frame0_bone0, frame0_bone1, ..., frame1_bone0, ...]
//! Bone `n` of a frame is the transform of bone index `n + 1` (bone indices are 1-based).

mod header;


pub use header::KeyframesHeader;

use crate::math::BoneMatrix3x4;

/// Errors produced while decoding a keyframe file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyframeFileError {
    #[error("keyframe data too short for header ({0} bytes)")]
    TruncatedHeader(usize),

    #[error("invalid keyframe header (bones={bone_count}, frames={frame_count}, flags={flags})")]
    InvalidHeader {
        bone_count: u8,
        frame_count: u16,
        flags: u8,
    },

    #[error("keyframe data size mismatch: expected {expected} bytes, found {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("frame {frame} has {actual} bones, expected {expected}")]
    InconsistentFrame {
        frame: usize,
        expected: usize,
        actual: usize,
    },

    #[error("too many {what}: {count} (max {max})")]
    TooMany {
        what: &'static str,
        count: usize,
        max: usize,
    },
}

/// Decoded keyframe animation: `frames[f][b]` is bone `b + 1` at frame `f`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyframeData {
    pub bone_count: u8,
    pub frames: Vec<Vec<BoneMatrix3x4>>,
}

/// Decode a keyframe file from bytes
pub fn decode_keyframes(bytes: &[u8]) -> Result<KeyframeData, KeyframeFileError> {
    let header =
        KeyframesHeader::from_bytes(bytes).ok_or(KeyframeFileError::TruncatedHeader(bytes.len()))?;

    if !header.validate() {
        return Err(KeyframeFileError::InvalidHeader {
            bone_count: header.bone_count,
            frame_count: header.frame_count,
            flags: header.flags,
        });
    }

    if bytes.len() != header.file_size() {
        return Err(KeyframeFileError::SizeMismatch {
            expected: header.file_size(),
            actual: bytes.len(),
        });
    }

    let frames = bytes[KeyframesHeader::SIZE..]
        .chunks_exact(header.frame_size())
        .map(|frame| {
            frame
                .chunks_exact(BoneMatrix3x4::SIZE)
                .filter_map(BoneMatrix3x4::from_bytes)
                .collect::<Vec<_>>()
        })
        .collect();

    Ok(KeyframeData {
        bone_count: header.bone_count,
        frames,
    })
}

/// Encode keyframes into the binary layout
///
/// Every frame must carry exactly `bone_count` transforms, and both counts
/// must be non-zero.
pub fn encode_keyframes(
    bone_count: usize,
    frames: &[Vec<BoneMatrix3x4>],
) -> Result<Vec<u8>, KeyframeFileError> {
    if bone_count > u8::MAX as usize {
        return Err(KeyframeFileError::TooMany {
            what: "bones",
            count: bone_count,
            max: u8::MAX as usize,
        });
    }
    if frames.len() > u16::MAX as usize {
        return Err(KeyframeFileError::TooMany {
            what: "frames",
            count: frames.len(),
            max: u16::MAX as usize,
        });
    }

    let header = KeyframesHeader::new(bone_count as u8, frames.len() as u16);
    // Refuse anything the decoder would reject.
    if !header.validate() {
        return Err(KeyframeFileError::InvalidHeader {
            bone_count: header.bone_count,
            frame_count: header.frame_count,
            flags: header.flags,
        });
    }

    let mut bytes = Vec::with_capacity(header.file_size());
    bytes.extend_from_slice(&header.to_bytes());

    for (index, frame) in frames.iter().enumerate() {
        if frame.len() != bone_count {
            return Err(KeyframeFileError::InconsistentFrame {
                frame: index,
                expected: bone_count,
                actual: frame.len(),
            });
        }
        for matrix in frame {
            bytes.extend_from_slice(&matrix.to_bytes());
        }
    }

    Ok(bytes)
}
