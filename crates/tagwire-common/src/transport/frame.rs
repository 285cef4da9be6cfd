//! Frame splitting and reassembly.
//!
//! A payload of length `L` travels as `ceil(L / (F - 12))` frames, where `F`
//! is the configured maximum frame length and 12 bytes go to the header. An
//! empty payload produces zero frames. The receive side accumulates frames
//! in a [`Reassembly`], validating that `remaining_count` decrements by
//! exactly one, that `total_length` never changes, and that the accumulated
//! data never overruns the declared total; any violation is a
//! [`TagwireError::Protocol`] and the reassembly is abandoned, never merged.

use crate::protocol::error::{Result, TagwireError};

/// Size of the frame header: three u32 fields.
pub const FRAME_HEADER_LEN: usize = 12;

/// Default maximum length of one frame, header included.
pub const DEFAULT_MAX_FRAME_LEN: usize = 1400;

/// The three-field header opening every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Frames still to come after this one; 0 on the last frame.
    pub remaining_count: u32,
    /// Length of the whole reassembled payload.
    pub total_length: u32,
    /// Length of this frame's data chunk.
    pub chunk_length: u32,
}

impl FrameHeader {
    /// Serializes the header as three little-endian u32 fields.
    pub fn to_bytes(self) -> [u8; FRAME_HEADER_LEN] {
        let mut bytes = [0u8; FRAME_HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.remaining_count.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.total_length.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.chunk_length.to_le_bytes());
        bytes
    }

    /// Reads a header from its 12-byte serialized form.
    pub fn from_bytes(bytes: &[u8; FRAME_HEADER_LEN]) -> Self {
        let field = |range: std::ops::Range<usize>| {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(&bytes[range]);
            u32::from_le_bytes(buf)
        };
        FrameHeader {
            remaining_count: field(0..4),
            total_length: field(4..8),
            chunk_length: field(8..12),
        }
    }
}

/// Number of frames a payload of `payload_len` bytes occupies.
pub fn frame_count(payload_len: usize, max_frame_len: usize) -> usize {
    payload_len.div_ceil(chunk_capacity(max_frame_len))
}

/// Data bytes one frame can carry.
pub fn chunk_capacity(max_frame_len: usize) -> usize {
    max_frame_len - FRAME_HEADER_LEN
}

/// Splits a payload into wire-ready frames (header plus chunk each).
///
/// An empty payload yields no frames; the peer observes nothing on the wire.
pub fn split_frames(payload: &[u8], max_frame_len: usize) -> Vec<Vec<u8>> {
    let capacity = chunk_capacity(max_frame_len);
    let count = payload.len().div_ceil(capacity);

    let mut frames = Vec::with_capacity(count);
    for (index, chunk) in payload.chunks(capacity).enumerate() {
        let header = FrameHeader {
            remaining_count: (count - index - 1) as u32,
            total_length: payload.len() as u32,
            chunk_length: chunk.len() as u32,
        };

        let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + chunk.len());
        frame.extend_from_slice(&header.to_bytes());
        frame.extend_from_slice(chunk);
        frames.push(frame);
    }
    frames
}

/// Accumulates the frames of one payload.
#[derive(Debug)]
pub struct Reassembly {
    remaining_count: u32,
    total_length: u32,
    buffer: Vec<u8>,
}

impl Reassembly {
    /// Starts a reassembly from the first frame of a payload.
    pub fn begin(header: FrameHeader, chunk: &[u8]) -> Result<Self> {
        check_chunk(header, chunk)?;
        if header.chunk_length > header.total_length {
            return Err(TagwireError::Protocol(format!(
                "first frame carries {} bytes of a {}-byte payload",
                header.chunk_length, header.total_length
            )));
        }

        let mut buffer = Vec::with_capacity(header.total_length as usize);
        buffer.extend_from_slice(chunk);
        Ok(Reassembly {
            remaining_count: header.remaining_count,
            total_length: header.total_length,
            buffer,
        })
    }

    /// Adds a subsequent frame, validating it against the first.
    ///
    /// # Errors
    ///
    /// [`TagwireError::Protocol`] when the frame arrives after completion,
    /// skips a `remaining_count` value, changes `total_length`, or would
    /// overrun the declared payload length.
    pub fn push(&mut self, header: FrameHeader, chunk: &[u8]) -> Result<()> {
        if self.is_complete() {
            return Err(TagwireError::Protocol(
                "frame received after reassembly completed".into(),
            ));
        }
        if header.remaining_count != self.remaining_count - 1 {
            return Err(TagwireError::Protocol(format!(
                "remaining count jumped from {} to {}",
                self.remaining_count, header.remaining_count
            )));
        }
        if header.total_length != self.total_length {
            return Err(TagwireError::Protocol(format!(
                "total length changed from {} to {}",
                self.total_length, header.total_length
            )));
        }
        check_chunk(header, chunk)?;
        if self.buffer.len() + chunk.len() > self.total_length as usize {
            return Err(TagwireError::Protocol(format!(
                "frames carry more than the declared {} bytes",
                self.total_length
            )));
        }

        self.remaining_count = header.remaining_count;
        self.buffer.extend_from_slice(chunk);
        Ok(())
    }

    /// True once the last frame (`remaining_count == 0`) has been added.
    pub fn is_complete(&self) -> bool {
        self.remaining_count == 0
    }

    /// Finishes the reassembly, yielding the payload bytes.
    pub fn into_payload(self) -> Result<Vec<u8>> {
        if !self.is_complete() {
            return Err(TagwireError::Protocol(format!(
                "reassembly still awaits {} frames",
                self.remaining_count
            )));
        }
        if self.buffer.len() != self.total_length as usize {
            return Err(TagwireError::Protocol(format!(
                "reassembled {} bytes of a declared {}",
                self.buffer.len(),
                self.total_length
            )));
        }
        Ok(self.buffer)
    }
}

fn check_chunk(header: FrameHeader, chunk: &[u8]) -> Result<()> {
    if chunk.len() != header.chunk_length as usize {
        return Err(TagwireError::Protocol(format!(
            "frame header declares {} chunk bytes, {} supplied",
            header.chunk_length,
            chunk.len()
        )));
    }
    Ok(())
}
