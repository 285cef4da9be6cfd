//! Tagwire Transport Layer
//!
//! This module carries one logical text payload per operation over a TCP
//! stream, splitting it into bounded frames on send and reassembling it on
//! receive.
//!
//! # Architecture
//!
//! - **[`frame`]**: pure frame splitting and [`Reassembly`]; owns no socket
//! - **[`tcp`]**: the blocking [`FrameTransport`] driving real streams
//!
//! # Wire Format
//!
//! Each frame is a 12-byte header of three little-endian u32 fields
//! (`remaining_count`, `total_length`, `chunk_length`) followed by
//! `chunk_length` bytes of data. `remaining_count` counts down to 0 on the
//! last frame of a payload; every frame of one payload repeats the same
//! `total_length`.

pub mod frame;
pub mod tcp;

pub use frame::{split_frames, FrameHeader, Reassembly, FRAME_HEADER_LEN};
pub use tcp::FrameTransport;
