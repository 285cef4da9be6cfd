//! Blocking framed TCP transport.
//!
//! [`FrameTransport`] sends and receives one logical payload per call over a
//! `std::net::TcpStream`, using the frame protocol from [`super::frame`].
//! Every operation blocks the calling thread until the OS completes the I/O
//! or the peer disconnects.
//!
//! # Example
//!
//! ```no_run
//! use tagwire_common::transport::FrameTransport;
//!
//! let transport = FrameTransport::with_defaults();
//! let mut stream = FrameTransport::connect("127.0.0.1:23521").unwrap();
//!
//! transport.send_text(&mut stream, "hello").unwrap();
//! let reply = transport.receive_text(&mut stream).unwrap();
//! ```

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use super::frame::{
    chunk_capacity, split_frames, FrameHeader, Reassembly, DEFAULT_MAX_FRAME_LEN,
    FRAME_HEADER_LEN,
};
use crate::protocol::error::{Result, TagwireError};

/// Blocking transport carrying framed payloads over a TCP stream.
#[derive(Debug, Clone, Copy)]
pub struct FrameTransport {
    max_frame_len: usize,
}

impl FrameTransport {
    /// Creates a transport with the given maximum frame length (header
    /// included).
    ///
    /// # Errors
    ///
    /// Fails with [`TagwireError::Config`] when the frame length leaves no
    /// room for data after the header.
    pub fn new(max_frame_len: usize) -> Result<Self> {
        if max_frame_len <= FRAME_HEADER_LEN {
            return Err(TagwireError::Config(format!(
                "max frame length {max_frame_len} leaves no room for data after the {FRAME_HEADER_LEN}-byte header"
            )));
        }
        Ok(Self { max_frame_len })
    }

    /// Creates a transport with the default 1400-byte frames.
    pub fn with_defaults() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// The configured maximum frame length.
    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    /// Connects to a remote endpoint.
    ///
    /// Resolves the address (which may resolve to several addresses) and
    /// attempts each until one succeeds.
    pub fn connect(addr: &str) -> Result<TcpStream> {
        let socket_addrs = addr
            .to_socket_addrs()
            .map_err(|e| TagwireError::Connection(format!("invalid address '{addr}': {e}")))?;

        let mut last_err = None;
        for socket_addr in socket_addrs {
            match TcpStream::connect(socket_addr) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }

        Err(TagwireError::Connection(format!(
            "failed to connect to {addr}: {}",
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no addresses resolved".to_owned())
        )))
    }

    /// Sends one text payload as a sequence of frames.
    pub fn send_text(&self, stream: &mut TcpStream, text: &str) -> Result<()> {
        self.send_message(stream, text.as_bytes())
    }

    /// Receives one text payload, or `None` on a clean disconnect.
    ///
    /// # Errors
    ///
    /// [`TagwireError::Format`] if the payload is not valid UTF-8, plus the
    /// errors of [`FrameTransport::receive_message`].
    pub fn receive_text(&self, stream: &mut TcpStream) -> Result<Option<String>> {
        match self.receive_message(stream)? {
            None => Ok(None),
            Some(payload) => String::from_utf8(payload)
                .map(Some)
                .map_err(|_| TagwireError::Format("payload is not valid UTF-8".into())),
        }
    }

    /// Sends one byte payload as a sequence of frames.
    ///
    /// An empty payload emits zero frames, so the peer sees nothing; an
    /// empty message is indistinguishable from silence on this wire.
    pub fn send_message(&self, stream: &mut TcpStream, data: &[u8]) -> Result<()> {
        for frame in split_frames(data, self.max_frame_len) {
            stream
                .write_all(&frame)
                .map_err(|e| map_io_error(e, "writing frame"))?;
        }
        stream.flush().map_err(|e| map_io_error(e, "flushing stream"))?;
        Ok(())
    }

    /// Receives one byte payload, reassembling its frames.
    ///
    /// Returns `None` when the peer closed the connection before the first
    /// header byte (a clean disconnect).
    ///
    /// # Errors
    ///
    /// - [`TagwireError::Disconnected`] if the peer vanishes mid-payload
    /// - [`TagwireError::Protocol`] on inconsistent frame headers
    pub fn receive_message(&self, stream: &mut TcpStream) -> Result<Option<Vec<u8>>> {
        let header = match self.read_first_header(stream)? {
            None => return Ok(None),
            Some(header) => header,
        };
        let chunk = self.read_chunk(stream, header)?;
        let mut reassembly = Reassembly::begin(header, &chunk)?;

        while !reassembly.is_complete() {
            let header = self.read_header(stream)?;
            let chunk = self.read_chunk(stream, header)?;
            reassembly.push(header, &chunk)?;
        }

        reassembly.into_payload().map(Some)
    }

    /// Reads the first frame header of a payload, detecting a clean
    /// disconnect on a zero-byte first read.
    fn read_first_header(&self, stream: &mut TcpStream) -> Result<Option<FrameHeader>> {
        let mut buf = [0u8; FRAME_HEADER_LEN];
        let first = stream
            .read(&mut buf)
            .map_err(|e| map_io_error(e, "reading frame header"))?;
        if first == 0 {
            return Ok(None);
        }

        stream
            .read_exact(&mut buf[first..])
            .map_err(|e| map_io_error(e, "reading frame header"))?;
        Ok(Some(FrameHeader::from_bytes(&buf)))
    }

    fn read_header(&self, stream: &mut TcpStream) -> Result<FrameHeader> {
        let mut buf = [0u8; FRAME_HEADER_LEN];
        stream
            .read_exact(&mut buf)
            .map_err(|e| map_io_error(e, "reading frame header"))?;
        Ok(FrameHeader::from_bytes(&buf))
    }

    fn read_chunk(&self, stream: &mut TcpStream, header: FrameHeader) -> Result<Vec<u8>> {
        let capacity = chunk_capacity(self.max_frame_len);
        if header.chunk_length as usize > capacity {
            return Err(TagwireError::Protocol(format!(
                "frame declares a {}-byte chunk, over the {capacity}-byte capacity",
                header.chunk_length
            )));
        }

        let mut chunk = vec![0u8; header.chunk_length as usize];
        stream
            .read_exact(&mut chunk)
            .map_err(|e| map_io_error(e, "reading frame data"))?;
        Ok(chunk)
    }
}

/// Maps IO errors into the transport taxonomy: anything that means "the
/// peer went away" becomes [`TagwireError::Disconnected`].
fn map_io_error(err: std::io::Error, context: &str) -> TagwireError {
    match err.kind() {
        std::io::ErrorKind::UnexpectedEof
        | std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::ConnectionAborted
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::NotConnected => {
            TagwireError::Disconnected(format!("{context}: connection lost"))
        }
        _ => TagwireError::Io(err),
    }
}
