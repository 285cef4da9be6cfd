//! Tagwire Common Types and Transport
//!
//! This crate provides the core protocol definitions and framed TCP transport
//! for the tagwire RPC system.
//!
//! # Overview
//!
//! Tagwire is a small RPC system built on a self-describing typed wire format.
//! A server exposes named procedures with declared parameter and return
//! shapes; a client invokes them by name, and strings, unsigned integers,
//! sequences, and maps (nested to any depth) are marshalled transparently in
//! both directions. This crate contains the pieces shared by every component:
//!
//! - **Element Layer**: the tagged wire values and their textual codec
//! - **Marshalling Layer**: shape descriptors and native-value conversion
//! - **Protocol Layer**: call/reply payload construction, fault replies, errors
//! - **Transport Layer**: packet framing and blocking TCP send/receive
//!
//! # Wire Format
//!
//! Each logical message is a single encoded element using the grammar
//! `<TT hexlen>payload`, carried over TCP in bounded frames with a 12-byte
//! header (`remaining_count`, `total_length`, `chunk_length`, each a
//! little-endian u32). A call is `Tuple[Str(procedure), Tuple(arguments)]`
//! and a reply is one element representing the return value.
//!
//! # Components
//!
//! - [`element`] - Tagged wire values ([`Element`]) and the encode/decode pair
//! - [`marshal`] - [`Shape`]/[`Value`] descriptors and recursive marshalling
//! - [`protocol`] - Call payloads, fault replies, and the error taxonomy
//! - [`transport`] - Frame split/reassembly and the blocking [`FrameTransport`]
//! - [`config`] - Tunable ports, frame size, and intervals
//!
//! # Example
//!
//! ```
//! use tagwire_common::element::{codec, Element};
//!
//! let call = Element::Tuple(vec![
//!     Element::Str("echo".into()),
//!     Element::Tuple(vec![Element::Str("hello".into())]),
//! ]);
//!
//! let encoded = codec::encode(&call);
//! let decoded = codec::decode(encoded.as_bytes()).unwrap();
//! assert_eq!(call, decoded);
//! ```

pub mod config;
pub mod element;
pub mod marshal;
pub mod protocol;
pub mod transport;

pub use config::Config;
pub use element::Element;
pub use marshal::{Shape, Value};
pub use protocol::{Result, TagwireError};
pub use transport::FrameTransport;
