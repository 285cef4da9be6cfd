//! Reply payloads and the fault convention.
//!
//! A normal reply is one encoded element. A fault reply reuses the reserved
//! dunder-name convention of the wire protocol: a tuple
//! `[Str("__fault"), Str(kind), Str(message)]`. Dispatch answers calls to
//! unregistered procedures and failing handlers with faults instead of
//! dropping them, and [`decode_reply`] turns a fault back into the matching
//! typed error on the caller's side.

use crate::element::{codec, Element};
use crate::protocol::error::{Result, TagwireError};

/// Marker string opening every fault reply tuple.
pub const FAULT_MARKER: &str = "__fault";

/// Fault kind for calls naming no registered procedure.
pub const FAULT_UNKNOWN_PROCEDURE: &str = "unknown-procedure";

/// Fault kind for handlers that returned an error.
pub const FAULT_EXECUTION: &str = "execution";

/// Encodes a successful reply payload.
pub fn encode_reply(result: &Element) -> String {
    codec::encode(result)
}

/// Encodes a fault reply payload.
pub fn encode_fault(kind: &str, message: &str) -> String {
    codec::encode(&Element::Tuple(vec![
        Element::Str(FAULT_MARKER.to_owned()),
        Element::Str(kind.to_owned()),
        Element::Str(message.to_owned()),
    ]))
}

/// Recognizes the fault shape, returning its kind and message.
pub fn fault_of(element: &Element) -> Option<(&str, &str)> {
    let children = match element {
        Element::Tuple(children) if children.len() == 3 => children,
        _ => return None,
    };
    match (&children[0], &children[1], &children[2]) {
        (Element::Str(marker), Element::Str(kind), Element::Str(message))
            if marker == FAULT_MARKER =>
        {
            Some((kind, message))
        }
        _ => None,
    }
}

/// Decodes a reply payload, mapping fault replies to typed errors.
///
/// # Errors
///
/// - [`TagwireError::Format`] if the payload is not a well-formed element
/// - [`TagwireError::UnknownProcedure`] for an `unknown-procedure` fault
/// - [`TagwireError::Fault`] for any other fault kind
pub fn decode_reply(payload: &[u8]) -> Result<Element> {
    let element = codec::decode(payload)?;
    match fault_of(&element) {
        Some((FAULT_UNKNOWN_PROCEDURE, message)) => {
            Err(TagwireError::UnknownProcedure(message.to_owned()))
        }
        Some((kind, message)) => Err(TagwireError::Fault(format!("{kind}: {message}"))),
        None => Ok(element),
    }
}
