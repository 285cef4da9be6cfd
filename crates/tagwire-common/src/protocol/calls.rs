//! Call payload construction and parsing.

use crate::element::{codec, Element};
use crate::protocol::error::{Result, TagwireError};

/// Encodes a call payload: `Tuple[Str(procedure), Tuple(arguments)]`.
///
/// # Example
///
/// ```
/// use tagwire_common::element::Element;
/// use tagwire_common::protocol::{decode_call, encode_call};
///
/// let payload = encode_call("echo", vec![Element::Str("hi".into())]);
/// let (name, args) = decode_call(payload.as_bytes()).unwrap();
/// assert_eq!(name, "echo");
/// assert_eq!(args, vec![Element::Str("hi".into())]);
/// ```
pub fn encode_call(procedure: &str, arguments: Vec<Element>) -> String {
    codec::encode(&Element::Tuple(vec![
        Element::Str(procedure.to_owned()),
        Element::Tuple(arguments),
    ]))
}

/// Decodes a call payload into its procedure name and positional arguments.
///
/// # Errors
///
/// Fails with [`TagwireError::Format`] if the payload is not a two-element
/// tuple of a string followed by a tuple.
pub fn decode_call(payload: &[u8]) -> Result<(String, Vec<Element>)> {
    let element = codec::decode(payload)?;
    let children = element.as_tuple()?;
    if children.len() != 2 {
        return Err(TagwireError::Format(format!(
            "call payload has {} elements, expected name and arguments",
            children.len()
        )));
    }

    let name = children[0].as_str()?.to_owned();
    let arguments = children[1].as_tuple()?.to_vec();
    Ok((name, arguments))
}
