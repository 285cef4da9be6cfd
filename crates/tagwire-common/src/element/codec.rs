//! Textual codec for [`Element`] values.
//!
//! # Wire Grammar
//!
//! ```text
//! <TT LEN>PAYLOAD
//! ```
//!
//! `TT` is the two-character type tag, followed by a single space, `LEN` is
//! the payload length in bytes as lowercase hexadecimal (no fixed width,
//! terminated by `>`), and `PAYLOAD` is exactly `LEN` bytes:
//!
//! - `SS` - the raw UTF-8 bytes of the string
//! - `U4` - the value as lowercase hexadecimal text
//! - `TP` - the concatenated encodings of each child, decoded by reapplying
//!   the grammar until the payload is exhausted
//! - `MP` - alternating key/value encodings, decoded two elements at a time
//!
//! A child decoder is bounded to the payload slice its parent extracted, so
//! a corrupt length in one element can never read into a sibling's bytes.
//!
//! Encoding is total; decoding fails with [`TagwireError::Format`] on any
//! malformed input.

use std::str;

use super::{Element, MAP_TAG, STRING_TAG, TAG_LEN, TUPLE_TAG, UINT32_TAG};
use crate::protocol::error::{Result, TagwireError};

/// Encodes an element into its wire text.
///
/// # Example
///
/// ```
/// use tagwire_common::element::{codec, Element};
///
/// assert_eq!(codec::encode(&Element::Str("hello".into())), "<SS 5>hello");
/// assert_eq!(codec::encode(&Element::U32(255)), "<U4 2>ff");
/// ```
pub fn encode(element: &Element) -> String {
    match element {
        Element::Str(s) => wrap(STRING_TAG, s),
        Element::U32(v) => wrap(UINT32_TAG, &format!("{v:x}")),
        Element::Tuple(children) => {
            let body: String = children.iter().map(encode).collect();
            wrap(TUPLE_TAG, &body)
        }
        Element::Map(entries) => {
            let mut body = String::new();
            for (key_text, value) in entries {
                body.push_str(key_text);
                body.push_str(&encode(value));
            }
            wrap(MAP_TAG, &body)
        }
    }
}

fn wrap(tag: &str, payload: &str) -> String {
    format!("<{tag} {:x}>{payload}", payload.len())
}

/// Decodes one element from `input`, requiring the whole slice to be
/// consumed.
///
/// Frames deliver exactly one logical message, so trailing bytes always
/// indicate corruption and are rejected.
pub fn decode(input: &[u8]) -> Result<Element> {
    let mut pos = 0;
    let element = decode_at(input, &mut pos)?;
    if pos != input.len() {
        return Err(TagwireError::Format(format!(
            "{} trailing bytes after element",
            input.len() - pos
        )));
    }
    Ok(element)
}

/// Decodes one element starting at `*pos`, advancing `*pos` past it.
fn decode_at(input: &[u8], pos: &mut usize) -> Result<Element> {
    expect_byte(input, pos, b'<')?;
    let tag_bytes = take(input, pos, TAG_LEN)?;
    let tag = str::from_utf8(tag_bytes)
        .map_err(|_| TagwireError::Format("type tag is not valid UTF-8".into()))?
        .to_owned();
    expect_byte(input, pos, b' ')?;

    let len = read_hex_len(input, pos)?;
    let payload = take(input, pos, len)?;

    match tag.as_str() {
        STRING_TAG => Ok(Element::Str(payload_str(payload)?.to_owned())),
        UINT32_TAG => {
            let text = payload_str(payload)?;
            let value = u32::from_str_radix(text, 16).map_err(|_| {
                TagwireError::Format(format!("malformed u32 payload '{text}'"))
            })?;
            Ok(Element::U32(value))
        }
        TUPLE_TAG => {
            let mut children = Vec::new();
            let mut child_pos = 0;
            while child_pos < payload.len() {
                children.push(decode_at(payload, &mut child_pos)?);
            }
            Ok(Element::Tuple(children))
        }
        MAP_TAG => {
            let mut entries = std::collections::BTreeMap::new();
            let mut entry_pos = 0;
            while entry_pos < payload.len() {
                let key = decode_at(payload, &mut entry_pos)?;
                if entry_pos >= payload.len() {
                    return Err(TagwireError::Format(
                        "map payload ends after a key with no value".into(),
                    ));
                }
                let value = decode_at(payload, &mut entry_pos)?;
                entries.insert(encode(&key), value);
            }
            Ok(Element::Map(entries))
        }
        other => Err(TagwireError::Format(format!("unrecognized type tag '{other}'"))),
    }
}

/// Reads the lowercase-hex length field up to its `>` terminator.
fn read_hex_len(input: &[u8], pos: &mut usize) -> Result<usize> {
    let start = *pos;
    loop {
        let byte = *input.get(*pos).ok_or_else(|| {
            TagwireError::Format("input ends inside a length field".into())
        })?;
        *pos += 1;
        if byte == b'>' {
            break;
        }
    }
    let digits = &input[start..*pos - 1];
    if digits.is_empty() {
        return Err(TagwireError::Format("empty length field".into()));
    }
    let text = str::from_utf8(digits)
        .map_err(|_| TagwireError::Format("length field is not valid UTF-8".into()))?;
    usize::from_str_radix(text, 16)
        .map_err(|_| TagwireError::Format(format!("malformed length field '{text}'")))
}

fn expect_byte(input: &[u8], pos: &mut usize, expected: u8) -> Result<()> {
    match input.get(*pos) {
        Some(&byte) if byte == expected => {
            *pos += 1;
            Ok(())
        }
        Some(&byte) => Err(TagwireError::Format(format!(
            "expected '{}' at offset {}, got '{}'",
            expected as char, *pos, byte as char
        ))),
        None => Err(TagwireError::Format(format!(
            "input ends where '{}' was expected",
            expected as char
        ))),
    }
}

fn take<'a>(input: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8]> {
    let end = pos.checked_add(len).filter(|&end| end <= input.len()).ok_or_else(|| {
        TagwireError::Format(format!(
            "payload declares {} bytes but only {} remain",
            len,
            input.len().saturating_sub(*pos)
        ))
    })?;
    let slice = &input[*pos..end];
    *pos = end;
    Ok(slice)
}

fn payload_str(payload: &[u8]) -> Result<&str> {
    str::from_utf8(payload)
        .map_err(|_| TagwireError::Format("payload is not valid UTF-8".into()))
}
