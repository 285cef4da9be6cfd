//! Tagged wire values.
//!
//! An [`Element`] is one value in the tagwire wire format: a string, an
//! unsigned 32-bit integer, an ordered tuple of elements, or a map of
//! elements. Composite elements nest to arbitrary depth. The textual
//! encoding lives in [`codec`].
//!
//! Map entries are keyed by the *canonical encoding* of the key element, so
//! two maps holding the same entries compare equal regardless of insertion
//! order, and encoding a map always emits its entries in one canonical
//! order.

pub mod codec;

use std::collections::BTreeMap;

use crate::protocol::error::{Result, TagwireError};

/// Length of a type tag in characters.
pub const TAG_LEN: usize = 2;

/// Type tag for string elements.
pub const STRING_TAG: &str = "SS";
/// Type tag for unsigned 32-bit integer elements.
pub const UINT32_TAG: &str = "U4";
/// Type tag for tuple elements.
pub const TUPLE_TAG: &str = "TP";
/// Type tag for map elements.
pub const MAP_TAG: &str = "MP";

/// Type tag reserved for signed 32-bit integers. No element variant carries
/// it yet; the decoder rejects it like any unknown tag.
pub const INT32_TAG: &str = "I4";
/// Type tag reserved for 64-bit reals. Unused, as [`INT32_TAG`].
pub const REAL64_TAG: &str = "R8";

/// One tagged value in the wire format.
///
/// # Example
///
/// ```
/// use tagwire_common::element::Element;
///
/// let pair = Element::Tuple(vec![
///     Element::Str("count".into()),
///     Element::U32(3),
/// ]);
/// assert_eq!(pair.tag(), "TP");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// UTF-8 string, tag `SS`.
    Str(String),
    /// Unsigned 32-bit integer, tag `U4`.
    U32(u32),
    /// Ordered heterogeneous sequence of elements, tag `TP`.
    Tuple(Vec<Element>),
    /// Keyed collection of elements, tag `MP`. Keys are the canonical
    /// encoding of the key element.
    Map(BTreeMap<String, Element>),
}

impl Element {
    /// The two-character type tag of this element.
    pub fn tag(&self) -> &'static str {
        match self {
            Element::Str(_) => STRING_TAG,
            Element::U32(_) => UINT32_TAG,
            Element::Tuple(_) => TUPLE_TAG,
            Element::Map(_) => MAP_TAG,
        }
    }

    /// Builds a map element from key/value element pairs.
    ///
    /// Keys are canonicalized through their encoding; a duplicate key keeps
    /// the last value, as in a plain map insert.
    pub fn map_from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Element, Element)>,
    {
        let mut entries = BTreeMap::new();
        for (key, value) in pairs {
            entries.insert(codec::encode(&key), value);
        }
        Element::Map(entries)
    }

    /// Borrows the string payload, or fails with a tag mismatch.
    pub fn as_str(&self) -> Result<&str> {
        match self {
            Element::Str(s) => Ok(s),
            other => Err(tag_mismatch(STRING_TAG, other)),
        }
    }

    /// Returns the integer payload, or fails with a tag mismatch.
    pub fn as_u32(&self) -> Result<u32> {
        match self {
            Element::U32(v) => Ok(*v),
            other => Err(tag_mismatch(UINT32_TAG, other)),
        }
    }

    /// Borrows the tuple children, or fails with a tag mismatch.
    pub fn as_tuple(&self) -> Result<&[Element]> {
        match self {
            Element::Tuple(children) => Ok(children),
            other => Err(tag_mismatch(TUPLE_TAG, other)),
        }
    }

    /// Decodes the map entries back into key/value element pairs, in
    /// canonical key order.
    pub fn map_pairs(&self) -> Result<Vec<(Element, Element)>> {
        match self {
            Element::Map(entries) => {
                let mut pairs = Vec::with_capacity(entries.len());
                for (key_text, value) in entries {
                    let key = codec::decode(key_text.as_bytes())?;
                    pairs.push((key, value.clone()));
                }
                Ok(pairs)
            }
            other => Err(tag_mismatch(MAP_TAG, other)),
        }
    }
}

fn tag_mismatch(expected: &str, got: &Element) -> TagwireError {
    TagwireError::Format(format!(
        "expected a '{}' element, got '{}'",
        expected,
        got.tag()
    ))
}

#[cfg(test)]
mod tests;
