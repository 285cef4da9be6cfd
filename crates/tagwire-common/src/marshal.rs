//! Shape descriptors and native-value marshalling.
//!
//! Procedures declare their parameter and return types as [`Shape`]
//! descriptors, a closed set covering the two live primitives plus
//! homogeneous sequences and maps, nested to any depth. Native data moves
//! through the system as [`Value`]s, and one recursive [`marshal`] /
//! [`unmarshal`] pair converts between values and wire [`Element`]s,
//! dispatching on the shape tag.
//!
//! The mapping is symmetric: a `Value` marshalled on one side of a
//! connection unmarshals to an equal `Value` on the other, for arguments
//! and return values alike. Sequences travel as homogeneous tuples (`TP`)
//! and maps as `MP` elements.

use std::collections::BTreeMap;
use std::fmt;

use crate::element::{codec, Element};
use crate::protocol::error::{Result, TagwireError};

/// Declared type of one procedure parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// UTF-8 string.
    Str,
    /// Unsigned 32-bit integer.
    U32,
    /// Homogeneous sequence of the inner shape.
    Seq(Box<Shape>),
    /// Map from key shape to value shape.
    Map(Box<Shape>, Box<Shape>),
}

impl Shape {
    /// Shorthand for a sequence shape.
    pub fn seq(inner: Shape) -> Shape {
        Shape::Seq(Box::new(inner))
    }

    /// Shorthand for a map shape.
    pub fn map(key: Shape, value: Shape) -> Shape {
        Shape::Map(Box::new(key), Box::new(value))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Str => write!(f, "str"),
            Shape::U32 => write!(f, "u32"),
            Shape::Seq(inner) => write!(f, "seq<{inner}>"),
            Shape::Map(key, value) => write!(f, "map<{key}, {value}>"),
        }
    }
}

/// A native value as seen by handlers and callers.
///
/// Map entries are held as pairs; equality after a round trip is canonical
/// because the wire map orders entries by their encoded keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    U32(u32),
    Seq(Vec<Value>),
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Short name of this value's variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Str(_) => "str",
            Value::U32(_) => "u32",
            Value::Seq(_) => "seq",
            Value::Map(_) => "map",
        }
    }

    /// Borrows the string payload, or fails with a shape mismatch.
    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(shape_mismatch(&Shape::Str, other.kind())),
        }
    }

    /// Returns the integer payload, or fails with a shape mismatch.
    pub fn as_u32(&self) -> Result<u32> {
        match self {
            Value::U32(v) => Ok(*v),
            other => Err(shape_mismatch(&Shape::U32, other.kind())),
        }
    }

    /// Borrows the sequence items, or fails with a shape mismatch.
    pub fn as_seq(&self) -> Result<&[Value]> {
        match self {
            Value::Seq(items) => Ok(items),
            other => Err(TagwireError::Format(format!(
                "expected a sequence value, got {}",
                other.kind()
            ))),
        }
    }

    /// Borrows the map pairs, or fails with a shape mismatch.
    pub fn as_map(&self) -> Result<&[(Value, Value)]> {
        match self {
            Value::Map(pairs) => Ok(pairs),
            other => Err(TagwireError::Format(format!(
                "expected a map value, got {}",
                other.kind()
            ))),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U32(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Seq(items)
    }
}

/// Marshals a value into a wire element, validating it against `shape`.
///
/// # Errors
///
/// Fails with [`TagwireError::Format`] when the value's variant does not
/// match the declared shape, at any nesting depth.
pub fn marshal(value: &Value, shape: &Shape) -> Result<Element> {
    match (value, shape) {
        (Value::Str(s), Shape::Str) => Ok(Element::Str(s.clone())),
        (Value::U32(v), Shape::U32) => Ok(Element::U32(*v)),
        (Value::Seq(items), Shape::Seq(inner)) => {
            let children = items
                .iter()
                .map(|item| marshal(item, inner))
                .collect::<Result<Vec<_>>>()?;
            Ok(Element::Tuple(children))
        }
        (Value::Map(pairs), Shape::Map(key_shape, value_shape)) => {
            let mut entries = BTreeMap::new();
            for (key, value) in pairs {
                let key_element = marshal(key, key_shape)?;
                entries.insert(codec::encode(&key_element), marshal(value, value_shape)?);
            }
            Ok(Element::Map(entries))
        }
        (value, shape) => Err(shape_mismatch(shape, value.kind())),
    }
}

/// Unmarshals a wire element into a native value, validating it against
/// `shape`.
///
/// # Errors
///
/// Fails with [`TagwireError::Format`] on a tag/shape mismatch at any
/// nesting depth.
pub fn unmarshal(element: &Element, shape: &Shape) -> Result<Value> {
    match (element, shape) {
        (Element::Str(s), Shape::Str) => Ok(Value::Str(s.clone())),
        (Element::U32(v), Shape::U32) => Ok(Value::U32(*v)),
        (Element::Tuple(children), Shape::Seq(inner)) => {
            let items = children
                .iter()
                .map(|child| unmarshal(child, inner))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Seq(items))
        }
        (Element::Map(_), Shape::Map(key_shape, value_shape)) => {
            let mut pairs = Vec::new();
            for (key, value) in element.map_pairs()? {
                pairs.push((unmarshal(&key, key_shape)?, unmarshal(&value, value_shape)?));
            }
            Ok(Value::Map(pairs))
        }
        (element, shape) => Err(TagwireError::Format(format!(
            "expected a {shape} element, got '{}'",
            element.tag()
        ))),
    }
}

/// Marshals a value without a declared shape. Total: every value variant
/// has exactly one element tag.
pub fn value_to_element(value: &Value) -> Element {
    match value {
        Value::Str(s) => Element::Str(s.clone()),
        Value::U32(v) => Element::U32(*v),
        Value::Seq(items) => Element::Tuple(items.iter().map(value_to_element).collect()),
        Value::Map(pairs) => Element::map_from_pairs(
            pairs
                .iter()
                .map(|(key, value)| (value_to_element(key), value_to_element(value))),
        ),
    }
}

/// Unmarshals an element tag-directed, with tuples becoming sequences.
///
/// Used by generic tooling (the CLI) that has no declared return shape.
pub fn value_from_element(element: &Element) -> Result<Value> {
    match element {
        Element::Str(s) => Ok(Value::Str(s.clone())),
        Element::U32(v) => Ok(Value::U32(*v)),
        Element::Tuple(children) => {
            let items = children
                .iter()
                .map(value_from_element)
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Seq(items))
        }
        Element::Map(_) => {
            let mut pairs = Vec::new();
            for (key, value) in element.map_pairs()? {
                pairs.push((value_from_element(&key)?, value_from_element(&value)?));
            }
            Ok(Value::Map(pairs))
        }
    }
}

fn shape_mismatch(shape: &Shape, got: &str) -> TagwireError {
    TagwireError::Format(format!("expected a {shape} value, got {got}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marshal_primitives() {
        assert_eq!(
            marshal(&Value::Str("hi".into()), &Shape::Str).unwrap(),
            Element::Str("hi".into())
        );
        assert_eq!(marshal(&Value::U32(7), &Shape::U32).unwrap(), Element::U32(7));
    }

    #[test]
    fn test_marshal_rejects_mismatch() {
        assert!(marshal(&Value::U32(7), &Shape::Str).is_err());
        assert!(marshal(&Value::Seq(vec![]), &Shape::U32).is_err());
    }

    #[test]
    fn test_seq_round_trip() {
        let shape = Shape::seq(Shape::U32);
        let value = Value::Seq(vec![Value::U32(1), Value::U32(2), Value::U32(3)]);

        let element = marshal(&value, &shape).unwrap();
        assert_eq!(element.as_tuple().unwrap().len(), 3);
        assert_eq!(unmarshal(&element, &shape).unwrap(), value);
    }

    #[test]
    fn test_seq_rejects_heterogeneous_items() {
        let shape = Shape::seq(Shape::U32);
        let value = Value::Seq(vec![Value::U32(1), Value::Str("two".into())]);
        assert!(marshal(&value, &shape).is_err());
    }

    #[test]
    fn test_map_round_trip_is_order_independent() {
        let shape = Shape::map(Shape::Str, Shape::U32);
        let forward = Value::Map(vec![
            (Value::Str("a".into()), Value::U32(1)),
            (Value::Str("b".into()), Value::U32(2)),
        ]);
        let reverse = Value::Map(vec![
            (Value::Str("b".into()), Value::U32(2)),
            (Value::Str("a".into()), Value::U32(1)),
        ]);

        let from_forward = unmarshal(&marshal(&forward, &shape).unwrap(), &shape).unwrap();
        let from_reverse = unmarshal(&marshal(&reverse, &shape).unwrap(), &shape).unwrap();
        assert_eq!(from_forward, from_reverse);
    }

    #[test]
    fn test_nested_map_of_seqs() {
        let shape = Shape::map(Shape::Str, Shape::seq(Shape::U32));
        let value = Value::Map(vec![(
            Value::Str("fib".into()),
            Value::Seq(vec![Value::U32(1), Value::U32(1), Value::U32(2)]),
        )]);

        let element = marshal(&value, &shape).unwrap();
        assert_eq!(unmarshal(&element, &shape).unwrap(), value);
    }

    #[test]
    fn test_unmarshal_rejects_wrong_tag() {
        let element = Element::Str("nope".into());
        assert!(unmarshal(&element, &Shape::U32).is_err());
        assert!(unmarshal(&element, &Shape::seq(Shape::Str)).is_err());
    }

    #[test]
    fn test_untyped_conversion_mirrors_typed() {
        let shape = Shape::map(Shape::Str, Shape::seq(Shape::U32));
        let value = Value::Map(vec![(
            Value::Str("xs".into()),
            Value::Seq(vec![Value::U32(4), Value::U32(5)]),
        )]);

        let typed = marshal(&value, &shape).unwrap();
        let untyped = value_to_element(&value);
        assert_eq!(typed, untyped);
        assert_eq!(value_from_element(&untyped).unwrap(), value);
    }
}
