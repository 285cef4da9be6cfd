//! Tests for the element layer
//!
//! These tests verify the wire grammar, round-trip behavior, and the
//! rejection of malformed input.

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::element::codec::{decode, encode};

    fn nested_sample() -> Element {
        Element::Tuple(vec![
            Element::Str("outer".into()),
            Element::U32(0xdead),
            Element::Tuple(vec![
                Element::U32(1),
                Element::Map(Default::default()),
                Element::Str(String::new()),
            ]),
            Element::map_from_pairs(vec![
                (Element::Str("a".into()), Element::U32(1)),
                (
                    Element::Str("b".into()),
                    Element::Tuple(vec![Element::U32(2), Element::U32(3)]),
                ),
            ]),
        ])
    }

    // ========================================================================
    // Encoding
    // ========================================================================

    #[test]
    fn test_encode_string() {
        assert_eq!(encode(&Element::Str("hello".into())), "<SS 5>hello");
        assert_eq!(encode(&Element::Str(String::new())), "<SS 0>");
    }

    #[test]
    fn test_encode_u32_is_hex() {
        assert_eq!(encode(&Element::U32(0)), "<U4 1>0");
        assert_eq!(encode(&Element::U32(255)), "<U4 2>ff");
        assert_eq!(encode(&Element::U32(u32::MAX)), "<U4 8>ffffffff");
    }

    #[test]
    fn test_encode_length_is_hex_bytes() {
        // 26 characters -> 0x1a
        let s: String = ('a'..='z').collect();
        assert_eq!(encode(&Element::Str(s.clone())), format!("<SS 1a>{s}"));
        // multi-byte UTF-8 is counted in bytes, not characters
        assert_eq!(encode(&Element::Str("é".into())), "<SS 2>é");
    }

    #[test]
    fn test_tuple_payload_is_sum_of_children() {
        let a = Element::Str("ab".into());
        let b = Element::U32(7);
        let tuple = Element::Tuple(vec![a.clone(), b.clone()]);

        let encoded = encode(&tuple);
        let body_len = encode(&a).len() + encode(&b).len();
        assert_eq!(encoded, format!("<TP {body_len:x}>{}{}", encode(&a), encode(&b)));
    }

    #[test]
    fn test_map_encoding_is_canonical() {
        let forward = Element::map_from_pairs(vec![
            (Element::Str("a".into()), Element::U32(1)),
            (Element::Str("b".into()), Element::U32(2)),
        ]);
        let reverse = Element::map_from_pairs(vec![
            (Element::Str("b".into()), Element::U32(2)),
            (Element::Str("a".into()), Element::U32(1)),
        ]);

        assert_eq!(forward, reverse);
        assert_eq!(encode(&forward), encode(&reverse));
    }

    // ========================================================================
    // Round-trips
    // ========================================================================

    #[test]
    fn test_round_trip_primitives() {
        for element in [
            Element::Str("hello".into()),
            Element::Str(String::new()),
            Element::Str("tabs\tand\nnewlines".into()),
            Element::U32(0),
            Element::U32(42),
            Element::U32(u32::MAX),
        ] {
            let decoded = decode(encode(&element).as_bytes()).unwrap();
            assert_eq!(element, decoded);
        }
    }

    #[test]
    fn test_round_trip_nested() {
        let element = nested_sample();
        let decoded = decode(encode(&element).as_bytes()).unwrap();
        assert_eq!(element, decoded);
    }

    #[test]
    fn test_round_trip_deeply_nested_tuple() {
        let mut element = Element::U32(1);
        for _ in 0..16 {
            element = Element::Tuple(vec![element]);
        }
        let decoded = decode(encode(&element).as_bytes()).unwrap();
        assert_eq!(element, decoded);
    }

    #[test]
    fn test_map_pairs_decode_keys() {
        let map = Element::map_from_pairs(vec![
            (Element::U32(1), Element::Str("one".into())),
            (Element::U32(2), Element::Str("two".into())),
        ]);

        let pairs = map.map_pairs().unwrap();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.contains(&(Element::U32(1), Element::Str("one".into()))));
        assert!(pairs.contains(&(Element::U32(2), Element::Str("two".into()))));
    }

    // ========================================================================
    // Malformed input
    // ========================================================================

    #[test]
    fn test_decode_rejects_bad_delimiters() {
        for input in [
            "",
            "SS 5>hello",   // missing '<'
            "<SS5>hello",   // missing space
            "<SS 5hello",   // missing '>'
            "<SS >hello",   // empty length
            "<SS zz>hello", // non-hex length
        ] {
            assert!(decode(input.as_bytes()).is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn test_decode_rejects_unknown_tag() {
        assert!(decode(b"<XX 1>a").is_err());
        // reserved tags are declared but carry no variant yet
        assert!(decode(format!("<{INT32_TAG} 1>5").as_bytes()).is_err());
        assert!(decode(format!("<{REAL64_TAG} 1>5").as_bytes()).is_err());
    }

    #[test]
    fn test_decode_rejects_truncated_payload() {
        assert!(decode(b"<SS a>hello").is_err());
        assert!(decode(b"<TP 10><SS 1>a").is_err());
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        assert!(decode(b"<SS 5>helloX").is_err());
    }

    #[test]
    fn test_decode_rejects_bad_u32_payload() {
        assert!(decode(b"<U4 5>xyzzy").is_err());
        // overflows u32
        assert!(decode(b"<U4 9>fffffffff").is_err());
    }

    #[test]
    fn test_decode_rejects_dangling_map_key() {
        let key = encode(&Element::Str("orphan".into()));
        let input = format!("<MP {:x}>{key}", key.len());
        assert!(decode(input.as_bytes()).is_err());
    }

    #[test]
    fn test_corrupt_child_is_bounded_to_its_slice() {
        // A child declaring more bytes than its parent allotted must fail
        // rather than read into a sibling.
        let input = b"<TP 9><SS 5>ab<SS 1>c";
        assert!(decode(input).is_err());
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Element::Str("x".into()).as_str().unwrap(), "x");
        assert_eq!(Element::U32(9).as_u32().unwrap(), 9);
        assert!(Element::U32(9).as_str().is_err());
        assert!(Element::Str("x".into()).as_tuple().is_err());
        assert!(Element::Tuple(vec![]).map_pairs().is_err());
    }
}
