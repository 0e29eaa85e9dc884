//! Re-parses encoded delete messages and checks framing properties.

use mdbwire_protocol::{
    encode_delete, BsonSerializer, DeleteFlags, DeleteRequest, EncodeError, OpCode, Selector,
    SizeLimitPolicy, HEADER_SIZE,
};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

struct ParsedDelete {
    message_length: i32,
    request_id: i32,
    response_to: i32,
    op_code: OpCode,
    collection_name: String,
    flags: u32,
    document: Vec<u8>,
}

fn read_i32(bytes: &[u8], at: usize) -> i32 {
    i32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
}

fn parse_delete(bytes: &[u8]) -> ParsedDelete {
    let message_length = read_i32(bytes, 0);
    let request_id = read_i32(bytes, 4);
    let response_to = read_i32(bytes, 8);
    let op_code = OpCode::try_from(read_i32(bytes, 12)).unwrap();
    assert_eq!(read_i32(bytes, 16), 0);

    let ns_start = HEADER_SIZE + 4;
    let ns_len = bytes[ns_start..].iter().position(|&b| b == 0).unwrap();
    let collection_name = String::from_utf8(bytes[ns_start..ns_start + ns_len].to_vec()).unwrap();

    let flags_at = ns_start + ns_len + 1;
    let flags = u32::from_le_bytes(bytes[flags_at..flags_at + 4].try_into().unwrap());

    let doc_start = flags_at + 4;
    let doc_len = read_i32(bytes, doc_start) as usize;
    let document = bytes[doc_start..doc_start + doc_len].to_vec();

    ParsedDelete {
        message_length,
        request_id,
        response_to,
        op_code,
        collection_name,
        flags,
        document,
    }
}

#[test]
fn test_roundtrip_recovers_fields() {
    let selector = json!({"status": "archived", "tags": ["a", "b"], "n": {"$lt": 10}});
    let req = DeleteRequest::new(1234, "app.events", Selector::Document(selector.clone()))
        .with_flags(DeleteFlags::new().with_single_remove());

    let bytes = encode_delete(&req, &BsonSerializer, &SizeLimitPolicy::default()).unwrap();
    let parsed = parse_delete(&bytes);

    assert_eq!(parsed.message_length as usize, bytes.len());
    assert_eq!(parsed.request_id, 1234);
    assert_eq!(parsed.response_to, 0);
    assert_eq!(parsed.op_code, OpCode::Delete);
    assert_eq!(parsed.collection_name, "app.events");
    assert_eq!(parsed.flags, DeleteFlags::SINGLE_REMOVE);
    assert_eq!(parsed.document, BsonSerializer.to_vec(&selector).unwrap());
    // Document runs to the end of the message
    assert_eq!(bytes.len() - parsed.document.len(), HEADER_SIZE + 4 + 10 + 1 + 4);
}

#[test]
fn test_raw_and_structured_selectors_encode_identically() {
    let selector = json!({"_id": 99, "owner": "ops"});
    let raw = BsonSerializer.to_vec(&selector).unwrap();

    let structured = DeleteRequest::new(5, "db.items", Selector::Document(selector));
    let framed: DeleteRequest<Value> = DeleteRequest::new(5, "db.items", Selector::raw(raw));

    let policy = SizeLimitPolicy::default();
    let a = encode_delete(&structured, &BsonSerializer, &policy).unwrap();
    let b = encode_delete(&framed, &BsonSerializer, &policy).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_oversized_selector_with_and_without_validation() {
    let selector = json!({"blob": "x".repeat(1024)});
    let req = DeleteRequest::new(1, "db.big", Selector::Document(selector));

    let strict = SizeLimitPolicy::new(512, 4096);
    assert!(matches!(
        encode_delete(&req, &BsonSerializer, &strict),
        Err(EncodeError::DocumentTooLarge { max: 512, .. })
    ));

    let trusting = strict.with_skip_document_validation(true);
    let bytes = encode_delete(&req, &BsonSerializer, &trusting).unwrap();
    assert_eq!(parse_delete(&bytes).message_length as usize, bytes.len());
}

#[test]
fn test_concurrent_encoding() {
    let handles: Vec<_> = (0..8)
        .map(|i| {
            std::thread::spawn(move || {
                let selector = Selector::Document(json!({"i": i}));
                let req = DeleteRequest::new(i, format!("db.c{}", i), selector);
                encode_delete(&req, &BsonSerializer, &SizeLimitPolicy::default()).unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let bytes = handle.join().unwrap();
        let parsed = parse_delete(&bytes);
        assert_eq!(parsed.request_id, i as i32);
        assert_eq!(parsed.collection_name, format!("db.c{}", i));
    }
}

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z0-9 ]{0,24}".prop_map(Value::String),
    ]
}

fn arb_selector() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-z_$]{1,8}", arb_scalar(), 0..6)
        .prop_map(|m| Value::Object(m.into_iter().collect::<Map<String, Value>>()))
}

proptest! {
    #[test]
    fn prop_length_prefixes_are_exact(
        ns in "[a-z]{1,8}\\.[a-z]{1,12}",
        selector in arb_selector(),
        flags in any::<u32>(),
        request_id in any::<i32>(),
    ) {
        let expected_doc = BsonSerializer.to_vec(&selector).unwrap();
        let req = DeleteRequest::new(request_id, ns.clone(), Selector::Document(selector))
            .with_flags(DeleteFlags::from_bits(flags));
        let bytes = encode_delete(&req, &BsonSerializer, &SizeLimitPolicy::default()).unwrap();

        let parsed = parse_delete(&bytes);
        prop_assert_eq!(parsed.message_length as usize, bytes.len());
        prop_assert_eq!(parsed.request_id, request_id);
        prop_assert_eq!(parsed.flags, flags);
        prop_assert_eq!(&parsed.collection_name, &ns);
        prop_assert_eq!(&parsed.document, &expected_doc);
        prop_assert_eq!(bytes.len(), HEADER_SIZE + 4 + ns.len() + 1 + 4 + expected_doc.len());
        prop_assert_eq!(*bytes.last().unwrap(), 0);
    }

    #[test]
    fn prop_nul_in_namespace_always_rejected(
        prefix in "[a-z.]{0,8}",
        suffix in "[a-z.]{0,8}",
        selector in arb_selector(),
    ) {
        let ns = format!("{}\u{0}{}", prefix, suffix);
        let req = DeleteRequest::new(1, ns, Selector::Document(selector));
        let result = encode_delete(&req, &BsonSerializer, &SizeLimitPolicy::default());
        prop_assert!(matches!(result, Err(EncodeError::InvalidNamespace)));
    }

    #[test]
    fn prop_mismatched_raw_prefix_always_rejected(
        body in prop::collection::vec(any::<u8>(), 0..64),
        declared in any::<u32>(),
    ) {
        let mut raw = declared.to_le_bytes().to_vec();
        raw.extend_from_slice(&body);
        prop_assume!(declared as usize != raw.len());

        let actual = raw.len();
        let req: DeleteRequest<Value> = DeleteRequest::new(1, "db.coll", Selector::raw(raw));
        let result = encode_delete(&req, &BsonSerializer, &SizeLimitPolicy::default());
        prop_assert!(matches!(
            result,
            Err(EncodeError::FramingMismatch { declared: d, actual: a })
                if d == declared as usize && a == actual
        ), "expected FramingMismatch, got {:?}", result);
    }

    #[test]
    fn prop_ceiling_selected_by_policy_flag(
        selector in arb_selector(),
        slack in 0usize..64,
    ) {
        let req = DeleteRequest::new(1, "db.coll", Selector::Document(selector));
        let size = encode_delete(&req, &BsonSerializer, &SizeLimitPolicy::default()).unwrap().len();

        let strict = SizeLimitPolicy::new(size - 1, size + slack);
        let strict_result = encode_delete(&req, &BsonSerializer, &strict);
        prop_assert!(
            matches!(strict_result, Err(EncodeError::DocumentTooLarge { size: s, .. }) if s == size),
            "expected DocumentTooLarge, got {:?}", strict_result
        );

        let trusting = strict.with_skip_document_validation(true);
        prop_assert!(encode_delete(&req, &BsonSerializer, &trusting).is_ok());
    }
}
