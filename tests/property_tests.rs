//! Property-based tests using proptest
//!
//! Codec and framing invariants across randomly generated inputs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use bytes::{Bytes, BytesMut};
use milter_protocol::core::codec::{Framer, PacketCodec};
use milter_protocol::core::field::{Field, Layout, Value};
use milter_protocol::{dispatch, Dispatch, PassThrough};
use proptest::prelude::*;
use tokio_util::codec::Encoder;

fn frame_all(bodies: &[Vec<u8>]) -> BytesMut {
    let mut codec = PacketCodec::default();
    let mut wire = BytesMut::new();
    for body in bodies {
        codec.encode(Bytes::from(body.clone()), &mut wire).unwrap();
    }
    wire
}

fn extract_all(framer: &mut Framer) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    while let Some(body) = framer.try_extract().unwrap() {
        out.push(body.to_vec());
    }
    out
}

// Property: a concatenation of uint32 fields decodes what it encoded
proptest! {
    #[test]
    fn prop_uint32_tuple_roundtrip(numbers in prop::collection::vec(any::<u32>(), 1..16)) {
        let uint32 = Layout::new(&[Field::Uint32]);
        let layout = (1..numbers.len()).fold(uint32.clone(), |acc, _| acc.concat(&uint32));

        let values: Vec<Value> = numbers.iter().copied().map(Value::Uint32).collect();
        let encoded = layout.encode(&values).expect("encode should not fail");

        prop_assert_eq!(encoded.len(), numbers.len() * 4);
        prop_assert_eq!(layout.width(&encoded), encoded.len());
        prop_assert_eq!(layout.decode(&encoded).expect("decode should not fail"), values);
    }
}

// Property: fragmentation never changes the extracted sequence
proptest! {
    #[test]
    fn prop_framing_fragmentation_invariant(
        bodies in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..12),
        chunk in 1usize..17,
    ) {
        let wire = frame_all(&bodies);

        let mut whole = Framer::default();
        whole.feed(&wire);
        let expected = extract_all(&mut whole);
        prop_assert_eq!(&expected, &bodies);

        let mut pieces = Framer::default();
        let mut got = Vec::new();
        for piece in wire.chunks(chunk) {
            pieces.feed(piece);
            got.extend(extract_all(&mut pieces));
        }
        prop_assert_eq!(got, expected);
        prop_assert_eq!(pieces.pending(), 0);
    }
}

// Property: string lists split on NUL and drop the trailing terminator
proptest! {
    #[test]
    fn prop_string_list_roundtrip(list in prop::collection::vec("[a-z<>@.]{0,12}", 0..6)) {
        let layout = Layout::new(&[Field::StringList]);
        let encoded = layout.encode(&[Value::Strings(list.clone())]).unwrap();
        prop_assert_eq!(layout.decode(&encoded).unwrap(), vec![Value::Strings(list)]);
    }
}

// Property: opcodes outside the table always yield exactly one continue
proptest! {
    #[test]
    fn prop_unknown_opcode_continues(
        opcode in any::<u8>().prop_filter("routed opcode", |b| !b"ADMOQR".contains(b)),
        rest in prop::collection::vec(any::<u8>(), 0..32),
    ) {
        let mut body = vec![opcode];
        body.extend(rest);
        let out = dispatch(&mut PassThrough, &body).unwrap();
        prop_assert_eq!(out, Dispatch::Responded(vec![Bytes::from_static(b"c")]));
    }
}

// Property: macro definitions never produce a reply
proptest! {
    #[test]
    fn prop_macro_is_silent(payload in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut body = vec![b'D'];
        body.extend(payload);
        let out = dispatch(&mut PassThrough, &body).unwrap();
        prop_assert_eq!(out, Dispatch::Responded(vec![]));
    }
}
