//! Property tests for trailer encoding and host parsing.

use ir_attributes::{
    format::{CompressionConfig, Trailer},
    AttributeMap, AttributesStore,
};
use proptest::collection::{btree_map, vec};
use proptest::prelude::*;

fn attribute_map() -> impl Strategy<Value = AttributeMap> {
    btree_map(
        vec(any::<u8>(), 0..24),
        prop_oneof![vec(any::<u8>(), 0..64), vec(Just(b'x'), 1000..1600)],
        0..6,
    )
    .prop_map(|entries| entries.into_iter().collect())
}

fn any_trailer() -> impl Strategy<Value = Trailer> {
    (attribute_map(), vec((attribute_map(), any::<i64>()), 0..8)).prop_map(|(global, frames)| {
        let (frames, timestamps) = frames.into_iter().unzip();
        Trailer {
            global,
            frames,
            timestamps,
        }
    })
}

proptest! {
    #[test]
    fn test_decode_inverts_encode(trailer in any_trailer(), compress in any::<bool>()) {
        let config = if compress {
            CompressionConfig::default()
        } else {
            CompressionConfig::disabled()
        };
        let encoded = trailer.encode(&config);
        prop_assert_eq!(Trailer::decode(&encoded).unwrap(), trailer);
    }

    #[test]
    fn test_payload_survives_buffer_commit(
        payload in vec(any::<u8>(), 0..512),
        trailer in any_trailer(),
    ) {
        let mut host = payload.clone();
        host.extend(trailer.encode(&CompressionConfig::default()));

        let mut store = AttributesStore::open_buffer(host).unwrap();
        store.add_global_attribute("edited", "yes").unwrap();
        let committed = store.into_buffer().unwrap();

        let (payload_len, reread) = Trailer::from_host(&committed).unwrap();
        prop_assert_eq!(&committed[..payload_len], &payload[..]);
        prop_assert_eq!(reread.frames, trailer.frames);
        prop_assert_eq!(reread.timestamps, trailer.timestamps);
        prop_assert_eq!(reread.global.get(b"edited"), Some(&b"yes"[..]));
    }

    #[test]
    fn test_garbage_never_panics(bytes in vec(any::<u8>(), 0..256)) {
        let _ = Trailer::from_host(&bytes);
        let _ = AttributesStore::open_buffer(bytes);
    }
}
