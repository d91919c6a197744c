//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache engine against an in-memory table.

use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use crate::cache::{
    compliant_key, DynamoDbCache, FixedClock, Ttl, MAX_KEY_LENGTH, RESERVED_CHARACTERS,
};
use crate::dynamo::InMemoryStore;
use crate::encoder::{Base64ItemEncoder, ItemEncoder, JsonItemEncoder, SerializeItemEncoder};
use crate::error::CacheError;

// == Test Configuration ==
const TABLE: &str = "cache";

fn fixture(prefix: Option<&str>) -> (DynamoDbCache<String>, Arc<InMemoryStore>, Arc<FixedClock>) {
    let store = Arc::new(InMemoryStore::with_table(TABLE, "id"));
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
    ));
    let mut builder = DynamoDbCache::<String>::builder(TABLE, store.clone())
        .with_clock(clock.clone())
        .with_encoder(JsonItemEncoder::new());
    if let Some(prefix) = prefix {
        builder = builder.with_prefix(prefix);
    }
    (builder.build().unwrap(), store, clock)
}

// == Strategies ==
/// Generates valid cache keys (no reserved characters)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_.-]{1,64}"
}

fn valid_value_strategy() -> impl Strategy<Value = String> {
    ".{0,256}"
}

/// Generates keys holding at least one reserved character
fn reserved_key_strategy() -> impl Strategy<Value = String> {
    let reserved: Vec<char> = RESERVED_CHARACTERS.chars().collect();
    (
        "[a-z]{0,8}",
        prop::sample::select(reserved),
        "[a-z]{0,8}",
    )
        .prop_map(|(head, c, tail)| format!("{head}{c}{tail}"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Round-trip: a value set under a key reads back unchanged, with or
    // without a prefix.
    #[test]
    fn prop_roundtrip_storage(
        key in valid_key_strategy(),
        value in valid_value_strategy(),
        prefixed in any::<bool>()
    ) {
        let (cache, _, _) = fixture(prefixed.then_some("ns_"));

        prop_assert!(cache.set(&key, value.clone(), None).unwrap());
        prop_assert_eq!(cache.get(&key).unwrap(), Some(value));
        prop_assert!(cache.has(&key).unwrap());
    }

    // Overwrite: the last value written under a key wins.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        value1 in valid_value_strategy(),
        value2 in valid_value_strategy()
    ) {
        let (cache, store, _) = fixture(None);

        cache.set(&key, value1, None).unwrap();
        cache.set(&key, value2.clone(), None).unwrap();

        prop_assert_eq!(cache.get(&key).unwrap(), Some(value2));
        prop_assert_eq!(store.item_count(TABLE), 1);
    }

    // Delete: after deleting a stored key, reads miss and a second delete
    // reports nothing removed.
    #[test]
    fn prop_delete_removes_entry(key in valid_key_strategy(), value in valid_value_strategy()) {
        let (cache, _, _) = fixture(None);

        cache.set(&key, value, None).unwrap();
        prop_assert!(cache.delete(&key).unwrap());
        prop_assert_eq!(cache.get(&key).unwrap(), None);
        prop_assert!(!cache.delete(&key).unwrap());
    }

    // Reserved characters: every public entry point rejects them before
    // the store is contacted.
    #[test]
    fn prop_reserved_keys_never_reach_store(key in reserved_key_strategy()) {
        let (mut cache, store, _) = fixture(None);

        prop_assert!(matches!(cache.get_item(&key), Err(CacheError::InvalidArgument(_))));
        prop_assert!(matches!(cache.get(&key), Err(CacheError::InvalidArgument(_))));
        prop_assert!(matches!(
            cache.set(&key, "v".to_string(), None),
            Err(CacheError::InvalidArgument(_))
        ));
        prop_assert!(matches!(cache.delete(&key), Err(CacheError::InvalidArgument(_))));
        prop_assert!(matches!(
            cache.get_items(["fine", key.as_str()]),
            Err(CacheError::InvalidArgument(_))
        ));
        prop_assert!(matches!(
            cache.delete_items(["fine", key.as_str()]),
            Err(CacheError::InvalidArgument(_))
        ));
        prop_assert!(matches!(
            cache.set_multiple([("fine", "v".to_string()), (key.as_str(), "v".to_string())], None),
            Err(CacheError::InvalidArgument(_))
        ));

        prop_assert!(store.operations().is_empty());
        prop_assert_eq!(cache.deferred_len(), 0);
    }

    // Key compliance: mapped keys never exceed the limit, are stable, and
    // leave short keys untouched.
    #[test]
    fn prop_compliant_key_length(key in "[a-zA-Z0-9é]{1,3000}") {
        let mapped = compliant_key(&key);

        prop_assert!(mapped.len() <= MAX_KEY_LENGTH);
        prop_assert_eq!(&mapped, &compliant_key(&key));
        if key.len() <= MAX_KEY_LENGTH {
            prop_assert_eq!(mapped, key);
        } else {
            prop_assert!(mapped.contains("_trunc_"));
        }
    }

    // Batch completeness: one item per distinct key, in request order,
    // hits exactly where a value was stored.
    #[test]
    fn prop_batch_get_completeness(
        stored in prop::collection::hash_set(valid_key_strategy(), 0..40),
        requested in prop::collection::vec(valid_key_strategy(), 0..250)
    ) {
        let (cache, _, _) = fixture(None);
        for key in &stored {
            cache.set(key, format!("v-{key}"), None).unwrap();
        }

        let items = cache.get_items(&requested).unwrap();

        let mut seen = HashSet::new();
        let distinct: Vec<&String> = requested.iter().filter(|k| seen.insert(*k)).collect();
        prop_assert_eq!(items.len(), distinct.len());

        for (item, key) in items.iter().zip(distinct) {
            prop_assert_eq!(item.key(), key.as_str());
            prop_assert_eq!(item.is_hit(), stored.contains(key));
        }
    }

    // Expiry boundary: an item written with TTL t is a hit until t seconds
    // have passed and a miss from then on.
    #[test]
    fn prop_expiry_boundary(key in valid_key_strategy(), ttl in 1i64..100_000) {
        let (cache, _, clock) = fixture(None);
        cache.set(&key, "v".to_string(), Some(Ttl::Seconds(ttl))).unwrap();

        clock.advance(Duration::seconds(ttl - 1));
        prop_assert!(cache.has(&key).unwrap());

        clock.advance(Duration::seconds(1));
        prop_assert!(!cache.has(&key).unwrap());
    }

    // Commit: a successful commit persists every queued value and empties
    // the queue; committing again touches nothing.
    #[test]
    fn prop_commit_drains_queue(
        entries in prop::collection::hash_map(valid_key_strategy(), valid_value_strategy(), 0..30)
    ) {
        let (mut cache, store, _) = fixture(None);
        for (key, value) in &entries {
            let mut item = cache.new_item(key).unwrap();
            item.set(value.clone()).unwrap();
            cache.save_deferred(&item).unwrap();
        }
        prop_assert_eq!(cache.deferred_len(), entries.len());

        prop_assert!(cache.commit().unwrap());
        prop_assert_eq!(cache.deferred_len(), 0);

        store.reset_operations();
        prop_assert!(cache.commit().unwrap());
        prop_assert!(store.operations().is_empty());

        let keys: Vec<&String> = entries.keys().collect();
        let values = cache.get_multiple(keys, None).unwrap();
        let expected: HashMap<String, Option<String>> = entries
            .into_iter()
            .map(|(k, v)| (k, Some(v)))
            .collect();
        prop_assert_eq!(values, expected);
    }

    // Prefix isolation: clearing a prefixed cache leaves foreign records.
    #[test]
    fn prop_clear_respects_prefix(
        ours in prop::collection::hash_set(valid_key_strategy(), 0..60),
        theirs in prop::collection::hash_set(valid_key_strategy(), 0..20)
    ) {
        let store = Arc::new(InMemoryStore::with_table(TABLE, "id"));
        let mine: DynamoDbCache<String> = DynamoDbCache::builder(TABLE, store.clone())
            .with_prefix("mine_")
            .build()
            .unwrap();
        let other: DynamoDbCache<String> = DynamoDbCache::builder(TABLE, store.clone())
            .with_prefix("other_")
            .build()
            .unwrap();

        for key in &ours {
            mine.set(key, "v".to_string(), None).unwrap();
        }
        for key in &theirs {
            other.set(key, "v".to_string(), None).unwrap();
        }

        prop_assert!(mine.clear().unwrap());
        prop_assert_eq!(store.item_count(TABLE), theirs.len());
        for key in &theirs {
            prop_assert!(other.has(key).unwrap());
        }
    }
}

// == Encoder Properties ==
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Encoders restore what they encoded, also when wrapped in base64.
    #[test]
    fn prop_encoder_roundtrip(
        value in prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 1..10)
    ) {
        let encoders: Vec<Box<dyn ItemEncoder<BTreeMap<String, i64>>>> = vec![
            Box::new(SerializeItemEncoder::new()),
            Box::new(JsonItemEncoder::new()),
            Box::new(JsonItemEncoder::pretty()),
            Box::new(Base64ItemEncoder::new(SerializeItemEncoder::new())),
            Box::new(Base64ItemEncoder::new(JsonItemEncoder::new())),
        ];

        for encoder in encoders {
            let raw = encoder.encode(&value).unwrap();
            prop_assert_eq!(encoder.decode(&raw).unwrap(), value.clone());
        }
    }

    // Base64 payloads are always valid text, so they land in string
    // attributes whatever the inner encoder produced.
    #[test]
    fn prop_base64_payload_is_text(value in any::<Vec<u8>>()) {
        let encoder = Base64ItemEncoder::new(SerializeItemEncoder::new());
        let raw = ItemEncoder::<Vec<u8>>::encode(&encoder, &value).unwrap();
        prop_assert!(std::str::from_utf8(&raw).is_ok());
    }
}

// == Property Test for Error Response Format ==
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // *For any* error, the HTTP response carries a JSON body with an
    // "error" field holding the error's message.
    #[test]
    fn prop_error_response_format(error_msg in "[a-zA-Z0-9 _-]{1,100}") {
        use crate::dynamo::StoreError;
        use axum::body::to_bytes;
        use axum::response::IntoResponse;

        let error_variants = vec![
            CacheError::InvalidArgument(error_msg.clone()),
            CacheError::Encoding(error_msg.clone()),
            CacheError::Store(StoreError::Network(error_msg.clone())),
            CacheError::Store(StoreError::Client(error_msg.clone())),
            CacheError::Store(StoreError::ResourceNotFound(error_msg.clone())),
            CacheError::Internal(error_msg.clone()),
        ];

        let rt = tokio::runtime::Runtime::new().unwrap();
        for error in error_variants {
            let expected_msg = error.to_string();
            let response = error.into_response();

            let content_type = response
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok());
            prop_assert!(
                content_type.is_some_and(|ct| ct.contains("application/json")),
                "Response should have JSON content-type"
            );

            let bytes = rt.block_on(async {
                to_bytes(response.into_body(), usize::MAX).await.unwrap()
            });
            let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

            prop_assert_eq!(json["error"].as_str(), Some(expected_msg.as_str()));
        }
    }
}
