//! Property-Based Tests for Interception Module
//!
//! Uses proptest to check cache key determinism and lock identity.

use std::sync::Arc;

use proptest::prelude::*;

use crate::interception::{
    CacheLockProvider, KeyArg, KeyGenerator, MethodCacheKeyGenerator, MethodDescriptor,
    ReturnType, ToKeyArg,
};

// == Strategies ==
/// Generates argument lists mixing strings, numbers and absent values
fn arguments_strategy() -> impl Strategy<Value = Vec<KeyArg>> {
    let argument = prop_oneof![
        "[a-zA-Z0-9 ]{0,16}".prop_map(|s| s.to_key_arg()),
        any::<i64>().prop_map(|n| n.to_key_arg()),
        Just(KeyArg::Null),
    ];
    prop::collection::vec(argument, 0..4)
}

fn method() -> MethodDescriptor {
    MethodDescriptor::new("Svc", "call", &[], ReturnType::value::<i32>())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Identical calls always produce identical keys.
    #[test]
    fn prop_key_is_deterministic(arguments in arguments_strategy()) {
        let first = MethodCacheKeyGenerator.cache_key(&method(), &arguments).unwrap();
        let second = MethodCacheKeyGenerator.cache_key(&method(), &arguments.clone()).unwrap();
        prop_assert_eq!(first, second);
    }

    // Different single string arguments produce different keys.
    #[test]
    fn prop_distinct_strings_distinct_keys(a in "[a-z]{1,16}", b in "[a-z]{1,16}") {
        let key_a = MethodCacheKeyGenerator.cache_key(&method(), &[a.to_key_arg()]).unwrap();
        let key_b = MethodCacheKeyGenerator.cache_key(&method(), &[b.to_key_arg()]).unwrap();
        prop_assert_eq!(key_a == key_b, a == b);
    }

    // Different numbers produce different keys.
    #[test]
    fn prop_distinct_numbers_distinct_keys(a in any::<i64>(), b in any::<i64>()) {
        let key_a = MethodCacheKeyGenerator.cache_key(&method(), &[a.to_key_arg()]).unwrap();
        let key_b = MethodCacheKeyGenerator.cache_key(&method(), &[b.to_key_arg()]).unwrap();
        prop_assert_eq!(key_a == key_b, a == b);
    }

    // Repeated lookups of one key hand out the same token.
    #[test]
    fn prop_lock_token_identity(key in "[a-zA-Z0-9().,']{1,32}") {
        let provider = CacheLockProvider::new();
        let first = provider.lock_token(&key);
        let second = provider.lock_token(&key);
        prop_assert!(Arc::ptr_eq(&first, &second));
    }
}
