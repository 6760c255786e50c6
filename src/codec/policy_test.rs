use uuid::Uuid;

use super::policy::*;
use crate::test_utils::sample_mutation;
use crate::test_utils::StaticTableRegistry;
use crate::CodecError;

#[test]
fn test_ttl_is_min_grace_period_under_cap() {
    let registry = StaticTableRegistry::new();
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    registry.add_table(a, 7200);
    registry.add_table(b, 600);
    registry.add_table(c, 3600);

    let mutation = sample_mutation("ks1", &[a, b, c], 16);
    assert_eq!(hint_ttl(&mutation, &registry, 10_000).unwrap(), 600);
}

#[test]
fn test_ttl_is_capped_by_global_ceiling() {
    let registry = StaticTableRegistry::new();
    let a = Uuid::new_v4();
    registry.add_table(a, 864_000);

    let mutation = sample_mutation("ks1", &[a], 16);
    assert_eq!(hint_ttl(&mutation, &registry, 300).unwrap(), 300);
}

#[test]
fn test_ttl_of_empty_mutation_is_the_cap() {
    let registry = StaticTableRegistry::new();
    let mutation = sample_mutation("ks1", &[], 0);
    assert_eq!(hint_ttl(&mutation, &registry, 3600).unwrap(), 3600);
}

#[test]
fn test_ttl_rejects_unknown_family() {
    let registry = StaticTableRegistry::new();
    let mutation = sample_mutation("ks1", &[Uuid::new_v4()], 16);

    assert!(matches!(
        hint_ttl(&mutation, &registry, 3600),
        Err(CodecError::UnknownColumnFamily(_))
    ));
}

#[test]
fn test_ttl_rejects_non_positive_result() {
    let registry = StaticTableRegistry::new();
    let a = Uuid::new_v4();
    registry.add_table(a, 0);

    let mutation = sample_mutation("ks1", &[a], 16);
    assert!(matches!(
        hint_ttl(&mutation, &registry, 3600),
        Err(CodecError::NonPositiveTtl { .. })
    ));
}

#[test]
fn test_strip_removes_families_truncated_after_writetime() {
    let registry = StaticTableRegistry::new();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    registry.add_table(a, 3600);
    registry.add_table(b, 3600);

    let writetime_ms = 1_000_000;
    registry.record_truncation(a, writetime_ms + 500);

    let mutation = sample_mutation("ks1", &[a, b], 16);
    let mut cache = TruncationCache::new();
    let stripped = strip_truncated(mutation, writetime_ms, &registry, &mut cache);

    assert_eq!(stripped.column_family_ids(), vec![b]);
}

#[test]
fn test_strip_keeps_families_truncated_before_writetime() {
    let registry = StaticTableRegistry::new();
    let a = Uuid::new_v4();
    registry.add_table(a, 3600);

    let writetime_ms = 1_000_000;
    registry.record_truncation(a, writetime_ms - 500);

    let mutation = sample_mutation("ks1", &[a], 16);
    let mut cache = TruncationCache::new();
    let kept = strip_truncated(mutation.clone(), writetime_ms, &registry, &mut cache);

    assert_eq!(kept, mutation);
}

#[test]
fn test_strip_can_empty_the_mutation() {
    let registry = StaticTableRegistry::new();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    registry.add_table(a, 3600);
    registry.add_table(b, 3600);

    let writetime_ms = 1_000_000;
    registry.record_truncation(a, writetime_ms + 1);
    registry.record_truncation(b, writetime_ms + 1);

    let mutation = sample_mutation("ks1", &[a, b], 16);
    let mut cache = TruncationCache::new();
    let stripped = strip_truncated(mutation, writetime_ms, &registry, &mut cache);

    assert!(stripped.is_empty());
}

#[test]
fn test_truncation_cache_pins_the_first_answer() {
    let registry = StaticTableRegistry::new();
    let a = Uuid::new_v4();
    registry.add_table(a, 3600);

    let writetime_ms = 1_000_000;
    let mut cache = TruncationCache::new();

    // first query sees no truncation and caches that
    let mutation = sample_mutation("ks1", &[a], 16);
    let kept = strip_truncated(mutation.clone(), writetime_ms, &registry, &mut cache);
    assert!(!kept.is_empty());

    // a truncation recorded mid-page is not observed until the next page
    registry.record_truncation(a, writetime_ms + 500);
    let still_kept = strip_truncated(mutation, writetime_ms, &registry, &mut cache);
    assert!(!still_kept.is_empty());
}
