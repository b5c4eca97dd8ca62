use super::*;
use std::cell::Cell;

fn constant(value: i32) -> ValueProvider {
    Box::new(move || Rc::new(value) as RetainedValue)
}

fn as_i32(value: Option<RetainedValue>) -> Option<i32> {
    value.and_then(|value| value.downcast_ref::<i32>().copied())
}

#[test]
fn saved_value_is_consumed_exactly_once() {
    let registry = RetainedStateRegistryImpl::new();
    let entry = registry.register_value("x", constant(1));
    registry.perform_save();

    assert_eq!(as_i32(registry.consume_value("x")), Some(1));
    assert_eq!(as_i32(registry.consume_value("x")), None);
    entry.unregister();
}

#[test]
fn consume_never_consults_providers() {
    let registry = RetainedStateRegistryImpl::new();
    let calls = Rc::new(Cell::new(0));
    let _entry = {
        let calls = calls.clone();
        registry.register_value(
            "x",
            Box::new(move || {
                calls.set(calls.get() + 1);
                Rc::new(()) as RetainedValue
            }),
        )
    };

    assert!(registry.consume_value("x").is_none());
    assert_eq!(calls.get(), 0);
}

#[test]
fn shared_key_restores_latest_registration_first() {
    let registry = RetainedStateRegistryImpl::new();
    let _first = registry.register_value("k", constant(1));
    let _second = registry.register_value("k", constant(2));
    registry.perform_save();

    assert_eq!(as_i32(registry.consume_value("k")), Some(2));
    assert_eq!(as_i32(registry.consume_value("k")), Some(1));
    assert_eq!(as_i32(registry.consume_value("k")), None);
    assert!(registry.retained_snapshot().is_empty());
}

#[test]
fn repeated_save_replaces_instead_of_appending() {
    let registry = RetainedStateRegistryImpl::new();
    let current = Rc::new(Cell::new(1));
    let _entry = {
        let current = current.clone();
        registry.register_value("k", Box::new(move || Rc::new(current.get()) as RetainedValue))
    };

    registry.perform_save();
    current.set(2);
    registry.perform_save();

    assert_eq!(as_i32(registry.consume_value("k")), Some(2));
    assert_eq!(as_i32(registry.consume_value("k")), None);
}

#[test]
fn save_leaves_keys_without_providers_untouched() {
    let registry = RetainedStateRegistryImpl::with_restored([(
        "orphan".to_string(),
        vec![Rc::new(7) as RetainedValue],
    )]);
    let _entry = registry.register_value("live", constant(1));
    registry.perform_save();

    let snapshot = registry.retained_snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(as_i32(registry.consume_value("orphan")), Some(7));
}

#[test]
fn forget_drops_only_keys_without_live_providers() {
    let registry = RetainedStateRegistryImpl::new();
    let stale = registry.register_value("stale", constant(1));
    let _live = registry.register_value("live", constant(2));
    registry.perform_save();
    stale.unregister();

    registry.forget_unclaimed_values();

    assert!(registry.consume_value("stale").is_none());
    assert_eq!(as_i32(registry.consume_value("live")), Some(2));
}

#[test]
fn unregister_removes_one_provider_and_prunes_empty_keys() {
    let registry = RetainedStateRegistryImpl::new();
    let first = registry.register_value("k", constant(1));
    let second = registry.register_value("k", constant(2));

    first.unregister();
    assert_eq!(registry.provider_counts().get("k"), Some(&1));

    registry.perform_save();
    assert_eq!(as_i32(registry.consume_value("k")), Some(2));

    second.unregister();
    assert!(registry.provider_counts().is_empty());
}

#[test]
fn restored_values_skip_empty_sequences() {
    let registry = RetainedStateRegistryImpl::with_restored([
        ("empty".to_string(), Vec::new()),
        ("full".to_string(), vec![Rc::new(3) as RetainedValue]),
    ]);

    let snapshot = registry.retained_snapshot();
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.contains_key("full"));
}

#[test]
fn entry_outliving_registry_is_inert() {
    let registry = RetainedStateRegistryImpl::new();
    let entry = registry.register_value("k", constant(1));
    drop(registry);

    entry.unregister();
}

#[test]
fn no_op_registry_retains_nothing() {
    let registry = NoOpRetainedStateRegistry;
    let entry = registry.register_value("k", constant(1));
    registry.perform_save();

    assert!(registry.consume_value("k").is_none());
    assert_eq!(entry.key(), "k");
    entry.unregister();
}
