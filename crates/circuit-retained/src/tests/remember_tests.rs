use super::*;
use crate::registry::RetainedStateRegistryImpl;
use circuit_runtime::{location, Composition, DefaultScheduler, Runtime};
use std::sync::Arc;

fn composition() -> Composition {
    Composition::new(Runtime::new(Arc::new(DefaultScheduler)), location!())
}

fn render_counter(
    composition: &mut Composition,
    registry: &Rc<RetainedStateRegistryImpl>,
    present: bool,
) -> Option<Owned<u32>> {
    let provided: Rc<dyn RetainedStateRegistry> = registry.clone();
    composition.render(0, |cx| {
        cx.provide([local_retained_state_registry().provides(provided)], |cx| {
            present.then(|| remember_retained(cx, || 0u32))
        })
    })
}

#[test]
fn value_is_registered_after_commit_and_released_on_forget() {
    let registry = Rc::new(RetainedStateRegistryImpl::new());
    let mut composition = composition();

    let counter = render_counter(&mut composition, &registry, true);
    assert!(counter.is_some());
    assert_eq!(registry.provider_counts().values().sum::<usize>(), 1);

    render_counter(&mut composition, &registry, false);
    assert!(registry.provider_counts().is_empty());
}

#[test]
fn recreated_composition_restores_saved_value() {
    let registry = Rc::new(RetainedStateRegistryImpl::new());

    let mut first = composition();
    let counter = render_counter(&mut first, &registry, true).expect("counter is composed");
    counter.replace(41);
    registry.perform_save();
    drop(first);

    let mut second = composition();
    let restored = render_counter(&mut second, &registry, true).expect("counter is composed");

    assert!(restored.ptr_eq(&counter));
    assert_eq!(restored.get(), 41);
}

#[test]
fn explicit_keys_restore_independently() {
    let registry = Rc::new(RetainedStateRegistryImpl::new());
    let provided: Rc<dyn RetainedStateRegistry> = registry.clone();
    let render = |composition: &mut Composition| {
        let provided = provided.clone();
        composition.render(0, move |cx| {
            cx.provide([local_retained_state_registry().provides(provided)], |cx| {
                let a = remember_retained_keyed(cx, "a", || String::from("a"));
                let b = remember_retained_keyed(cx, "b", || String::from("b"));
                (a, b)
            })
        })
    };

    let mut first = composition();
    let (a, b) = render(&mut first);
    a.replace("changed".into());
    registry.perform_save();
    drop(first);

    let mut second = composition();
    let (a2, b2) = render(&mut second);
    assert_eq!(a2.get(), "changed");
    assert!(b2.ptr_eq(&b));
}

#[test]
fn without_a_registry_nothing_is_retained() {
    let mut first = composition();
    let counter = first.render(0, |cx| remember_retained(cx, || 1u8));
    counter.replace(9);
    drop(first);

    let mut second = composition();
    let fresh = second.render(0, |cx| remember_retained(cx, || 1u8));
    assert_eq!(fresh.get(), 1);
}
