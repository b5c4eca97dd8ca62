//! Positional memoization, composition locals and effects.
//!
//! A [`SlotStore`] holds values remembered by a composition. Every render
//! pass marks the slots it touches; at the end of the pass untouched slots are
//! removed and their [`RememberObserver`]s are told they were forgotten, in
//! the order they were first remembered. Slots created during a pass are
//! committed (`on_remembered`) once the pass finishes; a store dropped before
//! that point reports them as abandoned instead.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::mem;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::frame_clock::FrameClock;
use crate::hash::{combine, hash_one, map::HashMap};
use crate::owned::Owned;
use crate::runtime::{Runtime, RuntimeHandle, TaskHandle};
use crate::Key;

/// Lifecycle callbacks for objects held by a slot store.
pub trait RememberObserver {
    fn on_remembered(&self) {}

    fn on_forgotten(&self) {}

    fn on_abandoned(&self) {}
}

struct Slot {
    value: Box<dyn Any>,
    observer: Option<Rc<dyn RememberObserver>>,
    input: Option<Key>,
    seq: u64,
    pass: u64,
    committed: bool,
}

fn retire(slots: &[Slot]) {
    for slot in slots {
        if let Some(observer) = &slot.observer {
            if slot.committed {
                observer.on_forgotten();
            } else {
                observer.on_abandoned();
            }
        }
    }
}

struct PassOutcome {
    retired: Vec<Slot>,
    remembered: Vec<Rc<dyn RememberObserver>>,
}

impl PassOutcome {
    fn dispatch(self) {
        retire(&self.retired);
        drop(self.retired);
        for observer in self.remembered {
            observer.on_remembered();
        }
    }
}

#[derive(Default)]
pub struct SlotStore {
    slots: HashMap<Key, Slot>,
    replaced: Vec<Slot>,
    pass: u64,
    next_seq: u64,
}

impl SlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn begin_pass(&mut self) {
        self.pass += 1;
    }

    fn use_slot<T: Clone + 'static>(
        &mut self,
        key: Key,
        input: Option<Key>,
        init: impl FnOnce() -> (T, Option<Rc<dyn RememberObserver>>),
    ) -> T {
        let pass = self.pass;
        if let Some(slot) = self.slots.get_mut(&key) {
            if slot.input == input {
                if let Some(value) = slot.value.downcast_ref::<T>() {
                    slot.pass = pass;
                    return value.clone();
                }
            }
        }
        if let Some(stale) = self.slots.remove(&key) {
            self.replaced.push(stale);
        }
        let (value, observer) = init();
        let seq = self.next_seq;
        self.next_seq += 1;
        self.slots.insert(
            key,
            Slot {
                value: Box::new(value.clone()),
                observer,
                input,
                seq,
                pass,
                committed: false,
            },
        );
        value
    }

    fn finish_pass(&mut self) -> PassOutcome {
        let pass = self.pass;
        let stale: Vec<Key> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.pass != pass)
            .map(|(key, _)| *key)
            .collect();
        let mut retired = mem::take(&mut self.replaced);
        for key in stale {
            if let Some(slot) = self.slots.remove(&key) {
                retired.push(slot);
            }
        }
        retired.sort_by_key(|slot| slot.seq);

        let mut remembered: Vec<(u64, Rc<dyn RememberObserver>)> = Vec::new();
        for slot in self.slots.values_mut() {
            if slot.committed {
                continue;
            }
            slot.committed = true;
            if let Some(observer) = &slot.observer {
                remembered.push((slot.seq, Rc::clone(observer)));
            }
        }
        remembered.sort_by_key(|(seq, _)| *seq);

        PassOutcome {
            retired,
            remembered: remembered.into_iter().map(|(_, observer)| observer).collect(),
        }
    }
}

impl Drop for SlotStore {
    fn drop(&mut self) {
        let mut slots: Vec<Slot> = self
            .slots
            .drain()
            .map(|(_, slot)| slot)
            .chain(self.replaced.drain(..))
            .collect();
        slots.sort_by_key(|slot| slot.seq);
        retire(&slots);
    }
}

impl fmt::Debug for SlotStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotStore")
            .field("slots", &self.slots.len())
            .field("pass", &self.pass)
            .finish()
    }
}

static NEXT_LOCAL_KEY: AtomicUsize = AtomicUsize::new(1);

/// Ambient value visible to everything composed inside a
/// [`Composer::provide`] call that supplies it.
pub struct CompositionLocal<T: 'static> {
    key: usize,
    default: Rc<dyn Fn() -> T>,
}

impl<T: 'static> Clone for CompositionLocal<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            default: Rc::clone(&self.default),
        }
    }
}

impl<T: 'static> PartialEq for CompositionLocal<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T: 'static> Eq for CompositionLocal<T> {}

impl<T: Clone + 'static> CompositionLocal<T> {
    pub fn new(default: impl Fn() -> T + 'static) -> Self {
        Self {
            key: NEXT_LOCAL_KEY.fetch_add(1, Ordering::Relaxed),
            default: Rc::new(default),
        }
    }

    pub fn provides(&self, value: T) -> ProvidedValue {
        ProvidedValue {
            key: self.key,
            value: Rc::new(value),
        }
    }

    pub fn default_value(&self) -> T {
        (self.default)()
    }
}

impl<T: 'static> fmt::Debug for CompositionLocal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositionLocal")
            .field("key", &self.key)
            .finish()
    }
}

#[derive(Clone)]
pub struct ProvidedValue {
    key: usize,
    value: Rc<dyn Any>,
}

impl fmt::Debug for ProvidedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvidedValue")
            .field("key", &self.key)
            .finish()
    }
}

struct LocalFrame {
    parent: Option<Rc<LocalFrame>>,
    values: Vec<ProvidedValue>,
}

#[derive(Clone, Copy)]
struct GroupFrame {
    key: Key,
    next_child: u64,
}

impl GroupFrame {
    fn new(key: Key) -> Self {
        Self { key, next_child: 0 }
    }
}

/// Scope handed to the body of a [`Composer::launched_effect`].
#[derive(Clone, Debug)]
pub struct EffectScope {
    runtime: RuntimeHandle,
}

impl EffectScope {
    pub fn runtime(&self) -> RuntimeHandle {
        self.runtime.clone()
    }

    pub fn frame_clock(&self) -> FrameClock {
        self.runtime.frame_clock()
    }
}

type EffectTask = Pin<Box<dyn Future<Output = ()> + 'static>>;
type EffectStart = Box<dyn FnOnce(EffectScope) -> EffectTask>;

struct LaunchedEffect {
    runtime: RuntimeHandle,
    start: RefCell<Option<EffectStart>>,
    task: RefCell<Option<TaskHandle>>,
}

impl LaunchedEffect {
    fn new<F, Fut>(runtime: RuntimeHandle, effect: F) -> Self
    where
        F: FnOnce(EffectScope) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        let start: EffectStart = Box::new(move |scope| -> EffectTask { Box::pin(effect(scope)) });
        Self {
            runtime,
            start: RefCell::new(Some(start)),
            task: RefCell::new(None),
        }
    }

    fn cancel(&self) {
        self.start.borrow_mut().take();
        if let Some(task) = self.task.borrow_mut().take() {
            task.cancel();
        }
    }
}

impl RememberObserver for LaunchedEffect {
    fn on_remembered(&self) {
        let start = self.start.borrow_mut().take();
        if let Some(start) = start {
            let scope = EffectScope {
                runtime: self.runtime.clone(),
            };
            *self.task.borrow_mut() = self.runtime.spawn_ui(start(scope));
        }
    }

    fn on_forgotten(&self) {
        self.cancel();
    }

    fn on_abandoned(&self) {
        self.cancel();
    }
}

/// Handle passed to composable content for the duration of one pass.
pub struct Composer<'a> {
    store: &'a mut SlotStore,
    runtime: RuntimeHandle,
    locals: Option<Rc<LocalFrame>>,
    current: GroupFrame,
    parents: Vec<GroupFrame>,
    side_effects: Vec<Box<dyn FnOnce()>>,
    frame_time_nanos: u64,
}

fn compose_pass<R>(
    store: &mut SlotStore,
    runtime: RuntimeHandle,
    frame_time_nanos: u64,
    locals: Option<Rc<LocalFrame>>,
    root_key: Key,
    content: impl FnOnce(&mut Composer<'_>) -> R,
) -> R {
    store.begin_pass();
    let (result, side_effects) = {
        let mut composer = Composer {
            store: &mut *store,
            runtime,
            locals,
            current: GroupFrame::new(root_key),
            parents: Vec::new(),
            side_effects: Vec::new(),
            frame_time_nanos,
        };
        let result = content(&mut composer);
        (result, composer.side_effects)
    };
    store.finish_pass().dispatch();
    for effect in side_effects {
        effect();
    }
    result
}

impl<'a> Composer<'a> {
    pub fn runtime(&self) -> RuntimeHandle {
        self.runtime.clone()
    }

    pub fn frame_clock(&self) -> FrameClock {
        self.runtime.frame_clock()
    }

    /// Timestamp of the frame being composed.
    pub fn frame_time_nanos(&self) -> u64 {
        self.frame_time_nanos
    }

    /// Key that identifies the next positional slot in the current group.
    pub fn composite_key_hash(&self) -> Key {
        combine(self.current.key, self.current.next_child)
    }

    fn next_slot_key(&mut self) -> Key {
        let key = self.composite_key_hash();
        self.current.next_child += 1;
        key
    }

    /// Composes `content` in a group identified by `key` rather than by
    /// position, so its slots follow the key when siblings are reordered.
    pub fn with_key<K: Hash + ?Sized, R>(
        &mut self,
        key: &K,
        content: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let child = GroupFrame::new(combine(self.current.key, hash_one(key)));
        let parent = mem::replace(&mut self.current, child);
        self.parents.push(parent);
        let result = content(self);
        if let Some(parent) = self.parents.pop() {
            self.current = parent;
        }
        result
    }

    pub fn remember<T: 'static>(&mut self, init: impl FnOnce() -> T) -> Owned<T> {
        let key = self.next_slot_key();
        self.store.use_slot(key, None, || (Owned::new(init()), None))
    }

    /// Like [`Composer::remember`], but re-runs `init` whenever `inputs`
    /// hash differently from the previous pass.
    pub fn remember_keyed<K: Hash + ?Sized, T: 'static>(
        &mut self,
        inputs: &K,
        init: impl FnOnce() -> T,
    ) -> Owned<T> {
        let key = self.next_slot_key();
        let input = Some(hash_one(inputs));
        self.store
            .use_slot(key, input, || (Owned::new(init()), None))
    }

    pub fn remember_observer<T: RememberObserver + 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> Rc<T> {
        let key = self.next_slot_key();
        self.store.use_slot(key, None, || observed(init()))
    }

    pub fn remember_observer_keyed<K: Hash + ?Sized, T: RememberObserver + 'static>(
        &mut self,
        inputs: &K,
        init: impl FnOnce() -> T,
    ) -> Rc<T> {
        let key = self.next_slot_key();
        let input = Some(hash_one(inputs));
        self.store.use_slot(key, input, || observed(init()))
    }

    pub fn provide<R>(
        &mut self,
        values: impl IntoIterator<Item = ProvidedValue>,
        content: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let values: Vec<ProvidedValue> = values.into_iter().collect();
        if values.is_empty() {
            return content(self);
        }
        let frame = Rc::new(LocalFrame {
            parent: self.locals.clone(),
            values,
        });
        let previous = self.locals.replace(frame);
        let result = content(self);
        self.locals = previous;
        result
    }

    pub fn current<T: Clone + 'static>(&self, local: &CompositionLocal<T>) -> T {
        let mut frame = self.locals.as_deref();
        while let Some(current) = frame {
            let provided = current
                .values
                .iter()
                .rev()
                .find(|value| value.key == local.key)
                .and_then(|value| value.value.downcast_ref::<T>());
            if let Some(value) = provided {
                return value.clone();
            }
            frame = current.parent.as_deref();
        }
        local.default_value()
    }

    /// Runs `effect` after the current pass has been committed.
    pub fn side_effect(&mut self, effect: impl FnOnce() + 'static) {
        self.side_effects.push(Box::new(effect));
    }

    /// Launches `effect` as a runtime task once this position is committed.
    /// The task is cancelled when `keys` change or the position leaves the
    /// composition.
    pub fn launched_effect<K, F, Fut>(&mut self, keys: &K, effect: F)
    where
        K: Hash + ?Sized,
        F: FnOnce(EffectScope) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        let runtime = self.runtime.clone();
        self.remember_observer_keyed(keys, move || LaunchedEffect::new(runtime, effect));
    }

    /// Composes `content` into a separate slot store that the caller owns.
    /// Moving the store moves everything remembered inside it.
    pub fn subcompose<R>(
        &mut self,
        store: &mut SlotStore,
        content: impl FnOnce(&mut Composer<'_>) -> R,
    ) -> R {
        compose_pass(
            store,
            self.runtime.clone(),
            self.frame_time_nanos,
            self.locals.clone(),
            0,
            content,
        )
    }
}

fn observed<T: RememberObserver + 'static>(value: T) -> (Rc<T>, Option<Rc<dyn RememberObserver>>) {
    let value = Rc::new(value);
    let observer: Rc<dyn RememberObserver> = value.clone();
    (value, Some(observer))
}

/// Root slot store plus the runtime it composes against.
pub struct Composition {
    store: SlotStore,
    runtime: Runtime,
    root_key: Key,
}

impl Composition {
    pub fn new(runtime: Runtime, root_key: Key) -> Self {
        Self {
            store: SlotStore::new(),
            runtime,
            root_key,
        }
    }

    pub fn render<R>(
        &mut self,
        frame_time_nanos: u64,
        content: impl FnOnce(&mut Composer<'_>) -> R,
    ) -> R {
        compose_pass(
            &mut self.store,
            self.runtime.handle(),
            frame_time_nanos,
            None,
            self.root_key,
            content,
        )
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn slot_count(&self) -> usize {
        self.store.len()
    }
}

impl fmt::Debug for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composition")
            .field("store", &self.store)
            .field("root_key", &self.root_key)
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/composer_tests.rs"]
mod tests;
