//! Back stack of navigation records.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use circuit_retained::remember_retained;
use circuit_runtime::{Composer, RuntimeHandle};

use crate::screen::AnyScreen;

static NEXT_RECORD_KEY: AtomicU64 = AtomicU64::new(1);

/// Identifies one push onto a [`SaveableBackStack`]. Keys come from a
/// process-wide counter, so they are never reused by any stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey(u64);

impl RecordKey {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record-{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    screen: AnyScreen,
    key: RecordKey,
    route: String,
}

impl Record {
    pub fn screen(&self) -> &AnyScreen {
        &self.screen
    }

    pub fn key(&self) -> RecordKey {
        self.key
    }

    pub fn route(&self) -> &str {
        &self.route
    }
}

#[derive(Default)]
struct BackStackState {
    // Top of the stack first.
    entries: Vec<Record>,
    runtime: Option<RuntimeHandle>,
}

/// Ordered stack of [`Record`]s shared by the navigator and the content that
/// renders it. Clones refer to the same stack.
#[derive(Clone, Default)]
pub struct SaveableBackStack {
    state: Rc<RefCell<BackStackState>>,
}

impl SaveableBackStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stack holding a single root record for `screen`.
    pub fn with_root(screen: impl Into<AnyScreen>) -> Self {
        let stack = Self::new();
        stack.push(screen);
        stack
    }

    /// Requests a frame from `runtime` whenever the stack changes.
    pub fn attach(&self, runtime: RuntimeHandle) {
        self.state.borrow_mut().runtime = Some(runtime);
    }

    pub fn push(&self, screen: impl Into<AnyScreen>) -> RecordKey {
        let screen = screen.into();
        let (key, runtime) = {
            let mut state = self.state.borrow_mut();
            let key = RecordKey(NEXT_RECORD_KEY.fetch_add(1, Ordering::Relaxed));
            let route = screen.route();
            log::debug!("push {route} as {key}");
            state.entries.insert(0, Record { screen, key, route });
            (key, state.runtime.clone())
        };
        if let Some(runtime) = runtime {
            runtime.schedule();
        }
        key
    }

    /// Removes the top record. The root record is never removed.
    pub fn pop(&self) -> Option<Record> {
        let (record, runtime) = {
            let mut state = self.state.borrow_mut();
            if state.entries.len() <= 1 {
                return None;
            }
            let record = state.entries.remove(0);
            log::debug!("pop {} ({})", record.route, record.key);
            (record, state.runtime.clone())
        };
        if let Some(runtime) = runtime {
            runtime.schedule();
        }
        Some(record)
    }

    pub fn size(&self) -> usize {
        self.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().entries.is_empty()
    }

    pub fn is_at_root(&self) -> bool {
        self.size() == 1
    }

    pub fn top(&self) -> Option<Record> {
        self.state.borrow().entries.first().cloned()
    }

    pub fn root(&self) -> Option<Record> {
        self.state.borrow().entries.last().cloned()
    }

    /// Snapshot of the records, top first.
    pub fn records(&self) -> Vec<Record> {
        self.state.borrow().entries.clone()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Identity of the shared stack, equal for all clones.
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.state) as usize
    }
}

impl fmt::Debug for SaveableBackStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_list()
            .entries(state.entries.iter().map(|record| &record.route))
            .finish()
    }
}

/// Remembers a back stack seeded with `root` through the current retained
/// state registry, so a recreated composition gets the same stack back.
pub fn remember_saveable_back_stack(
    cx: &mut Composer<'_>,
    root: impl FnOnce() -> AnyScreen,
) -> SaveableBackStack {
    let stack = remember_retained(cx, || SaveableBackStack::with_root(root())).get();
    stack.attach(cx.runtime());
    stack
}

#[cfg(test)]
#[path = "tests/backstack_tests.rs"]
mod tests;
