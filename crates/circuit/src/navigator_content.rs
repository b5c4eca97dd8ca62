//! Renders a back stack through the configured presenter and UI factories.
//!
//! Every record on the stack is mounted into a [`ContentCache`] entry that
//! owns the record's resolved presenter and UI, its event channel and the
//! slot store its content composes into. Entries follow the record key, so
//! reordering the stack or changing the decoration never remounts them; an
//! entry is torn down when its record leaves the stack.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use circuit_runtime::{Composer, ProvidedValue, RuntimeHandle, SlotStore};
use indexmap::IndexMap;

use crate::back::back_handler;
use crate::backstack::{Record, RecordKey, SaveableBackStack};
use crate::channel::{EventChannel, EVENT_CHANNEL_CAPACITY};
use crate::config::CircuitConfig;
use crate::container::ContentContainer;
use crate::decoration::{CrossfadeDecoration, EmptyDecoration, NavigatorRouteDecoration};
use crate::navigator::Navigator;
use crate::presenter::AnyPresenter;
use crate::provided_values::{
    BackStackRecordLocalProvider, RecordTeardown, RetainedRecordLocalProvider,
};
use crate::ui::AnyUi;

/// Renders the route name of a screen nothing could be resolved for.
pub type UnavailableRoute = Rc<dyn Fn(&mut Composer<'_>, &str)>;

/// Logs the missing route once per mount.
pub fn default_unavailable_route(cx: &mut Composer<'_>, route: &str) {
    cx.remember(|| log::warn!("route not available: {route}"));
}

#[derive(Clone)]
pub struct NavigatorOptions {
    pub enable_back_handler: bool,
    pub decoration: Rc<dyn NavigatorRouteDecoration>,
    pub unavailable_route: UnavailableRoute,
    pub record_local_providers: Vec<Rc<dyn BackStackRecordLocalProvider>>,
    pub event_capacity: usize,
}

impl NavigatorOptions {
    /// Options without back handling, decoration or record locals.
    pub fn basic() -> Self {
        Self {
            enable_back_handler: false,
            decoration: Rc::new(EmptyDecoration),
            unavailable_route: Rc::new(default_unavailable_route),
            record_local_providers: Vec::new(),
            event_capacity: EVENT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_back_handler(mut self, enabled: bool) -> Self {
        self.enable_back_handler = enabled;
        self
    }

    pub fn with_decoration(mut self, decoration: impl NavigatorRouteDecoration + 'static) -> Self {
        self.decoration = Rc::new(decoration);
        self
    }

    pub fn with_unavailable_route(
        mut self,
        render: impl Fn(&mut Composer<'_>, &str) + 'static,
    ) -> Self {
        self.unavailable_route = Rc::new(render);
        self
    }

    pub fn with_record_local_provider(
        mut self,
        provider: impl BackStackRecordLocalProvider + 'static,
    ) -> Self {
        self.record_local_providers.push(Rc::new(provider));
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

impl Default for NavigatorOptions {
    fn default() -> Self {
        Self {
            enable_back_handler: true,
            decoration: Rc::new(CrossfadeDecoration::default()),
            ..Self::basic()
        }
        .with_record_local_provider(RetainedRecordLocalProvider)
    }
}

impl fmt::Debug for NavigatorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigatorOptions")
            .field("enable_back_handler", &self.enable_back_handler)
            .field("record_local_providers", &self.record_local_providers.len())
            .field("event_capacity", &self.event_capacity)
            .finish_non_exhaustive()
    }
}

enum RecordBody {
    Available {
        presenter: AnyPresenter,
        ui: AnyUi,
        channel: EventChannel,
    },
    Unavailable,
}

// Fields drop in order: the slot store retires before provider teardowns run.
struct RecordContent {
    record: Record,
    body: RecordBody,
    store: SlotStore,
    teardowns: Vec<RecordTeardown>,
}

struct MountContext<'a> {
    circuit: &'a CircuitConfig,
    navigator: &'a Rc<dyn Navigator>,
    container: &'a Rc<dyn ContentContainer>,
    providers: &'a [Rc<dyn BackStackRecordLocalProvider>],
    event_capacity: usize,
    runtime: RuntimeHandle,
}

impl RecordContent {
    fn mount(cx: &Composer<'_>, record: &Record, context: &MountContext<'_>) -> Self {
        let screen = record.screen();
        let ui = context.circuit.ui(screen, context.container);
        let presenter = context.circuit.presenter(screen, context.navigator);
        let body = match (presenter, ui) {
            (Some(presenter), Some(ui)) if ui.pairs_with(&presenter) => RecordBody::Available {
                presenter,
                ui,
                channel: EventChannel::new(context.event_capacity, context.runtime.clone()),
            },
            (Some(presenter), Some(ui)) => {
                log::warn!(
                    "{presenter:?} and {ui:?} disagree on state or event type for {}",
                    record.route()
                );
                RecordBody::Unavailable
            }
            _ => RecordBody::Unavailable,
        };
        let teardowns = context
            .providers
            .iter()
            .filter_map(|provider| provider.on_mount(cx, record))
            .collect();
        log::debug!("mounted {} ({})", record.route(), record.key());
        Self {
            record: record.clone(),
            body,
            store: SlotStore::new(),
            teardowns,
        }
    }

    fn compose(
        &mut self,
        cx: &mut Composer<'_>,
        providers: &[Rc<dyn BackStackRecordLocalProvider>],
        unavailable_route: &UnavailableRoute,
    ) {
        let Self {
            record,
            body,
            store,
            ..
        } = self;
        cx.subcompose(store, |cx| {
            let mut values: Vec<ProvidedValue> = Vec::new();
            for provider in providers {
                values.extend(provider.provide_values(cx, record));
            }
            cx.provide(values, |cx| match body {
                RecordBody::Available {
                    presenter,
                    ui,
                    channel,
                } => {
                    let state = presenter.erased().present(cx, channel);
                    ui.erased().render(cx, &*state, channel);
                }
                RecordBody::Unavailable => (**unavailable_route)(cx, record.route()),
            });
        });
    }
}

impl Drop for RecordContent {
    fn drop(&mut self) {
        log::debug!("unmounted {} ({})", self.record.route(), self.record.key());
    }
}

/// Mounted content per record key.
#[derive(Default)]
struct ContentCache {
    entries: IndexMap<RecordKey, Rc<RefCell<RecordContent>>>,
}

impl ContentCache {
    /// Mounts new records and returns the content of records that left the
    /// stack, so the caller can tear it down outside the cache borrow.
    fn sync(
        &mut self,
        cx: &Composer<'_>,
        records: &[Record],
        context: &MountContext<'_>,
    ) -> Vec<Rc<RefCell<RecordContent>>> {
        let stale: Vec<RecordKey> = self
            .entries
            .keys()
            .filter(|key| !records.iter().any(|record| record.key() == **key))
            .copied()
            .collect();
        let removed = stale
            .iter()
            .filter_map(|key| self.entries.shift_remove(key))
            .collect();
        for record in records {
            if !self.entries.contains_key(&record.key()) {
                let content = RecordContent::mount(cx, record, context);
                self.entries
                    .insert(record.key(), Rc::new(RefCell::new(content)));
            }
        }
        removed
    }

    fn get(&self, key: RecordKey) -> Option<Rc<RefCell<RecordContent>>> {
        self.entries.get(&key).cloned()
    }
}

/// Renders `back_stack` and pops it on back presses while it is above its
/// root and `options.enable_back_handler` is set.
pub fn factory_navigator(
    cx: &mut Composer<'_>,
    circuit: &CircuitConfig,
    back_stack: &SaveableBackStack,
    navigator: &Rc<dyn Navigator>,
    container: &Rc<dyn ContentContainer>,
    options: &NavigatorOptions,
) {
    let stack = back_stack.clone();
    back_handler(cx, options.enable_back_handler && !back_stack.is_at_root(), move || {
        stack.pop();
    });
    basic_factory_navigator(cx, circuit, back_stack, navigator, container, options);
}

/// Renders `back_stack` without installing a back handler.
pub fn basic_factory_navigator(
    cx: &mut Composer<'_>,
    circuit: &CircuitConfig,
    back_stack: &SaveableBackStack,
    navigator: &Rc<dyn Navigator>,
    container: &Rc<dyn ContentContainer>,
    options: &NavigatorOptions,
) {
    let records = back_stack.records();
    let cache = cx.remember_keyed(&back_stack.id(), ContentCache::default);
    let providers = options.record_local_providers.as_slice();
    let context = MountContext {
        circuit,
        navigator,
        container,
        providers,
        event_capacity: options.event_capacity,
        runtime: cx.runtime(),
    };
    let removed = cache.update(|cache| cache.sync(&*cx, &records, &context));
    drop(removed);

    let Some(top) = records.first() else {
        return;
    };
    let unavailable_route = &options.unavailable_route;
    options
        .decoration
        .decorated_content(cx, top, records.len(), &mut |cx, record| {
            let content = cache.with(|cache| cache.get(record.key()));
            if let Some(content) = content {
                content
                    .borrow_mut()
                    .compose(cx, providers, unavailable_route);
            }
        });
}

#[cfg(test)]
#[path = "tests/navigator_content_tests.rs"]
mod tests;
