//! Surfaces navigators render into.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use circuit_retained::{
    local_can_retain_checker, local_scoped_object_store, with_continuity, CanRetainChecker,
    Continuity, ScopedObjectStore,
};
use circuit_runtime::{location, Composer, Composition, RuntimeHandle};
use circuit_runtime_std::StdRuntime;

use crate::back::{local_back_dispatcher, BackDispatcher};
use crate::error::RenderError;
use crate::provided_values::circuit_object_factory;

/// Composable content handed to a container. Composed on every frame until
/// replaced.
pub type Content = Rc<dyn Fn(&mut Composer<'_>)>;

pub trait ContentContainer {
    /// Replaces whatever the container shows with `content`.
    fn render(&self, content: Content);
}

struct HostSurface {
    content: RefCell<Option<Content>>,
    generation: Cell<u64>,
    runtime: RuntimeHandle,
}

impl ContentContainer for HostSurface {
    fn render(&self, content: Content) {
        *self.content.borrow_mut() = Some(content);
        self.generation.set(self.generation.get() + 1);
        log::debug!("content replaced (generation {})", self.generation.get());
        self.runtime.schedule();
    }
}

/// Drives a single composition for the content of a [`ContentContainer`].
///
/// The host owns the runtime, the back dispatcher and the scoped object
/// store that keeps [`Continuity`] alive. [`ContentHost::recreate`] tears
/// the composition down as a retainable transition and rebuilds it on the
/// next frame; [`ContentHost::dispose`] is the final teardown.
pub struct ContentHost {
    runtime: StdRuntime,
    surface: Rc<HostSurface>,
    composition: Option<Composition>,
    composed_generation: u64,
    scope: Rc<ScopedObjectStore>,
    continuity: Rc<Continuity>,
    retaining: Rc<Cell<bool>>,
    can_retain: Rc<dyn CanRetainChecker>,
    back: Rc<BackDispatcher>,
    disposed: bool,
}

impl ContentHost {
    pub fn new() -> Result<Self, RenderError> {
        Self::with_scope(StdRuntime::new(), Rc::new(ScopedObjectStore::new()))
    }

    /// A host whose retained state lives in `scope`.
    pub fn with_scope(runtime: StdRuntime, scope: Rc<ScopedObjectStore>) -> Result<Self, RenderError> {
        let continuity = Continuity::obtain_with(&scope, &circuit_object_factory)?;
        let retaining = Rc::new(Cell::new(false));
        let can_retain: Rc<dyn CanRetainChecker> = {
            let retaining = retaining.clone();
            Rc::new(move || retaining.get())
        };
        let surface = Rc::new(HostSurface {
            content: RefCell::new(None),
            generation: Cell::new(0),
            runtime: runtime.runtime_handle(),
        });
        Ok(Self {
            runtime,
            surface,
            composition: None,
            composed_generation: 0,
            scope,
            continuity,
            retaining,
            can_retain,
            back: Rc::new(BackDispatcher::new()),
            disposed: false,
        })
    }

    pub fn container(&self) -> Rc<dyn ContentContainer> {
        self.surface.clone()
    }

    pub fn runtime(&self) -> &StdRuntime {
        &self.runtime
    }

    pub fn scope(&self) -> Rc<ScopedObjectStore> {
        self.scope.clone()
    }

    pub fn continuity(&self) -> Rc<Continuity> {
        self.continuity.clone()
    }

    pub fn back_dispatcher(&self) -> Rc<BackDispatcher> {
        self.back.clone()
    }

    /// True when something asked for a frame since the last call.
    pub fn take_frame_request(&self) -> bool {
        self.runtime.take_frame_request()
    }

    /// Runs one frame: frame callbacks and woken tasks first, then a full
    /// composition pass, then tasks woken by that pass.
    pub fn frame(&mut self, frame_time_nanos: u64) -> Result<(), RenderError> {
        if self.disposed {
            return Err(RenderError::Disposed);
        }
        self.runtime.runtime().set_needs_frame(false);
        self.runtime.drain_frame_callbacks(frame_time_nanos);

        let generation = self.surface.generation.get();
        if generation != self.composed_generation {
            if self.composition.take().is_some() {
                log::debug!("discarded previous content");
            }
            self.composed_generation = generation;
        }
        let content = self.surface.content.borrow().clone();
        let Some(content) = content else {
            return Ok(());
        };

        let runtime = self.runtime.runtime();
        let composition = self
            .composition
            .get_or_insert_with(|| Composition::new(runtime, location!()));
        let locals = [
            local_back_dispatcher().provides(Some(self.back.clone())),
            local_scoped_object_store().provides(Some(self.scope.clone())),
            local_can_retain_checker().provides(self.can_retain.clone()),
        ];
        let continuity = &self.continuity;
        let can_retain = &self.can_retain;
        composition.render(frame_time_nanos, |cx| {
            cx.provide(locals, |cx| {
                with_continuity(cx, continuity, can_retain, |cx| (*content)(cx));
            });
        });
        self.runtime.runtime_handle().drain_ui();
        Ok(())
    }

    /// Runs a frame stamped with the runtime's uptime.
    pub fn frame_now(&mut self) -> Result<(), RenderError> {
        let now = self.runtime.uptime_nanos();
        self.frame(now)
    }

    /// Forwards a system back press; returns whether a handler consumed it.
    pub fn back_pressed(&self) -> bool {
        self.back.on_back_pressed()
    }

    /// Tears the composition down as a retainable transition. The content is
    /// composed again, restoring retained state, on the next frame.
    pub fn recreate(&mut self) -> Result<(), RenderError> {
        if self.disposed {
            return Err(RenderError::Disposed);
        }
        self.retaining.set(true);
        let previous = self.composition.take();
        drop(previous);
        self.retaining.set(false);
        log::debug!("composition recreated");
        self.runtime.runtime_handle().schedule();
        Ok(())
    }

    /// Final teardown: drops the composition and clears the scope.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.composition.take();
        self.surface.content.borrow_mut().take();
        self.scope.clear();
        log::debug!("content host disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl fmt::Debug for ContentHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentHost")
            .field("generation", &self.composed_generation)
            .field("composed", &self.composition.is_some())
            .field("disposed", &self.disposed)
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/container_tests.rs"]
mod tests;
