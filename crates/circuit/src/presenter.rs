//! Presenters turn a screen and its incoming events into UI state.

use std::any::{self, Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use circuit_runtime::Composer;

use crate::channel::{EventChannel, Events};
use crate::navigator::Navigator;
use crate::screen::{AnyScreen, Screen};

/// Produces one state snapshot per pass.
///
/// `present` runs inside the record's composition, so it may remember
/// values (including retained ones) and launch effects. `events` yields what
/// the UI sent since the previous pass; anything left unread stays queued.
pub trait Presenter: 'static {
    type State: 'static;
    type Event: 'static;

    fn present(&self, cx: &mut Composer<'_>, events: Events<'_, Self::Event>) -> Self::State;
}

pub(crate) trait ErasedPresenter {
    fn present(&self, cx: &mut Composer<'_>, channel: &EventChannel) -> Box<dyn Any>;

    fn state_type(&self) -> TypeId;

    fn event_type(&self) -> TypeId;

    fn type_name(&self) -> &'static str;
}

struct PresenterAdapter<P>(P);

impl<P: Presenter> ErasedPresenter for PresenterAdapter<P> {
    fn present(&self, cx: &mut Composer<'_>, channel: &EventChannel) -> Box<dyn Any> {
        Box::new(self.0.present(cx, channel.events::<P::Event>()))
    }

    fn state_type(&self) -> TypeId {
        TypeId::of::<P::State>()
    }

    fn event_type(&self) -> TypeId {
        TypeId::of::<P::Event>()
    }

    fn type_name(&self) -> &'static str {
        any::type_name::<P>()
    }
}

/// Shared, type-erased [`Presenter`].
#[derive(Clone)]
pub struct AnyPresenter(Rc<dyn ErasedPresenter>);

impl AnyPresenter {
    pub fn new<P: Presenter>(presenter: P) -> Self {
        Self(Rc::new(PresenterAdapter(presenter)))
    }

    pub(crate) fn erased(&self) -> &dyn ErasedPresenter {
        &*self.0
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for AnyPresenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AnyPresenter").field(&self.0.type_name()).finish()
    }
}

/// Presenter backed by a closure.
pub struct PresenterFn<S, E, F> {
    present: F,
    _types: PhantomData<fn(E) -> S>,
}

impl<S, E, F> Presenter for PresenterFn<S, E, F>
where
    S: 'static,
    E: 'static,
    F: Fn(&mut Composer<'_>, Events<'_, E>) -> S + 'static,
{
    type State = S;
    type Event = E;

    fn present(&self, cx: &mut Composer<'_>, events: Events<'_, E>) -> S {
        (self.present)(cx, events)
    }
}

pub fn presenter_fn<S, E, F>(present: F) -> AnyPresenter
where
    S: 'static,
    E: 'static,
    F: Fn(&mut Composer<'_>, Events<'_, E>) -> S + 'static,
{
    AnyPresenter::new(PresenterFn {
        present,
        _types: PhantomData,
    })
}

/// Resolves a presenter for a screen; `None` passes to the next factory.
pub trait PresenterFactory {
    fn create(&self, screen: &AnyScreen, navigator: &Rc<dyn Navigator>) -> Option<AnyPresenter>;
}

impl<F> PresenterFactory for F
where
    F: Fn(&AnyScreen, &Rc<dyn Navigator>) -> Option<AnyPresenter>,
{
    fn create(&self, screen: &AnyScreen, navigator: &Rc<dyn Navigator>) -> Option<AnyPresenter> {
        self(screen, navigator)
    }
}

/// Factory answering only for screens of type `S`.
pub fn presenter_factory_for<S, F>(create: F) -> impl PresenterFactory
where
    S: Screen,
    F: Fn(&S, &Rc<dyn Navigator>) -> AnyPresenter,
{
    move |screen: &AnyScreen, navigator: &Rc<dyn Navigator>| {
        screen
            .downcast_ref::<S>()
            .map(|screen| create(screen, navigator))
    }
}
