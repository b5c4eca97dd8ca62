use std::any::{self, Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use circuit_runtime::Composer;

use crate::channel::{EventChannel, EventSink};
use crate::container::ContentContainer;
use crate::presenter::AnyPresenter;
use crate::screen::{AnyScreen, Screen};

/// Renders the latest state and sends events back to the presenter.
pub trait Ui: 'static {
    type State: 'static;
    type Event: 'static;

    fn render(&self, cx: &mut Composer<'_>, state: &Self::State, events: &EventSink<Self::Event>);
}

pub(crate) trait ErasedUi {
    fn render(&self, cx: &mut Composer<'_>, state: &dyn Any, channel: &EventChannel);

    fn state_type(&self) -> TypeId;

    fn event_type(&self) -> TypeId;

    fn type_name(&self) -> &'static str;
}

struct UiAdapter<U>(U);

impl<U: Ui> ErasedUi for UiAdapter<U> {
    fn render(&self, cx: &mut Composer<'_>, state: &dyn Any, channel: &EventChannel) {
        match state.downcast_ref::<U::State>() {
            Some(state) => self.0.render(cx, state, &channel.sink::<U::Event>()),
            None => log::error!("{} received state of another type", any::type_name::<U>()),
        }
    }

    fn state_type(&self) -> TypeId {
        TypeId::of::<U::State>()
    }

    fn event_type(&self) -> TypeId {
        TypeId::of::<U::Event>()
    }

    fn type_name(&self) -> &'static str {
        any::type_name::<U>()
    }
}

/// Shared, type-erased [`Ui`].
#[derive(Clone)]
pub struct AnyUi(Rc<dyn ErasedUi>);

impl AnyUi {
    pub fn new<U: Ui>(ui: U) -> Self {
        Self(Rc::new(UiAdapter(ui)))
    }

    pub(crate) fn erased(&self) -> &dyn ErasedUi {
        &*self.0
    }

    /// True when `presenter` produces the state and accepts the events of
    /// this UI.
    pub fn pairs_with(&self, presenter: &AnyPresenter) -> bool {
        let presenter = presenter.erased();
        self.0.state_type() == presenter.state_type() && self.0.event_type() == presenter.event_type()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for AnyUi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AnyUi").field(&self.0.type_name()).finish()
    }
}

/// UI backed by a closure.
pub struct UiFn<S, E, F> {
    render: F,
    _types: PhantomData<fn(&S, E)>,
}

impl<S, E, F> Ui for UiFn<S, E, F>
where
    S: 'static,
    E: 'static,
    F: Fn(&mut Composer<'_>, &S, &EventSink<E>) + 'static,
{
    type State = S;
    type Event = E;

    fn render(&self, cx: &mut Composer<'_>, state: &S, events: &EventSink<E>) {
        (self.render)(cx, state, events);
    }
}

pub fn ui_fn<S, E, F>(render: F) -> AnyUi
where
    S: 'static,
    E: 'static,
    F: Fn(&mut Composer<'_>, &S, &EventSink<E>) + 'static,
{
    AnyUi::new(UiFn {
        render,
        _types: PhantomData,
    })
}

/// Resolves a UI for a screen; `None` passes to the next factory.
pub trait UiFactory {
    fn create(&self, screen: &AnyScreen, container: &Rc<dyn ContentContainer>) -> Option<AnyUi>;
}

impl<F> UiFactory for F
where
    F: Fn(&AnyScreen, &Rc<dyn ContentContainer>) -> Option<AnyUi>,
{
    fn create(&self, screen: &AnyScreen, container: &Rc<dyn ContentContainer>) -> Option<AnyUi> {
        self(screen, container)
    }
}

/// Factory answering only for screens of type `S`.
pub fn ui_factory_for<S, F>(create: F) -> impl UiFactory
where
    S: Screen,
    F: Fn(&S) -> AnyUi,
{
    move |screen: &AnyScreen, _container: &Rc<dyn ContentContainer>| {
        screen.downcast_ref::<S>().map(&create)
    }
}
