//! Screen navigation for Circuit-RS.
//!
//! A [`Screen`] names a destination. [`CircuitConfig`] resolves each screen
//! to a [`Presenter`] that produces state and a [`Ui`] that renders it.
//! [`factory_navigator`] renders a [`SaveableBackStack`] through those
//! factories, giving every record its own event channel and retained state.
//! [`ContentHost`] drives the composition and survives recreation through
//! [`circuit_retained::Continuity`].

pub mod back;
pub mod backstack;
pub mod channel;
pub mod config;
pub mod container;
pub mod decoration;
pub mod error;
pub mod navigator;
pub mod navigator_content;
pub mod presenter;
pub mod provided_values;
pub mod screen;
pub mod ui;

pub use back::{back_handler, local_back_dispatcher, BackDispatcher};
pub use backstack::{remember_saveable_back_stack, Record, RecordKey, SaveableBackStack};
pub use channel::{EventSink, Events, TrySendError, EVENT_CHANNEL_CAPACITY};
pub use config::{CircuitConfig, CircuitConfigBuilder};
pub use container::{Content, ContentContainer, ContentHost};
pub use decoration::{
    local_route_alpha, CrossfadeDecoration, EmptyDecoration, NavigatorRouteDecoration,
    RecordContentFn,
};
pub use error::RenderError;
pub use navigator::{navigator, BackStackNavigator, CircuitNavigator, Navigator, OnPopHandler};
pub use navigator_content::{
    basic_factory_navigator, default_unavailable_route, factory_navigator, NavigatorOptions,
    UnavailableRoute,
};
pub use presenter::{
    presenter_factory_for, presenter_fn, AnyPresenter, Presenter, PresenterFactory, PresenterFn,
};
pub use provided_values::{
    circuit_object_factory, BackStackRecordLocalProvider, BackStackRecordLocalProviderStore,
    RecordTeardown, RetainedRecordLocalProvider,
};
pub use screen::{AnyScreen, Screen, ScreenEq};
pub use ui::{ui_factory_for, ui_fn, AnyUi, Ui, UiFactory, UiFn};
