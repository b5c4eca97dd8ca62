//! Bounded event channel between a UI and its presenter.
//!
//! Sends never block: a full or closed channel hands the event back. Every
//! accepted event requests a frame so the presenter sees it on the next pass.

use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use circuit_runtime::RuntimeHandle;
use thiserror::Error;

/// Capacity of the channel created for each presenter and UI pair.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrySendError<E> {
    #[error("event channel is full")]
    Full(E),
    #[error("event channel is closed")]
    Closed(E),
}

impl<E> TrySendError<E> {
    pub fn into_inner(self) -> E {
        match self {
            Self::Full(event) | Self::Closed(event) => event,
        }
    }
}

struct ChannelState {
    buffer: VecDeque<Box<dyn Any>>,
    capacity: usize,
    closed: bool,
}

/// Type-erased channel owned by mounted record content.
pub(crate) struct EventChannel {
    state: Rc<RefCell<ChannelState>>,
    runtime: RuntimeHandle,
}

impl EventChannel {
    pub(crate) fn new(capacity: usize, runtime: RuntimeHandle) -> Self {
        Self {
            state: Rc::new(RefCell::new(ChannelState {
                buffer: VecDeque::with_capacity(capacity.min(EVENT_CHANNEL_CAPACITY)),
                capacity,
                closed: false,
            })),
            runtime,
        }
    }

    pub(crate) fn sink<E: 'static>(&self) -> EventSink<E> {
        EventSink {
            state: Rc::clone(&self.state),
            runtime: self.runtime.clone(),
            _event: PhantomData,
        }
    }

    pub(crate) fn events<E: 'static>(&self) -> Events<'_, E> {
        Events {
            channel: self,
            _event: PhantomData,
        }
    }

    fn receive(&self) -> Option<Box<dyn Any>> {
        self.state.borrow_mut().buffer.pop_front()
    }

    pub(crate) fn close(&self) {
        let mut state = self.state.borrow_mut();
        if !state.closed {
            state.closed = true;
            state.buffer.clear();
        }
    }
}

impl Drop for EventChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Sending half handed to a UI. Clones feed the same channel.
pub struct EventSink<E> {
    state: Rc<RefCell<ChannelState>>,
    runtime: RuntimeHandle,
    _event: PhantomData<fn(E)>,
}

impl<E: 'static> EventSink<E> {
    pub fn try_send(&self, event: E) -> Result<(), TrySendError<E>> {
        {
            let mut state = self.state.borrow_mut();
            if state.closed {
                return Err(TrySendError::Closed(event));
            }
            if state.buffer.len() >= state.capacity {
                return Err(TrySendError::Full(event));
            }
            state.buffer.push_back(Box::new(event));
        }
        self.runtime.schedule();
        Ok(())
    }

    /// Sends `event`, dropping it when the channel cannot take it.
    pub fn send(&self, event: E) {
        if let Err(err) = self.try_send(event) {
            log::trace!("dropped {}: {err}", std::any::type_name::<E>());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }
}

impl<E> Clone for EventSink<E> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            runtime: self.runtime.clone(),
            _event: PhantomData,
        }
    }
}

impl<E> fmt::Debug for EventSink<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("EventSink")
            .field("pending", &state.buffer.len())
            .field("closed", &state.closed)
            .finish()
    }
}

/// Events waiting for a presenter during the current pass.
///
/// Events that are not taken stay queued for the next pass.
pub struct Events<'a, E> {
    channel: &'a EventChannel,
    _event: PhantomData<fn() -> E>,
}

impl<E: 'static> Iterator for Events<'_, E> {
    type Item = E;

    fn next(&mut self) -> Option<E> {
        loop {
            let event = self.channel.receive()?;
            match event.downcast::<E>() {
                Ok(event) => return Some(*event),
                Err(_) => log::warn!("discarding event that is not a {}", std::any::type_name::<E>()),
            }
        }
    }
}

impl<E> fmt::Debug for Events<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Events")
            .field("pending", &self.channel.state.borrow().buffer.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/channel_tests.rs"]
mod tests;
