use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures_task::{waker, ArcWake};

use crate::frame_clock::FrameClock;
use crate::hash::map::{HashMap, HashSet};
use crate::platform::RuntimeScheduler;

pub(crate) type FrameCallbackId = u64;
pub type TaskId = u64;

type LocalTask = Pin<Box<dyn Future<Output = ()> + 'static>>;

/// Task ids woken since the last drain. Wakers may fire from any thread, so
/// this is the only piece of runtime state behind a lock.
#[derive(Default)]
struct ReadyQueue {
    ids: Mutex<VecDeque<TaskId>>,
}

impl ReadyQueue {
    fn push(&self, id: TaskId) {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        if !ids.contains(&id) {
            ids.push_back(id);
        }
    }

    fn pop(&self) -> Option<TaskId> {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn is_empty(&self) -> bool {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

struct TaskWaker {
    id: TaskId,
    ready: Arc<ReadyQueue>,
    scheduler: Arc<dyn RuntimeScheduler>,
}

impl ArcWake for TaskWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.ready.push(arc_self.id);
        arc_self.scheduler.schedule_frame();
    }
}

pub(crate) struct FrameCallbackEntry {
    id: FrameCallbackId,
    callback: Option<Box<dyn FnOnce(u64) + 'static>>,
}

pub(crate) struct RuntimeInner {
    scheduler: Arc<dyn RuntimeScheduler>,
    needs_frame: Cell<bool>,
    frame_callbacks: RefCell<VecDeque<FrameCallbackEntry>>,
    next_frame_callback_id: Cell<FrameCallbackId>,
    tasks: RefCell<HashMap<TaskId, LocalTask>>,
    ready: Arc<ReadyQueue>,
    polling: Cell<Option<TaskId>>,
    cancelled_while_polling: RefCell<HashSet<TaskId>>,
    next_task_id: Cell<TaskId>,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            scheduler,
            needs_frame: Cell::new(false),
            frame_callbacks: RefCell::new(VecDeque::new()),
            next_frame_callback_id: Cell::new(1),
            tasks: RefCell::new(HashMap::new()),
            ready: Arc::new(ReadyQueue::default()),
            polling: Cell::new(None),
            cancelled_while_polling: RefCell::new(HashSet::new()),
            next_task_id: Cell::new(1),
        }
    }

    fn schedule(&self) {
        self.needs_frame.set(true);
        self.scheduler.schedule_frame();
    }

    fn register_frame_callback(&self, callback: Box<dyn FnOnce(u64) + 'static>) -> FrameCallbackId {
        let id = self.next_frame_callback_id.get();
        self.next_frame_callback_id.set(id + 1);
        self.frame_callbacks
            .borrow_mut()
            .push_back(FrameCallbackEntry {
                id,
                callback: Some(callback),
            });
        self.schedule();
        id
    }

    fn cancel_frame_callback(&self, id: FrameCallbackId) {
        let mut callbacks = self.frame_callbacks.borrow_mut();
        if let Some(index) = callbacks.iter().position(|entry| entry.id == id) {
            callbacks.remove(index);
        }
    }

    fn drain_frame_callbacks(&self, frame_time_nanos: u64) {
        // Callbacks registered while draining wait for the next frame.
        let pending: Vec<Box<dyn FnOnce(u64) + 'static>> = {
            let mut callbacks = self.frame_callbacks.borrow_mut();
            callbacks
                .drain(..)
                .filter_map(|mut entry| entry.callback.take())
                .collect()
        };
        for callback in pending {
            callback(frame_time_nanos);
        }
    }

    fn has_frame_callbacks(&self) -> bool {
        !self.frame_callbacks.borrow().is_empty()
    }

    fn spawn(&self, task: LocalTask) -> TaskId {
        let id = self.next_task_id.get();
        self.next_task_id.set(id + 1);
        self.tasks.borrow_mut().insert(id, task);
        self.ready.push(id);
        self.schedule();
        id
    }

    fn cancel(&self, id: TaskId) {
        let removed = self.tasks.borrow_mut().remove(&id);
        if removed.is_some() {
            log::trace!("cancelled task {id}");
        } else if self.polling.get() == Some(id) {
            self.cancelled_while_polling.borrow_mut().insert(id);
        }
        drop(removed);
    }

    fn is_task_active(&self, id: TaskId) -> bool {
        if self.polling.get() == Some(id) {
            return !self.cancelled_while_polling.borrow().contains(&id);
        }
        self.tasks.borrow().contains_key(&id)
    }

    fn drain_tasks(&self) {
        while let Some(id) = self.ready.pop() {
            let task = self.tasks.borrow_mut().remove(&id);
            let Some(mut task) = task else {
                continue;
            };
            let task_waker = waker(Arc::new(TaskWaker {
                id,
                ready: Arc::clone(&self.ready),
                scheduler: Arc::clone(&self.scheduler),
            }));
            let mut cx = Context::from_waker(&task_waker);
            self.polling.set(Some(id));
            let poll = task.as_mut().poll(&mut cx);
            self.polling.set(None);
            let cancelled = self.cancelled_while_polling.borrow_mut().remove(&id);
            match poll {
                Poll::Ready(()) => log::trace!("task {id} completed"),
                Poll::Pending if cancelled => drop(task),
                Poll::Pending => {
                    self.tasks.borrow_mut().insert(id, task);
                }
            }
        }
    }

    fn has_ready_tasks(&self) -> bool {
        !self.ready.is_empty()
    }
}

/// Owner of the frame-callback queue and the cooperative task set.
///
/// Everything here runs on the thread that drives the host's frames.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    pub fn needs_frame(&self) -> bool {
        self.inner.needs_frame.get()
    }

    pub fn set_needs_frame(&self, value: bool) {
        self.inner.needs_frame.set(value);
    }

    pub fn frame_clock(&self) -> FrameClock {
        FrameClock::new(self.handle())
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("needs_frame", &self.inner.needs_frame.get())
            .field("tasks", &self.inner.tasks.borrow().len())
            .finish()
    }
}

/// Scheduler for runtimes nobody drives; frames are produced on demand.
#[derive(Default, Debug)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_frame(&self) {}
}

/// Weak reference to a [`Runtime`]. Every operation is a no-op once the
/// runtime has been dropped.
#[derive(Clone)]
pub struct RuntimeHandle(Weak<RuntimeInner>);

impl RuntimeHandle {
    pub fn schedule(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.schedule();
        }
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    pub fn needs_frame(&self) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.needs_frame.get())
            .unwrap_or(false)
    }

    pub fn set_needs_frame(&self, value: bool) {
        if let Some(inner) = self.0.upgrade() {
            inner.needs_frame.set(value);
        }
    }

    pub(crate) fn register_frame_callback(
        &self,
        callback: impl FnOnce(u64) + 'static,
    ) -> Option<FrameCallbackId> {
        self.0
            .upgrade()
            .map(|inner| inner.register_frame_callback(Box::new(callback)))
    }

    pub(crate) fn cancel_frame_callback(&self, id: FrameCallbackId) {
        if let Some(inner) = self.0.upgrade() {
            inner.cancel_frame_callback(id);
        }
    }

    pub fn drain_frame_callbacks(&self, frame_time_nanos: u64) {
        if let Some(inner) = self.0.upgrade() {
            inner.drain_frame_callbacks(frame_time_nanos);
        }
    }

    pub fn has_frame_callbacks(&self) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.has_frame_callbacks())
            .unwrap_or(false)
    }

    /// Spawns a future polled by [`RuntimeHandle::drain_ui`] on this thread.
    ///
    /// Returns `None` when the runtime is gone; the future is dropped unpolled.
    pub fn spawn_ui(&self, future: impl Future<Output = ()> + 'static) -> Option<TaskHandle> {
        let inner = self.0.upgrade()?;
        let id = inner.spawn(Box::pin(future));
        Some(TaskHandle {
            runtime: self.clone(),
            id,
        })
    }

    /// Polls every task woken since the last drain until none are ready.
    pub fn drain_ui(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.drain_tasks();
        }
    }

    pub fn has_ready_tasks(&self) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.has_ready_tasks())
            .unwrap_or(false)
    }

    pub fn frame_clock(&self) -> FrameClock {
        FrameClock::new(self.clone())
    }
}

impl fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RuntimeHandle")
            .field(&self.is_alive())
            .finish()
    }
}

/// Handle to a task spawned with [`RuntimeHandle::spawn_ui`]. Dropping the
/// handle detaches the task; [`TaskHandle::cancel`] drops its future.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    runtime: RuntimeHandle,
    id: TaskId,
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn cancel(&self) {
        if let Some(inner) = self.runtime.0.upgrade() {
            inner.cancel(self.id);
        }
    }

    /// True until the task completes or is cancelled.
    pub fn is_active(&self) -> bool {
        self.runtime
            .0
            .upgrade()
            .map(|inner| inner.is_task_active(self.id))
            .unwrap_or(false)
    }
}
