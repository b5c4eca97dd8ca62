//! Standard runtime services backed by Rust's `std` library.
//!
//! [`StdRuntime`] bundles a [`circuit_runtime::Runtime`] with a scheduler that
//! records frame requests in an atomic flag and a monotonic clock that stamps
//! frames. Hosts poll [`StdRuntime::take_frame_request`] to decide when to run
//! the next frame.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use circuit_runtime::{Clock, Runtime, RuntimeHandle, RuntimeScheduler};

/// Flags frame requests for the host loop to poll.
#[derive(Default)]
struct StdScheduler {
    frame_requested: AtomicBool,
}

impl StdScheduler {
    fn take_frame_request(&self) -> bool {
        self.frame_requested.swap(false, Ordering::SeqCst)
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field(
                "frame_requested",
                &self.frame_requested.load(Ordering::SeqCst),
            )
            .finish()
    }
}

impl RuntimeScheduler for StdScheduler {
    fn schedule_frame(&self) {
        if !self.frame_requested.swap(true, Ordering::SeqCst) {
            log::trace!("frame requested");
        }
    }
}

/// Monotonic clock over [`std::time::Instant`].
#[derive(Debug, Default, Clone, Copy)]
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    fn elapsed_nanos(&self, since: Self::Instant) -> u64 {
        u64::try_from(since.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

/// Runtime, scheduler and clock for hosts running on `std`.
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Arc<StdScheduler>,
    clock: StdClock,
    started: Instant,
    runtime: Runtime,
}

impl StdRuntime {
    pub fn new() -> Self {
        let scheduler = Arc::new(StdScheduler::default());
        let runtime = Runtime::new(scheduler.clone());
        let clock = StdClock;
        Self {
            scheduler,
            started: clock.now(),
            clock,
            runtime,
        }
    }

    pub fn runtime(&self) -> Runtime {
        self.runtime.clone()
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    /// Nanoseconds since this runtime was created; used to stamp frames.
    pub fn uptime_nanos(&self) -> u64 {
        self.clock.elapsed_nanos(self.started)
    }

    /// True when a frame was requested since the last poll or the runtime
    /// still has frame work pending.
    pub fn take_frame_request(&self) -> bool {
        let requested = self.scheduler.take_frame_request();
        requested || self.runtime.needs_frame()
    }

    /// Runs pending frame callbacks with `frame_time_nanos`, then polls every
    /// task they woke.
    pub fn drain_frame_callbacks(&self, frame_time_nanos: u64) {
        let handle = self.runtime_handle();
        handle.drain_frame_callbacks(frame_time_nanos);
        handle.drain_ui();
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .field("clock", &self.clock)
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use circuit_runtime::{location, Composition};

    use super::StdRuntime;

    #[test]
    fn frame_request_is_raised_by_frame_callbacks_and_cleared_after_frame() {
        let runtime = StdRuntime::new();
        assert!(!runtime.take_frame_request());

        let fired = Rc::new(Cell::new(0u64));
        let registration = {
            let fired = fired.clone();
            runtime
                .runtime()
                .frame_clock()
                .with_frame_nanos(move |time| fired.set(time))
        };
        assert!(runtime.take_frame_request());

        runtime.runtime().set_needs_frame(false);
        runtime.drain_frame_callbacks(16);
        drop(registration);

        assert_eq!(fired.get(), 16);
        assert!(!runtime.take_frame_request());
    }

    #[test]
    fn effect_awaiting_a_frame_resumes_on_the_next_drain() {
        let runtime = StdRuntime::new();
        let mut composition = Composition::new(runtime.runtime(), location!());
        let resumed = Rc::new(Cell::new(false));

        {
            let resumed = resumed.clone();
            composition.render(0, move |cx| {
                cx.launched_effect(&(), move |scope| async move {
                    scope.frame_clock().next_frame().await;
                    resumed.set(true);
                });
            });
        }
        runtime.runtime_handle().drain_ui();
        assert!(runtime.take_frame_request());
        assert!(!resumed.get());

        runtime.drain_frame_callbacks(1);
        assert!(resumed.get());
    }

    #[test]
    fn uptime_is_monotonic() {
        let runtime = StdRuntime::new();
        let first = runtime.uptime_nanos();
        assert!(runtime.uptime_nanos() >= first);
    }
}
