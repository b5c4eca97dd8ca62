//! Host services the runtime delegates to.
//!
//! A Circuit host only has to say when a frame should be produced and what
//! time it is; everything else (slot storage, frame callbacks, cooperative
//! tasks) lives in [`crate::Runtime`].

/// Requests frames from the host.
///
/// Wakers of runtime tasks call [`RuntimeScheduler::schedule_frame`] from
/// whatever thread woke them, so implementations must be thread safe.
pub trait RuntimeScheduler: Send + Sync {
    /// Request that the host produce a new frame.
    fn schedule_frame(&self);
}

/// Monotonic time source used to stamp frames.
pub trait Clock: Send + Sync {
    type Instant: Copy + Send + Sync;

    fn now(&self) -> Self::Instant;

    /// Nanoseconds elapsed since `since`.
    fn elapsed_nanos(&self, since: Self::Instant) -> u64;
}
