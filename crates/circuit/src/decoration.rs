//! How the navigator presents the top record and transitions between tops.

use std::fmt;
use std::time::Duration;

use circuit_runtime::{Composer, CompositionLocal};

use crate::backstack::Record;

/// Content callback handed to a decoration: composes the given record.
pub type RecordContentFn<'a> = dyn FnMut(&mut Composer<'_>, &Record) + 'a;

pub trait NavigatorRouteDecoration {
    fn decorated_content(
        &self,
        cx: &mut Composer<'_>,
        top: &Record,
        back_stack_depth: usize,
        content: &mut RecordContentFn<'_>,
    );
}

/// Renders only the top record.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyDecoration;

impl NavigatorRouteDecoration for EmptyDecoration {
    fn decorated_content(
        &self,
        cx: &mut Composer<'_>,
        top: &Record,
        _back_stack_depth: usize,
        content: &mut RecordContentFn<'_>,
    ) {
        content(cx, top);
    }
}

thread_local! {
    static LOCAL_ROUTE_ALPHA: CompositionLocal<f32> = CompositionLocal::new(|| 1.0);
}

/// Opacity the current decoration assigns to the record being composed.
pub fn local_route_alpha() -> CompositionLocal<f32> {
    LOCAL_ROUTE_ALPHA.with(Clone::clone)
}

/// Fades from the previous top record to the new one over `duration`,
/// driven by frame time.
#[derive(Clone, Copy)]
pub struct CrossfadeDecoration {
    duration_nanos: u64,
}

impl CrossfadeDecoration {
    pub const DEFAULT_DURATION: Duration = Duration::from_millis(300);

    pub fn new(duration: Duration) -> Self {
        Self {
            duration_nanos: u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX),
        }
    }
}

impl Default for CrossfadeDecoration {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DURATION)
    }
}

impl fmt::Debug for CrossfadeDecoration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrossfadeDecoration")
            .field("duration", &Duration::from_nanos(self.duration_nanos))
            .finish()
    }
}

#[derive(Default)]
struct Crossfade {
    current: Option<Record>,
    previous: Option<Record>,
    started_at: u64,
}

impl NavigatorRouteDecoration for CrossfadeDecoration {
    fn decorated_content(
        &self,
        cx: &mut Composer<'_>,
        top: &Record,
        _back_stack_depth: usize,
        content: &mut RecordContentFn<'_>,
    ) {
        let now = cx.frame_time_nanos();
        let duration = self.duration_nanos;
        let (previous, progress) = cx.remember(Crossfade::default).update(|fade| {
            if fade.current.as_ref().map(Record::key) != Some(top.key()) {
                fade.previous = fade.current.replace(top.clone());
                fade.started_at = now;
            }
            let elapsed = now.saturating_sub(fade.started_at);
            let progress = if fade.previous.is_none() || duration == 0 {
                1.0
            } else {
                (elapsed as f64 / duration as f64).min(1.0) as f32
            };
            if progress >= 1.0 {
                fade.previous = None;
            }
            (fade.previous.clone(), progress)
        });

        let alpha = local_route_alpha();
        if let Some(previous) = previous {
            cx.with_key(&previous.key(), |cx| {
                cx.provide([alpha.provides(1.0 - progress)], |cx| content(cx, &previous));
            });
            let runtime = cx.runtime();
            cx.side_effect(move || runtime.schedule());
        }
        cx.with_key(&top.key(), |cx| {
            cx.provide([alpha.provides(progress)], |cx| content(cx, top));
        });
    }
}

#[cfg(test)]
#[path = "tests/decoration_tests.rs"]
mod tests;
