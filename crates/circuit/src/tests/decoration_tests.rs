use super::*;
use crate::backstack::SaveableBackStack;
use crate::screen::Screen;
use circuit_runtime::{location, Composition, DefaultScheduler, Runtime};
use std::sync::Arc;

#[derive(Debug, PartialEq)]
struct Named(&'static str);

impl Screen for Named {
    fn route(&self) -> String {
        self.0.to_owned()
    }
}

fn frame(
    composition: &mut Composition,
    decoration: &dyn NavigatorRouteDecoration,
    stack: &SaveableBackStack,
    time: u64,
) -> Vec<(String, f32)> {
    let top = stack.top().expect("stack has a root");
    composition.render(time, |cx| {
        let mut drawn = Vec::new();
        let alpha = local_route_alpha();
        decoration.decorated_content(cx, &top, stack.size(), &mut |cx, record| {
            drawn.push((record.route().to_owned(), cx.current(&alpha)));
        });
        drawn
    })
}

fn composition() -> Composition {
    Composition::new(Runtime::new(Arc::new(DefaultScheduler)), location!())
}

#[test]
fn empty_decoration_draws_only_the_top() {
    let stack = SaveableBackStack::with_root(Named("a"));
    stack.push(Named("b"));
    let mut composition = composition();

    let drawn = frame(&mut composition, &EmptyDecoration, &stack, 0);
    assert_eq!(drawn, [("b".to_string(), 1.0)]);
}

#[test]
fn crossfade_blends_previous_and_new_top_until_done() {
    let stack = SaveableBackStack::with_root(Named("a"));
    let decoration = CrossfadeDecoration::new(Duration::from_nanos(100));
    let mut composition = composition();

    assert_eq!(frame(&mut composition, &decoration, &stack, 0), [("a".to_string(), 1.0)]);

    stack.push(Named("b"));
    assert_eq!(
        frame(&mut composition, &decoration, &stack, 10),
        [("a".to_string(), 1.0), ("b".to_string(), 0.0)]
    );
    assert_eq!(
        frame(&mut composition, &decoration, &stack, 60),
        [("a".to_string(), 0.5), ("b".to_string(), 0.5)]
    );
    assert_eq!(frame(&mut composition, &decoration, &stack, 110), [("b".to_string(), 1.0)]);
}

#[test]
fn crossfade_keeps_the_runtime_busy_while_animating() {
    let runtime = Runtime::new(Arc::new(DefaultScheduler));
    let mut composition = Composition::new(runtime.clone(), location!());
    let stack = SaveableBackStack::with_root(Named("a"));
    let decoration = CrossfadeDecoration::new(Duration::from_nanos(100));

    frame(&mut composition, &decoration, &stack, 0);
    assert!(!runtime.needs_frame());

    stack.push(Named("b"));
    frame(&mut composition, &decoration, &stack, 10);
    assert!(runtime.needs_frame());
}
