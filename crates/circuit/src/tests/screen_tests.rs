use super::*;

#[derive(Debug, PartialEq)]
struct Inbox;

impl Screen for Inbox {}

#[derive(Debug, PartialEq)]
struct Detail {
    id: u32,
}

impl Screen for Detail {
    fn route(&self) -> String {
        format!("detail/{}", self.id)
    }
}

#[derive(Debug, PartialEq)]
struct Wrapper<T>(T);

impl<T: PartialEq + fmt::Debug + 'static> Screen for Wrapper<T> {}

#[test]
fn equality_compares_type_and_value() {
    assert_eq!(AnyScreen::new(Detail { id: 1 }), AnyScreen::new(Detail { id: 1 }));
    assert_ne!(AnyScreen::new(Detail { id: 1 }), AnyScreen::new(Detail { id: 2 }));
    assert_ne!(AnyScreen::new(Inbox), AnyScreen::new(Detail { id: 1 }));
}

#[test]
fn route_defaults_to_short_type_name() {
    assert_eq!(AnyScreen::new(Inbox).route(), "Inbox");
    assert_eq!(AnyScreen::new(Wrapper(Inbox)).route(), "Wrapper");
    assert_eq!(AnyScreen::new(Detail { id: 7 }).route(), "detail/7");
}

#[test]
fn downcast_recovers_the_concrete_screen() {
    let screen = AnyScreen::from(Detail { id: 3 });
    assert!(screen.is::<Detail>());
    assert_eq!(screen.downcast_ref::<Detail>().map(|detail| detail.id), Some(3));
    assert!(screen.downcast_ref::<Inbox>().is_none());
}
