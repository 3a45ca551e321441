//! Subscriptions to bluenet events, the host firmware's internal event bus.

use abi::sdk::{self, event::BluenetEventBody, Ack, SdkType};

use crate::{
    interrupts::{InterruptKey, InterruptTable, Registration},
    settings::MAX_SUBSCRIPTIONS,
    Error, Microapp, Platform, ShimSettings,
};

pub type EventHandler<P> = fn(&mut Microapp<P>, u8, &[u8]);

pub struct EventState<P: Platform> {
    subscriptions: InterruptTable<u8, EventHandler<P>, MAX_SUBSCRIPTIONS>,
}

pub struct Events<'a, P: Platform> {
    pub(crate) app: &'a mut Microapp<P>,
}

impl<P: Platform> EventState<P> {
    pub(crate) fn new(settings: &ShimSettings) -> Self {
        Self {
            subscriptions: InterruptTable::new(settings.max_subscriptions),
        }
    }
}

impl<'a, P: Platform> Events<'a, P> {
    /// Run `handler` for every bluenet event of `event_type`.
    ///
    /// Subscribing to an event type twice is a no-op: the first handler
    /// stays.
    pub fn subscribe(&mut self, event_type: u8, handler: EventHandler<P>) -> Result<(), Error> {
        let (id, inserted) = self
            .app
            .events
            .subscriptions
            .insert_unique(event_type, handler)?;
        if !inserted {
            return Ok(());
        }

        let registration = Registration::persistent(
            InterruptKey::new(SdkType::BluenetEvent, event_type),
            on_event::<P>,
            usize::from(event_type),
        );
        if let Err(error) = self.app.register_interrupt(registration) {
            self.app.events.subscriptions.remove(id);
            return Err(error);
        }
        Ok(())
    }

    pub fn is_subscribed(&self, event_type: u8) -> bool {
        self.app.events.subscriptions.find(&event_type).is_some()
    }

    pub fn subscriptions(&self) -> usize {
        self.app.events.subscriptions.len()
    }
}

fn on_event<P: Platform>(app: &mut Microapp<P>, context: usize, body: &[u8]) -> Ack {
    let Ok(event_type) = u8::try_from(context) else {
        return Ack::ErrUndefined;
    };
    let Some(handler) = app
        .events
        .subscriptions
        .find(&event_type)
        .and_then(|id| app.events.subscriptions.get(id).copied())
    else {
        return Ack::ErrNotFound;
    };

    match sdk::decode_body::<BluenetEventBody>(body) {
        Ok(event) => {
            handler(app, event_type, &event.data);
            Ack::Success
        }
        Err(error) => {
            tracing::warn!(event_type, %error, "malformed bluenet event");
            Ack::ErrUndefined
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::{self, TestPlatform};
    use abi::sdk::InterruptHeader;
    use heapless::Vec;
    use proptest::prelude::*;

    fn first(app: &mut Microapp<TestPlatform>, event_type: u8, data: &[u8]) {
        app.platform_mut()
            .notes
            .push(format!("first {event_type} {data:?}"));
    }

    fn second(app: &mut Microapp<TestPlatform>, event_type: u8, _: &[u8]) {
        app.platform_mut().notes.push(format!("second {event_type}"));
    }

    fn deliver(app: &mut Microapp<TestPlatform>, event_type: u8, data: &[u8]) -> Ack {
        let body = BluenetEventBody {
            data: Vec::from_slice(data).unwrap(),
        };
        let mut buf = test_util::event(
            InterruptHeader::event(SdkType::BluenetEvent, event_type),
            &body,
        );
        app.dispatch_interrupt(&mut buf)
    }

    #[test]
    fn subscribe_twice_keeps_one() {
        test_util::trace_init();
        let mut app = test_util::app();
        app.events().subscribe(40, first).unwrap();
        app.events().subscribe(40, second).unwrap();
        assert_eq!(app.events().subscriptions(), 1);
        assert_eq!(app.registered_interrupts(), 1);
        assert_eq!(app.platform().sent.len(), 1);

        assert_eq!(deliver(&mut app, 40, &[1, 2]), Ack::Success);
        assert_eq!(app.platform().notes, ["first 40 [1, 2]"]);
    }

    #[test]
    fn separate_event_types() {
        let mut app = test_util::app();
        app.events().subscribe(1, first).unwrap();
        app.events().subscribe(2, second).unwrap();
        deliver(&mut app, 2, &[]);
        deliver(&mut app, 1, &[]);
        assert_eq!(app.platform().notes, ["second 2", "first 1 []"]);
        assert_eq!(deliver(&mut app, 3, &[]), Ack::ErrNotFound);
    }

    proptest! {
        #[test]
        fn idempotent_for_any_sequence(types in proptest::collection::vec(0u8..8, 0..16)) {
            let mut app = test_util::app_with_settings(ShimSettings {
                max_subscriptions: 8,
                ..ShimSettings::default()
            });
            let mut unique = std::collections::BTreeSet::new();
            for event_type in types {
                let res = app.events().subscribe(event_type, first);
                if unique.len() < MAX_SUBSCRIPTIONS || unique.contains(&event_type) {
                    prop_assert!(res.is_ok());
                    unique.insert(event_type);
                } else {
                    prop_assert_eq!(res, Err(Error::NoSpace));
                }
            }
            prop_assert_eq!(app.events().subscriptions(), unique.len());
            for event_type in unique {
                prop_assert!(app.events().is_subscribed(event_type));
            }
        }
    }
}
