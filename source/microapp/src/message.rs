//! Messages sent to the microapp from outside, e.g. over a BLE control
//! characteristic.
//!
//! Without a handler, incoming bytes are appended to a byte buffer and read
//! back in arrival order. A message that does not fit in full is dropped.

use abi::sdk::{self, event::MessageBody, Ack, SdkType};
use heapless::Deque;

use crate::{
    interrupts::{InterruptKey, Registration},
    settings::MESSAGE_BUFFER_BYTES,
    Error, Microapp, Platform, ShimSettings,
};

pub type MessageHandler<P> = fn(&mut Microapp<P>, &[u8]);

const KEY: InterruptKey = InterruptKey::new(SdkType::Message, 0);

pub struct MessageState<P: Platform> {
    handler: Option<MessageHandler<P>>,
    inbox: Deque<u8, MESSAGE_BUFFER_BYTES>,
    limit: usize,
}

pub struct Messages<'a, P: Platform> {
    pub(crate) app: &'a mut Microapp<P>,
}

impl<P: Platform> MessageState<P> {
    pub(crate) fn new(settings: &ShimSettings) -> Self {
        Self {
            handler: None,
            inbox: Deque::new(),
            limit: settings.message_buffer_bytes.min(MESSAGE_BUFFER_BYTES),
        }
    }
}

impl<'a, P: Platform> Messages<'a, P> {
    /// Start buffering incoming messages.
    pub fn listen(&mut self) -> Result<(), Error> {
        self.app
            .register_interrupt(Registration::persistent(KEY, on_message::<P>, 0))
            .map(|_| ())
    }

    /// Hand every incoming message to `handler` instead of buffering it.
    pub fn set_handler(&mut self, handler: MessageHandler<P>) -> Result<(), Error> {
        self.listen()?;
        self.app.messages.handler = Some(handler);
        Ok(())
    }

    /// Number of buffered bytes.
    pub fn available(&self) -> usize {
        self.app.messages.inbox.len()
    }

    /// Move up to `buf.len()` buffered bytes into `buf`, oldest first.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> usize {
        let inbox = &mut self.app.messages.inbox;
        let mut n = 0;
        for slot in buf.iter_mut() {
            match inbox.pop_front() {
                Some(byte) => *slot = byte,
                None => break,
            }
            n += 1;
        }
        n
    }

    pub fn read(&mut self) -> Option<u8> {
        self.app.messages.inbox.pop_front()
    }
}

fn on_message<P: Platform>(app: &mut Microapp<P>, _: usize, body: &[u8]) -> Ack {
    let message = match sdk::decode_body::<MessageBody>(body) {
        Ok(message) => message,
        Err(error) => {
            tracing::warn!(%error, "malformed incoming message");
            return Ack::ErrUndefined;
        }
    };

    if let Some(handler) = app.messages.handler {
        handler(app, &message.data);
        return Ack::Success;
    }

    let state = &mut app.messages;
    let free = state.limit.saturating_sub(state.inbox.len());
    if message.data.len() > free {
        tracing::warn!(len = message.data.len(), free, "message buffer full, dropping message");
        return Ack::ErrNoSpace;
    }
    for byte in message.data {
        // fits, checked above
        let _ = state.inbox.push_back(byte);
    }
    Ack::Success
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::{self, TestPlatform};
    use abi::sdk::InterruptHeader;
    use heapless::Vec;

    fn deliver(app: &mut Microapp<TestPlatform>, data: &[u8]) -> Ack {
        let body = MessageBody {
            data: Vec::from_slice(data).unwrap(),
        };
        let mut buf = test_util::event(InterruptHeader::event(SdkType::Message, 0), &body);
        app.dispatch_interrupt(&mut buf)
    }

    #[test]
    fn fifo_bytes() {
        test_util::trace_init();
        let mut app = test_util::app();
        app.messages().listen().unwrap();
        deliver(&mut app, b"hello ");
        deliver(&mut app, b"world");
        assert_eq!(app.messages().available(), 11);

        let mut buf = [0u8; 8];
        assert_eq!(app.messages().read_bytes(&mut buf), 8);
        assert_eq!(&buf, b"hello wo");
        assert_eq!(app.messages().read(), Some(b'r'));
        assert_eq!(app.messages().read_bytes(&mut buf), 2);
        assert_eq!(&buf[..2], b"ld");
        assert_eq!(app.messages().read(), None);
    }

    #[test]
    fn overflow_drops_whole_message() {
        let mut app = test_util::app_with_settings(ShimSettings {
            message_buffer_bytes: 8,
            ..ShimSettings::default()
        });
        app.messages().listen().unwrap();
        assert_eq!(deliver(&mut app, b"123456"), Ack::Success);
        assert_eq!(deliver(&mut app, b"789"), Ack::ErrNoSpace);
        assert_eq!(deliver(&mut app, b"78"), Ack::Success);

        let mut buf = [0u8; 16];
        let n = app.messages().read_bytes(&mut buf);
        assert_eq!(&buf[..n], b"12345678");
    }

    #[test]
    fn listen_is_idempotent() {
        let mut app = test_util::app();
        app.messages().listen().unwrap();
        app.messages().listen().unwrap();
        assert_eq!(app.registered_interrupts(), 1);
        assert_eq!(app.platform().sent.len(), 1);
    }

    #[test]
    fn handler_gets_messages() {
        fn note(app: &mut Microapp<TestPlatform>, data: &[u8]) {
            let note = String::from_utf8_lossy(data).into_owned();
            app.platform_mut().notes.push(note);
        }

        let mut app = test_util::app();
        app.messages().listen().unwrap();
        deliver(&mut app, b"early");
        app.messages().set_handler(note).unwrap();
        deliver(&mut app, b"late");

        assert_eq!(app.platform().notes, ["late"]);
        assert_eq!(app.messages().available(), 5);
    }
}
