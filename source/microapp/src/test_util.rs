use std::collections::VecDeque;

use abi::{
    ipc::{HostRecord, IpcIndex, IpcRamData},
    sdk::{self, Ack, Header, InterruptHeader, SdkType, ACK_OFFSET, INTERRUPT_PENDING},
    MAX_PAYLOAD,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{Microapp, Platform, ShimSettings};

/// Where the test host "publishes" its callback.
pub(crate) const HOST_CALLBACK: usize = 0x0004_2001;

/// What the test platform reports as the microapp's interrupt entry.
pub(crate) const INTERRUPT_ENTRY: usize = 0x2000_4001;

type Responder = Box<dyn FnMut(&mut [u8; MAX_PAYLOAD], usize) -> i32>;

/// An in-memory host firmware.
///
/// Records every request it is handed, then answers through a scripted
/// responder. The default responder acknowledges everything with
/// [`Ack::Success`] and leaves the body as it was.
///
/// Interrupts queued with [`raise`](Self::raise) are delivered instead of an
/// answer, one per call. Calls that deliver an interrupt are not recorded in
/// `sent`.
pub(crate) struct TestPlatform {
    ipc: IpcRamData,
    /// Every request, as answered.
    pub(crate) sent: Vec<Vec<u8>>,
    /// Scratch space for handlers, which can't capture anything.
    pub(crate) notes: Vec<String>,
    /// Events to raise, each during the next request of the given type (or
    /// of any type).
    pending: VecDeque<(Option<SdkType>, Vec<u8>)>,
    responder: Responder,
}

impl TestPlatform {
    pub(crate) fn new() -> Self {
        let mut platform = Self::without_host();
        platform.publish_host();
        platform
    }

    pub(crate) fn without_host() -> Self {
        Self::with_ipc(IpcRamData::new())
    }

    pub(crate) fn with_ipc(ipc: IpcRamData) -> Self {
        Self {
            ipc,
            sent: Vec::new(),
            notes: Vec::new(),
            pending: VecDeque::new(),
            responder: Box::new(ack_success),
        }
    }

    pub(crate) fn publish_host(&mut self) {
        HostRecord::callback_at(HOST_CALLBACK)
            .publish(&mut self.ipc, IpcIndex::CrownstoneApp)
            .expect("host record must fit");
    }

    pub(crate) fn respond(&mut self, f: impl FnMut(&mut [u8; MAX_PAYLOAD], usize) -> i32 + 'static) {
        self.responder = Box::new(f);
    }

    /// Raise `event` during the next request.
    pub(crate) fn raise(&mut self, event: Vec<u8>) {
        self.pending.push_back((None, event));
    }

    /// Raise `event` during the next `sdk_type` request.
    pub(crate) fn raise_during(&mut self, sdk_type: SdkType, event: Vec<u8>) {
        self.pending.push_back((Some(sdk_type), event));
    }

    /// Decode the `n`th recorded request.
    #[track_caller]
    pub(crate) fn sent_as<T: DeserializeOwned>(&self, n: usize) -> (Header, T) {
        let raw = self
            .sent
            .get(n)
            .unwrap_or_else(|| panic!("only {} requests were sent", self.sent.len()));
        sdk::decode_message(raw).expect("recorded request must decode")
    }

    /// The types of every recorded request, in order.
    pub(crate) fn sent_types(&self) -> Vec<SdkType> {
        self.sent
            .iter()
            .map(|raw| sdk::split_message(raw).expect("recorded header").0.sdk_type)
            .collect()
    }
}

impl Platform for TestPlatform {
    type Ipc = IpcRamData;

    fn ipc(&self) -> &Self::Ipc {
        &self.ipc
    }

    fn ipc_mut(&mut self) -> &mut Self::Ipc {
        &mut self.ipc
    }

    unsafe fn invoke(
        &mut self,
        callback: usize,
        buffer: &mut [u8; MAX_PAYLOAD],
        len: usize,
        interrupt: &mut [u8; MAX_PAYLOAD],
    ) -> i32 {
        assert_eq!(callback, HOST_CALLBACK, "called an unpublished address");

        let sdk_type = sdk::split_message(&buffer[..len])
            .ok()
            .map(|(header, _)| header.sdk_type);
        let due = self
            .pending
            .iter()
            .position(|(during, _)| during.is_none() || *during == sdk_type);
        if let Some((_, event)) = due.and_then(|idx| self.pending.remove(idx)) {
            interrupt.fill(0);
            interrupt[..event.len()].copy_from_slice(&event);
            return INTERRUPT_PENDING;
        }

        self.sent.push(buffer[..len].to_vec());
        (self.responder)(buffer, len)
    }

    fn interrupt_entry(&self) -> usize {
        INTERRUPT_ENTRY
    }
}

pub(crate) fn ack_success(buf: &mut [u8; MAX_PAYLOAD], _len: usize) -> i32 {
    buf[ACK_OFFSET] = Ack::Success.into();
    0
}

/// Overwrite `buf` with a response.
pub(crate) fn reply<T: Serialize>(buf: &mut [u8], sdk_type: SdkType, ack: Ack, body: &T) {
    sdk::encode_message(Header { sdk_type, ack }, body, buf).expect("reply must fit");
}

/// Build an interrupt event buffer, the way the host lays one out.
pub(crate) fn event<T: Serialize>(header: InterruptHeader, body: &T) -> Vec<u8> {
    let mut buf = [0u8; MAX_PAYLOAD];
    let used = sdk::encode_event(header, body, &mut buf)
        .expect("event must fit")
        .len();
    buf[..used].to_vec()
}

pub(crate) fn app() -> Microapp<TestPlatform> {
    app_with(TestPlatform::new())
}

pub(crate) fn app_with(platform: TestPlatform) -> Microapp<TestPlatform> {
    Microapp::new(platform, ShimSettings::default())
}

pub(crate) fn app_with_settings(settings: ShimSettings) -> Microapp<TestPlatform> {
    Microapp::new(TestPlatform::new(), settings)
}

pub(crate) fn trace_init() {
    use tracing_subscriber::filter::{EnvFilter, LevelFilter};
    let env = std::env::var("RUST_LOG").unwrap_or_default();
    let builder = EnvFilter::builder().with_default_directive(LevelFilter::INFO.into());
    let filter = if env.is_empty() {
        builder.parse("microapp=debug").unwrap()
    } else {
        builder.parse_lossy(env)
    };

    let _res = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .without_time()
        .try_init();
}
