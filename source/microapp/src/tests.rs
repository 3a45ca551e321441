//! Whole-microapp scenarios against the test host.

use abi::{
    address::MacAddress,
    ipc::{IpcIndex, MicroappRecord},
    sdk::{
        self,
        ble::{AddressType, BleEvent, BleEventType, ScanEvent},
        mesh::{MeshEvent, MeshEventType},
        switch::{SwitchCommand, SwitchOp},
        Ack, InterruptCommand, InterruptHeader, InterruptOp, SdkType, YieldCommand, ACK_OFFSET,
    },
};

use crate::{
    test_util::{self, TestPlatform},
    Microapp, Platform,
};

const SETUP: usize = 0x0005_0001;
const LOOP: usize = 0x0005_0081;

/// A host that answers switch requests with a fixed state and acks anything
/// else unchanged.
fn switch_host(buf: &mut [u8; abi::MAX_PAYLOAD], len: usize) -> i32 {
    match sdk::split_message(&buf[..len]) {
        Ok((header, _)) if header.sdk_type == SdkType::Switch => {
            test_util::reply(
                buf,
                SdkType::Switch,
                Ack::Success,
                &SwitchCommand {
                    op: SwitchOp::Set,
                    value: 42,
                },
            );
            0
        }
        _ => test_util::ack_success(buf, len),
    }
}

#[test]
fn boot_then_switch() {
    test_util::trace_init();
    let mut app = test_util::app();
    app.platform_mut().respond(switch_host);
    app.boot(SETUP, LOOP).unwrap();

    // what the host firmware sees after boot
    let record = MicroappRecord::read(app.platform().ipc(), IpcIndex::Microapp).unwrap();
    assert_eq!((record.setup(), record.loop_entry()), (SETUP, LOOP));

    // write the request by hand, the way the raw buffer API is used
    let used = sdk::encode_request(
        SdkType::Switch,
        &SwitchCommand {
            op: SwitchOp::Set,
            value: 42,
        },
        app.message_mut().payload_mut(),
    )
    .unwrap()
    .len();
    app.message_mut().set_len(used);
    assert_eq!(app.send_message(), Ok(0));

    let (header, state) = app.message().read_response::<SwitchCommand>().unwrap();
    assert_eq!(header.ack, Ack::Success);
    assert_eq!(state.value, 42);

    // and the same through the wrapper
    assert_eq!(app.switch().set_value(42), Ok(42));
}

fn on_scan(app: &mut Microapp<TestPlatform>, event: &BleEvent) {
    if let BleEvent::Scan(scan) = event {
        let name = scan.local_name().unwrap_or("?").to_owned();
        app.platform_mut().notes.push(name);
    }
}

#[test]
fn scan_handler_end_to_end() {
    test_util::trace_init();
    let mut app = test_util::app();
    app.boot(SETUP, LOOP).unwrap();
    app.ble()
        .set_event_handler(BleEventType::ScanAdvertisement, on_scan)
        .unwrap();
    app.ble().scan().unwrap();

    // the host fires the interrupt with an advertisement carrying a name
    let mut event = lamp_advertisement();
    let before = app.platform().sent.len();
    assert_eq!(app.dispatch_interrupt(&mut event), Ack::Success);
    assert_eq!(event[ACK_OFFSET], u8::from(Ack::Success));

    assert_eq!(app.platform().notes, ["lamp"]);
    // exactly one message went out while handling: the completion
    assert_eq!(app.platform().sent.len(), before + 1);
    let (header, cmd) = app.platform().sent_as::<InterruptCommand>(before);
    assert_eq!(header.sdk_type, SdkType::Interrupt);
    assert_eq!(
        cmd,
        InterruptCommand::completion(
            InterruptOp::End,
            SdkType::Ble,
            BleEventType::ScanAdvertisement.into()
        )
    );
}

fn lamp_advertisement() -> Vec<u8> {
    let scan = ScanEvent {
        address: "AA:BB:CC:DD:EE:FF".parse::<MacAddress>().unwrap(),
        address_type: AddressType::Public,
        rssi: -71,
        channel: 38,
        data: heapless::Vec::from_slice(&[5, 0x09, b'l', b'a', b'm', b'p']).unwrap(),
    };
    test_util::event(
        InterruptHeader::event(SdkType::Ble, BleEventType::ScanAdvertisement.into()),
        &BleEvent::Scan(scan),
    )
}

#[test]
fn mesh_message_arrives_while_delaying() {
    test_util::trace_init();
    let mut app = test_util::app();
    app.boot(SETUP, LOOP).unwrap();
    app.mesh().listen().unwrap();

    // the host has a message ready the next time the microapp yields
    let event = MeshEvent {
        stone_id: 9,
        data: heapless::Vec::from_slice(b"hi").unwrap(),
    };
    app.platform_mut().raise_during(
        SdkType::Yield,
        test_util::event(
            InterruptHeader::event(SdkType::Mesh, MeshEventType::Received.into()),
            &event,
        ),
    );

    let mut delays = 0;
    let msg = loop {
        if let Some(msg) = app.mesh().read_mesh_msg() {
            break msg;
        }
        assert!(delays < 5, "no mesh message after {delays} delays");
        app.delay(10).unwrap();
        delays += 1;
    };
    assert_eq!(delays, 1);
    assert_eq!((msg.stone_id, msg.data.as_slice()), (9, &b"hi"[..]));
    assert_eq!(app.interrupt[ACK_OFFSET], u8::from(Ack::Success));
    assert_eq!(app.platform().sent_types().last(), Some(&SdkType::Yield));
}

#[test]
fn ble_event_during_delay_is_completed() {
    let mut app = test_util::app();
    app.ble()
        .set_event_handler(BleEventType::ScanAdvertisement, on_scan)
        .unwrap();
    let before = app.platform().sent.len();

    app.platform_mut()
        .raise_during(SdkType::Yield, lamp_advertisement());
    app.delay(10).unwrap();

    assert_eq!(app.platform().notes, ["lamp"]);
    // the completion goes out from inside the delay, then the yield resumes
    let sent = &app.platform().sent[before..];
    assert_eq!(sent.len(), 2);
    let (_, cmd) = app.platform().sent_as::<InterruptCommand>(before);
    assert_eq!(cmd.op, InterruptOp::End);
    let (_, cmd) = app.platform().sent_as::<YieldCommand>(before + 1);
    assert_eq!(cmd.delay_ms, 10);
}

#[test]
fn subsystems_share_the_interrupt_table() {
    fn ignore(_: &mut Microapp<TestPlatform>, _: u8, _: &[u8]) {}

    let mut app = test_util::app();
    app.mesh().listen().unwrap();
    app.messages().listen().unwrap();
    app.events().subscribe(7, ignore).unwrap();
    app.ble()
        .set_event_handler(BleEventType::Connected, on_scan)
        .unwrap();
    assert_eq!(app.registered_interrupts(), 4);

    let types: Vec<SdkType> = app
        .platform()
        .sent
        .iter()
        .map(|raw| sdk::decode_message::<InterruptCommand>(raw).unwrap().1.sdk_type)
        .collect();
    assert_eq!(
        types,
        [
            SdkType::Mesh,
            SdkType::Message,
            SdkType::BluenetEvent,
            SdkType::Ble
        ]
    );
}

#[test]
fn without_host_everything_fails_cleanly() {
    let mut app = test_util::app_with(TestPlatform::without_host());
    assert_eq!(app.switch().turn_on(), Err(crate::Error::NoCallback));
    assert_eq!(app.mesh().listen(), Err(crate::Error::NoCallback));
    assert_eq!(app.registered_interrupts(), 0);
    assert!(app.platform().sent.is_empty());
}
