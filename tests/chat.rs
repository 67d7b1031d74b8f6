mod common;

use std::io::Read;
use std::time::{Duration, Instant};

use aqualink_keypad::{
    encode, BusReader, Devices, Dispatcher, Frame, Role, Shutdown, Synchronizer,
};

use common::bus::{BusConnector, BusInterface, RS485Bus};

/// Controller side: read until a complete frame arrives.
fn receive_reply(io: &mut BusInterface, sync: &mut Synchronizer) -> Frame {
    let deadline = Instant::now() + Duration::from_secs(2);
    let mut buf = [0; 16];
    while Instant::now() < deadline {
        let len = match io.read(&mut buf) {
            Ok(len) => len,
            Err(_) => continue,
        };
        let mut data = &buf[..len];
        while !data.is_empty() {
            let (consumed, frame) = sync.receive_data(data);
            data = &data[consumed..];
            if let Some(frame) = frame {
                assert!(data.is_empty(), "unexpected trailing bytes");
                return frame.unwrap();
            }
        }
    }
    panic!("no reply from the device");
}

fn command(io: &mut BusInterface, sync: &mut Synchronizer, frame: &Frame) -> Frame {
    io.send(&frame.to_bytes());
    receive_reply(io, sync)
}

#[test]
fn chat() {
    let _ = env_logger::builder().is_test(true).try_init();

    let bus = RS485Bus::new();
    let mut controller = bus.controller_interface();
    let mut sync = Synchronizer::new();

    let devices = Devices::with_roles(&[Role::Keypad, Role::Spa]);
    let shutdown = Shutdown::new();
    let reader = BusReader::new(BusConnector::new(&bus), shutdown.clone());
    let bus_thread = Dispatcher::new(reader, devices.clone()).spawn();

    let ack = command(&mut controller, &mut sync, &Frame::new(0x40, 0x00, &[]));
    assert_eq!(ack, Frame::ack(Role::Keypad, 0x00));

    let ack = command(
        &mut controller,
        &mut sync,
        &Frame::new(0x40, 0x04, &[0x01, b'P', b'O', b'O', b'L', 0x00, b'X']),
    );
    assert_eq!(ack, Frame::ack(Role::Keypad, 0x00));
    let text = devices.render_text(Role::Keypad).unwrap();
    assert_eq!(text.lines().nth(1).unwrap(), "POOL            ");

    devices.send_key(Role::Keypad, "down").unwrap();
    devices.send_key(Role::Spa, "*").unwrap();

    // Nobody answers for the PDA.
    controller.send(&encode(0x60, 0x00, &[]));

    let ack = command(&mut controller, &mut sync, &Frame::new(0x20, 0x00, &[]));
    assert_eq!(ack, Frame::ack(Role::Spa, 0x05));
    let ack = command(&mut controller, &mut sync, &Frame::new(0x40, 0x00, &[]));
    assert_eq!(ack, Frame::ack(Role::Keypad, 0x05));
    let ack = command(&mut controller, &mut sync, &Frame::new(0x40, 0x00, &[]));
    assert_eq!(ack, Frame::ack(Role::Keypad, 0x00));

    shutdown.request();
    bus_thread.join().unwrap();
}
