//! End-to-end reassembly through the public API: a simulated host streams a
//! message into the wraparound window while the foreground polls.

use burst_slave::bus::memory::{HostWriter, MemoryBus};
use burst_slave::bus::{service_access_interrupt, service_host_interrupt};
use burst_slave::checksum::{sum8, Integrity};
use burst_slave::constants::{CMD_WRITE_DATA, DEFAULT_GEOMETRY};
use burst_slave::egress::SampleRing;
use burst_slave::event::EventQueue;
use burst_slave::{
    Application, Direction, IntegrityError, SessionState, Slave, SlaveConfig, WindowGeometry,
};

const MAX_MESSAGE: usize = 8192;

type Bus = MemoryBus<256, 64>;

#[derive(Default)]
struct Capture {
    message: Vec<u8>,
    integrity: Option<Result<(), IntegrityError>>,
    completions: usize,
}

impl Application for Capture {
    fn on_session_complete(
        &mut self,
        direction: Direction,
        message: &[u8],
        integrity: Result<(), IntegrityError>,
    ) {
        assert_eq!(direction, Direction::Write);
        self.message = message.to_vec();
        self.integrity = Some(integrity);
        self.completions += 1;
    }
}

/// Stream `body` through a slave with `config`, polling every `poll_every`
/// stream bytes, and return what the application received.
fn transfer(config: SlaveConfig, body: &[u8], poll_every: usize) -> Capture {
    let events: EventQueue<32> = EventQueue::new();
    let mut bus = Bus::new();
    let mut slave: Box<Slave<Capture, MAX_MESSAGE, 256>> =
        Box::new(Slave::new(Capture::default(), config, SampleRing::new()).unwrap());
    slave.start(&mut bus).unwrap();

    bus.host_command(CMD_WRITE_DATA);
    service_host_interrupt(&mut bus, &events).unwrap();
    slave.poll(&mut bus, &events).unwrap();
    assert_eq!(slave.state(), SessionState::WriteStart);

    let mut host = HostWriter::new(config.geometry);
    let header = (body.len() as u16).to_le_bytes();
    for (i, &byte) in header.iter().chain(body).enumerate() {
        host.write_byte(&mut bus, byte);
        service_access_interrupt(&mut bus, &events).unwrap();
        if (i + 1) % poll_every == 0 {
            slave.poll(&mut bus, &events).unwrap();
        }
    }
    bus.host_end_transaction();
    service_host_interrupt(&mut bus, &events).unwrap();
    slave.poll(&mut bus, &events).unwrap();

    assert_eq!(slave.state(), SessionState::Idle);
    assert_eq!(slave.stats().lost_events, 0);
    slave.into_app()
}

fn ramp(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i & 0xFF) as u8).collect()
}

/// Ramp whose final byte is replaced by the checksum of the rest.
fn checked_ramp(len: usize) -> Vec<u8> {
    let mut body = ramp(len);
    let last = len - 1;
    body[last] = sum8(&body[..last]);
    body
}

fn unchecked(geometry: WindowGeometry) -> SlaveConfig {
    SlaveConfig::new(geometry).with_integrity(Integrity::Unchecked)
}

#[test]
fn reference_scenario_4096_bytes() {
    let body = checked_ramp(4096);
    let got = transfer(SlaveConfig::default(), &body, 1);

    assert_eq!(got.completions, 1);
    assert_eq!(got.message, body);
    assert_eq!(&got.message[..4095], &ramp(4095)[..]);
    assert_eq!(got.integrity, Some(Ok(())));
}

#[test]
fn boundary_lengths_reassemble() {
    let g = DEFAULT_GEOMETRY;
    let lap = g.lap_len();
    let mut lengths = vec![g.capacity(), g.capacity() + 1];
    // Stream (header + payload) ending exactly after 2, 3 and 4 wrap laps.
    for laps in 2..=4 {
        lengths.push(g.capacity() + laps * lap - 2);
    }

    for len in lengths {
        let body = ramp(len);
        let got = transfer(unchecked(g), &body, 1);
        assert_eq!(got.message.len(), len, "length {len}");
        assert!(got.message == body, "payload mismatch for length {len}");
    }
}

#[test]
fn short_and_empty_messages() {
    for len in [0usize, 1, 2, 5, 6, 7, 124, 125, 126] {
        let body = ramp(len);
        let got = transfer(unchecked(DEFAULT_GEOMETRY), &body, 1);
        assert_eq!(got.message, body, "length {len}");
    }
}

#[test]
fn empty_message_has_no_checksum() {
    let got = transfer(SlaveConfig::default(), &[], 1);
    assert_eq!(got.integrity, Some(Err(IntegrityError::MissingChecksum)));
}

#[test]
fn any_single_corrupted_byte_is_rejected() {
    let body = checked_ramp(700);
    for pos in (0..body.len()).step_by(37).chain([body.len() - 1]) {
        let mut corrupted = body.clone();
        corrupted[pos] = corrupted[pos].wrapping_add(1);
        let got = transfer(SlaveConfig::default(), &corrupted, 1);
        assert!(
            matches!(got.integrity, Some(Err(IntegrityError::Mismatch { .. }))),
            "corruption at {pos} went unnoticed"
        );
    }
}

#[test]
fn polling_inside_the_slack_is_enough() {
    let g = DEFAULT_GEOMETRY;
    // Slack is the smaller of the two blocks.
    let every = g.lower_block().min(g.upper_block());
    let body = checked_ramp(3000);
    let got = transfer(SlaveConfig::default(), &body, every);
    assert_eq!(got.message, body);
    assert_eq!(got.integrity, Some(Ok(())));
}

#[test]
fn oversized_message_is_discarded() {
    let events: EventQueue<32> = EventQueue::new();
    let mut bus = Bus::new();
    let mut slave: Slave<Capture, 256, 256> =
        Slave::new(Capture::default(), SlaveConfig::default(), SampleRing::new()).unwrap();
    slave.start(&mut bus).unwrap();

    bus.host_command(CMD_WRITE_DATA);
    service_host_interrupt(&mut bus, &events).unwrap();
    slave.poll(&mut bus, &events).unwrap();

    let mut host = HostWriter::new(DEFAULT_GEOMETRY);
    host.write(&mut bus, &1000u16.to_le_bytes());
    for byte in ramp(1000) {
        host.write_byte(&mut bus, byte);
        service_access_interrupt(&mut bus, &events).unwrap();
        slave.poll(&mut bus, &events).unwrap();
    }
    bus.host_end_transaction();
    service_host_interrupt(&mut bus, &events).unwrap();
    slave.poll(&mut bus, &events).unwrap();

    assert_eq!(slave.state(), SessionState::Idle);
    assert_eq!(slave.stats().rejected_headers, 1);
    assert_eq!(slave.app().completions, 0);
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    fn geometry() -> impl Strategy<Value = WindowGeometry> {
        (4usize..=256)
            .prop_flat_map(|capacity| (Just(capacity), 3..capacity))
            .prop_flat_map(|(capacity, half)| (Just(capacity), Just(half), 0..half))
            .prop_map(|(capacity, half, start)| WindowGeometry::new(start, half, capacity).unwrap())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Any geometry, any length: the host's bytes come out in order.
        #[test]
        fn reassembles_for_any_geometry(g in geometry(), len in 0usize..2500) {
            let body = ramp(len);
            let got = transfer(unchecked(g), &body, 1);
            prop_assert_eq!(got.completions, 1);
            prop_assert_eq!(got.message, body);
        }

        /// Polling less often than every byte still works while each poll
        /// lands within the slack of both blocks and before the half mark.
        #[test]
        fn reassembles_with_bounded_lag(g in geometry(), len in 0usize..2500, frac in 1usize..=4) {
            let slack = g.lower_block().min(g.upper_block()).min(g.wrap_half() - 1);
            let every = (slack * frac / 4).max(1);
            let body = ramp(len);
            let got = transfer(unchecked(g), &body, every);
            prop_assert_eq!(got.message, body);
        }

        /// A trailing checksum accepts the message and catches any flipped byte.
        #[test]
        fn checksum_round_trip(len in 1usize..3000, flip in any::<proptest::sample::Index>()) {
            let body = checked_ramp(len);
            let got = transfer(SlaveConfig::default(), &body, 1);
            prop_assert_eq!(got.integrity, Some(Ok(())));

            let mut corrupted = body.clone();
            let pos = flip.index(len);
            corrupted[pos] ^= 0x80;
            let got = transfer(SlaveConfig::default(), &corrupted, 1);
            prop_assert!(matches!(got.integrity, Some(Err(IntegrityError::Mismatch { .. }))), "expected integrity mismatch");
        }
    }
}
