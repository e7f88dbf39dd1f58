//! Session state machine and foreground loop.
//!
//! [`Slave`] owns everything the foreground touches: the application, the
//! drain engine with its assembly buffer, the egress sample ring and the
//! session state. Interrupt handlers never see it; they talk to it only
//! through an [`EventQueue`].
//!
//! ```text
//!                 WRITE_DATA              header
//!        ┌──────► WriteStart ──────────► WriteStream ──┐
//!        │                                             │ transfer complete
//!      Idle ◄──────────────────────────────────────────┘
//!        │  ▲
//!        │  │ STOP              queue non-empty
//!        │  └──────── ReadNoData ─────────────► ReadData ─┐
//!        │ READ_DATA      ▲  ▲                     │  ▲    │ ACK, queue
//!        └────────────────┘  └── ACK, queue empty ─┘  └────┘ non-empty
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! static EVENTS: EventQueue<16> = EventQueue::new();
//!
//! // Host / command ISR
//! service_host_interrupt(&mut bus, &EVENTS)?;
//! // Window access ISR
//! service_access_interrupt(&mut bus, &EVENTS)?;
//! // Sample timer ISR, any priority
//! EVENTS.tick();
//!
//! // Foreground
//! let mut slave: Slave<App, 4096, 1024> = Slave::new(app, config, SampleRing::with_pattern(0))?;
//! slave.start(&mut bus)?;
//! loop {
//!     slave.poll(&mut bus, &EVENTS)?;
//! }
//! ```

use log::{debug, info, warn};

use crate::bus::{Interrupts, SlaveBus};
use crate::command::Command;
use crate::config::SlaveConfig;
use crate::constants::{CMD_ACK, HEADER_LEN, SIGNAL_DATA_AVAILABLE};
use crate::drain::DrainEngine;
use crate::egress::SampleRing;
use crate::error::{ConfigError, IntegrityError, SlaveError};
use crate::event::{Event, EventQueue};

/// Protocol state of the slave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// WRITE_DATA accepted, waiting for the length header.
    WriteStart,
    /// Draining the message body.
    WriteStream,
    /// Read session open, nothing queued for the host.
    ReadNoData,
    /// Read session open, host notified of queued data.
    ReadData,
}

impl SessionState {
    /// Direction of the session in progress, if any.
    pub const fn direction(self) -> Option<Direction> {
        match self {
            SessionState::Idle => None,
            SessionState::WriteStart | SessionState::WriteStream => Some(Direction::Write),
            SessionState::ReadNoData | SessionState::ReadData => Some(Direction::Read),
        }
    }

    /// Whether a read session is open.
    pub const fn is_reading(self) -> bool {
        matches!(self, SessionState::ReadNoData | SessionState::ReadData)
    }
}

/// Which way a session moves data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Host to slave, through the wraparound window.
    Write,
    /// Slave to host, through the outbound queue.
    Read,
}

/// Application hooks called from the foreground.
pub trait Application {
    /// A session ended.
    ///
    /// For [`Direction::Write`], `message` is the reassembled payload and
    /// `integrity` the checksum verdict. Read sessions end on STOP with an
    /// empty `message` and `Ok(())`.
    fn on_session_complete(
        &mut self,
        direction: Direction,
        message: &[u8],
        integrity: Result<(), IntegrityError>,
    );

    /// A read session started; begin producing [`Event::DataReady`] ticks.
    fn on_read_start(&mut self) {}

    /// The host stopped the read session; stop the data source.
    fn on_stop(&mut self) {}
}

/// Running counters, never reset by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    /// Write sessions that reached transfer complete.
    pub completed_writes: u32,
    /// Completed writes whose integrity check failed.
    pub checksum_failures: u32,
    /// Length headers larger than the assembly buffer.
    pub rejected_headers: u32,
    /// Frames of which at least one byte reached the outbound queue.
    pub frames_pushed: u32,
    pub egress_bytes_dropped: usize,
    /// Ring events dropped because the event queue was full.
    pub lost_events: usize,
    pub faults: u32,
    /// Command bytes that decode to no known command.
    pub ignored_commands: u32,
}

/// Slave-side protocol engine.
///
/// - `M`: assembly buffer size, the largest message accepted.
/// - `S`: egress sample ring size, at least two frames.
pub struct Slave<A, const M: usize, const S: usize> {
    app: A,
    config: SlaveConfig,
    state: SessionState,
    drain: DrainEngine<M>,
    egress: SampleRing<S>,
    stats: SessionStats,
}

impl<A: Application, const M: usize, const S: usize> Slave<A, M, S> {
    /// Validate `config` against the ring size and build an idle slave.
    pub fn new(app: A, config: SlaveConfig, egress: SampleRing<S>) -> Result<Self, ConfigError> {
        config.validate(S)?;
        Ok(Slave {
            app,
            config,
            state: SessionState::Idle,
            drain: DrainEngine::new(config.geometry),
            egress,
            stats: SessionStats::default(),
        })
    }

    /// Bring up the peripheral and tell the host the slave is ready.
    pub fn start<B: SlaveBus>(&mut self, bus: &mut B) -> Result<(), SlaveError<B::Error>> {
        self.bring_up(bus).map_err(SlaveError::bus)
    }

    fn bring_up<B: SlaveBus>(&mut self, bus: &mut B) -> Result<(), B::Error> {
        bus.initialize(self.config.module, self.config.interface)?;
        bus.configure(&self.config)?;
        bus.interrupt_clear(Interrupts::ALL)?;
        bus.interrupt_enable(Interrupts::HOST)?;
        bus.write_window(0, &[CMD_ACK])?;

        self.state = SessionState::Idle;
        info!("slave ready, {:?} module {}", self.config.interface, self.config.module);
        Ok(())
    }

    /// Replace the configuration, abandoning any session in progress, and
    /// bring the peripheral back up with it.
    pub fn reconfigure<B: SlaveBus>(
        &mut self,
        bus: &mut B,
        config: SlaveConfig,
    ) -> Result<(), SlaveError<B::Error>> {
        config.validate(S)?;
        self.abandon(bus).map_err(SlaveError::bus)?;

        self.config = config;
        self.drain = DrainEngine::new(config.geometry);
        self.bring_up(bus).map_err(SlaveError::bus)
    }

    /// Disable every interrupt and power the peripheral down.
    pub fn shutdown<B: SlaveBus>(&mut self, bus: &mut B) -> Result<(), SlaveError<B::Error>> {
        self.abandon(bus)
            .and_then(|()| bus.deinitialize())
            .map_err(SlaveError::bus)?;
        info!("slave shut down");
        Ok(())
    }

    fn abandon<B: SlaveBus>(&mut self, bus: &mut B) -> Result<(), B::Error> {
        bus.interrupt_disable(Interrupts::ALL)?;
        bus.queue_clear()?;
        self.drain.reset();
        self.egress.stop();
        self.state = SessionState::Idle;
        Ok(())
    }

    /// Drain every pending event in arrival order.
    pub fn poll<B: SlaveBus, const N: usize>(
        &mut self,
        bus: &mut B,
        events: &EventQueue<N>,
    ) -> Result<(), SlaveError<B::Error>> {
        let lost = events.take_lost();
        if lost > 0 {
            warn!("{} interrupt events lost", lost);
            self.stats.lost_events += lost;
        }

        while let Some(event) = events.next() {
            self.dispatch(bus, event).map_err(SlaveError::bus)?;
        }
        self.check_outbound(bus).map_err(SlaveError::bus)
    }

    /// Process a single event as [`poll`](Self::poll) would.
    pub fn handle<B: SlaveBus>(&mut self, bus: &mut B, event: Event) -> Result<(), SlaveError<B::Error>> {
        self.dispatch(bus, event)
            .and_then(|()| self.check_outbound(bus))
            .map_err(SlaveError::bus)
    }

    fn dispatch<B: SlaveBus>(&mut self, bus: &mut B, event: Event) -> Result<(), B::Error> {
        match (event, self.state) {
            (Event::TransactionComplete { command }, _) => self.on_transaction(bus, command),
            (Event::HeaderReady, SessionState::WriteStart) => self.on_header(bus),
            (Event::WatermarkStart, SessionState::WriteStream) => {
                self.drain.on_watermark_start(bus).map(drop)
            }
            (Event::WatermarkHalf, SessionState::WriteStream) => {
                self.drain.on_watermark_half(bus).map(drop)
            }
            (Event::DataReady, state) if state.is_reading() => self.push_frame(bus),
            (Event::Fault, state) => {
                self.stats.faults += 1;
                warn!("bus error interrupt in {:?}", state);
                Ok(())
            }
            (event, state) => {
                debug!("{:?} ignored in {:?}", event, state);
                Ok(())
            }
        }
    }

    fn on_transaction<B: SlaveBus>(&mut self, bus: &mut B, byte: u8) -> Result<(), B::Error> {
        let command = Command::from_byte(byte);
        match (self.state, command) {
            (SessionState::Idle, Some(Command::WriteData)) => self.begin_write(bus),
            (SessionState::Idle, Some(Command::ReadData)) => self.begin_read(bus),
            (SessionState::WriteStream, _) => self.end_transfer(bus),
            (SessionState::ReadNoData | SessionState::ReadData, Some(Command::Stop)) => {
                self.stop_read(bus)
            }
            (SessionState::ReadNoData | SessionState::ReadData, Some(Command::Ack)) => {
                self.acknowledge(bus)
            }
            (SessionState::WriteStart, _) => {
                debug!("transaction before length header, byte {:#04x}", byte);
                Ok(())
            }
            (state, Some(command)) => {
                debug!("{:?} not accepted in {:?}", command, state);
                Ok(())
            }
            (state, None) => {
                self.stats.ignored_commands += 1;
                debug!("unknown command {:#04x} in {:?}", byte, state);
                Ok(())
            }
        }
    }

    // ── Write direction ────────────────────────────────────────────────

    fn begin_write<B: SlaveBus>(&mut self, bus: &mut B) -> Result<(), B::Error> {
        bus.interrupt_enable(Interrupts::HEADER)?;
        bus.write_window(0, &[CMD_ACK])?;
        self.state = SessionState::WriteStart;
        info!("start host write");
        Ok(())
    }

    fn on_header<B: SlaveBus>(&mut self, bus: &mut B) -> Result<(), B::Error> {
        let mut header = [0u8; HEADER_LEN];
        bus.read_window(0, &mut header)?;
        bus.interrupt_disable(Interrupts::HEADER)?;

        match self.drain.begin(header) {
            Ok(len) => {
                bus.interrupt_enable(Interrupts::WATERMARKS)?;
                debug!("message length {}", len);
            }
            Err(err) => {
                // Discard the body: stay in WriteStream with the engine idle
                // until the host ends its transaction.
                self.stats.rejected_headers += 1;
                warn!("header rejected: {}", err);
            }
        }
        self.state = SessionState::WriteStream;
        Ok(())
    }

    fn end_transfer<B: SlaveBus>(&mut self, bus: &mut B) -> Result<(), B::Error> {
        if self.drain.on_transfer_complete(bus)? {
            let message = self.drain.message();
            let integrity = self.config.integrity.verify(message);
            match integrity {
                Ok(()) => info!("message received: {} bytes", message.len()),
                Err(err) => {
                    self.stats.checksum_failures += 1;
                    warn!("message of {} bytes failed integrity: {}", message.len(), err);
                }
            }
            self.stats.completed_writes += 1;
            self.app.on_session_complete(Direction::Write, message, integrity);
        }

        bus.interrupt_disable(Interrupts::ACCESS)?;
        bus.write_window(0, &[CMD_ACK])?;
        self.state = SessionState::Idle;
        Ok(())
    }

    // ── Read direction ─────────────────────────────────────────────────

    fn begin_read<B: SlaveBus>(&mut self, bus: &mut B) -> Result<(), B::Error> {
        bus.arm_handshake()?;
        self.egress.restart();
        self.app.on_read_start();
        self.state = SessionState::ReadNoData;
        info!("start host read");
        Ok(())
    }

    fn stop_read<B: SlaveBus>(&mut self, bus: &mut B) -> Result<(), B::Error> {
        self.egress.stop();
        bus.queue_clear()?;
        bus.write_window(0, &[CMD_ACK])?;
        self.app.on_stop();
        self.app.on_session_complete(Direction::Read, &[], Ok(()));
        self.state = SessionState::Idle;
        info!("stop read stream");
        Ok(())
    }

    fn acknowledge<B: SlaveBus>(&mut self, bus: &mut B) -> Result<(), B::Error> {
        if bus.queue_space_used()? > 0 {
            self.state = SessionState::ReadData;
            self.inform_host(bus)
        } else {
            self.state = SessionState::ReadNoData;
            Ok(())
        }
    }

    fn push_frame<B: SlaveBus>(&mut self, bus: &mut B) -> Result<(), B::Error> {
        let push = self.egress.push_frame(bus, self.config.frame_size)?;
        if push.written > 0 {
            self.stats.frames_pushed += 1;
        }
        self.stats.egress_bytes_dropped += push.dropped();
        Ok(())
    }

    fn check_outbound<B: SlaveBus>(&mut self, bus: &mut B) -> Result<(), B::Error> {
        if self.state == SessionState::ReadNoData && bus.queue_space_used()? > 0 {
            self.state = SessionState::ReadData;
            self.inform_host(bus)?;
        }
        Ok(())
    }

    fn inform_host<B: SlaveBus>(&mut self, bus: &mut B) -> Result<(), B::Error> {
        bus.queue_commit()?;
        bus.notify_host(SIGNAL_DATA_AVAILABLE)
    }

    // ── Accessors ──────────────────────────────────────────────────────

    /// Current protocol state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Snapshot of the running counters.
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Active configuration.
    pub fn config(&self) -> &SlaveConfig {
        &self.config
    }

    /// Drain engine, for inspecting reassembly progress.
    pub fn drain(&self) -> &DrainEngine<M> {
        &self.drain
    }

    /// Last reassembled message, or the part drained so far.
    pub fn message(&self) -> &[u8] {
        self.drain.message()
    }

    /// Sample ring feeding read sessions.
    pub fn egress(&self) -> &SampleRing<S> {
        &self.egress
    }

    /// Sample ring, for the data source to refill.
    pub fn egress_mut(&mut self) -> &mut SampleRing<S> {
        &mut self.egress
    }

    /// Shared access to the application.
    pub fn app(&self) -> &A {
        &self.app
    }

    /// Exclusive access to the application.
    pub fn app_mut(&mut self) -> &mut A {
        &mut self.app
    }

    /// Consume the slave, returning the application.
    pub fn into_app(self) -> A {
        self.app
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::memory::{HostWriter, MemoryBus};
    use crate::checksum::{sum8, Integrity};
    use crate::constants::{CMD_READ_DATA, CMD_STOP, CMD_WRITE_DATA, DEFAULT_GEOMETRY};
    use crate::error::WindowFault;

    type Bus = MemoryBus<256, 64>;
    type TestSlave = Slave<Recorder, 512, 128>;

    #[derive(Default)]
    struct Recorder {
        completions: u32,
        last_direction: Option<Direction>,
        last_len: usize,
        last_integrity: Option<Result<(), IntegrityError>>,
        read_starts: u32,
        stops: u32,
    }

    impl Application for Recorder {
        fn on_session_complete(
            &mut self,
            direction: Direction,
            message: &[u8],
            integrity: Result<(), IntegrityError>,
        ) {
            self.completions += 1;
            self.last_direction = Some(direction);
            self.last_len = message.len();
            self.last_integrity = Some(integrity);
        }

        fn on_read_start(&mut self) {
            self.read_starts += 1;
        }

        fn on_stop(&mut self) {
            self.stops += 1;
        }
    }

    fn config() -> SlaveConfig {
        SlaveConfig::default().with_frame_size(16)
    }

    fn started() -> (TestSlave, Bus) {
        let mut slave = TestSlave::new(Recorder::default(), config(), SampleRing::with_pattern(0)).unwrap();
        let mut bus = Bus::new();
        slave.start(&mut bus).unwrap();
        (slave, bus)
    }

    fn command<B: SlaveBus>(slave: &mut TestSlave, bus: &mut B, byte: u8)
    where
        B::Error: core::fmt::Debug,
    {
        slave.handle(bus, Event::TransactionComplete { command: byte }).unwrap();
    }

    /// Message of `len` bytes whose last byte is the checksum of the rest.
    fn checked_message(len: usize) -> [u8; 512] {
        let mut msg = [0u8; 512];
        for (i, b) in msg[..len - 1].iter_mut().enumerate() {
            *b = (i * 7) as u8;
        }
        msg[len - 1] = sum8(&msg[..len - 1]);
        msg
    }

    /// Host streams header + `body`, with every watermark handled in time.
    fn stream_body(slave: &mut TestSlave, bus: &mut Bus, body: &[u8]) {
        let mut host = HostWriter::new(DEFAULT_GEOMETRY);
        let header = (body.len() as u16).to_le_bytes();
        for &byte in header.iter().chain(body) {
            host.write_byte(bus, byte);
            let pending = bus.pending();
            bus.interrupt_clear(pending).unwrap();
            if pending.contains(Interrupts::HEADER) {
                slave.handle(bus, Event::HeaderReady).unwrap();
            }
            if pending.contains(Interrupts::WATERMARK_START) {
                slave.handle(bus, Event::WatermarkStart).unwrap();
            }
            if pending.contains(Interrupts::WATERMARK_HALF) {
                slave.handle(bus, Event::WatermarkHalf).unwrap();
            }
        }
        let first = bus.window()[0];
        command(slave, bus, first);
    }

    #[test]
    fn new_rejects_invalid_config() {
        let result = Slave::<Recorder, 64, 16>::new(Recorder::default(), config(), SampleRing::new());
        assert_eq!(
            result.err(),
            Some(ConfigError::SampleRingTooSmall { capacity: 16, frame_size: 16 })
        );
    }

    #[test]
    fn start_enables_host_interrupts_and_acks() {
        let (slave, bus) = started();
        assert_eq!(slave.state(), SessionState::Idle);
        assert_eq!(bus.enabled(), Interrupts::HOST);
        assert_eq!(bus.window()[0], CMD_ACK);
        assert_eq!(bus.geometry(), Some(DEFAULT_GEOMETRY));
    }

    #[test]
    fn write_data_arms_header_interrupt() {
        let (mut slave, mut bus) = started();
        bus.host_command(CMD_WRITE_DATA);
        command(&mut slave, &mut bus, CMD_WRITE_DATA);

        assert_eq!(slave.state(), SessionState::WriteStart);
        assert!(bus.enabled().contains(Interrupts::HEADER));
        assert!(!bus.enabled().intersects(Interrupts::WATERMARKS));
        assert_eq!(bus.window()[0], CMD_ACK, "ACK written back");
    }

    #[test]
    fn header_switches_to_watermark_interrupts() {
        let (mut slave, mut bus) = started();
        command(&mut slave, &mut bus, CMD_WRITE_DATA);
        bus.write_window(0, &300u16.to_le_bytes()).unwrap();
        slave.handle(&mut bus, Event::HeaderReady).unwrap();

        assert_eq!(slave.state(), SessionState::WriteStream);
        assert_eq!(slave.drain().message_length(), 300);
        assert!(!bus.enabled().contains(Interrupts::HEADER));
        assert!(bus.enabled().contains(Interrupts::WATERMARKS));
    }

    #[test]
    fn complete_write_reports_verified_message() {
        let (mut slave, mut bus) = started();
        let msg = checked_message(400);

        command(&mut slave, &mut bus, CMD_WRITE_DATA);
        stream_body(&mut slave, &mut bus, &msg[..400]);

        assert_eq!(slave.state(), SessionState::Idle);
        assert_eq!(slave.message(), &msg[..400]);
        assert_eq!(slave.app().completions, 1);
        assert_eq!(slave.app().last_direction, Some(Direction::Write));
        assert_eq!(slave.app().last_integrity, Some(Ok(())));
        assert_eq!(slave.stats().completed_writes, 1);
        assert_eq!(bus.window()[0], CMD_ACK);
        assert!(!bus.enabled().intersects(Interrupts::ACCESS));
    }

    #[test]
    fn corrupted_write_still_returns_to_idle() {
        let (mut slave, mut bus) = started();
        let mut msg = checked_message(100);
        msg[40] ^= 0x01;

        command(&mut slave, &mut bus, CMD_WRITE_DATA);
        stream_body(&mut slave, &mut bus, &msg[..100]);

        assert_eq!(slave.state(), SessionState::Idle);
        assert!(matches!(slave.app().last_integrity, Some(Err(IntegrityError::Mismatch { .. }))));
        assert_eq!(slave.stats().checksum_failures, 1);
    }

    #[test]
    fn unchecked_integrity_accepts_anything() {
        let config = config().with_integrity(Integrity::Unchecked);
        let mut slave = TestSlave::new(Recorder::default(), config, SampleRing::new()).unwrap();
        let mut bus = Bus::new();
        slave.start(&mut bus).unwrap();

        command(&mut slave, &mut bus, CMD_WRITE_DATA);
        stream_body(&mut slave, &mut bus, &[1, 2, 3]);
        assert_eq!(slave.app().last_integrity, Some(Ok(())));
    }

    #[test]
    fn oversized_header_discards_until_transaction_end() {
        let (mut slave, mut bus) = started();
        command(&mut slave, &mut bus, CMD_WRITE_DATA);
        bus.write_window(0, &600u16.to_le_bytes()).unwrap();
        slave.handle(&mut bus, Event::HeaderReady).unwrap();

        assert_eq!(slave.stats().rejected_headers, 1);
        assert!(!bus.enabled().intersects(Interrupts::ACCESS));
        assert!(!slave.drain().is_active());

        // Byte 0 still holds the length; it must not be read as a command.
        command(&mut slave, &mut bus, 600u16.to_le_bytes()[0]);
        assert_eq!(slave.state(), SessionState::Idle);
        assert_eq!(slave.app().completions, 0);
        assert_eq!(bus.window()[0], CMD_ACK);
    }

    #[test]
    fn stop_is_not_accepted_mid_write() {
        let (mut slave, mut bus) = started();
        command(&mut slave, &mut bus, CMD_WRITE_DATA);
        command(&mut slave, &mut bus, CMD_STOP);
        assert_eq!(slave.state(), SessionState::WriteStart);
    }

    #[test]
    fn read_data_arms_handshake_and_starts_source() {
        let (mut slave, mut bus) = started();
        command(&mut slave, &mut bus, CMD_READ_DATA);

        assert_eq!(slave.state(), SessionState::ReadNoData);
        assert!(bus.handshake_armed());
        assert!(slave.egress().is_running());
        assert_eq!(slave.app().read_starts, 1);
        assert_eq!(bus.notifications(), 0);
    }

    #[test]
    fn first_frame_notifies_host() {
        let (mut slave, mut bus) = started();
        command(&mut slave, &mut bus, CMD_READ_DATA);
        slave.handle(&mut bus, Event::DataReady).unwrap();

        assert_eq!(slave.state(), SessionState::ReadData);
        assert_eq!(bus.queue_len(), 16);
        assert_eq!(bus.notifications(), 1);
        assert_eq!(bus.last_signal(), SIGNAL_DATA_AVAILABLE);
        assert_eq!(bus.commits(), 1);
        assert_eq!(slave.stats().frames_pushed, 1);

        // Further frames do not renotify until ACK.
        slave.handle(&mut bus, Event::DataReady).unwrap();
        assert_eq!(bus.notifications(), 1);
    }

    #[test]
    fn ack_with_empty_queue_waits_for_data() {
        let (mut slave, mut bus) = started();
        command(&mut slave, &mut bus, CMD_READ_DATA);
        slave.handle(&mut bus, Event::DataReady).unwrap();
        bus.host_read(&mut [0u8; 16]);

        command(&mut slave, &mut bus, CMD_ACK);
        assert_eq!(slave.state(), SessionState::ReadNoData);
        assert_eq!(bus.notifications(), 1);
    }

    #[test]
    fn ack_with_queued_data_renotifies() {
        let (mut slave, mut bus) = started();
        command(&mut slave, &mut bus, CMD_READ_DATA);
        slave.handle(&mut bus, Event::DataReady).unwrap();
        slave.handle(&mut bus, Event::DataReady).unwrap();
        bus.host_read(&mut [0u8; 16]);

        command(&mut slave, &mut bus, CMD_ACK);
        assert_eq!(slave.state(), SessionState::ReadData);
        assert_eq!(bus.notifications(), 2);
    }

    #[test]
    fn stop_from_either_read_state_returns_to_idle() {
        let (mut slave, mut bus) = started();
        command(&mut slave, &mut bus, CMD_READ_DATA);
        command(&mut slave, &mut bus, CMD_STOP);
        assert_eq!(slave.state(), SessionState::Idle);

        command(&mut slave, &mut bus, CMD_READ_DATA);
        slave.handle(&mut bus, Event::DataReady).unwrap();
        assert_eq!(slave.state(), SessionState::ReadData);
        command(&mut slave, &mut bus, CMD_STOP);

        assert_eq!(slave.state(), SessionState::Idle);
        assert_eq!(bus.queue_len(), 0, "STOP clears the outbound queue");
        assert!(!slave.egress().is_running());
        assert_eq!(slave.app().stops, 2);
        assert_eq!(slave.app().last_direction, Some(Direction::Read));
    }

    #[test]
    fn stop_hands_window_back_to_host() {
        let (mut slave, mut bus) = started();
        command(&mut slave, &mut bus, CMD_READ_DATA);
        slave.handle(&mut bus, Event::DataReady).unwrap();

        bus.host_command(CMD_STOP);
        command(&mut slave, &mut bus, CMD_STOP);
        assert_eq!(slave.state(), SessionState::Idle);
        assert_eq!(bus.window()[0], CMD_ACK, "host polls byte 0 for ACK before the next session");
    }

    #[test]
    fn fully_rejected_frames_are_not_counted_as_pushed() {
        let mut slave = TestSlave::new(Recorder::default(), config(), SampleRing::new()).unwrap();
        let mut bus: MemoryBus<256, 16> = MemoryBus::new();
        slave.start(&mut bus).unwrap();

        command(&mut slave, &mut bus, CMD_READ_DATA);
        slave.handle(&mut bus, Event::DataReady).unwrap();
        slave.handle(&mut bus, Event::DataReady).unwrap();
        slave.handle(&mut bus, Event::DataReady).unwrap();

        assert_eq!(bus.queue_len(), 16);
        assert_eq!(slave.stats().frames_pushed, 1);
        assert_eq!(slave.stats().egress_bytes_dropped, 32);
    }

    #[test]
    fn read_data_restarts_source_from_zero() {
        let (mut slave, mut bus) = started();
        command(&mut slave, &mut bus, CMD_READ_DATA);
        slave.handle(&mut bus, Event::DataReady).unwrap();
        command(&mut slave, &mut bus, CMD_STOP);
        assert_eq!(slave.egress().cursor(), 16);

        command(&mut slave, &mut bus, CMD_READ_DATA);
        assert_eq!(slave.egress().cursor(), 0);
    }

    #[test]
    fn data_ready_outside_read_is_ignored() {
        let (mut slave, mut bus) = started();
        slave.handle(&mut bus, Event::DataReady).unwrap();
        assert_eq!(bus.queue_len(), 0);
        assert_eq!(slave.stats().frames_pushed, 0);
    }

    #[test]
    fn unknown_commands_are_counted_and_ignored() {
        let (mut slave, mut bus) = started();
        command(&mut slave, &mut bus, 0x42);
        assert_eq!(slave.state(), SessionState::Idle);

        command(&mut slave, &mut bus, CMD_READ_DATA);
        command(&mut slave, &mut bus, 0x00);
        assert_eq!(slave.state(), SessionState::ReadNoData);
        assert_eq!(slave.stats().ignored_commands, 2);

        // Known but out-of-place commands are not counted.
        command(&mut slave, &mut bus, CMD_WRITE_DATA);
        assert_eq!(slave.state(), SessionState::ReadNoData);
        assert_eq!(slave.stats().ignored_commands, 2);
    }

    #[test]
    fn faults_are_counted() {
        let (mut slave, mut bus) = started();
        slave.handle(&mut bus, Event::Fault).unwrap();
        assert_eq!(slave.stats().faults, 1);
        assert_eq!(slave.state(), SessionState::Idle);
    }

    #[test]
    fn poll_folds_lost_events_into_stats() {
        let (mut slave, mut bus) = started();
        let events: EventQueue<2> = EventQueue::new();
        events.post(Event::Fault);
        events.post(Event::Fault);
        events.post(Event::Fault);

        slave.poll(&mut bus, &events).unwrap();
        assert_eq!(slave.stats().faults, 1);
        assert_eq!(slave.stats().lost_events, 2);
        assert!(events.is_empty());
    }

    #[test]
    fn egress_truncation_is_counted() {
        let mut slave = TestSlave::new(Recorder::default(), config(), SampleRing::new()).unwrap();
        let mut bus: MemoryBus<256, 20> = MemoryBus::new();
        slave.start(&mut bus).unwrap();

        slave.handle(&mut bus, Event::TransactionComplete { command: CMD_READ_DATA }).unwrap();
        slave.handle(&mut bus, Event::DataReady).unwrap();
        slave.handle(&mut bus, Event::DataReady).unwrap();

        assert_eq!(slave.stats().frames_pushed, 2);
        assert_eq!(slave.stats().egress_bytes_dropped, 12);
    }

    #[test]
    fn bus_errors_propagate() {
        let mut slave = TestSlave::new(Recorder::default(), config(), SampleRing::new()).unwrap();
        let mut bus: MemoryBus<64, 8> = MemoryBus::new();
        assert_eq!(
            slave.start(&mut bus),
            Err(SlaveError::Bus(WindowFault::OutOfBounds { offset: 0, len: 240, capacity: 64 }))
        );
    }

    #[test]
    fn reconfigure_validates_and_resets() {
        let (mut slave, mut bus) = started();
        command(&mut slave, &mut bus, CMD_READ_DATA);

        assert_eq!(
            slave.reconfigure(&mut bus, config().with_frame_size(0)),
            Err(SlaveError::Config(ConfigError::EmptyFrame))
        );
        assert_eq!(slave.state(), SessionState::ReadNoData);

        slave.reconfigure(&mut bus, config().with_frame_size(32)).unwrap();
        assert_eq!(slave.state(), SessionState::Idle);
        assert_eq!(slave.config().frame_size, 32);
        assert!(!slave.egress().is_running());
        assert_eq!(bus.enabled(), Interrupts::HOST, "host interrupts re-enabled");
    }

    #[test]
    fn shutdown_releases_peripheral() {
        let (mut slave, mut bus) = started();
        command(&mut slave, &mut bus, CMD_READ_DATA);
        slave.handle(&mut bus, Event::DataReady).unwrap();

        slave.shutdown(&mut bus).unwrap();
        assert_eq!(slave.state(), SessionState::Idle);
        assert_eq!(bus.interface(), None);
        assert_eq!(bus.enabled(), Interrupts::NONE);
        assert_eq!(bus.queue_len(), 0);
    }

    #[test]
    fn state_directions() {
        assert_eq!(SessionState::Idle.direction(), None);
        assert_eq!(SessionState::WriteStream.direction(), Some(Direction::Write));
        assert_eq!(SessionState::ReadData.direction(), Some(Direction::Read));
        assert!(SessionState::ReadNoData.is_reading());
        assert!(!SessionState::WriteStart.is_reading());
    }
}
