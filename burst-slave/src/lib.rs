//! # burst-slave
//!
//! A `no_std`, zero-allocation implementation of the slave side of a burst
//! streaming protocol. A bus host pushes messages of any length through a
//! small shared-memory window whose address space wraps, and pulls a stream
//! of fixed-size frames back through the peripheral's outbound queue.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Values | [`geometry`] / [`config`] / [`constants`] | Window layout and validated configuration |
//! | Peripheral | [`bus`] | [`SlaveBus`](bus::SlaveBus) trait, interrupt entry points, in-memory fake |
//! | Handoff | [`event`] | Lock-free SPSC queue plus timer tick counter, interrupts to foreground |
//! | Write path | [`drain`] / [`checksum`] | Wraparound reassembly and integrity check |
//! | Read path | [`egress`] | Frame pushes from a circular sample buffer |
//! | Protocol | [`command`] / [`session`] | Command bytes and the session state machine |
//! | Board | [`handshake`] | GPIO notification line (feature-gated) |
//!
//! ## Quick start
//!
//! ```ignore
//! use burst_slave::bus::{service_access_interrupt, service_host_interrupt};
//! use burst_slave::egress::SampleRing;
//! use burst_slave::event::EventQueue;
//! use burst_slave::session::Slave;
//! use burst_slave::SlaveConfig;
//!
//! static EVENTS: EventQueue<16> = EventQueue::new();
//!
//! let mut slave: Slave<MyApp, 4096, 1024> =
//!     Slave::new(MyApp::new(), SlaveConfig::default(), SampleRing::with_pattern(0))?;
//! slave.start(&mut bus)?;
//!
//! // In the peripheral ISRs:
//! service_host_interrupt(&mut bus, &EVENTS)?;
//! service_access_interrupt(&mut bus, &EVENTS)?;
//!
//! // In the sample timer ISR, at any priority:
//! EVENTS.tick();
//!
//! // In the foreground loop:
//! slave.poll(&mut bus, &EVENTS)?;
//! ```
//!
//! ## Features
//!
//! | Feature | Default | Enables |
//! |---------|---------|---------|
//! | `gpio` | yes | [`handshake`] notification pin (requires `embedded-hal`) |
//!
//! ## Protocol parameters
//!
//! - **Commands:** WRITE_DATA `0xFD`, READ_DATA `0xFE`, STOP `0xFC`, ACK `0xFF`
//! - **Header:** little-endian `u16` payload length at window offsets 0..2
//! - **Default window:** 240 bytes, wrapping to offset 8, half watermark 127
//!   ([`constants::DEFAULT_GEOMETRY`])
//! - **Default frame:** 64 bytes ([`constants::DEFAULT_FRAME_SIZE`])

#![no_std]

pub mod constants;
pub mod error;
pub mod geometry;
pub mod config;
pub mod command;
pub mod checksum;
pub mod event;
pub mod bus;
pub mod drain;
pub mod egress;
pub mod session;

#[cfg(feature = "gpio")]
pub mod handshake;

pub use config::{Interface, SlaveConfig};
pub use error::{ConfigError, HeaderError, IntegrityError, SlaveError};
pub use geometry::WindowGeometry;
pub use session::{Application, Direction, SessionState, SessionStats, Slave};
