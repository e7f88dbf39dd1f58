use crate::geometry::WindowGeometry;

// ── Command bytes (window offset 0) ────────────────────────────────────────

/// Host requests to push a message into the window.
pub const CMD_WRITE_DATA: u8 = 0xFD;

/// Host requests to stream frames out of the outbound queue.
pub const CMD_READ_DATA: u8 = 0xFE;

/// Host ends a read-streaming session.
pub const CMD_STOP: u8 = 0xFC;

/// Acknowledgement, in both directions.
pub const CMD_ACK: u8 = 0xFF;

// ── Message framing ────────────────────────────────────────────────────────

/// Length of the little-endian `u16` message length header.
pub const HEADER_LEN: usize = 2;

/// Signal mask raised on the host line when the outbound queue holds data.
pub const SIGNAL_DATA_AVAILABLE: u8 = 0x01;

// ── Defaults ───────────────────────────────────────────────────────────────

/// Window layout used by the reference board: 240-byte window wrapping back
/// to offset 8, half watermark at offset 127.
pub const DEFAULT_GEOMETRY: WindowGeometry = WindowGeometry::new_unchecked(8, 127, 240);

/// Bytes pushed into the outbound queue per data tick.
pub const DEFAULT_FRAME_SIZE: usize = 64;

/// Largest outbound queue backing buffer the peripheral can address.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 1023;

/// Default outbound queue threshold interrupt level, in bytes.
pub const DEFAULT_QUEUE_THRESHOLD: usize = 32;
