//! Control commands written by the host into window byte 0.

use crate::constants::{CMD_ACK, CMD_READ_DATA, CMD_STOP, CMD_WRITE_DATA};

/// A decoded command byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    WriteData = CMD_WRITE_DATA,
    ReadData = CMD_READ_DATA,
    Stop = CMD_STOP,
    Ack = CMD_ACK,
}

impl Command {
    /// Decode a command byte. Unknown bytes yield `None`.
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            CMD_WRITE_DATA => Some(Command::WriteData),
            CMD_READ_DATA => Some(Command::ReadData),
            CMD_STOP => Some(Command::Stop),
            CMD_ACK => Some(Command::Ack),
            _ => None,
        }
    }

    /// Wire encoding.
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}
