//! The fixed 8-byte SMP header carried by every mcumgr request and response.

use crate::error::{Error, Result};

/// Length of the fixed SMP header in bytes.
pub const HEADER_LENGTH: usize = 8;

/// SMP operation codes.
pub mod op {
    /// Read request.
    pub const READ: u8 = 0;
    /// Read response.
    pub const READ_RESPONSE: u8 = 1;
    /// Write request.
    pub const WRITE: u8 = 2;
    /// Write response.
    pub const WRITE_RESPONSE: u8 = 3;
}

/// SMP command group identifiers.
pub mod group {
    /// Default (OS) group: echo, task statistics, reset.
    pub const DEFAULT: u16 = 0;
    /// Image management group.
    pub const IMAGE: u16 = 1;
    /// Statistics group.
    pub const STATISTICS: u16 = 2;
    /// Configuration group.
    pub const CONFIG: u16 = 3;
    /// Log management group.
    pub const LOGS: u16 = 4;
    /// Crash test group.
    pub const CRASH: u16 = 5;
    /// Split image management group.
    pub const SPLIT: u16 = 6;
    /// Run test group.
    pub const RUN: u16 = 7;
    /// File system group.
    pub const FS: u16 = 8;
    /// First application-defined group.
    pub const PERUSER: u16 = 64;
}

/// Parsed SMP header.
///
/// Multi-byte fields are network byte order on the wire. `length` counts
/// payload bytes only; it excludes the header itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmpHeader {
    /// Operation code (see [`op`]).
    pub op: u8,
    /// Flags byte.
    pub flags: u8,
    /// Declared payload length in bytes, excluding the header.
    pub length: u16,
    /// Command group (see [`group`]).
    pub group: u16,
    /// Request sequence number.
    pub sequence: u8,
    /// Command identifier within the group.
    pub command: u8,
}

impl SmpHeader {
    /// Parse a header from the first [`HEADER_LENGTH`] bytes of `data`.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LENGTH {
            return Err(Error::InvalidSize("buffer shorter than SMP header"));
        }

        Ok(Self {
            op: data[0],
            flags: data[1],
            length: u16::from_be_bytes([data[2], data[3]]),
            group: u16::from_be_bytes([data[4], data[5]]),
            sequence: data[6],
            command: data[7],
        })
    }

    /// Serialize the header into its wire form.
    pub fn encode(&self) -> [u8; HEADER_LENGTH] {
        let length = self.length.to_be_bytes();
        let group = self.group.to_be_bytes();
        [
            self.op,
            self.flags,
            length[0],
            length[1],
            group[0],
            group[1],
            self.sequence,
            self.command,
        ]
    }
}
