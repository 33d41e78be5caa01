//! Return-code classification and the typed response records for the known
//! command families.

use core::fmt;
use std::collections::HashMap;

use ciborium::Value;

use crate::error::Result;
use crate::payload;
use crate::response::FromPayload;

/// Reserved payload key carrying the peer-reported status.
const RC_KEY: &str = "rc";

/// Classified mcumgr return code.
///
/// The mgmt layer defines codes 0 through 9; anything else is retained as
/// [`ReturnCode::Unrecognized`] with its raw value. A payload without an
/// `"rc"` key resolves to [`ReturnCode::Ok`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCode {
    /// No error (0).
    Ok,
    /// Unknown error (1).
    Unknown,
    /// The peer is out of memory (2).
    NoMemory,
    /// A request value was invalid (3).
    InvalidValue,
    /// The peer timed out internally (4).
    Timeout,
    /// No such entry (5).
    NoEntry,
    /// The peer's current state disallows the command (6).
    BadState,
    /// The response would not fit the transport (7).
    TooLarge,
    /// Command not supported (8).
    NotSupported,
    /// Corrupt request payload (9).
    Corrupt,
    /// A nonzero code outside the known set; the raw value is retained.
    Unrecognized(u64),
}

impl ReturnCode {
    /// Classify a raw return-code value.
    pub fn from_raw(raw: u64) -> Self {
        match raw {
            0 => Self::Ok,
            1 => Self::Unknown,
            2 => Self::NoMemory,
            3 => Self::InvalidValue,
            4 => Self::Timeout,
            5 => Self::NoEntry,
            6 => Self::BadState,
            7 => Self::TooLarge,
            8 => Self::NotSupported,
            9 => Self::Corrupt,
            other => Self::Unrecognized(other),
        }
    }

    /// The raw return-code value.
    pub fn raw(self) -> u64 {
        match self {
            Self::Ok => 0,
            Self::Unknown => 1,
            Self::NoMemory => 2,
            Self::InvalidValue => 3,
            Self::Timeout => 4,
            Self::NoEntry => 5,
            Self::BadState => 6,
            Self::TooLarge => 7,
            Self::NotSupported => 8,
            Self::Corrupt => 9,
            Self::Unrecognized(raw) => raw,
        }
    }

    /// Resolve the `"rc"` field of a decoded payload.
    ///
    /// An absent key, a payload that is not a map, or an `"rc"` of the
    /// wrong kind all resolve to [`ReturnCode::Ok`]; classification never
    /// fails.
    pub fn resolve(payload: Option<&Value>) -> Self {
        match payload::uint_field(payload, RC_KEY) {
            Some(raw) => Self::from_raw(raw),
            None => Self::Ok,
        }
    }

    /// True only for the zero (success) value.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Unknown => write!(f, "unknown"),
            Self::NoMemory => write!(f, "out of memory"),
            Self::InvalidValue => write!(f, "invalid value"),
            Self::Timeout => write!(f, "timeout"),
            Self::NoEntry => write!(f, "no entry"),
            Self::BadState => write!(f, "bad state"),
            Self::TooLarge => write!(f, "response too large"),
            Self::NotSupported => write!(f, "not supported"),
            Self::Corrupt => write!(f, "corrupt payload"),
            Self::Unrecognized(raw) => write!(f, "unrecognized ({raw})"),
        }
    }
}

/// A response with no fields beyond the return code.
///
/// Commands that only acknowledge (reset, image confirm, erase) map to this
/// record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericResponse {
    /// Peer-reported status.
    pub rc: ReturnCode,
}

impl FromPayload for GenericResponse {
    fn from_payload(payload: Option<&Value>) -> Result<Self> {
        Ok(Self {
            rc: ReturnCode::resolve(payload),
        })
    }
}

/// Response to the OS `echo` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoResponse {
    /// Peer-reported status.
    pub rc: ReturnCode,
    /// Echoed text (`"r"`).
    pub response: Option<String>,
}

impl FromPayload for EchoResponse {
    fn from_payload(payload: Option<&Value>) -> Result<Self> {
        Ok(Self {
            rc: ReturnCode::resolve(payload),
            response: payload::text_field(payload, "r"),
        })
    }
}

/// Response to the OS `taskstat` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatResponse {
    /// Peer-reported status.
    pub rc: ReturnCode,
    /// Task name to statistics (`"tasks"`).
    pub tasks: Option<HashMap<String, TaskStatistics>>,
}

impl FromPayload for TaskStatResponse {
    fn from_payload(payload: Option<&Value>) -> Result<Self> {
        Ok(Self {
            rc: ReturnCode::resolve(payload),
            tasks: payload::record_map(payload, "tasks"),
        })
    }
}

/// Statistics for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatistics {
    /// Task priority (`"prio"`).
    pub priority: Option<u64>,
    /// Task identifier (`"tid"`).
    pub task_id: Option<u64>,
    /// Scheduler state (`"state"`).
    pub state: Option<u64>,
    /// Stack bytes in use (`"stkuse"`).
    pub stack_use: Option<u64>,
    /// Stack size in bytes (`"stksiz"`).
    pub stack_size: Option<u64>,
    /// Context switch count (`"cswcnt"`).
    pub context_switch_count: Option<u64>,
    /// Runtime in milliseconds (`"runtime"`).
    pub runtime: Option<u64>,
    /// Last sanity check-in (`"last_checkin"`).
    pub last_checkin: Option<u64>,
    /// Next sanity check-in (`"next_checkin"`).
    pub next_checkin: Option<u64>,
}

impl FromPayload for TaskStatistics {
    fn from_payload(payload: Option<&Value>) -> Result<Self> {
        Ok(Self {
            priority: payload::uint_field(payload, "prio"),
            task_id: payload::uint_field(payload, "tid"),
            state: payload::uint_field(payload, "state"),
            stack_use: payload::uint_field(payload, "stkuse"),
            stack_size: payload::uint_field(payload, "stksiz"),
            context_switch_count: payload::uint_field(payload, "cswcnt"),
            runtime: payload::uint_field(payload, "runtime"),
            last_checkin: payload::uint_field(payload, "last_checkin"),
            next_checkin: payload::uint_field(payload, "next_checkin"),
        })
    }
}

/// Response to the image-management `state` (list) command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageStateResponse {
    /// Peer-reported status.
    pub rc: ReturnCode,
    /// The image slots on the device, in source order (`"images"`).
    pub images: Option<Vec<ImageSlot>>,
    /// Whether the bootloader uses a split image setup (`"splitStatus"`).
    pub split_status: Option<u64>,
}

impl FromPayload for ImageStateResponse {
    fn from_payload(payload: Option<&Value>) -> Result<Self> {
        Ok(Self {
            rc: ReturnCode::resolve(payload),
            images: payload::record_array(payload, "images"),
            split_status: payload::uint_field(payload, "splitStatus"),
        })
    }
}

/// One image slot reported by the image-management `state` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSlot {
    /// Zero-based slot index (`"slot"`).
    pub slot: Option<u64>,
    /// Image version string (`"version"`).
    pub version: Option<String>,
    /// SHA-256 of the image (`"hash"`).
    pub hash: Option<Vec<u8>>,
    /// Image is bootable (`"bootable"`).
    pub bootable: Option<bool>,
    /// Image will be booted into on reset (`"pending"`).
    pub pending: Option<bool>,
    /// Image is confirmed as the permanent boot target (`"confirmed"`).
    pub confirmed: Option<bool>,
    /// Image in this slot is running (`"active"`).
    pub active: Option<bool>,
    /// Image is marked permanent (`"permanent"`).
    pub permanent: Option<bool>,
}

impl FromPayload for ImageSlot {
    fn from_payload(payload: Option<&Value>) -> Result<Self> {
        Ok(Self {
            slot: payload::uint_field(payload, "slot"),
            version: payload::text_field(payload, "version"),
            hash: payload::bytes_field(payload, "hash"),
            bootable: payload::bool_field(payload, "bootable"),
            pending: payload::bool_field(payload, "pending"),
            confirmed: payload::bool_field(payload, "confirmed"),
            active: payload::bool_field(payload, "active"),
            permanent: payload::bool_field(payload, "permanent"),
        })
    }
}

/// Response to the image-management `upload` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResponse {
    /// Peer-reported status.
    pub rc: ReturnCode,
    /// Offset to send the next chunk from (`"off"`).
    pub off: Option<u64>,
}

impl FromPayload for UploadResponse {
    fn from_payload(payload: Option<&Value>) -> Result<Self> {
        Ok(Self {
            rc: ReturnCode::resolve(payload),
            off: payload::uint_field(payload, "off"),
        })
    }
}
