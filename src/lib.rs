#![deny(unsafe_code)]
#![warn(missing_docs)]

//! A blocking mcumgr (SMP) device-management client core.
//!
//! The crate implements:
//! - SMP envelope decoding for direct-framed (BLE) and CoAP-wrapped
//!   (CoAP/BLE, CoAP/UDP) transport schemes
//! - CBOR payload projection onto typed response records
//! - A reusable result gate (`ResultLock`) bridging asynchronous transport
//!   completions back to blocking callers, with timeout support
//!
//! Transports themselves are external: implement [`Transport`] over your
//! BLE or UDP stack and hand it to [`Client`].

pub mod client;
mod debug;
mod error;
pub mod header;
pub mod lock;
mod observe;
pub mod payload;
pub mod response;
pub mod transport;
pub mod types;

pub use crate::client::{Client, ImageService, OsService};
pub use crate::error::{Error, Result};
pub use crate::header::{SmpHeader, HEADER_LENGTH};
pub use crate::lock::{LockResult, ResultLock};
pub use crate::response::{FromPayload, SmpResponse};
pub use crate::transport::{RawResponse, ResponseHandler, Scheme, Transport};
pub use crate::types::{
    EchoResponse, GenericResponse, ImageSlot, ImageStateResponse, ReturnCode, TaskStatResponse,
    TaskStatistics, UploadResponse,
};
