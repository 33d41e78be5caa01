//! The transport boundary.
//!
//! Transports are external: this crate only defines the seam they plug
//! into. A transport delivers one complete response buffer per request (or
//! fails), from whatever completion context it runs in, such as a reader
//! thread or a BLE notification callback.

use crate::error::Result;

/// The framing scheme a transport uses for SMP responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Direct-framed over BLE: the SMP header prefixes the payload.
    Ble,
    /// CoAP over BLE: the SMP header is embedded in the CoAP payload.
    CoapBle,
    /// CoAP over UDP: the SMP header is embedded in the CoAP payload.
    CoapUdp,
}

impl Scheme {
    /// Whether responses on this scheme are wrapped in a CoAP envelope.
    pub fn is_coap(self) -> bool {
        matches!(self, Self::CoapBle | Self::CoapUdp)
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Ble => "ble",
            Self::CoapBle => "coap_ble",
            Self::CoapUdp => "coap_udp",
        }
    }
}

/// One complete response buffer handed up by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// The raw packet bytes. For CoAP schemes this includes the CoAP
    /// framing.
    pub data: Vec<u8>,
    /// The CoAP payload, for CoAP schemes only.
    pub coap_payload: Option<Vec<u8>>,
    /// The CoAP response code, 0 for non-CoAP schemes.
    pub coap_code: u16,
}

impl RawResponse {
    /// A response from a direct-framed scheme: raw bytes only.
    pub fn framed(data: Vec<u8>) -> Self {
        Self {
            data,
            coap_payload: None,
            coap_code: 0,
        }
    }
}

/// Completion handler invoked exactly once per [`Transport::send`].
pub type ResponseHandler = Box<dyn FnOnce(Result<RawResponse>) + Send>;

/// A transport that can carry SMP request/response exchanges.
pub trait Transport: Send + Sync {
    /// The framing scheme this transport uses.
    fn scheme(&self) -> Scheme;

    /// Send one request packet.
    ///
    /// `handler` must be invoked exactly once, from the transport's own
    /// completion context, with the complete response buffer or a failure.
    fn send(&self, packet: &[u8], handler: ResponseHandler);
}
