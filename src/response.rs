//! SMP response envelope decoding.
//!
//! Where the header and the CBOR payload live depends on the transport
//! scheme: direct-framed schemes (BLE) prepend the header to the payload,
//! while CoAP schemes embed the header as a byte string under a reserved
//! key inside the CoAP payload. [`SmpResponse::decode`] and
//! [`SmpResponse::decode_coap`] answer those two questions and nothing
//! more; projecting the payload onto a typed record is the caller's move
//! via [`SmpResponse::body`].

use ciborium::Value;

use crate::error::{Error, Result};
use crate::header::{SmpHeader, HEADER_LENGTH};
use crate::payload;
use crate::transport::Scheme;
use crate::types::ReturnCode;

/// Reserved payload key under which CoAP schemes embed the SMP header.
const EMBEDDED_HEADER_KEY: &str = "_h";

/// A record that can be built from a decoded CBOR payload.
///
/// Implementations extract their named fields leniently: an absent or
/// wrong-kind field is left unset rather than failing the record. The
/// response records in [`types`](crate::types) all implement this; new
/// command families are supported by adding an implementation, not by
/// changing the decoder.
pub trait FromPayload: Sized {
    /// Build the record from a decoded payload (`None` for an empty body).
    fn from_payload(payload: Option<&Value>) -> Result<Self>;
}

/// A decoded SMP response envelope.
///
/// Built once per received buffer and immutable thereafter. Decode failures
/// never produce a partial envelope.
#[derive(Debug, Clone)]
pub struct SmpResponse {
    /// The transport scheme the response arrived on.
    pub scheme: Scheme,
    /// The raw packet bytes as received. For CoAP schemes this includes the
    /// CoAP framing.
    pub data: Vec<u8>,
    /// The parsed SMP header.
    pub header: SmpHeader,
    /// The decoded CBOR payload, or `None` when the body was empty.
    pub payload: Option<Value>,
    /// The raw payload bytes the CBOR value was decoded from.
    pub payload_data: Vec<u8>,
    /// Classified `"rc"` status; [`ReturnCode::Ok`] when absent.
    pub return_code: ReturnCode,
    /// CoAP response code for CoAP schemes, stored unmodified; always 0
    /// otherwise.
    pub coap_code: u16,
}

impl SmpResponse {
    /// Decode a response received on a direct-framed scheme.
    ///
    /// The header is the first [`HEADER_LENGTH`] bytes of `data`; the rest
    /// is the CBOR payload. The header's declared length must match the
    /// payload span exactly.
    pub fn decode(scheme: Scheme, data: &[u8]) -> Result<Self> {
        Self::decode_inner(scheme, data, None, 0)
    }

    /// Decode a response received on a CoAP scheme.
    ///
    /// The header is embedded as a byte string under `"_h"` inside the
    /// decoded CoAP payload. `coap_code` is stored on the envelope
    /// unmodified.
    pub fn decode_coap(
        scheme: Scheme,
        data: &[u8],
        coap_payload: &[u8],
        coap_code: u16,
    ) -> Result<Self> {
        Self::decode_inner(scheme, data, Some(coap_payload), coap_code)
    }

    fn decode_inner(
        scheme: Scheme,
        data: &[u8],
        coap_payload: Option<&[u8]>,
        coap_code: u16,
    ) -> Result<Self> {
        if data.len() < HEADER_LENGTH {
            return Err(Error::InvalidSize("response shorter than SMP header"));
        }

        let (header, payload_data, value) = if scheme.is_coap() {
            let coap_payload =
                coap_payload.ok_or(Error::InvalidSize("missing CoAP response payload"))?;
            let value = payload::decode(coap_payload)?;
            let raw_header = payload::bytes_field(Some(&value), EMBEDDED_HEADER_KEY)
                .ok_or(Error::InvalidPayload("missing embedded SMP header"))?;
            let header = SmpHeader::decode(&raw_header)?;
            (header, coap_payload.to_vec(), Some(value))
        } else {
            let header = SmpHeader::decode(data)?;
            let payload_data = &data[HEADER_LENGTH..];
            if payload_data.len() != usize::from(header.length) {
                return Err(Error::InvalidSize("payload length mismatch"));
            }
            let value = if payload_data.is_empty() {
                None
            } else {
                Some(payload::decode(payload_data)?)
            };
            (header, payload_data.to_vec(), value)
        };

        let return_code = ReturnCode::resolve(value.as_ref());

        Ok(Self {
            scheme,
            data: data.to_vec(),
            header,
            payload: value,
            payload_data,
            return_code,
            coap_code,
        })
    }

    /// Project the payload onto a typed response record.
    pub fn body<T: FromPayload>(&self) -> Result<T> {
        T::from_payload(self.payload.as_ref())
    }

    /// True when the peer reported success (or no status at all).
    pub fn is_success(&self) -> bool {
        self.return_code.is_success()
    }

    /// Expected total length of a direct-framed response, derived from the
    /// header's declared payload length.
    ///
    /// Useful for transports that reassemble a response from fragments:
    /// once the first fragment carries the header, this is how many bytes
    /// to collect in total.
    pub fn expected_length(data: &[u8]) -> Result<usize> {
        let header = SmpHeader::decode(data)?;
        Ok(usize::from(header.length) + HEADER_LENGTH)
    }
}
