//! A blocking mcumgr client.
//!
//! [`Client`] builds SMP request packets, hands them to a [`Transport`],
//! and blocks the calling thread on a per-request [`ResultLock`] until the
//! transport's completion context delivers (and this crate decodes) the
//! response, or the timeout elapses.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use ciborium::Value;

use crate::debug;
use crate::error::{Error, Result};
use crate::header::{group, op, SmpHeader, HEADER_LENGTH};
use crate::lock::{LockResult, ResultLock};
use crate::observe;
use crate::payload;
use crate::response::{FromPayload, SmpResponse};
use crate::transport::{RawResponse, Scheme, Transport};
use crate::types::{
    EchoResponse, GenericResponse, ImageStateResponse, TaskStatResponse, UploadResponse,
};

/// Default response timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Reserved request key under which CoAP schemes embed the SMP header.
const EMBEDDED_HEADER_KEY: &str = "_h";

// OS group command identifiers.
const CMD_ECHO: u8 = 0;
const CMD_TASK_STATS: u8 = 2;
const CMD_RESET: u8 = 5;

// Image group command identifiers.
const CMD_IMAGE_STATE: u8 = 0;
const CMD_IMAGE_UPLOAD: u8 = 1;

/// A blocking mcumgr client over an externally supplied transport.
pub struct Client {
    transport: Arc<dyn Transport>,
    timeout: Duration,
    sequence: AtomicU8,
}

impl Client {
    /// Create a client over `transport` with the default response timeout.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            timeout: DEFAULT_TIMEOUT,
            sequence: AtomicU8::new(0),
        }
    }

    /// Set the response timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send a raw SMP request and return the decoded response envelope.
    ///
    /// `body` is the request payload map; `None` sends an empty map. The
    /// peer-reported return code is left on the envelope for the caller to
    /// inspect.
    pub fn send_raw(
        &self,
        op: u8,
        group: u16,
        command: u8,
        body: Option<Value>,
    ) -> Result<SmpResponse> {
        let start = Instant::now();
        let result = self.request(op, group, command, body);
        let elapsed = start.elapsed();
        let scheme = self.transport.scheme().as_str();
        match &result {
            Ok(response) => {
                observe::record_ok(scheme, group, command, elapsed, response.return_code.raw())
            }
            Err(err) => observe::record_err(scheme, group, command, elapsed, err),
        }
        result
    }

    /// `echo` (OS group): the peer echoes `text` back.
    pub fn echo(&self, text: &str) -> Result<EchoResponse> {
        let body = Value::Map(vec![(
            Value::Text("d".to_owned()),
            Value::Text(text.to_owned()),
        )]);
        self.execute(op::WRITE, group::DEFAULT, CMD_ECHO, Some(body))
    }

    /// `taskstat` (OS group): per-task scheduler statistics.
    pub fn task_stats(&self) -> Result<TaskStatResponse> {
        self.execute(op::READ, group::DEFAULT, CMD_TASK_STATS, None)
    }

    /// `reset` (OS group): reboot the peer.
    pub fn reset(&self) -> Result<GenericResponse> {
        self.execute(op::WRITE, group::DEFAULT, CMD_RESET, None)
    }

    /// `state` (image group): list the image slots on the peer.
    pub fn image_list(&self) -> Result<ImageStateResponse> {
        self.execute(op::READ, group::IMAGE, CMD_IMAGE_STATE, None)
    }

    /// `upload` (image group): send one chunk of firmware image data.
    ///
    /// `total` is the full image size; it is only transmitted with the
    /// first chunk (offset 0). The response carries the offset the peer
    /// expects next.
    pub fn image_upload(&self, chunk: &[u8], offset: u64, total: u64) -> Result<UploadResponse> {
        let mut entries = vec![
            (Value::Text("data".to_owned()), Value::Bytes(chunk.to_vec())),
            (Value::Text("off".to_owned()), Value::Integer(offset.into())),
        ];
        if offset == 0 {
            entries.push((Value::Text("len".to_owned()), Value::Integer(total.into())));
        }
        self.execute(
            op::WRITE,
            group::IMAGE,
            CMD_IMAGE_UPLOAD,
            Some(Value::Map(entries)),
        )
    }

    /// A service-style grouping for OS group commands.
    pub fn os(&self) -> OsService<'_> {
        OsService { client: self }
    }

    /// A service-style grouping for image group commands.
    pub fn image(&self) -> ImageService<'_> {
        ImageService { client: self }
    }

    fn execute<T: FromPayload>(
        &self,
        op: u8,
        group: u16,
        command: u8,
        body: Option<Value>,
    ) -> Result<T> {
        let response = self.send_raw(op, group, command, body)?;
        if !response.is_success() {
            return Err(Error::ErrorCode {
                rc: response.return_code,
            });
        }
        response.body()
    }

    fn request(&self, op: u8, group: u16, command: u8, body: Option<Value>) -> Result<SmpResponse> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let scheme = self.transport.scheme();
        let packet = build_request(scheme, op, group, sequence, command, body)?;
        debug::dump_hex("mcumgr request", &packet);

        let gate: Arc<ResultLock<Error>> = Arc::new(ResultLock::new(false));
        let slot: Arc<Mutex<Option<SmpResponse>>> = Arc::new(Mutex::new(None));

        let opener = Arc::clone(&gate);
        let filler = Arc::clone(&slot);
        self.transport.send(
            &packet,
            Box::new(
                move |delivery| match delivery.and_then(|raw| decode_raw(scheme, raw)) {
                    Ok(response) => {
                        *filler.lock().unwrap_or_else(PoisonError::into_inner) = Some(response);
                        opener.open(None);
                    }
                    Err(err) => opener.open(Some(err)),
                },
            ),
        );

        match gate.block_timeout(self.timeout) {
            LockResult::Success => slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .ok_or_else(|| {
                    Error::Transport("transport completed without a response".to_owned())
                }),
            LockResult::Timeout => Err(Error::Timeout),
            LockResult::Error(err) => Err(err),
        }
    }
}

/// OS group service.
#[derive(Clone, Copy)]
pub struct OsService<'a> {
    client: &'a Client,
}

impl OsService<'_> {
    /// `echo` (OS group).
    pub fn echo(&self, text: &str) -> Result<EchoResponse> {
        self.client.echo(text)
    }

    /// `taskstat` (OS group).
    pub fn task_stats(&self) -> Result<TaskStatResponse> {
        self.client.task_stats()
    }

    /// `reset` (OS group).
    pub fn reset(&self) -> Result<GenericResponse> {
        self.client.reset()
    }
}

/// Image group service.
#[derive(Clone, Copy)]
pub struct ImageService<'a> {
    client: &'a Client,
}

impl ImageService<'_> {
    /// `state` (image group).
    pub fn list(&self) -> Result<ImageStateResponse> {
        self.client.image_list()
    }

    /// `upload` (image group).
    pub fn upload(&self, chunk: &[u8], offset: u64, total: u64) -> Result<UploadResponse> {
        self.client.image_upload(chunk, offset, total)
    }
}

fn decode_raw(scheme: Scheme, raw: RawResponse) -> Result<SmpResponse> {
    debug::dump_hex("mcumgr response", &raw.data);
    match raw.coap_payload {
        Some(coap_payload) => {
            SmpResponse::decode_coap(scheme, &raw.data, &coap_payload, raw.coap_code)
        }
        None => SmpResponse::decode(scheme, &raw.data),
    }
}

fn build_request(
    scheme: Scheme,
    op: u8,
    group: u16,
    sequence: u8,
    command: u8,
    body: Option<Value>,
) -> Result<Vec<u8>> {
    let body = body.unwrap_or_else(|| Value::Map(Vec::new()));
    let encoded = payload::encode(&body)?;
    let length = u16::try_from(encoded.len())
        .map_err(|_| Error::InvalidArgument("request payload too large"))?;

    let header = SmpHeader {
        op,
        flags: 0,
        length,
        group,
        sequence,
        command,
    };

    if scheme.is_coap() {
        // CoAP schemes carry the header inside the payload map; the length
        // field still counts the payload without the embedded header.
        let Value::Map(mut entries) = body else {
            return Err(Error::InvalidArgument("request payload must be a map"));
        };
        entries.push((
            Value::Text(EMBEDDED_HEADER_KEY.to_owned()),
            Value::Bytes(header.encode().to_vec()),
        ));
        payload::encode(&Value::Map(entries))
    } else {
        let mut packet = Vec::with_capacity(HEADER_LENGTH + encoded.len());
        packet.extend_from_slice(&header.encode());
        packet.extend_from_slice(&encoded);
        Ok(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ResponseHandler;
    use crate::types::ReturnCode;
    use std::thread;

    fn respond_framed(request: &[u8], body: Value) -> RawResponse {
        let header = SmpHeader::decode(request).expect("request header");
        let encoded = payload::encode(&body).expect("encode body");
        let response = SmpHeader {
            op: op::WRITE_RESPONSE,
            flags: 0,
            length: encoded.len() as u16,
            group: header.group,
            sequence: header.sequence,
            command: header.command,
        };
        let mut data = response.encode().to_vec();
        data.extend_from_slice(&encoded);
        RawResponse::framed(data)
    }

    /// Echoes the request's `"d"` field back from a second thread.
    struct EchoTransport;

    impl Transport for EchoTransport {
        fn scheme(&self) -> Scheme {
            Scheme::Ble
        }

        fn send(&self, packet: &[u8], handler: ResponseHandler) {
            let request = packet.to_vec();
            thread::spawn(move || {
                let value = payload::decode(&request[HEADER_LENGTH..]).expect("request body");
                let text = payload::text_field(Some(&value), "d").unwrap_or_default();
                let body = Value::Map(vec![
                    (Value::Text("rc".to_owned()), Value::Integer(0u8.into())),
                    (Value::Text("r".to_owned()), Value::Text(text)),
                ]);
                handler(Ok(respond_framed(&request, body)));
            });
        }
    }

    /// Completes inline, on the caller's own thread.
    struct InlineTransport;

    impl Transport for InlineTransport {
        fn scheme(&self) -> Scheme {
            Scheme::Ble
        }

        fn send(&self, packet: &[u8], handler: ResponseHandler) {
            handler(Ok(respond_framed(packet, Value::Map(Vec::new()))));
        }
    }

    /// Never invokes the completion handler.
    struct SilentTransport;

    impl Transport for SilentTransport {
        fn scheme(&self) -> Scheme {
            Scheme::Ble
        }

        fn send(&self, _packet: &[u8], _handler: ResponseHandler) {}
    }

    /// Reports a transport-level failure from a second thread.
    struct FailingTransport;

    impl Transport for FailingTransport {
        fn scheme(&self) -> Scheme {
            Scheme::Ble
        }

        fn send(&self, _packet: &[u8], handler: ResponseHandler) {
            thread::spawn(move || {
                handler(Err(Error::Transport("radio link lost".to_owned())));
            });
        }
    }

    /// Answers every request with a fixed nonzero return code.
    struct ErrorRcTransport;

    impl Transport for ErrorRcTransport {
        fn scheme(&self) -> Scheme {
            Scheme::Ble
        }

        fn send(&self, packet: &[u8], handler: ResponseHandler) {
            let body = Value::Map(vec![(
                Value::Text("rc".to_owned()),
                Value::Integer(6u8.into()),
            )]);
            handler(Ok(respond_framed(packet, body)));
        }
    }

    #[test]
    fn echo_round_trip_unblocks_caller() {
        let client = Client::new(Arc::new(EchoTransport)).timeout(Duration::from_secs(2));
        let echo = client.echo("hello").expect("echo");

        assert_eq!(echo.rc, ReturnCode::Ok);
        assert_eq!(echo.response.as_deref(), Some("hello"));
    }

    #[test]
    fn synchronous_completion_is_observed() {
        let client = Client::new(Arc::new(InlineTransport)).timeout(Duration::from_secs(2));
        let response = client.reset().expect("reset");
        assert_eq!(response.rc, ReturnCode::Ok);
    }

    #[test]
    fn missing_response_times_out() {
        let client = Client::new(Arc::new(SilentTransport)).timeout(Duration::from_millis(20));
        let err = client.task_stats().expect_err("expected timeout");
        assert!(matches!(err, Error::Timeout));
    }

    #[test]
    fn transport_failure_reaches_the_caller() {
        let client = Client::new(Arc::new(FailingTransport)).timeout(Duration::from_secs(2));
        let err = client.echo("hello").expect_err("expected error");
        assert!(matches!(err, Error::Transport(_)));
    }

    #[test]
    fn nonzero_rc_is_surfaced_as_error_code() {
        let client = Client::new(Arc::new(ErrorRcTransport)).timeout(Duration::from_secs(2));
        let err = client.image_list().expect_err("expected error");
        assert!(matches!(
            err,
            Error::ErrorCode {
                rc: ReturnCode::BadState
            }
        ));
    }

    #[test]
    fn send_raw_leaves_rc_on_the_envelope() {
        let client = Client::new(Arc::new(ErrorRcTransport)).timeout(Duration::from_secs(2));
        let response = client
            .send_raw(op::READ, group::IMAGE, CMD_IMAGE_STATE, None)
            .expect("send_raw");
        assert_eq!(response.return_code, ReturnCode::BadState);
        assert!(!response.is_success());
    }

    #[test]
    fn sequence_numbers_increment_per_request() {
        let client = Client::new(Arc::new(InlineTransport)).timeout(Duration::from_secs(2));
        let first = client
            .send_raw(op::READ, group::DEFAULT, CMD_TASK_STATS, None)
            .expect("first");
        let second = client
            .send_raw(op::READ, group::DEFAULT, CMD_TASK_STATS, None)
            .expect("second");
        assert_eq!(
            second.header.sequence,
            first.header.sequence.wrapping_add(1)
        );
    }

    #[test]
    fn build_request_prefixes_header_for_direct_framing() {
        let packet =
            build_request(Scheme::Ble, op::WRITE, group::DEFAULT, 7, CMD_ECHO, None).expect("build");

        let header = SmpHeader::decode(&packet).expect("header");
        assert_eq!(header.op, op::WRITE);
        assert_eq!(header.sequence, 7);
        assert_eq!(usize::from(header.length), packet.len() - HEADER_LENGTH);
    }

    #[test]
    fn build_request_embeds_header_for_coap() {
        let packet = build_request(Scheme::CoapUdp, op::WRITE, group::DEFAULT, 7, CMD_ECHO, None)
            .expect("build");

        let value = payload::decode(&packet).expect("decode");
        let embedded = payload::bytes_field(Some(&value), EMBEDDED_HEADER_KEY).expect("_h");
        let header = SmpHeader::decode(&embedded).expect("header");
        assert_eq!(header.sequence, 7);
        // The length field counts the payload without the embedded header.
        assert_eq!(header.length, 1);
    }

    #[test]
    fn services_delegate_to_the_client() {
        let client = Client::new(Arc::new(EchoTransport)).timeout(Duration::from_secs(2));
        let echo = client.os().echo("ping").expect("echo");
        assert_eq!(echo.response.as_deref(), Some("ping"));
    }
}
