use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ciborium::Value;

use mcumgr::header::{group, op};
use mcumgr::{
    payload, Client, Error, LockResult, RawResponse, ResponseHandler, ResultLock, ReturnCode,
    Scheme, SmpHeader, SmpResponse, Transport, HEADER_LENGTH,
};

fn map(entries: Vec<(&str, Value)>) -> Value {
    Value::Map(
        entries
            .into_iter()
            .map(|(k, v)| (Value::Text(k.to_owned()), v))
            .collect(),
    )
}

fn framed_packet(body: &Value) -> Vec<u8> {
    let encoded = payload::encode(body).expect("encode body");
    let header = SmpHeader {
        op: op::WRITE_RESPONSE,
        flags: 0,
        length: encoded.len() as u16,
        group: group::DEFAULT,
        sequence: 0,
        command: 0,
    };
    let mut packet = header.encode().to_vec();
    packet.extend_from_slice(&encoded);
    packet
}

#[test]
fn header_encode_decode_round_trip() {
    let header = SmpHeader {
        op: op::READ,
        flags: 0x04,
        length: 300,
        group: group::FS,
        sequence: 17,
        command: 1,
    };
    let decoded = SmpHeader::decode(&header.encode()).expect("decode");
    assert_eq!(decoded, header);
}

#[test]
fn direct_framed_response_with_rc_zero_is_success() {
    let packet = framed_packet(&map(vec![("rc", Value::Integer(0u8.into()))]));

    let response = SmpResponse::decode(Scheme::Ble, &packet).expect("decode");
    assert_eq!(response.return_code, ReturnCode::Ok);
    assert!(response.is_success());
    assert_eq!(
        usize::from(response.header.length) + HEADER_LENGTH,
        packet.len()
    );
}

#[test]
fn direct_framed_response_with_rc_two_is_error() {
    let packet = framed_packet(&map(vec![("rc", Value::Integer(2u8.into()))]));

    let response = SmpResponse::decode(Scheme::Ble, &packet).expect("decode");
    assert_eq!(response.return_code, ReturnCode::NoMemory);
    assert_eq!(response.return_code.raw(), 2);
    assert!(!response.is_success());
}

#[test]
fn short_direct_framed_buffer_is_invalid_size() {
    let err = SmpResponse::decode(Scheme::Ble, &[0xA1, 0x62, 0x72]).expect_err("error");
    assert!(matches!(err, Error::InvalidSize(_)));
}

#[test]
fn coap_response_with_embedded_header_decodes() {
    let header = SmpHeader {
        op: op::WRITE_RESPONSE,
        flags: 0,
        length: 11,
        group: group::DEFAULT,
        sequence: 3,
        command: 0,
    };
    let coap_payload = payload::encode(&map(vec![
        ("_h", Value::Bytes(header.encode().to_vec())),
        ("r", Value::Text("pong".to_owned())),
    ]))
    .expect("encode");

    let response =
        SmpResponse::decode_coap(Scheme::CoapUdp, &coap_payload, &coap_payload, 205)
            .expect("decode");
    assert_eq!(response.header, header);
    assert_eq!(response.coap_code, 205);

    let echo: mcumgr::EchoResponse = response.body().expect("body");
    assert_eq!(echo.response.as_deref(), Some("pong"));
}

#[test]
fn coap_response_without_embedded_header_is_invalid_payload() {
    let coap_payload =
        payload::encode(&map(vec![("rc", Value::Integer(0u8.into()))])).expect("encode");

    let err =
        SmpResponse::decode_coap(Scheme::CoapBle, &[0u8; 16], &coap_payload, 205).expect_err("error");
    assert!(matches!(err, Error::InvalidPayload(_)));
}

#[test]
fn coap_response_without_coap_payload_is_invalid_size() {
    let err = SmpResponse::decode(Scheme::CoapUdp, &[0u8; 32]).expect_err("error");
    assert!(matches!(err, Error::InvalidSize(_)));
}

/// Serves echo requests over a CoAP scheme from a second thread.
struct CoapEchoTransport;

impl Transport for CoapEchoTransport {
    fn scheme(&self) -> Scheme {
        Scheme::CoapUdp
    }

    fn send(&self, packet: &[u8], handler: ResponseHandler) {
        let request = packet.to_vec();
        thread::spawn(move || {
            let value = payload::decode(&request).expect("request payload");
            let embedded = payload::bytes_field(Some(&value), "_h").expect("embedded header");
            let request_header = SmpHeader::decode(&embedded).expect("request header");
            let text = payload::text_field(Some(&value), "d").unwrap_or_default();

            let body = map(vec![
                ("rc", Value::Integer(0u8.into())),
                ("r", Value::Text(text)),
            ]);
            let body_len = payload::encode(&body).expect("encode body").len();
            let header = SmpHeader {
                op: op::WRITE_RESPONSE,
                flags: 0,
                length: body_len as u16,
                group: request_header.group,
                sequence: request_header.sequence,
                command: request_header.command,
            };

            let Value::Map(mut entries) = body else {
                unreachable!();
            };
            entries.push((
                Value::Text("_h".to_owned()),
                Value::Bytes(header.encode().to_vec()),
            ));
            let coap_payload = payload::encode(&Value::Map(entries)).expect("encode");

            handler(Ok(RawResponse {
                data: coap_payload.clone(),
                coap_payload: Some(coap_payload),
                coap_code: 205,
            }));
        });
    }
}

#[test]
fn echo_round_trip_over_coap_scheme() {
    let client = Client::new(Arc::new(CoapEchoTransport)).timeout(Duration::from_secs(2));

    let echo = client.echo("pong").expect("echo");
    assert_eq!(echo.rc, ReturnCode::Ok);
    assert_eq!(echo.response.as_deref(), Some("pong"));
}

#[test]
fn coap_code_is_stored_on_the_envelope() {
    let client = Client::new(Arc::new(CoapEchoTransport)).timeout(Duration::from_secs(2));

    let response = client
        .send_raw(op::WRITE, group::DEFAULT, 0, None)
        .expect("send_raw");
    assert_eq!(response.coap_code, 205);
    assert_eq!(response.scheme, Scheme::CoapUdp);
}

#[test]
fn gate_opened_before_wait_returns_immediately() {
    let gate: ResultLock<Error> = ResultLock::new(false);
    gate.open(None);

    let start = Instant::now();
    assert!(matches!(
        gate.block_timeout(Duration::from_millis(100)),
        LockResult::Success
    ));
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[test]
fn gate_opened_mid_wait_releases_before_the_deadline() {
    let gate: Arc<ResultLock<Error>> = Arc::new(ResultLock::new(false));

    let opener = Arc::clone(&gate);
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        opener.open(None);
    });

    let result = gate.block_timeout(Duration::from_millis(1000));
    handle.join().expect("join");
    assert!(matches!(result, LockResult::Success));
}
