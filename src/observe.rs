use std::time::Duration;

use crate::error::Error;

pub(crate) fn record_ok(
    scheme: &'static str,
    group: u16,
    command: u8,
    elapsed: Duration,
    rc: u64,
) {
    let _ = (scheme, group, command, elapsed, rc);

    #[cfg(feature = "metrics")]
    {
        metrics::counter!("mcumgr_requests_total", "scheme" => scheme, "outcome" => "ok")
            .increment(1);
        metrics::histogram!("mcumgr_request_seconds", "scheme" => scheme)
            .record(elapsed.as_secs_f64());
        if rc != 0 {
            metrics::counter!("mcumgr_rc_nonzero_total", "scheme" => scheme).increment(1);
        }
    }

    #[cfg(feature = "tracing")]
    {
        tracing::debug!(
            scheme,
            group,
            command,
            rc,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "mcumgr request ok"
        );
    }
}

pub(crate) fn record_err(
    scheme: &'static str,
    group: u16,
    command: u8,
    elapsed: Duration,
    err: &Error,
) {
    let _ = (scheme, group, command, elapsed, err);

    #[cfg(feature = "metrics")]
    {
        metrics::counter!("mcumgr_requests_total", "scheme" => scheme, "outcome" => "err")
            .increment(1);
        metrics::counter!(
            "mcumgr_request_errors_total",
            "scheme" => scheme,
            "kind" => error_kind(err)
        )
        .increment(1);
        metrics::histogram!("mcumgr_request_seconds", "scheme" => scheme)
            .record(elapsed.as_secs_f64());
    }

    #[cfg(feature = "tracing")]
    {
        tracing::warn!(
            scheme,
            group,
            command,
            error = %err,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "mcumgr request failed"
        );
    }
}

#[cfg(feature = "metrics")]
fn error_kind(err: &Error) -> &'static str {
    match err {
        Error::InvalidSize(_) => "invalid_size",
        Error::InvalidPayload(_) | Error::InvalidPayloadOwned(_) => "invalid_payload",
        Error::Encode(_) => "encode",
        Error::Timeout => "timeout",
        Error::Transport(_) => "transport",
        Error::ErrorCode { .. } => "error_code",
        Error::InvalidArgument(_) => "invalid_argument",
    }
}
