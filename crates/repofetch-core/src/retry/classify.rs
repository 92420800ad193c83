//! Classify HTTP status, curl errors and storage failures into retry kinds.

use super::error::FetchError;
use super::policy::ErrorKind;

/// Classify an HTTP status code. Only 416 is recoverable; every other
/// non-200/206 status is a semantic failure and is never retried.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        416 => ErrorKind::RangeNotSatisfiable,
        _ => ErrorKind::Other,
    }
}

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
        || e.is_http2_stream_error()
        || e.is_ssl_connect_error()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

/// Classify a transfer error into an ErrorKind.
pub fn classify(e: &FetchError) -> ErrorKind {
    match e {
        FetchError::Curl(ce) => classify_curl_error(ce),
        FetchError::Http(code) => classify_http_status(*code),
        FetchError::PartialTransfer { .. } => ErrorKind::Connection,
        FetchError::Storage(_) | FetchError::RangeMismatch { .. } | FetchError::InvalidUrl(_) => {
            ErrorKind::Other
        }
    }
}
