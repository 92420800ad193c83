//! One HTTP GET for one target at one resume offset.

use std::cell::Cell;
use std::path::Path;

use super::sink::ChunkSink;
use super::CurlOptions;
use crate::control::TransferControl;
use crate::retry::{AttemptFailure, FetchError};

/// Upper bound for curl's receive buffer; larger chunks are assembled by the sink.
const MAX_CURL_BUFFER: usize = 512 * 1024;

pub(super) struct AttemptRequest<'a> {
    pub url: &'a str,
    pub token: Option<&'a str>,
    pub path: &'a Path,
    /// Resume offset; 0 sends no Range header.
    pub offset: u64,
    pub curl: &'a CurlOptions,
    pub control: &'a TransferControl,
}

#[derive(Debug)]
pub(super) enum AttemptResult {
    /// Ranged request answered with 416; caller restarts without Range.
    RangeNotSatisfiable,
    /// 200/206 body fully received and written.
    Complete { len: u64, paused: bool },
}

fn configure(easy: &mut curl::easy::Easy, req: &AttemptRequest<'_>) -> Result<(), curl::Error> {
    easy.url(req.url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.useragent(&req.curl.user_agent)?;
    easy.connect_timeout(req.curl.connect_timeout)?;
    easy.low_speed_limit(1)?;
    easy.low_speed_time(req.curl.read_timeout)?;
    easy.buffer_size(req.control.chunk_size().get().min(MAX_CURL_BUFFER))?;
    if req.offset > 0 {
        easy.range(&format!("{}-", req.offset))?;
    }
    if let Some(token) = req.token {
        let mut list = curl::easy::List::new();
        list.append(&format!("Authorization: Bearer {}", token.trim()))?;
        easy.http_headers(list)?;
    }
    Ok(())
}

/// Status code of an `HTTP/x y reason` line.
fn parse_status_line(line: &str) -> Option<u32> {
    line.split_whitespace().nth(1)?.parse().ok()
}

/// First byte of a `bytes a-b/total` Content-Range value.
fn parse_content_range_start(value: &str) -> Option<u64> {
    let rest = value.trim().strip_prefix("bytes")?.trim_start();
    let (range, _) = rest.split_once('/')?;
    let (start, _) = range.split_once('-')?;
    start.trim().parse().ok()
}

/// Tracks the status and Content-Range of the latest response (redirect
/// hops each start a new status line).
fn on_header(line: &[u8], status: &Cell<u32>, range_start: &Cell<Option<u64>>) {
    let Ok(text) = std::str::from_utf8(line) else {
        return;
    };
    let text = text.trim_end();
    if text.starts_with("HTTP/") {
        status.set(parse_status_line(text).unwrap_or(0));
        range_start.set(None);
    } else if let Some((name, value)) = text.split_once(':') {
        if name.trim().eq_ignore_ascii_case("content-range") {
            range_start.set(parse_content_range_start(value));
        }
    }
}

pub(super) fn perform(req: &AttemptRequest<'_>) -> Result<AttemptResult, AttemptFailure> {
    let mut easy = curl::easy::Easy::new();
    configure(&mut easy, req).map_err(FetchError::Curl)?;

    let status = Cell::new(0u32);
    let range_start = Cell::new(None::<u64>);
    let mut sink = ChunkSink::new(
        req.path,
        req.offset,
        req.control.chunk_size(),
        req.control.pause_signal(),
    );

    let result = {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|line| {
                on_header(line, &status, &range_start);
                true
            })
            .map_err(FetchError::Curl)?;
        transfer
            .write_function(|data| {
                let code = status.get();
                if code != 200 && code != 206 {
                    // Error bodies (416, 404 pages) are discarded.
                    return Ok(data.len());
                }
                if sink.accept(code, range_start.get(), data) {
                    Ok(data.len())
                } else {
                    Ok(0)
                }
            })
            .map_err(FetchError::Curl)?;
        transfer.perform()
    };

    if let Err(e) = result {
        if let Some(cause) = sink.take_error() {
            return Err(AttemptFailure {
                error: cause,
                paused: sink.was_paused(),
            });
        }
        let paused = sink.salvage();
        return Err(AttemptFailure {
            error: FetchError::Curl(e),
            paused,
        });
    }

    let code = match status.get() {
        0 => easy.response_code().map_err(FetchError::Curl)?,
        c => c,
    };
    match code {
        416 if req.offset > 0 => Ok(AttemptResult::RangeNotSatisfiable),
        200 | 206 => {
            let paused = sink.was_paused();
            let len = sink
                .finish(code, range_start.get())
                .map_err(|error| AttemptFailure { error, paused })?;
            Ok(AttemptResult::Complete { len, paused })
        }
        other => Err(FetchError::Http(other).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_parsing() {
        assert_eq!(parse_status_line("HTTP/1.1 206 Partial Content"), Some(206));
        assert_eq!(parse_status_line("HTTP/2 200"), Some(200));
        assert_eq!(parse_status_line("HTTP/1.1"), None);
    }

    #[test]
    fn content_range_start() {
        assert_eq!(parse_content_range_start(" bytes 2048-4095/4096"), Some(2048));
        assert_eq!(parse_content_range_start("bytes 0-0/*"), Some(0));
        assert_eq!(parse_content_range_start("bytes */4096"), None);
        assert_eq!(parse_content_range_start("items 1-2/3"), None);
    }

    #[test]
    fn header_tracking_resets_on_redirect_hop() {
        let status = Cell::new(0);
        let range = Cell::new(None);
        on_header(b"HTTP/1.1 302 Found\r\n", &status, &range);
        on_header(b"Content-Range: bytes 5-9/10\r\n", &status, &range);
        assert_eq!((status.get(), range.get()), (302, Some(5)));
        on_header(b"HTTP/1.1 206 Partial Content\r\n", &status, &range);
        assert_eq!((status.get(), range.get()), (206, None));
        on_header(b"content-range: bytes 7-9/10\r\n", &status, &range);
        assert_eq!(range.get(), Some(7));
    }
}
