//! Minimal request-head parsing.
//!
//! Clients speak plain HTTP/1.x to us even though the stream reply is ICY,
//! so only the request line and headers are read; bodies are never expected.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::error::RequestError;
use crate::protocol_constants::{ICY_METADATA_HEADER, MAX_REQUEST_HEAD_SIZE};

/// Request line and headers of one client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
}

impl RequestHead {
    /// Looks up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the client opted in to in-band metadata (`Icy-MetaData: 1`).
    pub fn wants_metadata(&self) -> bool {
        self.header(ICY_METADATA_HEADER) == Some("1")
    }
}

/// Reads a request head up to and including the blank line.
pub async fn read_request_head<R>(reader: &mut R) -> Result<RequestHead, RequestError>
where
    R: AsyncBufRead + Unpin,
{
    let mut limited = reader.take(MAX_REQUEST_HEAD_SIZE as u64);
    let mut line = String::new();

    let request_line = match read_line(&mut limited, &mut line).await? {
        Some(l) => l,
        None if limited.limit() == 0 => {
            return Err(RequestError::TooLarge(MAX_REQUEST_HEAD_SIZE))
        }
        None => return Err(RequestError::Incomplete),
    };
    let mut parts = request_line.split_whitespace();
    let (method, path) = match (parts.next(), parts.next()) {
        (Some(m), Some(p)) => (m.to_string(), p.to_string()),
        _ => return Err(RequestError::MalformedRequestLine(request_line)),
    };

    let mut headers = Vec::new();
    loop {
        let header_line = match read_line(&mut limited, &mut line).await? {
            Some(l) => l,
            None if limited.limit() == 0 => {
                return Err(RequestError::TooLarge(MAX_REQUEST_HEAD_SIZE))
            }
            None => return Err(RequestError::Incomplete),
        };
        if header_line.is_empty() {
            break;
        }
        // Lines without a colon are ignored
        if let Some((name, value)) = header_line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    Ok(RequestHead {
        method,
        path,
        headers,
    })
}

/// Reads one CRLF- or LF-terminated line, returning `None` at end of input.
///
/// A final line without a terminator also counts as end of input.
async fn read_line<R>(reader: &mut R, buf: &mut String) -> Result<Option<String>, RequestError>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    reader.read_line(buf).await?;
    if !buf.ends_with('\n') {
        return Ok(None);
    }
    Ok(Some(buf.trim_end_matches(['\r', '\n']).to_string()))
}
