//! Debugger wire protocol codec
//!
//! Every message is a header block followed by a JSON body:
//! ```text
//! Content-Length: <byte-length>\r\n
//! \r\n
//! <JSON body>
//! ```
//!
//! The first frame a V8 agent sends is a handshake with extra headers and
//! an empty body:
//! ```text
//! Type: connect\r\n
//! V8-Version: 3.14.5.9\r\n
//! Protocol-Version: 1\r\n
//! Embedding-Host: node v0.10.33\r\n
//! Content-Length: 0\r\n
//! \r\n
//! ```

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::common::Error;

/// Upper bound on a single body; anything larger is treated as corruption
pub const MAX_BODY_LEN: usize = 100 * 1024 * 1024;

const CONTENT_LENGTH: &str = "Content-Length";
const EMBEDDING_HOST: &str = "Embedding-Host";

/// One framed message as read off the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Header name/value pairs in arrival order
    pub headers: Vec<(String, String)>,
    /// Header-block lines without a colon, such as a bare `node v0.10.33`
    /// announcement; only used for version detection
    pub preamble: Vec<String>,
    /// UTF-8 body, exactly `Content-Length` bytes
    pub body: String,
}

impl Frame {
    /// Look up a header value (case-insensitive name)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Engine version announced by the handshake, if this frame carries one
    ///
    /// `Embedding-Host: node v0.10.33` yields `0.10.33`, as does a bare
    /// `node v0.10.33` line.
    pub fn engine_version(&self) -> Option<semver::Version> {
        self.header(EMBEDDING_HOST)
            .and_then(parse_version)
            .or_else(|| self.preamble.iter().find_map(|line| parse_version(line)))
    }
}

/// First `vX.Y.Z` token of an announcement
fn parse_version(text: &str) -> Option<semver::Version> {
    text.split_whitespace()
        .filter_map(|part| part.strip_prefix('v'))
        .find_map(|version| semver::Version::parse(version).ok())
}

fn map_read_error(e: io::Error) -> Error {
    match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::ConnectionClosed,
        io::ErrorKind::InvalidData => Error::Protocol(format!("Invalid header bytes: {}", e)),
        _ => Error::Io(e),
    }
}

/// Read one frame from the stream
///
/// Waits until the whole body has arrived, however it is split across
/// underlying reads. End of stream anywhere in a frame is reported as
/// `ConnectionClosed`; a partial frame is never returned.
pub async fn read_frame<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Frame, Error> {
    let mut headers = Vec::new();
    let mut preamble = Vec::new();
    let mut content_length: Option<usize> = None;

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await.map_err(map_read_error)?;

        if bytes_read == 0 {
            return Err(Error::ConnectionClosed);
        }

        // Empty line (just \r\n) ends the header block
        if line == "\r\n" || line == "\n" {
            break;
        }

        let line = line.trim();
        let Some((name, value)) = line.split_once(':') else {
            tracing::debug!(line, "header line without a colon");
            preamble.push(line.to_string());
            continue;
        };
        let (name, value) = (name.trim(), value.trim());

        if name.eq_ignore_ascii_case(CONTENT_LENGTH) {
            content_length = Some(value.parse().map_err(|_| {
                Error::Protocol(format!("Invalid Content-Length: {}", value))
            })?);
        }
        headers.push((name.to_string(), value.to_string()));
    }

    let len = content_length
        .ok_or_else(|| Error::Protocol("Missing Content-Length header".to_string()))?;

    if len > MAX_BODY_LEN {
        return Err(Error::Protocol(format!(
            "Content-Length too large: {} bytes",
            len
        )));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await.map_err(map_read_error)?;

    let body =
        String::from_utf8(body).map_err(|e| Error::Protocol(format!("Invalid UTF-8: {}", e)))?;

    Ok(Frame {
        headers,
        preamble,
        body,
    })
}

/// Build the bytes of one frame
///
/// Callers that share a writer send the whole buffer in a single write so
/// that frames cannot interleave.
pub fn encode_frame(body: &str) -> Vec<u8> {
    let header = format!("{}: {}\r\n\r\n", CONTENT_LENGTH, body.len());
    let mut bytes = Vec::with_capacity(header.len() + body.len());
    bytes.extend_from_slice(header.as_bytes());
    bytes.extend_from_slice(body.as_bytes());
    bytes
}

/// Write one frame to the stream and flush it
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, body: &str) -> Result<(), Error> {
    writer.write_all(&encode_frame(body)).await?;
    writer.flush().await?;
    Ok(())
}
