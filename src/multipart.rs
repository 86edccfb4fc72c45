//! `multipart/form-data` encoder producing the exact body bytes, so the body
//! stays inspectable when captured by the mock transport.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Bytes, BytesMut};

use super::adapter::RestBytes;

const CRLF: &[u8] = b"\r\n";

// Field names and filenames land inside a quoted string on the
// Content-Disposition line; a literal quote or line break there would let a
// caller-supplied value forge part headers. Percent-escape them the way
// browsers encode form-data. Part content needs no escaping: it is raw bytes
// delimited by the boundary.
fn escape_quoted(value: &str) -> String {
    value
        .replace('\r', "%0D")
        .replace('\n', "%0A")
        .replace('"', "%22")
}

static FORM_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_boundary() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    let sequence = FORM_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("----probe-form-{nanos:08x}{sequence:08x}")
}

/// Incremental form encoder. Parts are framed as they are appended;
/// `finish` writes the closing boundary and freezes the body.
#[derive(Debug)]
pub struct FormData {
    boundary: String,
    buf: BytesMut,
}

impl FormData {
    pub fn new() -> Self {
        Self::with_boundary(next_boundary())
    }

    /// Fixed boundary, for deterministic test fixtures.
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            buf: BytesMut::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        let name = escape_quoted(name);
        self.open_part();
        self.buf.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"").as_bytes(),
        );
        self.buf.extend_from_slice(CRLF);
        self.buf.extend_from_slice(CRLF);
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.extend_from_slice(CRLF);
        self
    }

    pub fn file(
        mut self,
        name: &str,
        filename: &str,
        content_type: &str,
        data: impl Into<RestBytes>,
    ) -> Self {
        let name = escape_quoted(name);
        let filename = escape_quoted(filename);
        self.open_part();
        self.buf.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"")
                .as_bytes(),
        );
        self.buf.extend_from_slice(CRLF);
        self.buf
            .extend_from_slice(format!("Content-Type: {content_type}").as_bytes());
        self.buf.extend_from_slice(CRLF);
        self.buf.extend_from_slice(CRLF);
        self.buf.extend_from_slice(&data.into());
        self.buf.extend_from_slice(CRLF);
        self
    }

    /// Closes the form and returns the encoded body.
    pub fn finish(mut self) -> Bytes {
        self.buf
            .extend_from_slice(format!("--{}--", self.boundary).as_bytes());
        self.buf.extend_from_slice(CRLF);
        self.buf.freeze()
    }

    fn open_part(&mut self) {
        self.buf
            .extend_from_slice(format!("--{}", self.boundary).as_bytes());
        self.buf.extend_from_slice(CRLF);
    }
}

impl Default for FormData {
    fn default() -> Self {
        Self::new()
    }
}
