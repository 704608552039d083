//! MJPEG multipart parsing
//!
//! Camera relays serve `multipart/x-mixed-replace` bodies: a sequence of
//! parts separated by `--boundary` lines, each part a JPEG image. Parts
//! usually carry a `Content-Length` header. When they don't, the body runs
//! up to the next delimiter.
//!
//! ```text
//! --frame\r\n
//! Content-Type: image/jpeg\r\n
//! Content-Length: 5120\r\n
//! \r\n
//! <5120 bytes of JPEG>\r\n
//! --frame\r\n
//! ...
//! --frame--
//! ```

use bytes::{Buf, Bytes, BytesMut};

use crate::error::DeliveryFailure;

use super::config::DEFAULT_MAX_FRAME_SIZE;

/// JPEG start-of-image marker
pub const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// A complete JPEG image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JpegFrame {
    pub data: Bytes,
    /// 1-based position within its stream
    pub sequence: u64,
}

impl JpegFrame {
    /// Validate a standalone JPEG body
    pub fn from_still(data: Bytes) -> Result<Self, DeliveryFailure> {
        check_soi(&data)?;
        Ok(Self { data, sequence: 1 })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Extract the multipart boundary from a Content-Type header value
pub fn parse_boundary(content_type: &str) -> Option<String> {
    let mut params = content_type.split(';');
    let mime = params.next()?.trim();
    if !mime.to_ascii_lowercase().starts_with("multipart/") {
        return None;
    }

    params.find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("boundary") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        // Some servers repeat the leading dashes in the header
        let value = value.strip_prefix("--").unwrap_or(value);
        (!value.is_empty()).then(|| value.to_string())
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Boundary,
    Headers,
    Body { content_length: Option<usize> },
    Done,
}

#[derive(Debug, Default)]
struct PartHeaders {
    content_type: Option<String>,
    content_length: Option<usize>,
}

/// Incremental multipart/x-mixed-replace parser
#[derive(Debug)]
pub struct MjpegParser {
    delimiter: Vec<u8>,
    buffer: BytesMut,
    state: State,
    max_frame_size: usize,
    sequence: u64,
    /// Buffer offset already searched for the current needle
    scanned: usize,
    /// Bytes dropped while looking for a delimiter
    skipped: usize,
}

impl MjpegParser {
    /// Create a parser for parts separated by `--boundary`
    pub fn new(boundary: &str) -> Self {
        let mut delimiter = Vec::with_capacity(boundary.len() + 2);
        delimiter.extend_from_slice(b"--");
        delimiter.extend_from_slice(boundary.as_bytes());

        Self {
            delimiter,
            buffer: BytesMut::with_capacity(64 * 1024),
            state: State::Boundary,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            sequence: 0,
            scanned: 0,
            skipped: 0,
        }
    }

    /// Set the largest accepted part
    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Closing delimiter seen
    pub fn is_finished(&self) -> bool {
        self.state == State::Done
    }

    /// Frames completed so far
    pub fn frames_parsed(&self) -> u64 {
        self.sequence
    }

    /// Feed a body chunk, returning every frame it completes
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<JpegFrame>, DeliveryFailure> {
        if self.state == State::Done {
            return Ok(Vec::new());
        }
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            match self.state {
                State::Boundary => {
                    let Some(pos) = find_from(&self.buffer, &self.delimiter, 0) else {
                        // Keep a tail that could be the start of a split delimiter
                        let keep = self.delimiter.len() - 1;
                        if self.buffer.len() > keep {
                            let discard = self.buffer.len() - keep;
                            self.skip(discard)?;
                        }
                        break;
                    };

                    let after = pos + self.delimiter.len();
                    if self.buffer.len() < after + 2 {
                        self.skip(pos)?;
                        break;
                    }
                    self.skipped = 0;
                    if &self.buffer[after..after + 2] == b"--" {
                        self.state = State::Done;
                        self.buffer.clear();
                        break;
                    }
                    self.buffer.advance(after);
                    self.state = State::Headers;
                }
                State::Headers => {
                    let Some(end) = find_from(&self.buffer, b"\r\n\r\n", self.scanned) else {
                        self.check_buffered()?;
                        self.scanned = self.buffer.len().saturating_sub(3);
                        break;
                    };
                    self.scanned = 0;
                    let block = self.buffer.split_to(end + 4);
                    let headers = parse_part_headers(&block[..end])?;

                    if let Some(content_type) = &headers.content_type {
                        if !content_type.starts_with("image/") {
                            return Err(DeliveryFailure::InvalidFrame(format!(
                                "unexpected part type {}",
                                content_type
                            )));
                        }
                    }
                    if let Some(len) = headers.content_length {
                        if len > self.max_frame_size {
                            return Err(DeliveryFailure::InvalidFrame(format!(
                                "part of {} bytes exceeds limit of {}",
                                len, self.max_frame_size
                            )));
                        }
                    }
                    self.state = State::Body {
                        content_length: headers.content_length,
                    };
                }
                State::Body {
                    content_length: Some(len),
                } => {
                    if self.buffer.len() < len {
                        break;
                    }
                    let data = self.buffer.split_to(len).freeze();
                    frames.push(self.finish_frame(data)?);
                    self.state = State::Boundary;
                }
                State::Body {
                    content_length: None,
                } => {
                    let Some(pos) = find_from(&self.buffer, &self.delimiter, self.scanned) else {
                        self.check_buffered()?;
                        self.scanned = self.buffer.len().saturating_sub(self.delimiter.len() - 1);
                        break;
                    };
                    self.scanned = 0;
                    let end = if pos >= 2 && &self.buffer[pos - 2..pos] == b"\r\n" {
                        pos - 2
                    } else {
                        pos
                    };
                    let data = self.buffer.split_to(end).freeze();
                    frames.push(self.finish_frame(data)?);
                    self.state = State::Boundary;
                }
                State::Done => break,
            }
        }

        Ok(frames)
    }

    fn finish_frame(&mut self, data: Bytes) -> Result<JpegFrame, DeliveryFailure> {
        check_soi(&data)?;
        self.sequence += 1;
        Ok(JpegFrame {
            data,
            sequence: self.sequence,
        })
    }

    fn skip(&mut self, count: usize) -> Result<(), DeliveryFailure> {
        self.buffer.advance(count);
        self.skipped += count;
        if self.skipped > self.max_frame_size {
            return Err(DeliveryFailure::InvalidFrame(format!(
                "no part boundary within {} bytes",
                self.max_frame_size
            )));
        }
        Ok(())
    }

    fn check_buffered(&self) -> Result<(), DeliveryFailure> {
        if self.buffer.len() > self.max_frame_size {
            return Err(DeliveryFailure::InvalidFrame(format!(
                "no part boundary within {} bytes",
                self.max_frame_size
            )));
        }
        Ok(())
    }
}

fn check_soi(data: &[u8]) -> Result<(), DeliveryFailure> {
    if data.starts_with(&JPEG_SOI) {
        Ok(())
    } else {
        Err(DeliveryFailure::InvalidFrame(
            "missing JPEG start marker".into(),
        ))
    }
}

fn parse_part_headers(block: &[u8]) -> Result<PartHeaders, DeliveryFailure> {
    let text = std::str::from_utf8(block)
        .map_err(|_| DeliveryFailure::InvalidFrame("part headers are not UTF-8".into()))?;

    let mut headers = PartHeaders::default();
    for line in text.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.trim().eq_ignore_ascii_case("content-type") {
            headers.content_type = Some(value.to_ascii_lowercase());
        } else if name.trim().eq_ignore_ascii_case("content-length") {
            let len = value.parse::<usize>().map_err(|_| {
                DeliveryFailure::InvalidFrame(format!("bad Content-Length {:?}", value))
            })?;
            headers.content_length = Some(len);
        }
    }
    Ok(headers)
}

/// Search `haystack[from..]`, returning an offset into `haystack`
fn find_from(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    let tail = haystack.get(from..)?;
    if needle.is_empty() || tail.len() < needle.len() {
        return None;
    }
    tail.windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}
