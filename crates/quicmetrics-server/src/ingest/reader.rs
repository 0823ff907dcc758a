//! Newline-delimited reader with a per-line size cap.

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

#[derive(Debug, Error)]
pub enum ReadLineError {
    /// The line was discarded; the reader is positioned at the next line.
    #[error("line exceeds {limit} bytes")]
    TooLong { limit: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Splits a byte stream on `\n`. A trailing `\r` is left in place; the parser
/// trims it. Bytes past `max_line_bytes` are dropped without being buffered.
pub struct LineReader<R> {
    inner: BufReader<R>,
    max_line_bytes: usize,
    buf: Vec<u8>,
    overflow: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(reader: R, max_line_bytes: usize) -> Self {
        Self {
            inner: BufReader::new(reader),
            max_line_bytes,
            buf: Vec::new(),
            overflow: false,
        }
    }

    /// Next line without its terminator, `Ok(None)` at end of stream.
    /// A final unterminated line is still returned.
    pub async fn next_line(&mut self) -> Result<Option<Vec<u8>>, ReadLineError> {
        loop {
            let available = self.inner.fill_buf().await?;

            if available.is_empty() {
                if self.overflow {
                    return Err(self.finish_overflow());
                }
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(std::mem::take(&mut self.buf)));
            }

            let (chunk, consumed, terminated) = match available.iter().position(|b| *b == b'\n') {
                Some(i) => (&available[..i], i + 1, true),
                None => (available, available.len(), false),
            };

            if !self.overflow {
                if self.buf.len() + chunk.len() > self.max_line_bytes {
                    self.overflow = true;
                    self.buf.clear();
                } else {
                    self.buf.extend_from_slice(chunk);
                }
            }
            self.inner.consume(consumed);

            if terminated {
                if self.overflow {
                    return Err(self.finish_overflow());
                }
                return Ok(Some(std::mem::take(&mut self.buf)));
            }
        }
    }

    fn finish_overflow(&mut self) -> ReadLineError {
        self.overflow = false;
        self.buf.clear();
        ReadLineError::TooLong {
            limit: self.max_line_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn splits_lines_and_keeps_unterminated_tail() {
        let data: &[u8] = b"a:1|c\nb:2|c\r\nc:3|c";
        let mut r = LineReader::new(data, 64);
        assert_eq!(r.next_line().await.unwrap(), Some(b"a:1|c".to_vec()));
        assert_eq!(r.next_line().await.unwrap(), Some(b"b:2|c\r".to_vec()));
        assert_eq!(r.next_line().await.unwrap(), Some(b"c:3|c".to_vec()));
        assert_eq!(r.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn overlong_line_is_skipped() {
        let long = "x".repeat(100);
        let data = format!("a:1|c\n{long}\nb:2|c\n");
        let mut r = LineReader::new(data.as_bytes(), 16);
        assert_eq!(r.next_line().await.unwrap(), Some(b"a:1|c".to_vec()));
        assert!(matches!(r.next_line().await, Err(ReadLineError::TooLong { limit: 16 })));
        assert_eq!(r.next_line().await.unwrap(), Some(b"b:2|c".to_vec()));
        assert_eq!(r.next_line().await.unwrap(), None);
    }
}
