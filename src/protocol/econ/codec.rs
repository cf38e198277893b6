//! Line framing for the external console stream.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Lines longer than this without a terminator are flushed as-is.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 8 * 1024;

/// Codec for newline-terminated console text.
///
/// Decoding is lossy: invalid UTF-8 is replaced rather than failing the
/// stream, since the console only carries human-readable log output.
#[derive(Debug, Clone)]
pub struct ConsoleCodec {
    max_line_length: usize,
    /// Bytes already scanned for a newline in the current buffer.
    next_index: usize,
}

impl ConsoleCodec {
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_LINE_LENGTH)
    }

    pub fn with_max_length(max_line_length: usize) -> Self {
        Self {
            max_line_length: max_line_length.max(1),
            next_index: 0,
        }
    }
}

impl Default for ConsoleCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn to_line(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.trim_end_matches(&['\r', '\n', '\0'][..]).to_string()
}

impl Decoder for ConsoleCodec {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let scan_end = src.len().min(self.max_line_length);
        if let Some(offset) = src[self.next_index.min(scan_end)..scan_end]
            .iter()
            .position(|b| *b == b'\n')
        {
            let newline_at = self.next_index.min(scan_end) + offset;
            self.next_index = 0;
            let line = src.split_to(newline_at + 1);
            return Ok(Some(to_line(&line)));
        }

        if src.len() >= self.max_line_length {
            self.next_index = 0;
            let line = src.split_to(self.max_line_length);
            return Ok(Some(to_line(&line)));
        }

        self.next_index = src.len();
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if src.is_empty() {
            return Ok(None);
        }
        let line = to_line(src);
        src.advance(src.len());
        Ok(Some(line))
    }
}

impl Encoder<String> for ConsoleCodec {
    type Error = std::io::Error;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len() + 1);
        dst.put_slice(item.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_splits_lines() {
        let mut codec = ConsoleCodec::new();
        let mut buf = BytesMut::from("[chat]: 0:-2:hello\r\n[game]: leave player='1:Bob'\n");

        assert_eq!(
            codec.decode(&mut buf).unwrap().as_deref(),
            Some("[chat]: 0:-2:hello")
        );
        assert_eq!(
            codec.decode(&mut buf).unwrap().as_deref(),
            Some("[game]: leave player='1:Bob'")
        );
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_decode_waits_for_terminator() {
        let mut codec = ConsoleCodec::new();
        let mut buf = BytesMut::from("Enter pass");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"word:\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap().as_deref(),
            Some("Enter password:")
        );
    }

    #[test]
    fn test_decode_flushes_overlong_line() {
        let mut codec = ConsoleCodec::with_max_length(4);
        let mut buf = BytesMut::from("abcdefg");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("abcd"));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(codec.decode_eof(&mut buf).unwrap().as_deref(), Some("efg"));
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_decode_is_lossy_and_strips_padding() {
        let mut codec = ConsoleCodec::new();
        let mut buf = BytesMut::from(&b"caf\xff\0\0\n"[..]);
        assert_eq!(
            codec.decode(&mut buf).unwrap().as_deref(),
            Some("caf\u{FFFD}")
        );
    }

    #[test]
    fn test_encode_appends_newline() {
        let mut codec = ConsoleCodec::new();
        let mut buf = BytesMut::new();
        codec.encode("say \"hi\"".to_string(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"say \"hi\"\n");
    }
}
