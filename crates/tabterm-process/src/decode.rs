//! Lossy UTF-8 decoding of shell output chunks.

/// Longest UTF-8 encoded scalar value.
const MAX_UTF8_LEN: usize = 4;

/// Decodes a byte stream chunk by chunk.
///
/// Invalid sequences become U+FFFD. A multi-byte character split across two
/// reads is held back until the rest of it arrives instead of being replaced.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    /// Create a decoder with nothing buffered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk. Never fails.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(bytes);

        let mut text = String::with_capacity(input.len());
        let mut rest = input.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));

                    match e.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None if after.len() < MAX_UTF8_LEN => {
                            self.pending.extend_from_slice(after);
                            break;
                        }
                        None => {
                            text.push_str(&String::from_utf8_lossy(after));
                            break;
                        }
                    }
                }
            }
        }

        text
    }

    /// Flush whatever is still buffered, replacing it if incomplete.
    pub fn finish(&mut self) -> String {
        let pending = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&pending).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_ascii() {
        let mut decoder = Utf8ChunkDecoder::new();
        assert_eq!(decoder.decode(b"dir\r\n"), "dir\r\n");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_invalid_bytes_are_replaced() {
        let mut decoder = Utf8ChunkDecoder::new();
        assert_eq!(decoder.decode(b"ok\xffok"), "ok\u{FFFD}ok");
    }

    #[test]
    fn test_split_multibyte_character() {
        // "Привет" split in the middle of 'и'
        let bytes = "Привет".as_bytes();
        let mut decoder = Utf8ChunkDecoder::new();

        let first = decoder.decode(&bytes[..5]);
        assert_eq!(first, "Пр");

        let second = decoder.decode(&bytes[5..]);
        assert_eq!(second, "ивет");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_finish_replaces_truncated_tail() {
        let mut decoder = Utf8ChunkDecoder::new();
        let euro = "€".as_bytes();
        assert_eq!(decoder.decode(&euro[..2]), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_empty_chunk() {
        let mut decoder = Utf8ChunkDecoder::new();
        assert_eq!(decoder.decode(b""), "");
        assert_eq!(decoder.finish(), "");
    }
}
