//! Incremental UTF-8 decoding for chunked response bodies.
//!
//! Network chunks do not respect character boundaries: a four-byte emoji can
//! arrive as one byte in one chunk and three in the next. [`Utf8Decoder`]
//! keeps the incomplete tail of each chunk and prepends it to the next one,
//! so every fragment it returns is whole text.
//!
//! Malformed sequences decode to U+FFFD, and a leading byte-order mark is
//! dropped, the same as a browser's non-fatal `TextDecoder`.

/// Replacement character emitted for malformed or truncated input.
pub const REPLACEMENT: char = '\u{FFFD}';

const BOM: char = '\u{FEFF}';

/// Stateful UTF-8 decoder carrying partial sequences between chunks.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
    bom_checked: bool,
}

impl Utf8Decoder {
    /// Create a decoder at the start of a stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, returning every complete character it finishes.
    ///
    /// Trailing bytes of an unfinished sequence are held back until the next
    /// call or until [`finish`](Self::finish).
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut out = String::with_capacity(self.pending.len());
        let mut pos = 0;
        while pos < self.pending.len() {
            let rest = &self.pending[pos..];
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    pos = self.pending.len();
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&rest[..valid]));
                    match err.error_len() {
                        Some(bad) => {
                            out.push(REPLACEMENT);
                            pos += valid + bad;
                        }
                        None => {
                            // Incomplete sequence at the end: wait for more bytes.
                            pos += valid;
                            break;
                        }
                    }
                }
            }
        }
        self.pending.drain(..pos);

        self.strip_bom(out)
    }

    /// Flush the decoder at end of stream.
    ///
    /// A sequence left unfinished by the last chunk becomes a single U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        self.pending.clear();
        self.strip_bom(REPLACEMENT.to_string())
    }

    /// Number of bytes held back waiting for the rest of a character.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn strip_bom(&mut self, out: String) -> String {
        if self.bom_checked || out.is_empty() {
            return out;
        }
        self.bom_checked = true;
        match out.strip_prefix(BOM) {
            Some(rest) => rest.to_string(),
            None => out,
        }
    }
}
