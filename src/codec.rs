//! Conversion between the text a user types or reads and the raw bytes of a characteristic.

/// Turns characteristic payloads into display text and back. Implementations must be total: every
/// byte sequence decodes to some string.
pub trait ByteCodec: Send + Sync + 'static {
    fn encode(&self, text: &str) -> Vec<u8>;
    fn decode(&self, bytes: &[u8]) -> String;
}

/// UTF-8 codec. Invalid sequences decode to U+FFFD instead of failing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Utf8Codec;

impl ByteCodec for Utf8Codec {
    fn encode(&self, text: &str) -> Vec<u8> {
        text.as_bytes().to_vec()
    }

    fn decode(&self, bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }
}
