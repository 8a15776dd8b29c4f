use std::fmt;
use std::sync::Arc;

use super::cp437::decode_cp437;

/// Decoder for entry names that are not flagged as UTF-8.
pub type DecodeString = Arc<dyn Fn(&[u8]) -> String + Send + Sync>;

/// Parser configuration.
#[derive(Clone, Default)]
pub struct UnzipOptions {
    /// Log every decoded record at debug level.
    pub debug: bool,
    /// Announce every entry but discard its data.
    pub drain_all: bool,
    /// Replaces the built-in CP437 table for legacy names.
    pub decode_string: Option<DecodeString>,
}

impl UnzipOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn drain_all(mut self, drain_all: bool) -> Self {
        self.drain_all = drain_all;
        self
    }

    pub fn decode_string<F>(mut self, decoder: F) -> Self
    where
        F: Fn(&[u8]) -> String + Send + Sync + 'static,
    {
        self.decode_string = Some(Arc::new(decoder));
        self
    }

    /// Decode a name or symlink target.
    pub fn decode_name(&self, bytes: &[u8], is_utf8: bool) -> String {
        if is_utf8 {
            return String::from_utf8_lossy(bytes).into_owned();
        }
        match &self.decode_string {
            Some(decoder) => decoder(bytes),
            None => decode_cp437(bytes),
        }
    }
}

impl fmt::Debug for UnzipOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnzipOptions")
            .field("debug", &self.debug)
            .field("drain_all", &self.drain_all)
            .field("decode_string", &self.decode_string.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_names_use_cp437_by_default() {
        let options = UnzipOptions::new();
        assert_eq!(options.decode_name(&[0x82, b'a'], false), "éa");
        assert_eq!(options.decode_name("é".as_bytes(), true), "é");
    }

    #[test]
    fn custom_decoder_only_for_legacy_names() {
        let options = UnzipOptions::new().decode_string(|bytes| format!("<{}>", bytes.len()));
        assert_eq!(options.decode_name(b"abc", false), "<3>");
        assert_eq!(options.decode_name(b"abc", true), "abc");
    }
}
