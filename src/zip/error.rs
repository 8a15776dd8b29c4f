use thiserror::Error;

/// Why an entry cannot be extracted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Unsupported {
    #[error("Encrypted files are not supported")]
    Encrypted,
    #[error("Zip version {}.{} is not supported", .0 / 10, .0 % 10)]
    Version(u16),
}

/// Faults raised while decoding a ZIP stream.
///
/// [`UnzipError::UnsupportedEntry`] is reported on the entry it concerns and
/// does not stop the stream. Every other variant is fatal: the parser moves
/// to its error state and discards all further input.
#[derive(Error, Debug)]
pub enum UnzipError {
    /// The very first record did not start with a known signature.
    #[error("Not a valid zip file")]
    MalformedSignature,
    /// A later record did not start with a known signature.
    #[error("Invalid signature in zip file: 0x{0:08x}")]
    UnexpectedSignature(u32),
    #[error(transparent)]
    UnsupportedEntry(#[from] Unsupported),
    #[error("Failed to inflate entry data: {0}")]
    DecompressionFailure(String),
    #[error("Stream finished in an invalid state, uncompression failed")]
    TruncatedStream,
    #[error("Failed to decode record: {0}")]
    Io(#[from] std::io::Error),
}

impl UnzipError {
    /// Whether the parser stops after this fault.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, UnzipError::UnsupportedEntry(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(UnzipError::MalformedSignature.to_string(), "Not a valid zip file");
        assert_eq!(
            UnzipError::from(Unsupported::Version(45)).to_string(),
            "Zip version 4.5 is not supported"
        );
        assert_eq!(
            UnzipError::UnexpectedSignature(0x12345678).to_string(),
            "Invalid signature in zip file: 0x12345678"
        );
    }

    #[test]
    fn only_unsupported_entries_are_local() {
        assert!(!UnzipError::from(Unsupported::Encrypted).is_fatal());
        assert!(UnzipError::TruncatedStream.is_fatal());
        assert!(UnzipError::DecompressionFailure("bad".into()).is_fatal());
    }
}
