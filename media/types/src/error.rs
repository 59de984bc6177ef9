/*!
    Error types for the media crate ecosystem.
*/

use thiserror::Error;

/**
    Error type for the media crate ecosystem.

    End of stream is deliberately absent: pulling past the last sample
    yields `Ok(None)`, never an error.
*/
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from a packet source or output file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Codec error (decode failure, corrupt packet).
    #[error("codec error: {message}")]
    Codec { message: String },
    /// Invalid data (malformed input).
    #[error("invalid data: {message}")]
    InvalidData { message: String },
    /// Unsupported format (valid but not handled).
    #[error("unsupported format: {message}")]
    UnsupportedFormat { message: String },
    /// A native or scratch allocation could not be satisfied.
    #[error("resource exhausted: {message}")]
    ResourceExhausted { message: String },
    /// A single frame could not be converted to the target layout.
    #[error("conversion failed: {message}")]
    Conversion { message: String },
    /// The stream changed dimensions or format after allocation.
    #[error("format changed mid-stream: {message}")]
    FormatChanged { message: String },
    /// An effect definition was rejected while building a chain.
    #[error("invalid effect '{name}': {reason}")]
    InvalidEffect { name: String, reason: String },
    /// An operation was attempted in a state that does not permit it.
    #[error("invalid state: {message}")]
    InvalidState { message: String },
}

impl Error {
    /**
        Create a codec error with the given message.
    */
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /**
        Create an invalid data error with the given message.
    */
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /**
        Create an unsupported format error with the given message.
    */
    pub fn unsupported_format(message: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            message: message.into(),
        }
    }

    /**
        Create a resource exhaustion error with the given message.
    */
    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::ResourceExhausted {
            message: message.into(),
        }
    }

    /**
        Create a conversion error with the given message.
    */
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion {
            message: message.into(),
        }
    }

    /**
        Create a format change error with the given message.
    */
    pub fn format_changed(message: impl Into<String>) -> Self {
        Self::FormatChanged {
            message: message.into(),
        }
    }

    /**
        Create an effect rejection for the named effect.
    */
    pub fn invalid_effect(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEffect {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /**
        Create an invalid state error with the given message.
    */
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /**
        Returns true if this error is a corrupt or undecodable packet.

        These are skipped by the sample provider rather than surfaced.
    */
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::Codec { .. } | Self::InvalidData { .. })
    }

    /**
        Returns true if the error leaves its owner unusable.
    */
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ResourceExhausted { .. } | Self::FormatChanged { .. }
        )
    }
}

/**
    Result type alias for the media crate ecosystem.
*/
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn error_display() {
        let e = Error::codec("decode failed");
        assert_eq!(format!("{e}"), "codec error: decode failed");

        let e = Error::resource_exhausted("scratch buffer");
        assert_eq!(format!("{e}"), "resource exhausted: scratch buffer");

        let e = Error::invalid_effect("reverb", "unknown effect");
        assert_eq!(format!("{e}"), "invalid effect 'reverb': unknown effect");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(StdError::source(&e).is_some());
    }

    #[test]
    fn decode_errors_are_skippable() {
        assert!(Error::codec("corrupt").is_decode_error());
        assert!(Error::invalid_data("short packet").is_decode_error());
        assert!(!Error::conversion("scale").is_decode_error());
    }

    #[test]
    fn fatal_errors() {
        assert!(Error::resource_exhausted("alloc").is_fatal());
        assert!(Error::format_changed("1920x1080 -> 1280x720").is_fatal());
        assert!(!Error::conversion("scale").is_fatal());
        assert!(!Error::codec("corrupt").is_fatal());
    }
}
