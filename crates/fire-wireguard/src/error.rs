//! Error types for key handling, mesh generation and configuration codecs.

use thiserror::Error;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, WireGuardError>;

/// Errors that can occur while generating or (de)serializing mesh configuration.
#[derive(Debug, Error)]
pub enum WireGuardError {
    /// A key failed structural or clamping validation.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// An address, prefix or endpoint could not be parsed.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// A required field is absent or unusable.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A required section is absent from a configuration file.
    #[error("missing [{0}] section")]
    MissingSection(&'static str),

    /// A section that may appear at most once appeared again.
    #[error("line {line}: duplicate [Interface] section")]
    DuplicateSection {
        /// Line number (1-based) of the second header.
        line: usize,
    },

    /// A section header with an unrecognized name.
    #[error("line {line}: unknown section [{name}]")]
    UnknownSection {
        /// Line number (1-based) of the header.
        line: usize,
        /// The section name between the brackets.
        name: String,
    },

    /// A known key carried a value that could not be parsed.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// The configuration key.
        key: &'static str,
        /// The offending value.
        value: String,
    },

    /// Structured (JSON) encoding or decoding failed.
    #[error("structured form: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<base64::DecodeError> for WireGuardError {
    fn from(err: base64::DecodeError) -> Self {
        Self::InvalidKey(err.to_string())
    }
}

impl From<ipnet::AddrParseError> for WireGuardError {
    fn from(err: ipnet::AddrParseError) -> Self {
        Self::InvalidAddress(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_field() {
        let err = WireGuardError::MissingField("AllowedIPs");
        assert_eq!(err.to_string(), "missing required field: AllowedIPs");
    }

    #[test]
    fn display_names_the_section() {
        let err = WireGuardError::UnknownSection { line: 7, name: "Wat".into() };
        assert_eq!(err.to_string(), "line 7: unknown section [Wat]");
        assert_eq!(
            WireGuardError::MissingSection("Interface").to_string(),
            "missing [Interface] section"
        );
    }

    #[test]
    fn base64_errors_become_invalid_key() {
        use base64::Engine;
        let err = base64::engine::general_purpose::STANDARD
            .decode("not base64!")
            .map_err(WireGuardError::from)
            .expect_err("invalid base64");
        assert!(matches!(err, WireGuardError::InvalidKey(_)));
    }
}
