//! Error types for halkit.

use thiserror::Error;

/// Top-level result type for halkit operations.
pub type Result<T> = std::result::Result<T, HalError>;

/// Top-level error type for halkit.
#[derive(Debug, Error)]
pub enum HalError {
    #[error("failed to encode value for '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to embed item #{index} ('{key}'): {source}")]
    EmbedItem {
        /// 1-based position of the failing item in the batch.
        index: usize,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("'{0}' is a reserved HAL key and cannot be used as an extra field")]
    ReservedKey(String),

    #[error("extras must encode to a JSON object, got {found}")]
    NotAnObject { found: &'static str },
}

impl HalError {
    /// True when a value could not be turned into JSON.
    #[must_use]
    pub fn is_encode(&self) -> bool {
        matches!(
            self,
            Self::Encode { .. } | Self::EmbedItem { .. } | Self::NotAnObject { .. }
        )
    }

    /// True when JSON could not be read into the requested shape.
    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::Parse(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_error() -> serde_json::Error {
        serde_json::from_str::<u32>("\"nope\"").unwrap_err()
    }

    #[test]
    fn errors_display_human_readable_messages() {
        let err = HalError::EmbedItem {
            index: 2,
            key: "foos".to_string(),
            source: json_error(),
        };
        let msg = err.to_string();
        assert!(msg.contains("#2"));
        assert!(msg.contains("foos"));

        let err = HalError::ReservedKey("_links".to_string());
        assert!(err.to_string().contains("_links"));
    }

    #[test]
    fn errors_classify_into_encode_and_decode() {
        let encode = HalError::Encode {
            key: "foo".to_string(),
            source: json_error(),
        };
        assert!(encode.is_encode());
        assert!(!encode.is_decode());

        let decode = HalError::Decode {
            key: "foo".to_string(),
            source: json_error(),
        };
        assert!(decode.is_decode());
        assert!(!decode.is_encode());

        assert!(HalError::Parse(json_error()).is_decode());
        assert!(!HalError::ReservedKey("_embedded".to_string()).is_decode());
    }
}
