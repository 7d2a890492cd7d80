//! Storage adapter error types.

use std::path::PathBuf;

use udin2mqtt_domain::error::BridgeError;

/// Errors specific to the TOML store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize device {name}")]
    Serialize {
        name: String,
        #[source]
        source: toml::ser::Error,
    },

    #[error("failed to render configuration")]
    Render(#[source] toml::ser::Error),

    /// `device` exists in the file but is not a table.
    #[error("`{0}` is not a table")]
    NotATable(&'static str),
}

impl StoreError {
    /// Convert into a [`BridgeError::Storage`] for propagation across port
    /// boundaries.
    pub fn into_domain(self) -> BridgeError {
        BridgeError::Storage(Box::new(self))
    }
}

impl From<StoreError> for BridgeError {
    fn from(err: StoreError) -> Self {
        err.into_domain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_path_in_read_error() {
        let err = StoreError::Read {
            path: PathBuf::from("/etc/udin2mqtt.toml"),
            source: std::io::Error::other("denied"),
        };
        assert_eq!(err.to_string(), "failed to read /etc/udin2mqtt.toml");
    }

    #[test]
    fn should_convert_to_storage_error() {
        let err: BridgeError = StoreError::NotATable("device").into();
        assert!(matches!(err, BridgeError::Storage(_)));
    }
}
