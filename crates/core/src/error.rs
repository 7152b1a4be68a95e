use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Update threshold must be non-zero")]
    ZeroThreshold,

    #[error("threshold > updaters: {threshold} > {updaters}")]
    UnreachableThreshold { threshold: usize, updaters: usize },

    #[error("Invalid address for {0}")]
    InvalidAddress(String),

    #[error("Zero address for {0}")]
    ZeroAddress(&'static str),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_zero_threshold() {
        assert_eq!(ConfigError::ZeroThreshold.to_string(), "Update threshold must be non-zero");
    }

    #[test]
    fn test_error_display_unreachable_threshold() {
        let err = ConfigError::UnreachableThreshold { threshold: 3, updaters: 2 };
        assert_eq!(err.to_string(), "threshold > updaters: 3 > 2");
    }

    #[test]
    fn test_error_display_invalid_address() {
        let err = ConfigError::InvalidAddress("admin".to_string());
        assert_eq!(err.to_string(), "Invalid address for admin");
    }

    #[test]
    fn test_error_display_zero_address() {
        assert_eq!(ConfigError::ZeroAddress("admin").to_string(), "Zero address for admin");
    }
}
