use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Detector URL is an http(s) URL
/// - Detector timeout is not 0
/// - Enrollment size limit is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let url = config.detector.url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::ValidationError(format!(
            "detector.url must start with http:// or https://, got {:?}",
            url
        )));
    }

    if config.detector.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "detector.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.enrollment.max_file_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "enrollment.max_file_bytes cannot be 0".to_string(),
        ));
    }

    Ok(())
}
