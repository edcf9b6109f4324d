use super::{types::Config, ConfigError};
use crate::adapter::BitrateMode;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Scheduler admits at least one job and polls no faster than every 10 ms
/// - ABR/CBR bitrates and the sample rate are non-zero
/// - Output extension is set
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Scheduler validation
    if config.scheduler.max_concurrent_jobs == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.max_concurrent_jobs must be at least 1".to_string(),
        ));
    }
    if config.scheduler.poll_interval_ms < 10 {
        return Err(ConfigError::ValidationError(
            "scheduler.poll_interval_ms must be at least 10".to_string(),
        ));
    }

    // Pipeline validation
    let encoding = &config.pipeline.encoding;
    if encoding.method != BitrateMode::Vbr && encoding.value == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.encoding.value must be a bitrate in kbit/s for abr/cbr".to_string(),
        ));
    }
    if encoding.sample_rate == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.encoding.sample_rate cannot be 0".to_string(),
        ));
    }
    if config.pipeline.output_extension.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "pipeline.output_extension cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Mp3Encoding;

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_scheduler_limits() {
        let mut config = Config::default();
        config.scheduler.max_concurrent_jobs = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.scheduler.poll_interval_ms = 5;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_encoding() {
        let mut config = Config::default();
        config.pipeline.encoding = Mp3Encoding::cbr(0);
        assert!(validate_config(&config).is_err());

        // Out-of-range VBR quality is tolerated; it falls back to q 0.
        config.pipeline.encoding = Mp3Encoding::vbr(42);
        assert!(validate_config(&config).is_ok());

        config.pipeline.encoding = Mp3Encoding::vbr(2).with_sample_rate(0);
        assert!(validate_config(&config).is_err());
    }
}
