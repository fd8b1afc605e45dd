use crate::config::types::{Config, CrawlerConfig, OutputConfig, SourceConfig, UserAgentConfig};
use crate::{ConfigError, ConfigResult};
use url::Url;

/// Upper bound on either retry budget
const MAX_RETRIES: u32 = 20;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_source_config(&config.source)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> ConfigResult<()> {
    if config.retries > MAX_RETRIES {
        return Err(ConfigError::Validation(format!(
            "retries must be <= {}, got {}",
            MAX_RETRIES, config.retries
        )));
    }

    if let Some(connection_retries) = config.connection_retries {
        if connection_retries > MAX_RETRIES {
            return Err(ConfigError::Validation(format!(
                "connection-retries must be <= {}, got {}",
                MAX_RETRIES, connection_retries
            )));
        }
    }

    if config.limit == Some(0) {
        return Err(ConfigError::Validation(
            "limit must be >= 1 when set".to_string(),
        ));
    }

    if config.progress_every < 1 {
        return Err(ConfigError::Validation(format!(
            "progress-every must be >= 1, got {}",
            config.progress_every
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    Ok(())
}

/// Validates the identity sent in the User-Agent header
fn validate_user_agent_config(config: &UserAgentConfig) -> ConfigResult<()> {
    let name = &config.crawler_name;
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ConfigError::Validation(format!(
            "crawler-name must be non-empty ASCII letters, digits and hyphens, got '{}'",
            name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler-version cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.contact_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid contact-url '{}': {}", config.contact_url, e))
    })?;

    validate_email(&config.contact_email)
}

/// Validates the upstream base URL
fn validate_source_config(config: &SourceConfig) -> ConfigResult<()> {
    let url = Url::parse(&config.base_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid base-url '{}': {}", config.base_url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    if config.csv_path.is_empty() {
        return Err(ConfigError::Validation(
            "csv-path cannot be empty".to_string(),
        ));
    }

    if matches!(config.log_file.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "log-file cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Checks for a `local@domain.tld` shape
fn validate_email(email: &str) -> ConfigResult<()> {
    let (local, domain) = email.split_once('@').ok_or_else(|| {
        ConfigError::Validation(format!("contact-email '{}' has no '@'", email))
    })?;

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid contact-email: '{}'",
            email
        )));
    }

    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid contact-email domain: '{}'",
            email
        )));
    }

    Ok(())
}
