use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u16 = |var: &str, default: &str| -> Result<u16, ConfigError> {
        or_default(var, default)
            .parse::<u16>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("DROPMAIL_ENV", "development"))?;

    let bind_addr = parse_addr("DROPMAIL_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("DROPMAIL_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("DROPMAIL_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("DROPMAIL_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("DROPMAIL_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let s3_bucket = or_default("DROPMAIL_S3_BUCKET", "dropmail-campaigns");
    let s3_region = or_default("DROPMAIL_S3_REGION", "us-east-1");

    let smtp_host = or_default("DROPMAIL_SMTP_HOST", "email-smtp.us-east-1.amazonaws.com");
    let smtp_port = parse_u16("DROPMAIL_SMTP_PORT", "587")?;
    let smtp_username = optional("DROPMAIL_SMTP_USERNAME");
    let smtp_password = optional("DROPMAIL_SMTP_PASSWORD");
    let sender_email = or_default("DROPMAIL_SENDER_EMAIL", "info@rrinconline.com");
    let reply_to = or_default("DROPMAIL_REPLY_TO", "info@rrinconline.com");

    let llm_api_key = optional("DROPMAIL_LLM_API_KEY");
    let llm_base_url = or_default("DROPMAIL_LLM_BASE_URL", "https://api.openai.com/v1");
    let llm_model = or_default("DROPMAIL_LLM_MODEL", "gpt-4o");
    let llm_timeout_secs = parse_u64("DROPMAIL_LLM_TIMEOUT_SECS", "30")?;

    let emails_per_batch = parse_usize("DROPMAIL_EMAILS_PER_BATCH", "2000")?;
    if emails_per_batch == 0 {
        return Err(invalid(
            "DROPMAIL_EMAILS_PER_BATCH",
            "must be greater than zero".to_string(),
        ));
    }
    let emails_per_second = parse_u32("DROPMAIL_EMAILS_PER_SECOND", "14")?;
    if emails_per_second == 0 {
        return Err(invalid(
            "DROPMAIL_EMAILS_PER_SECOND",
            "must be greater than zero".to_string(),
        ));
    }
    let batch_timeout_secs = parse_u64("DROPMAIL_BATCH_TIMEOUT_SECS", "600")?;

    let product_base_url = or_default(
        "DROPMAIL_PRODUCT_BASE_URL",
        "https://www.rrinconline.com/products/",
    );
    let test_fallback_codes = parse_code_list(&or_default(
        "DROPMAIL_TEST_FALLBACK_CODES",
        "RAD,AKN,ALA,BAY,DUKE",
    ));

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        s3_bucket,
        s3_region,
        smtp_host,
        smtp_port,
        smtp_username,
        smtp_password,
        sender_email,
        reply_to,
        llm_api_key,
        llm_base_url,
        llm_model,
        llm_timeout_secs,
        emails_per_batch,
        emails_per_second,
        batch_timeout_secs,
        product_base_url,
        test_fallback_codes,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "DROPMAIL_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

/// Split a comma-separated list of institution codes, uppercasing each and
/// dropping blanks.
fn parse_code_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_uppercase)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
