use std::{env, path::PathBuf, str::FromStr};

use anyhow::{Context, Result};
use dotenvy::dotenv;

#[derive(Clone, Debug)]
pub struct Config {
    /// Absent only when running against the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_protected_per_min: u32,
    pub rate_wizard_per_min: u32,

    pub api_prefix: String,

    pub companies_file: PathBuf,
    pub output_dir: PathBuf,
    pub wizard_ttl_secs: u64,
    pub wizard_idle_secs: u64,
    pub pdf_converter_bin: String,
    pub upload_endpoint: Option<String>,
    pub upload_token: Option<String>,
    pub log_level: String,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

impl Config {
    /// Defaults for everything except the listen address and signing secret.
    pub fn new(server_addr: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Config {
            database_url: None,
            jwt_secret: jwt_secret.into(),
            server_addr: server_addr.into(),
            access_token_ttl: 900, // 15 min
            rate_login_per_min: 60,
            rate_protected_per_min: 1000,
            rate_wizard_per_min: 300,
            api_prefix: "/api".to_string(),
            companies_file: PathBuf::from("companies.json"),
            output_dir: PathBuf::from("generated_docs"),
            wizard_ttl_secs: 3600,
            wizard_idle_secs: 1800,
            pdf_converter_bin: "wkhtmltopdf".to_string(),
            upload_endpoint: None,
            upload_token: None,
            log_level: "debug".to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let defaults = Config::new(required("SERVER_ADDR")?, required("JWT_SECRET")?);

        Ok(Config {
            database_url: optional("DATABASE_URL"),
            access_token_ttl: parsed_or("ACCESS_TOKEN_TTL", defaults.access_token_ttl)?,
            rate_login_per_min: parsed_or("RATE_LOGIN_PER_MIN", defaults.rate_login_per_min)?,
            rate_protected_per_min: parsed_or(
                "RATE_PROTECTED_PER_MIN",
                defaults.rate_protected_per_min,
            )?,
            rate_wizard_per_min: parsed_or("RATE_WIZARD_PER_MIN", defaults.rate_wizard_per_min)?,
            api_prefix: optional("API_PREFIX").unwrap_or_else(|| defaults.api_prefix.clone()),
            companies_file: optional("COMPANIES_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| defaults.companies_file.clone()),
            output_dir: optional("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| defaults.output_dir.clone()),
            wizard_ttl_secs: parsed_or("WIZARD_TTL_SECS", defaults.wizard_ttl_secs)?,
            wizard_idle_secs: parsed_or("WIZARD_IDLE_SECS", defaults.wizard_idle_secs)?,
            pdf_converter_bin: optional("PDF_CONVERTER_BIN")
                .unwrap_or_else(|| defaults.pdf_converter_bin.clone()),
            upload_endpoint: optional("UPLOAD_ENDPOINT"),
            upload_token: optional("UPLOAD_TOKEN"),
            log_level: optional("LOG_LEVEL").unwrap_or_else(|| defaults.log_level.clone()),
            ..defaults
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::new("127.0.0.1:8080", "secret");
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.access_token_ttl, 900);
        assert_eq!(config.wizard_ttl_secs, 3600);
        assert_eq!(config.pdf_converter_bin, "wkhtmltopdf");
        assert!(config.upload_endpoint.is_none());
    }
}
