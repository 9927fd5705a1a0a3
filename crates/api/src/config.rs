//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BAGRIT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `FRONTEND_URL` - Public URL of the shop frontend (checkout redirects, reset links)
//! - `BAGRIT_TOKEN_SECRET` - Token signing secret (min 32 chars, high entropy)
//! - `STRIPE_SECRET_KEY` - Stripe API secret key
//! - `STRIPE_WEBHOOK_SECRET` - Stripe webhook endpoint signing secret
//!
//! ## Optional
//! - `BAGRIT_HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 5001)
//! - `BAGRIT_PUBLIC_URL` - Public URL of this API (default: `http://localhost:{PORT}`)
//! - `ALLOWED_ORIGINS` - Comma-separated CORS origins (default: `FRONTEND_URL,http://localhost:3000`)
//! - `STRIPE_CURRENCY` - Checkout currency (default: INR)
//! - `STRIPE_ALLOWED_COUNTRIES` - Comma-separated shipping countries (default: IN)
//! - `STRIPE_API_BASE` - Stripe API base URL (default: `https://api.stripe.com`)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM` -
//!   SMTP delivery, all or none (port default: 587)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use bagrit_core::CurrencyCode;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_SMTP_PORT: u16 = 587;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public URL of this API, used in verification links
    pub public_url: String,
    /// Public URL of the frontend, without trailing slash
    pub frontend_url: String,
    /// Origins allowed by CORS
    pub allowed_origins: Vec<String>,
    /// Secret for signing session, verification and reset tokens
    pub token_secret: SecretString,
    /// Stripe configuration
    pub stripe: StripeConfig,
    /// SMTP configuration; `None` logs outgoing mail instead
    pub smtp: Option<SmtpConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Stripe configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key used as bearer token
    pub secret_key: SecretString,
    /// Webhook endpoint signing secret (`whsec_...`)
    pub webhook_secret: SecretString,
    /// Currency for checkout line items
    pub currency: CurrencyCode,
    /// ISO country codes accepted for shipping
    pub allowed_countries: Vec<String>,
    /// API base URL, overridable for test doubles
    pub api_base: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("currency", &self.currency)
            .field("allowed_countries", &self.allowed_countries)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// SMTP delivery configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    /// Sender address, e.g. `Bagrit <no-reply@bagrit.shop>`
    pub from_address: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("BAGRIT_DATABASE_URL")?;
        let host = get_env_or_default("BAGRIT_HOST", "0.0.0.0")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("BAGRIT_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("PORT", "5001")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;

        let public_url = match get_optional_env("BAGRIT_PUBLIC_URL") {
            Some(url) => validate_base_url("BAGRIT_PUBLIC_URL", &url)?,
            None => format!("http://localhost:{port}"),
        };
        let frontend_url = validate_base_url("FRONTEND_URL", &get_required_env("FRONTEND_URL")?)?;
        let allowed_origins = get_optional_env("ALLOWED_ORIGINS").map_or_else(
            || vec![frontend_url.clone(), "http://localhost:3000".to_string()],
            |raw| parse_list(&raw),
        );

        let token_secret = get_validated_secret("BAGRIT_TOKEN_SECRET")?;
        validate_token_secret(&token_secret, "BAGRIT_TOKEN_SECRET")?;

        let stripe = StripeConfig::from_env()?;
        let smtp = SmtpConfig::from_parts(
            get_optional_env("SMTP_HOST"),
            get_optional_env("SMTP_PORT"),
            get_optional_env("SMTP_USERNAME"),
            get_optional_env("SMTP_PASSWORD"),
            get_optional_env("EMAIL_FROM"),
        )?;

        Ok(Self {
            database_url,
            host,
            port,
            public_url,
            frontend_url,
            allowed_origins,
            token_secret,
            stripe,
            smtp,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl StripeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let currency = get_env_or_default("STRIPE_CURRENCY", "INR")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("STRIPE_CURRENCY".to_string(), e.to_string()))?;

        let allowed_countries = parse_list(&get_env_or_default("STRIPE_ALLOWED_COUNTRIES", "IN"))
            .into_iter()
            .map(|c| c.to_ascii_uppercase())
            .collect::<Vec<_>>();
        if allowed_countries.is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "STRIPE_ALLOWED_COUNTRIES".to_string(),
                "at least one country code is required".to_string(),
            ));
        }

        Ok(Self {
            secret_key: get_required_secret("STRIPE_SECRET_KEY")?,
            webhook_secret: get_required_secret("STRIPE_WEBHOOK_SECRET")?,
            currency,
            allowed_countries,
            api_base: validate_base_url(
                "STRIPE_API_BASE",
                &get_env_or_default("STRIPE_API_BASE", "https://api.stripe.com"),
            )?,
        })
    }
}

impl SmtpConfig {
    /// Build SMTP settings from optional parts. Either every required part is
    /// present or none is.
    fn from_parts(
        host: Option<String>,
        port: Option<String>,
        username: Option<String>,
        password: Option<String>,
        from_address: Option<String>,
    ) -> Result<Option<Self>, ConfigError> {
        match (host, username, password, from_address) {
            (None, None, None, None) => Ok(None),
            (Some(host), Some(username), Some(password), Some(from_address)) => {
                let port = match port {
                    Some(raw) => raw.parse::<u16>().map_err(|e| {
                        ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string())
                    })?,
                    None => DEFAULT_SMTP_PORT,
                };
                Ok(Some(Self {
                    host,
                    port,
                    username,
                    password: SecretString::from(password),
                    from_address,
                }))
            }
            (host, username, password, from_address) => {
                let missing = [
                    ("SMTP_HOST", host.is_none()),
                    ("SMTP_USERNAME", username.is_none()),
                    ("SMTP_PASSWORD", password.is_none()),
                    ("EMAIL_FROM", from_address.is_none()),
                ]
                .into_iter()
                .find_map(|(key, absent)| absent.then_some(key))
                .unwrap_or("SMTP_HOST");
                Err(ConfigError::MissingEnvVar(missing.to_string()))
            }
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    if value.trim().is_empty() {
        return Err(ConfigError::MissingEnvVar(key.to_string()));
    }
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Split a comma-separated list, dropping blanks.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Check that a value is an absolute http(s) URL and strip any trailing slash.
fn validate_base_url(key: &str, raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(raw.trim().trim_end_matches('/').to_string())
}

/// Validate that a token secret meets minimum length requirements.
fn validate_token_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_TOKEN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_TOKEN_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_bounds() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_rejects_placeholders() {
        let err = validate_secret_strength("changeme-token-value", "BAGRIT_TOKEN_SECRET").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
        assert!(validate_secret_strength("your-token-here", "BAGRIT_TOKEN_SECRET").is_err());
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("abababababababababababababababab", "BAGRIT_TOKEN_SECRET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_token_secret_length() {
        let short = SecretString::from("kQ9#vR2!");
        assert!(validate_token_secret(&short, "BAGRIT_TOKEN_SECRET").is_err());

        let ok = SecretString::from("kQ9#vR2!mZ7@pL4$wX1^tN8&yB5*cD3%");
        assert!(validate_token_secret(&ok, "BAGRIT_TOKEN_SECRET").is_ok());
        assert!(validate_secret_strength(ok.expose_secret(), "BAGRIT_TOKEN_SECRET").is_ok());
    }

    #[test]
    fn test_parse_list_trims_and_drops_blanks() {
        assert_eq!(
            parse_list(" https://shop.in , ,http://localhost:3000,"),
            vec!["https://shop.in", "http://localhost:3000"]
        );
    }

    #[test]
    fn test_validate_base_url() {
        assert_eq!(
            validate_base_url("FRONTEND_URL", "https://shop.in/").unwrap(),
            "https://shop.in"
        );
        assert!(validate_base_url("FRONTEND_URL", "shop.in").is_err());
        assert!(validate_base_url("FRONTEND_URL", "ftp://shop.in").is_err());
    }

    #[test]
    fn test_smtp_all_or_none() {
        assert!(SmtpConfig::from_parts(None, None, None, None, None).unwrap().is_none());

        let full = SmtpConfig::from_parts(
            Some("smtp.mail.in".into()),
            None,
            Some("mailer".into()),
            Some("pw".into()),
            Some("Bagrit <no-reply@bagrit.shop>".into()),
        )
        .unwrap()
        .unwrap();
        assert_eq!(full.port, DEFAULT_SMTP_PORT);

        let partial = SmtpConfig::from_parts(Some("smtp.mail.in".into()), None, None, None, None);
        assert!(matches!(partial, Err(ConfigError::MissingEnvVar(key)) if key == "SMTP_USERNAME"));
    }

    #[test]
    fn test_socket_addr() {
        let config = test_config();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "0.0.0.0");
        assert_eq!(addr.port(), 5001);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = test_config();
        config.smtp = Some(SmtpConfig {
            host: "smtp.mail.in".into(),
            port: 587,
            username: "mailer".into(),
            password: SecretString::from("smtp_pw_value"),
            from_address: "no-reply@bagrit.shop".into(),
        });

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("smtp.mail.in"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sk_test_value"));
        assert!(!debug_output.contains("whsec_value"));
        assert!(!debug_output.contains("smtp_pw_value"));
    }

    fn test_config() -> ApiConfig {
        ApiConfig {
            database_url: SecretString::from("postgres://localhost/bagrit"),
            host: "0.0.0.0".parse().unwrap(),
            port: 5001,
            public_url: "http://localhost:5001".into(),
            frontend_url: "http://localhost:3000".into(),
            allowed_origins: vec!["http://localhost:3000".into()],
            token_secret: SecretString::from("kQ9#vR2!mZ7@pL4$wX1^tN8&yB5*cD3%"),
            stripe: StripeConfig {
                secret_key: SecretString::from("sk_test_value"),
                webhook_secret: SecretString::from("whsec_value"),
                currency: CurrencyCode::INR,
                allowed_countries: vec!["IN".into()],
                api_base: "https://api.stripe.com".into(),
            },
            smtp: None,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}
