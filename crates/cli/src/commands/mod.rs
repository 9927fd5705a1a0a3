//! Subcommand implementations.

pub mod migrate;
pub mod seed;

use secrecy::SecretString;

/// Database URL from `BAGRIT_DATABASE_URL`, falling back to `DATABASE_URL`.
///
/// The error names the variable that should be set.
pub(crate) fn database_url() -> Result<SecretString, &'static str> {
    dotenvy::dotenv().ok();

    std::env::var("BAGRIT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| "BAGRIT_DATABASE_URL")
}
