//! Email service for verification and password reset links.
//!
//! Uses SMTP via lettre for delivery with Askama templates. Without SMTP
//! settings the API falls back to [`LogMailer`], which writes the link to
//! the log so local signups can still be completed.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;
use url::Url;

use bagrit_core::Email;

use crate::config::SmtpConfig;

#[derive(Template)]
#[template(path = "email/verify_email.html")]
struct VerifyEmailHtml<'a> {
    link: &'a str,
}

#[derive(Template)]
#[template(path = "email/verify_email.txt")]
struct VerifyEmailText<'a> {
    link: &'a str,
}

#[derive(Template)]
#[template(path = "email/reset_password.html")]
struct ResetPasswordHtml<'a> {
    link: &'a str,
}

#[derive(Template)]
#[template(path = "email/reset_password.txt")]
struct ResetPasswordText<'a> {
    link: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum MailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Link could not be built from the configured base URL.
    #[error("Invalid link: {0}")]
    Link(#[from] url::ParseError),
}

/// Delivers account emails.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send the "confirm your address" email.
    async fn send_verification(&self, to: &Email, link: &Url) -> Result<(), MailError>;

    /// Send the password reset email.
    async fn send_password_reset(&self, to: &Email, link: &Url) -> Result<(), MailError>;
}

/// `{public_url}/verify-email?token=...`
///
/// # Errors
///
/// Returns `MailError::Link` if `public_url` is not a valid base URL.
pub fn verification_link(public_url: &str, token: &str) -> Result<Url, MailError> {
    let mut url = Url::parse(&format!(
        "{}/verify-email",
        public_url.trim_end_matches('/')
    ))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}

/// `{frontend_url}/reset-password?token=...`
///
/// # Errors
///
/// Returns `MailError::Link` if `frontend_url` is not a valid base URL.
pub fn reset_link(frontend_url: &str, token: &str) -> Result<Url, MailError> {
    let mut url = Url::parse(&format!(
        "{}/reset-password",
        frontend_url.trim_end_matches('/')
    ))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}

/// SMTP-backed mailer.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// Create a new mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &SmtpConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
        })
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &Email,
        subject: &str,
        text_body: String,
        html_body: String,
    ) -> Result<(), MailError> {
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| MailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .as_str()
                .parse()
                .map_err(|_| MailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )?;

        self.transport.send(message).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_verification(&self, to: &Email, link: &Url) -> Result<(), MailError> {
        let link = link.as_str();
        let html = VerifyEmailHtml { link }.render()?;
        let text = VerifyEmailText { link }.render()?;
        self.send_multipart_email(to, "Verify your email", text, html)
            .await
    }

    async fn send_password_reset(&self, to: &Email, link: &Url) -> Result<(), MailError> {
        let link = link.as_str();
        let html = ResetPasswordHtml { link }.render()?;
        let text = ResetPasswordText { link }.render()?;
        self.send_multipart_email(to, "Reset your password", text, html)
            .await
    }
}

/// Mailer that only logs, for development without SMTP.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_verification(&self, to: &Email, link: &Url) -> Result<(), MailError> {
        tracing::info!(to = %to, link = %link, "SMTP not configured; verification email not sent");
        Ok(())
    }

    async fn send_password_reset(&self, to: &Email, link: &Url) -> Result<(), MailError> {
        tracing::info!(to = %to, link = %link, "SMTP not configured; reset email not sent");
        Ok(())
    }
}
