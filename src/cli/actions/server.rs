use crate::{
    api::{
        self,
        email::{EmailSender, LogEmailSender, MailConfig, SmtpEmailSender},
        handlers::auth::LoginConfig,
    },
    cli::telemetry,
    hydra::HydraClient,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub hydra_admin_url: String,
    pub hydra_timeout_seconds: u64,
    pub base_ui_path: String,
    pub public_url: String,
    pub secret_key: SecretString,
    pub mail: Option<MailConfig>,
}

/// Pick the delivery backend; without a relay, mail is only logged.
///
/// # Errors
/// Returns an error if the relay configuration is unusable.
pub fn email_sender(mail: Option<&MailConfig>) -> Result<Arc<dyn EmailSender>> {
    match mail {
        Some(config) => {
            info!(host = config.host(), port = config.port(), "Using SMTP relay");
            Ok(Arc::new(
                SmtpEmailSender::new(config).context("Invalid mail relay configuration")?,
            ))
        }
        None => {
            warn!("No mail host configured, emails will only be logged");
            Ok(Arc::new(LogEmailSender))
        }
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let hydra = HydraClient::new(
        &args.hydra_admin_url,
        Duration::from_secs(args.hydra_timeout_seconds),
    )?;

    let mut login_config = LoginConfig::new(args.public_url, args.secret_key)
        .with_base_ui_path(&args.base_ui_path);
    if let Some(mail) = &args.mail {
        login_config = login_config.with_mail_sender(mail.sender().to_string());
    }

    let sender = email_sender(args.mail.as_ref())?;

    let result = api::new(args.port, args.dsn, hydra, login_config, sender).await;

    telemetry::shutdown_tracer();

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_sender_without_relay() {
        assert!(email_sender(None).is_ok());
    }

    #[test]
    fn smtp_sender_with_relay() {
        let config = MailConfig::new(
            "smtp.example.com".to_string(),
            587,
            "noreply@example.com".to_string(),
            SecretString::from("pw".to_string()),
        );
        assert!(email_sender(Some(&config)).is_ok());
    }
}
