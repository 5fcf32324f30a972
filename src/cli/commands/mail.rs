use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

use super::{non_empty, required};
use crate::api::email::MailConfig;

pub const ARG_MAIL_HOST: &str = "mail-host";
pub const ARG_MAIL_PORT: &str = "mail-port";
pub const ARG_MAIL_IDENTITY: &str = "mail-identity";
pub const ARG_MAIL_USER: &str = "mail-user";
pub const ARG_MAIL_PASSWORD: &str = "mail-password";
pub const ARG_MAIL_SENDER: &str = "mail-sender";

/// Mail relay settings; `relay` is `None` when no host is configured.
#[derive(Debug, Clone)]
pub struct Options {
    pub relay: Option<MailConfig>,
}

impl Options {
    /// Parse mail relay arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a host is set without user and password, or the port is invalid.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let Some(host) = non_empty(matches, ARG_MAIL_HOST) else {
            return Ok(Self { relay: None });
        };

        let port = match non_empty(matches, ARG_MAIL_PORT) {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("invalid value for --{ARG_MAIL_PORT}: {value}"))?,
            None => 587,
        };
        let user = required(matches, ARG_MAIL_USER)?;
        let password = SecretString::from(required(matches, ARG_MAIL_PASSWORD)?);

        let relay = MailConfig::new(host, port, user, password)
            .with_identity(non_empty(matches, ARG_MAIL_IDENTITY))
            .with_sender(non_empty(matches, ARG_MAIL_SENDER));

        Ok(Self { relay: Some(relay) })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_MAIL_HOST)
                .long(ARG_MAIL_HOST)
                .help("SMTP relay host; when unset, emails are logged instead of sent")
                .env("WHISPER_MAIL_HOST"),
        )
        .arg(
            Arg::new(ARG_MAIL_PORT)
                .long(ARG_MAIL_PORT)
                .help("SMTP relay port")
                .default_value("587")
                .env("WHISPER_MAIL_PORT"),
        )
        .arg(
            Arg::new(ARG_MAIL_IDENTITY)
                .long(ARG_MAIL_IDENTITY)
                .help("SMTP PLAIN authorization identity")
                .env("WHISPER_MAIL_IDENTITY"),
        )
        .arg(
            Arg::new(ARG_MAIL_USER)
                .long(ARG_MAIL_USER)
                .help("SMTP username")
                .env("WHISPER_MAIL_USER"),
        )
        .arg(
            Arg::new(ARG_MAIL_PASSWORD)
                .long(ARG_MAIL_PASSWORD)
                .help("SMTP password")
                .env("WHISPER_MAIL_PASSWORD")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_MAIL_SENDER)
                .long(ARG_MAIL_SENDER)
                .help("Sender address for outgoing mail (default: --mail-user)")
                .env("WHISPER_MAIL_SENDER"),
        )
}
