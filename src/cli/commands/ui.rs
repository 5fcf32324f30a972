use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

use super::{non_empty, required};

pub const ARG_BASE_UI_PATH: &str = "base-ui-path";
pub const ARG_PUBLIC_URL: &str = "public-url";
pub const ARG_SECRET_KEY: &str = "secret-key";

#[derive(Debug, Clone)]
pub struct Options {
    pub base_ui_path: String,
    pub public_url: String,
    pub secret_key: SecretString,
}

impl Options {
    /// Parse page and link arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the secret key is missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        Ok(Self {
            base_ui_path: non_empty(matches, ARG_BASE_UI_PATH).unwrap_or_else(|| "/ui".to_string()),
            public_url: non_empty(matches, ARG_PUBLIC_URL)
                .unwrap_or_else(|| "http://localhost:8080".to_string()),
            secret_key: SecretString::from(required(matches, ARG_SECRET_KEY)?),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BASE_UI_PATH)
                .long(ARG_BASE_UI_PATH)
                .help("URL prefix of the login, consent and confirmation pages")
                .default_value("/ui")
                .env("WHISPER_BASE_UI_PATH"),
        )
        .arg(
            Arg::new(ARG_PUBLIC_URL)
                .long(ARG_PUBLIC_URL)
                .help("Public base URL used in email links")
                .default_value("http://localhost:8080")
                .env("WHISPER_PUBLIC_URL"),
        )
        .arg(
            Arg::new(ARG_SECRET_KEY)
                .long(ARG_SECRET_KEY)
                .help("Key used to sign email confirmation links")
                .env("WHISPER_SECRET_KEY")
                .hide_env_values(true),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn defaults_and_secret() {
        temp_env::with_vars(
            [
                ("WHISPER_BASE_UI_PATH", None::<&str>),
                ("WHISPER_PUBLIC_URL", None::<&str>),
                ("WHISPER_SECRET_KEY", Some("s3cr3t")),
            ],
            || {
                let matches = with_args(Command::new("test")).get_matches_from(vec!["test"]);
                let options = Options::parse(&matches);
                assert!(options.is_ok());
                if let Ok(options) = options {
                    assert_eq!(options.base_ui_path, "/ui");
                    assert_eq!(options.public_url, "http://localhost:8080");
                    assert_eq!(options.secret_key.expose_secret(), "s3cr3t");
                    assert!(!format!("{options:?}").contains("s3cr3t"));
                }
            },
        );
    }

    #[test]
    fn secret_key_required() {
        temp_env::with_var("WHISPER_SECRET_KEY", None::<&str>, || {
            let matches = with_args(Command::new("test")).get_matches_from(vec!["test"]);
            let result = Options::parse(&matches).map_err(|e| e.to_string());
            assert_eq!(
                result.err(),
                Some("missing required argument: --secret-key".to_string())
            );
        });
    }
}
