use clap::{Arg, ArgMatches, Command};

use super::{non_empty, required};

pub const ARG_HYDRA_ADMIN_URL: &str = "hydra-admin-url";
pub const ARG_HYDRA_TIMEOUT_SECONDS: &str = "hydra-timeout-seconds";

#[derive(Debug, Clone)]
pub struct Options {
    pub admin_url: String,
    pub timeout_seconds: u64,
}

impl Options {
    /// Parse authorization server arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the admin URL is missing or the timeout is not a number.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let admin_url = required(matches, ARG_HYDRA_ADMIN_URL)?;
        let timeout_seconds = match non_empty(matches, ARG_HYDRA_TIMEOUT_SECONDS) {
            Some(value) => value.trim().parse::<u64>().map_err(|_| {
                anyhow::anyhow!("invalid value for --{ARG_HYDRA_TIMEOUT_SECONDS}: {value}")
            })?,
            None => 10,
        };

        Ok(Self {
            admin_url,
            timeout_seconds,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_HYDRA_ADMIN_URL)
                .long(ARG_HYDRA_ADMIN_URL)
                .help("Authorization server admin API URL, example: http://hydra:4445")
                .env("WHISPER_HYDRA_ADMIN_URL"),
        )
        .arg(
            Arg::new(ARG_HYDRA_TIMEOUT_SECONDS)
                .long(ARG_HYDRA_TIMEOUT_SECONDS)
                .help("Timeout in seconds for each authorization server call")
                .default_value("10")
                .env("WHISPER_HYDRA_TIMEOUT_SECONDS"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<Options> {
        let matches = with_args(Command::new("test")).get_matches_from(args);
        Options::parse(&matches)
    }

    #[test]
    fn admin_url_required() {
        temp_env::with_vars(
            [
                ("WHISPER_HYDRA_ADMIN_URL", Some("")),
                ("WHISPER_HYDRA_TIMEOUT_SECONDS", None::<&str>),
            ],
            || {
                let result = parse(&["test"]).map_err(|e| e.to_string());
                assert_eq!(
                    result.err(),
                    Some("missing required argument: --hydra-admin-url".to_string())
                );
            },
        );
    }

    #[test]
    fn reads_env() {
        temp_env::with_vars(
            [
                ("WHISPER_HYDRA_ADMIN_URL", Some("http://hydra:4445")),
                ("WHISPER_HYDRA_TIMEOUT_SECONDS", Some("3")),
            ],
            || {
                let options = parse(&["test"]);
                assert!(options.is_ok());
                if let Ok(options) = options {
                    assert_eq!(options.admin_url, "http://hydra:4445");
                    assert_eq!(options.timeout_seconds, 3);
                }
            },
        );
    }

    #[test]
    fn rejects_bad_timeout() {
        temp_env::with_vars(
            [
                ("WHISPER_HYDRA_ADMIN_URL", None::<&str>),
                ("WHISPER_HYDRA_TIMEOUT_SECONDS", None::<&str>),
            ],
            || {
                let result = parse(&[
                    "test",
                    "--hydra-admin-url",
                    "http://hydra:4445",
                    "--hydra-timeout-seconds",
                    "soon",
                ]);
                assert!(result.is_err());
            },
        );
    }
}
