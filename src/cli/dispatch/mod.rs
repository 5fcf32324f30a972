//! Command-line argument dispatch.
//!
//! Turns validated CLI matches into an [`Action`] carrying everything the
//! server needs, so nothing downstream reads `ArgMatches` or the environment.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{self, ARG_DSN, ARG_PORT, hydra, mail, ui};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = commands::required(matches, ARG_DSN)?;

    let hydra_opts = hydra::Options::parse(matches)?;
    let ui_opts = ui::Options::parse(matches)?;
    let mail_opts = mail::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        hydra_admin_url: hydra_opts.admin_url,
        hydra_timeout_seconds: hydra_opts.timeout_seconds,
        base_ui_path: ui_opts.base_ui_path,
        public_url: ui_opts.public_url,
        secret_key: ui_opts.secret_key,
        mail: mail_opts.relay,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [(&str, Option<&str>); 8] = [
        ("WHISPER_DSN", Some("postgres://whisper@localhost:5432/whisper")),
        ("WHISPER_HYDRA_ADMIN_URL", Some("http://hydra:4445")),
        ("WHISPER_SECRET_KEY", Some("s3cr3t")),
        ("WHISPER_PORT", None),
        ("WHISPER_BASE_UI_PATH", None),
        ("WHISPER_MAIL_HOST", None),
        ("WHISPER_MAIL_USER", None),
        ("WHISPER_MAIL_PASSWORD", None),
    ];

    #[test]
    fn builds_server_action_from_env() {
        temp_env::with_vars(VARS, || {
            let matches = commands::new().get_matches_from(vec!["whisper", "--base-ui-path", "/auth"]);
            let action = handler(&matches);
            assert!(action.is_ok());
            if let Ok(Action::Server(args)) = action {
                assert_eq!(args.port, 8080);
                assert_eq!(args.dsn, "postgres://whisper@localhost:5432/whisper");
                assert_eq!(args.hydra_admin_url, "http://hydra:4445");
                assert_eq!(args.hydra_timeout_seconds, 10);
                assert_eq!(args.base_ui_path, "/auth");
                assert!(args.mail.is_none());
            }
        });
    }

    #[test]
    fn dsn_required() {
        temp_env::with_vars(VARS, || {
            temp_env::with_var("WHISPER_DSN", Some(""), || {
                let matches = commands::new().get_matches_from(vec!["whisper"]);
                let result = handler(&matches);
                assert!(result.is_err());
                if let Err(err) = result {
                    assert!(err.to_string().contains("missing required argument: --dsn"));
                }
            });
        });
    }

    #[test]
    fn hydra_admin_url_required() {
        temp_env::with_vars(VARS, || {
            temp_env::with_var_unset("WHISPER_HYDRA_ADMIN_URL", || {
                let matches = commands::new().get_matches_from(vec!["whisper"]);
                let result = handler(&matches);
                assert!(result.is_err());
                if let Err(err) = result {
                    assert!(
                        err.to_string()
                            .contains("missing required argument: --hydra-admin-url")
                    );
                }
            });
        });
    }
}
