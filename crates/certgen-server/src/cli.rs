//! Command-line interface definition.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::config::ConfigOverrides;

/// certgen - Generate participant certificates from a Canva template
#[derive(Debug, Parser)]
#[command(name = "certgen")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, short, env = "CERTGEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, conflicts_with = "debug")]
    pub json_logs: bool,

    /// Address to listen on
    #[arg(long, env = "CERTGEN_BIND")]
    pub bind: Option<SocketAddr>,

    /// Directory the participant spreadsheet is uploaded to
    #[arg(long, env = "CERTGEN_UPLOAD_DIR")]
    pub upload_dir: Option<PathBuf>,

    /// Directory holding the exported certificate images
    #[arg(long, env = "CERTGEN_CERTIFICATES_DIR")]
    pub certificates_dir: Option<PathBuf>,

    /// Canva OAuth client ID
    #[arg(long, env = "CANVA_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Canva OAuth client secret
    #[arg(long, env = "CANVA_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Key used to sign session cookies
    #[arg(long, env = "CERTGEN_SESSION_SECRET", hide_env_values = true)]
    pub session_secret: Option<String>,

    /// OAuth redirect URI registered with Canva
    #[arg(long, env = "CANVA_REDIRECT_URI")]
    pub redirect_uri: Option<String>,

    /// Timeout for outbound API requests, in seconds
    #[arg(long, env = "CERTGEN_HTTP_TIMEOUT")]
    pub timeout: Option<u64>,
}

impl Cli {
    /// Returns the configuration values set on the command line or through
    /// the environment.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bind: self.bind,
            upload_dir: self.upload_dir.clone(),
            certificates_dir: self.certificates_dir.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            session_secret: self.session_secret.clone(),
            redirect_uri: self.redirect_uri.clone(),
            timeout_secs: self.timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "certgen",
            "--bind",
            "0.0.0.0:8000",
            "--client-id",
            "abc",
            "--certificates-dir",
            "/tmp/certs",
            "--timeout",
            "15",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.bind, Some("0.0.0.0:8000".parse().unwrap()));
        assert_eq!(overrides.client_id.as_deref(), Some("abc"));
        assert_eq!(overrides.certificates_dir, Some(PathBuf::from("/tmp/certs")));
        assert_eq!(overrides.timeout_secs, Some(15));
    }

    #[test]
    fn debug_and_json_logs_conflict() {
        assert!(Cli::try_parse_from(["certgen", "--debug", "--json-logs"]).is_err());
    }

    #[test]
    fn invalid_bind_is_rejected() {
        assert!(Cli::try_parse_from(["certgen", "--bind", "not-an-address"]).is_err());
    }
}
