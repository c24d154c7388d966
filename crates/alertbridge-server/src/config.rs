//! Command-line and environment configuration.

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use alertbridge_core::SessionConfig;
use clap::{ArgGroup, Parser};

/// Gateway from the alerting pipeline to a messaging session.
///
/// Every option can also be set through its environment variable.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about)]
#[command(group(
    ArgGroup::new("provider")
        .required(true)
        .args(["provider_command", "dev_memory_provider"])
))]
pub struct Args {
    /// Address the HTTP surface listens on
    #[arg(long, env = "ALERTBRIDGE_BIND", default_value = "127.0.0.1:7575")]
    pub bind: SocketAddr,

    /// Identifier of the stored messaging session
    #[arg(long, env = "ALERTBRIDGE_CLIENT_ID", default_value = "falta-registro-monitor")]
    pub client_id: String,

    /// Directory where the provider keeps session credentials
    #[arg(
        long,
        env = "ALERTBRIDGE_DATA_PATH",
        default_value = "./whatsapp_session_falta_registro"
    )]
    pub data_path: PathBuf,

    /// Seconds to wait after a disconnect before reconnecting
    #[arg(
        long,
        env = "ALERTBRIDGE_RECONNECT_DELAY_SECS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub reconnect_delay_secs: u64,

    /// Sidecar command that runs the messaging session (e.g. "node bridge.js")
    #[arg(long, env = "ALERTBRIDGE_PROVIDER_COMMAND")]
    pub provider_command: Option<String>,

    /// Use an in-process provider that is ready at once and delivers nothing.
    /// Local development only.
    #[arg(long, env = "ALERTBRIDGE_DEV_MEMORY_PROVIDER")]
    pub dev_memory_provider: bool,
}

impl Args {
    /// Session settings handed to the lifecycle manager.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.client_id.clone(), self.data_path.clone())
            .with_reconnect_delay(Duration::from_secs(self.reconnect_delay_secs))
    }
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::*;

    #[test]
    fn test_explicit_flags() {
        let args = Args::try_parse_from([
            "alertbridge",
            "--bind",
            "0.0.0.0:8080",
            "--client-id",
            "ops-monitor",
            "--data-path",
            "/var/lib/alertbridge",
            "--reconnect-delay-secs",
            "30",
            "--provider-command",
            "node bridge.js",
        ])
        .unwrap();

        assert_eq!(args.bind, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(args.provider_command.as_deref(), Some("node bridge.js"));
        assert!(!args.dev_memory_provider);

        let config = args.session_config();
        assert_eq!(config.client_id, "ops-monitor");
        assert_eq!(config.data_path, PathBuf::from("/var/lib/alertbridge"));
        assert_eq!(config.reconnect_delay, Duration::from_secs(30));
    }

    #[test]
    fn test_provider_must_be_chosen() {
        let err = Args::try_parse_from(["alertbridge"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_memory_provider_is_opt_in() {
        let args = Args::try_parse_from(["alertbridge", "--dev-memory-provider"]).unwrap();
        assert!(args.dev_memory_provider);
        assert!(args.provider_command.is_none());

        let err = Args::try_parse_from([
            "alertbridge",
            "--dev-memory-provider",
            "--provider-command",
            "node bridge.js",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_zero_reconnect_delay_rejected() {
        let result = Args::try_parse_from([
            "alertbridge",
            "--dev-memory-provider",
            "--reconnect-delay-secs",
            "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_bind_rejected() {
        let result = Args::try_parse_from([
            "alertbridge",
            "--dev-memory-provider",
            "--bind",
            "not-an-address",
        ]);
        assert!(result.is_err());
    }
}
