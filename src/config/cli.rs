//! Command-line and environment options.

use std::path::PathBuf;

use clap::Parser;

use crate::config::schema::DaemonConfig;

#[derive(Debug, Parser)]
#[command(name = "socksd")]
#[command(about = "SOCKS5 proxy daemon", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "PROXY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Host to listen on
    #[arg(long, env = "PROXY_HOST")]
    pub host: Option<String>,

    /// Port to listen on (default 1080)
    #[arg(short, long, env = "PROXY_PORT", value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// IPv4/IPv6 address for SOCKS BIND listeners
    #[arg(long, env = "PROXY_BIND_IP")]
    pub bind_ip: Option<String>,

    /// Allow clients without authentication (yes, true, 1)
    #[arg(
        long,
        env = "PROXY_NOAUTH",
        value_parser = parse_flag,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub no_auth: Option<bool>,

    /// Username/password pairs: user:pass,user2:pass2
    #[arg(long, env = "PROXY_USERS", hide_env_values = true)]
    pub users: Option<String>,

    /// Address for the Prometheus metrics endpoint
    #[arg(long, env = "METRICS_LISTEN_ADDR")]
    pub metrics_addr: Option<String>,

    /// Log filter (e.g. info, debug, socksd=trace)
    #[arg(long, env = "PROXY_LOG")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Overlay every option that was given onto `config`.
    pub fn apply(&self, config: &mut DaemonConfig) {
        if let Some(host) = &self.host {
            config.listener.host = host.clone();
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(bind_ip) = self.bind_ip.as_deref().filter(|ip| !ip.is_empty()) {
            config.listener.bind_ip = Some(bind_ip.to_string());
        }
        if let Some(no_auth) = self.no_auth {
            config.auth.allow_no_auth = no_auth;
        }
        if let Some(users) = &self.users {
            config.auth.users = users.clone();
        }
        if let Some(addr) = self.metrics_addr.as_deref().filter(|addr| !addr.is_empty()) {
            config.observability.metrics_address = Some(addr.to_string());
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}

/// `yes`, `true` and `1` (any case) enable; anything else disables.
fn parse_flag(value: &str) -> Result<bool, String> {
    Ok(["yes", "true", "1"]
        .iter()
        .any(|accepted| value.eq_ignore_ascii_case(accepted)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_values() {
        for value in ["yes", "YES", "true", "True", "1"] {
            assert_eq!(parse_flag(value), Ok(true), "{value}");
        }
        for value in ["", "no", "0", "false", "on"] {
            assert_eq!(parse_flag(value), Ok(false), "{value}");
        }
    }

    #[test]
    fn bare_no_auth_flag() {
        let cli = Cli::try_parse_from(["socksd", "--no-auth"]).unwrap();
        assert_eq!(cli.no_auth, Some(true));
    }

    #[test]
    fn port_zero_rejected() {
        assert!(Cli::try_parse_from(["socksd", "--port", "0"]).is_err());
        assert!(Cli::try_parse_from(["socksd", "--port", "65536"]).is_err());
        assert_eq!(
            Cli::try_parse_from(["socksd", "--port", "65535"]).unwrap().port,
            Some(65535)
        );
    }

    #[test]
    fn apply_overrides() {
        let cli = Cli::try_parse_from([
            "socksd",
            "--host",
            "127.0.0.1",
            "--bind-ip",
            "192.0.2.1",
            "--users",
            "a:b",
            "--metrics-addr",
            "127.0.0.1:9100",
        ])
        .unwrap();

        let mut config = DaemonConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.listener.host, "127.0.0.1");
        assert_eq!(config.listener.port, 1080);
        assert_eq!(config.listener.bind_ip.as_deref(), Some("192.0.2.1"));
        assert_eq!(config.auth.users, "a:b");
        assert_eq!(
            config.observability.metrics_address.as_deref(),
            Some("127.0.0.1:9100")
        );
    }
}
