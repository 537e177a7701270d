use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use envconfig::Envconfig;

/// Millisecond duration parsed from an environment variable, following the
/// `EnvMsDuration` newtype convention used for duration-shaped env config
/// elsewhere in this stack.
#[derive(Debug, Clone, Copy)]
pub struct EnvMsDuration(pub Duration);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEnvMsDurationError;

impl FromStr for EnvMsDuration {
    type Err = ParseEnvMsDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ms = s.parse::<u64>().map_err(|_| ParseEnvMsDurationError)?;
        Ok(EnvMsDuration(Duration::from_millis(ms)))
    }
}

/// Configuration for a [`crate::Lifecycle`].
///
/// Loadable from the environment via [`LifecycleConfig::init_from_env`]
/// (`LIFECYCLE_HOST`, `LIFECYCLE_PORT`, `LIFECYCLE_TIMEOUT_MS`,
/// `LIFECYCLE_GRACE_PERIOD_MS`), or built programmatically with
/// [`LifecycleConfig::default`] for embedding and tests, since the core
/// library must not force environment loading on every caller.
#[derive(Envconfig, Clone, Debug)]
pub struct LifecycleConfig {
    /// Bind host for the HTTP probe server.
    #[envconfig(from = "LIFECYCLE_HOST", default = "127.0.0.1")]
    pub host: String,

    /// Bind port for the HTTP probe server. `0` requests an ephemeral
    /// OS-assigned port, which tests rely on.
    #[envconfig(from = "LIFECYCLE_PORT", default = "9000")]
    pub port: u16,

    /// Absolute upper bound on the shutdown sequence before `terminate` is
    /// forced by the watchdog.
    #[envconfig(from = "LIFECYCLE_TIMEOUT_MS", default = "60000")]
    pub timeout: EnvMsDuration,

    /// Delay between `shutdown()` being requested and the state
    /// transitioning to `SHUTTING_DOWN` (`kubeProxyTimeout` upstream).
    #[envconfig(from = "LIFECYCLE_GRACE_PERIOD_MS", default = "5000")]
    pub grace_period: EnvMsDuration,
}

impl LifecycleConfig {
    /// Produces a `host:port` pair suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        LifecycleConfig {
            host: "127.0.0.1".to_string(),
            port: 9000,
            timeout: EnvMsDuration(Duration::from_millis(60_000)),
            grace_period: EnvMsDuration(Duration::from_millis(5_000)),
        }
    }
}

/// Whether the bind host resolves as a loopback address; used by tests to
/// sanity-check the default configuration without a DNS round trip.
pub fn is_loopback(host: &str) -> bool {
    IpAddr::from_str(host)
        .map(|addr| addr.is_loopback())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = LifecycleConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.timeout.0, Duration::from_millis(60_000));
        assert_eq!(config.grace_period.0, Duration::from_millis(5_000));
        assert!(is_loopback(&config.host));
    }

    #[test]
    fn init_from_env_picks_up_overrides() {
        // envconfig reads process env; scope this test to vars it owns and
        // restore them so it doesn't leak into other tests in the binary.
        std::env::set_var("LIFECYCLE_PORT", "0");
        std::env::set_var("LIFECYCLE_GRACE_PERIOD_MS", "0");

        let config = LifecycleConfig::init_from_env().expect("valid env config");
        assert_eq!(config.port, 0);
        assert_eq!(config.grace_period.0, Duration::from_millis(0));
        assert_eq!(config.timeout.0, Duration::from_millis(60_000));

        std::env::remove_var("LIFECYCLE_PORT");
        std::env::remove_var("LIFECYCLE_GRACE_PERIOD_MS");
    }
}
