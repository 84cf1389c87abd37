use crate::ingest::{IngestService, SessionRegistry};
use crate::rtc::NegotiationEngine;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_JWT_SECRET: &str = "dev-secret-change-in-production";

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `development` or `production`; selects log format and verbosity
    pub env: String,
    pub bind_address: String,
    pub jwt_secret: String,
    pub rtc: RtcConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RtcConfig {
    /// ICE UDP mux port
    pub udp_port: u16,
    /// Reliable fallback port
    pub tcp_port: u16,
    pub stun_servers: Vec<String>,
    /// Addresses advertised in host candidates instead of the local ones
    pub public_ips: Vec<String>,
    /// Per-viewer packet backlog before the oldest packets are dropped
    pub viewer_queue_depth: usize,
    /// Upper bound on the playback wait for candidate gathering.
    /// Unset means wait for as long as the transport takes.
    pub gathering_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env: "production".to_string(),
            bind_address: "0.0.0.0:8080".to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            rtc: RtcConfig::default(),
        }
    }
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self {
            udp_port: 50000,
            tcp_port: 3478,
            stun_servers: vec![],
            public_ips: vec![],
            viewer_queue_depth: 512,
            gathering_timeout_secs: None,
        }
    }
}

impl RtcConfig {
    pub fn gathering_timeout(&self) -> Option<Duration> {
        self.gathering_timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Defaults, then the config file, then `HYDRO__*` environment variables.
    /// The file is `$HYDRO_CONFIG` if set, otherwise `configs/hydro.*` when present.
    pub fn load() -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();

        builder = match std::env::var("HYDRO_CONFIG") {
            Ok(path) => builder.add_source(config::File::with_name(&path)),
            Err(_) => builder.add_source(config::File::with_name("configs/hydro").required(false)),
        };

        let config: Config = builder
            .add_source(
                config::Environment::with_prefix("HYDRO")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("rtc.stun_servers")
                    .with_list_parse_key("rtc.public_ips")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    pub fn has_default_jwt_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }

    pub fn is_development(&self) -> bool {
        self.env == "development"
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub ingest: IngestService,
}

impl AppState {
    pub fn new(config: Config, engine: Arc<dyn NegotiationEngine>) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let ingest = IngestService::new(engine, registry, &config.rtc);

        Self { config, ingest }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_listener_ports() {
        let config = Config::default();
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.rtc.udp_port, 50000);
        assert_eq!(config.rtc.tcp_port, 3478);
        assert!(config.rtc.stun_servers.is_empty());
        assert!(config.rtc.gathering_timeout().is_none());
        assert!(!config.is_development());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                "env = \"development\"\n[rtc]\nudp_port = 40000\ngathering_timeout_secs = 5\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!(config.is_development());
        assert_eq!(config.rtc.udp_port, 40000);
        assert_eq!(config.rtc.tcp_port, 3478);
        assert_eq!(config.rtc.viewer_queue_depth, 512);
        assert_eq!(config.rtc.gathering_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.bind_address, "0.0.0.0:8080");
    }
}
