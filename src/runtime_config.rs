// =============================================================================
// Runtime Configuration — feed settings with env overrides
// =============================================================================
//
// Every tunable of the feed lives here: upstream instrument, broadcast
// cadence, listen addresses and TLS material.  The core only sees these as
// opaque startup parameters.
//
// Values come from a JSON file, then `FEED_*` environment variables.  All
// fields carry `#[serde(default)]` so that adding new fields never breaks
// loading an older config file.
//
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::market_data::binance::interval_minutes;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbol() -> String {
    "BTCUSDT".to_string()
}

fn default_kline_interval() -> String {
    "1m".to_string()
}

fn default_lookback_minutes() -> u32 {
    60
}

fn default_broadcast_interval_ms() -> u64 {
    60_000
}

fn default_ws_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_tls_cert_path() -> String {
    "server-cert.pem".to_string()
}

fn default_tls_key_path() -> String {
    "server-key.pem".to_string()
}

fn default_http_bind_addr() -> String {
    "127.0.0.1:3001".to_string()
}

fn default_binance_base_url() -> String {
    "https://api.binance.com".to_string()
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level configuration for the indicator feed.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Upstream market data -----------------------------------------------

    /// Instrument whose candles are analysed.
    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Kline resolution requested from the exchange ("1m", "5m", "1h", ...).
    #[serde(default = "default_kline_interval")]
    pub kline_interval: String,

    /// Length of the trailing candle window, in minutes.
    #[serde(default = "default_lookback_minutes")]
    pub lookback_minutes: u32,

    /// Exchange REST base URL.
    #[serde(default = "default_binance_base_url")]
    pub binance_base_url: String,

    // --- Broadcast ----------------------------------------------------------

    /// Period of the unconditional publish timer, in milliseconds.
    #[serde(default = "default_broadcast_interval_ms")]
    pub broadcast_interval_ms: u64,

    // --- Transport ----------------------------------------------------------

    /// Listen address of the subscriber WebSocket server.
    #[serde(default = "default_ws_bind_addr")]
    pub ws_bind_addr: String,

    /// PEM certificate chain.  Empty together with `tls_key_path` to serve
    /// plain `ws://`.
    #[serde(default = "default_tls_cert_path")]
    pub tls_cert_path: String,

    /// PEM PKCS#8 private key.
    #[serde(default = "default_tls_key_path")]
    pub tls_key_path: String,

    /// Listen address of the HTTP status API.
    #[serde(default = "default_http_bind_addr")]
    pub http_bind_addr: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            kline_interval: default_kline_interval(),
            lookback_minutes: default_lookback_minutes(),
            binance_base_url: default_binance_base_url(),
            broadcast_interval_ms: default_broadcast_interval_ms(),
            ws_bind_addr: default_ws_bind_addr(),
            tls_cert_path: default_tls_cert_path(),
            tls_key_path: default_tls_key_path(),
            http_bind_addr: default_http_bind_addr(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read feed config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse feed config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbol = %config.symbol,
            interval_ms = config.broadcast_interval_ms,
            "feed config loaded"
        );

        Ok(config)
    }

    /// Apply `FEED_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string());

        if let Some(v) = get("FEED_SYMBOL").filter(|v| !v.is_empty()) {
            self.symbol = v.to_uppercase();
        }
        if let Some(v) = get("FEED_KLINE_INTERVAL").filter(|v| !v.is_empty()) {
            self.kline_interval = v;
        }
        if let Some(v) = get("FEED_LOOKBACK_MINUTES") {
            self.lookback_minutes = v
                .parse()
                .with_context(|| format!("FEED_LOOKBACK_MINUTES is not a number: {v}"))?;
        }
        if let Some(v) = get("FEED_BROADCAST_INTERVAL_MS") {
            self.broadcast_interval_ms = v
                .parse()
                .with_context(|| format!("FEED_BROADCAST_INTERVAL_MS is not a number: {v}"))?;
        }
        if let Some(v) = get("FEED_WS_BIND_ADDR") {
            self.ws_bind_addr = v;
        }
        if let Some(v) = get("FEED_TLS_CERT") {
            self.tls_cert_path = v;
        }
        if let Some(v) = get("FEED_TLS_KEY") {
            self.tls_key_path = v;
        }
        if let Some(v) = get("FEED_HTTP_BIND_ADDR") {
            self.http_bind_addr = v;
        }
        Ok(())
    }

    /// Reject settings the feed cannot run with.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.symbol.is_empty(), "symbol must not be empty");
        interval_minutes(&self.kline_interval).context("invalid kline_interval")?;
        anyhow::ensure!(self.lookback_minutes > 0, "lookback_minutes must be positive");
        anyhow::ensure!(
            self.broadcast_interval_ms > 0,
            "broadcast_interval_ms must be positive"
        );
        anyhow::ensure!(
            self.tls_cert_path.is_empty() == self.tls_key_path.is_empty(),
            "tls_cert_path and tls_key_path must be set together"
        );
        Ok(())
    }

    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.broadcast_interval_ms)
    }

    /// Certificate and key paths, or `None` when TLS is disabled.
    pub fn tls_paths(&self) -> Option<(&Path, &Path)> {
        if self.tls_cert_path.is_empty() {
            None
        } else {
            Some((Path::new(&self.tls_cert_path), Path::new(&self.tls_key_path)))
        }
    }

    pub fn http_enabled(&self) -> bool {
        !self.http_bind_addr.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn default_config_has_expected_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.symbol, "BTCUSDT");
        assert_eq!(cfg.kline_interval, "1m");
        assert_eq!(cfg.lookback_minutes, 60);
        assert_eq!(cfg.broadcast_interval(), Duration::from_secs(60));
        assert_eq!(cfg.ws_bind_addr, "0.0.0.0:3000");
        assert!(cfg.tls_paths().is_some());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, RuntimeConfig::default());
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "symbol": "ETHUSDT", "broadcast_interval_ms": 5000 }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.symbol, "ETHUSDT");
        assert_eq!(cfg.broadcast_interval_ms, 5000);
        assert_eq!(cfg.lookback_minutes, 60);
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = RuntimeConfig::default();
        cfg.apply_overrides(env(&[
            ("FEED_SYMBOL", " solusdt "),
            ("FEED_BROADCAST_INTERVAL_MS", "1500"),
            ("FEED_WS_BIND_ADDR", "127.0.0.1:9000"),
            ("FEED_TLS_CERT", ""),
            ("FEED_TLS_KEY", ""),
        ]))
        .unwrap();

        assert_eq!(cfg.symbol, "SOLUSDT");
        assert_eq!(cfg.broadcast_interval_ms, 1500);
        assert_eq!(cfg.ws_bind_addr, "127.0.0.1:9000");
        assert!(cfg.tls_paths().is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn bad_numeric_override_is_an_error() {
        let mut cfg = RuntimeConfig::default();
        let err = cfg
            .apply_overrides(env(&[("FEED_LOOKBACK_MINUTES", "an hour")]))
            .unwrap_err();
        assert!(err.to_string().contains("FEED_LOOKBACK_MINUTES"));
    }

    #[test]
    fn validate_rejects_bad_settings() {
        let mut cfg = RuntimeConfig::default();
        cfg.broadcast_interval_ms = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = RuntimeConfig::default();
        cfg.lookback_minutes = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = RuntimeConfig::default();
        cfg.kline_interval = "7x".into();
        assert!(cfg.validate().is_err());

        let mut cfg = RuntimeConfig::default();
        cfg.tls_key_path.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_missing_file_fails() {
        assert!(RuntimeConfig::load("/definitely/not/here.json").is_err());
    }
}
