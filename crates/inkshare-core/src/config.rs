//! Configuration loading and validation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level inkshare configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<GatewayConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub board: Option<BoardConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,

    /// Largest inbound WebSocket frame accepted, in bytes (default: 64 KiB).
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: None,
            max_frame_bytes: default_max_frame_bytes(),
            rate_limit: None,
        }
    }
}

fn default_port() -> u16 {
    3000
}

fn default_max_frame_bytes() -> usize {
    64 * 1024
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Max WebSocket connections per IP per minute (default: 10).
    #[serde(default = "default_max_connections_per_ip")]
    pub max_connections_per_ip: u32,
}

fn default_max_connections_per_ip() -> u32 {
    10
}

/// Limits and protocol switches for the shared board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Points kept per stroke; further `stroke:move` events are dropped.
    #[serde(default = "default_max_points_per_stroke")]
    pub max_points_per_stroke: usize,

    /// Operations kept in the log; further `stroke:start` events are refused.
    #[serde(default = "default_max_operations")]
    pub max_operations: usize,

    /// Undone operations kept for redo; the oldest is discarded first.
    #[serde(default = "default_max_redo_depth")]
    pub max_redo_depth: usize,

    /// Include the removed stroke id in `undo` broadcasts.
    #[serde(default)]
    pub announce_undo_id: bool,
}

fn default_max_points_per_stroke() -> usize {
    10_000
}

fn default_max_operations() -> usize {
    5_000
}

fn default_max_redo_depth() -> usize {
    500
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            max_points_per_stroke: default_max_points_per_stroke(),
            max_operations: default_max_operations(),
            max_redo_depth: default_max_redo_depth(),
            announce_undo_id: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "plain" (default) or "json".
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log level override (trace/debug/info/warn/error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Per-crate log level overrides (e.g. "inkshare_gateway=debug").
    #[serde(default)]
    pub filters: Vec<String>,

    /// Output target: "stderr" (default) or "stdout".
    #[serde(default = "default_log_output")]
    pub output: String,
}

fn default_log_format() -> String {
    "plain".into()
}

fn default_log_output() -> String {
    "stderr".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            level: None,
            filters: Vec::new(),
            output: default_log_output(),
        }
    }
}

/// Substitute `${ENV_VAR}` patterns in a string with their environment variable values.
fn substitute_env_vars(input: &str) -> String {
    static ENV_REF: std::sync::LazyLock<regex::Regex> = std::sync::LazyLock::new(|| {
        regex::Regex::new(r"\$\{([^}]+)\}").expect("static pattern is valid")
    });
    ENV_REF
        .replace_all(input, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

impl Config {
    /// Load config from a JSON5 file, substituting `${ENV_VAR}` references.
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Parse config text (JSON5).
    pub fn parse(raw: &str) -> crate::error::Result<Self> {
        let substituted = substitute_env_vars(raw);
        json5::from_str(&substituted)
            .map_err(|e| crate::error::InkshareError::Config(e.to_string()))
    }

    /// Default config file location.
    pub fn default_path() -> PathBuf {
        data_dir().join("config.json")
    }

    pub fn gateway_port(&self) -> u16 {
        self.gateway.as_ref().map(|g| g.port).unwrap_or_else(default_port)
    }

    pub fn gateway_bind(&self) -> String {
        self.gateway
            .as_ref()
            .and_then(|g| g.bind.clone())
            .unwrap_or_else(|| "0.0.0.0".to_string())
    }

    pub fn max_frame_bytes(&self) -> usize {
        self.gateway
            .as_ref()
            .map(|g| g.max_frame_bytes)
            .unwrap_or_else(default_max_frame_bytes)
    }

    /// Per-IP connection limit, if rate limiting is configured.
    pub fn max_connections_per_ip(&self) -> Option<u32> {
        self.gateway
            .as_ref()
            .and_then(|g| g.rate_limit.as_ref())
            .map(|rl| rl.max_connections_per_ip)
    }

    /// Apply command-line listen overrides on top of the file config.
    pub fn override_listen(&mut self, port: Option<u16>, bind: Option<String>) {
        if port.is_none() && bind.is_none() {
            return;
        }
        let gateway = self.gateway.get_or_insert_with(GatewayConfig::default);
        if let Some(port) = port {
            gateway.port = port;
        }
        if bind.is_some() {
            gateway.bind = bind;
        }
    }

    pub fn board(&self) -> BoardConfig {
        self.board.clone().unwrap_or_default()
    }

    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    /// Get a config value by dotted path (e.g. "gateway.port").
    pub fn get_path(&self, path: &str) -> Option<serde_json::Value> {
        let json = serde_json::to_value(self).ok()?;
        let mut current = &json;
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        Some(current.clone())
    }

    /// Validate config, returning (warnings, errors).
    pub fn validate(&self) -> (Vec<String>, Vec<String>) {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        if let Some(gw) = &self.gateway {
            if gw.port == 0 {
                errors.push("Gateway port cannot be 0".to_string());
            }
            if gw.max_frame_bytes == 0 {
                errors.push("gateway.max_frame_bytes cannot be 0".to_string());
            }
            if gw.rate_limit.as_ref().is_some_and(|rl| rl.max_connections_per_ip == 0) {
                errors.push("gateway.rate_limit.max_connections_per_ip cannot be 0".to_string());
            }
        }

        let board = self.board();
        if board.max_operations == 0 {
            errors.push("board.max_operations cannot be 0".to_string());
        }
        if board.max_points_per_stroke == 0 {
            errors.push("board.max_points_per_stroke cannot be 0".to_string());
        }
        if board.max_redo_depth == 0 {
            warnings.push("board.max_redo_depth is 0; redo will never succeed".to_string());
        }

        let logging = self.logging();
        if !matches!(logging.format.as_str(), "plain" | "json") {
            warnings.push(format!(
                "Unknown logging.format '{}', falling back to plain",
                logging.format
            ));
        }
        if !matches!(logging.output.as_str(), "stderr" | "stdout") {
            warnings.push(format!(
                "Unknown logging.output '{}', falling back to stderr",
                logging.output
            ));
        }

        (warnings, errors)
    }
}

/// Base directory for inkshare data: `~/.inkshare/`
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".inkshare")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_substitution() {
        // SAFETY: test-only, variable name is unique to this test
        unsafe { std::env::set_var("TEST_INK_PORT", "4100") };
        let input = r#"{"gateway": {"port": ${TEST_INK_PORT}}, "other": "plain"}"#;
        let result = substitute_env_vars(input);
        assert!(result.contains("4100"));
        assert!(result.contains("plain"));
        unsafe { std::env::remove_var("TEST_INK_PORT") };
    }

    #[test]
    fn test_env_var_missing() {
        let input = r#"{"key": "${NONEXISTENT_VAR_INK_TEST}"}"#;
        let result = substitute_env_vars(input);
        assert!(result.contains(r#""""#)); // empty string
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.gateway_port(), 3000);
        assert_eq!(config.gateway_bind(), "0.0.0.0");
        assert_eq!(config.max_connections_per_ip(), None);
        assert_eq!(config.board(), BoardConfig::default());
        assert!(!config.board().announce_undo_id);
    }

    #[test]
    fn test_parse_json5() {
        let config = Config::parse(
            r#"{
                // comments are fine
                gateway: { port: 8080, rate_limit: {} },
                board: { max_points_per_stroke: 50, announce_undo_id: true },
            }"#,
        )
        .unwrap();
        assert_eq!(config.gateway_port(), 8080);
        assert_eq!(config.max_connections_per_ip(), Some(10));
        let board = config.board();
        assert_eq!(board.max_points_per_stroke, 50);
        assert_eq!(board.max_operations, 5_000);
        assert!(board.announce_undo_id);
    }

    #[test]
    fn test_parse_error_is_config_error() {
        let err = Config::parse("{ gateway: ").unwrap_err();
        assert_eq!(err.code(), "config_error");
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.json")).unwrap();
        assert!(config.gateway.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ board: { max_redo_depth: 7 } }"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.board().max_redo_depth, 7);
    }

    #[test]
    fn test_logging_config_defaults() {
        let config: Config = json5::from_str(r#"{ "logging": {} }"#).unwrap();
        let logging = config.logging.expect("logging should be present");
        assert_eq!(logging.format, "plain");
        assert!(logging.level.is_none());
        assert_eq!(logging.output, "stderr");
        assert!(logging.filters.is_empty());
    }

    #[test]
    fn test_get_path() {
        let config = Config::parse(r#"{ gateway: { port: 9000 } }"#).unwrap();
        assert_eq!(config.get_path("gateway.port"), Some(serde_json::json!(9000)));
        assert_eq!(config.get_path("gateway.nope"), None);
    }

    #[test]
    fn test_validate() {
        let config = Config::parse(
            r#"{ gateway: { port: 0 }, board: { max_redo_depth: 0 }, logging: { format: "xml" } }"#,
        )
        .unwrap();
        let (warnings, errors) = config.validate();
        assert!(errors.iter().any(|e| e.contains("port")));
        assert!(warnings.iter().any(|w| w.contains("max_redo_depth")));
        assert!(warnings.iter().any(|w| w.contains("xml")));

        let (warnings, errors) = Config::default().validate();
        assert!(warnings.is_empty());
        assert!(errors.is_empty());
    }

    #[test]
    fn test_override_listen() {
        let mut config =
            Config::parse(r#"{ gateway: { port: 9000, max_frame_bytes: 1024 } }"#).unwrap();
        config.override_listen(Some(9100), Some("127.0.0.1".into()));
        assert_eq!(config.gateway_port(), 9100);
        assert_eq!(config.gateway_bind(), "127.0.0.1");
        assert_eq!(config.max_frame_bytes(), 1024);

        let mut config = Config::default();
        config.override_listen(None, None);
        assert!(config.gateway.is_none());
        config.override_listen(Some(4000), None);
        assert_eq!(config.gateway_port(), 4000);
        assert_eq!(config.gateway_bind(), "0.0.0.0");
    }
}
