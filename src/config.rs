use std::path::PathBuf;
use std::str::FromStr;

/// Server settings, read from `COURTSIDE_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub admin_token: Option<String>,
    pub max_connections: usize,
    pub compact_threshold: u64,
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 7878,
            data_dir: PathBuf::from("./data"),
            admin_token: None,
            max_connections: 256,
            compact_threshold: 1000,
            metrics_port: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Values that fail to parse keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            bind: lookup("COURTSIDE_BIND").unwrap_or(defaults.bind),
            port: parsed(&lookup, "COURTSIDE_PORT").unwrap_or(defaults.port),
            data_dir: lookup("COURTSIDE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            admin_token: lookup("COURTSIDE_ADMIN_TOKEN").filter(|t| !t.is_empty()),
            max_connections: parsed(&lookup, "COURTSIDE_MAX_CONNECTIONS")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_connections),
            compact_threshold: parsed(&lookup, "COURTSIDE_COMPACT_THRESHOLD")
                .unwrap_or(defaults.compact_threshold),
            metrics_port: parsed(&lookup, "COURTSIDE_METRICS_PORT"),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("courtside.wal")
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(Config::from_lookup(lookup(&[])), Config::default());
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = Config::from_lookup(lookup(&[
            ("COURTSIDE_BIND", "127.0.0.1"),
            ("COURTSIDE_PORT", "9000"),
            ("COURTSIDE_DATA_DIR", "/var/lib/courtside"),
            ("COURTSIDE_ADMIN_TOKEN", "tok"),
            ("COURTSIDE_MAX_CONNECTIONS", "8"),
            ("COURTSIDE_COMPACT_THRESHOLD", "50"),
            ("COURTSIDE_METRICS_PORT", "9100"),
        ]));
        assert_eq!(cfg.listen_addr(), "127.0.0.1:9000");
        assert_eq!(cfg.wal_path(), PathBuf::from("/var/lib/courtside/courtside.wal"));
        assert_eq!(cfg.admin_token.as_deref(), Some("tok"));
        assert_eq!(cfg.max_connections, 8);
        assert_eq!(cfg.compact_threshold, 50);
        assert_eq!(cfg.metrics_port, Some(9100));
    }

    #[test]
    fn unparseable_numbers_fall_back() {
        let cfg = Config::from_lookup(lookup(&[
            ("COURTSIDE_PORT", "http"),
            ("COURTSIDE_MAX_CONNECTIONS", "0"),
            ("COURTSIDE_METRICS_PORT", "-1"),
            ("COURTSIDE_ADMIN_TOKEN", ""),
        ]));
        assert_eq!(cfg.port, 7878);
        assert_eq!(cfg.max_connections, 256);
        assert_eq!(cfg.metrics_port, None);
        assert_eq!(cfg.admin_token, None);
    }
}
