use std::time::Duration;

use anyhow::{bail, Context};
use dcprism_core::repository::{DEFAULT_CACHE_TTL, MAX_CACHE_TTL};
use dcprism_core::types::DbId;

/// Log output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Worker configuration loaded from environment variables.
///
/// | Env Var                       | Default                  |
/// |-------------------------------|--------------------------|
/// | `DATABASE_URL`                | required                 |
/// | `FESTIVAL_IDS`                | all active festivals     |
/// | `NOMENCLATURE_CACHE_TTL_SECS` | `300`                    |
/// | `WRITE_NOMENCLATURES`         | `false`                  |
/// | `LOG_FORMAT`                  | `pretty` (or `json`)     |
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    /// Festivals to process. `None` means every active festival.
    pub festival_ids: Option<Vec<DbId>>,
    pub cache_ttl: Duration,
    /// Store generated nomenclatures on the movie rows.
    pub write_nomenclatures: bool,
    pub log_format: LogFormat,
}

impl WorkerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .context("DATABASE_URL must be set")?;

        let festival_ids = match lookup("FESTIVAL_IDS") {
            Some(raw) if !raw.trim().is_empty() => Some(parse_festival_ids(&raw)?),
            _ => None,
        };

        let cache_ttl = match lookup("NOMENCLATURE_CACHE_TTL_SECS") {
            Some(raw) => parse_cache_ttl(&raw)?,
            None => DEFAULT_CACHE_TTL,
        };

        let write_nomenclatures = match lookup("WRITE_NOMENCLATURES") {
            Some(raw) => parse_bool(&raw).context("WRITE_NOMENCLATURES must be a boolean")?,
            None => false,
        };

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            Some("json") => LogFormat::Json,
            Some("pretty") | Some("") | None => LogFormat::Pretty,
            Some(other) => bail!("LOG_FORMAT must be 'pretty' or 'json', got '{other}'"),
        };

        Ok(Self {
            database_url,
            festival_ids,
            cache_ttl,
            write_nomenclatures,
            log_format,
        })
    }
}

/// Parse a comma-separated list of festival ids. Empty entries are skipped.
pub fn parse_festival_ids(raw: &str) -> anyhow::Result<Vec<DbId>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<DbId>()
                .with_context(|| format!("Invalid festival id '{s}' in FESTIVAL_IDS"))
        })
        .collect()
}

/// Parse a cache TTL in seconds, rejecting values above [`MAX_CACHE_TTL`].
pub fn parse_cache_ttl(raw: &str) -> anyhow::Result<Duration> {
    let secs: u64 = raw
        .trim()
        .parse()
        .context("NOMENCLATURE_CACHE_TTL_SECS must be a valid u64")?;
    let ttl = Duration::from_secs(secs);
    if ttl > MAX_CACHE_TTL {
        bail!(
            "NOMENCLATURE_CACHE_TTL_SECS must be at most {}, got {secs}",
            MAX_CACHE_TTL.as_secs()
        );
    }
    Ok(ttl)
}

fn parse_bool(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("expected true/false, got '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<WorkerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[("DATABASE_URL", "postgres://localhost/dcprism")]).unwrap();
        assert_eq!(cfg.festival_ids, None);
        assert_eq!(cfg.cache_ttl, Duration::from_secs(300));
        assert!(!cfg.write_nomenclatures);
        assert_eq!(cfg.log_format, LogFormat::Pretty);
    }

    #[test]
    fn database_url_is_required() {
        assert!(config(&[]).is_err());
        assert!(config(&[("DATABASE_URL", " ")]).is_err());
    }

    #[test]
    fn reads_overrides() {
        let cfg = config(&[
            ("DATABASE_URL", "postgres://db"),
            ("FESTIVAL_IDS", "3, 1,,7"),
            ("NOMENCLATURE_CACHE_TTL_SECS", "60"),
            ("WRITE_NOMENCLATURES", "TRUE"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(cfg.festival_ids, Some(vec![3, 1, 7]));
        assert_eq!(cfg.cache_ttl, Duration::from_secs(60));
        assert!(cfg.write_nomenclatures);
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn blank_festival_ids_means_all() {
        let cfg = config(&[("DATABASE_URL", "postgres://db"), ("FESTIVAL_IDS", " ")]).unwrap();
        assert_eq!(cfg.festival_ids, None);
    }

    #[test]
    fn cache_ttl_is_bounded() {
        assert_eq!(parse_cache_ttl("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_cache_ttl(" 31536000 ").unwrap(), MAX_CACHE_TTL);
        assert!(parse_cache_ttl("31536001").is_err());
        assert!(config(&[
            ("DATABASE_URL", "x"),
            ("NOMENCLATURE_CACHE_TTL_SECS", "18446744073709551615"),
        ])
        .is_err());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse_festival_ids("1,abc").is_err());
        assert!(config(&[("DATABASE_URL", "x"), ("NOMENCLATURE_CACHE_TTL_SECS", "-1")]).is_err());
        assert!(config(&[("DATABASE_URL", "x"), ("WRITE_NOMENCLATURES", "maybe")]).is_err());
        assert!(config(&[("DATABASE_URL", "x"), ("LOG_FORMAT", "xml")]).is_err());
    }
}
