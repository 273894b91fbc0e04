//! Runtime configuration, loaded entirely from environment variables.
//!
//! No config file format is parsed here; the CLI only accepts a log-level
//! override. Everything else is read through `Config::from_env`.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::{CoreError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Empty/unset disables auth entirely (permissive mode, see DESIGN.md).
    pub api_key: Option<String>,
    pub movie_root: String,
    pub series_root: String,
    /// Name -> numeric id, the authoritative reverse-lookup table for the
    /// facade's quality profile introspection endpoint.
    pub quality_profiles: HashMap<String, i32>,
    pub bind_addr: String,
    pub downloader_base_url: String,
    pub indexer_base_url: String,
    pub reconciler_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = require_env("DATABASE_URL")?;
        let api_key = std::env::var("API_KEY")
            .ok()
            .filter(|key| !key.is_empty());
        let movie_root =
            std::env::var("MOVIE_ROOT").unwrap_or_else(|_| "/movies".to_string());
        let series_root =
            std::env::var("SERIES_ROOT").unwrap_or_else(|_| "/series".to_string());
        let quality_profiles = parse_quality_profiles(
            std::env::var("QUALITY_PROFILES").unwrap_or_default().as_str(),
        )?;
        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:7878".to_string());
        let downloader_base_url = std::env::var("DOWNLOADER_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());
        let indexer_base_url = std::env::var("INDEXER_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:9696".to_string());
        let reconciler_interval = std::env::var("RECONCILER_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(15));

        Ok(Self {
            database_url,
            api_key,
            movie_root,
            series_root,
            quality_profiles,
            bind_addr,
            downloader_base_url,
            indexer_base_url,
            reconciler_interval,
        })
    }

    /// Look up a quality profile id by name, the direction the catalog uses
    /// when translating a stored profile name into the external numeric id.
    pub fn quality_profile_id(&self, name: &str) -> Option<i32> {
        self.quality_profiles.get(name).copied()
    }

    /// Reverse lookup: numeric id to the name the catalog persists.
    pub fn quality_profile_name(&self, id: i32) -> Option<&str> {
        self.quality_profiles
            .iter()
            .find(|(_, v)| **v == id)
            .map(|(k, _)| k.as_str())
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| CoreError::Configuration {
        field: key.to_string(),
        message: "required environment variable not set".to_string(),
    })
}

/// Parses a `name=id,name=id` list into the profile map.
fn parse_quality_profiles(raw: &str) -> Result<HashMap<String, i32>> {
    let mut map = HashMap::new();
    if raw.trim().is_empty() {
        map.insert("HD-1080p".to_string(), 1);
        map.insert("SD".to_string(), 2);
        map.insert("Ultra-HD".to_string(), 3);
        return Ok(map);
    }
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (name, id) = entry.split_once('=').ok_or_else(|| CoreError::Configuration {
            field: "QUALITY_PROFILES".to_string(),
            message: format!("malformed entry: {entry}"),
        })?;
        let id: i32 = id.trim().parse().map_err(|_| CoreError::Configuration {
            field: "QUALITY_PROFILES".to_string(),
            message: format!("non-numeric id in entry: {entry}"),
        })?;
        map.insert(name.trim().to_string(), id);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_profiles_when_unset() {
        let profiles = parse_quality_profiles("").unwrap();
        assert_eq!(profiles.get("HD-1080p"), Some(&1));
    }

    #[test]
    fn parses_explicit_profiles() {
        let profiles = parse_quality_profiles("HD-1080p=1, 4K=7").unwrap();
        assert_eq!(profiles.get("HD-1080p"), Some(&1));
        assert_eq!(profiles.get("4K"), Some(&7));
    }

    #[test]
    fn rejects_malformed_entry() {
        assert!(parse_quality_profiles("oops").is_err());
    }
}
