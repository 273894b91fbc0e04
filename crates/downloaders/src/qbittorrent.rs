//! qBittorrent client implementation of the `Downloader` capability.
//!
//! Handles authentication, torrent submission, and status polling against
//! qBittorrent's Web API. Generalized from a movie-only Radarr client: the
//! HTTP plumbing (session cookie auth, multipart torrent add, magnet-hash
//! extraction) is kept; the surface is narrowed to exactly the
//! `add`/`status`/`list`/`remove` methods the core's `Downloader` trait
//! names.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gatherarr_core::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use gatherarr_core::domain::capabilities::{ClientState, ClientStatus, Downloader};
use gatherarr_core::error::{CoreError, Result};
use gatherarr_core::retry::{retry_with_backoff, RetryConfig, RetryPolicy};
use reqwest::Client;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

const SERVICE: &str = "qbittorrent";

#[derive(Debug, Clone)]
pub struct QBittorrentConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout: u64,
}

impl Default for QBittorrentConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            username: "admin".to_string(),
            password: String::new(),
            timeout: 30,
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    authenticated: bool,
    last_auth_time: Option<std::time::Instant>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct TorrentInfo {
    pub hash: String,
    pub name: String,
    pub state: String,
    pub progress: f64,
    pub size: i64,
    pub completed: i64,
}

#[derive(Debug)]
pub struct QBittorrentClient {
    config: QBittorrentConfig,
    client: Client,
    base_url: Url,
    session_state: Arc<RwLock<SessionState>>,
    breaker: CircuitBreaker,
}

impl QBittorrentClient {
    pub fn new(config: QBittorrentConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| CoreError::ExternalServiceError {
            service: SERVICE.to_string(),
            error: format!("invalid base URL: {e}"),
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .cookie_store(true)
            .build()
            .map_err(|e| CoreError::ExternalServiceError {
                service: SERVICE.to_string(),
                error: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            config,
            client,
            base_url,
            session_state: Arc::new(RwLock::new(SessionState::default())),
            breaker: CircuitBreaker::new(CircuitBreakerConfig::new(SERVICE)),
        })
    }

    async fn needs_authentication(&self) -> bool {
        let state = self.session_state.read().await;
        match state.last_auth_time {
            Some(last_auth) if state.authenticated => {
                last_auth.elapsed() > Duration::from_secs(30 * 60)
            }
            _ => true,
        }
    }

    async fn ensure_authenticated(&self) -> Result<()> {
        if self.needs_authentication().await {
            self.login().await?;
        }
        Ok(())
    }

    async fn login(&self) -> Result<()> {
        let login_url = self.base_url.join("api/v2/auth/login").expect("static path");

        let mut form = HashMap::new();
        form.insert("username", &self.config.username);
        form.insert("password", &self.config.password);

        debug!("logging in to qBittorrent at {login_url}");

        let response = self
            .client
            .post(login_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| CoreError::NetworkError {
                service: SERVICE.to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(CoreError::ClientUnavailable {
                service: SERVICE.to_string(),
                message: format!("login failed with status {}", response.status()),
            });
        }

        let body = response.text().await.unwrap_or_default();
        if body.to_lowercase().contains("fail") {
            return Err(CoreError::ClientUnavailable {
                service: SERVICE.to_string(),
                message: "authentication failed - invalid credentials".to_string(),
            });
        }

        let mut state = self.session_state.write().await;
        state.authenticated = true;
        state.last_auth_time = Some(std::time::Instant::now());
        info!("qBittorrent session established");
        Ok(())
    }

    fn extract_hash_from_magnet(&self, magnet_url: &str) -> Option<String> {
        let start = magnet_url.find("xt=urn:btih:")? + "xt=urn:btih:".len();
        let rest = &magnet_url[start..];
        let hash = rest.split('&').next().unwrap_or(rest);
        Some(hash.to_uppercase())
    }

    async fn add_torrent(&self, url: &str, category: &str) -> Result<String> {
        retry_with_backoff(RetryConfig::slow(), RetryPolicy::Transient, "qbittorrent_add_torrent", || {
            self.breaker.call(self.add_torrent_once(url, category))
        })
        .await
    }

    async fn add_torrent_once(&self, url: &str, category: &str) -> Result<String> {
        self.ensure_authenticated().await?;

        let add_url = self.base_url.join("api/v2/torrents/add").expect("static path");
        let form = reqwest::multipart::Form::new()
            .text("urls", url.to_string())
            .text("category", category.to_string());

        debug!("adding torrent to qBittorrent category={category}");
        let response = self
            .client
            .post(add_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CoreError::NetworkError {
                service: SERVICE.to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(CoreError::ClientUnavailable {
                service: SERVICE.to_string(),
                message: format!("add torrent failed with status {}", response.status()),
            });
        }

        let body = response.text().await.unwrap_or_default();
        if !body.to_lowercase().contains("ok") && !body.is_empty() {
            return Err(CoreError::ExternalServiceError {
                service: SERVICE.to_string(),
                error: format!("failed to add torrent: {body}"),
            });
        }

        if url.starts_with("magnet:") {
            if let Some(hash) = self.extract_hash_from_magnet(url) {
                return Ok(hash);
            }
        }
        Ok(format!("{:x}", md5::compute(url.as_bytes())))
    }

    async fn get_torrents(&self) -> Result<Vec<TorrentInfo>> {
        retry_with_backoff(RetryConfig::quick(), RetryPolicy::Transient, "qbittorrent_get_torrents", || {
            self.breaker.call(self.get_torrents_once())
        })
        .await
    }

    async fn get_torrents_once(&self) -> Result<Vec<TorrentInfo>> {
        self.ensure_authenticated().await?;

        let torrents_url = self.base_url.join("api/v2/torrents/info").expect("static path");
        let response = self
            .client
            .get(torrents_url)
            .send()
            .await
            .map_err(|e| CoreError::NetworkError {
                service: SERVICE.to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(CoreError::ClientUnavailable {
                service: SERVICE.to_string(),
                message: format!("get torrents failed with status {}", response.status()),
            });
        }

        response.json().await.map_err(|e| CoreError::ExternalServiceError {
            service: SERVICE.to_string(),
            error: format!("failed to parse torrents response: {e}"),
        })
    }

    async fn delete_torrent(&self, hash: &str, delete_files: bool) -> Result<()> {
        retry_with_backoff(RetryConfig::slow(), RetryPolicy::Transient, "qbittorrent_delete_torrent", || {
            self.breaker.call(self.delete_torrent_once(hash, delete_files))
        })
        .await
    }

    async fn delete_torrent_once(&self, hash: &str, delete_files: bool) -> Result<()> {
        self.ensure_authenticated().await?;

        let delete_url = self.base_url.join("api/v2/torrents/delete").expect("static path");
        let mut form = HashMap::new();
        form.insert("hashes", hash);
        form.insert("deleteFiles", if delete_files { "true" } else { "false" });

        let response = self
            .client
            .post(delete_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| CoreError::NetworkError {
                service: SERVICE.to_string(),
                message: e.to_string(),
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CoreError::ClientUnavailable {
                service: SERVICE.to_string(),
                message: format!("delete torrent failed with status {}", response.status()),
            })
        }
    }
}

fn map_state(raw: &str) -> ClientState {
    match raw {
        "downloading" | "metaDL" | "stalledDL" | "forcedDL" | "allocating" => ClientState::Downloading,
        "uploading" | "stalledUP" | "forcedUP" | "queuedUP" | "pausedUP" => ClientState::Completed,
        "error" | "missingFiles" => ClientState::Failed,
        _ => ClientState::Queued,
    }
}

/// Races a future against cancellation, so outbound calls honor the
/// per-call context capability contracts expect.
async fn honoring_cancel<T>(
    cancel: &CancellationToken,
    fut: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        result = fut => result,
        _ = cancel.cancelled() => Err(CoreError::ClientUnavailable {
            service: SERVICE.to_string(),
            message: "cancelled".to_string(),
        }),
    }
}

#[async_trait]
impl Downloader for QBittorrentClient {
    async fn add(&self, cancel: &CancellationToken, url: &str, category: &str) -> Result<String> {
        honoring_cancel(cancel, self.add_torrent(url, category)).await
    }

    async fn status(&self, cancel: &CancellationToken, client_id: &str) -> Result<ClientStatus> {
        let torrents = honoring_cancel(cancel, self.get_torrents()).await?;
        let torrent = torrents
            .into_iter()
            .find(|t| t.hash.eq_ignore_ascii_case(client_id))
            .ok_or_else(|| CoreError::DownloadNotFound {
                client_id: client_id.to_string(),
            })?;

        Ok(ClientStatus {
            client_id: torrent.hash.clone(),
            state: map_state(&torrent.state),
            progress: torrent.progress as f32,
            path: if torrent.progress >= 1.0 {
                Some(torrent.name)
            } else {
                None
            },
            size: torrent.size,
            downloaded: torrent.completed,
        })
    }

    async fn list(&self, cancel: &CancellationToken) -> Result<Vec<ClientStatus>> {
        let torrents = honoring_cancel(cancel, self.get_torrents()).await?;
        Ok(torrents
            .into_iter()
            .map(|t| ClientStatus {
                client_id: t.hash,
                state: map_state(&t.state),
                progress: t.progress as f32,
                path: None,
                size: t.size,
                downloaded: t.completed,
            })
            .collect())
    }

    async fn remove(&self, cancel: &CancellationToken, client_id: &str, delete_files: bool) -> Result<()> {
        honoring_cancel(cancel, self.delete_torrent(client_id, delete_files)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_at_localhost() {
        let config = QBittorrentConfig::default();
        assert_eq!(config.base_url, "http://localhost:8080");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let config = QBittorrentConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(QBittorrentClient::new(config).is_err());
    }

    #[test]
    fn extracts_hash_from_magnet_link() {
        let client = QBittorrentClient::new(QBittorrentConfig::default()).unwrap();
        let magnet = "magnet:?xt=urn:btih:c12fe1c06bba254a9dc9f519b335aa7c1367a88a&dn=example";
        assert_eq!(
            client.extract_hash_from_magnet(magnet),
            Some("C12FE1C06BBA254A9DC9F519B335AA7C1367A88A".to_string())
        );
    }

    #[test]
    fn non_magnet_urls_have_no_extractable_hash() {
        let client = QBittorrentClient::new(QBittorrentConfig::default()).unwrap();
        assert_eq!(client.extract_hash_from_magnet("https://example.com/x.torrent"), None);
    }

    #[test]
    fn maps_qbittorrent_states_onto_the_client_state_enum() {
        assert_eq!(map_state("downloading"), ClientState::Downloading);
        assert_eq!(map_state("stalledUP"), ClientState::Completed);
        assert_eq!(map_state("error"), ClientState::Failed);
        assert_eq!(map_state("queuedDL"), ClientState::Queued);
    }
}
