//! Downloader capability implementations.
//!
//! `gatherarr-core` depends only on the `Downloader` trait; this
//! crate supplies the concrete backends the facade wires up by
//! `DownloadClientKind`.

pub mod manual;
pub mod qbittorrent;

pub use manual::ManualDownloader;
pub use qbittorrent::{QBittorrentClient, QBittorrentConfig, TorrentInfo};
