//! Core domain services: the download lifecycle reconciler and manager,
//! and the acquisition pipeline that drives them from monitored content.

pub mod acquisition;
pub mod manager;
pub mod reconciler;

pub use acquisition::{AcquisitionPipeline, AcquisitionRequest, TaskTracker};
pub use manager::DownloadManager;
pub use reconciler::Reconciler;
