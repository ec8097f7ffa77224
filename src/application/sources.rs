//! Seams to the upstream drug reference services.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::drug::{ClassificationRecord, LabelRecord};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{api} responded with status {status}")]
    Status { api: &'static str, status: u16 },
    #[error("{api} request failed: {message}")]
    Transport { api: &'static str, message: String },
    #[error("{api} returned a body that could not be decoded: {message}")]
    Json { api: &'static str, message: String },
}

/// Drug classification service (RxClass).
#[async_trait]
pub trait ClassificationSource: Send + Sync {
    /// Query every relationship category for `drug_name`. Any failed
    /// category query fails the whole fetch.
    async fn fetch_classes(&self, drug_name: &str) -> Result<ClassificationRecord, SourceError>;
}

/// Drug labeling service (openFDA).
#[async_trait]
pub trait LabelSource: Send + Sync {
    /// Fetch the first label whose brand name matches `drug_name`. The body
    /// is returned unmodified.
    async fn fetch_label(&self, drug_name: &str) -> Result<LabelRecord, SourceError>;
}
