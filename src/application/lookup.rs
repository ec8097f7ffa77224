//! Lookup orchestration: cache-checked classification and label fetches run
//! side by side and are joined into one combined record.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::task::JoinError;
use tracing::{info, warn};

use crate::application::quotes::QuoteSource;
use crate::application::sources::{ClassificationSource, LabelSource, SourceError};
use crate::cache::{CacheError, CacheKey, RecordStore};
use crate::domain::drug::{ClassificationRecord, CombinedResult, LabelRecord};
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("classification fetch failed: {0}")]
    Classification(#[source] SourceError),
    #[error("label fetch failed: {0}")]
    Label(#[source] SourceError),
    #[error("{dataset} data not found")]
    NotCached { dataset: &'static str },
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("lookup task aborted: {0}")]
    Task(#[from] JoinError),
}

/// Both cached halves of a lookup, as needed by the spreadsheet export.
#[derive(Debug, Clone)]
pub struct CachedLookup {
    pub classification: ClassificationRecord,
    pub label: LabelRecord,
}

#[derive(Clone)]
pub struct LookupService {
    classifications: Arc<dyn ClassificationSource>,
    labels: Arc<dyn LabelSource>,
    classification_store: Arc<RecordStore<ClassificationRecord>>,
    label_store: Arc<RecordStore<LabelRecord>>,
    quotes: Arc<dyn QuoteSource>,
}

impl LookupService {
    pub fn new(
        classifications: Arc<dyn ClassificationSource>,
        labels: Arc<dyn LabelSource>,
        classification_store: Arc<RecordStore<ClassificationRecord>>,
        label_store: Arc<RecordStore<LabelRecord>>,
        quotes: Arc<dyn QuoteSource>,
    ) -> Self {
        Self {
            classifications,
            labels,
            classification_store,
            label_store,
            quotes,
        }
    }

    pub fn quotes(&self) -> &dyn QuoteSource {
        self.quotes.as_ref()
    }

    /// Fetch (or reuse) both records for `drug_name` and combine them.
    ///
    /// The two fetches run as independent tasks; a dropped caller does not
    /// cancel them, so they still populate the cache. A classification
    /// failure is reported ahead of a label failure when both fail.
    pub async fn lookup(&self, drug_name: &str) -> Result<CombinedResult, LookupError> {
        let key = CacheKey::normalize(drug_name)?;
        let started = Instant::now();

        let classification = tokio::spawn({
            let service = self.clone();
            let key = key.clone();
            let name = drug_name.to_string();
            async move { service.classification(&key, &name).await }
        });
        let label = tokio::spawn({
            let service = self.clone();
            let key = key.clone();
            let name = drug_name.to_string();
            async move { service.label(&key, &name).await }
        });

        let (classification, label) = tokio::join!(classification, label);
        let outcome = classification
            .map_err(LookupError::from)
            .and_then(|result| result)
            .and_then(|rxnav| {
                label
                    .map_err(LookupError::from)
                    .and_then(|result| result)
                    .map(|fda| (rxnav, fda))
            });

        let (rxnav, mut fda) = match outcome {
            Ok(records) => records,
            Err(err) => {
                warn!(
                    target = "rxlens::lookup",
                    op = "lookup",
                    drug = drug_name,
                    cache_key = %key,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %err,
                    "lookup failed"
                );
                return Err(err);
            }
        };

        let merged = fda.merge_ask_doctor_fields();
        info!(
            target = "rxlens::lookup",
            op = "lookup",
            drug = drug_name,
            cache_key = %key,
            categories = rxnav.classes.len(),
            merged_ask_doctor = merged,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "lookup completed"
        );

        Ok(CombinedResult {
            drug_name: drug_name.to_string(),
            rxnav,
            fda,
            quote: self.quotes.pick().to_string(),
        })
    }

    /// Label record only, cache-checked. The body is returned as stored.
    ///
    /// Runs as its own task, like the fetches in [`Self::lookup`].
    pub async fn label_only(&self, drug_name: &str) -> Result<LabelRecord, LookupError> {
        let key = CacheKey::normalize(drug_name)?;
        let service = self.clone();
        let name = drug_name.to_string();
        tokio::spawn(async move { service.label(&key, &name).await }).await?
    }

    /// Both records from the cache without touching the network.
    pub async fn cached(&self, drug_name: &str) -> Result<CachedLookup, LookupError> {
        let key = CacheKey::normalize(drug_name)?;

        let classification = self
            .classification_store
            .peek(&key)
            .await?
            .ok_or(LookupError::NotCached { dataset: "RxNav" })?;
        let label = self
            .label_store
            .peek(&key)
            .await?
            .ok_or(LookupError::NotCached { dataset: "FDA" })?;

        Ok(CachedLookup {
            classification,
            label,
        })
    }

    async fn classification(
        &self,
        key: &CacheKey,
        drug_name: &str,
    ) -> Result<ClassificationRecord, LookupError> {
        self.classification_store
            .get_or_fetch(key, || async {
                self.classifications
                    .fetch_classes(drug_name)
                    .await
                    .map_err(LookupError::Classification)
            })
            .await
    }

    async fn label(&self, key: &CacheKey, drug_name: &str) -> Result<LabelRecord, LookupError> {
        self.label_store
            .get_or_fetch(key, || async {
                self.labels
                    .fetch_label(drug_name)
                    .await
                    .map_err(LookupError::Label)
            })
            .await
    }
}
