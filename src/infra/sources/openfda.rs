use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::application::sources::{LabelSource, SourceError};
use crate::domain::drug::LabelRecord;

use super::{endpoint, get_json};

pub const OPENFDA_API: &str = "openFDA";
const LABEL_PATH: &str = "drug/label.json";

#[derive(Debug, Clone)]
pub struct OpenFdaClient {
    client: reqwest::Client,
    base: String,
}

impl OpenFdaClient {
    pub fn new(client: reqwest::Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into(),
        }
    }
}

#[async_trait]
impl LabelSource for OpenFdaClient {
    async fn fetch_label(&self, drug_name: &str) -> Result<LabelRecord, SourceError> {
        let search = format!("openfda.brand_name:\"{drug_name}\"");
        let url = endpoint(
            OPENFDA_API,
            &self.base,
            LABEL_PATH,
            &[("search", search.as_str()), ("limit", "1")],
        )?;
        let body: Value = get_json(&self.client, OPENFDA_API, url).await?;

        let results = body
            .get("results")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        info!(
            target = "rxlens::upstream",
            api = OPENFDA_API,
            op = "fetch_label",
            drug = drug_name,
            results,
            "label fetched"
        );
        Ok(LabelRecord::new(body))
    }
}
