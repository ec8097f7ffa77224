use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::application::sources::{ClassificationSource, SourceError};
use crate::domain::drug::{ClassCategory, ClassificationRecord};

use super::{endpoint, get_json};

pub const RXCLASS_API: &str = "RxClass";
const BY_DRUG_NAME_PATH: &str = "REST/rxclass/class/byDrugName.json";

#[derive(Debug, Clone)]
pub struct RxClassClient {
    client: reqwest::Client,
    base: String,
}

#[derive(Debug, Deserialize)]
struct ByDrugNameResponse {
    #[serde(rename = "rxclassDrugInfoList")]
    drug_info_list: Option<DrugInfoList>,
}

#[derive(Debug, Deserialize)]
struct DrugInfoList {
    #[serde(rename = "rxclassDrugInfo", default)]
    drug_info: Vec<DrugInfo>,
}

#[derive(Debug, Deserialize)]
struct DrugInfo {
    #[serde(rename = "rxclassMinConceptItem")]
    concept: ConceptItem,
}

#[derive(Debug, Deserialize)]
struct ConceptItem {
    #[serde(rename = "className")]
    class_name: String,
}

impl RxClassClient {
    pub fn new(client: reqwest::Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into(),
        }
    }

    async fn classes_for(
        &self,
        drug_name: &str,
        category: ClassCategory,
    ) -> Result<BTreeSet<String>, SourceError> {
        let url = endpoint(
            RXCLASS_API,
            &self.base,
            BY_DRUG_NAME_PATH,
            &[
                ("drugName", drug_name),
                ("relaSource", "ALL"),
                ("relas", category.code()),
            ],
        )?;
        let response: ByDrugNameResponse = get_json(&self.client, RXCLASS_API, url).await?;

        Ok(response
            .drug_info_list
            .map(|list| {
                list.drug_info
                    .into_iter()
                    .map(|info| info.concept.class_name)
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl ClassificationSource for RxClassClient {
    async fn fetch_classes(&self, drug_name: &str) -> Result<ClassificationRecord, SourceError> {
        let mut sets = Vec::with_capacity(ClassCategory::ALL.len());
        for category in ClassCategory::ALL {
            let classes = self.classes_for(drug_name, category).await?;
            sets.push((category, classes));
        }

        let total: usize = sets.iter().map(|(_, classes)| classes.len()).sum();
        info!(
            target = "rxlens::upstream",
            api = RXCLASS_API,
            op = "fetch_classes",
            drug = drug_name,
            classes = total,
            "classification fetched"
        );

        Ok(ClassificationRecord::from_category_sets(drug_name, sets))
    }
}
