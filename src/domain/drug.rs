//! Drug lookup records: RxClass classifications, openFDA label documents and
//! the combined payload returned to the browser.

use std::collections::BTreeSet;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// openFDA label field that absorbs [`ASK_DOCTOR_OR_PHARMACIST_FIELD`].
pub const ASK_DOCTOR_FIELD: &str = "ask_doctor";
pub const ASK_DOCTOR_OR_PHARMACIST_FIELD: &str = "ask_doctor_or_pharmacist";

/// RxClass relationship categories queried for every drug, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassCategory {
    ContraindicatedWith,
    ContraindicatedMechanism,
    ContraindicatedEffect,
    ContraindicatedChemClass,
    Effect,
    Mechanism,
    EstablishedClass,
    MayTreat,
}

impl ClassCategory {
    pub const ALL: [ClassCategory; 8] = [
        ClassCategory::ContraindicatedWith,
        ClassCategory::ContraindicatedMechanism,
        ClassCategory::ContraindicatedEffect,
        ClassCategory::ContraindicatedChemClass,
        ClassCategory::Effect,
        ClassCategory::Mechanism,
        ClassCategory::EstablishedClass,
        ClassCategory::MayTreat,
    ];

    /// Relationship code sent to RxClass as `relas`.
    pub fn code(self) -> &'static str {
        match self {
            ClassCategory::ContraindicatedWith => "ci_with",
            ClassCategory::ContraindicatedMechanism => "ci_moa",
            ClassCategory::ContraindicatedEffect => "ci_pe",
            ClassCategory::ContraindicatedChemClass => "ci_chemclass",
            ClassCategory::Effect => "has_pe",
            ClassCategory::Mechanism => "has_moa",
            ClassCategory::EstablishedClass => "has_epc",
            ClassCategory::MayTreat => "may_treat",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ClassCategory::ContraindicatedWith => "Contraindications",
            ClassCategory::ContraindicatedMechanism => "Contraindications (MoA)",
            ClassCategory::ContraindicatedEffect => "Contraindications (Effects)",
            ClassCategory::ContraindicatedChemClass => "Contraindications (Chem)",
            ClassCategory::Effect => "Effects",
            ClassCategory::Mechanism => "MoA",
            ClassCategory::EstablishedClass => "Drug Class",
            ClassCategory::MayTreat => "To Treat",
        }
    }
}

/// Class names keyed by category label.
///
/// Serialized as a JSON object whose key order is the insertion order, so the
/// on-disk cache and the browser both see the categories in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrugClasses {
    entries: Vec<(String, Vec<String>)>,
}

impl DrugClasses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the classes for `label`, keeping its original position.
    pub fn insert(&mut self, label: impl Into<String>, classes: Vec<String>) {
        let label = label.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == label) {
            Some((_, slot)) => *slot = classes,
            None => self.entries.push((label, classes)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == label)
            .map(|(_, classes)| classes.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(label, classes)| (label.as_str(), classes.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for DrugClasses {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, classes) in &self.entries {
            map.serialize_entry(label, classes)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DrugClasses {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ClassesVisitor;

        impl<'de> Visitor<'de> for ClassesVisitor {
            type Value = DrugClasses;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping category labels to class lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut classes = DrugClasses::new();
                while let Some((label, names)) = access.next_entry::<String, Vec<String>>()? {
                    classes.insert(label, names);
                }
                Ok(classes)
            }
        }

        deserializer.deserialize_map(ClassesVisitor)
    }
}

/// Result of querying RxClass for all eight relationship categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub drug_name: String,
    pub classes: DrugClasses,
}

impl ClassificationRecord {
    /// Build a record from per-category class sets. Categories are labelled and
    /// stored in the order they are yielded.
    pub fn from_category_sets<I>(drug_name: impl Into<String>, sets: I) -> Self
    where
        I: IntoIterator<Item = (ClassCategory, BTreeSet<String>)>,
    {
        let mut classes = DrugClasses::new();
        for (category, names) in sets {
            classes.insert(category.label(), names.into_iter().collect());
        }
        Self {
            drug_name: drug_name.into(),
            classes,
        }
    }
}

/// Raw openFDA label response. The shape belongs to openFDA; it is usually
/// `{ "meta": {...}, "results": [ { field: value, ... } ] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelRecord(Value);

impl LabelRecord {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// The first entry of `results`, when it is an object.
    pub fn first_result(&self) -> Option<&Map<String, Value>> {
        self.0.get("results")?.as_array()?.first()?.as_object()
    }

    fn first_result_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.0
            .get_mut("results")?
            .as_array_mut()?
            .first_mut()?
            .as_object_mut()
    }

    /// Fold `ask_doctor_or_pharmacist` into `ask_doctor` when the first result
    /// carries both. List values are comma-joined first; the two texts are
    /// joined with a single space. Returns whether a merge happened.
    pub fn merge_ask_doctor_fields(&mut self) -> bool {
        let Some(result) = self.first_result_mut() else {
            return false;
        };
        if !result.contains_key(ASK_DOCTOR_FIELD) {
            return false;
        }
        let Some(pharmacist) = result.remove(ASK_DOCTOR_OR_PHARMACIST_FIELD) else {
            return false;
        };
        let Some(doctor) = result.get_mut(ASK_DOCTOR_FIELD) else {
            return false;
        };

        let merged = format!("{} {}", field_text(doctor), field_text(&pharmacist));
        *doctor = Value::String(merged);
        true
    }
}

/// Flatten a label field to display text: arrays are comma-joined, strings
/// are taken verbatim, everything else uses its JSON form.
pub fn field_text(value: &Value) -> String {
    match value {
        Value::Array(items) => items.iter().map(scalar_text).collect::<Vec<_>>().join(", "),
        other => scalar_text(other),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Per-request union of both upstream records plus a decorative quote.
#[derive(Debug, Clone, Serialize)]
pub struct CombinedResult {
    pub drug_name: String,
    pub rxnav: ClassificationRecord,
    pub fda: LabelRecord,
    pub quote: String,
}
