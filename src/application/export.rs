//! Spreadsheet export of a cached lookup.

use rust_xlsxwriter::{Workbook, XlsxError};
use thiserror::Error;
use tracing::{info, warn};

use crate::application::lookup::{LookupError, LookupService};
use crate::domain::drug::{ClassCategory, ClassificationRecord, LabelRecord, field_text};

pub const CLASSIFICATION_SHEET: &str = "RxNav Data";
pub const LABEL_SHEET: &str = "FDA Data";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

// Excel rejects longer cell strings.
const MAX_CELL_CHARS: usize = 32_767;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("failed to build workbook: {0}")]
    Workbook(#[from] XlsxError),
}

/// A rendered workbook ready to be sent as a download or written to disk.
#[derive(Debug, Clone)]
pub struct Spreadsheet {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct ExportService {
    lookup: LookupService,
}

impl ExportService {
    pub fn new(lookup: LookupService) -> Self {
        Self { lookup }
    }

    /// Build the workbook for a drug that has already been looked up. Never
    /// fetches; a cache miss is [`LookupError::NotCached`].
    pub async fn export(&self, drug_name: &str) -> Result<Spreadsheet, ExportError> {
        let cached = self.lookup.cached(drug_name).await?;
        let bytes = build_workbook(&cached.classification, &cached.label)?;

        info!(
            target = "rxlens::export",
            op = "export",
            drug = drug_name,
            bytes = bytes.len(),
            "workbook generated"
        );

        Ok(Spreadsheet {
            filename: export_filename(drug_name),
            bytes,
        })
    }
}

/// One `[label, classes]` row per category, in display order. Labels the
/// record does not carry are skipped.
pub fn classification_rows(record: &ClassificationRecord) -> Vec<[String; 2]> {
    ClassCategory::ALL
        .iter()
        .filter_map(|category| {
            let label = category.label();
            record
                .classes
                .get(label)
                .map(|classes| [label.to_string(), classes.join(", ")])
        })
        .collect()
}

/// One `[field, value]` row per key of the first label result.
pub fn label_rows(record: &LabelRecord) -> Vec<[String; 2]> {
    record
        .first_result()
        .map(|result| {
            result
                .iter()
                .map(|(field, value)| [field.clone(), field_text(value)])
                .collect()
        })
        .unwrap_or_default()
}

pub fn build_workbook(
    classification: &ClassificationRecord,
    label: &LabelRecord,
) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    write_sheet(
        &mut workbook,
        CLASSIFICATION_SHEET,
        ["Category", "Classes"],
        &classification_rows(classification),
    )?;
    write_sheet(
        &mut workbook,
        LABEL_SHEET,
        ["Field", "Value"],
        &label_rows(label),
    )?;
    workbook.save_to_buffer()
}

/// Download name for a drug's workbook. Characters that would break a
/// `Content-Disposition` header are dropped.
pub fn export_filename(drug_name: &str) -> String {
    let stem: String = drug_name
        .trim()
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '"' | '\\' | '/'))
        .collect();
    format!("{stem}_drug_info.xlsx")
}

fn write_sheet(
    workbook: &mut Workbook,
    name: &str,
    header: [&str; 2],
    rows: &[[String; 2]],
) -> Result<(), XlsxError> {
    let sheet = workbook.add_worksheet();
    sheet.set_name(name)?;
    sheet.write_string(0, 0, header[0])?;
    sheet.write_string(0, 1, header[1])?;

    for (row, [first, second]) in (1u32..).zip(rows) {
        for (col, text) in [(0, first), (1, second)] {
            let cell = match truncate_cell(text) {
                Some(kept) => {
                    warn!(
                        target = "rxlens::export",
                        sheet = name,
                        field = %first,
                        column = col,
                        chars = text.chars().count(),
                        kept = MAX_CELL_CHARS,
                        "cell truncated"
                    );
                    kept
                }
                None => text.as_str(),
            };
            sheet.write_string(row, col, cell)?;
        }
    }
    Ok(())
}

/// The longest prefix Excel accepts, or `None` when the text already fits.
fn truncate_cell(text: &str) -> Option<&str> {
    text.char_indices()
        .nth(MAX_CELL_CHARS)
        .map(|(cut, _)| &text[..cut])
}
