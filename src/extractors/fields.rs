// src/extractors/fields.rs

use crate::extractors::record::ContractInformation;
use crate::extractors::tables::{direct_cells, element_text, next_cell, next_row};
use crate::extractors::text::normalize_str;
use crate::utils::error::{ExtractError, FieldError};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};

static LABEL_CELL_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td").expect("Failed to compile LABEL_CELL_SELECTOR"));

// Values on the detail form are rendered in bold.
static EMPHASIS_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("strong, b").expect("Failed to compile EMPHASIS_SELECTOR"));

/// Where a header value sits relative to its label cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    /// Emphasized text in the next `td` of the same row.
    NextCell,
    /// Emphasized text anywhere in the row after the label's row.
    NextRow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    ContractDescription,
    ContractNumber,
    Organization,
    Status,
    Dates,
    PrimeContractor,
}

impl HeaderField {
    pub const ALL: [HeaderField; 6] = [
        HeaderField::ContractDescription,
        HeaderField::ContractNumber,
        HeaderField::Organization,
        HeaderField::Status,
        HeaderField::Dates,
        HeaderField::PrimeContractor,
    ];

    pub fn key(self) -> &'static str {
        match self {
            HeaderField::ContractDescription => "contract_description",
            HeaderField::ContractNumber => "contract_number",
            HeaderField::Organization => "organization",
            HeaderField::Status => "status",
            HeaderField::Dates => "dates",
            HeaderField::PrimeContractor => "prime_contractor",
        }
    }

    /// Text the label cell must contain.
    pub fn label(self) -> &'static str {
        match self {
            HeaderField::ContractDescription => "Contract Description",
            // the organization has no label of its own; it is printed under the number
            HeaderField::ContractNumber | HeaderField::Organization => "Contract Number",
            HeaderField::Status => "Status",
            HeaderField::Dates => "Dates",
            HeaderField::PrimeContractor => "Prime Contractor",
        }
    }

    fn anchor(self) -> Anchor {
        match self {
            HeaderField::Organization => Anchor::NextRow,
            _ => Anchor::NextCell,
        }
    }
}

/// Extracts the six header fields. A missing field is logged and left empty;
/// only a form with no header data at all is an error.
pub fn extract_contract_info(scope: ElementRef) -> Result<ContractInformation, ExtractError> {
    let mut info = ContractInformation::default();
    let mut found = 0usize;

    for field in HeaderField::ALL {
        match lookup_field(scope, field) {
            Ok(value) => {
                tracing::trace!("{} = '{}'", field.key(), value);
                *info.field_mut(field) = value;
                found += 1;
            }
            Err(e) => {
                tracing::warn!("Error extracting {}: {}", field.key(), e);
                info.field_mut(field).clear();
            }
        }
    }

    if found == 0 {
        tracing::error!("None of the {} header fields could be located", HeaderField::ALL.len());
        return Err(ExtractError::NoUsableData);
    }
    tracing::debug!("Extracted {}/{} header fields", found, HeaderField::ALL.len());
    Ok(info)
}

/// Looks a single field up. Every label cell is tried in document order
/// (innermost cells only) and the first one that yields a value wins.
pub fn lookup_field(scope: ElementRef, field: HeaderField) -> Result<String, FieldError> {
    let label = field.label();
    let candidates = label_cells(scope, label);
    if candidates.is_empty() {
        return Err(FieldError::MissingLabel(label.to_string()));
    }

    let mut last_err = FieldError::MissingLabel(label.to_string());
    for cell in candidates {
        let result = match field.anchor() {
            Anchor::NextCell => value_in_next_cell(cell, label),
            Anchor::NextRow => value_in_next_row(cell, label),
        };
        match result {
            Ok(value) => return Ok(value),
            Err(e) => last_err = e,
        }
    }
    Err(last_err)
}

fn label_cells<'a>(scope: ElementRef<'a>, label: &str) -> Vec<ElementRef<'a>> {
    scope
        .select(&LABEL_CELL_SELECTOR)
        .filter(|cell| element_text(*cell).contains(label))
        .filter(|cell| {
            !cell
                .select(&LABEL_CELL_SELECTOR)
                .any(|inner| element_text(inner).contains(label))
        })
        .collect()
}

fn emphasized_text(cell: ElementRef, label: &str) -> Result<String, FieldError> {
    cell.select(&EMPHASIS_SELECTOR)
        .map(|strong| normalize_str(&element_text(strong)))
        .find(|text| !text.is_empty())
        .ok_or_else(|| FieldError::MissingEmphasis(label.to_string()))
}

fn value_in_next_cell(label_cell: ElementRef, label: &str) -> Result<String, FieldError> {
    let value_cell =
        next_cell(label_cell).ok_or_else(|| FieldError::MissingSibling(label.to_string()))?;
    emphasized_text(value_cell, label)
}

fn value_in_next_row(label_cell: ElementRef, label: &str) -> Result<String, FieldError> {
    let row = label_cell
        .parent()
        .and_then(ElementRef::wrap)
        .filter(|el| el.value().name() == "tr")
        .ok_or_else(|| FieldError::MissingNextRow(label.to_string()))?;
    let following = next_row(row).ok_or_else(|| FieldError::MissingNextRow(label.to_string()))?;
    direct_cells(following)
        .into_iter()
        .find_map(|cell| emphasized_text(cell, label).ok())
        .ok_or_else(|| FieldError::MissingEmphasis(label.to_string()))
}
