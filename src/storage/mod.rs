// src/storage/mod.rs
use crate::extractors::ContractRecord;
use crate::utils::error::StorageError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_RESULTS_FILE: &str = "contracts_data.json";
const UNMATCHED_FILE: &str = "mismatched_contracts_debug.json";

/// Reads the JSON list of contract numbers to scrape.
///
/// A missing file is created as an empty list so the user has something to
/// fill in; the call still fails so nothing is scraped.
pub fn load_input(path: &Path) -> Result<Vec<String>, StorageError> {
    if !path.exists() {
        tracing::error!("Input file not found: {}", path.display());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, "[]")?;
        tracing::info!("A new empty file was created at: {}", path.display());
        tracing::warn!("Please open this file and add your list of contract numbers before running the scraper.");
        return Err(StorageError::InputMissing(path.display().to_string()));
    }

    let content = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;
    let Value::Array(items) = value else {
        tracing::warn!(r#"Make sure your file contains a JSON list, e.g. ["e30645", "p36719"]"#);
        return Err(StorageError::InvalidInput(format!(
            "expected a JSON list in {}",
            path.display()
        )));
    };

    let numbers: Vec<String> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            // numeric contract numbers such as 1000144457
            Value::Number(n) => Some(n.to_string()),
            other => {
                tracing::warn!("Ignoring non-string input entry: {}", other);
                None
            }
        })
        .filter(|s| !s.is_empty())
        .collect();

    if numbers.is_empty() {
        tracing::warn!("The input file is empty. Please add contract numbers to scrape.");
        return Err(StorageError::InvalidInput(format!("no contract numbers in {}", path.display())));
    }
    Ok(numbers)
}

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn debug_dir(&self) -> PathBuf {
        self.base_dir.join("debug")
    }

    /// Merges `results` into `filename`: keys already in the file are kept,
    /// keys in `results` overwrite. Failed contracts are stored as `null`.
    pub fn save_results(
        &self,
        filename: &str,
        results: &BTreeMap<String, Option<ContractRecord>>,
    ) -> Result<Option<PathBuf>, StorageError> {
        if results.is_empty() {
            tracing::warn!("No new data found for saving!");
            return Ok(None);
        }

        let file_path = self.base_dir.join(filename);
        let mut merged = self.read_existing(&file_path);
        for (number, record) in results {
            merged.insert(number.clone(), serde_json::to_value(record)?);
        }

        let content = serde_json::to_string_pretty(&Value::Object(merged))?;
        fs::write(&file_path, content).map_err(StorageError::IoError)?;

        tracing::info!("Data saved successfully to '{}'", file_path.display());
        Ok(Some(file_path))
    }

    /// Writes the numbers the portal search did not return.
    pub fn save_unmatched(&self, unmatched: &[String]) -> Result<Option<PathBuf>, StorageError> {
        if unmatched.is_empty() {
            return Ok(None);
        }

        let file_path = self.base_dir.join(UNMATCHED_FILE);
        let report = serde_json::json!({
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "unmatched": unmatched,
        });
        fs::write(&file_path, serde_json::to_string_pretty(&report)?)?;

        tracing::info!("Saved {} unmatched contract numbers to {}", unmatched.len(), file_path.display());
        Ok(Some(file_path))
    }

    fn read_existing(&self, file_path: &Path) -> Map<String, Value> {
        let Ok(content) = fs::read_to_string(file_path) else {
            return Map::new();
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                tracing::warn!(
                    "{} exists but is not a valid JSON object. Starting with empty data.",
                    file_path.display()
                );
                Map::new()
            }
        }
    }
}
