//! HumanEvalPack loader.
//!
//! Fetches HumanEvalFix problems from the HuggingFace datasets server rows
//! API, one page at a time.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::Problem;
use crate::error::DatasetError;

/// Default dataset name on HuggingFace.
const DEFAULT_DATASET: &str = "bigcode/humanevalpack";

/// Dataset config holding the Python problems.
const DEFAULT_CONFIG: &str = "python";

/// Default split to fetch from the dataset.
const DEFAULT_SPLIT: &str = "test";

/// Base URL for HuggingFace datasets server rows API.
const HUGGINGFACE_ROWS_API: &str = "https://datasets-server.huggingface.co/rows";

/// Configuration for the HumanEvalPack loader.
#[derive(Debug, Clone)]
pub struct HumanEvalPackConfig {
    /// Delay between page requests in milliseconds.
    pub rate_limit_delay_ms: u64,
    /// Maximum rows per request. The rows API caps this at 100.
    pub max_page_size: usize,
    /// Maximum retry attempts when rate limited.
    pub max_retries: u32,
}

impl Default for HumanEvalPackConfig {
    fn default() -> Self {
        Self {
            rate_limit_delay_ms: 100,
            max_page_size: 100,
            max_retries: 3,
        }
    }
}

/// Loader for the HumanEvalPack dataset from HuggingFace.
///
/// # Example
///
/// ```ignore
/// use patchloop::dataset::HumanEvalPackLoader;
///
/// let loader = HumanEvalPackLoader::new()?;
/// let problems = loader.load(Some(20)).await?;
/// ```
pub struct HumanEvalPackLoader {
    http_client: Client,
    dataset_name: String,
    config_name: String,
    split: String,
    config: HumanEvalPackConfig,
}

impl HumanEvalPackLoader {
    /// Create a loader for the Python test split of `bigcode/humanevalpack`.
    pub fn new() -> Result<Self, DatasetError> {
        Self::with_dataset(DEFAULT_DATASET, DEFAULT_CONFIG, DEFAULT_SPLIT)
    }

    /// Create a loader for a specific dataset, config and split.
    pub fn with_dataset(
        dataset_name: impl Into<String>,
        config_name: impl Into<String>,
        split: impl Into<String>,
    ) -> Result<Self, DatasetError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| DatasetError::HttpError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            dataset_name: dataset_name.into(),
            config_name: config_name.into(),
            split: split.into(),
            config: HumanEvalPackConfig::default(),
        })
    }

    /// Configure the loader with custom settings.
    pub fn with_config(mut self, config: HumanEvalPackConfig) -> Self {
        self.config = config;
        self
    }

    pub fn dataset_name(&self) -> &str {
        &self.dataset_name
    }

    pub fn split(&self) -> &str {
        &self.split
    }

    /// Loads problems in dataset order, stopping after `limit` when given.
    pub async fn load(&self, limit: Option<usize>) -> Result<Vec<Problem>, DatasetError> {
        let mut problems = Vec::new();
        let mut offset = 0;

        loop {
            let wanted = match limit {
                Some(limit) if problems.len() >= limit => break,
                Some(limit) => (limit - problems.len()).min(self.config.max_page_size),
                None => self.config.max_page_size,
            };

            if offset > 0 && self.config.rate_limit_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.rate_limit_delay_ms)).await;
            }

            let page = self.fetch_page_with_retry(offset, wanted).await?;
            let fetched = page.rows.len();
            for row in page.rows {
                problems.push(convert_row(row)?);
            }
            offset += fetched;

            debug!(
                dataset = %self.dataset_name,
                fetched,
                total = problems.len(),
                "Fetched dataset page"
            );

            let exhausted = page.num_rows_total.is_some_and(|total| offset >= total);
            if fetched == 0 || exhausted {
                break;
            }
        }

        info!(
            dataset = %self.dataset_name,
            split = %self.split,
            problems = problems.len(),
            "Loaded problems"
        );
        Ok(problems)
    }

    async fn fetch_page_with_retry(
        &self,
        offset: usize,
        length: usize,
    ) -> Result<HuggingFaceRowsResponse, DatasetError> {
        let mut attempt = 0;
        loop {
            match self.fetch_page(offset, length).await {
                Err(DatasetError::RateLimited { retry_after }) if attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = retry_after.unwrap_or(1 << attempt);
                    warn!(attempt, delay_secs = delay, "Rate limited by dataset server, retrying");
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                }
                other => return other,
            }
        }
    }

    async fn fetch_page(
        &self,
        offset: usize,
        length: usize,
    ) -> Result<HuggingFaceRowsResponse, DatasetError> {
        let url = format!(
            "{}?dataset={}&config={}&split={}&offset={}&length={}",
            HUGGINGFACE_ROWS_API, self.dataset_name, self.config_name, self.split, offset, length
        );

        let response = self
            .http_client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| DatasetError::HttpError(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok());
            return Err(DatasetError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DatasetError::HttpError(format!(
                "API returned status {}: {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| DatasetError::ParseError(format!("Failed to parse response: {}", e)))
    }
}

fn convert_row(row: HuggingFaceRow) -> Result<Problem, DatasetError> {
    serde_json::from_value(row.row).map_err(|e| DatasetError::InvalidRecord {
        line: row.row_idx,
        reason: e.to_string(),
    })
}

/// Response structure from HuggingFace rows API.
#[derive(Debug, Deserialize)]
struct HuggingFaceRowsResponse {
    rows: Vec<HuggingFaceRow>,
    /// Total number of rows in the split.
    num_rows_total: Option<usize>,
}

/// A single row from the HuggingFace dataset.
#[derive(Debug, Deserialize)]
struct HuggingFaceRow {
    row_idx: usize,
    row: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_creation() {
        let loader = HumanEvalPackLoader::new().unwrap();
        assert_eq!(loader.dataset_name(), DEFAULT_DATASET);
        assert_eq!(loader.split(), DEFAULT_SPLIT);
        assert_eq!(loader.config.max_page_size, 100);
    }

    #[test]
    fn test_loader_config() {
        let config = HumanEvalPackConfig {
            rate_limit_delay_ms: 0,
            max_page_size: 10,
            max_retries: 1,
        };
        let loader = HumanEvalPackLoader::with_dataset("custom/dataset", "js", "train")
            .unwrap()
            .with_config(config);
        assert_eq!(loader.dataset_name(), "custom/dataset");
        assert_eq!(loader.config_name, "js");
        assert_eq!(loader.config.max_page_size, 10);
    }

    #[test]
    fn test_parse_rows_response() {
        let body = r#"{
            "features": [],
            "rows": [
                {"row_idx": 0, "row": {
                    "task_id": "Python/0",
                    "prompt": "def has_close_elements(numbers, threshold):\n",
                    "declaration": "def has_close_elements(numbers, threshold):\n",
                    "canonical_solution": "    return True\n",
                    "buggy_solution": "    return False\n",
                    "bug_type": "value misuse",
                    "test": "def check(f):\n    assert f([], 0.5) is False\n",
                    "entry_point": "has_close_elements"
                }, "truncated_cells": []}
            ],
            "num_rows_total": 164,
            "num_rows_per_page": 100,
            "partial": false
        }"#;

        let response: HuggingFaceRowsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.num_rows_total, Some(164));

        let problem = convert_row(response.rows.into_iter().next().unwrap()).unwrap();
        assert_eq!(problem.task_id, "Python/0");
        assert_eq!(problem.buggy_solution, "    return False\n");
        assert!(problem.test.starts_with("def check"));
    }

    #[test]
    fn test_convert_row_missing_field() {
        let row = HuggingFaceRow {
            row_idx: 12,
            row: serde_json::json!({"task_id": "Python/12", "prompt": "p"}),
        };
        let err = convert_row(row).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidRecord { line: 12, .. }));
    }
}
