use std::env;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use trowel_core::datastore::SqliteDatastore;
use trowel_core::{Document, ProjectConfig};

use crate::error::CliError;

/// Environment variable overriding the database location
pub const ENV_DB_PATH: &str = "TROWEL_DB_PATH";
const DEFAULT_DB_FILE: &str = "trowel.db";

/// Configuration and datastore shared by every command
pub struct AppContext {
    pub config: ProjectConfig,
    pub datastore: SqliteDatastore,
}

impl AppContext {
    pub fn open(config_path: Option<PathBuf>, db_path: Option<PathBuf>) -> Result<Self, CliError> {
        let config = match ProjectConfig::resolve_path(config_path) {
            Some(path) => ProjectConfig::load(path)?,
            None => ProjectConfig::default(),
        };
        let db_path = resolve_db_path(db_path);
        tracing::debug!("Opening database at {}", db_path.display());
        let datastore = SqliteDatastore::open(&db_path, &config)?;
        Ok(Self { config, datastore })
    }
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os(ENV_DB_PATH).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE))
}

/// A single JSON value or an array of them
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

/// Parse one value or an array of values; empty input is an error
pub fn parse_items<T: DeserializeOwned>(raw: &str) -> Result<Vec<T>, CliError> {
    let items = serde_json::from_str::<OneOrMany<T>>(raw)?.into_vec();
    if items.is_empty() {
        return Err(CliError::EmptyInput);
    }
    Ok(items)
}

/// Read a file, or stdin when `source` is `-`
pub async fn read_input(source: &str) -> Result<String, CliError> {
    if source == "-" {
        let mut buffer = String::new();
        tokio::io::stdin().read_to_string(&mut buffer).await?;
        return Ok(buffer);
    }
    Ok(std::fs::read_to_string(Path::new(source))?)
}

pub fn normalize_document_id(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyDocumentId)
    } else {
        Ok(trimmed.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentListItem {
    pub id: String,
    pub identifier: String,
    pub category: String,
    pub revision: Option<String>,
    pub last_modified: i64,
    pub last_modified_iso: String,
    pub last_modified_by: String,
    pub conflicts: Vec<String>,
}

pub fn document_to_list_item(document: &Document) -> DocumentListItem {
    let last = document.last_modified();
    DocumentListItem {
        id: document.resource.id.to_string(),
        identifier: document.resource.identifier.clone(),
        category: document.resource.category.clone(),
        revision: document.revision.as_ref().map(ToString::to_string),
        last_modified: last.date,
        last_modified_iso: format_timestamp(last.date),
        last_modified_by: last.user.clone(),
        conflicts: document.conflicts.iter().map(ToString::to_string).collect(),
    }
}

pub fn format_document_lines(documents: &[Document]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    documents
        .iter()
        .map(|document| {
            let id = document.resource.id.to_string();
            let identifier = truncate(&document.resource.identifier, 24);
            let category = truncate(&document.resource.category, 12);
            let relative_time = format_relative_time(document.sort_date(), now_ms);

            if document.has_conflicts() {
                format!(
                    "{id:<36}  {identifier:<24}  {category:<12}  {relative_time:<10}  conflicts={}",
                    document.conflicts.len()
                )
            } else {
                format!("{id:<36}  {identifier:<24}  {category:<12}  {relative_time}")
            }
        })
        .collect()
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut truncated = text.chars().take(max_chars.saturating_sub(3)).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
