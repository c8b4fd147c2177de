//! Document query engine
//!
//! Pure search, type filtering and sorting over a document slice. Nothing here
//! mutates its input; every call returns a fresh `Vec`.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{Document, FileType};

/// Type filter selected by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TypeFilter {
    #[default]
    All,
    /// png, jpg and jpeg
    Images,
    /// Exact (case-insensitive) type tag
    Type(String),
}

impl TypeFilter {
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Images => document
                .file_type
                .parse::<FileType>()
                .is_ok_and(|kind| kind.is_image()),
            TypeFilter::Type(tag) => document.file_type.eq_ignore_ascii_case(tag),
        }
    }
}

impl FromStr for TypeFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Ok(match normalized.as_str() {
            "" | "all" => TypeFilter::All,
            "image" | "images" => TypeFilter::Images,
            _ => TypeFilter::Type(normalized),
        })
    }
}

impl Display for TypeFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TypeFilter::All => write!(f, "all"),
            TypeFilter::Images => write!(f, "image"),
            TypeFilter::Type(tag) => write!(f, "{}", tag),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Name,
    Date,
    Size,
    Type,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "date" => Ok(SortKey::Date),
            "size" => Ok(SortKey::Size),
            "type" => Ok(SortKey::Type),
            other => Err(format!(
                "Invalid sort key: {} (expected name, date, size or type)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Current sort selection. Defaults to newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            key: SortKey::Date,
            direction: SortDirection::Desc,
        }
    }
}

impl SortState {
    /// Selecting the active key flips direction; a new key starts descending.
    pub fn select(&mut self, key: SortKey) {
        if self.key == key {
            self.direction = self.direction.flipped();
        } else {
            self.key = key;
            self.direction = SortDirection::Desc;
        }
    }

    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let ordering = match self.key {
            SortKey::Name => locale_cmp(&a.filename, &b.filename),
            SortKey::Date => a.upload_date.cmp(&b.upload_date),
            SortKey::Size => a.file_size.cmp(&b.file_size),
            SortKey::Type => locale_cmp(&a.file_type, &b.file_type),
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Everything the listing needs to derive its view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentQuery {
    pub search: String,
    pub filter: TypeFilter,
    pub sort: SortState,
}

impl DocumentQuery {
    pub fn matches(&self, document: &Document) -> bool {
        matches_search(document, &self.search) && self.filter.matches(document)
    }
}

/// Case-insensitive comparison that puts lowercase before uppercase on ties,
/// close to what a default collation does for filenames.
fn locale_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

fn matches_search(document: &Document, search: &str) -> bool {
    search.is_empty()
        || document
            .filename
            .to_lowercase()
            .contains(&search.to_lowercase())
}

/// Filter without sorting; keeps collection order.
pub fn filter(documents: &[Document], search: &str, type_filter: &TypeFilter) -> Vec<Document> {
    documents
        .iter()
        .filter(|doc| matches_search(doc, search) && type_filter.matches(doc))
        .cloned()
        .collect()
}

/// Filter, then sort with a stable sort so equal keys keep collection order.
pub fn view(documents: &[Document], query: &DocumentQuery) -> Vec<Document> {
    let mut result = filter(documents, &query.search, &query.filter);
    result.sort_by(|a, b| query.sort.compare(a, b));
    result
}
