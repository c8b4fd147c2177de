use docwallet_core::constants::OVERVIEW_DOCUMENT_LIMIT;
use docwallet_core::models::Document;
use docwallet_core::query;
use docwallet_core::TypeFilter;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardTab {
    #[default]
    Overview,
    AllDocuments,
    Upload,
}

impl fmt::Display for DashboardTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardTab::Overview => write!(f, "overview"),
            DashboardTab::AllDocuments => write!(f, "all_documents"),
            DashboardTab::Upload => write!(f, "upload"),
        }
    }
}

impl FromStr for DashboardTab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "overview" => Ok(DashboardTab::Overview),
            "all" | "all_documents" | "documents" => Ok(DashboardTab::AllDocuments),
            "upload" => Ok(DashboardTab::Upload),
            other => Err(format!("Unknown tab: {}", other)),
        }
    }
}

/// The first documents of the collection, narrowed by search and filter.
/// Only the leading slice is searched, never the whole collection.
pub fn overview_documents(
    documents: &[Document],
    search: &str,
    type_filter: &TypeFilter,
) -> Vec<Document> {
    let leading = &documents[..documents.len().min(OVERVIEW_DOCUMENT_LIMIT)];
    query::filter(leading, search, type_filter)
}

/// Whether the overview offers a link to the full list.
pub fn shows_view_all(total_documents: usize) -> bool {
    total_documents > OVERVIEW_DOCUMENT_LIMIT
}

/// Tab to show once an upload batch finishes.
pub fn tab_after_upload(current: DashboardTab, total_documents: usize, succeeded: usize) -> DashboardTab {
    if current == DashboardTab::Upload && succeeded > 0 && total_documents > OVERVIEW_DOCUMENT_LIMIT {
        DashboardTab::AllDocuments
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn docs(count: usize) -> Vec<Document> {
        let now = Utc::now();
        (0..count)
            .map(|i| Document {
                id: Uuid::new_v4(),
                user_id: Uuid::nil(),
                filename: format!("file-{}.{}", i, if i % 2 == 0 { "pdf" } else { "png" }),
                file_type: if i % 2 == 0 { "pdf" } else { "png" }.to_string(),
                file_size: 100,
                storage_path: format!("u/{}", i),
                upload_date: now - Duration::minutes(i as i64),
            })
            .collect()
    }

    #[test]
    fn overview_caps_at_eight_and_keeps_order() {
        let all = docs(12);
        let overview = overview_documents(&all, "", &TypeFilter::All);
        assert_eq!(overview.len(), 8);
        assert_eq!(overview[0].filename, "file-0.pdf");
        assert_eq!(overview[7].filename, "file-7.png");
        assert!(shows_view_all(all.len()));
        assert!(!shows_view_all(8));
    }

    #[test]
    fn overview_applies_filter() {
        let all = docs(12);
        let images = overview_documents(&all, "", &TypeFilter::Images);
        let names: Vec<_> = images.iter().map(|d| d.filename.as_str()).collect();
        assert_eq!(names, vec!["file-1.png", "file-3.png", "file-5.png", "file-7.png"]);
    }

    #[test]
    fn overview_ignores_matches_past_the_first_eight() {
        let mut all: Vec<Document> = docs(8)
            .into_iter()
            .map(|mut d| {
                d.filename = d.filename.replace(".png", ".pdf");
                d.file_type = "pdf".to_string();
                d
            })
            .collect();
        let mut old = docs(1).remove(0);
        old.filename = "old-photo.png".to_string();
        old.file_type = "png".to_string();
        all.push(old);

        assert!(overview_documents(&all, "", &TypeFilter::Images).is_empty());
        assert!(overview_documents(&all, "old-photo", &TypeFilter::All).is_empty());
        assert_eq!(overview_documents(&all, "", &TypeFilter::All).len(), 8);
    }

    #[test]
    fn upload_tab_switches_only_with_many_documents() {
        assert_eq!(
            tab_after_upload(DashboardTab::Upload, 9, 1),
            DashboardTab::AllDocuments
        );
        assert_eq!(tab_after_upload(DashboardTab::Upload, 8, 1), DashboardTab::Upload);
        assert_eq!(tab_after_upload(DashboardTab::Upload, 20, 0), DashboardTab::Upload);
        assert_eq!(
            tab_after_upload(DashboardTab::Overview, 20, 3),
            DashboardTab::Overview
        );
    }

    #[test]
    fn tab_names_parse() {
        assert_eq!("all".parse::<DashboardTab>().unwrap(), DashboardTab::AllDocuments);
        assert_eq!(DashboardTab::Upload.to_string(), "upload");
        assert!("settings".parse::<DashboardTab>().is_err());
    }
}
