//! Aggregate figures shown above the document listing.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::constants::RECENT_UPLOAD_WINDOW_DAYS;
use crate::models::Document;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentStats {
    pub total_count: usize,
    pub total_size: u64,
    /// Most frequent type tag; ties go to the tag seen first.
    pub most_common_type: Option<String>,
    /// Documents uploaded within the last seven days of `now`.
    pub recent_uploads: usize,
}

impl DocumentStats {
    pub fn compute(documents: &[Document], now: DateTime<Utc>) -> Self {
        let week_ago = now - Duration::days(RECENT_UPLOAD_WINDOW_DAYS);

        // (tag, count) in first-seen order
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for doc in documents {
            match counts.iter_mut().find(|(tag, _)| *tag == doc.file_type) {
                Some((_, count)) => *count += 1,
                None => counts.push((doc.file_type.as_str(), 1)),
            }
        }

        let mut most_common: Option<(&str, usize)> = None;
        for (tag, count) in counts {
            if most_common.map_or(true, |(_, best)| count > best) {
                most_common = Some((tag, count));
            }
        }

        Self {
            total_count: documents.len(),
            total_size: documents.iter().map(|doc| doc.file_size).sum(),
            most_common_type: most_common.map(|(tag, _)| tag.to_string()),
            recent_uploads: documents
                .iter()
                .filter(|doc| doc.upload_date > week_ago)
                .count(),
        }
    }
}
