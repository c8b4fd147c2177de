//! Rendering helpers for the `docwallet` binary.

use anyhow::Context;
use docwallet_client::{UploadFailure, UploadOutcome, UploadReport};
use docwallet_core::models::Document;
use docwallet_core::{format_file_size, kind_label, DocumentStats};
use serde::Serialize;
use std::fmt::Write;

const DEFAULT_LOG_FILTER: &str = "docwallet=info";

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Initialize tracing for the CLI. Logs go to stderr so JSON output on
/// stdout stays parseable.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_env("DOCWALLET_LOG"))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

pub fn render_documents_table(documents: &[Document]) -> String {
    let mut out = String::new();
    if documents.is_empty() {
        out.push_str("No documents found.\n");
        return out;
    }

    let _ = writeln!(
        out,
        "{:<36} {:<6} {:<40} {:>10} {:>17}",
        "ID", "Kind", "Filename", "Size", "Uploaded At"
    );
    let _ = writeln!(out, "{}", "-".repeat(113));
    for doc in documents {
        let _ = writeln!(
            out,
            "{:<36} {:<6} {:<40} {:>10} {:>17}",
            doc.id,
            kind_label(&doc.file_type),
            truncate_string(&doc.filename, 40),
            format_file_size(doc.file_size),
            doc.upload_date.format("%Y-%m-%d %H:%M")
        );
    }
    out
}

pub fn render_stats(stats: &DocumentStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total Documents: {}", stats.total_count);
    let _ = writeln!(out, "Total Size:      {}", format_file_size(stats.total_size));
    let _ = writeln!(
        out,
        "Most Common:     {}",
        stats
            .most_common_type
            .as_deref()
            .map(|tag| tag.to_uppercase())
            .unwrap_or_else(|| "N/A".to_string())
    );
    let _ = writeln!(out, "Recent Uploads:  {} (last 7 days)", stats.recent_uploads);
    out
}

/// One line per file in input order, then a summary.
pub fn render_upload_report(report: &UploadReport) -> String {
    let mut out = String::new();
    for outcome in &report.outcomes {
        let _ = match outcome {
            UploadOutcome::Uploaded(doc) => writeln!(
                out,
                "uploaded  {} ({})",
                doc.filename,
                format_file_size(doc.file_size)
            ),
            UploadOutcome::Failed(UploadFailure { filename, error }) => {
                writeln!(out, "failed    {}: {}", filename, error)
            }
        };
    }
    let _ = writeln!(
        out,
        "{} uploaded, {} failed",
        report.succeeded(),
        report.failed()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn doc(filename: &str, file_type: &str, size: u64) -> Document {
        Document {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            filename: filename.to_string(),
            file_type: file_type.to_string(),
            file_size: size,
            storage_path: "u/1-a.pdf".to_string(),
            upload_date: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn truncate_string_short() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("", 5), "");
    }

    #[test]
    fn truncate_string_long() {
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("abc", 2), "...");
    }

    #[test]
    fn truncate_string_multibyte() {
        assert_eq!(truncate_string("résumé-final.pdf", 9), "résumé...");
    }

    #[test]
    fn table_shows_kind_and_size() {
        let table = render_documents_table(&[doc("passport.pdf", "pdf", 1536)]);
        let row = table.lines().nth(2).unwrap();
        assert!(row.contains("PDF"));
        assert!(row.contains("passport.pdf"));
        assert!(row.contains("1.5 KB"));
        assert!(row.contains("2024-05-01 09:30"));
    }

    #[test]
    fn empty_table() {
        assert_eq!(render_documents_table(&[]), "No documents found.\n");
    }

    #[test]
    fn stats_without_documents() {
        let stats = DocumentStats::compute(&[], Utc::now());
        let out = render_stats(&stats);
        assert!(out.contains("Total Size:      0 B"));
        assert!(out.contains("Most Common:     N/A"));
    }

    #[test]
    fn upload_report_lines() {
        let report = UploadReport {
            outcomes: vec![
                UploadOutcome::Failed(UploadFailure {
                    filename: "b.exe".to_string(),
                    error: "File type not supported. Please upload PDF, DOCX, PNG, or JPG files."
                        .to_string(),
                }),
                UploadOutcome::Uploaded(doc("a.pdf", "pdf", 2048)),
            ],
        };
        let out = render_upload_report(&report);
        let lines: Vec<_> = out.lines().collect();
        assert!(lines[0].starts_with("failed    b.exe: File type not supported."));
        assert_eq!(lines[1], "uploaded  a.pdf (2 KB)");
        assert!(out.ends_with("1 uploaded, 1 failed\n"));
    }
}
