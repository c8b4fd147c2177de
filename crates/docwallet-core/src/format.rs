//! Display helpers for sizes and type labels.

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Human readable size in base-1024 units with at most one decimal.
///
/// A trailing `.0` is dropped, so 1024 renders as `1 KB` and 1536 as `1.5 KB`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut unit = 0;
    let mut divisor = 1u64;
    while unit < UNITS.len() - 1 && bytes >= divisor * 1024 {
        divisor *= 1024;
        unit += 1;
    }

    let rounded = (bytes as f64 / divisor as f64 * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{:.0} {}", rounded, UNITS[unit])
    } else {
        format!("{:.1} {}", rounded, UNITS[unit])
    }
}

/// Short label for a type tag.
pub fn kind_label(file_type: &str) -> &'static str {
    match file_type.to_lowercase().as_str() {
        "pdf" => "PDF",
        "docx" => "DOCX",
        "png" | "jpg" | "jpeg" => "IMAGE",
        _ => "FILE",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_bytes() {
        assert_eq!(format_file_size(0), "0 B");
    }

    #[test]
    fn fractional_kilobytes() {
        assert_eq!(format_file_size(1536), "1.5 KB");
    }

    #[test]
    fn whole_units_drop_decimal() {
        assert_eq!(format_file_size(500), "500 B");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(10 * 1024 * 1024), "10 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3 GB");
    }

    #[test]
    fn rounds_to_one_decimal() {
        assert_eq!(format_file_size(1_250_000), "1.2 MB");
        assert_eq!(format_file_size(1023), "1023 B");
    }

    #[test]
    fn terabytes_stay_in_gigabytes() {
        assert_eq!(format_file_size(2 * 1024 * 1024 * 1024 * 1024), "2048 GB");
    }

    #[test]
    fn labels() {
        assert_eq!(kind_label("PDF"), "PDF");
        assert_eq!(kind_label("jpeg"), "IMAGE");
        assert_eq!(kind_label("exe"), "FILE");
    }
}
