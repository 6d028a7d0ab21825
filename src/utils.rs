use std::path::Path;

use crate::error::Result;

pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Longest prefix of `text` with at most `max_chars` characters.
pub fn truncate_on_char_boundary(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Short preview for log lines.
pub fn preview(text: &str, max_chars: usize) -> String {
    let cut = truncate_on_char_boundary(text, max_chars);
    if cut.len() < text.len() {
        format!("{cut}...")
    } else {
        cut.to_string()
    }
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_multibyte_chars() {
        assert_eq!(truncate_on_char_boundary("Nîmes café", 4), "Nîme");
        assert_eq!(truncate_on_char_boundary("short", 10), "short");
        assert_eq!(truncate_on_char_boundary("", 3), "");
    }

    #[test]
    fn test_preview_marks_truncation() {
        assert_eq!(preview("Marseille", 4), "Mars...");
        assert_eq!(preview("Nice", 4), "Nice");
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(12.3456, 2), 12.35);
        assert_eq!(round_to(0.1234, 3), 0.123);
    }

    #[test]
    fn test_ensure_directory_exists_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_directory_exists(&nested).unwrap();
        ensure_directory_exists(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
