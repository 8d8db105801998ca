//! Wear-case identification from image file names.
//!
//! A wear case is encoded as `wear<N>`, `W<N>`, or any embedded integer. A
//! case-insensitive `healthy` substring marks the zero-wear reference image,
//! which is excluded from wear numbering via the [`HEALTHY_CASE`] sentinel.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

/// Sentinel wear case for the healthy reference image ("skip this file").
pub const HEALTHY_CASE: i32 = -1;

/// True when the name marks the healthy (zero-wear) reference.
pub fn is_healthy_name(name: &str) -> bool {
    name.to_ascii_lowercase().contains("healthy")
}

/// Extract a wear case number from a file name.
///
/// Patterns are tried in order of specificity: `wear<N>`, `w<N>`, then any
/// embedded integer. Healthy names return [`HEALTHY_CASE`]; names with no
/// number return `default_case`.
pub fn wear_case_from_name(name: &str, default_case: i32) -> i32 {
    if is_healthy_name(name) {
        return HEALTHY_CASE;
    }

    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            Regex::new(r"wear(\d+)").expect("invalid wear pattern"),
            Regex::new(r"w(\d+)").expect("invalid w pattern"),
            Regex::new(r"(\d+)").expect("invalid number pattern"),
        ]
    });

    let lower = name.to_ascii_lowercase();
    for pattern in patterns {
        if let Some(caps) = pattern.captures(&lower) {
            if let Ok(case) = caps[1].parse::<i32>() {
                return case;
            }
        }
    }
    default_case
}

/// Strict parse for the single-tooth worn series, whose files are named
/// `W<N> <description>.<ext>` (e.g. `W1 scale 250.7 micro meter.jpg`).
/// Returns `None` for anything else, including the healthy reference.
pub fn wear_series_number(path: &Path) -> Option<i32> {
    let name = path.file_name()?.to_str()?;
    if is_healthy_name(name) {
        return None;
    }
    let token = name.split_whitespace().next()?;
    let mut chars = token.chars();
    if !matches!(chars.next(), Some('W') | Some('w')) {
        return None;
    }
    let digits: String = chars.as_str().chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn wear_prefix_patterns_are_recognized() {
        assert_eq!(wear_case_from_name("Wear12 gear.jpg", 0), 12);
        assert_eq!(wear_case_from_name("W3 scale 250 micro meter.jpg", 0), 3);
        assert_eq!(wear_case_from_name("gear_case_7.png", 0), 7);
    }

    #[test]
    fn healthy_names_yield_the_sentinel() {
        assert_eq!(
            wear_case_from_name("Healthy scale 1000 micro meter.jpg", 0),
            HEALTHY_CASE
        );
        assert_eq!(wear_case_from_name("HEALTHY_gear_w5.png", 0), HEALTHY_CASE);
    }

    #[test]
    fn unnumbered_names_fall_back_to_the_default() {
        assert_eq!(wear_case_from_name("gear.jpg", 42), 42);
    }

    #[test]
    fn series_number_requires_leading_w_token() {
        assert_eq!(
            wear_series_number(&PathBuf::from("W1 scale 250.7 micro meter.jpg")),
            Some(1)
        );
        assert_eq!(wear_series_number(&PathBuf::from("w10.png")), Some(10));
        assert_eq!(wear_series_number(&PathBuf::from("gear W3.jpg")), None);
        assert_eq!(
            wear_series_number(&PathBuf::from("healthy scale 1000 micro meter.jpg")),
            None
        );
    }
}
