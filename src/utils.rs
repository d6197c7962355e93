//! Small shared helpers: time source abstraction and filename hygiene

use chrono::{DateTime, Utc};

/// Injectable time source so TTL logic is testable without waiting
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation used everywhere outside tests
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Reduce an opaque identifier to a safe file stem.
///
/// Identifiers are caller-supplied strings; path separators and leading dots
/// must not let a cache file land outside the image directory.
pub fn sanitize_file_stem(identifier: &str) -> String {
    let cleaned: String = identifier
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();

    let trimmed = cleaned.trim_matches('-');
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_stem() {
        assert_eq!(sanitize_file_stem("bench-press"), "bench-press");
        assert_eq!(sanitize_file_stem("3_4_sit-up"), "3_4_sit-up");
        assert_eq!(sanitize_file_stem("../../etc/passwd"), "etc-passwd");
        assert_eq!(sanitize_file_stem("a/b\\c"), "a-b-c");
        assert_eq!(sanitize_file_stem("..."), "unnamed");
        assert_eq!(sanitize_file_stem(""), "unnamed");
    }

    #[test]
    fn system_clock_advances() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
