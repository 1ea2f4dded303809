//! String similarity used to rank descriptions against mention text.
//!
//! Both strings are normalized (lowercased, everything but ASCII letters and digits
//! removed) and compared by recursive longest-common-substring matching: the longest
//! common substring counts fully, then the parts left and right of it are matched the
//! same way. The ratio is `2 * common / (len1 + len2)`.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NON_ALPHANUMERIC: Regex =
        Regex::new(r"[^a-z0-9]").expect("valid normalization pattern");
}

/// Lowercase and keep ASCII alphanumerics only.
pub fn normalize(text: &str) -> String {
    NON_ALPHANUMERIC
        .replace_all(&text.to_lowercase(), "")
        .into_owned()
}

/// Similarity of two strings in `[0, 1]`, after normalization.
///
/// Symmetric, and 1.0 for equal inputs.
///
/// ```
/// use clinparse::resolver::similarity;
///
/// assert_eq!(similarity("Chronic kidney-disease", "chronic kidney disease"), 1.0);
/// assert!(similarity("kidney", "renal") < 0.5);
/// ```
pub fn similarity(a: &str, b: &str) -> f64 {
    similarity_normalized(&normalize(a), &normalize(b))
}

/// [`similarity`] for strings that are already normalized.
pub fn similarity_normalized(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    // The first longest match depends on argument order; take the better reading.
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let common = common_chars(a, b).max(common_chars(b, a));
    (2 * common) as f64 / (a.len() + b.len()) as f64
}

fn common_chars(a: &[u8], b: &[u8]) -> usize {
    let Some((pos_a, pos_b, len)) = longest_common_substring(a, b) else {
        return 0;
    };

    let mut sum = len;
    if pos_a > 0 && pos_b > 0 {
        sum += common_chars(&a[..pos_a], &b[..pos_b]);
    }
    if pos_a + len < a.len() && pos_b + len < b.len() {
        sum += common_chars(&a[pos_a + len..], &b[pos_b + len..]);
    }
    sum
}

/// First longest common substring as `(start in a, start in b, length)`.
fn longest_common_substring(a: &[u8], b: &[u8]) -> Option<(usize, usize, usize)> {
    let mut best: Option<(usize, usize, usize)> = None;

    for i in 0..a.len() {
        for j in 0..b.len() {
            let mut len = 0;
            while i + len < a.len() && j + len < b.len() && a[i + len] == b[j + len] {
                len += 1;
            }
            if len > best.map_or(0, |(_, _, l)| l) {
                best = Some((i, j, len));
            }
        }
    }

    best
}
