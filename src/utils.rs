//! Shared utility helpers.

/// Truncate a string to `max` chars, appending `…` if trimmed.
///
/// Counts Unicode scalar values, so multi-byte text is never split
/// mid-character.
pub fn truncate_str(s: &str, max: usize) -> String {
    truncate_with_marker(s, max, "…")
}

/// Truncate `s` to its first `max` chars and append `marker` when
/// anything was dropped.  Returns `s` verbatim when it already fits.
pub fn truncate_with_marker(s: &str, max: usize, marker: &str) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((end, _)) => format!("{}{marker}", &s[..end]),
    }
}

/// Format an integer with `,` thousands separators (`1234567` → `1,234,567`).
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
