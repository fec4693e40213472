//! Small utility helpers used across modules.

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Lower-case, strip accents (NFD minus combining marks) and trim.
pub fn fold_text(s: &str) -> String {
  s.nfd()
    .filter(|c| !is_combining_mark(*c))
    .collect::<String>()
    .to_lowercase()
    .trim()
    .to_string()
}

/// Restrict a path segment to `[A-Za-z0-9_-]` so caller-supplied keys
/// cannot escape the store directory.
pub fn sanitize_segment(s: &str) -> String {
  s.chars()
    .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
    .collect()
}

/// Log-safe truncation for large strings.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.chars().count() <= max {
    s.to_string()
  } else {
    let head: String = s.chars().take(max).collect();
    format!("{}… ({} bytes total)", head, s.len())
  }
}
