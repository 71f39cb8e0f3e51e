//! Quoting for POSIX shells.

use std::path::Path;

fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ':' | '=' | '@' | '%' | '+' | ',')
}

/// Quote a word for a POSIX shell. Words made only of safe characters are
/// returned unchanged.
///
/// ```
/// use muxinate::shell::escape;
///
/// assert_eq!(escape("vim"), "vim");
/// assert_eq!(escape("npm start"), "'npm start'");
/// assert_eq!(escape("it's"), "'it'\"'\"'s'");
/// ```
pub fn escape(s: &str) -> String {
    if !s.is_empty() && s.chars().all(is_safe) {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', "'\"'\"'"))
}

/// Quote a path, leaving a leading `~` bare so the shell still expands it.
pub fn escape_path(path: &Path) -> String {
    let s = path.to_string_lossy();
    if s == "~" {
        return "~".to_string();
    }
    match s.strip_prefix("~/") {
        Some("") => "~/".to_string(),
        Some(rest) => format!("~/{}", escape(rest)),
        None => escape(&s),
    }
}
