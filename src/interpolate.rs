//! `{key}` substitution for project files and templates.
//!
//! Settings come from `KEY=VALUE` arguments on the command line and are
//! applied to the project text before it is parsed.
//!
//! # Example
//!
//! ```
//! use muxinate::interpolate::{parse_setting, interpolate};
//! use std::collections::HashMap;
//!
//! let (key, value) = parse_setting("branch=main").unwrap();
//! let settings = HashMap::from([(key, value)]);
//!
//! assert_eq!(interpolate("git checkout {branch}", &settings), "git checkout main");
//! ```

use crate::error::{MuxinateError, Result};
use std::collections::HashMap;

/// Parse a `KEY=VALUE` argument.
///
/// Returns `None` if the `=` is missing or the key is empty.
///
/// ```
/// use muxinate::interpolate::parse_setting;
///
/// assert_eq!(
///     parse_setting("port=3000"),
///     Some(("port".to_string(), "3000".to_string()))
/// );
/// assert_eq!(parse_setting("no-equals"), None);
/// ```
pub fn parse_setting(arg: &str) -> Option<(String, String)> {
    let (key, value) = arg.split_once('=')?;
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}

/// Parse every `KEY=VALUE` argument.
///
/// # Errors
///
/// [`MuxinateError::InvalidSetting`] for the first malformed argument.
pub fn parse_settings(args: &[String]) -> Result<HashMap<String, String>> {
    args.iter()
        .map(|arg| parse_setting(arg).ok_or_else(|| MuxinateError::InvalidSetting(arg.clone())))
        .collect()
}

/// Replace every `{key}` placeholder with its setting. Unknown placeholders
/// are left untouched.
pub fn interpolate(text: &str, settings: &HashMap<String, String>) -> String {
    let mut out = text.to_string();
    for (key, value) in settings {
        out = out.replace(&format!("{{{}}}", key), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_setting() {
        assert_eq!(
            parse_setting("url=http://x/?a=b"),
            Some(("url".to_string(), "http://x/?a=b".to_string()))
        );
        assert_eq!(parse_setting("=value"), None);
    }

    #[test]
    fn test_parse_settings_rejects_malformed() {
        let args = vec!["a=1".to_string(), "oops".to_string()];
        assert!(matches!(
            parse_settings(&args),
            Err(MuxinateError::InvalidSetting(s)) if s == "oops"
        ));
    }

    #[test]
    fn test_interpolate() {
        let settings = HashMap::from([("name".to_string(), "blog".to_string())]);
        assert_eq!(
            interpolate("name: {name}\nroot: ~/{name}\n{other}", &settings),
            "name: blog\nroot: ~/blog\n{other}"
        );
    }
}
