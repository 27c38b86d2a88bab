//! Replacement spec string parsing.
//!
//! Specs come straight from stanza configuration and follow the eventgen
//! conventions: `integer[lo:hi]`, `float[lo:hi]`, `list['a','b']`,
//! `file[path/to/file.csv:column]`, `user['name','email']`, `hex(8)` and so
//! on. All parsers are lenient about case on the leading keyword and return
//! `None` for anything malformed; the caller decides how to warn.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// How a `file[...]` spec addresses a column, when it does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileIndex {
    /// 1-based comma-separated column of an indexed sample file.
    Column(usize),
    /// Named column of a CSV lookup file with a header row.
    Header(String),
}

/// Components a `url[...]` spec may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlPart {
    IpHost,
    FqdnHost,
    Path,
    Query,
    Protocol,
    Full,
}

impl UrlPart {
    fn parse(s: &str) -> Option<UrlPart> {
        match s {
            "ip_host" => Some(UrlPart::IpHost),
            "fqdn_host" => Some(UrlPart::FqdnHost),
            "path" => Some(UrlPart::Path),
            "query" => Some(UrlPart::Query),
            "protocol" => Some(UrlPart::Protocol),
            "full" => Some(UrlPart::Full),
            _ => None,
        }
    }
}

/// Extract the bracketed body of `<keyword>[...]`, case-insensitive on the
/// keyword.
fn bracket_body<'a>(replacement: &'a str, keyword: &str) -> Option<&'a str> {
    let lower = replacement.to_lowercase();
    if !lower.starts_with(keyword) {
        return None;
    }
    let rest = &replacement[keyword.len()..];
    let rest = rest.strip_prefix('[')?;
    let end = rest.rfind(']')?;
    Some(&rest[..end])
}

/// Parse `integer[lo:hi]`.
pub fn parse_int_range(replacement: &str) -> Option<(i64, i64)> {
    let body = bracket_body(replacement, "integer")?;
    let (lo, hi) = body.split_once(':')?;
    Some((lo.trim().parse().ok()?, hi.trim().parse().ok()?))
}

/// Parse `float[lo:hi]`, returning the bounds and the decimal precision
/// implied by the lower bound (digits after the dot, default 1).
pub fn parse_float_range(replacement: &str) -> Option<(f64, f64, usize)> {
    let body = bracket_body(replacement, "float")?;
    let (lo_str, hi_str) = body.split_once(':')?;
    let lo: f64 = lo_str.trim().parse().ok()?;
    let hi: f64 = hi_str.trim().parse().ok()?;
    let precision = lo_str
        .trim()
        .split_once('.')
        .map(|(_, frac)| frac.len())
        .filter(|len| *len > 0)
        .unwrap_or(1);
    Some((lo, hi, precision))
}

/// Parse a Python-list-literal body: `keyword['a', "b", 3]`.
///
/// Elements may be single- or double-quoted strings or bare literals;
/// nesting is not supported.
pub fn parse_bracket_list(replacement: &str, keyword: &str) -> Option<Vec<String>> {
    let body = bracket_body(replacement, keyword)?;
    let mut values = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for ch in body.chars() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                } else {
                    current.push(ch);
                }
            }
            None => match ch {
                '\'' | '"' => quote = Some(ch),
                ',' => {
                    let v = current.trim();
                    if !v.is_empty() {
                        values.push(v.to_string());
                    }
                    current.clear();
                }
                _ => current.push(ch),
            },
        }
    }
    // Unterminated quote means a malformed literal.
    if quote.is_some() {
        return None;
    }
    let v = current.trim();
    if !v.is_empty() {
        values.push(v.to_string());
    }
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

/// Parse `hex(n)`.
pub fn parse_hex_digits(replacement: &str) -> Option<usize> {
    let lower = replacement.to_lowercase();
    let rest = lower.strip_prefix("hex")?;
    let rest = rest.strip_prefix('(')?;
    let end = rest.rfind(')')?;
    rest[..end].trim().parse().ok()
}

/// Parse `url[...]`, validating every requested component.
pub fn parse_url_parts(replacement: &str, stanza: &str) -> Option<Vec<UrlPart>> {
    let Some(raw) = parse_bracket_list(replacement, "url") else {
        tracing::warn!(
            stanza,
            "Unidentified format: '{replacement}'. Expected values: [\"ip_host\", \"fqdn_host\", \"path\", \"query\", \"protocol\", \"full\"]"
        );
        return None;
    };
    let mut parts = Vec::with_capacity(raw.len());
    for each in &raw {
        match UrlPart::parse(each) {
            Some(part) => parts.push(part),
            None => {
                tracing::warn!(
                    stanza,
                    "Invalid Value for url: '{each}' for replacement {replacement}. Accepted values: [\"ip_host\", \"fqdn_host\", \"path\", \"query\", \"protocol\", \"full\"]"
                );
                return None;
            }
        }
    }
    Some(parts)
}

/// Parse `user[...]`, validating against the synthetic identity columns.
pub fn parse_user_fields(replacement: &str, stanza: &str) -> Option<Vec<String>> {
    const USER_HEADER: &[&str] = &["name", "email", "domain_user", "distinguished_name"];
    let Some(raw) = parse_bracket_list(replacement, "user") else {
        tracing::warn!(
            stanza,
            "Unidentified format: '{replacement}'. Try user['name','email','domain_user','distinguished_name']"
        );
        return None;
    };
    let fields: Vec<String> = raw
        .into_iter()
        .filter(|f| USER_HEADER.contains(&f.as_str()))
        .collect();
    if fields.is_empty() {
        tracing::warn!(
            stanza,
            "Invalid Value: '{replacement}'. Accepted values: ['name','email','domain_user','distinguished_name']"
        );
        return None;
    }
    Some(fields)
}

/// Parse `host[...]`/`src[...]`/`dest[...]`/`dvc[...]` field lists.
pub fn parse_host_fields(keyword: &str, replacement: &str, stanza: &str) -> Option<Vec<String>> {
    const SRC_HEADER: &[&str] = &["host", "ipv4", "ipv6", "fqdn"];
    let Some(raw) = parse_bracket_list(replacement, keyword) else {
        tracing::warn!(
            stanza,
            "Non-supported format: '{replacement}'. Try {keyword}['host','ipv4','ipv6','fqdn']"
        );
        return None;
    };
    let fields: Vec<String> = raw
        .into_iter()
        .filter(|f| SRC_HEADER.contains(&f.as_str()))
        .collect();
    if fields.is_empty() {
        tracing::warn!(
            stanza,
            "Invalid Value: '{replacement}'. Accepted values: ['host','ipv4','ipv6','fqdn']"
        );
        return None;
    }
    Some(fields)
}

fn apps_path_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"(.*)(\\?/?apps\\?/?[a-zA-Z-_0-9.*]+\\?/?)(.*)")
            .expect("valid apps path pattern")
    })
}

/// Parse a `file[...]` (or bare-path) spec into a resolved path and an
/// optional column index.
///
/// Paths of the form `.../apps/<addon>/<rest>` are re-rooted next to the
/// stanza's sample directory so configurations stay portable across
/// machines; anything else is taken as-is. A trailing `:<index>` selects a
/// column: numeric for comma-separated sample files, a header name for CSV
/// lookups.
pub fn parse_file_spec(replacement: &str, sample_path: &Path) -> (PathBuf, Option<FileIndex>) {
    let raw = bracket_body(replacement, "file")
        .map(|s| s.to_string())
        .unwrap_or_else(|| replacement.to_string());

    let base = sample_dir_root(sample_path);

    let (path_str, index) = if let Some(caps) = apps_path_regex().captures(&raw) {
        let addon_relative = caps.get(3).map(|m| m.as_str()).unwrap_or("");
        let (file_part, index) = split_index(addon_relative);
        (base.join(file_part).to_string_lossy().into_owned(), index)
    } else {
        let (file_part, index) = split_index(&raw);
        (file_part.to_string(), index)
    };

    (PathBuf::from(path_str), index)
}

/// The directory the add-on's `samples` directory lives in.
fn sample_dir_root(sample_path: &Path) -> PathBuf {
    let mut root = sample_path.to_path_buf();
    while let Some(parent) = root.parent() {
        let is_samples = root
            .file_name()
            .map(|name| name == "samples")
            .unwrap_or(false);
        root = parent.to_path_buf();
        if is_samples {
            return root;
        }
    }
    sample_path.parent().unwrap_or(Path::new(".")).to_path_buf()
}

/// Split a trailing `:<index>` off a path spec, when present.
fn split_index(raw: &str) -> (&str, Option<FileIndex>) {
    match raw.rsplit_once(':') {
        Some((path, idx)) if !idx.is_empty() && !idx.contains(['/', '\\']) => {
            let index = match idx.parse::<usize>() {
                Ok(n) => FileIndex::Column(n),
                Err(_) => FileIndex::Header(idx.to_string()),
            };
            (path, Some(index))
        }
        _ => (raw, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_range() {
        assert_eq!(parse_int_range("integer[1:10]"), Some((1, 10)));
        assert_eq!(parse_int_range("Integer[-5:5]"), Some((-5, 5)));
        assert_eq!(parse_int_range("integer[1:"), None);
        assert_eq!(parse_int_range("integer[a:b]"), None);
    }

    #[test]
    fn test_float_range_precision() {
        assert_eq!(parse_float_range("float[0.00:70.00]"), Some((0.0, 70.0, 2)));
        assert_eq!(parse_float_range("float[1.5:2.5]"), Some((1.5, 2.5, 1)));
        // No fractional digits in the lower bound: default precision 1.
        assert_eq!(parse_float_range("float[1:5]"), Some((1.0, 5.0, 1)));
        assert_eq!(parse_float_range("float[oops]"), None);
    }

    #[test]
    fn test_bracket_list() {
        assert_eq!(
            parse_bracket_list("list['a','b','c']", "list"),
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert_eq!(
            parse_bracket_list(r#"list["x", 42]"#, "list"),
            Some(vec!["x".to_string(), "42".to_string()])
        );
        // Commas inside quotes do not split.
        assert_eq!(
            parse_bracket_list("list['a,b','c']", "list"),
            Some(vec!["a,b".to_string(), "c".to_string()])
        );
        assert_eq!(parse_bracket_list("list['unterminated]", "list"), None);
        assert_eq!(parse_bracket_list("notalist", "list"), None);
    }

    #[test]
    fn test_hex_digits() {
        assert_eq!(parse_hex_digits("hex(8)"), Some(8));
        assert_eq!(parse_hex_digits("Hex(16)"), Some(16));
        assert_eq!(parse_hex_digits("hex(abc)"), None);
    }

    #[test]
    fn test_file_spec_plain() {
        let (path, index) = parse_file_spec("file[lookups/hosts.sample]", Path::new("samples/s"));
        assert_eq!(path, PathBuf::from("lookups/hosts.sample"));
        assert_eq!(index, None);
    }

    #[test]
    fn test_file_spec_with_numeric_index() {
        let (path, index) = parse_file_spec("file[data.csv:2]", Path::new("samples/s"));
        assert_eq!(path, PathBuf::from("data.csv"));
        assert_eq!(index, Some(FileIndex::Column(2)));
    }

    #[test]
    fn test_file_spec_with_header_index() {
        let (path, index) = parse_file_spec("lookups/users.csv:email", Path::new("samples/s"));
        assert_eq!(path, PathBuf::from("lookups/users.csv"));
        assert_eq!(index, Some(FileIndex::Header("email".to_string())));
    }

    #[test]
    fn test_file_spec_apps_path_rerooted() {
        let (path, index) = parse_file_spec(
            "file[/opt/splunk/etc/apps/my_addon/lookups/hosts.sample:3]",
            Path::new("/work/addon/samples/sample.log"),
        );
        assert_eq!(path, PathBuf::from("/work/addon/lookups/hosts.sample"));
        assert_eq!(index, Some(FileIndex::Column(3)));
    }

    #[test]
    fn test_user_fields_validated() {
        assert_eq!(
            parse_user_fields("user['name','email']", "s"),
            Some(vec!["name".to_string(), "email".to_string()])
        );
        assert_eq!(parse_user_fields("user['nope']", "s"), None);
    }

    #[test]
    fn test_url_parts_validated() {
        assert_eq!(
            parse_url_parts("url['ip_host','path']", "s"),
            Some(vec![UrlPart::IpHost, UrlPart::Path])
        );
        assert_eq!(parse_url_parts("url['bogus']", "s"), None);
    }
}
