//! Allow-list of page URLs that may attach as a UI surface.

use regex::Regex;

/// A bare `*` pattern admits any http(s) page.
const ANY_WEB_PAGE: &str = "^https?://.+$";

/// Compiled page patterns.
///
/// `*` inside the scheme/host part matches within one host label run (never
/// a `/`); `*` in the path matches anything.
#[derive(Debug, Clone)]
pub struct AllowedOrigins {
    patterns: Vec<Regex>,
}

impl AllowedOrigins {
    /// Compiles each non-empty pattern.
    pub fn new<I, P>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| pattern.as_ref().trim().to_string())
            .filter(|pattern| !pattern.is_empty())
            .map(|pattern| compile_pattern(&pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Parses a comma-separated pattern list.
    pub fn parse_list(raw: &str) -> Result<Self, regex::Error> {
        Self::new(raw.split(','))
    }

    pub fn allows(&self, page_url: &str) -> bool {
        let page_url = page_url.trim();
        self.patterns.iter().any(|pattern| pattern.is_match(page_url))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    if pattern == "*" {
        return Regex::new(ANY_WEB_PAGE);
    }

    let path_start = pattern
        .find("://")
        .map(|scheme_end| scheme_end + 3)
        .and_then(|host_start| {
            pattern[host_start..]
                .find('/')
                .map(|offset| host_start + offset)
        })
        .unwrap_or(pattern.len());

    let mut body = String::from("^");
    let mut literal_start = 0;
    for (index, _) in pattern.match_indices('*') {
        body.push_str(&regex::escape(&pattern[literal_start..index]));
        body.push_str(if index < path_start { "[^/]*" } else { ".*" });
        literal_start = index + 1;
    }
    body.push_str(&regex::escape(&pattern[literal_start..]));
    body.push('$');
    Regex::new(&body)
}
