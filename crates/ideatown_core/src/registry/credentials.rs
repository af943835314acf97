//! Session credentials attached to registry requests.
//!
//! # Invariants
//! - Only cookies scoped to the registry host are attached.
//! - A `Cookie` header is always produced, empty when no cookie matches.
//! - `X-CSRFToken` mirrors the cookie literally named `csrftoken`.
//! - Credential values are never logged.

pub const CSRF_COOKIE_NAME: &str = "csrftoken";
pub const CSRF_HEADER_NAME: &str = "X-CSRFToken";

/// Supplies the credential headers for requests to `hostname`.
pub trait CredentialProvider {
    fn headers_for_host(&self, hostname: &str) -> Vec<(String, String)>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Host the cookie is scoped to; a leading `.` marks a domain cookie.
    pub host: String,
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(host: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            name: name.into(),
            value: value.into(),
        }
    }

    /// Host-only cookies match exactly; domain cookies also match subdomains.
    pub fn matches_host(&self, hostname: &str) -> bool {
        let hostname = hostname.to_ascii_lowercase();
        let scope = self.host.to_ascii_lowercase();
        match scope.strip_prefix('.') {
            Some(domain) => hostname == domain || hostname.ends_with(&format!(".{domain}")),
            None => hostname == scope,
        }
    }
}

/// Source of stored cookies.
pub trait CookieJar {
    fn cookies_for_host(&self, hostname: &str) -> Vec<Cookie>;
}

/// Cookie jar held in memory, filled by the embedding session.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCookieJar {
    cookies: Vec<Cookie>,
}

impl InMemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a cookie, replacing one with the same host and name.
    pub fn insert(&mut self, cookie: Cookie) {
        self.cookies
            .retain(|existing| !(existing.host == cookie.host && existing.name == cookie.name));
        self.cookies.push(cookie);
    }
}

impl CookieJar for InMemoryCookieJar {
    fn cookies_for_host(&self, hostname: &str) -> Vec<Cookie> {
        self.cookies
            .iter()
            .filter(|cookie| cookie.matches_host(hostname))
            .cloned()
            .collect()
    }
}

/// Builds `Cookie` and `X-CSRFToken` headers from a cookie jar.
pub struct CookieCredentials<J: CookieJar> {
    jar: J,
}

impl<J: CookieJar> CookieCredentials<J> {
    pub fn new(jar: J) -> Self {
        Self { jar }
    }

    pub fn jar(&self) -> &J {
        &self.jar
    }
}

impl<J: CookieJar> CredentialProvider for CookieCredentials<J> {
    fn headers_for_host(&self, hostname: &str) -> Vec<(String, String)> {
        let cookies = self.jar.cookies_for_host(hostname);
        let cookie_header = cookies
            .iter()
            .map(|cookie| format!("{}={};", cookie.name, cookie.value))
            .collect::<String>();
        let mut headers = vec![("Cookie".to_string(), cookie_header)];

        if let Some(csrf) = cookies.iter().rev().find(|c| c.name == CSRF_COOKIE_NAME) {
            headers.push((CSRF_HEADER_NAME.to_string(), csrf.value.clone()));
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::{Cookie, CookieCredentials, CredentialProvider, InMemoryCookieJar};

    #[test]
    fn domain_cookies_match_subdomains_but_host_cookies_do_not() {
        let domain = Cookie::new(".example.com", "a", "1");
        let host = Cookie::new("example.com", "b", "2");
        assert!(domain.matches_host("ideas.example.com"));
        assert!(domain.matches_host("example.com"));
        assert!(!host.matches_host("ideas.example.com"));
        assert!(!domain.matches_host("badexample.com"));
    }

    #[test]
    fn headers_join_cookies_and_mirror_csrf_token() {
        let mut jar = InMemoryCookieJar::new();
        jar.insert(Cookie::new("ideas.example.com", "sessionid", "s1"));
        jar.insert(Cookie::new("ideas.example.com", "csrftoken", "t1"));
        jar.insert(Cookie::new("other.example.com", "sessionid", "nope"));

        let headers = CookieCredentials::new(jar).headers_for_host("ideas.example.com");
        assert_eq!(
            headers,
            vec![
                ("Cookie".to_string(), "sessionid=s1;csrftoken=t1;".to_string()),
                ("X-CSRFToken".to_string(), "t1".to_string()),
            ]
        );
    }

    #[test]
    fn empty_jar_sends_empty_cookie_header_without_csrf() {
        let headers =
            CookieCredentials::new(InMemoryCookieJar::new()).headers_for_host("example.com");
        assert_eq!(headers, vec![("Cookie".to_string(), String::new())]);
    }
}
