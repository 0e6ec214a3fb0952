//! URL validation utilities.

/// Check if a URL is one the pipeline should attempt to fetch.
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    // Skip data URLs, javascript URLs, and other non-http schemes
    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }

    match url::Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_schemes() {
        assert!(!is_valid_url(""));
        assert!(!is_valid_url("javascript:alert(1)"));
        assert!(!is_valid_url("mailto:a@b.com"));
        assert!(!is_valid_url("not a url"));
    }

    #[test]
    fn accepts_http_and_https() {
        assert!(is_valid_url("https://leginfo.legislature.ca.gov/faces/codes.xhtml"));
        assert!(is_valid_url("http://example.com"));
    }
}
