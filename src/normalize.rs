/// Endpoint normalization shared by the Endpoint Graph and the Findings
/// Registry (spec.md §4.9): strip query string, strip trailing slash (except
/// root), lowercase scheme+host, keep path case-sensitive.
pub fn normalize_endpoint(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut u) => {
            u.set_query(None);
            u.set_fragment(None);
            let scheme = u.scheme().to_lowercase();
            let host = u.host_str().unwrap_or("").to_lowercase();
            let port_part = match (scheme.as_str(), u.port()) {
                ("http", Some(80)) | ("https", Some(443)) | (_, None) => String::new(),
                (_, Some(p)) => format!(":{p}"),
            };
            let mut path = u.path().to_string();
            if path.len() > 1 && path.ends_with('/') {
                path.pop();
            }
            format!("{scheme}://{host}{port_part}{path}")
        }
        Err(_) => {
            // Not a full URL (e.g. a bare path like "/search?x=1"): strip the
            // query string and trailing slash manually.
            let without_query = raw.split(['?', '#']).next().unwrap_or(raw);
            if without_query.len() > 1 && without_query.ends_with('/') {
                without_query[..without_query.len() - 1].to_string()
            } else {
                without_query.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_query_and_trailing_slash() {
        assert_eq!(
            normalize_endpoint("https://Example.com/Search/?q=1"),
            "https://example.com/Search"
        );
    }

    #[test]
    fn keeps_root_slash() {
        assert_eq!(normalize_endpoint("https://example.com/"), "https://example.com/");
    }

    #[test]
    fn path_is_case_sensitive() {
        assert_eq!(
            normalize_endpoint("https://example.com/API/Users"),
            "https://example.com/API/Users"
        );
    }

    #[test]
    fn bare_path_without_scheme() {
        assert_eq!(normalize_endpoint("/search/?q=1"), "/search");
    }
}
