//! Navigation targets: the string projections of a URL that patterns are
//! tested against.

use url::Url;

/// Build the candidate strings for a URL.
///
/// Always contains the raw input first. For an absolute URL it is followed by
/// `origin + path`, `path`, `path + query` and `hostname`, deduplicated in
/// that order. Anything that does not parse yields the raw input alone.
pub fn build_targets(url: &str) -> Vec<String> {
    let mut targets = vec![url.to_string()];

    let Ok(parsed) = Url::parse(url) else {
        return targets;
    };

    let path = parsed.path();
    let search = match parsed.query() {
        Some(query) if !query.is_empty() => format!("?{query}"),
        _ => String::new(),
    };

    let candidates = [
        format!("{}{}", parsed.origin().ascii_serialization(), path),
        path.to_string(),
        format!("{path}{search}"),
        parsed.host_str().unwrap_or_default().to_string(),
    ];
    for candidate in candidates {
        if !candidate.is_empty() && !targets.contains(&candidate) {
            targets.push(candidate);
        }
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_url_targets() {
        assert_eq!(
            build_targets("https://www.example.com/direct/inbox/?tab=1#top"),
            vec![
                "https://www.example.com/direct/inbox/?tab=1#top",
                "https://www.example.com/direct/inbox/",
                "/direct/inbox/",
                "/direct/inbox/?tab=1",
                "www.example.com",
            ]
        );
    }

    #[test]
    fn test_duplicates_are_dropped() {
        // origin + path equals the raw input, and path + query equals path
        assert_eq!(
            build_targets("https://example.com/explore"),
            vec!["https://example.com/explore", "/explore", "example.com"]
        );
    }

    #[test]
    fn test_empty_query_is_omitted() {
        let targets = build_targets("https://example.com/reels/?");
        assert!(targets.contains(&"/reels/".to_string()));
        assert!(!targets.iter().any(|t| t == "/reels/?"));
    }

    #[test]
    fn test_port_is_kept_in_origin() {
        let targets = build_targets("http://localhost:3001/api/policy?x=1");
        assert_eq!(targets[1], "http://localhost:3001/api/policy");
        assert!(targets.contains(&"/api/policy?x=1".to_string()));
        assert_eq!(targets.last().map(String::as_str), Some("localhost"));
    }

    #[test]
    fn test_bare_origin_gets_root_path() {
        assert_eq!(
            build_targets("https://example.com"),
            vec!["https://example.com", "https://example.com/", "/", "example.com"]
        );
    }

    #[test]
    fn test_unparseable_url_yields_raw_input_only() {
        assert_eq!(build_targets("/direct/inbox/"), vec!["/direct/inbox/"]);
        assert_eq!(build_targets("not a url"), vec!["not a url"]);
        assert_eq!(build_targets(""), vec![""]);
    }
}
