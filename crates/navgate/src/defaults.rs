//! The policy compiled into the binary.
//!
//! Used until a fetched policy has been validated, and again whenever a host
//! resets its cache.

use crate::error::PolicyValidationError;
use crate::policy::{Policy, parse_str};

/// Source text of the bundled policy.
pub const BUNDLED_POLICY_JSON: &str = include_str!("../assets/default-policy.json");

/// Parse the bundled policy.
pub fn bundled_default() -> Result<Policy, PolicyValidationError> {
    parse_str(BUNDLED_POLICY_JSON)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::compile::{Platform, compile, compile_all};

    #[test]
    fn test_bundled_policy_validates() {
        let policy = bundled_default().expect("bundled policy must validate");
        assert_eq!(policy.destination_ids(), vec!["instagram", "youtube", "facebook"]);
    }

    #[test]
    fn test_bundled_policy_compiles_for_every_platform() {
        let policy = bundled_default().unwrap();
        compile_all(&policy).expect("bundled policy must compile");
    }

    #[test]
    fn test_bundled_policy_decisions() {
        let policy = bundled_default().unwrap();
        let instagram = compile(&policy, Platform::Desktop, Some("instagram"))
            .unwrap()
            .into_single()
            .unwrap();
        assert!(instagram.is_navigation_allowed("https://www.instagram.com/direct/t/1234/"));
        assert!(!instagram.is_navigation_allowed("https://www.instagram.com/"));
        assert!(!instagram.is_navigation_allowed("https://www.instagram.com/explore/"));
        assert!(!instagram.is_navigation_allowed("https://www.instagram.com/reels/abc/"));

        let youtube = compile(&policy, Platform::Android, Some("youtube"))
            .unwrap()
            .into_single()
            .unwrap();
        assert!(youtube.is_navigation_allowed("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(!youtube.is_navigation_allowed("https://www.youtube.com/shorts/abc"));
        assert!(!youtube.is_resource_allowed("https://static.doubleclick.net/instream/ad.js"));
    }
}
