//! Storage key names.
//!
//! Every tool of the suite shares one origin-wide keyspace; these are the
//! names owned by the quote tool.

/// Primary collection key holding the JSON array of quotes.
pub const QUOTES_KEY: &str = "sales-quotes";

/// Key holding the schema version of [`QUOTES_KEY`].
pub const QUOTES_VERSION_KEY: &str = "sales-quotes-version";

/// Flag set once the quote editor's walkthrough has been shown.
pub const ONBOARDING_KEY: &str = "demo-walkthrough-seen";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_distinct() {
        let keys = [QUOTES_KEY, QUOTES_VERSION_KEY, ONBOARDING_KEY];
        for (i, a) in keys.iter().enumerate() {
            assert!(keys[i + 1..].iter().all(|b| a != b));
        }
        assert!(QUOTES_VERSION_KEY.starts_with(QUOTES_KEY));
    }
}
