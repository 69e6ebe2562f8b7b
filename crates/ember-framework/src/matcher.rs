//! Route matchers.
//!
//! A [`Matcher`] decides whether one token of command input identifies a
//! route. Siblings are tried in registration order and the first match wins.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

/// A type-erased predicate over a command token.
pub type MatchFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Strategy used by a route to recognise its command token.
#[derive(Clone, Default)]
pub enum Matcher {
    /// Exact match against the route's name or any of its aliases.
    #[default]
    Name,
    /// Unanchored regular expression search.
    Regex(Regex),
    /// Arbitrary predicate.
    Custom(MatchFn),
}

impl Matcher {
    /// Compiles `pattern` into a regex matcher.
    ///
    /// Use `^...$` to require the whole token to match.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self::Regex)
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Tests `input` against this matcher for a route with the given identity.
    pub(crate) fn matches(&self, input: &str, name: &str, aliases: &[String]) -> bool {
        match self {
            Self::Name => input == name || aliases.iter().any(|a| a == input),
            Self::Regex(re) => re.is_match(input),
            Self::Custom(f) => f(input),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => f.write_str("Name"),
            Self::Regex(re) => f.debug_tuple("Regex").field(&re.as_str()).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_matcher_checks_aliases() {
        let aliases = vec!["h".to_string(), "?".to_string()];
        let m = Matcher::Name;
        assert!(m.matches("help", "help", &aliases));
        assert!(m.matches("h", "help", &aliases));
        assert!(m.matches("?", "help", &aliases));
        assert!(!m.matches("Help", "help", &aliases));
        assert!(!m.matches("hel", "help", &aliases));
    }

    #[test]
    fn test_regex_matcher_is_unanchored() {
        let m = Matcher::regex("ro+l").unwrap();
        assert!(m.matches("roooll", "role", &[]));
        assert!(m.matches("xrol", "role", &[]));
        assert!(!m.matches("rl", "role", &[]));

        let anchored = Matcher::regex("^\\d+$").unwrap();
        assert!(anchored.matches("123", "", &[]));
        assert!(!anchored.matches("12a", "", &[]));
    }

    #[test]
    fn test_invalid_regex_is_an_error() {
        assert!(Matcher::regex("(").is_err());
    }

    #[test]
    fn test_custom_matcher() {
        let m = Matcher::custom(|s| s.eq_ignore_ascii_case("ping"));
        assert!(m.matches("PING", "ping", &[]));
        assert!(!m.matches("pong", "ping", &[]));
    }
}
