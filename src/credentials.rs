//! Credential store for gateway tokens
//!
//! Built once at startup from a comma-separated environment value and shared
//! read-only for the lifetime of the process. An unset or empty value yields
//! an empty store, which puts the gateway in [`AuthMode::Disabled`].

use std::env;
use std::fmt;

use subtle::ConstantTimeEq;

/// Whether the gateway enforces token authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// No tokens configured: every request is let through (open gateway)
    Disabled,
    /// At least one token configured: requests must present one of them
    Enforced,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("disabled"),
            Self::Enforced => f.write_str("enforced"),
        }
    }
}

/// Immutable set of accepted tokens
#[derive(Clone, Default)]
pub struct CredentialStore {
    tokens: Vec<String>,
}

impl CredentialStore {
    /// Build the store from a raw comma-separated value.
    ///
    /// Empty fragments are dropped, so `None`, `""` and `","` all produce an
    /// empty store rather than a store accepting the empty string. Fragments
    /// are kept verbatim (no trimming) and deduplicated in first-seen order.
    #[must_use]
    pub fn from_value(value: Option<&str>) -> Self {
        let mut tokens: Vec<String> = Vec::new();
        for token in value.unwrap_or_default().split(',') {
            if !token.is_empty() && !tokens.iter().any(|t| t == token) {
                tokens.push(token.to_string());
            }
        }
        Self { tokens }
    }

    /// Build the store from an environment variable, read exactly once
    #[must_use]
    pub fn from_env(var_name: &str) -> Self {
        Self::from_value(env::var(var_name).ok().as_deref())
    }

    /// True iff one or more non-empty tokens were loaded
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.tokens.is_empty()
    }

    /// Authentication mode implied by the loaded tokens
    #[must_use]
    pub fn mode(&self) -> AuthMode {
        if self.is_configured() {
            AuthMode::Enforced
        } else {
            AuthMode::Disabled
        }
    }

    /// Number of distinct tokens
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True if no tokens are configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Exact, case-sensitive membership test.
    ///
    /// Every token is compared in constant time and the loop never exits
    /// early, so timing does not reveal which token (if any) matched.
    #[must_use]
    pub fn contains(&self, candidate: &str) -> bool {
        let candidate = candidate.as_bytes();
        self.tokens.iter().fold(false, |found, token| {
            let eq: bool = token.as_bytes().ct_eq(candidate).into();
            found | eq
        })
    }
}

// Tokens are secrets; never print them.
impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("tokens", &self.tokens.len())
            .field("mode", &self.mode())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_absent_value_is_unconfigured() {
        let store = CredentialStore::from_value(None);
        assert!(!store.is_configured());
        assert_eq!(store.mode(), AuthMode::Disabled);
        assert!(store.is_empty());
    }

    #[test]
    fn test_empty_value_is_unconfigured() {
        let store = CredentialStore::from_value(Some(""));
        assert!(!store.is_configured());
        assert!(!store.contains(""));
    }

    #[test]
    fn test_lone_comma_yields_no_empty_tokens() {
        let store = CredentialStore::from_value(Some(","));
        assert!(!store.is_configured());
        assert_eq!(store.len(), 0);
        assert!(!store.contains(""));
    }

    #[test]
    fn test_empty_fragments_dropped() {
        let store = CredentialStore::from_value(Some(",alpha,,beta,"));
        assert_eq!(store.len(), 2);
        assert!(store.contains("alpha"));
        assert!(store.contains("beta"));
        assert!(!store.contains(""));
    }

    #[test]
    fn test_single_token() {
        let store = CredentialStore::from_value(Some("secret-abc"));
        assert!(store.is_configured());
        assert_eq!(store.mode(), AuthMode::Enforced);
        assert!(store.contains("secret-abc"));
        assert!(!store.contains("secret-ab"));
        assert!(!store.contains("secret-abcd"));
    }

    #[test]
    fn test_case_sensitive_no_trimming() {
        let store = CredentialStore::from_value(Some("Token, spaced"));
        assert!(store.contains("Token"));
        assert!(!store.contains("token"));
        assert!(store.contains(" spaced"));
        assert!(!store.contains("spaced"));
    }

    #[test]
    fn test_duplicates_collapsed() {
        let store = CredentialStore::from_value(Some("a,b,a"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_debug_does_not_leak_tokens() {
        let store = CredentialStore::from_value(Some("super-secret"));
        let rendered = format!("{store:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("Enforced"));
    }

    #[test]
    fn test_from_env_reads_variable() {
        let dir = tempfile::tempdir().unwrap();
        let env_path = dir.path().join("tokens.env");
        let mut f = std::fs::File::create(&env_path).unwrap();
        writeln!(f, "AI_GW_TEST_TOKENS=tok-one,tok-two").unwrap();
        drop(f);
        dotenvy::from_path(&env_path).unwrap();

        let store = CredentialStore::from_env("AI_GW_TEST_TOKENS");
        assert_eq!(store.len(), 2);
        assert!(store.contains("tok-one"));
        assert!(store.contains("tok-two"));
    }

    #[test]
    fn test_from_env_unset_variable() {
        let store = CredentialStore::from_env("AI_GW_TEST_SURELY_UNSET_TOKENS");
        assert_eq!(store.mode(), AuthMode::Disabled);
    }
}
