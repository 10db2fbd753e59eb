//! Auth bypass rules
//!
//! A [`BypassRule`] exempts requests from the auth check when the request method is
//! one of the rule's methods and the path matches its pattern. Rules are evaluated
//! in configured order and the first match wins.

use std::collections::HashSet;

use http::Method;
use regex::Regex;

use crate::error::ConfigError;

/// Exempts a set of methods on matching paths from authentication
#[derive(Debug, Clone)]
pub struct BypassRule {
    pattern: Regex,
    methods: HashSet<Method>,
}

impl BypassRule {
    /// Compile a rule from a path regex and method names
    ///
    /// The pattern is not anchored implicitly: `/health` also matches `/healthz`.
    /// Use `^/health$` for an exact path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBypassPattern`] if the pattern does not compile
    /// and [`ConfigError::InvalidMethod`] for a malformed method name.
    pub fn new<I, M>(pattern: &str, methods: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = M>,
        M: AsRef<str>,
    {
        let pattern = Regex::new(pattern)?;
        let methods = methods
            .into_iter()
            .map(|m| {
                let name = m.as_ref().trim().to_ascii_uppercase();
                Method::from_bytes(name.as_bytes())
                    .map_err(|_| ConfigError::InvalidMethod(m.as_ref().to_string()))
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { pattern, methods })
    }

    /// Create a rule from an already compiled pattern
    #[must_use]
    pub fn from_parts(pattern: Regex, methods: impl IntoIterator<Item = Method>) -> Self {
        Self {
            pattern,
            methods: methods.into_iter().collect(),
        }
    }

    /// Path pattern of this rule
    #[must_use]
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Whether this rule exempts `method` on `path`
    #[must_use]
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.methods.contains(method) && self.pattern.is_match(path)
    }
}

/// Whether any rule, in order, exempts `method` on `path`
#[must_use]
pub fn can_bypass(rules: &[BypassRule], method: &Method, path: &str) -> bool {
    rules.iter().any(|rule| rule.matches(method, path))
}
