//! Path matchers selecting type hints by document position.

use std::any::{Any, TypeId};

use regex::Regex;

use crate::{hints::TypeToken, path::ParsePath, registry::TypeRegistry};

/// A predicate over `(parse path, statically known type)` pairs.
///
/// Matchers are stateless; evaluation never mutates them and carries no
/// side effects, so one matcher may serve any number of concurrent parses.
/// Composite matchers short-circuit: [`And`] stops at the first failing
/// operand, [`Or`] at the first succeeding one. `And` of zero operands is
/// vacuously true, `Or` of zero operands is vacuously false.
///
/// All variants except [`Subtype`] look only at the path; `Subtype` is the
/// one variant consulted via the type side of the pair.
///
/// [`And`]: PathMatcher::And
/// [`Or`]: PathMatcher::Or
/// [`Subtype`]: PathMatcher::Subtype
#[derive(Debug, Clone)]
pub enum PathMatcher {
    /// Matches a path equal to the pattern.
    Equals(String),
    /// Matches any path starting with the pattern.
    Prefix(String),
    /// Matches any path ending with the pattern.
    Suffix(String),
    /// Matches paths on which the expression finds a match. Anchor the
    /// expression to match full paths.
    Regex(Regex),
    /// Matches exactly one non-indexed path segment from the document root,
    /// i.e. the immediate values of a root-level map.
    MapValue,
    /// Matches when the statically known type is assignable to the target
    /// type, per the base edges registered on the bindings.
    Subtype(TypeToken),
    /// Matches every position.
    True,
    And(Vec<PathMatcher>),
    Or(Vec<PathMatcher>),
    Not(Box<PathMatcher>),
}

impl PathMatcher {
    pub fn equals(path: impl Into<String>) -> Self {
        Self::Equals(path.into())
    }

    pub fn prefix(path: impl Into<String>) -> Self {
        Self::Prefix(path.into())
    }

    pub fn suffix(path: impl Into<String>) -> Self {
        Self::Suffix(path.into())
    }

    /// Compiles `pattern` into a [`Regex`] matcher.
    ///
    /// # Errors
    ///
    /// Returns the [`regex::Error`] for a pattern that does not compile.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::Regex(Regex::new(pattern)?))
    }

    #[must_use]
    pub fn map_value() -> Self {
        Self::MapValue
    }

    #[must_use]
    pub fn subtype<T: Any>() -> Self {
        Self::Subtype(TypeToken::of::<T>())
    }

    #[must_use]
    pub fn always() -> Self {
        Self::True
    }

    pub fn and(matchers: impl IntoIterator<Item = PathMatcher>) -> Self {
        Self::And(matchers.into_iter().collect())
    }

    pub fn or(matchers: impl IntoIterator<Item = PathMatcher>) -> Self {
        Self::Or(matchers.into_iter().collect())
    }

    #[must_use]
    pub fn not(matcher: PathMatcher) -> Self {
        Self::Not(Box::new(matcher))
    }

    /// Evaluates this matcher against a position.
    #[must_use]
    pub fn matches(&self, path: &ParsePath, query: &TypeQuery<'_>) -> bool {
        match self {
            Self::Equals(pattern) => path.as_str() == pattern,
            Self::Prefix(pattern) => path.as_str().starts_with(pattern.as_str()),
            Self::Suffix(pattern) => path.as_str().ends_with(pattern.as_str()),
            Self::Regex(regex) => regex.is_match(path.as_str()),
            Self::MapValue => is_single_member_segment(path.as_str()),
            Self::Subtype(target) => query.is_assignable_to(target.id()),
            Self::True => true,
            Self::And(matchers) => matchers.iter().all(|m| m.matches(path, query)),
            Self::Or(matchers) => matchers.iter().any(|m| m.matches(path, query)),
            Self::Not(matcher) => !matcher.matches(path, query),
        }
    }
}

/// `.name` with no further descent.
fn is_single_member_segment(path: &str) -> bool {
    match path.strip_prefix('.') {
        Some(rest) => !rest.contains(['.', '[']),
        None => false,
    }
}

/// The type side of a matcher evaluation: the statically known type at the
/// current position, if any, plus the registry answering assignability.
pub struct TypeQuery<'a> {
    registry: &'a TypeRegistry,
    hinted: Option<TypeId>,
}

impl<'a> TypeQuery<'a> {
    #[must_use]
    pub fn new(registry: &'a TypeRegistry, hinted: Option<TypeId>) -> Self {
        Self { registry, hinted }
    }

    #[must_use]
    pub fn hinted(&self) -> Option<TypeId> {
        self.hinted
    }

    /// Whether the statically known type is `base` or registered as a
    /// transitive subtype of it. `false` when no type is statically known.
    #[must_use]
    pub fn is_assignable_to(&self, base: TypeId) -> bool {
        self.hinted
            .is_some_and(|ty| self.registry.is_assignable(ty, base))
    }
}
