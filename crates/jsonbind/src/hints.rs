//! Type hint rules resolving concrete types per document position.

use std::any::{Any, TypeId};

use crate::{
    matcher::{PathMatcher, TypeQuery},
    path::ParsePath,
};

/// Identity and display name of a Rust type, the unit the hint and
/// descriptor machinery trades in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeToken {
    id: TypeId,
    name: &'static str,
}

impl TypeToken {
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub(crate) fn from_parts(id: TypeId, name: &'static str) -> Self {
        Self { id, name }
    }

    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// What the parser should materialize for a document slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// No expectation: objects become generic maps, arrays become
    /// sequences, primitives bind directly.
    Any,
    /// A generic string-keyed map.
    Map,
    /// A generic sequence.
    Seq,
    /// A concrete type registered in the [`TypeRegistry`].
    ///
    /// [`TypeRegistry`]: crate::registry::TypeRegistry
    Typed(TypeToken),
}

impl Target {
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self::Typed(TypeToken::of::<T>())
    }

    #[must_use]
    pub fn type_token(&self) -> Option<TypeToken> {
        match self {
            Self::Typed(token) => Some(*token),
            _ => None,
        }
    }

    #[must_use]
    pub fn type_id(&self) -> Option<TypeId> {
        self.type_token().map(|t| t.id())
    }

    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::Any
    }
}

/// One `(matcher, target)` pair: positions on which the matcher fires
/// materialize the target type.
#[derive(Debug, Clone)]
pub struct TypeHintRule {
    matcher: PathMatcher,
    target: Target,
}

impl TypeHintRule {
    #[must_use]
    pub fn new(matcher: PathMatcher, target: Target) -> Self {
        Self { matcher, target }
    }

    #[must_use]
    pub fn matcher(&self) -> &PathMatcher {
        &self.matcher
    }

    #[must_use]
    pub fn target(&self) -> Target {
        self.target
    }
}

/// An ordered set of hint rules. Rules are consulted in insertion order and
/// the first match wins, so register more specific rules first.
#[derive(Debug, Clone, Default)]
pub struct HintRules {
    rules: Vec<TypeHintRule>,
}

impl HintRules {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, matcher: PathMatcher, target: Target) {
        self.rules.push(TypeHintRule::new(matcher, target));
    }

    pub fn push(&mut self, rule: TypeHintRule) {
        self.rules.push(rule);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// The target of the first rule matching the position, if any.
    #[must_use]
    pub fn resolve(&self, path: &ParsePath, query: &TypeQuery<'_>) -> Option<Target> {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(path, query))
            .map(|rule| rule.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;

    struct Row;
    struct Cell;

    #[test]
    fn first_matching_rule_wins() {
        let registry = TypeRegistry::new();
        let query = TypeQuery::new(&registry, None);

        let mut rules = HintRules::new();
        rules.add(PathMatcher::prefix(".rows"), Target::of::<Row>());
        rules.add(PathMatcher::always(), Target::of::<Cell>());

        let row = ParsePath::root().member("rows").index(0);
        assert_eq!(rules.resolve(&row, &query), Some(Target::of::<Row>()));

        let other = ParsePath::root().member("header");
        assert_eq!(rules.resolve(&other, &query), Some(Target::of::<Cell>()));
    }

    #[test]
    fn no_match_yields_none() {
        let registry = TypeRegistry::new();
        let query = TypeQuery::new(&registry, None);

        let mut rules = HintRules::new();
        rules.add(PathMatcher::equals(".a"), Target::Map);

        assert_eq!(rules.resolve(&ParsePath::root(), &query), None);
        assert!(HintRules::new()
            .resolve(&ParsePath::root().member("a"), &query)
            .is_none());
    }

    #[test]
    fn targets_expose_type_identity() {
        let t = Target::of::<Row>();
        assert_eq!(t.type_id(), Some(std::any::TypeId::of::<Row>()));
        assert!(Target::Any.type_id().is_none());
        assert!(Target::Any.is_any());
        assert!(!Target::Map.is_any());
    }
}
