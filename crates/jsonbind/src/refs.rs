//! Reference linking between instances of one document.
//!
//! Parsing registers every sealed instance that carries an id property under
//! its id, and resolves scalar ids in reference slots back to those
//! instances. Generation keeps the inverse ledger: the first occurrence of an
//! instance is written in full, every later one collapses to its id.

use std::collections::{HashMap, HashSet};

use crate::value::{ObjHandle, Value};

/// Scalar key under which a materialized instance is registered.
///
/// Decimal ids are not keys: float equality is no basis for identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum RefKey {
    Int(i64),
    Str(String),
    Bool(bool),
}

impl RefKey {
    /// Builds a key from a parsed id value, if the value is a usable scalar.
    pub(crate) fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(n) => Some(Self::Int(*n)),
            Value::String(s) => Some(Self::Str(s.clone())),
            Value::Boolean(b) => Some(Self::Bool(*b)),
            _ => None,
        }
    }
}

/// Parse-side registry of instances by id.
#[derive(Default)]
pub(crate) struct ReferenceResolver {
    seen: HashMap<RefKey, ObjHandle>,
}

impl ReferenceResolver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a sealed instance under its id. A later instance with the
    /// same id replaces the earlier one.
    pub(crate) fn record(&mut self, key: RefKey, handle: ObjHandle) {
        self.seen.insert(key, handle);
    }

    pub(crate) fn lookup(&self, key: &RefKey) -> Option<ObjHandle> {
        self.seen.get(key).cloned()
    }
}

/// Generation-side ledger of instances already written in full.
#[derive(Default)]
pub(crate) struct EmittedInstances {
    seen: HashSet<usize>,
}

impl EmittedInstances {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Marks the instance as written; true exactly on the first visit.
    pub(crate) fn first_visit(&mut self, handle: &ObjHandle) -> bool {
        self.seen.insert(handle.identity())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    #[test]
    fn keys_cover_the_scalar_id_shapes() {
        assert_eq!(
            RefKey::from_value(&Value::Integer(42)),
            Some(RefKey::Int(42))
        );
        assert_eq!(
            RefKey::from_value(&Value::String("a-1".to_owned())),
            Some(RefKey::Str("a-1".to_owned()))
        );
        assert_eq!(
            RefKey::from_value(&Value::Boolean(true)),
            Some(RefKey::Bool(true))
        );
        assert_eq!(RefKey::from_value(&Value::Null), None);
        assert_eq!(RefKey::from_value(&Value::Decimal(1.5)), None);
        assert_eq!(RefKey::from_value(&Value::Array(Vec::new())), None);
    }

    #[test]
    fn resolver_returns_the_latest_instance_per_id() {
        let mut resolver = ReferenceResolver::new();
        let first = ObjHandle::new(17_i64);
        let second = ObjHandle::new(18_i64);

        resolver.record(RefKey::Int(1), first.clone());
        assert_eq!(resolver.lookup(&RefKey::Int(1)), Some(first));

        resolver.record(RefKey::Int(1), second.clone());
        assert_eq!(resolver.lookup(&RefKey::Int(1)), Some(second));
        assert_eq!(resolver.lookup(&RefKey::Int(2)), None);
    }

    #[test]
    fn first_visit_is_true_once_per_instance() {
        let shared = Rc::new(5_i64);
        let one = ObjHandle::from_rc(Rc::clone(&shared));
        let two = ObjHandle::from_rc(shared);
        let other = ObjHandle::new(5_i64);

        let mut emitted = EmittedInstances::new();
        assert!(emitted.first_visit(&one));
        assert!(!emitted.first_visit(&two));
        assert!(emitted.first_visit(&other));
    }
}
