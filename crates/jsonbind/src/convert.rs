//! Value converters between document and domain representations.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::Arc,
};

use chrono::NaiveDateTime;

use crate::{
    error::{ConfigError, ConvertError},
    hints::TypeToken,
    value::Value,
};

/// A paired transform between a document-level value and a domain-level
/// value.
///
/// `from_json` runs while parsing, on the raw parsed value of the property
/// (string, number, boolean, null, or a nested graph); `to_json` runs while
/// generating, before emission. Implementations are shared configuration and
/// must be stateless with respect to individual parse or generate calls.
pub trait TypeConverter: Send + Sync {
    /// Document value to domain value.
    fn from_json(&self, value: Value) -> Result<Value, ConvertError>;

    /// Domain value to document value.
    fn to_json(&self, value: Value) -> Result<Value, ConvertError>;
}

impl fmt::Debug for dyn TypeConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn TypeConverter")
    }
}

/// Names a converter from property configuration: either a registration id
/// or the concrete converter type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConverterRef {
    Id(String),
    Type(TypeToken),
}

impl ConverterRef {
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    #[must_use]
    pub fn of_type<C: Any>() -> Self {
        Self::Type(TypeToken::of::<C>())
    }
}

/// Converter lookup by id and by concrete converter type.
///
/// At most one instance per concrete converter type may be registered; a
/// second registration is a configuration error, not a runtime fallback.
#[derive(Default)]
pub struct ConverterRegistry {
    by_id: HashMap<String, Arc<dyn TypeConverter>>,
    by_type: HashMap<TypeId, String>,
}

impl ConverterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in converters: [`DateConverter`] under
    /// the id `"date"`.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        // Cannot collide on an empty registry.
        let _ = registry.register_with_id("date", DateConverter::new());
        registry
    }

    /// Registers `converter` under a generated id derived from its type
    /// name. Returns the id.
    ///
    /// # Errors
    ///
    /// [`ConfigError::DuplicateConverterType`] if a converter of the same
    /// concrete type is already registered.
    pub fn register<C>(&mut self, converter: C) -> Result<String, ConfigError>
    where
        C: TypeConverter + Any,
    {
        self.register_with_id(std::any::type_name::<C>(), converter)
    }

    /// Registers `converter` under an explicit id. Returns the id.
    ///
    /// # Errors
    ///
    /// [`ConfigError::DuplicateConverterType`] if a converter of the same
    /// concrete type is already registered,
    /// [`ConfigError::DuplicateConverterId`] if the id is taken.
    pub fn register_with_id<C>(
        &mut self,
        id: impl Into<String>,
        converter: C,
    ) -> Result<String, ConfigError>
    where
        C: TypeConverter + Any,
    {
        let id = id.into();
        let token = TypeToken::of::<C>();
        if self.by_type.contains_key(&token.id()) {
            return Err(ConfigError::DuplicateConverterType(token.name()));
        }
        if self.by_id.contains_key(&id) {
            return Err(ConfigError::DuplicateConverterId(id));
        }
        self.by_type.insert(token.id(), id.clone());
        self.by_id.insert(id.clone(), Arc::new(converter));
        Ok(id)
    }

    #[must_use]
    pub fn by_id(&self, id: &str) -> Option<Arc<dyn TypeConverter>> {
        self.by_id.get(id).cloned()
    }

    #[must_use]
    pub fn by_type<C: Any>(&self) -> Option<Arc<dyn TypeConverter>> {
        self.by_type_id(TypeId::of::<C>())
    }

    #[must_use]
    pub fn by_type_id(&self, ty: TypeId) -> Option<Arc<dyn TypeConverter>> {
        self.by_type.get(&ty).and_then(|id| self.by_id(id))
    }

    /// Resolves a property's converter reference to the registered instance.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownConverter`] if nothing is registered under the
    /// reference.
    pub fn resolve(&self, reference: &ConverterRef) -> Result<Arc<dyn TypeConverter>, ConfigError> {
        match reference {
            ConverterRef::Id(id) => self
                .by_id(id)
                .ok_or_else(|| ConfigError::UnknownConverter(id.clone())),
            ConverterRef::Type(token) => self
                .by_type_id(token.id())
                .ok_or_else(|| ConfigError::UnknownConverter(token.name().to_string())),
        }
    }
}

/// Converts between ISO-ish timestamp strings and [`NaiveDateTime`]
/// instances.
///
/// The default format is `%Y-%m-%dT%H:%M:%S`, so the epoch renders as
/// `1970-01-01T00:00:00`. Null passes through unchanged in both directions.
pub struct DateConverter {
    format: String,
}

impl DateConverter {
    pub const DEFAULT_FORMAT: &'static str = "%Y-%m-%dT%H:%M:%S";

    #[must_use]
    pub fn new() -> Self {
        Self::with_format(Self::DEFAULT_FORMAT)
    }

    pub fn with_format(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }
}

impl Default for DateConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeConverter for DateConverter {
    fn from_json(&self, value: Value) -> Result<Value, ConvertError> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::String(s) => {
                let parsed = NaiveDateTime::parse_from_str(&s, &self.format)
                    .map_err(|e| ConvertError::custom(format!("invalid timestamp {s:?}: {e}")))?;
                Ok(Value::instance(parsed))
            }
            other => Err(ConvertError::Shape {
                expected: "string",
                found: other.type_label(),
            }),
        }
    }

    fn to_json(&self, value: Value) -> Result<Value, ConvertError> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Instance(handle) => {
                let timestamp =
                    handle
                        .downcast::<NaiveDateTime>()
                        .ok_or(ConvertError::TypeMismatch {
                            expected: "chrono::NaiveDateTime",
                        })?;
                Ok(Value::String(timestamp.format(&self.format).to_string()))
            }
            other => Err(ConvertError::Shape {
                expected: "datetime instance",
                found: other.type_label(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;

    struct Doubler;

    impl TypeConverter for Doubler {
        fn from_json(&self, value: Value) -> Result<Value, ConvertError> {
            match value {
                Value::Integer(n) => Ok(Value::Integer(n * 2)),
                other => Err(ConvertError::Shape {
                    expected: "integer",
                    found: other.type_label(),
                }),
            }
        }

        fn to_json(&self, value: Value) -> Result<Value, ConvertError> {
            match value {
                Value::Integer(n) => Ok(Value::Integer(n / 2)),
                other => Err(ConvertError::Shape {
                    expected: "integer",
                    found: other.type_label(),
                }),
            }
        }
    }

    fn epoch() -> NaiveDateTime {
        DateTime::from_timestamp(0, 0).unwrap().naive_utc()
    }

    #[test]
    fn date_converter_renders_epoch() {
        let converter = DateConverter::new();
        let json = converter.to_json(Value::instance(epoch())).unwrap();
        assert_eq!(json, Value::String("1970-01-01T00:00:00".into()));
    }

    #[test]
    fn date_converter_round_trips_epoch() {
        let converter = DateConverter::new();
        let json = converter.to_json(Value::instance(epoch())).unwrap();
        let back = converter.from_json(json).unwrap();
        let handle = back.as_instance().unwrap();
        assert_eq!(*handle.downcast::<NaiveDateTime>().unwrap(), epoch());
    }

    #[test]
    fn date_converter_rejects_wrong_shape() {
        let converter = DateConverter::new();
        assert_eq!(
            converter.from_json(Value::Integer(0)).unwrap_err(),
            ConvertError::Shape {
                expected: "string",
                found: "integer",
            }
        );
        assert!(matches!(
            converter.from_json(Value::String("yesterday".into())),
            Err(ConvertError::Custom(_))
        ));
    }

    #[test]
    fn default_set_includes_the_date_converter() {
        let registry = ConverterRegistry::with_defaults();
        assert!(registry.by_id("date").is_some());
        assert!(registry.by_type::<DateConverter>().is_some());
    }

    #[test]
    fn registration_by_generated_and_explicit_id() {
        let mut registry = ConverterRegistry::new();
        let generated = registry.register(DateConverter::new()).unwrap();
        assert!(registry.by_id(&generated).is_some());
        assert!(registry.by_type::<DateConverter>().is_some());

        let id = registry.register_with_id("doubler", Doubler).unwrap();
        assert_eq!(id, "doubler");
        assert!(registry.by_id("doubler").is_some());
    }

    #[test]
    fn duplicate_concrete_type_is_rejected() {
        let mut registry = ConverterRegistry::new();
        registry.register(DateConverter::new()).unwrap();
        let err = registry
            .register_with_id("other-date", DateConverter::new())
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateConverterType(_)));
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut registry = ConverterRegistry::new();
        registry.register_with_id("x", Doubler).unwrap();
        let err = registry
            .register_with_id("x", DateConverter::new())
            .unwrap_err();
        assert_eq!(err, ConfigError::DuplicateConverterId("x".into()));
    }

    #[test]
    fn references_resolve_by_id_and_type() {
        let mut registry = ConverterRegistry::new();
        registry.register_with_id("date", DateConverter::new()).unwrap();

        assert!(registry.resolve(&ConverterRef::id("date")).is_ok());
        assert!(registry
            .resolve(&ConverterRef::of_type::<DateConverter>())
            .is_ok());
        assert_eq!(
            registry.resolve(&ConverterRef::id("missing")).unwrap_err(),
            ConfigError::UnknownConverter("missing".into())
        );
        assert!(matches!(
            registry.resolve(&ConverterRef::of_type::<Doubler>()),
            Err(ConfigError::UnknownConverter(_))
        ));
    }
}
