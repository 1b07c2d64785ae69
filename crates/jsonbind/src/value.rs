//! JSON value types and utilities.
//!
//! This module defines the [`Value`] enum, which represents any JSON value
//! plus bound native object instances, and provides helper functions for
//! escaping JSON strings.

use std::{
    any::{Any, TypeId},
    collections::BTreeMap,
    fmt,
    rc::Rc,
};

pub type Map = BTreeMap<String, Value>;
pub type Array = Vec<Value>;

/// A JSON value as defined by [RFC 8259], extended with [`Instance`] for
/// values bound to registered native types.
///
/// Integers and decimals are kept apart: `107` parses as
/// [`Integer`] while `3.1415` and `10e5` parse as [`Decimal`]. An integer
/// literal too large for `i64` falls back to [`Decimal`].
///
/// # Examples
///
/// ```
/// use jsonbind::{Map, Value};
///
/// let mut map = Map::new();
/// map.insert("key".to_string(), Value::String("value".into()));
/// let v = Value::Object(map);
/// assert_eq!(v.to_string(), r#"{"key":"value"}"#);
/// ```
///
/// [RFC 8259]: https://datatracker.ietf.org/doc/html/rfc8259
/// [`Instance`]: Value::Instance
/// [`Integer`]: Value::Integer
/// [`Decimal`]: Value::Decimal
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Array(Array),
    Object(Map),
    Instance(ObjHandle),
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::Array(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Self::Object(v)
    }
}

impl From<ObjHandle> for Value {
    fn from(v: ObjHandle) -> Self {
        Self::Instance(v)
    }
}

impl Value {
    /// Wraps a native value in a fresh [`ObjHandle`].
    pub fn instance<T: Any>(value: T) -> Self {
        Self::Instance(ObjHandle::new(value))
    }

    /// Wraps an already shared native value. Handles built from clones of the
    /// same `Rc` compare equal and count as one object for reference
    /// tracking.
    pub fn shared<T: Any>(value: Rc<T>) -> Self {
        Self::Instance(ObjHandle::from_rc(value))
    }

    /// Returns `true` if the value is [`Null`].
    ///
    /// [`Null`]: Value::Null
    ///
    /// # Examples
    ///
    /// ```
    /// use jsonbind::Value;
    ///
    /// assert!(Value::Null.is_null());
    /// assert!(!Value::Boolean(false).is_null());
    /// ```
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` if the value is [`Boolean`].
    ///
    /// [`Boolean`]: Value::Boolean
    #[must_use]
    pub fn is_bool(&self) -> bool {
        matches!(self, Self::Boolean(..))
    }

    /// Returns `true` if the value is [`Integer`] or [`Decimal`].
    ///
    /// [`Integer`]: Value::Integer
    /// [`Decimal`]: Value::Decimal
    ///
    /// # Examples
    ///
    /// ```
    /// use jsonbind::Value;
    ///
    /// assert!(Value::Integer(42).is_number());
    /// assert!(Value::Decimal(42.0).is_number());
    /// assert!(!Value::Null.is_number());
    /// ```
    #[must_use]
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Integer(..) | Self::Decimal(..))
    }

    /// Returns `true` if the value is [`String`].
    ///
    /// [`String`]: Value::String
    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(self, Self::String(..))
    }

    /// Returns `true` if the value is [`Array`].
    ///
    /// [`Array`]: Value::Array
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(..))
    }

    /// Returns `true` if the value is [`Object`].
    ///
    /// [`Object`]: Value::Object
    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(..))
    }

    /// Returns `true` if the value is [`Instance`].
    ///
    /// [`Instance`]: Value::Instance
    #[must_use]
    pub fn is_instance(&self) -> bool {
        matches!(self, Self::Instance(..))
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the numeric value as `f64`, widening integers.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Decimal(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Self::Object(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_instance(&self) -> Option<&ObjHandle> {
        match self {
            Self::Instance(h) => Some(h),
            _ => None,
        }
    }

    /// Shape label used in conversion and binding error messages.
    #[must_use]
    pub fn type_label(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(..) => "boolean",
            Self::Integer(..) => "integer",
            Self::Decimal(..) => "decimal",
            Self::String(..) => "string",
            Self::Array(..) => "array",
            Self::Object(..) => "object",
            Self::Instance(..) => "instance",
        }
    }
}

/// A shared handle to a native object produced by typed parsing or supplied
/// for generation.
///
/// The handle erases the concrete type; [`downcast`] recovers it. Equality is
/// identity: two handles are equal when they point at the same allocation,
/// which is what reference tracking keys on. Cloning a handle shares the
/// underlying object.
///
/// [`downcast`]: ObjHandle::downcast
#[derive(Clone)]
pub struct ObjHandle {
    name: &'static str,
    id: TypeId,
    inner: Rc<dyn Any>,
}

impl ObjHandle {
    pub fn new<T: Any>(value: T) -> Self {
        Self::from_rc(Rc::new(value))
    }

    pub fn from_rc<T: Any>(value: Rc<T>) -> Self {
        Self {
            name: std::any::type_name::<T>(),
            id: TypeId::of::<T>(),
            inner: value,
        }
    }

    /// Wraps an already erased allocation. The caller guarantees that
    /// `value`'s concrete type is the one `id` and `name` describe.
    pub(crate) fn from_erased(value: Rc<dyn Any>, id: TypeId, name: &'static str) -> Self {
        Self {
            name,
            id,
            inner: value,
        }
    }

    /// The full path name of the wrapped type, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Address of the wrapped allocation. Stable for the lifetime of the
    /// object and shared by all clones of this handle.
    #[must_use]
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.inner).cast::<()>() as usize
    }

    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Recovers the concrete type, sharing ownership with this handle.
    #[must_use]
    pub fn downcast<T: Any>(&self) -> Option<Rc<T>> {
        Rc::clone(&self.inner).downcast().ok()
    }

    #[must_use]
    pub fn as_any(&self) -> &dyn Any {
        &*self.inner
    }
}

impl PartialEq for ObjHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ObjHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjHandle<{}@{:#x}>", self.name, self.identity())
    }
}

/// Escapes a string for inclusion in a JSON string literal.
///
/// Writes to the provided formatter, replacing quotes, backslashes and
/// control characters below U+0020 with their JSON escape sequences. Code
/// points above U+007F are written literally rather than as `\uXXXX`.
pub(crate) fn write_escaped_string<W: fmt::Write>(src: &str, f: &mut W) -> fmt::Result {
    for c in src.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\u{08}' => f.write_str("\\b")?,
            '\u{0C}' => f.write_str("\\f")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c.is_ascii_control() => {
                write!(f, "\\u{:04X}", c as u32)?;
            }
            _ => f.write_char(c)?,
        }
    }
    Ok(())
}

/// Convenience wrapper around [`write_escaped_string`] that returns a
/// `String`.
pub(crate) fn escape_string(src: &str) -> String {
    let mut result = String::with_capacity(src.len() + 2); // +2 for surrounding quotes
    write_escaped_string(src, &mut result).expect("Failed to escape string");
    result
}

/// Structural rendering for diagnostics and plain (untyped) output.
///
/// [`Instance`] values render as a `<type@address>` placeholder; emitting an
/// object graph through its descriptors is the generator's job.
///
/// [`Instance`]: Value::Instance
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => f.write_str(if *b { "true" } else { "false" }),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Decimal(n) => write!(f, "{n}"),
            Value::String(s) => {
                write!(f, "\"{}\"", escape_string(s))
            }
            Value::Array(arr) => {
                f.write_str("[")?;
                let mut first = true;
                for v in arr {
                    if !first {
                        f.write_str(",")?;
                    }
                    first = false;
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
            Value::Object(map) => {
                f.write_str("{")?;
                let mut first = true;
                for (k, v) in map {
                    if !first {
                        f.write_str(",")?;
                    }
                    first = false;
                    write!(f, "\"{}\":{}", escape_string(k), v)?;
                }
                f.write_str("}")
            }
            Value::Instance(h) => write!(f, "<{}@{:#x}>", h.type_name(), h.identity()),
        }
    }
}
