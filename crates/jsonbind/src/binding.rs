//! Type bindings: declared accessor methods and per-property configuration.
//!
//! A [`TypeBinding`] is the raw material the descriptor builder consumes. It
//! records the methods a type declares, by name, together with erased
//! closures that perform the actual reads and writes, plus whatever
//! configuration the type author attached. The builder never sees concrete
//! types; everything is erased behind `dyn Any` at registration time.

use std::{any::Any, marker::PhantomData, sync::Arc};

use indexmap::IndexMap;

use crate::{
    convert::ConverterRef,
    error::AccessError,
    hints::{Target, TypeToken},
    value::Value,
};

/// Reads one property off an erased receiver.
pub(crate) type ReadFn = Arc<dyn Fn(&dyn Any) -> Result<Value, AccessError> + Send + Sync>;

/// Writes or appends one document value into an erased receiver.
pub(crate) type WriteFn = Arc<dyn Fn(&mut dyn Any, Value) -> Result<(), AccessError> + Send + Sync>;

/// Projects an erased receiver onto the base type embedded in it.
pub(crate) type ReadProjection =
    Arc<dyn for<'a> Fn(&'a dyn Any) -> Result<&'a dyn Any, AccessError> + Send + Sync>;

pub(crate) type WriteProjection =
    Arc<dyn for<'a> Fn(&'a mut dyn Any) -> Result<&'a mut dyn Any, AccessError> + Send + Sync>;

/// Builds a fresh instance for the mutable construction path.
pub(crate) type InstantiateFn = Arc<dyn Fn() -> Box<dyn Any> + Send + Sync>;

/// Builds an instance from constructor parameter values in declared order.
pub(crate) type ConstructFn =
    Arc<dyn Fn(&[Value]) -> Result<Box<dyn Any>, AccessError> + Send + Sync>;

/// Stores an unknown member into an open extension slot.
pub(crate) type ExtensionWriteFn =
    Arc<dyn Fn(&mut dyn Any, &str, Value) -> Result<(), AccessError> + Send + Sync>;

/// Lists the members currently held in the extension slot.
pub(crate) type ExtensionReadFn =
    Arc<dyn Fn(&dyn Any) -> Result<Vec<(String, Value)>, AccessError> + Send + Sync>;

/// The two accessor shapes a method can have: a zero-argument read returning
/// a value, or a one-argument write consuming one.
#[derive(Clone)]
pub(crate) enum AccessorFn {
    Read(ReadFn),
    Write(WriteFn),
}

/// One declared method: its name plus the closure implementing it. Whether
/// the method participates as a getter, setter or adder is decided purely
/// from its name by the descriptor builder.
#[derive(Clone)]
pub(crate) struct MethodDecl {
    pub(crate) name: String,
    pub(crate) accessor: AccessorFn,
}

/// Configuration a type author attaches to one logical property.
///
/// Consumed by the descriptor builder; unset fields fall back to the
/// behavior the accessor declarations imply on their own.
#[derive(Debug, Clone, Default)]
pub struct PropertyConfig {
    /// Wire name to use instead of the derived property name.
    pub rename: Option<String>,
    /// Skip the property entirely, both parsing and generating.
    pub ignore: bool,
    /// Skip the property during generation when its value is null.
    pub ignore_if_null: bool,
    /// Emit the property but never bind it while parsing.
    pub read_only: bool,
    /// Explicit emission priority. Higher priorities are emitted first;
    /// properties without one keep discovery order after those that have
    /// one.
    pub priority: Option<i32>,
    /// Hint overriding all other type resolution for this slot.
    pub hint: Option<Target>,
    /// The declared static type of the slot, consulted after hint rules.
    pub declared: Option<Target>,
    /// The declared static type of the elements when the property holds a
    /// container.
    pub element_type: Option<Target>,
    /// Converter applied to the raw parsed value and before emission.
    pub converter: Option<ConverterRef>,
    /// Emit and resolve this property by id instead of by value.
    pub is_reference: bool,
    /// Name of the id-bearing property on the referenced type, overriding
    /// that type's own id property.
    pub reference_id_property: Option<String>,
}

/// One declared constructor parameter: its name, which doubles as the wire
/// name it binds, plus optional slot configuration (hint, element type,
/// converter).
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: String,
    pub config: PropertyConfig,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: PropertyConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: PropertyConfig) -> Self {
        self.config = config;
        self
    }
}

pub(crate) struct BaseDecl {
    pub(crate) token: TypeToken,
    pub(crate) read: ReadProjection,
    pub(crate) write: WriteProjection,
}

pub(crate) struct CtorDecl {
    pub(crate) params: Vec<ParamDecl>,
    pub(crate) construct: ConstructFn,
}

/// Declares how one concrete type binds to JSON.
///
/// Built through [`BindingBuilder`] and registered in a
/// [`TypeRegistry`](crate::registry::TypeRegistry), which erases the
/// concrete type. The registry hands bindings to the descriptor builder on
/// first use.
pub struct TypeBinding {
    pub(crate) token: TypeToken,
    pub(crate) base: Option<BaseDecl>,
    pub(crate) methods: Vec<MethodDecl>,
    pub(crate) configs: IndexMap<String, PropertyConfig>,
    pub(crate) instantiate: Option<InstantiateFn>,
    pub(crate) constructor: Option<CtorDecl>,
    pub(crate) id_property: Option<String>,
    pub(crate) extension_writer: Option<ExtensionWriteFn>,
    pub(crate) extension_reader: Option<ExtensionReadFn>,
}

impl TypeBinding {
    #[must_use]
    pub fn token(&self) -> TypeToken {
        self.token
    }

    #[must_use]
    pub fn base_token(&self) -> Option<TypeToken> {
        self.base.as_ref().map(|b| b.token)
    }
}

/// Typed construction surface for a [`TypeBinding`].
///
/// Method names drive everything downstream: `getX`/`isX` readers become
/// getters, `setX` writers become setters, `addX` writers become adders,
/// and the shared property name is derived by decapitalizing the suffix.
/// Names outside those conventions are ignored by the descriptor builder.
///
/// # Examples
///
/// ```
/// use jsonbind::{BindingBuilder, Value};
///
/// #[derive(Default)]
/// struct Point {
///     x: i64,
/// }
///
/// let binding = BindingBuilder::<Point>::new()
///     .instantiate_default()
///     .reader("getX", |p: &Point| Value::Integer(p.x))
///     .writer("setX", |p: &mut Point, v: Value| {
///         p.x = v.as_i64().unwrap_or_default();
///         Ok(())
///     });
/// ```
pub struct BindingBuilder<T> {
    methods: Vec<MethodDecl>,
    configs: IndexMap<String, PropertyConfig>,
    base: Option<BaseDecl>,
    instantiate: Option<InstantiateFn>,
    constructor: Option<CtorDecl>,
    id_property: Option<String>,
    extension_writer: Option<ExtensionWriteFn>,
    extension_reader: Option<ExtensionReadFn>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any> Default for BindingBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Any> BindingBuilder<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            methods: Vec::new(),
            configs: IndexMap::new(),
            base: None,
            instantiate: None,
            constructor: None,
            id_property: None,
            extension_writer: None,
            extension_reader: None,
            _marker: PhantomData,
        }
    }

    /// Declares a zero-argument method returning a value.
    #[must_use]
    pub fn reader(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&T) -> Value + Send + Sync + 'static,
    ) -> Self {
        let read: ReadFn = Arc::new(move |any| Ok(f(downcast_receiver::<T>(any)?)));
        self.methods.push(MethodDecl {
            name: name.into(),
            accessor: AccessorFn::Read(read),
        });
        self
    }

    /// Declares a one-argument method consuming a document value.
    #[must_use]
    pub fn writer(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&mut T, Value) -> Result<(), AccessError> + Send + Sync + 'static,
    ) -> Self {
        let write: WriteFn = Arc::new(move |any, value| f(downcast_receiver_mut::<T>(any)?, value));
        self.methods.push(MethodDecl {
            name: name.into(),
            accessor: AccessorFn::Write(write),
        });
        self
    }

    /// Attaches configuration to the property derived as `property` (the
    /// decapitalized accessor suffix, before any rename). Configuring a
    /// property no accessor produces fails at descriptor build time.
    #[must_use]
    pub fn configure(mut self, property: impl Into<String>, config: PropertyConfig) -> Self {
        self.configs.insert(property.into(), config);
        self
    }

    /// Declares `B` as the base type of `T`, reachable through the given
    /// projections. Accessors declared on `B` (and its own bases) apply to
    /// `T` instances, with members declared nearer to `T` overriding ones
    /// declared further up.
    #[must_use]
    pub fn extends<B: Any>(
        mut self,
        read: impl for<'a> Fn(&'a T) -> &'a B + Send + Sync + 'static,
        write: impl for<'a> Fn(&'a mut T) -> &'a mut B + Send + Sync + 'static,
    ) -> Self {
        let read_proj: ReadProjection =
            Arc::new(move |any| Ok(read(downcast_receiver::<T>(any)?) as &dyn Any));
        let write_proj: WriteProjection =
            Arc::new(move |any| Ok(write(downcast_receiver_mut::<T>(any)?) as &mut dyn Any));
        self.base = Some(BaseDecl {
            token: TypeToken::of::<B>(),
            read: read_proj,
            write: write_proj,
        });
        self
    }

    /// Provides the factory used to create instances before their members
    /// are bound one by one.
    #[must_use]
    pub fn instantiate_with(mut self, f: impl Fn() -> T + Send + Sync + 'static) -> Self {
        self.instantiate = Some(Arc::new(move || Box::new(f()) as Box<dyn Any>));
        self
    }

    /// Shorthand for [`instantiate_with`](Self::instantiate_with) using
    /// `T::default`.
    #[must_use]
    pub fn instantiate_default(self) -> Self
    where
        T: Default,
    {
        self.instantiate_with(T::default)
    }

    /// Declares an immutable construction path: the document members named
    /// by `params`, in declared order, are collected and handed to `f` in
    /// one call. Every parameter receives a value, null when the document
    /// has no such member.
    #[must_use]
    pub fn constructor(
        mut self,
        params: impl IntoIterator<Item = ParamDecl>,
        f: impl Fn(&[Value]) -> Result<T, AccessError> + Send + Sync + 'static,
    ) -> Self {
        let construct: ConstructFn =
            Arc::new(move |values| f(values).map(|t| Box::new(t) as Box<dyn Any>));
        self.constructor = Some(CtorDecl {
            params: params.into_iter().collect(),
            construct,
        });
        self
    }

    /// Names the property whose value identifies instances of `T` for
    /// reference linking.
    #[must_use]
    pub fn id_property(mut self, property: impl Into<String>) -> Self {
        self.id_property = Some(property.into());
        self
    }

    /// Stores members that match no declared property instead of
    /// discarding them.
    #[must_use]
    pub fn extension_writer(
        mut self,
        f: impl Fn(&mut T, &str, Value) -> Result<(), AccessError> + Send + Sync + 'static,
    ) -> Self {
        self.extension_writer = Some(Arc::new(move |any, name, value| {
            f(downcast_receiver_mut::<T>(any)?, name, value)
        }));
        self
    }

    /// Lists the members held in the extension slot so the generator can
    /// emit them after the declared properties.
    #[must_use]
    pub fn extension_reader(
        mut self,
        f: impl Fn(&T) -> Vec<(String, Value)> + Send + Sync + 'static,
    ) -> Self {
        self.extension_reader = Some(Arc::new(move |any| Ok(f(downcast_receiver::<T>(any)?))));
        self
    }

    pub(crate) fn into_binding(self) -> TypeBinding {
        TypeBinding {
            token: TypeToken::of::<T>(),
            base: self.base,
            methods: self.methods,
            configs: self.configs,
            instantiate: self.instantiate,
            constructor: self.constructor,
            id_property: self.id_property,
            extension_writer: self.extension_writer,
            extension_reader: self.extension_reader,
        }
    }
}

fn downcast_receiver<T: Any>(any: &dyn Any) -> Result<&T, AccessError> {
    any.downcast_ref::<T>().ok_or_else(|| {
        AccessError::new(format!(
            "receiver is not a {}",
            std::any::type_name::<T>()
        ))
    })
}

fn downcast_receiver_mut<T: Any>(any: &mut dyn Any) -> Result<&mut T, AccessError> {
    any.downcast_mut::<T>().ok_or_else(|| {
        AccessError::new(format!(
            "receiver is not a {}",
            std::any::type_name::<T>()
        ))
    })
}

/// Pre-pends a projection chain to an accessor, yielding an accessor that
/// works on the most-derived receiver.
pub(crate) fn compose_read(chain: Vec<ReadProjection>, read: ReadFn) -> ReadFn {
    if chain.is_empty() {
        return read;
    }
    Arc::new(move |any| {
        let mut receiver = any;
        for projection in &chain {
            receiver = projection(receiver)?;
        }
        read(receiver)
    })
}

pub(crate) fn compose_write(chain: Vec<WriteProjection>, write: WriteFn) -> WriteFn {
    if chain.is_empty() {
        return write;
    }
    Arc::new(move |any, value| {
        let mut receiver = any;
        for projection in &chain {
            receiver = projection(receiver)?;
        }
        write(receiver, value)
    })
}

pub(crate) fn compose_extension_write(
    chain: Vec<WriteProjection>,
    write: ExtensionWriteFn,
) -> ExtensionWriteFn {
    if chain.is_empty() {
        return write;
    }
    Arc::new(move |any, name, value| {
        let mut receiver = any;
        for projection in &chain {
            receiver = projection(receiver)?;
        }
        write(receiver, name, value)
    })
}

pub(crate) fn compose_extension_read(
    chain: Vec<ReadProjection>,
    read: ExtensionReadFn,
) -> ExtensionReadFn {
    if chain.is_empty() {
        return read;
    }
    Arc::new(move |any| {
        let mut receiver = any;
        for projection in &chain {
            receiver = projection(receiver)?;
        }
        read(receiver)
    })
}
