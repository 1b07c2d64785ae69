//! The shared registry of type bindings and converters.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use crate::{
    binding::{BindingBuilder, TypeBinding},
    convert::{ConverterRef, ConverterRegistry, TypeConverter},
    descriptor::ClassDescriptor,
    error::ConfigError,
    hints::TypeToken,
};

/// Registry of everything the parser and generator need to know about types:
/// bindings, the converters they refer to and the descriptors derived from
/// them.
///
/// Registration takes `&mut self` and happens up front; afterwards the
/// registry is shared behind an [`Arc`] and only read. Descriptor builds are
/// pure functions of the registered bindings, so the internal cache can be
/// filled lazily from any thread: two threads racing on the same type build
/// the same descriptor and one redundant build is the worst case. Bindings
/// are immutable once registered, so a cached descriptor never goes stale.
pub struct TypeRegistry {
    bindings: HashMap<TypeId, Arc<TypeBinding>>,
    converters: ConverterRegistry,
    cache: RwLock<HashMap<TypeId, Arc<ClassDescriptor>>>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
            converters: ConverterRegistry::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// A registry whose converter set starts from
    /// [`ConverterRegistry::with_defaults`].
    #[must_use]
    pub fn with_default_converters() -> Self {
        Self {
            bindings: HashMap::new(),
            converters: ConverterRegistry::with_defaults(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a type binding.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigError::DuplicateBinding`] if the type already has
    /// one. Bindings cannot be replaced.
    pub fn register<T: Any>(&mut self, builder: BindingBuilder<T>) -> Result<(), ConfigError> {
        let binding = builder.into_binding();
        let token = binding.token();
        if self.bindings.contains_key(&token.id()) {
            return Err(ConfigError::DuplicateBinding(token.name()));
        }
        self.bindings.insert(token.id(), Arc::new(binding));
        Ok(())
    }

    /// Registers a converter under its generated id and returns that id.
    ///
    /// # Errors
    ///
    /// Fails if a converter of the same concrete type is already registered.
    pub fn register_converter<C>(&mut self, converter: C) -> Result<String, ConfigError>
    where
        C: TypeConverter + Any,
    {
        self.converters.register(converter)
    }

    /// Registers a converter under an explicit id.
    ///
    /// # Errors
    ///
    /// Fails if the id or the converter's concrete type is already taken.
    pub fn register_converter_with_id<C>(
        &mut self,
        id: impl Into<String>,
        converter: C,
    ) -> Result<(), ConfigError>
    where
        C: TypeConverter + Any,
    {
        self.converters.register_with_id(id, converter).map(|_| ())
    }

    /// Resolves a converter reference against the registered converters.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigError::UnknownConverter`] if nothing matches.
    pub fn converter(
        &self,
        reference: &ConverterRef,
    ) -> Result<Arc<dyn TypeConverter>, ConfigError> {
        self.converters.resolve(reference)
    }

    /// Whether a binding is registered for the type.
    #[must_use]
    pub fn is_registered(&self, ty: TypeId) -> bool {
        self.bindings.contains_key(&ty)
    }

    /// Whether `ty` is `base` or declares it, directly or transitively,
    /// through its extends chain.
    #[must_use]
    pub fn is_assignable(&self, ty: TypeId, base: TypeId) -> bool {
        if ty == base {
            return true;
        }
        let mut current = ty;
        // The step cap keeps a cyclic extends chain from looping.
        for _ in 0..self.bindings.len() {
            match self.bindings.get(&current).and_then(|b| b.base_token()) {
                Some(token) if token.id() == base => return true,
                Some(token) => current = token.id(),
                None => return false,
            }
        }
        false
    }

    /// The descriptor of a registered type, built on first use and cached.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigError::UnregisteredType`] for unknown types, with
    /// [`ConfigError::UnknownBase`] or [`ConfigError::CyclicExtends`] for
    /// broken extends chains, and with whatever the descriptor build itself
    /// rejects.
    pub fn descriptor(&self, token: TypeToken) -> Result<Arc<ClassDescriptor>, ConfigError> {
        if let Some(found) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&token.id())
        {
            return Ok(Arc::clone(found));
        }

        let Some(binding) = self.bindings.get(&token.id()) else {
            return Err(ConfigError::UnregisteredType(token.name()));
        };
        let mut bases = Vec::new();
        let mut cursor: &TypeBinding = binding;
        while let Some(base) = &cursor.base {
            if bases.len() >= self.bindings.len() {
                return Err(ConfigError::CyclicExtends(token.name()));
            }
            let Some(next) = self.bindings.get(&base.token.id()) else {
                return Err(ConfigError::UnknownBase {
                    ty: cursor.token.name(),
                    base: base.token.name(),
                });
            };
            bases.push(Arc::clone(next));
            cursor = next.as_ref();
        }

        // Built outside the lock; a concurrent build of the same type yields
        // an equal descriptor and the first insert wins.
        let built = Arc::new(ClassDescriptor::build(binding, &bases, &self.converters)?);
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(cache.entry(token.id()).or_insert(built)))
    }

    /// Convenience form of [`descriptor`](Self::descriptor) for a statically
    /// known type.
    ///
    /// # Errors
    ///
    /// See [`descriptor`](Self::descriptor).
    pub fn descriptor_of<T: Any>(&self) -> Result<Arc<ClassDescriptor>, ConfigError> {
        self.descriptor(TypeToken::of::<T>())
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
