//! Resolved per-type member metadata.
//!
//! A [`ClassDescriptor`] is the flattened, immutable view of a
//! [`TypeBinding`](crate::TypeBinding) chain: accessors classified by naming
//! convention, overrides resolved in favour of the nearer declaration, property
//! configuration applied and converters resolved. Descriptors are pure
//! derivations of registered bindings, so building one twice yields the same
//! result and the registry is free to cache them.

use std::{fmt, sync::Arc};

use indexmap::IndexMap;

use crate::{
    binding::{
        AccessorFn, ConstructFn, ExtensionReadFn, ExtensionWriteFn, InstantiateFn, MethodDecl,
        PropertyConfig, ReadFn, ReadProjection, TypeBinding, WriteFn, WriteProjection,
        compose_extension_read, compose_extension_write, compose_read, compose_write,
    },
    convert::{ConverterRegistry, TypeConverter},
    error::ConfigError,
    hints::{Target, TypeToken},
};

/// One bindable member of a described type.
///
/// Carries the composed accessors (projected through the base chain when the
/// declaration lives on an ancestor) together with the configuration that
/// governs how the member is parsed and generated.
pub struct PropertyDescriptor {
    pub(crate) name: String,
    pub(crate) property: String,
    pub(crate) getter: Option<ReadFn>,
    pub(crate) setter: Option<WriteFn>,
    pub(crate) appendable: bool,
    pub(crate) ignore: bool,
    pub(crate) ignore_if_null: bool,
    pub(crate) read_only: bool,
    pub(crate) priority: Option<i32>,
    pub(crate) hint: Option<Target>,
    pub(crate) declared: Option<Target>,
    pub(crate) element_type: Option<Target>,
    pub(crate) converter: Option<Arc<dyn TypeConverter>>,
    pub(crate) is_reference: bool,
    pub(crate) reference_id_property: Option<String>,
}

impl PropertyDescriptor {
    /// The wire name: the member name as it appears in documents.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The logical property name derived from the accessor names, before any
    /// rename is applied.
    #[must_use]
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Whether a getter was derived for this property.
    #[must_use]
    pub fn readable(&self) -> bool {
        self.getter.is_some()
    }

    /// Whether a setter or adder was derived for this property.
    #[must_use]
    pub fn writable(&self) -> bool {
        self.setter.is_some()
    }

    /// Whether the winning write accessor is an adder, receiving one element
    /// at a time rather than the whole value.
    #[must_use]
    pub fn appendable(&self) -> bool {
        self.appendable
    }

    /// Whether the property is excluded from parsing and generation.
    #[must_use]
    pub fn ignored(&self) -> bool {
        self.ignore
    }

    /// Whether the property is skipped on generation when its value is null.
    #[must_use]
    pub fn ignored_if_null(&self) -> bool {
        self.ignore_if_null
    }

    /// Whether the property is emitted but never bound while parsing.
    #[must_use]
    pub fn read_only(&self) -> bool {
        self.read_only
    }

    /// The explicit emission priority, if one was configured.
    #[must_use]
    pub fn priority(&self) -> Option<i32> {
        self.priority
    }

    /// Whether the property is emitted and parsed by reference id.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        self.is_reference
    }
}

/// Constructor metadata resolved for a described type.
pub(crate) struct CtorDescriptor {
    pub(crate) params: Vec<ParamDescriptor>,
    pub(crate) construct: ConstructFn,
}

/// One constructor parameter, with its hints and converter resolved.
pub(crate) struct ParamDescriptor {
    pub(crate) name: String,
    pub(crate) hint: Option<Target>,
    pub(crate) declared: Option<Target>,
    pub(crate) element_type: Option<Target>,
    pub(crate) converter: Option<Arc<dyn TypeConverter>>,
}

/// The resolved member table of one registered type.
///
/// Iteration order of [`properties`](Self::properties) is emission order:
/// members with an explicit priority first, higher priorities earlier, and
/// everything else in discovery order after them.
pub struct ClassDescriptor {
    token: TypeToken,
    properties: IndexMap<String, PropertyDescriptor>,
    pub(crate) ctor: Option<CtorDescriptor>,
    pub(crate) id_property: Option<String>,
    pub(crate) instantiate: Option<InstantiateFn>,
    pub(crate) extension_writer: Option<ExtensionWriteFn>,
    pub(crate) extension_reader: Option<ExtensionReadFn>,
}

impl ClassDescriptor {
    /// The token of the described type.
    #[must_use]
    pub fn token(&self) -> TypeToken {
        self.token
    }

    /// Looks a property up by its wire name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(name)
    }

    /// All properties in emission order.
    pub fn properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.values()
    }

    /// Number of resolved properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// The wire name of the property whose value identifies instances of this
    /// type in reference cycles, if one was declared.
    #[must_use]
    pub fn id_property(&self) -> Option<&str> {
        self.id_property.as_deref()
    }

    /// Flattens a binding chain into a descriptor.
    ///
    /// `bases` is the ancestor chain nearest first; accessors contributed by
    /// an ancestor are composed with the projections of every link between
    /// the described type and the declaring one.
    pub(crate) fn build(
        binding: &TypeBinding,
        bases: &[Arc<TypeBinding>],
        converters: &ConverterRegistry,
    ) -> Result<Self, ConfigError> {
        let root = binding.token.name();

        let mut merged: IndexMap<String, MergedSlot> = IndexMap::new();
        let mut configs: IndexMap<String, (&'static str, PropertyConfig)> = IndexMap::new();
        let mut id_property = None;
        let mut instantiate = None;
        let mut extension_writer = None;
        let mut extension_reader = None;
        let mut read_chain: Vec<ReadProjection> = Vec::new();
        let mut write_chain: Vec<WriteProjection> = Vec::new();

        for (distance, level) in std::iter::once(binding)
            .chain(bases.iter().map(Arc::as_ref))
            .enumerate()
        {
            for (property, slot) in scan_level(level)? {
                let entry = merged.entry(property).or_default();
                if entry.getter.is_none() {
                    if let Some(read) = slot.getter {
                        entry.getter = Some(compose_read(read_chain.clone(), read));
                    }
                }
                if entry.mutator.is_none() {
                    if let Some((write, appendable)) = slot.mutator {
                        entry.mutator = Some((compose_write(write_chain.clone(), write), appendable));
                    }
                }
            }
            for (property, config) in &level.configs {
                configs
                    .entry(property.clone())
                    .or_insert_with(|| (level.token.name(), config.clone()));
            }
            if id_property.is_none() {
                id_property.clone_from(&level.id_property);
            }
            // Instantiation is not inherited: a base factory cannot produce
            // the described type.
            if distance == 0 {
                instantiate.clone_from(&level.instantiate);
            }
            if extension_writer.is_none() {
                if let Some(write) = &level.extension_writer {
                    extension_writer =
                        Some(compose_extension_write(write_chain.clone(), write.clone()));
                }
            }
            if extension_reader.is_none() {
                if let Some(read) = &level.extension_reader {
                    extension_reader =
                        Some(compose_extension_read(read_chain.clone(), read.clone()));
                }
            }
            if let Some(base) = &level.base {
                read_chain.push(base.read.clone());
                write_chain.push(base.write.clone());
            }
        }

        for (property, (declaring, _)) in &configs {
            if !merged.contains_key(property) {
                return Err(ConfigError::UnknownProperty {
                    ty: declaring,
                    property: property.clone(),
                });
            }
        }

        let mut properties: IndexMap<String, PropertyDescriptor> = IndexMap::new();
        for (property, slot) in merged {
            let config = configs
                .get(&property)
                .map(|(_, config)| config.clone())
                .unwrap_or_default();
            let name = config.rename.clone().unwrap_or_else(|| property.clone());
            let converter = match &config.converter {
                Some(reference) => Some(converters.resolve(reference)?),
                None => None,
            };
            let (setter, appendable) = match slot.mutator {
                Some((write, appendable)) => (Some(write), appendable),
                None => (None, false),
            };
            let descriptor = PropertyDescriptor {
                name: name.clone(),
                property,
                getter: slot.getter,
                setter,
                appendable,
                ignore: config.ignore,
                ignore_if_null: config.ignore_if_null,
                read_only: config.read_only,
                priority: config.priority,
                hint: config.hint,
                declared: config.declared,
                element_type: config.element_type,
                converter,
                is_reference: config.is_reference,
                reference_id_property: config.reference_id_property,
            };
            if properties.insert(name.clone(), descriptor).is_some() {
                return Err(ConfigError::DuplicateWireName { ty: root, name });
            }
        }
        properties.sort_by(|_, a, _, b| emit_rank(a).cmp(&emit_rank(b)));

        let ctor = match &binding.constructor {
            Some(decl) => {
                let mut params = Vec::with_capacity(decl.params.len());
                for param in &decl.params {
                    let clashes = properties.get(&param.name).is_some_and(|existing| {
                        existing.setter.is_some() && !existing.read_only && !existing.ignore
                    });
                    if clashes {
                        return Err(ConfigError::ParameterClash {
                            ty: root,
                            parameter: param.name.clone(),
                        });
                    }
                    let converter = match &param.config.converter {
                        Some(reference) => Some(converters.resolve(reference)?),
                        None => None,
                    };
                    params.push(ParamDescriptor {
                        name: param.name.clone(),
                        hint: param.config.hint,
                        declared: param.config.declared,
                        element_type: param.config.element_type,
                        converter,
                    });
                }
                Some(CtorDescriptor {
                    params,
                    construct: decl.construct.clone(),
                })
            }
            None => None,
        };

        if let Some(property) = &id_property {
            let readable = properties
                .get(property)
                .is_some_and(|descriptor| descriptor.getter.is_some());
            if !readable {
                return Err(ConfigError::BadIdProperty {
                    ty: root,
                    property: property.clone(),
                });
            }
        }

        Ok(Self {
            token: binding.token,
            properties,
            ctor,
            id_property,
            instantiate,
            extension_writer,
            extension_reader,
        })
    }
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("token", &self.token)
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Sort key for emission order. Explicit priorities come first, higher values
/// earlier; the sort is stable, so everything else keeps discovery order.
fn emit_rank(descriptor: &PropertyDescriptor) -> (u8, i64) {
    match descriptor.priority {
        Some(priority) => (0, -i64::from(priority)),
        None => (1, 0),
    }
}

enum Classified {
    Getter(String, ReadFn),
    Setter(String, WriteFn),
    Adder(String, WriteFn),
}

/// Classifies a declared method by its naming convention. Methods outside the
/// `get`/`is`/`set`/`add` conventions, and methods whose accessor shape does
/// not match their prefix, contribute nothing.
fn classify(decl: &MethodDecl) -> Option<Classified> {
    if let Some(suffix) = decl.name.strip_prefix("get") {
        if let (false, AccessorFn::Read(read)) = (suffix.is_empty(), &decl.accessor) {
            return Some(Classified::Getter(decapitalize(suffix), read.clone()));
        }
    } else if let Some(suffix) = decl.name.strip_prefix("is") {
        if let (false, AccessorFn::Read(read)) = (suffix.is_empty(), &decl.accessor) {
            return Some(Classified::Getter(decapitalize(suffix), read.clone()));
        }
    } else if let Some(suffix) = decl.name.strip_prefix("set") {
        if let (false, AccessorFn::Write(write)) = (suffix.is_empty(), &decl.accessor) {
            return Some(Classified::Setter(decapitalize(suffix), write.clone()));
        }
    } else if let Some(suffix) = decl.name.strip_prefix("add") {
        if let (false, AccessorFn::Write(write)) = (suffix.is_empty(), &decl.accessor) {
            return Some(Classified::Adder(decapitalize(suffix), write.clone()));
        }
    }
    None
}

/// Lowercases the first character of a derived property name, except when the
/// name opens with an acronym: if the first two characters are both uppercase
/// the name is kept as declared, so `getURL` derives `URL` while `getName`
/// derives `name`.
fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    if first.is_uppercase() && chars.next().is_some_and(char::is_uppercase) {
        return name.to_owned();
    }
    let mut out = String::with_capacity(name.len());
    out.extend(first.to_lowercase());
    out.push_str(&name[first.len_utf8()..]);
    out
}

#[derive(Default)]
struct LevelSlot {
    getter: Option<ReadFn>,
    mutator: Option<(WriteFn, bool)>,
    saw_setter: bool,
    saw_adder: bool,
}

#[derive(Default)]
struct MergedSlot {
    getter: Option<ReadFn>,
    mutator: Option<(WriteFn, bool)>,
}

/// Collects one binding's own contributions, keyed by derived property name
/// in discovery order. Within a single binding a later declaration replaces
/// an earlier one for the same slot; a setter and an adder for the same
/// property on the same binding is a configuration error.
fn scan_level(binding: &TypeBinding) -> Result<IndexMap<String, LevelSlot>, ConfigError> {
    let mut slots: IndexMap<String, LevelSlot> = IndexMap::new();
    for decl in &binding.methods {
        match classify(decl) {
            Some(Classified::Getter(property, read)) => {
                slots.entry(property).or_default().getter = Some(read);
            }
            Some(Classified::Setter(property, write)) => {
                let slot = slots.entry(property).or_default();
                slot.mutator = Some((write, false));
                slot.saw_setter = true;
            }
            Some(Classified::Adder(property, write)) => {
                let slot = slots.entry(property).or_default();
                slot.mutator = Some((write, true));
                slot.saw_adder = true;
            }
            None => {}
        }
    }
    for (property, slot) in &slots {
        if slot.saw_setter && slot.saw_adder {
            return Err(ConfigError::SetterAdderClash {
                ty: binding.token.name(),
                property: property.clone(),
            });
        }
    }
    Ok(slots)
}
