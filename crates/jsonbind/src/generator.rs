//! Databinding generator: values and bound instances to documents.
//!
//! Generic values emit structurally. Instances emit through their class
//! descriptors: properties in emission order, names escaped, converters
//! applied, and reference-marked properties collapsed to the target's id
//! after its first full occurrence. Sharing an instance between plain slots
//! writes it in full each time; only reference properties take part in the
//! emit-once bookkeeping.

use std::{fmt, sync::Arc};

use crate::{
    descriptor::PropertyDescriptor,
    error::{ConfigError, ConvertError, Error},
    hints::TypeToken,
    refs::EmittedInstances,
    registry::TypeRegistry,
    value::{ObjHandle, Value, write_escaped_string},
};

/// JSON generator bound to a [`TypeRegistry`].
///
/// Stateless between calls; each generate call runs with a fresh emit ledger.
pub struct Generator {
    registry: Arc<TypeRegistry>,
}

impl Generator {
    #[must_use]
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    /// Renders a value as a compact document.
    ///
    /// # Errors
    ///
    /// Fails on non-finite numbers, on accessor or converter failures, and on
    /// instances whose type is not registered.
    pub fn generate(&self, value: &Value) -> Result<String, Error> {
        let mut out = String::new();
        self.write(&mut out, value)?;
        Ok(out)
    }

    /// Renders a value into any [`fmt::Write`] sink.
    ///
    /// # Errors
    ///
    /// See [`generate`](Self::generate); sink failures surface as
    /// [`Error::Sink`].
    pub fn write<W: fmt::Write>(&self, out: &mut W, value: &Value) -> Result<(), Error> {
        let mut emit = Emit {
            registry: self.registry.as_ref(),
            out,
            emitted: EmittedInstances::new(),
        };
        emit.write_value(value)
    }
}

struct Emit<'a, W: fmt::Write> {
    registry: &'a TypeRegistry,
    out: &'a mut W,
    emitted: EmittedInstances,
}

impl<W: fmt::Write> Emit<'_, W> {
    fn write_value(&mut self, value: &Value) -> Result<(), Error> {
        match value {
            Value::Null => self.out.write_str("null")?,
            Value::Boolean(b) => self.out.write_str(if *b { "true" } else { "false" })?,
            Value::Integer(n) => write!(self.out, "{n}")?,
            Value::Decimal(n) => {
                if !n.is_finite() {
                    return Err(Error::Convert(ConvertError::NonFinite(*n)));
                }
                write!(self.out, "{n}")?;
            }
            Value::String(s) => self.write_string(s)?,
            Value::Array(items) => {
                self.out.write_char('[')?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        self.out.write_char(',')?;
                    }
                    self.write_value(item)?;
                }
                self.out.write_char(']')?;
            }
            Value::Object(members) => {
                self.out.write_char('{')?;
                let mut first = true;
                for (name, member) in members {
                    if !first {
                        self.out.write_char(',')?;
                    }
                    first = false;
                    self.write_string(name)?;
                    self.out.write_char(':')?;
                    self.write_value(member)?;
                }
                self.out.write_char('}')?;
            }
            Value::Instance(handle) => {
                self.emitted.first_visit(handle);
                self.write_instance(handle)?;
            }
        }
        Ok(())
    }

    fn write_string(&mut self, s: &str) -> Result<(), Error> {
        self.out.write_char('"')?;
        write_escaped_string(s, self.out)?;
        self.out.write_char('"')?;
        Ok(())
    }

    /// Emits an instance in full through its descriptor.
    fn write_instance(&mut self, handle: &ObjHandle) -> Result<(), Error> {
        let token = TypeToken::from_parts(handle.type_id(), handle.type_name());
        let descriptor = self.registry.descriptor(token)?;

        self.out.write_char('{')?;
        let mut first = true;
        for property in descriptor.properties() {
            let Some(getter) = &property.getter else {
                continue;
            };
            if property.ignore {
                continue;
            }
            let value = getter(handle.as_any()).map_err(Error::Access)?;
            let value = match &property.converter {
                Some(converter) => converter.to_json(value).map_err(Error::Convert)?,
                None => value,
            };
            if property.ignore_if_null && value.is_null() {
                continue;
            }
            if !first {
                self.out.write_char(',')?;
            }
            first = false;
            self.write_string(property.name())?;
            self.out.write_char(':')?;
            if property.is_reference {
                self.write_reference_value(property, &value)?;
            } else {
                self.write_value(&value)?;
            }
        }
        if let Some(reader) = &descriptor.extension_reader {
            for (name, value) in reader(handle.as_any()).map_err(Error::Access)? {
                if !first {
                    self.out.write_char(',')?;
                }
                first = false;
                self.write_string(&name)?;
                self.out.write_char(':')?;
                self.write_value(&value)?;
            }
        }
        self.out.write_char('}')?;
        Ok(())
    }

    /// Emits the value of a reference property: the full object on the
    /// target's first occurrence, its id afterwards. Sequences apply the same
    /// rule per element.
    fn write_reference_value(
        &mut self,
        property: &PropertyDescriptor,
        value: &Value,
    ) -> Result<(), Error> {
        match value {
            Value::Instance(handle) => {
                if self.emitted.first_visit(handle) {
                    self.write_instance(handle)
                } else {
                    self.write_reference_id(property, handle)
                }
            }
            Value::Array(items) => {
                self.out.write_char('[')?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        self.out.write_char(',')?;
                    }
                    self.write_reference_value(property, item)?;
                }
                self.out.write_char(']')?;
                Ok(())
            }
            other => self.write_value(other),
        }
    }

    fn write_reference_id(
        &mut self,
        property: &PropertyDescriptor,
        handle: &ObjHandle,
    ) -> Result<(), Error> {
        let token = TypeToken::from_parts(handle.type_id(), handle.type_name());
        let descriptor = self.registry.descriptor(token)?;
        let id_name = property
            .reference_id_property
            .as_deref()
            .or_else(|| descriptor.id_property());
        let Some(id_name) = id_name else {
            return Err(Error::Config(ConfigError::BadIdProperty {
                ty: handle.type_name(),
                property: property.name().to_owned(),
            }));
        };
        let getter = descriptor
            .property(id_name)
            .and_then(|id_property| id_property.getter.clone());
        let Some(getter) = getter else {
            return Err(Error::Config(ConfigError::BadIdProperty {
                ty: handle.type_name(),
                property: id_name.to_owned(),
            }));
        };
        let id = getter(handle.as_any()).map_err(Error::Access)?;
        self.write_value(&id)
    }
}
