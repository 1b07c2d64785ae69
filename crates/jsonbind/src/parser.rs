//! Recursive-descent databinding parser.
//!
//! Documents parse into generic [`Value`] trees by default. Typed slots,
//! arrived at through a call-site target, a matching hint rule or a property
//! configuration, materialize through the registered bindings instead: the
//! parser constructs the receiver, binds members through the descriptor and
//! seals the result into a shared instance. Member lookup is driven by wire
//! names, and unknown members never fail a parse; they land in the extension
//! slot when the type has one and are discarded otherwise.

use std::{any::Any, fmt, io, rc::Rc, sync::Arc};

use crate::{
    descriptor::{ClassDescriptor, CtorDescriptor, PropertyDescriptor},
    error::{ConfigError, ConvertError, Error, ParseError},
    hints::{HintRules, Target, TypeToken},
    matcher::{PathMatcher, TypeQuery},
    options::ParserOptions,
    path::ParsePath,
    refs::{RefKey, ReferenceResolver},
    registry::TypeRegistry,
    source::{CharSource, ReaderSource, StrSource},
    token::{Token, TokenType},
    tokenizer::Tokenizer,
    value::{Map, ObjHandle, Value},
};

const VALUE_STARTERS: &[TokenType] = &[
    TokenType::BraceOpen,
    TokenType::BracketOpen,
    TokenType::String,
    TokenType::Integer,
    TokenType::Decimal,
    TokenType::True,
    TokenType::False,
    TokenType::Null,
];

/// JSON parser bound to a [`TypeRegistry`].
///
/// The parser itself is cheap state: a registry handle, hint rules and
/// options. Every parse call runs with fresh reference bookkeeping, so one
/// parser can be reused across documents.
pub struct Parser {
    registry: Arc<TypeRegistry>,
    hints: HintRules,
    options: ParserOptions,
}

impl Parser {
    #[must_use]
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self::with_options(registry, ParserOptions::default())
    }

    #[must_use]
    pub fn with_options(registry: Arc<TypeRegistry>, options: ParserOptions) -> Self {
        Self {
            registry,
            hints: HintRules::new(),
            options,
        }
    }

    /// Adds a type hint rule. Rules are consulted in insertion order and the
    /// first match wins, so register more specific rules first.
    pub fn add_hint(&mut self, matcher: PathMatcher, target: Target) {
        self.hints.add(matcher, target);
    }

    #[must_use]
    pub fn hints(&self) -> &HintRules {
        &self.hints
    }

    /// Parses a document into a generic value tree.
    ///
    /// # Errors
    ///
    /// Returns the first lexing or structural failure. Input past the root
    /// value is never read, so trailing garbage does not fail the parse.
    pub fn parse_str(&self, source: &str) -> Result<Value, Error> {
        self.parse_source(StrSource::from(source), Target::Any)
    }

    /// Parses a document with an explicit root target.
    ///
    /// # Errors
    ///
    /// See [`parse_str`](Self::parse_str); typed targets additionally surface
    /// configuration and binding failures.
    pub fn parse_str_to(&self, source: &str, target: Target) -> Result<Value, Error> {
        self.parse_source(StrSource::from(source), target)
    }

    /// Parses a document into an instance of a registered type.
    ///
    /// # Errors
    ///
    /// Fails like [`parse_str_to`](Self::parse_str_to), and additionally when
    /// the document root is not an object of the requested type.
    pub fn parse_as<T: Any>(&self, source: &str) -> Result<Rc<T>, Error> {
        let value = self.parse_str_to(source, Target::of::<T>())?;
        if let Value::Instance(handle) = &value {
            if let Some(instance) = handle.downcast::<T>() {
                return Ok(instance);
            }
        }
        Err(Error::Convert(ConvertError::TypeMismatch {
            expected: std::any::type_name::<T>(),
        }))
    }

    /// Parses from a byte reader, decoding UTF-8 incrementally.
    ///
    /// # Errors
    ///
    /// See [`parse_str_to`](Self::parse_str_to); I/O and UTF-8 failures
    /// surface as lexing errors.
    pub fn parse_reader<R: io::Read>(&self, reader: R, target: Target) -> Result<Value, Error> {
        self.parse_source(ReaderSource::new(reader), target)
    }

    /// Parses from any character source with an explicit root target.
    ///
    /// # Errors
    ///
    /// See [`parse_str_to`](Self::parse_str_to).
    pub fn parse_source<S: CharSource>(&self, source: S, target: Target) -> Result<Value, Error> {
        let mut run = Run {
            parser: self,
            tokens: Tokenizer::with_options(source, self.options.tokenizer_options()),
            refs: ReferenceResolver::new(),
        };
        let slot = Slot {
            explicit: (!target.is_any()).then_some(target),
            declared: None,
            element: None,
        };
        run.parse_value(&ParsePath::root(), slot)
    }
}

/// Targets steering one document slot, in descending precedence: the explicit
/// target, then hint rules at the slot's path, then the declared type.
#[derive(Clone, Copy, Default)]
struct Slot {
    explicit: Option<Target>,
    declared: Option<Target>,
    element: Option<Target>,
}

/// State of a single parse call.
struct Run<'p, S: CharSource> {
    parser: &'p Parser,
    tokens: Tokenizer<S>,
    refs: ReferenceResolver,
}

impl<S: CharSource> Run<'_, S> {
    fn parse_value(&mut self, path: &ParsePath, slot: Slot) -> Result<Value, Error> {
        let token = self.tokens.next_token()?;
        match token.token_type() {
            TokenType::BraceOpen => self.parse_object(path, slot),
            TokenType::BracketOpen => self.parse_array(path, slot),
            TokenType::String
            | TokenType::Integer
            | TokenType::Decimal
            | TokenType::True
            | TokenType::False
            | TokenType::Null => Ok(token.into_value()),
            _ => Err(unexpected(token, VALUE_STARTERS, path)),
        }
    }

    /// Resolves the target for a container slot: explicit target, then the
    /// first matching hint rule, then the declared type, then the container
    /// the opening token implies.
    fn resolve_target(&self, path: &ParsePath, slot: Slot, opening: TokenType) -> Target {
        if let Some(target) = slot.explicit {
            return target;
        }
        let registry = self.parser.registry.as_ref();
        let query = TypeQuery::new(registry, slot.declared.and_then(|target| target.type_id()));
        if let Some(target) = self.parser.hints.resolve(path, &query) {
            return target;
        }
        if let Some(target) = slot.declared {
            return target;
        }
        match opening {
            TokenType::BracketOpen => Target::Seq,
            _ => Target::Map,
        }
    }

    fn parse_object(&mut self, path: &ParsePath, slot: Slot) -> Result<Value, Error> {
        match self.resolve_target(path, slot, TokenType::BraceOpen) {
            Target::Typed(token) => self.parse_typed_members(path, token),
            _ => self.parse_map_members(path, slot.element),
        }
    }

    fn parse_array(&mut self, path: &ParsePath, slot: Slot) -> Result<Value, Error> {
        // A typed target on a sequence slot types its elements.
        let element = match self.resolve_target(path, slot, TokenType::BracketOpen) {
            Target::Typed(token) => Some(Target::Typed(token)),
            _ => slot.element,
        };
        let mut items = Vec::new();
        let first = self.tokens.next_token()?;
        if first.is(TokenType::BracketClose) {
            return Ok(Value::Array(items));
        }
        self.tokens.push_back(first);
        loop {
            let child = path.index(items.len());
            let slot = Slot {
                explicit: None,
                declared: element,
                element: None,
            };
            items.push(self.parse_value(&child, slot)?);
            if self.elements_done(path)? {
                break;
            }
        }
        Ok(Value::Array(items))
    }

    fn parse_map_members(&mut self, path: &ParsePath, element: Option<Target>) -> Result<Value, Error> {
        let mut members = Map::new();
        let first = self.tokens.next_token()?;
        if first.is(TokenType::BraceClose) {
            return Ok(Value::Object(members));
        }
        self.tokens.push_back(first);
        loop {
            let name = self.member_name(path)?;
            self.expect(TokenType::Colon, path)?;
            let child = path.member(&name);
            let slot = Slot {
                explicit: None,
                declared: element,
                element: None,
            };
            let value = self.parse_value(&child, slot)?;
            members.insert(name, value);
            if self.members_done(path)? {
                break;
            }
        }
        Ok(Value::Object(members))
    }

    fn parse_typed_members(&mut self, path: &ParsePath, token: TypeToken) -> Result<Value, Error> {
        let descriptor = self.parser.registry.descriptor(token)?;
        if let Some(ctor) = &descriptor.ctor {
            return self.construct_with_params(path, token, &descriptor, ctor);
        }
        let Some(instantiate) = &descriptor.instantiate else {
            return Err(Error::Config(ConfigError::NotInstantiable(token.name())));
        };
        let receiver = instantiate();
        self.populate_instance(path, token, &descriptor, receiver)
    }

    /// Setter-driven construction: members bind as they parse.
    fn populate_instance(
        &mut self,
        path: &ParsePath,
        token: TypeToken,
        descriptor: &ClassDescriptor,
        mut receiver: Box<dyn Any>,
    ) -> Result<Value, Error> {
        let first = self.tokens.next_token()?;
        if !first.is(TokenType::BraceClose) {
            self.tokens.push_back(first);
            loop {
                let name = self.member_name(path)?;
                self.expect(TokenType::Colon, path)?;
                let child = path.member(&name);
                match descriptor.property(&name) {
                    Some(property) if bindable(property) => {
                        self.bind_member(&child, property, receiver.as_mut())?;
                    }
                    known => {
                        // Unknown, ignored and read-only members still parse;
                        // only the unknown ones reach the extension slot.
                        let value = self.parse_value(&child, Slot::default())?;
                        if known.is_none() {
                            if let Some(writer) = &descriptor.extension_writer {
                                writer(receiver.as_mut(), &name, value).map_err(Error::Access)?;
                            }
                        }
                    }
                }
                if self.members_done(path)? {
                    break;
                }
            }
        }
        self.seal(token, descriptor, receiver)
    }

    /// Constructor-driven construction: every member is collected first, the
    /// constructor runs with one value per declared parameter (null when the
    /// document has no such member), and leftover settable members apply
    /// afterwards.
    fn construct_with_params(
        &mut self,
        path: &ParsePath,
        token: TypeToken,
        descriptor: &ClassDescriptor,
        ctor: &CtorDescriptor,
    ) -> Result<Value, Error> {
        let mut params = vec![Value::Null; ctor.params.len()];
        let mut deferred: Vec<(String, ParsePath, Value)> = Vec::new();
        let mut extension: Vec<(String, Value)> = Vec::new();

        let first = self.tokens.next_token()?;
        if !first.is(TokenType::BraceClose) {
            self.tokens.push_back(first);
            loop {
                let name = self.member_name(path)?;
                self.expect(TokenType::Colon, path)?;
                let child = path.member(&name);
                if let Some(position) = ctor.params.iter().position(|param| param.name == name) {
                    let param = &ctor.params[position];
                    let slot = Slot {
                        explicit: param.hint,
                        declared: param.declared,
                        element: param.element_type,
                    };
                    let raw = self.parse_value(&child, slot)?;
                    params[position] = match &param.converter {
                        Some(converter) => converter.from_json(raw).map_err(|err| {
                            Error::Parse(ParseError::Bind {
                                member: name.clone(),
                                path: child.clone(),
                                message: err.to_string(),
                            })
                        })?,
                        None => raw,
                    };
                } else {
                    match descriptor.property(&name) {
                        Some(property) if bindable(property) => {
                            let value = self.parse_bound_value(&child, property)?;
                            deferred.push((name, child, value));
                        }
                        known => {
                            let value = self.parse_value(&child, Slot::default())?;
                            if known.is_none() {
                                extension.push((name, value));
                            }
                        }
                    }
                }
                if self.members_done(path)? {
                    break;
                }
            }
        }

        let mut receiver = (ctor.construct)(&params).map_err(Error::Access)?;
        for (name, child, value) in deferred {
            if let Some(property) = descriptor.property(&name) {
                apply_bound_value(property, receiver.as_mut(), value, &child)?;
            }
        }
        if let Some(writer) = &descriptor.extension_writer {
            for (name, value) in extension {
                writer(receiver.as_mut(), &name, value).map_err(Error::Access)?;
            }
        }
        self.seal(token, descriptor, receiver)
    }

    /// Parses one member value through a property descriptor and binds it.
    fn bind_member(
        &mut self,
        path: &ParsePath,
        property: &PropertyDescriptor,
        receiver: &mut dyn Any,
    ) -> Result<(), Error> {
        let value = self.parse_bound_value(path, property)?;
        apply_bound_value(property, receiver, value, path)
    }

    /// Parses the document value of a bound member. Adder-bound members must
    /// hold a sequence (or null); their elements convert and resolve
    /// individually.
    fn parse_bound_value(
        &mut self,
        path: &ParsePath,
        property: &PropertyDescriptor,
    ) -> Result<Value, Error> {
        if !property.appendable {
            let slot = Slot {
                explicit: property.hint,
                declared: property.declared,
                element: property.element_type,
            };
            let raw = if property.is_reference {
                self.parse_reference(path, slot, property)?
            } else {
                self.parse_value(path, slot)?
            };
            return convert_member(property, raw, path);
        }

        let token = self.tokens.next_token()?;
        match token.token_type() {
            TokenType::Null => return Ok(Value::Null),
            TokenType::BracketOpen => {}
            _ => {
                return Err(unexpected(
                    token,
                    &[TokenType::BracketOpen, TokenType::Null],
                    path,
                ));
            }
        }
        let mut items = Vec::new();
        let first = self.tokens.next_token()?;
        if first.is(TokenType::BracketClose) {
            return Ok(Value::Array(items));
        }
        self.tokens.push_back(first);
        loop {
            let child = path.index(items.len());
            let slot = Slot {
                explicit: None,
                declared: property.element_type,
                element: None,
            };
            let raw = if property.is_reference {
                self.parse_reference(&child, slot, property)?
            } else {
                self.parse_value(&child, slot)?
            };
            items.push(convert_member(property, raw, &child)?);
            if self.elements_done(path)? {
                break;
            }
        }
        Ok(Value::Array(items))
    }

    /// A reference slot holds either the full object (its first occurrence in
    /// document order) or a scalar id pointing at an already sealed instance.
    fn parse_reference(
        &mut self,
        path: &ParsePath,
        slot: Slot,
        property: &PropertyDescriptor,
    ) -> Result<Value, Error> {
        let token = self.tokens.next_token()?;
        match token.token_type() {
            TokenType::Null => Ok(Value::Null),
            TokenType::BraceOpen => {
                let value = self.parse_object(path, slot)?;
                if let (Some(id_name), Value::Instance(handle)) =
                    (&property.reference_id_property, &value)
                {
                    self.record_reference_id(handle, id_name)?;
                }
                Ok(value)
            }
            TokenType::String | TokenType::Integer | TokenType::True | TokenType::False => {
                let id = token.into_value();
                if let Some(key) = RefKey::from_value(&id) {
                    if let Some(handle) = self.refs.lookup(&key) {
                        return Ok(Value::Instance(handle));
                    }
                }
                Err(Error::Parse(ParseError::UnresolvedReference {
                    id,
                    path: path.clone(),
                }))
            }
            _ => Err(unexpected(
                token,
                &[
                    TokenType::BraceOpen,
                    TokenType::String,
                    TokenType::Integer,
                    TokenType::Null,
                ],
                path,
            )),
        }
    }

    /// Registers an instance under the id read through the referring
    /// property's override id property.
    fn record_reference_id(&mut self, handle: &ObjHandle, id_name: &str) -> Result<(), Error> {
        let token = TypeToken::from_parts(handle.type_id(), handle.type_name());
        let descriptor = self.parser.registry.descriptor(token)?;
        let getter = descriptor
            .property(id_name)
            .and_then(|property| property.getter.clone());
        let Some(getter) = getter else {
            return Err(Error::Config(ConfigError::BadIdProperty {
                ty: handle.type_name(),
                property: id_name.to_owned(),
            }));
        };
        let id = getter(handle.as_any()).map_err(Error::Access)?;
        if let Some(key) = RefKey::from_value(&id) {
            self.refs.record(key, handle.clone());
        }
        Ok(())
    }

    /// Freezes a fully bound receiver into a shared instance and registers it
    /// under its id property, when it has one with a scalar value.
    fn seal(
        &mut self,
        token: TypeToken,
        descriptor: &ClassDescriptor,
        receiver: Box<dyn Any>,
    ) -> Result<Value, Error> {
        let handle = ObjHandle::from_erased(Rc::from(receiver), token.id(), token.name());
        if let Some(id_name) = descriptor.id_property() {
            let getter = descriptor
                .property(id_name)
                .and_then(|property| property.getter.clone());
            if let Some(getter) = getter {
                let id = getter(handle.as_any()).map_err(Error::Access)?;
                if let Some(key) = RefKey::from_value(&id) {
                    self.refs.record(key, handle.clone());
                }
            }
        }
        Ok(Value::Instance(handle))
    }

    fn member_name(&mut self, path: &ParsePath) -> Result<String, Error> {
        let token = self.tokens.next_token()?;
        match token.try_into_string() {
            Ok(name) => Ok(name),
            Err(token) => Err(unexpected(token, &[TokenType::String], path)),
        }
    }

    fn expect(&mut self, expected: TokenType, path: &ParsePath) -> Result<(), Error> {
        let token = self.tokens.next_token()?;
        if token.is(expected) {
            Ok(())
        } else {
            Err(unexpected(token, &[expected], path))
        }
    }

    fn members_done(&mut self, path: &ParsePath) -> Result<bool, Error> {
        let token = self.tokens.next_token()?;
        match token.token_type() {
            TokenType::Comma => Ok(false),
            TokenType::BraceClose => Ok(true),
            _ => Err(unexpected(
                token,
                &[TokenType::Comma, TokenType::BraceClose],
                path,
            )),
        }
    }

    fn elements_done(&mut self, path: &ParsePath) -> Result<bool, Error> {
        let token = self.tokens.next_token()?;
        match token.token_type() {
            TokenType::Comma => Ok(false),
            TokenType::BracketClose => Ok(true),
            _ => Err(unexpected(
                token,
                &[TokenType::Comma, TokenType::BracketClose],
                path,
            )),
        }
    }
}

/// Whether a member of the document may bind through this property.
fn bindable(property: &PropertyDescriptor) -> bool {
    property.setter.is_some() && !property.read_only && !property.ignore
}

fn convert_member(
    property: &PropertyDescriptor,
    raw: Value,
    path: &ParsePath,
) -> Result<Value, Error> {
    match &property.converter {
        Some(converter) => converter
            .from_json(raw)
            .map_err(|err| bind_error(property, path, err)),
        None => Ok(raw),
    }
}

/// Applies an already parsed member value through the property's write
/// accessor; adder-bound members apply one element per call.
fn apply_bound_value(
    property: &PropertyDescriptor,
    receiver: &mut dyn Any,
    value: Value,
    path: &ParsePath,
) -> Result<(), Error> {
    let Some(setter) = &property.setter else {
        return Ok(());
    };
    if !property.appendable {
        return setter(receiver, value).map_err(|err| bind_error(property, path, err));
    }
    match value {
        Value::Null => Ok(()),
        Value::Array(items) => {
            for item in items {
                setter(receiver, item).map_err(|err| bind_error(property, path, err))?;
            }
            Ok(())
        }
        other => Err(bind_error(
            property,
            path,
            format!("expected an array, found {}", other.type_label()),
        )),
    }
}

fn bind_error(property: &PropertyDescriptor, path: &ParsePath, message: impl fmt::Display) -> Error {
    Error::Parse(ParseError::Bind {
        member: property.name().to_owned(),
        path: path.clone(),
        message: message.to_string(),
    })
}

fn unexpected(found: Token, expected: &[TokenType], path: &ParsePath) -> Error {
    Error::Parse(ParseError::UnexpectedToken {
        found,
        expected: expected.to_vec(),
        path: path.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> Parser {
        Parser::new(Arc::new(TypeRegistry::new()))
    }

    #[test]
    fn parses_scalars_at_the_root() {
        let parser = parser();
        assert_eq!(parser.parse_str(" \n107").unwrap(), Value::Integer(107));
        assert_eq!(parser.parse_str("3.1415").unwrap(), Value::Decimal(3.1415));
        assert_eq!(
            parser.parse_str("\"quux\"").unwrap(),
            Value::String("quux".to_owned())
        );
        assert_eq!(parser.parse_str("true").unwrap(), Value::Boolean(true));
        assert_eq!(parser.parse_str("null").unwrap(), Value::Null);
    }

    #[test]
    fn parses_nested_generic_structures() {
        let parser = parser();
        let value = parser
            .parse_str(r#"{"name":"n1","rows":[1,[2,3],{"ok":true}],"empty":{}}"#)
            .unwrap();

        let object = value.as_object().unwrap();
        assert_eq!(object["name"], Value::String("n1".to_owned()));
        let rows = object["rows"].as_array().unwrap();
        assert_eq!(rows[0], Value::Integer(1));
        assert_eq!(
            rows[1],
            Value::Array(vec![Value::Integer(2), Value::Integer(3)])
        );
        assert_eq!(
            rows[2].as_object().unwrap()["ok"],
            Value::Boolean(true)
        );
        assert!(object["empty"].as_object().unwrap().is_empty());
    }

    #[test]
    fn reports_missing_separators_with_the_expected_set() {
        let parser = parser();
        let err = parser.parse_str(r#"{"a" 1}"#).unwrap_err();
        match err {
            Error::Parse(ParseError::UnexpectedToken { expected, .. }) => {
                assert_eq!(expected, vec![TokenType::Colon]);
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = parser.parse_str("[1 2]").unwrap_err();
        match err {
            Error::Parse(ParseError::UnexpectedToken { expected, path, .. }) => {
                assert_eq!(expected, vec![TokenType::Comma, TokenType::BracketClose]);
                assert!(path.is_root());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reports_the_path_of_a_nested_failure() {
        let parser = parser();
        let err = parser.parse_str(r#"{"a":{"b":[0,}]}}"#).unwrap_err();
        match err {
            Error::Parse(ParseError::UnexpectedToken { path, .. }) => {
                assert_eq!(path.as_str(), ".a.b[1]");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_input_is_an_unexpected_end() {
        let parser = parser();
        let err = parser.parse_str("   ").unwrap_err();
        match err {
            Error::Parse(ParseError::UnexpectedToken { found, .. }) => {
                assert!(found.is(TokenType::End));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn input_past_the_root_value_is_ignored() {
        let parser = parser();
        assert_eq!(parser.parse_str("107 garbage").unwrap(), Value::Integer(107));
        assert_eq!(
            parser.parse_str(r#"{"a":1} []"#).unwrap().as_object().unwrap()["a"],
            Value::Integer(1)
        );
    }

    #[test]
    fn single_quoted_strings_are_an_option() {
        let registry = Arc::new(TypeRegistry::new());
        let strict = Parser::new(Arc::clone(&registry));
        assert!(strict.parse_str("'x'").is_err());

        let lenient = Parser::with_options(registry, ParserOptions {
            allow_single_quotes: true,
        });
        assert_eq!(
            lenient.parse_str("'x'").unwrap(),
            Value::String("x".to_owned())
        );
    }
}
