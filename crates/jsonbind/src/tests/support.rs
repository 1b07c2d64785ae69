//! Shared fixture model: a small office domain with typed members, adders,
//! reference-linked graph nodes and an open profile type.

use std::rc::Rc;

use crate::{
    AccessError, BindingBuilder, Map, ParamDecl, PropertyConfig, Target, TypeRegistry, Value,
};

#[derive(Debug, Default)]
pub(crate) struct Employee {
    pub(crate) id: i64,
    pub(crate) name: String,
}

#[derive(Debug, Default)]
pub(crate) struct Department {
    pub(crate) name: String,
    pub(crate) head: Option<Rc<Employee>>,
    pub(crate) members: Vec<Rc<Employee>>,
}

#[derive(Debug, Default)]
pub(crate) struct Node {
    pub(crate) id: String,
    pub(crate) label: String,
}

#[derive(Debug, Default)]
pub(crate) struct Network {
    pub(crate) root: Option<Rc<Node>>,
    pub(crate) nodes: Vec<Rc<Node>>,
}

/// Point is only constructible through its constructor binding.
#[derive(Debug, PartialEq)]
pub(crate) struct Point {
    pub(crate) x: f64,
    pub(crate) y: f64,
}

/// Open type: unknown document members survive in `extras`.
#[derive(Debug, Default)]
pub(crate) struct Profile {
    pub(crate) name: String,
    pub(crate) extras: Map,
}

pub(crate) fn expect_instance<T: std::any::Any>(value: Value) -> Result<Rc<T>, AccessError> {
    match value {
        Value::Instance(handle) => handle
            .downcast::<T>()
            .ok_or_else(|| AccessError::new("instance of an unexpected type")),
        other => Err(AccessError::new(format!(
            "expected an instance, found {}",
            other.type_label()
        ))),
    }
}

pub(crate) fn register_employee(registry: &mut TypeRegistry) {
    registry
        .register(
            BindingBuilder::<Employee>::new()
                .instantiate_default()
                .reader("getId", |e: &Employee| Value::Integer(e.id))
                .writer("setId", |e: &mut Employee, v| {
                    e.id = v
                        .as_i64()
                        .ok_or_else(|| AccessError::new("id must be an integer"))?;
                    Ok(())
                })
                .reader("getName", |e: &Employee| Value::String(e.name.clone()))
                .writer("setName", |e: &mut Employee, v| {
                    e.name = v.as_str().unwrap_or_default().to_owned();
                    Ok(())
                })
                .id_property("id"),
        )
        .unwrap();
}

pub(crate) fn register_department(registry: &mut TypeRegistry) {
    registry
        .register(
            BindingBuilder::<Department>::new()
                .instantiate_default()
                .reader("getName", |d: &Department| Value::String(d.name.clone()))
                .writer("setName", |d: &mut Department, v| {
                    d.name = v.as_str().unwrap_or_default().to_owned();
                    Ok(())
                })
                .reader("getHead", |d: &Department| {
                    d.head
                        .as_ref()
                        .map_or(Value::Null, |e| Value::shared(Rc::clone(e)))
                })
                .writer("setHead", |d: &mut Department, v| {
                    d.head = match v {
                        Value::Null => None,
                        other => Some(expect_instance::<Employee>(other)?),
                    };
                    Ok(())
                })
                .reader("getMembers", |d: &Department| {
                    Value::Array(
                        d.members
                            .iter()
                            .map(|e| Value::shared(Rc::clone(e)))
                            .collect(),
                    )
                })
                .writer("addMembers", |d: &mut Department, v| {
                    d.members.push(expect_instance::<Employee>(v)?);
                    Ok(())
                })
                .configure(
                    "head",
                    PropertyConfig {
                        declared: Some(Target::of::<Employee>()),
                        ..PropertyConfig::default()
                    },
                )
                .configure(
                    "members",
                    PropertyConfig {
                        element_type: Some(Target::of::<Employee>()),
                        ..PropertyConfig::default()
                    },
                ),
        )
        .unwrap();
}

pub(crate) fn office_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    register_employee(&mut registry);
    register_department(&mut registry);
    registry
}

pub(crate) fn register_network(registry: &mut TypeRegistry) {
    registry
        .register(
            BindingBuilder::<Node>::new()
                .instantiate_default()
                .reader("getId", |n: &Node| Value::String(n.id.clone()))
                .writer("setId", |n: &mut Node, v| {
                    n.id = v.as_str().unwrap_or_default().to_owned();
                    Ok(())
                })
                .reader("getLabel", |n: &Node| Value::String(n.label.clone()))
                .writer("setLabel", |n: &mut Node, v| {
                    n.label = v.as_str().unwrap_or_default().to_owned();
                    Ok(())
                })
                .id_property("id"),
        )
        .unwrap();
    registry
        .register(
            BindingBuilder::<Network>::new()
                .instantiate_default()
                .reader("getRoot", |n: &Network| {
                    n.root
                        .as_ref()
                        .map_or(Value::Null, |node| Value::shared(Rc::clone(node)))
                })
                .writer("setRoot", |n: &mut Network, v| {
                    n.root = match v {
                        Value::Null => None,
                        other => Some(expect_instance::<Node>(other)?),
                    };
                    Ok(())
                })
                .reader("getNodes", |n: &Network| {
                    Value::Array(
                        n.nodes
                            .iter()
                            .map(|node| Value::shared(Rc::clone(node)))
                            .collect(),
                    )
                })
                .writer("addNodes", |n: &mut Network, v| {
                    n.nodes.push(expect_instance::<Node>(v)?);
                    Ok(())
                })
                .configure(
                    "root",
                    PropertyConfig {
                        is_reference: true,
                        declared: Some(Target::of::<Node>()),
                        ..PropertyConfig::default()
                    },
                )
                .configure(
                    "nodes",
                    PropertyConfig {
                        is_reference: true,
                        element_type: Some(Target::of::<Node>()),
                        ..PropertyConfig::default()
                    },
                ),
        )
        .unwrap();
}

pub(crate) fn register_point(registry: &mut TypeRegistry) {
    registry
        .register(
            BindingBuilder::<Point>::new()
                .reader("getX", |p: &Point| Value::Decimal(p.x))
                .reader("getY", |p: &Point| Value::Decimal(p.y))
                .constructor([ParamDecl::new("x"), ParamDecl::new("y")], |values| {
                    Ok(Point {
                        x: values[0].as_f64().unwrap_or_default(),
                        y: values[1].as_f64().unwrap_or_default(),
                    })
                }),
        )
        .unwrap();
}

pub(crate) fn register_profile(registry: &mut TypeRegistry) {
    registry
        .register(
            BindingBuilder::<Profile>::new()
                .instantiate_default()
                .reader("getName", |p: &Profile| Value::String(p.name.clone()))
                .writer("setName", |p: &mut Profile, v| {
                    p.name = v.as_str().unwrap_or_default().to_owned();
                    Ok(())
                })
                .extension_writer(|p: &mut Profile, name, value| {
                    p.extras.insert(name.to_owned(), value);
                    Ok(())
                })
                .extension_reader(|p: &Profile| {
                    p.extras
                        .iter()
                        .map(|(name, value)| (name.clone(), value.clone()))
                        .collect()
                }),
        )
        .unwrap();
}
