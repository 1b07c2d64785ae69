//! Document generation from bound instances: emission order, member
//! suppression, converters and reference collapsing.

use std::{rc::Rc, sync::Arc};

use chrono::DateTime;

use crate::{
    BindingBuilder, ConverterRef, DateConverter, Generator, PropertyConfig, Target, TypeRegistry,
    Value,
};

use super::support::{
    expect_instance, office_registry, register_network, register_profile, Department, Employee,
    Network, Node, Profile,
};

fn render<T: std::any::Any>(registry: TypeRegistry, instance: T) -> String {
    Generator::new(Arc::new(registry))
        .generate(&Value::instance(instance))
        .unwrap()
}

#[test]
fn properties_emit_in_discovery_order() {
    let department = Department {
        name: "R&D".to_owned(),
        head: None,
        members: Vec::new(),
    };
    assert_eq!(
        render(office_registry(), department),
        r#"{"name":"R&D","head":null,"members":[]}"#
    );
}

#[test]
fn nested_instances_emit_in_full() {
    let grace = Rc::new(Employee {
        id: 1,
        name: "Grace".to_owned(),
    });
    let department = Department {
        name: "R&D".to_owned(),
        head: Some(Rc::clone(&grace)),
        members: vec![grace],
    };
    // Plain properties never collapse to ids, shared or not.
    assert_eq!(
        render(office_registry(), department),
        concat!(
            r#"{"name":"R&D","head":{"id":1,"name":"Grace"},"#,
            r#""members":[{"id":1,"name":"Grace"}]}"#
        )
    );
}

#[derive(Debug)]
struct Banner {
    text: String,
    width: i64,
    severity: i64,
}

#[test]
fn explicit_priorities_move_members_ahead() {
    let mut registry = TypeRegistry::new();
    registry
        .register(
            BindingBuilder::<Banner>::new()
                .reader("getText", |b: &Banner| Value::String(b.text.clone()))
                .reader("getWidth", |b: &Banner| Value::Integer(b.width))
                .reader("getSeverity", |b: &Banner| Value::Integer(b.severity))
                .configure(
                    "severity",
                    PropertyConfig {
                        priority: Some(5),
                        ..PropertyConfig::default()
                    },
                ),
        )
        .unwrap();

    let banner = Banner {
        text: "hi".to_owned(),
        width: 80,
        severity: 2,
    };
    assert_eq!(
        render(registry, banner),
        r#"{"severity":2,"text":"hi","width":80}"#
    );
}

#[derive(Debug)]
struct Report {
    title: String,
    note: Option<String>,
    secret: String,
}

fn report_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .register(
            BindingBuilder::<Report>::new()
                .reader("getTitle", |r: &Report| Value::String(r.title.clone()))
                .reader("getNote", |r: &Report| {
                    r.note
                        .as_ref()
                        .map_or(Value::Null, |n| Value::String(n.clone()))
                })
                .reader("getSecret", |r: &Report| Value::String(r.secret.clone()))
                .configure(
                    "note",
                    PropertyConfig {
                        ignore_if_null: true,
                        ..PropertyConfig::default()
                    },
                )
                .configure(
                    "secret",
                    PropertyConfig {
                        ignore: true,
                        ..PropertyConfig::default()
                    },
                ),
        )
        .unwrap();
    registry
}

#[test]
fn ignored_and_null_suppressed_members_stay_out() {
    let report = Report {
        title: "t".to_owned(),
        note: None,
        secret: "classified".to_owned(),
    };
    assert_eq!(render(report_registry(), report), r#"{"title":"t"}"#);

    let report = Report {
        title: "t".to_owned(),
        note: Some("n".to_owned()),
        secret: "classified".to_owned(),
    };
    assert_eq!(
        render(report_registry(), report),
        r#"{"title":"t","note":"n"}"#
    );
}

#[test]
fn converters_render_domain_values() {
    #[derive(Debug)]
    struct Stamp {
        at: chrono::NaiveDateTime,
    }

    let mut registry = TypeRegistry::new();
    registry
        .register_converter_with_id("date", DateConverter::new())
        .unwrap();
    registry
        .register(
            BindingBuilder::<Stamp>::new()
                .reader("getAt", |s: &Stamp| Value::instance(s.at))
                .configure(
                    "at",
                    PropertyConfig {
                        converter: Some(ConverterRef::id("date")),
                        ..PropertyConfig::default()
                    },
                ),
        )
        .unwrap();

    let stamp = Stamp {
        at: DateTime::UNIX_EPOCH.naive_utc(),
    };
    assert_eq!(
        render(registry, stamp),
        r#"{"at":"1970-01-01T00:00:00"}"#
    );
}

#[test]
fn references_emit_once_then_by_id() {
    let alpha = Rc::new(Node {
        id: "a".to_owned(),
        label: "Alpha".to_owned(),
    });
    let beta = Rc::new(Node {
        id: "b".to_owned(),
        label: "Beta".to_owned(),
    });
    let network = Network {
        root: Some(Rc::clone(&alpha)),
        nodes: vec![alpha, beta],
    };

    let mut registry = TypeRegistry::new();
    register_network(&mut registry);
    assert_eq!(
        render(registry, network),
        concat!(
            r#"{"root":{"id":"a","label":"Alpha"},"#,
            r#""nodes":["a",{"id":"b","label":"Beta"}]}"#
        )
    );
}

#[derive(Debug)]
struct Patch {
    main: Rc<Node>,
    alt: Rc<Node>,
}

#[test]
fn reference_ids_follow_the_property_override() {
    let mut registry = TypeRegistry::new();
    register_network(&mut registry);
    registry
        .register(
            BindingBuilder::<Patch>::new()
                .reader("getMain", |p: &Patch| Value::shared(Rc::clone(&p.main)))
                .reader("getAlt", |p: &Patch| Value::shared(Rc::clone(&p.alt)))
                .configure(
                    "main",
                    PropertyConfig {
                        is_reference: true,
                        declared: Some(Target::of::<Node>()),
                        ..PropertyConfig::default()
                    },
                )
                .configure(
                    "alt",
                    PropertyConfig {
                        is_reference: true,
                        reference_id_property: Some("label".to_owned()),
                        declared: Some(Target::of::<Node>()),
                        ..PropertyConfig::default()
                    },
                ),
        )
        .unwrap();

    let node = Rc::new(Node {
        id: "n1".to_owned(),
        label: "hot".to_owned(),
    });
    let patch = Patch {
        main: Rc::clone(&node),
        alt: node,
    };
    // "main" emits the node in full; "alt" collapses to the override member.
    assert_eq!(
        render(registry, patch),
        r#"{"main":{"id":"n1","label":"hot"},"alt":"hot"}"#
    );
}

#[test]
fn extension_members_follow_declared_properties() {
    let mut extras = crate::Map::new();
    extras.insert("city".to_owned(), Value::String("Basel".to_owned()));
    extras.insert("age".to_owned(), Value::Integer(44));
    let profile = Profile {
        name: "n".to_owned(),
        extras,
    };

    let mut registry = TypeRegistry::new();
    register_profile(&mut registry);
    assert_eq!(
        render(registry, profile),
        r#"{"name":"n","age":44,"city":"Basel"}"#
    );
}

#[test]
fn generated_documents_parse_back() {
    let registry = Arc::new(office_registry());
    let generator = Generator::new(Arc::clone(&registry));
    let parser = crate::Parser::new(registry);

    let department = Department {
        name: "R&D".to_owned(),
        head: Some(Rc::new(Employee {
            id: 1,
            name: "Grace".to_owned(),
        })),
        members: Vec::new(),
    };
    let document = generator
        .generate(&Value::instance(department))
        .unwrap();
    let parsed = parser.parse_str_to(&document, Target::of::<Department>());
    let value = parsed.unwrap();
    let reparsed = expect_instance::<Department>(value).unwrap();
    assert_eq!(reparsed.name, "R&D");
    assert_eq!(reparsed.head.as_ref().unwrap().name, "Grace");
}
