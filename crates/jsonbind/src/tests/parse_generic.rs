//! Untargeted parsing: documents become generic value trees.

use std::{io, sync::Arc};

use rstest::*;

use crate::{
    Error, LexErrorKind, Parser, ParserOptions, Target, TypeRegistry, Value,
};

fn parser() -> Parser {
    Parser::new(Arc::new(TypeRegistry::new()))
}

#[rstest]
#[case("107", Value::Integer(107))]
#[case("-12", Value::Integer(-12))]
#[case("0", Value::Integer(0))]
#[case("10e5", Value::Decimal(1_000_000.0))]
#[case("2.5E+2", Value::Decimal(250.0))]
#[case("-0.5", Value::Decimal(-0.5))]
#[case("true", Value::Boolean(true))]
#[case("false", Value::Boolean(false))]
#[case("null", Value::Null)]
fn number_and_keyword_forms(#[case] source: &str, #[case] expected: Value) {
    assert_eq!(parser().parse_str(source).unwrap(), expected);
}

#[test]
fn escape_sequences_decode() {
    let value = parser()
        .parse_str(r#""A\t\"\\\/😀b""#)
        .unwrap();
    assert_eq!(value, Value::String("A\t\"\\/\u{1f600}b".to_owned()));
}

#[test]
fn duplicate_members_keep_the_last_value() {
    let value = parser().parse_str(r#"{"n": 1, "n": 2, "n": 3}"#).unwrap();
    let Value::Object(members) = value else {
        panic!("expected an object");
    };
    assert_eq!(members.len(), 1);
    assert_eq!(members["n"], Value::Integer(3));
}

#[test]
fn reader_sources_reassemble_multibyte_characters() {
    let bytes = "{\"greeting\": \"döner \u{1f32f}\"}".as_bytes().to_vec();
    let value = parser()
        .parse_reader(io::Cursor::new(bytes), Target::Any)
        .unwrap();
    let Value::Object(members) = value else {
        panic!("expected an object");
    };
    assert_eq!(
        members["greeting"],
        Value::String("döner \u{1f32f}".to_owned())
    );
}

#[rstest]
#[case(r#""open"#, LexErrorKind::UnterminatedString)]
#[case(r#""\q""#, LexErrorKind::InvalidEscape('q'))]
#[case(r#""\ud800x""#, LexErrorKind::UnpairedSurrogate(0xD800))]
#[case("tru", LexErrorKind::UnknownKeyword("tru".to_owned()))]
#[case("-", LexErrorKind::MalformedNumber)]
fn lexical_failures_surface(#[case] source: &str, #[case] kind: LexErrorKind) {
    match parser().parse_str(source) {
        Err(Error::Lex(err)) => assert_eq!(err.kind, kind),
        other => panic!("expected a lex error, got {other:?}"),
    }
}

#[test]
fn deep_nesting_parses() {
    let depth = 64;
    let mut source = String::new();
    source.push_str(&"[".repeat(depth));
    source.push('0');
    source.push_str(&"]".repeat(depth));

    let mut value = parser().parse_str(&source).unwrap();
    for _ in 0..depth {
        let Value::Array(mut items) = value else {
            panic!("expected an array");
        };
        assert_eq!(items.len(), 1);
        value = items.pop().unwrap();
    }
    assert_eq!(value, Value::Integer(0));
}

#[test]
fn generic_targets_never_coerce_the_document_shape() {
    // Seq and Map targets pick a container for *matching* documents; a
    // mismatched document still parses by its own shape.
    let value = parser()
        .parse_str_to(r#"{"a": 1}"#, Target::Seq)
        .unwrap();
    assert!(matches!(value, Value::Object(_)));

    let value = parser().parse_str_to("[1, 2]", Target::Map).unwrap();
    assert!(matches!(value, Value::Array(_)));
}

#[test]
fn single_quotes_are_rejected_unless_enabled() {
    let strict = parser();
    match strict.parse_str("'hi'") {
        Err(Error::Lex(err)) => {
            assert_eq!(err.kind, LexErrorKind::UnexpectedCharacter('\''));
        }
        other => panic!("expected a lex error, got {other:?}"),
    }

    let relaxed = Parser::with_options(
        Arc::new(TypeRegistry::new()),
        ParserOptions {
            allow_single_quotes: true,
        },
    );
    assert_eq!(
        relaxed.parse_str("'hi'").unwrap(),
        Value::String("hi".to_owned())
    );
}

#[test]
fn mismatched_closers_report_path_and_expectation() {
    let err = parser().parse_str(r#"{"a": [1, }"#).unwrap_err();
    let Error::Parse(crate::ParseError::UnexpectedToken { path, .. }) = err else {
        panic!("expected an unexpected-token error");
    };
    assert_eq!(path.as_str(), ".a[1]");
}
