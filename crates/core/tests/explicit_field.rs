//! Explicit fields across a type hierarchy: key names, aliases, defaults,
//! constraints and how a subtype's settings combine with its parent's.

use std::sync::Arc;

use serde_json::json;
use yoml_core::{
    ConvertError, DocumentNode, ExplicitField, InMemoryTypeRegistry, Object, TypeInfo, Value, Yoml,
};

const SIMPLE_IN: &str = "{ name: diamond, fields: { color: black } }";
const EXTENDED_IN_1: &str =
    "{ type: shape-with-size, shape-w-size-name: diamond, size: 2, fields: { color: black } }";

fn doc(yaml: &str) -> DocumentNode {
    serde_yaml::from_str(yaml).unwrap()
}

fn keys(node: &DocumentNode) -> Vec<String> {
    node.as_mapping().unwrap().keys().cloned().collect()
}

fn shape(name: Option<&str>, color: Option<&str>) -> Value {
    let mut obj = Object::new("shape");
    if let Some(n) = name {
        obj.set_field("name", Value::from(n));
    }
    if let Some(c) = color {
        obj.set_field("color", Value::from(c));
    }
    Value::Object(obj)
}

fn shape_with_size(name: &str, size: i64) -> Value {
    Value::Object(
        Object::new("shape-with-size")
            .with("name", name)
            .with("size", size)
            .with("color", "black"),
    )
}

fn shape_type(field: ExplicitField) -> TypeInfo {
    TypeInfo::new("shape")
        .attribute("name", "string")
        .attribute("color", "string")
        .no_args_constructor()
        .serializer(field)
}

fn engine(types: Vec<TypeInfo>) -> Yoml {
    let mut reg = InMemoryTypeRegistry::new();
    for t in types {
        reg.register(t);
    }
    Yoml::new(Arc::new(reg))
}

fn common() -> ExplicitField {
    ExplicitField::new("name").key_name("shape-name").alias("my-name")
}

fn bob() -> serde_json::Value {
    json!({"type": "string", "value": "bob"})
}

/// `shape` with the common name field plus default, and `shape-with-size`
/// adding `extras` ahead of its own size field.
fn extended(extras: Vec<ExplicitField>) -> Yoml {
    let mut sws = TypeInfo::new("shape-with-size")
        .extends("shape")
        .attribute("size", "int");
    for extra in extras {
        sws = sws.serializer(extra);
    }
    sws = sws.serializer(ExplicitField::new("size").alias("shape-size"));
    engine(vec![shape_type(common().default_value(bob())), sws])
}

fn assert_err_contains(err: ConvertError, parts: &[&str]) {
    let msg = err.to_string();
    for part in parts {
        assert!(msg.contains(part), "'{}' missing from: {}", part, msg);
    }
}

// ──────────────────────────────────────────────
// Simple and common fields
// ──────────────────────────────────────────────

#[test]
fn simple_field_round_trips() {
    let y = engine(vec![shape_type(ExplicitField::new("name"))]);
    let diamond = shape(Some("diamond"), Some("black"));
    assert_eq!(y.read(doc(SIMPLE_IN), Some("shape")).unwrap(), diamond);

    let out = y.write(&diamond, Some("shape")).unwrap();
    assert_eq!(out, doc(SIMPLE_IN));
    assert_eq!(keys(&out), vec!["name", "fields"]);
}

#[test]
fn simple_field_alone() {
    let y = engine(vec![shape_type(ExplicitField::new("name"))]);
    let v = y.read(doc("{ name: diamond }"), Some("shape")).unwrap();
    assert_eq!(v, shape(Some("diamond"), None));
    assert_eq!(y.write(&v, Some("shape")).unwrap(), doc("{ name: diamond }"));
}

#[test]
fn simple_field_with_type_key() {
    let y = engine(vec![shape_type(ExplicitField::new("name"))]);
    let input = doc("{ type: shape, name: diamond, fields: { color: black } }");
    let diamond = shape(Some("diamond"), Some("black"));
    assert_eq!(y.read(input.clone(), None).unwrap(), diamond);
    let out = y.write(&diamond, None).unwrap();
    assert_eq!(out, input);
    assert_eq!(keys(&out), vec!["type", "name", "fields"]);
}

#[test]
fn key_name_is_read_and_written() {
    let y = engine(vec![shape_type(common())]);
    let input = doc("{ shape-name: diamond, fields: { color: black } }");
    let diamond = shape(Some("diamond"), Some("black"));
    assert_eq!(y.read(input.clone(), Some("shape")).unwrap(), diamond);
    assert_eq!(y.write(&diamond, Some("shape")).unwrap(), input);
}

#[test]
fn alias_is_read_but_key_name_written() {
    let y = engine(vec![shape_type(common())]);
    let diamond = shape(Some("diamond"), Some("black"));
    let v = y
        .read(doc("{ my-name: diamond, fields: { color: black } }"), Some("shape"))
        .unwrap();
    assert_eq!(v, diamond);
    assert_eq!(
        y.write(&diamond, Some("shape")).unwrap(),
        doc("{ shape-name: diamond, fields: { color: black } }")
    );
}

#[test]
fn default_value_fills_and_is_omitted() {
    let y = engine(vec![shape_type(common().default_value(bob()))]);
    let input = doc("{ fields: { color: black } }");
    let bobbed = shape(Some("bob"), Some("black"));
    assert_eq!(y.read(input.clone(), Some("shape")).unwrap(), bobbed);
    assert_eq!(y.write(&bobbed, Some("shape")).unwrap(), input);

    // a non-default value is still written
    let diamond = shape(Some("diamond"), Some("black"));
    let out = y.write(&diamond, Some("shape")).unwrap();
    assert_eq!(out, doc("{ shape-name: diamond, fields: { color: black } }"));
}

#[test]
fn fields_bucket_value_wins_over_default() {
    let y = engine(vec![shape_type(common().default_value(bob()))]);
    let v = y
        .read(doc("{ fields: { name: diamond, color: black } }"), Some("shape"))
        .unwrap();
    assert_eq!(v, shape(Some("diamond"), Some("black")));

    // the same syntax without a default
    let y = engine(vec![shape_type(common())]);
    let v = y
        .read(doc("{ fields: { name: diamond, color: black } }"), Some("shape"))
        .unwrap();
    assert_eq!(v, shape(Some("diamond"), Some("black")));
}

#[test]
fn absent_optional_field_stays_unset() {
    let y = engine(vec![shape_type(common())]);
    let input = doc("{ fields: { color: black } }");
    let v = y.read(input.clone(), Some("shape")).unwrap();
    assert_eq!(v, shape(None, Some("black")));
    assert_eq!(y.write(&v, Some("shape")).unwrap(), input);
}

#[test]
fn missing_required_field_fails() {
    let y = engine(vec![shape_type(common().required())]);
    let err = y
        .read(doc("{ fields: { color: black } }"), Some("shape"))
        .unwrap_err();
    assert_err_contains(err, &["name", "required"]);
}

#[test]
fn required_field_satisfied_through_fields_bucket() {
    let y = engine(vec![shape_type(common().required())]);
    let v = y
        .read(doc("{ fields: { name: diamond, color: black } }"), Some("shape"))
        .unwrap();
    assert_eq!(v, shape(Some("diamond"), Some("black")));
}

#[test]
fn alias_and_key_name_together_conflict() {
    let y = engine(vec![shape_type(common())]);
    let err = y
        .read(
            doc("{ my-name: name-from-alias, shape-name: name-from-key }"),
            Some("shape"),
        )
        .unwrap_err();
    assert_err_contains(err, &["name-from-alias", "name-from-key", "my-name"]);
}

#[test]
fn field_set_explicitly_cannot_be_repeated_in_bucket() {
    let y = engine(vec![shape_type(common())]);
    let err = y
        .read(
            doc("{ shape-name: diamond, fields: { name: other } }"),
            Some("shape"),
        )
        .unwrap_err();
    assert_err_contains(err, &["fields", "other"]);
}

#[test]
fn redeclared_field_is_handled_once() {
    let y = engine(vec![TypeInfo::new("shape")
        .attribute("name", "string")
        .no_args_constructor()
        .serializer(ExplicitField::new("name").alias("label"))
        .serializer(ExplicitField::new("name").alias("title"))]);
    let v = y.read(doc("{ title: diamond }"), Some("shape")).unwrap();
    assert_eq!(v, shape(Some("diamond"), None));
}

// ──────────────────────────────────────────────
// Hierarchy
// ──────────────────────────────────────────────

#[test]
fn subtype_collects_parent_serializers() {
    let y = extended(vec![ExplicitField::new("name").key_name("shape-w-size-name")]);
    assert_eq!(y.registry().serializers_for("shape-with-size").len(), 3);
}

#[test]
fn subtype_key_name_overrides_parent() {
    let y = extended(vec![ExplicitField::new("name").key_name("shape-w-size-name")]);
    let expected = shape_with_size("diamond", 2);
    assert_eq!(y.read(doc(EXTENDED_IN_1), None).unwrap(), expected);

    let out = y.write(&expected, Some("shape")).unwrap();
    assert_eq!(out, doc(EXTENDED_IN_1));
    assert_eq!(keys(&out), vec!["type", "shape-w-size-name", "size", "fields"]);
}

#[test]
fn inherited_alias_still_works() {
    let y = extended(vec![ExplicitField::new("name").key_name("shape-w-size-name")]);
    let v = y
        .read(
            doc("{ type: shape-with-size, my-name: diamond, size: 2, fields: { color: black } }"),
            None,
        )
        .unwrap();
    assert_eq!(v, shape_with_size("diamond", 2));
}

#[test]
fn overridden_parent_key_name_is_left_over() {
    let y = extended(vec![ExplicitField::new("name").key_name("shape-w-size-name")]);
    let err = y
        .read(
            doc("{ type: shape-with-size, shape-name: diamond, size: 2, fields: { color: black } }"),
            None,
        )
        .unwrap_err();
    assert_err_contains(err, &["shape-name", "diamond"]);
}

#[test]
fn subtype_alias_adds_to_inherited_key_name() {
    let y = extended(vec![ExplicitField::new("name").alias("new-name")]);
    let expected = shape_with_size("diamond", 2);
    for key in ["shape-name", "new-name", "my-name"] {
        let input = format!(
            "{{ type: shape-with-size, {}: diamond, size: 2, fields: {{ color: black }} }}",
            key
        );
        assert_eq!(y.read(doc(&input), None).unwrap(), expected, "via {}", key);
    }
    let out = y.write(&expected, None).unwrap();
    assert_eq!(
        out,
        doc("{ type: shape-with-size, shape-name: diamond, size: 2, fields: { color: black } }")
    );
}

#[test]
fn subtype_default_is_applied_and_omitted() {
    let y = extended(vec![ExplicitField::new("name").default_value(bob())]);
    let bobbed = shape_with_size("bob", 2);
    let out = y.write(&bobbed, Some("shape-with-size")).unwrap();
    assert_eq!(out, doc("{ size: 2, fields: { color: black } }"));
    assert_eq!(y.read(out, Some("shape-with-size")).unwrap(), bobbed);
}

#[test]
fn disinherited_aliases_are_not_recognised() {
    let y = extended(vec![ExplicitField::new("name")
        .key_name("shape-w-size-name")
        .aliases_inherited(false)]);
    let err = y
        .read(
            doc("{ type: shape-with-size, my-name: diamond, size: 2, fields: { color: black } }"),
            None,
        )
        .unwrap_err();
    assert_err_contains(err, &["my-name", "diamond"]);
}

#[test]
fn field_name_serves_as_alias() {
    let y = extended(vec![ExplicitField::new("name").key_name("shape-w-size-name")]);
    let v = y
        .read(
            doc("{ type: shape-with-size, name: diamond, size: 2, fields: { color: black } }"),
            None,
        )
        .unwrap();
    assert_eq!(v, shape_with_size("diamond", 2));
    assert_eq!(y.write(&v, Some("shape")).unwrap(), doc(EXTENDED_IN_1));
}

#[test]
fn strict_aliases_exclude_field_name() {
    let y = extended(vec![ExplicitField::new("name")
        .key_name("shape-w-size-name")
        .aliases_strict(true)]);
    let err = y
        .read(
            doc("{ type: shape-with-size, name: diamond, size: 2, fields: { color: black } }"),
            None,
        )
        .unwrap_err();
    assert_err_contains(err, &["name", "diamond"]);
}

#[test]
fn mangled_key_matches() {
    let y = extended(vec![ExplicitField::new("name").key_name("shape-w-size-name")]);
    let v = y
        .read(
            doc("{ type: shape-with-size, shapeWSize_Name: diamond, size: 2, fields: { color: black } }"),
            None,
        )
        .unwrap();
    assert_eq!(v, shape_with_size("diamond", 2));
}

#[test]
fn strict_aliases_exclude_mangled_keys() {
    let y = extended(vec![ExplicitField::new("name")
        .key_name("shape-w-size-name")
        .aliases_strict(true)]);
    let err = y
        .read(
            doc("{ type: shape-with-size, shapeWSize_Name: diamond, size: 2, fields: { color: black } }"),
            None,
        )
        .unwrap_err();
    assert_err_contains(err, &["shapeWSize_Name"]);
}

#[test]
fn field_errors_carry_key_path() {
    let y = extended(vec![]);
    let err = y
        .read(doc("{ type: shape-with-size, shape-size: big }"), None)
        .unwrap_err();
    assert_eq!(err.path, "shape-size");
}
