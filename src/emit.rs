//! JSON-Schema form of the schema tree.
//!
//! [`emit_document`] writes the dialect marker, optional metadata, the body of
//! the start definition merged into the root, and `definitions`. [`lift_document`]
//! reads that form back. Nodes without a usable discriminator survive as
//! [`SchemaNode::Malformed`] so that they are reported per record instead of
//! failing the whole load.
use indexmap::{IndexMap, IndexSet};
use ordered_float::OrderedFloat;
use serde::Deserialize;
use serde_json::{Map, Number, Value};
use tracing::{debug, warn};

use crate::compile::refs::unresolved_targets;
use crate::error::{Result, RncError};
use crate::ir::{
    ArrayType, Definitions, FacetName, FacetValue, Facets, ObjectType, PrimitiveKind, SchemaDocument, SchemaNode,
    DIALECT,
};
use crate::path_de::{from_str_with_path, from_value_with_path};

// ------------------------------- Emit ------------------------------------- //

pub fn emit_document(doc: &SchemaDocument) -> Value {
    let mut root = Map::new();
    root.insert("$schema".into(), Value::String(DIALECT.into()));
    if let Some(title) = &doc.title {
        root.insert("title".into(), Value::String(title.clone()));
    }
    if let Some(description) = &doc.description {
        root.insert("description".into(), Value::String(description.clone()));
    }
    if let Value::Object(body) = emit_node(&doc.start) {
        root.extend(body);
    }
    let definitions: Map<String, Value> =
        doc.definitions.iter().map(|(name, node)| (name.clone(), emit_node(node))).collect();
    root.insert("definitions".into(), Value::Object(definitions));
    Value::Object(root)
}

pub fn emit_node(node: &SchemaNode) -> Value {
    let mut out = Map::new();
    match node {
        SchemaNode::Primitive { kind, facets } => {
            out.insert("type".into(), Value::String(kind.as_str().into()));
            emit_facets(facets, &mut out);
        }
        SchemaNode::Reference { target, facets } => {
            out.insert("$ref".into(), Value::String(target.clone()));
            emit_facets(facets, &mut out);
        }
        SchemaNode::Object(obj) => {
            out.insert("type".into(), Value::String("object".into()));
            if let Some(properties) = &obj.properties {
                let props = properties.iter().map(|(k, v)| (k.clone(), emit_node(v))).collect();
                out.insert("properties".into(), Value::Object(props));
                let required = obj.required.iter().cloned().map(Value::String).collect();
                out.insert("required".into(), Value::Array(required));
            }
            if let Some(additional) = &obj.additional {
                out.insert("additionalProperties".into(), emit_node(additional));
            }
            emit_facets(&obj.facets, &mut out);
        }
        SchemaNode::Array(arr) => {
            out.insert("type".into(), Value::String("array".into()));
            if let Some(items) = &arr.items {
                out.insert("items".into(), emit_node(items));
            }
            emit_facets(&arr.facets, &mut out);
        }
        SchemaNode::Union(alternatives) => {
            out.insert("oneOf".into(), Value::Array(alternatives.iter().map(emit_node).collect()));
        }
        SchemaNode::Malformed { raw, .. } => return raw.clone(),
    }
    Value::Object(out)
}

fn emit_facets(facets: &Facets, out: &mut Map<String, Value>) {
    for (name, value) in facets.iter() {
        let value = match value {
            FacetValue::Bound(b) => bound_value(b.0),
            FacetValue::Count(n) => Value::from(n),
            FacetValue::Pattern(p) => Value::String(p),
        };
        out.insert(name.as_str().into(), value);
    }
}

/// Whole bounds are written as integers so `minimum: 0` stays `0`, not `0.0`.
fn bound_value(b: f64) -> Value {
    if b.fract() == 0.0 && b.abs() < 9_007_199_254_740_992.0 {
        Value::from(b as i64)
    } else {
        Number::from_f64(b).map(Value::Number).unwrap_or(Value::Null)
    }
}

// ------------------------------- Lift ------------------------------------- //

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "$schema")]
    schema: Option<String>,
    title: Option<String>,
    description: Option<String>,
    #[serde(default)]
    definitions: IndexMap<String, Value>,
    #[serde(flatten)]
    body: Map<String, Value>,
}

/// Reads a compiled document from its JSON text.
pub fn load_document_str(src: &str) -> Result<SchemaDocument> {
    let envelope: Envelope = from_str_with_path(src)?;
    lift_envelope(envelope)
}

pub fn lift_document(value: Value) -> Result<SchemaDocument> {
    let envelope: Envelope = from_value_with_path(value)?;
    lift_envelope(envelope)
}

fn lift_envelope(envelope: Envelope) -> Result<SchemaDocument> {
    match envelope.schema.as_deref() {
        Some(DIALECT) => {}
        found => {
            return Err(RncError::Dialect { found: found.unwrap_or_default().to_string(), expected: DIALECT });
        }
    }
    let definitions: Definitions =
        envelope.definitions.iter().map(|(name, node)| (name.clone(), lift_node(node))).collect();
    let doc = SchemaDocument {
        start: lift_node(&Value::Object(envelope.body)),
        definitions,
        title: envelope.title,
        description: envelope.description,
    };
    for target in unresolved_targets(&doc) {
        warn!(%target, "reference does not resolve in loaded schema");
    }
    debug!(definitions = doc.definitions.len(), "loaded schema document");
    Ok(doc)
}

pub fn lift_node(value: &Value) -> SchemaNode {
    match try_lift(value) {
        Ok(node) => node,
        Err(reason) => SchemaNode::Malformed { reason, raw: value.clone() },
    }
}

fn try_lift(value: &Value) -> std::result::Result<SchemaNode, String> {
    let Value::Object(map) = value else {
        return Err("schema node is not an object".into());
    };
    if let Some(target) = map.get("$ref") {
        let target = target.as_str().ok_or("$ref is not a string")?;
        return Ok(SchemaNode::Reference { target: target.to_string(), facets: lift_facets(map)? });
    }
    if let Some(alternatives) = map.get("oneOf") {
        let alternatives = alternatives.as_array().ok_or("oneOf is not an array")?;
        return Ok(SchemaNode::Union(alternatives.iter().map(lift_node).collect()));
    }
    let Some(kind) = map.get("type") else {
        return Err("schema without type, nor oneOf, nor $ref".into());
    };
    let kind = kind.as_str().ok_or("type is not a string")?;
    match kind {
        "object" => lift_object(map).map(SchemaNode::Object),
        "array" => {
            let items = match map.get("items") {
                Some(items @ Value::Object(_)) => Some(Box::new(lift_node(items))),
                Some(_) => return Err("items is not a schema".into()),
                None => None,
            };
            Ok(SchemaNode::Array(ArrayType { items, facets: lift_facets(map)? }))
        }
        other => match PrimitiveKind::from_name(other) {
            Some(kind) => Ok(SchemaNode::Primitive { kind, facets: lift_facets(map)? }),
            None => Err(format!("unknown type: {other}")),
        },
    }
}

fn lift_object(map: &Map<String, Value>) -> std::result::Result<ObjectType, String> {
    let properties = match map.get("properties") {
        Some(Value::Object(props)) => {
            Some(props.iter().map(|(k, v)| (k.clone(), lift_node(v))).collect::<IndexMap<_, _>>())
        }
        Some(_) => return Err("properties is not an object".into()),
        None => None,
    };
    let required = match map.get("required") {
        Some(Value::Array(names)) => names
            .iter()
            .map(|name| name.as_str().map(str::to_string).ok_or("required holds a non-string"))
            .collect::<std::result::Result<IndexSet<_>, _>>()?,
        Some(_) => return Err("required is not an array".into()),
        None if properties.is_some() => return Err("missing required field alongside properties".into()),
        None => IndexSet::new(),
    };
    let additional = match map.get("additionalProperties") {
        Some(schema @ Value::Object(_)) => Some(Box::new(lift_node(schema))),
        Some(other) => {
            debug!(value = %other, "ignoring non-schema additionalProperties");
            None
        }
        None => None,
    };
    Ok(ObjectType { properties, required, additional, facets: lift_facets(map)? })
}

fn lift_facets(map: &Map<String, Value>) -> std::result::Result<Facets, String> {
    let mut facets = Facets::default();
    for name in FacetName::ALL {
        let Some(raw) = map.get(name.as_str()) else { continue };
        let value = match (name, raw) {
            (FacetName::ExclusiveMinimum | FacetName::ExclusiveMaximum, Value::Bool(_)) => continue,
            (FacetName::Pattern, Value::String(p)) => FacetValue::Pattern(p.clone()),
            (FacetName::Minimum | FacetName::Maximum | FacetName::ExclusiveMinimum | FacetName::ExclusiveMaximum, _) => {
                raw.as_f64().map(|n| FacetValue::Bound(OrderedFloat(n))).ok_or(format!("{name} is not a number"))?
            }
            (FacetName::Pattern, _) => return Err(format!("{name} is not a string")),
            _ => raw.as_u64().map(FacetValue::Count).ok_or(format!("{name} is not a non-negative integer"))?,
        };
        facets.set(name, value);
    }
    legacy_exclusive(map, "exclusiveMinimum", &mut facets.minimum, &mut facets.exclusive_minimum);
    legacy_exclusive(map, "exclusiveMaximum", &mut facets.maximum, &mut facets.exclusive_maximum);
    Ok(facets)
}

/// Older documents qualify `minimum`/`maximum` with a boolean `exclusive*` flag.
/// `true` turns the inclusive bound into the standalone exclusive one.
fn legacy_exclusive(
    map: &Map<String, Value>,
    key: &str,
    inclusive: &mut Option<crate::ir::Bound>,
    exclusive: &mut Option<crate::ir::Bound>,
) {
    let Some(Value::Bool(flag)) = map.get(key) else { return };
    warn!(facet = key, "boolean exclusive bound converted to numeric form");
    if *flag {
        if let Some(bound) = inclusive.take() {
            *exclusive = Some(bound);
        }
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use serde_json::json;

    const PEOPLE: &str = r#"
        # a small but complete schema
        start = {people: [person] @(minItems=1), version?: integer @(minimum=1)}
        person = {name: /[A-Z][a-z]+/, age?: integer @(minimum=0, exclusiveMaximum=150),
                  (email?: string @(maxLength=64), phone?: string)} , {tags?: []}
        'odd/name' = number @(minimum=-2.5) | null
    "#;

    #[test]
    fn emitted_root_merges_start_body() {
        let doc = compile("start = {a: integer, b?: string}").unwrap();
        let value = emit_document(&doc);
        assert_eq!(value["$schema"], DIALECT);
        assert_eq!(value["type"], "object");
        assert_eq!(value["required"], json!(["a"]));
        assert_eq!(value["properties"]["b"], json!({"type": "string"}));
        assert_eq!(value["definitions"]["start"]["type"], "object");
    }

    #[test]
    fn references_and_unions_in_json_form() {
        let doc = compile("start = [item]\nitem = integer @(maximum=3) | 'x y'\n'x y' = null").unwrap();
        let value = emit_document(&doc);
        assert_eq!(value["items"], json!({"$ref": "#/definitions/item"}));
        assert_eq!(
            value["definitions"]["item"],
            json!({"oneOf": [{"type": "integer", "maximum": 3}, {"$ref": "#/definitions/x y"}]})
        );
    }

    #[test]
    fn compiled_document_round_trips_through_text() {
        let mut doc = compile(PEOPLE).unwrap();
        doc.title = Some("Created from JSON-RNC: people.rnc".into());
        let text = crate::pretty::pretty(&emit_document(&doc), true);
        let back = load_document_str(&text).unwrap();
        assert_eq!(back, doc);
        assert_eq!(compile(PEOPLE).unwrap(), compile(PEOPLE).unwrap());
    }

    #[test]
    fn dialect_must_match_exactly() {
        let err = lift_document(json!({"$schema": "http://json-schema.org/schema#", "type": "null"})).unwrap_err();
        assert!(matches!(err, RncError::Dialect { .. }));
        let err = lift_document(json!({"type": "null"})).unwrap_err();
        assert!(matches!(err, RncError::Dialect { found, .. } if found.is_empty()));
    }

    #[test]
    fn shape_errors_carry_the_json_path() {
        let err = load_document_str(r#"{"$schema": 3}"#).unwrap_err();
        assert!(matches!(err, RncError::Document { .. }));
    }

    #[test]
    fn nodes_without_discriminator_are_kept_as_malformed() {
        let doc = lift_document(json!({
            "$schema": DIALECT,
            "type": "object",
            "properties": {"a": {"minimum": 1}, "b": {"type": "date"}},
            "required": ["a"]
        }))
        .unwrap();
        let SchemaNode::Object(obj) = &doc.start else { panic!("object expected") };
        let props = obj.properties.as_ref().unwrap();
        assert!(matches!(&props["a"], SchemaNode::Malformed { reason, .. } if reason.contains("without type")));
        assert!(matches!(&props["b"], SchemaNode::Malformed { reason, .. } if reason == "unknown type: date"));
        assert_eq!(emit_node(&props["a"]), json!({"minimum": 1}));
    }

    #[test]
    fn properties_without_required_are_malformed() {
        let node = lift_node(&json!({"type": "object", "properties": {"a": {"type": "null"}}}));
        assert!(matches!(node, SchemaNode::Malformed { .. }));
    }

    #[test]
    fn legacy_boolean_exclusive_bounds_are_converted() {
        let node = lift_node(&json!({"type": "number", "minimum": 0, "exclusiveMinimum": true, "maximum": 9, "exclusiveMaximum": false}));
        let SchemaNode::Primitive { facets, .. } = node else { panic!("primitive expected") };
        assert_eq!(facets.minimum, None);
        assert_eq!(facets.exclusive_minimum, Some(OrderedFloat(0.0)));
        assert_eq!(facets.maximum, Some(OrderedFloat(9.0)));
        assert_eq!(facets.exclusive_maximum, None);
    }
}
