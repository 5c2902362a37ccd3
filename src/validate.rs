//! Recursive validation of JSON values against a compiled schema.
//!
//! Every failure becomes a [`Diagnostic`]; nothing here aborts. References are
//! resolved on first use and remembered in a per-validator cache kept beside the
//! schema tree, which itself is never touched.
pub mod deref;
pub mod facets;

use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;
use tracing::trace;

use crate::diag::{show_val, Diagnostic, Issue, Selector, DETAIL_WIDTH};
use crate::ir::{ArrayType, Facets, ObjectType, PrimitiveKind, SchemaDocument, SchemaNode};

/// Consecutive references followed without consuming any part of the value.
pub const MAX_REFERENCE_HOPS: usize = 64;

// ------------------------------ Front API --------------------------------- //

/// Diagnostics for `value` against `schema`, in traversal order; empty when it conforms.
pub fn validate(schema: &SchemaNode, doc: &SchemaDocument, value: &Value) -> Vec<Diagnostic> {
    let mut validator = Validator::new(doc);
    let mut out = Vec::new();
    validator.node(schema, value, &mut Vec::new(), &mut out);
    out
}

pub struct Validator<'s> {
    doc: &'s SchemaDocument,
    resolved: HashMap<&'s str, Result<&'s SchemaNode, String>>,
    patterns: HashMap<&'s str, Result<Regex, String>>,
    /// References followed since the last field or element descent.
    active: Vec<&'s str>,
}

impl<'s> Validator<'s> {
    pub fn new(doc: &'s SchemaDocument) -> Self {
        Self { doc, resolved: HashMap::new(), patterns: HashMap::new(), active: Vec::new() }
    }

    /// Validates `value` against the document's start definition.
    pub fn validate(&mut self, value: &Value) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        self.active.clear();
        let doc = self.doc;
        self.node(&doc.start, value, &mut Vec::new(), &mut out);
        out
    }

    // ------------------------------ nodes --------------------------------- //

    fn node(&mut self, node: &'s SchemaNode, value: &Value, path: &mut Vec<Selector>, out: &mut Vec<Diagnostic>) {
        trace!(path = ?path, value = %show_val(value, 30), "validate");
        match node {
            SchemaNode::Union(alternatives) => self.union(alternatives, value, path, out),
            SchemaNode::Primitive { kind, facets } => self.primitive(*kind, facets, value, path, out),
            SchemaNode::Object(obj) => self.object(obj, value, path, out),
            SchemaNode::Array(arr) => self.array(arr, value, path, out),
            SchemaNode::Reference { target, facets } => self.reference(target, facets, value, path, out),
            SchemaNode::Malformed { reason, raw } => {
                out.push(Diagnostic::new(path, Issue::Schema(reason.clone()), show_val(raw, DETAIL_WIDTH)));
            }
        }
    }

    /// First conforming alternative wins; otherwise one diagnostic carrying every branch.
    fn union(&mut self, alternatives: &'s [SchemaNode], value: &Value, path: &mut Vec<Selector>, out: &mut Vec<Diagnostic>) {
        let mut branches = Vec::with_capacity(alternatives.len());
        for alt in alternatives {
            let mut local = Vec::new();
            self.node(alt, value, path, &mut local);
            if local.is_empty() {
                return;
            }
            branches.push(local);
        }
        out.push(Diagnostic::new(path, Issue::NoAlternative(branches), show_val(value, DETAIL_WIDTH)));
    }

    fn primitive(
        &mut self,
        kind: PrimitiveKind,
        facets: &'s Facets,
        value: &Value,
        path: &mut Vec<Selector>,
        out: &mut Vec<Diagnostic>,
    ) {
        let matches = match kind {
            PrimitiveKind::String => value.is_string(),
            PrimitiveKind::Integer => value.is_i64() || value.is_u64(),
            PrimitiveKind::Number => value.is_number(),
            PrimitiveKind::Boolean => value.is_boolean(),
            PrimitiveKind::Null => value.is_null(),
        };
        if !matches {
            out.push(Diagnostic::new(path, Issue::expected(kind), show_val(value, DETAIL_WIDTH)));
            return;
        }
        self.check_facets(path, facets, value, out);
    }

    fn object(&mut self, obj: &'s ObjectType, value: &Value, path: &mut Vec<Selector>, out: &mut Vec<Diagnostic>) {
        let Value::Object(map) = value else {
            out.push(Diagnostic::new(path, Issue::Expected("object"), show_val(value, DETAIL_WIDTH)));
            return;
        };
        if let Some(additional) = &obj.additional {
            for (name, field) in map {
                self.child(Selector::Field(name.clone()), additional, field, path, out);
            }
        } else if let Some(properties) = &obj.properties {
            for name in &obj.required {
                match (map.get(name), properties.get(name)) {
                    (Some(field), Some(schema)) => self.child(Selector::Field(name.clone()), schema, field, path, out),
                    (Some(_), None) => out.push(Diagnostic::new(
                        path,
                        Issue::Schema(format!("required field {name} not in properties")),
                        "",
                    )),
                    (None, _) => out.push(Diagnostic::new(path, Issue::MissingField(name.clone()), "")),
                }
            }
            for (name, field) in map {
                if obj.required.contains(name) {
                    continue;
                }
                match properties.get(name) {
                    Some(schema) => self.child(Selector::Field(name.clone()), schema, field, path, out),
                    None => out.push(Diagnostic::new(path, Issue::UnexpectedField(name.clone()), "")),
                }
            }
        }
        self.check_facets(path, &obj.facets, value, out);
    }

    fn array(&mut self, arr: &'s ArrayType, value: &Value, path: &mut Vec<Selector>, out: &mut Vec<Diagnostic>) {
        let Value::Array(items) = value else {
            out.push(Diagnostic::new(path, Issue::Expected("array"), show_val(value, DETAIL_WIDTH)));
            return;
        };
        if let Some(schema) = &arr.items {
            for (i, item) in items.iter().enumerate() {
                self.child(Selector::Index(i), schema, item, path, out);
            }
        }
        self.check_facets(path, &arr.facets, value, out);
    }

    fn reference(
        &mut self,
        target: &'s str,
        facets: &'s Facets,
        value: &Value,
        path: &mut Vec<Selector>,
        out: &mut Vec<Diagnostic>,
    ) {
        if self.active.len() >= MAX_REFERENCE_HOPS || self.active.contains(&target) {
            out.push(Diagnostic::new(path, Issue::Schema(format!("reference cycle through {target}")), ""));
            return;
        }
        let doc = self.doc;
        let resolved = self.resolved.entry(target).or_insert_with(|| deref::resolve(doc, target)).clone();
        match resolved {
            Ok(node) => {
                path.push(Selector::Deref(target.to_string()));
                self.active.push(target);
                self.node(node, value, path, out);
                self.active.pop();
                self.check_facets(path, facets, value, out);
                path.pop();
            }
            Err(segment) => {
                out.push(Diagnostic::new(path, Issue::Unresolved { segment, target: target.to_string() }, ""));
            }
        }
    }

    /// Descends into a field or element; the active reference chain restarts below it.
    fn child(
        &mut self,
        selector: Selector,
        schema: &'s SchemaNode,
        value: &Value,
        path: &mut Vec<Selector>,
        out: &mut Vec<Diagnostic>,
    ) {
        let active = std::mem::take(&mut self.active);
        path.push(selector);
        self.node(schema, value, path, out);
        path.pop();
        self.active = active;
    }
}

// ------------------------------- Tests ------------------------------------ //
