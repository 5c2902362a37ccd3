//! Reference bookkeeping: every name used as a type must have a definition.
use indexmap::IndexMap;

use crate::ir::{Definitions, SchemaDocument, SchemaNode};
use crate::validate::deref;

/// Names used as types, with the position of their first use.
#[derive(Debug, Default)]
pub(crate) struct References {
    first_use: IndexMap<String, (usize, usize)>,
}

impl References {
    pub(crate) fn note(&mut self, name: &str, line: usize, column: usize) {
        if !self.first_use.contains_key(name) {
            self.first_use.insert(name.to_string(), (line, column));
        }
    }

    /// Referenced names with no definition, in order of first use.
    pub(crate) fn unresolved<'s>(
        &'s self,
        definitions: &'s Definitions,
    ) -> impl Iterator<Item = (&'s str, (usize, usize))> + 's {
        self.first_use
            .iter()
            .filter(move |(name, _)| !definitions.contains_key(name.as_str()))
            .map(|(name, at)| (name.as_str(), *at))
    }
}

/// Every reference target in `doc` that does not resolve, in tree order, each once.
///
/// Compiled documents are clean by construction; this is for documents read back
/// from disk, where a dangling `$ref` would otherwise only surface per record.
pub fn unresolved_targets(doc: &SchemaDocument) -> Vec<String> {
    let mut targets = Vec::new();
    collect_targets(&doc.start, &mut targets);
    for node in doc.definitions.values() {
        collect_targets(node, &mut targets);
    }
    let mut seen = std::collections::HashSet::new();
    targets
        .into_iter()
        .filter(|t| seen.insert(*t))
        .filter(|t| deref::resolve(doc, t).is_err())
        .map(str::to_string)
        .collect()
}

fn collect_targets<'s>(node: &'s SchemaNode, out: &mut Vec<&'s str>) {
    match node {
        SchemaNode::Reference { target, .. } => out.push(target),
        SchemaNode::Object(obj) => {
            for child in obj.properties.iter().flat_map(|p| p.values()) {
                collect_targets(child, out);
            }
            if let Some(additional) = &obj.additional {
                collect_targets(additional, out);
            }
        }
        SchemaNode::Array(arr) => {
            if let Some(items) = &arr.items {
                collect_targets(items, out);
            }
        }
        SchemaNode::Union(alternatives) => {
            for alt in alternatives {
                collect_targets(alt, out);
            }
        }
        SchemaNode::Primitive { .. } | SchemaNode::Malformed { .. } => {}
    }
}
