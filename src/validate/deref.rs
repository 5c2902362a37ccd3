//! Resolution of `$ref` pointers against the schema tree itself.
//!
//! `#` is the document root (whose body is the start definition); every later
//! segment descends by keyword or key: `definitions/<name>`, `properties/<field>`,
//! `items`, `additionalProperties`, `oneOf/<index>`.
use indexmap::IndexMap;

use crate::ir::{SchemaDocument, SchemaNode};

enum Cursor<'s> {
    Root,
    Definitions,
    Node(&'s SchemaNode),
    Properties(&'s IndexMap<String, SchemaNode>),
    Alternatives(&'s [SchemaNode]),
}

/// The node `target` points at, or the first segment that could not be followed.
pub fn resolve<'s>(doc: &'s SchemaDocument, target: &str) -> Result<&'s SchemaNode, String> {
    let mut segments = target.split('/');
    match segments.next() {
        Some("#") => {}
        first => return Err(first.unwrap_or_default().to_string()),
    }
    let mut cursor = Cursor::Root;
    for raw in segments {
        let segment = unescape(raw);
        cursor = step(doc, cursor, &segment).ok_or(segment)?;
    }
    match cursor {
        Cursor::Root => Ok(&doc.start),
        Cursor::Node(node) => Ok(node),
        Cursor::Definitions | Cursor::Properties(_) | Cursor::Alternatives(_) => {
            Err(target.rsplit('/').next().unwrap_or_default().to_string())
        }
    }
}

fn step<'s>(doc: &'s SchemaDocument, cursor: Cursor<'s>, segment: &str) -> Option<Cursor<'s>> {
    match cursor {
        Cursor::Root if segment == "definitions" => Some(Cursor::Definitions),
        Cursor::Root => step(doc, Cursor::Node(&doc.start), segment),
        Cursor::Definitions => doc.definitions.get(segment).map(Cursor::Node),
        Cursor::Properties(props) => props.get(segment).map(Cursor::Node),
        Cursor::Alternatives(alts) => segment.parse::<usize>().ok().and_then(|i| alts.get(i)).map(Cursor::Node),
        Cursor::Node(node) => match (node, segment) {
            (SchemaNode::Object(obj), "properties") => obj.properties.as_ref().map(Cursor::Properties),
            (SchemaNode::Object(obj), "additionalProperties") => obj.additional.as_deref().map(Cursor::Node),
            (SchemaNode::Array(arr), "items") => arr.items.as_deref().map(Cursor::Node),
            (SchemaNode::Union(alts), "oneOf") => Some(Cursor::Alternatives(alts)),
            _ => None,
        },
    }
}

/// JSON Pointer unescaping: `~1` is `/`, `~0` is `~`.
fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}
