//! Recursive-descent compiler from JSON-RNC source to a [`SchemaDocument`].
//!
//! One token of lookahead. Grammar errors are recorded with their position and
//! the parser resynchronises on a caller-chosen set of token kinds, so one bad
//! construct costs one diagnostic rather than the whole compile. The result is
//! either a complete document or the full list of diagnostics, never a partial
//! schema.
//!
//! ```text
//! document   := definition*
//! definition := (IDENT | STRING | "start") "=" typeExpr
//! typeExpr   := type ("," type)* | type ("|" type)*
//! type       := (primitive | IDENT | STRING | REGEX) facets?
//!             | "{" properties? "}" facets?
//!             | "[" typeExpr? "]" facets?
//!             | "(" typeExpr ")"
//! properties := property (","? property)*
//! property   := (IDENT | STRING) "?"? ":" type | "(" properties ")"
//! facets     := "@" "(" name "=" value ("," name "=" value)* ")"
//! ```
pub mod facets;
pub mod refs;

use std::fmt;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::ir::{ArrayType, Definitions, ObjectType, PrimitiveKind, SchemaDocument, SchemaNode};
use crate::token::{Lexer, Token, TokenKind};

// ----------------------------- Diagnostics -------------------------------- //

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileDiagnostic {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl CompileDiagnostic {
    /// The offending source line with a caret under the column.
    pub fn render(&self, source: &str) -> String {
        let text = source.lines().nth(self.line.saturating_sub(1)).unwrap_or("");
        format!("line {:3}: {}\n{}↑:{}", self.line, text, " ".repeat(self.column + 10), self.message)
    }
}

impl fmt::Display for CompileDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.column, self.message)
    }
}

/// Every diagnostic of a failed compile, in discovery order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompileErrors(pub Vec<CompileDiagnostic>);

impl CompileErrors {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompileDiagnostic> {
        self.0.iter()
    }

    pub fn render(&self, source: &str) -> String {
        self.0.iter().map(|d| d.render(source) + "\n").collect()
    }
}

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in &self.0 {
            writeln!(f, "{d}")?;
        }
        Ok(())
    }
}

// ------------------------------ Front API --------------------------------- //

pub fn compile(src: &str) -> Result<SchemaDocument, CompileErrors> {
    let mut parser = Parser::new(src);
    parser.document();
    parser.finish()
}

// ------------------------------- Parser ----------------------------------- //

/// What to do after recording a grammar error.
#[derive(Clone, Copy)]
enum Recovery<'k> {
    /// Keep going from the current token.
    Stay,
    /// Panic mode: drop tokens until one of these kinds (or end of input).
    SkipTo(&'k [TokenKind]),
}

const DEFINITION_SYNC: &[TokenKind] = &[TokenKind::Ident, TokenKind::StringLit, TokenKind::Start];

const TYPE_SYNC: &[TokenKind] = &[
    TokenKind::Ident,
    TokenKind::StringLit,
    TokenKind::Start,
    TokenKind::Comma,
    TokenKind::VertBar,
    TokenKind::CloseBrace,
    TokenKind::CloseBracket,
    TokenKind::CloseParen,
];

const PROPERTY_SYNC: &[TokenKind] = &[
    TokenKind::Ident,
    TokenKind::StringLit,
    TokenKind::Comma,
    TokenKind::CloseBrace,
    TokenKind::CloseParen,
];

struct Property {
    name: String,
    optional: bool,
    node: SchemaNode,
    line: usize,
    column: usize,
}

struct Parser<'a> {
    tokens: Lexer<'a>,
    token: Token,
    definitions: Definitions,
    start: Option<SchemaNode>,
    references: refs::References,
    errors: Vec<CompileDiagnostic>,
    /// Set once end of input was hit while more tokens were required.
    truncated: bool,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        let mut tokens = Lexer::new(src);
        let token = tokens.next().unwrap_or_else(|| eof_token(1));
        Self {
            tokens,
            token,
            definitions: IndexMap::new(),
            start: None,
            references: refs::References::default(),
            errors: Vec::new(),
            truncated: false,
        }
    }

    // --------------------------- token helpers ---------------------------- //

    fn advance(&mut self) {
        let line = self.token.line;
        self.token = self.tokens.next().unwrap_or_else(|| eof_token(line));
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.token.kind == kind
    }

    fn position(&self) -> (usize, usize) {
        (self.token.line, self.token.column)
    }

    fn error_at(&mut self, (line, column): (usize, usize), message: impl Into<String>) {
        let message = message.into();
        trace!(line, column, %message, "schema error");
        self.errors.push(CompileDiagnostic { line, column, message });
    }

    /// Records `message` at the current token, then recovers.
    fn error(&mut self, message: impl Into<String>, recovery: Recovery<'_>) {
        if self.truncated {
            return;
        }
        if self.at(TokenKind::Eof) {
            self.truncated = true;
            self.error_at(self.position(), "unexpected end of file");
            return;
        }
        self.error_at(self.position(), message);
        if let Recovery::SkipTo(sync) = recovery {
            while !self.at(TokenKind::Eof) && !sync.contains(&self.token.kind) {
                self.advance();
            }
        }
    }

    /// Consumes `kind` or reports `message` and skips to (and past) the next `kind`.
    fn close(&mut self, kind: TokenKind, message: &str) {
        if !self.at(kind) {
            self.error(message, Recovery::SkipTo(&[kind]));
        }
        if self.at(kind) {
            self.advance();
        }
    }

    // ----------------------------- grammar -------------------------------- //

    fn document(&mut self) {
        while !self.at(TokenKind::Eof) && !self.truncated {
            self.definition();
        }
    }

    fn definition(&mut self) {
        let name = match self.token.kind {
            TokenKind::Ident | TokenKind::Start => self.token.text.clone(),
            TokenKind::StringLit => self.token.unquoted().to_string(),
            _ => {
                self.error("identifier expected at start of definition", Recovery::SkipTo(DEFINITION_SYNC));
                return;
            }
        };
        // `start` and `'start'` both name the start definition.
        let is_start = name == "start";
        let name_at = self.position();
        self.advance();
        if self.at(TokenKind::Equal) {
            self.advance();
        } else {
            self.error("equal expected in a definition", Recovery::Stay);
        }
        let node = self.type_expr();
        if self.definitions.contains_key(&name) {
            self.error_at(name_at, format!("double definition for {name}"));
        }
        if let Some(node) = node {
            debug!(definition = %name, "parsed definition");
            if is_start {
                self.start = Some(node.clone());
            }
            self.definitions.insert(name, node);
        }
    }

    /// `type ("," type)*` merges fragments, `type ("|" type)*` builds a union.
    fn type_expr(&mut self) -> Option<SchemaNode> {
        let first = self.type_();
        let node = match self.token.kind {
            TokenKind::Comma => {
                let mut merged = first;
                while self.at(TokenKind::Comma) {
                    self.advance();
                    let at = self.position();
                    let next = self.type_();
                    merged = match (merged, next) {
                        (Some(acc), Some(next)) => Some(self.merge(acc, next, at)),
                        (acc, _) => acc,
                    };
                }
                merged
            }
            TokenKind::VertBar => {
                let mut alternatives: Vec<SchemaNode> = first.into_iter().collect();
                while self.at(TokenKind::VertBar) {
                    self.advance();
                    alternatives.extend(self.type_());
                }
                Some(SchemaNode::Union(alternatives))
            }
            _ => return first,
        };
        if self.at(TokenKind::Comma) || self.at(TokenKind::VertBar) {
            self.error("',' and '|' cannot be mixed without parentheses", Recovery::Stay);
            while self.at(TokenKind::Comma) || self.at(TokenKind::VertBar) {
                self.advance();
                let _ = self.type_();
            }
        }
        node
    }

    fn type_(&mut self) -> Option<SchemaNode> {
        let kind = self.token.kind;
        let mut node = match kind {
            k if k.is_primitive() => {
                let primitive = match k {
                    TokenKind::Integer => PrimitiveKind::Integer,
                    TokenKind::Number => PrimitiveKind::Number,
                    TokenKind::String => PrimitiveKind::String,
                    TokenKind::Boolean => PrimitiveKind::Boolean,
                    _ => PrimitiveKind::Null,
                };
                self.advance();
                SchemaNode::primitive(primitive)
            }
            TokenKind::Ident | TokenKind::StringLit => {
                let name = self.token.unquoted().to_string();
                let (line, column) = self.position();
                self.references.note(&name, line, column);
                self.advance();
                SchemaNode::reference(&name)
            }
            TokenKind::RegexLit => {
                let pattern = self.token.unquoted().to_string();
                self.check_pattern(&pattern);
                self.advance();
                let mut node = SchemaNode::primitive(PrimitiveKind::String);
                if let SchemaNode::Primitive { facets, .. } = &mut node {
                    facets.pattern = Some(pattern);
                }
                node
            }
            TokenKind::OpenBrace => {
                self.advance();
                SchemaNode::Object(self.object_body())
            }
            TokenKind::OpenBracket => {
                self.advance();
                let mut array = ArrayType::default();
                if !self.at(TokenKind::CloseBracket) {
                    array.items = self.type_expr().map(Box::new);
                }
                self.close(TokenKind::CloseBracket, "closing bracket expected");
                SchemaNode::Array(array)
            }
            TokenKind::OpenParen => {
                self.advance();
                let inner = self.type_expr();
                self.close(TokenKind::CloseParen, "closing parenthesis expected");
                return inner;
            }
            _ => {
                self.error("ident or json type expected", Recovery::SkipTo(TYPE_SYNC));
                return None;
            }
        };
        self.facets(&mut node);
        Some(node)
    }

    /// Everything after `{`, including the closing brace.
    fn object_body(&mut self) -> ObjectType {
        let mut object = ObjectType::default();
        if self.at(TokenKind::CloseBrace) {
            self.advance();
            return object;
        }
        let mut declared = Vec::new();
        self.properties(&mut declared);
        let mut properties = IndexMap::new();
        for prop in declared {
            if properties.contains_key(&prop.name) {
                self.error_at((prop.line, prop.column), format!("repeated property name: {}", prop.name));
            }
            if prop.optional {
                object.required.shift_remove(&prop.name);
            } else {
                object.required.insert(prop.name.clone());
            }
            properties.insert(prop.name, prop.node);
        }
        object.properties = Some(properties);
        self.close(TokenKind::CloseBrace, "closing brace expected");
        object
    }

    fn properties(&mut self, out: &mut Vec<Property>) {
        self.property(out);
        while self.at(TokenKind::Comma) || self.at(TokenKind::OpenParen) || is_name(self.token.kind) {
            if self.at(TokenKind::Comma) {
                self.advance();
            }
            self.property(out);
        }
    }

    fn property(&mut self, out: &mut Vec<Property>) {
        if is_name(self.token.kind) {
            let name = self.token.unquoted().to_string();
            let (line, column) = self.position();
            self.advance();
            let optional = self.at(TokenKind::Question);
            if optional {
                self.advance();
            }
            let node = if self.at(TokenKind::Colon) {
                self.advance();
                self.type_()
            } else {
                self.error(format!("':' expected after property {name}"), Recovery::Stay);
                if starts_type(self.token.kind) { self.type_() } else { None }
            };
            if let Some(node) = node {
                out.push(Property { name, optional, node, line, column });
            }
        } else if self.at(TokenKind::OpenParen) {
            self.advance();
            self.properties(out);
            self.close(TokenKind::CloseParen, "closing paren expected");
        } else {
            self.error(
                "ident, string or open parenthesis expected at the start of a prop",
                Recovery::SkipTo(PROPERTY_SYNC),
            );
        }
    }

    /// Combines two `,`-separated fragments into one object or array.
    fn merge(&mut self, acc: SchemaNode, next: SchemaNode, at: (usize, usize)) -> SchemaNode {
        match (acc, next) {
            (SchemaNode::Object(mut a), SchemaNode::Object(b)) => {
                if let Some(extra) = b.properties {
                    let props = a.properties.get_or_insert_with(IndexMap::new);
                    for (name, node) in extra {
                        if props.contains_key(&name) {
                            self.error_at(at, format!("repeated property name: {name}"));
                        }
                        props.insert(name, node);
                    }
                }
                a.required.extend(b.required);
                if b.additional.is_some() {
                    a.additional = b.additional;
                }
                a.facets.merge(&b.facets);
                SchemaNode::Object(a)
            }
            (SchemaNode::Array(mut a), SchemaNode::Array(b)) => {
                if b.items.is_some() {
                    if a.items.is_some() {
                        self.error_at(at, "only one item type can be combined with ','");
                    } else {
                        a.items = b.items;
                    }
                }
                a.facets.merge(&b.facets);
                SchemaNode::Array(a)
            }
            (acc, _) => {
                self.error_at(at, "only object or array types can be combined with ','");
                acc
            }
        }
    }

    // ---------------------------- post-pass ------------------------------- //

    fn finish(mut self) -> Result<SchemaDocument, CompileErrors> {
        let end = self.position();
        if self.start.is_none() {
            self.error_at(end, "no start definition");
        }
        let unresolved: Vec<(String, (usize, usize))> = self
            .references
            .unresolved(&self.definitions)
            .map(|(name, at)| (name.to_string(), at))
            .collect();
        for (name, at) in unresolved {
            self.error_at(at, format!("no definition found for {name}"));
        }
        match self.start {
            Some(start) if self.errors.is_empty() => Ok(SchemaDocument::new(start, self.definitions)),
            _ => Err(CompileErrors(self.errors)),
        }
    }
}

fn eof_token(line: usize) -> Token {
    Token { kind: TokenKind::Eof, text: " ".into(), line, column: 0 }
}

/// Tokens usable as a property name; reserved words are plain names in that position.
fn is_name(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::Ident | TokenKind::StringLit | TokenKind::Start) || kind.is_primitive()
}

fn starts_type(kind: TokenKind) -> bool {
    kind.is_primitive()
        || matches!(
            kind,
            TokenKind::Ident
                | TokenKind::StringLit
                | TokenKind::RegexLit
                | TokenKind::OpenBrace
                | TokenKind::OpenBracket
                | TokenKind::OpenParen
        )
}

// ------------------------------- Tests ------------------------------------ //
