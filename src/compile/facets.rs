//! `@( name = value, ... )` facet lists.
use ordered_float::OrderedFloat;
use regex::Regex;

use super::{Parser, Recovery};
use crate::ir::{FacetName, FacetTarget, FacetValue, SchemaNode};
use crate::token::TokenKind;
use crate::validate::facets::anchored;

const VALUE_SYNC: &[TokenKind] = &[TokenKind::Comma, TokenKind::CloseParen];

impl<'a> Parser<'a> {
    /// Parses an optional facet list and attaches it to `node`.
    pub(super) fn facets(&mut self, node: &mut SchemaNode) {
        if !self.at(TokenKind::At) {
            return;
        }
        self.advance();
        if !self.at(TokenKind::OpenParen) {
            self.error("open parenthesis expected at the start of a facet", Recovery::Stay);
            return;
        }
        self.advance();
        let target = node.facet_target();
        while !self.at(TokenKind::CloseParen) && !self.at(TokenKind::Eof) {
            if !matches!(self.token.kind, TokenKind::Ident | TokenKind::StringLit) {
                self.error("identifier expected in facet", Recovery::SkipTo(&[TokenKind::CloseParen]));
                break;
            }
            let ident = self.token.unquoted().to_string();
            let Some(name) = FacetName::from_name(&ident) else {
                self.error(format!("unrecognized facet: {ident}"), Recovery::SkipTo(&[TokenKind::CloseParen]));
                break;
            };
            let name_at = self.position();
            self.advance();
            if self.at(TokenKind::Equal) {
                self.advance();
                if let Some(value) = self.facet_value(name) {
                    match target {
                        Some(target) if target != name.target() => {
                            self.error_at(name_at, format!("facet {name} only applicable to {}", name.target()));
                        }
                        _ => {
                            if let Some(facets) = node.facets_mut() {
                                facets.set(name, value);
                            }
                        }
                    }
                }
            } else {
                self.error("= expected in facet", Recovery::SkipTo(VALUE_SYNC));
            }
            if self.at(TokenKind::Comma) {
                self.advance();
            }
        }
        self.close(TokenKind::CloseParen, "closing parenthesis expected after facets");
    }

    fn facet_value(&mut self, name: FacetName) -> Option<FacetValue> {
        let token = self.token.clone();
        let value = match (name.target(), token.kind) {
            (FacetTarget::Numeric, TokenKind::NumberLit) => {
                token.text.parse::<f64>().ok().map(|n| FacetValue::Bound(OrderedFloat(n)))
            }
            (FacetTarget::Numeric, TokenKind::Ident) if matches!(token.text.as_str(), "true" | "false") => {
                self.error(
                    format!("numeric bound expected for facet {name}, boolean form is not supported"),
                    Recovery::Stay,
                );
                self.advance();
                return None;
            }
            (FacetTarget::Numeric, _) => None,
            (_, TokenKind::StringLit | TokenKind::RegexLit) if name == FacetName::Pattern => {
                let pattern = token.unquoted().to_string();
                self.check_pattern(&pattern);
                Some(FacetValue::Pattern(pattern))
            }
            (_, TokenKind::NumberLit) if name != FacetName::Pattern => {
                token.text.parse::<u64>().ok().map(FacetValue::Count)
            }
            _ => None,
        };
        match value {
            Some(value) => {
                self.advance();
                Some(value)
            }
            None => {
                let expected = match name.target() {
                    FacetTarget::Numeric => "number",
                    _ if name == FacetName::Pattern => "string",
                    _ => "non-negative integer",
                };
                self.error(format!("{expected} expected in facet {name}"), Recovery::SkipTo(VALUE_SYNC));
                None
            }
        }
    }

    /// Patterns must be usable by the validator's regex engine.
    pub(super) fn check_pattern(&mut self, pattern: &str) {
        if let Err(err) = Regex::new(&anchored(pattern)) {
            let message = err.to_string().lines().last().unwrap_or("").trim().to_string();
            self.error(format!("invalid pattern /{pattern}/: {message}"), Recovery::Stay);
        }
    }
}
