//! Lightweight Java source analysis on top of `tree-sitter-java`.
//!
//! This crate gives the dialect parsers just enough of a semantic view of
//! Java to do their job without a compiler or a classpath: parsed files
//! grouped in a [`SourceSet`], expression navigation ([`JavaExpr`]),
//! name resolution scoped to the source set, compile-time constant folding
//! ([`resolve_constant`]) and a Java-type-to-BSON classifier
//! ([`classify_type_text`]).

use std::cell::RefCell;

use thiserror::Error;
use tree_sitter::{Node, Parser, Tree};

mod annotation;
mod constant;
mod expr;
mod source_set;
mod types;

pub use annotation::{collect_annotations, AnnotationValue, ParsedAnnotation};
pub use constant::{resolve_constant, MAX_RESOLUTION_DEPTH};
pub use expr::{ClassDecl, Definition, FieldDecl, JavaExpr, MethodCall, MethodDecl};
pub use source_set::{FileId, Import, SourceFile, SourceSet};
pub use types::{classify_type_text, java_type_name};

/// Why a Java source could not be turned into a syntax tree.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("tree-sitter-java language load failed")]
    LanguageLoad,
    #[error("tree-sitter parser is already in use")]
    ParserBusy,
    #[error("tree-sitter failed to produce a syntax tree")]
    NoTree,
}

thread_local! {
    static JAVA_PARSER: RefCell<Result<Parser, SourceError>> = RefCell::new({
        let mut parser = Parser::new();
        match parser.set_language(tree_sitter_java::language()) {
            Ok(()) => Ok(parser),
            Err(_) => Err(SourceError::LanguageLoad),
        }
    });
}

/// Parse Java source text with `tree-sitter-java`.
pub fn parse_java(source: &str) -> Result<Tree, SourceError> {
    JAVA_PARSER.with(|parser_cell| {
        let mut parser = parser_cell
            .try_borrow_mut()
            .map_err(|_| SourceError::ParserBusy)?;
        let parser = match parser.as_mut() {
            Ok(parser) => parser,
            Err(err) => return Err(err.clone()),
        };

        parser.parse(source, None).ok_or(SourceError::NoTree)
    })
}

/// Visit a node and all its descendants in pre-order.
pub fn visit_nodes<'a, F: FnMut(Node<'a>)>(node: Node<'a>, f: &mut F) {
    f(node);
    if node.child_count() == 0 {
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit_nodes(child, f);
    }
}

/// Find the first named child with the given kind.
pub fn find_named_child<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let result = node
        .named_children(&mut cursor)
        .find(|child| child.kind() == kind);
    result
}

/// Return the byte slice for `node` within `source`.
pub fn node_text<'a>(source: &'a str, node: Node<'_>) -> &'a str {
    &source[node.byte_range()]
}

/// Decode the common escape sequences of a Java string literal's contents.
/// Unknown escapes keep the escaped character.
pub(crate) fn unescape_string_literal(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => break,
        }
    }
    out
}
