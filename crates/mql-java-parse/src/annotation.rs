//! Parsed Java annotations (`@Document`, `@Query`, ...).

use std::collections::HashMap;

use mql_model::Span;
use tree_sitter::Node;

use crate::{node_text, unescape_string_literal};

/// One annotation argument value.
///
/// For string literals the quotes are stripped and `span` covers the inner
/// text only, so it can be used directly as a source handle. Everything else
/// keeps its raw source text and full span.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotationValue {
    pub text: String,
    pub span: Span,
    pub is_string: bool,
}

/// A parsed annotation with its arguments keyed by name. A single positional
/// argument lands under `value`, matching Java semantics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedAnnotation {
    pub simple_name: String,
    pub span: Span,
    pub args: HashMap<String, AnnotationValue>,
}

impl ParsedAnnotation {
    pub fn arg(&self, key: &str) -> Option<&AnnotationValue> {
        self.args.get(key)
    }

    /// A string-literal argument, with the span of its contents.
    pub fn string_arg(&self, key: &str) -> Option<(&str, Span)> {
        let value = self.args.get(key)?;
        value.is_string.then_some((value.text.as_str(), value.span))
    }
}

/// Collect all annotations declared under a `modifiers` node.
pub fn collect_annotations(modifiers: Node<'_>, source: &str) -> Vec<ParsedAnnotation> {
    let mut annotations = Vec::new();
    let mut cursor = modifiers.walk();
    for child in modifiers.named_children(&mut cursor) {
        if matches!(child.kind(), "annotation" | "marker_annotation") {
            if let Some(parsed) = parse_annotation(child, source) {
                annotations.push(parsed);
            }
        }
    }
    annotations
}

fn parse_annotation(node: Node<'_>, source: &str) -> Option<ParsedAnnotation> {
    let name = node_text(source, node.child_by_field_name("name")?);
    let simple_name = name.rsplit('.').next().unwrap_or(name).to_string();
    let span = Span::new(node.start_byte(), node.end_byte());

    let mut args = HashMap::new();
    if let Some(list) = node.child_by_field_name("arguments") {
        let mut cursor = list.walk();
        for arg in list.named_children(&mut cursor) {
            if arg.kind() == "element_value_pair" {
                let Some(key) = arg.child_by_field_name("key") else {
                    continue;
                };
                let Some(value) = arg.child_by_field_name("value") else {
                    continue;
                };
                args.insert(node_text(source, key).to_string(), parse_value(value, source));
            } else if !matches!(arg.kind(), "line_comment" | "block_comment") {
                args.insert("value".to_string(), parse_value(arg, source));
            }
        }
    }

    Some(ParsedAnnotation {
        simple_name,
        span,
        args,
    })
}

fn parse_value(node: Node<'_>, source: &str) -> AnnotationValue {
    let raw = node_text(source, node);
    if node.kind() == "string_literal" {
        if let Some(inner) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
            return AnnotationValue {
                text: unescape_string_literal(inner),
                span: Span::new(node.start_byte() + 1, node.end_byte().saturating_sub(1)),
                is_string: true,
            };
        }
    }
    AnnotationValue {
        text: raw.to_string(),
        span: Span::new(node.start_byte(), node.end_byte()),
        is_string: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceSet;
    use pretty_assertions::assert_eq;

    fn annotations_of(source: &str, class: &str) -> Vec<ParsedAnnotation> {
        let set = SourceSet::parse(&[source]).expect("parse");
        let class = set.class_named(class).expect("class");
        class.annotations()
    }

    #[test]
    fn parses_positional_and_named_args() {
        let source = "@Document(\"books\") class Book {}";
        let anns = annotations_of(source, "Book");
        assert_eq!(anns.len(), 1);
        assert_eq!(anns[0].simple_name, "Document");

        let (value, span) = anns[0].string_arg("value").expect("value");
        assert_eq!(value, "books");
        assert_eq!(&source[span.start..span.end], "books");
    }

    #[test]
    fn named_args_keep_their_keys() {
        let anns = annotations_of(
            "@Document(collection = \"books\", language = \"en\") class Book {}",
            "Book",
        );
        assert_eq!(anns[0].string_arg("collection").map(|(v, _)| v), Some("books"));
        assert_eq!(anns[0].string_arg("language").map(|(v, _)| v), Some("en"));
    }

    #[test]
    fn marker_annotations_have_no_args() {
        let anns = annotations_of("@Repository interface BookRepo {}", "BookRepo");
        assert_eq!(anns[0].simple_name, "Repository");
        assert!(anns[0].args.is_empty());
    }

    #[test]
    fn qualified_annotation_names_are_simplified() {
        let anns = annotations_of(
            "@org.springframework.data.mongodb.core.mapping.Document class Book {}",
            "Book",
        );
        assert_eq!(anns[0].simple_name, "Document");
    }

    #[test]
    fn non_string_values_keep_raw_text() {
        let anns = annotations_of("@Query(exists = true) class Q {}", "Q");
        let value = anns[0].arg("exists").expect("exists");
        assert!(!value.is_string);
        assert_eq!(value.text, "true");
    }
}
