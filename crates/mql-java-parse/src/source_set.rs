//! A group of parsed Java files analyzed together.

use tree_sitter::Tree;

use crate::expr::{ClassDecl, JavaExpr};
use crate::{node_text, parse_java, SourceError};

/// Index of a file inside a [`SourceSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FileId(pub u32);

/// One parsed Java file. The syntax tree and its source text live together
/// so nodes can always be rendered back to text.
pub struct SourceFile {
    text: String,
    tree: Tree,
}

/// A Java `import` statement, reduced to what dialect detection needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Import {
    pub path: String,
    pub is_static: bool,
}

impl SourceFile {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// All import paths of the file, wildcard asterisks included verbatim
    /// (`com.mongodb.client.model.Filters.*`).
    pub fn imports(&self) -> Vec<Import> {
        let root = self.tree.root_node();
        let mut cursor = root.walk();
        let mut imports = Vec::new();
        for child in root.named_children(&mut cursor) {
            if child.kind() != "import_declaration" {
                continue;
            }
            let raw = node_text(&self.text, child);
            let raw = raw.trim_start_matches("import").trim();
            let (is_static, raw) = match raw.strip_prefix("static") {
                Some(rest) => (true, rest.trim()),
                None => (false, raw),
            };
            let path: String = raw
                .trim_end_matches(';')
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            if !path.is_empty() {
                imports.push(Import { path, is_static });
            }
        }
        imports
    }
}

/// All files of one analysis pass. Name resolution never looks outside the
/// set, so anything referenced but not included resolves to nothing.
pub struct SourceSet {
    files: Vec<SourceFile>,
}

impl SourceSet {
    /// Parses every source. Fails on the first file tree-sitter cannot
    /// produce a tree for; files with syntax errors still yield a tree and
    /// are analyzed best-effort.
    pub fn parse(sources: &[&str]) -> Result<SourceSet, SourceError> {
        let mut files = Vec::with_capacity(sources.len());
        for source in sources {
            let tree = parse_java(source)?;
            files.push(SourceFile {
                text: (*source).to_string(),
                tree,
            });
        }
        Ok(SourceSet { files })
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.0 as usize]
    }

    pub fn file_ids(&self) -> impl Iterator<Item = FileId> {
        (0..self.files.len() as u32).map(FileId)
    }

    /// The root node of a file, as a navigable expression handle.
    pub fn root(&self, id: FileId) -> JavaExpr<'_> {
        JavaExpr::new(self, id, self.file(id).tree.root_node())
    }

    /// Every class and interface declared anywhere in the set, outer and
    /// nested alike.
    pub fn classes(&self) -> Vec<ClassDecl<'_>> {
        let mut out = Vec::new();
        for id in self.file_ids() {
            let root = self.file(id).tree.root_node();
            crate::visit_nodes(root, &mut |node| {
                if matches!(node.kind(), "class_declaration" | "interface_declaration") {
                    out.push(ClassDecl::new(self, id, node));
                }
            });
        }
        out
    }

    /// Finds a class by its simple (unqualified) name.
    pub fn class_named(&self, simple_name: &str) -> Option<ClassDecl<'_>> {
        self.classes()
            .into_iter()
            .find(|class| class.name() == Some(simple_name))
    }

    /// All imports across the whole set.
    pub fn imports(&self) -> Vec<Import> {
        self.files.iter().flat_map(|f| f.imports()).collect()
    }
}

impl std::fmt::Debug for SourceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceSet")
            .field("files", &self.files.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn collects_plain_and_static_imports() {
        let set = SourceSet::parse(&[
            "import com.mongodb.client.MongoClient;\nimport static com.mongodb.client.model.Filters.*;\nclass A {}",
        ])
        .expect("parse");

        let imports = set.imports();
        assert_eq!(
            imports,
            vec![
                Import {
                    path: "com.mongodb.client.MongoClient".into(),
                    is_static: false
                },
                Import {
                    path: "com.mongodb.client.model.Filters.*".into(),
                    is_static: true
                },
            ]
        );
    }

    #[test]
    fn finds_classes_across_files_by_simple_name() {
        let set = SourceSet::parse(&["class A {}", "class B { class Inner {} }"]).expect("parse");
        assert!(set.class_named("A").is_some());
        assert!(set.class_named("Inner").is_some());
        assert!(set.class_named("C").is_none());
        assert_eq!(set.classes().len(), 3);
    }
}
