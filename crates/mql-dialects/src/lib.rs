//! Dialect parsers: from Java syntax trees to the dialect-independent query
//! model.
//!
//! Three source idioms are understood: the MongoDB Java driver
//! ([`driver`]), Spring Data's `MongoTemplate`/`Criteria` API
//! ([`spring_criteria`]) and `@Query`-annotated repository methods
//! ([`spring_query`]). Each parser is total: code it cannot understand
//! degrades to `Unknown` components instead of failing.

pub mod driver;
pub mod spring_criteria;
pub mod spring_query;

mod document;
mod format;
mod namespace;
mod pipeline;
mod values;

pub use document::extract_model_collection;
pub use format::format_type;
pub use namespace::extract_collection_reference;
pub use spring_query::SpringQueryConfig;

use mql_java_parse::SourceFile;
use mql_model::DialectName;

/// A recognized source idiom, detected per file from its imports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    JavaDriver,
    SpringCriteria,
    SpringQuery,
}

impl Dialect {
    pub fn name(&self) -> DialectName {
        match self {
            Dialect::JavaDriver => DialectName::JavaDriver,
            Dialect::SpringCriteria => DialectName::SpringCriteria,
            Dialect::SpringQuery => DialectName::SpringQuery,
        }
    }
}

/// Dialects a file can contain, judged by its imports. A file may mix
/// dialects (a Spring service dropping down to the raw driver, for example).
pub fn detect_dialects(file: &SourceFile) -> Vec<Dialect> {
    let mut out = Vec::new();
    for import in file.imports() {
        let dialect = if import.path.starts_with("com.mongodb.") {
            Dialect::JavaDriver
        } else if import
            .path
            .starts_with("org.springframework.data.mongodb.repository")
        {
            Dialect::SpringQuery
        } else if import.path.starts_with("org.springframework.data.mongodb.") {
            Dialect::SpringCriteria
        } else {
            continue;
        };
        if !out.contains(&dialect) {
            out.push(dialect);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mql_java_parse::{FileId, SourceSet};
    use pretty_assertions::assert_eq;

    #[test]
    fn dialects_are_detected_from_imports() {
        let set = SourceSet::parse(&[r#"
import com.mongodb.client.MongoCollection;
import org.springframework.data.mongodb.core.MongoTemplate;

public class Mixed {}
"#])
        .unwrap();
        let file = set.file(FileId(0));
        assert_eq!(
            detect_dialects(file),
            vec![Dialect::JavaDriver, Dialect::SpringCriteria]
        );
    }

    #[test]
    fn repository_imports_detect_the_query_dialect() {
        let set = SourceSet::parse(&[r#"
import org.springframework.data.mongodb.repository.MongoRepository;
import org.springframework.data.mongodb.repository.Query;

public interface BookRepository {}
"#])
        .unwrap();
        let file = set.file(FileId(0));
        assert_eq!(detect_dialects(file), vec![Dialect::SpringQuery]);
    }

    #[test]
    fn plain_files_have_no_dialect() {
        let set = SourceSet::parse(&["public class Plain {}"]).unwrap();
        let file = set.file(FileId(0));
        assert_eq!(detect_dialects(file), Vec::new());
    }
}
