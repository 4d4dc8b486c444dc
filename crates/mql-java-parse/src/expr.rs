//! Navigable handles over Java syntax nodes, plus name resolution scoped to
//! a [`SourceSet`].

use mql_model::Span;
use tree_sitter::Node;

use crate::annotation::{collect_annotations, ParsedAnnotation};
use crate::source_set::{FileId, SourceSet};
use crate::types::java_type_name;
use crate::{find_named_child, node_text, visit_nodes};

/// A syntax node paired with the set it came from, so navigation and
/// resolution never need extra arguments.
#[derive(Clone, Copy)]
pub struct JavaExpr<'s> {
    set: &'s SourceSet,
    file: FileId,
    node: Node<'s>,
}

/// A decomposed `receiver.name(args)` call.
#[derive(Clone)]
pub struct MethodCall<'s> {
    pub receiver: Option<JavaExpr<'s>>,
    pub name: &'s str,
    pub args: Vec<JavaExpr<'s>>,
    pub call: JavaExpr<'s>,
}

/// What a name resolved to inside the source set.
#[derive(Clone)]
pub enum Definition<'s> {
    Local {
        type_text: Option<String>,
        initializer: Option<JavaExpr<'s>>,
    },
    Parameter {
        type_text: Option<String>,
    },
    Field(FieldDecl<'s>),
    Method(MethodDecl<'s>),
    Class(ClassDecl<'s>),
}

impl<'s> Definition<'s> {
    /// The declared Java type of the definition, where one exists.
    pub fn type_text(&self) -> Option<String> {
        match self {
            Definition::Local { type_text, .. } => type_text.clone(),
            Definition::Parameter { type_text } => type_text.clone(),
            Definition::Field(field) => field.type_text(),
            Definition::Method(method) => method.return_type_text(),
            Definition::Class(_) => None,
        }
    }

    /// The expression the definition is initialized with, where one exists.
    pub fn initializer(&self) -> Option<JavaExpr<'s>> {
        match self {
            Definition::Local { initializer, .. } => *initializer,
            Definition::Field(field) => field.initializer(),
            _ => None,
        }
    }
}

impl<'s> JavaExpr<'s> {
    pub(crate) fn new(set: &'s SourceSet, file: FileId, node: Node<'s>) -> Self {
        JavaExpr { set, file, node }
    }

    pub fn set(&self) -> &'s SourceSet {
        self.set
    }

    pub fn file_id(&self) -> FileId {
        self.file
    }

    pub fn node(&self) -> Node<'s> {
        self.node
    }

    pub fn kind(&self) -> &'s str {
        self.node.kind()
    }

    pub fn span(&self) -> Span {
        Span::new(self.node.start_byte(), self.node.end_byte())
    }

    pub fn text(&self) -> &'s str {
        node_text(self.set.file(self.file).text(), self.node)
    }

    fn wrap(&self, node: Node<'s>) -> JavaExpr<'s> {
        JavaExpr::new(self.set, self.file, node)
    }

    /// A handle over another node of the same file.
    pub(crate) fn wrap_node(&self, node: Node<'s>) -> JavaExpr<'s> {
        self.wrap(node)
    }

    /// A child accessed by tree-sitter field name (`left`, `right`, ...).
    pub fn child_by_field(&self, field: &str) -> Option<JavaExpr<'s>> {
        self.node.child_by_field_name(field).map(|n| self.wrap(n))
    }

    pub fn named_child(&self, index: usize) -> Option<JavaExpr<'s>> {
        self.node.named_child(index).map(|n| self.wrap(n))
    }

    /// Strips wrappers that don't change meaning: parentheses and casts.
    pub fn meaningful(&self) -> JavaExpr<'s> {
        let mut node = self.node;
        loop {
            node = match node.kind() {
                "parenthesized_expression" => match node.named_child(0) {
                    Some(inner) => inner,
                    None => break,
                },
                "cast_expression" => match node.child_by_field_name("value") {
                    Some(inner) => inner,
                    None => break,
                },
                _ => break,
            };
        }
        self.wrap(node)
    }

    pub fn parent(&self) -> Option<JavaExpr<'s>> {
        self.node.parent().map(|p| self.wrap(p))
    }

    /// All descendant nodes of the given kind, in source order.
    pub fn find_all(&self, kind: &str) -> Vec<JavaExpr<'s>> {
        let mut out = Vec::new();
        visit_nodes(self.node, &mut |node| {
            if node.kind() == kind {
                out.push(self.wrap(node));
            }
        });
        out
    }

    pub fn is_this(&self) -> bool {
        self.meaningful().kind() == "this"
    }

    pub fn as_identifier(&self) -> Option<&'s str> {
        let expr = self.meaningful();
        (expr.kind() == "identifier").then(|| expr.text())
    }

    /// The contents of a string literal, quotes stripped and common escapes
    /// decoded.
    pub fn as_string_literal(&self) -> Option<String> {
        let expr = self.meaningful();
        if expr.kind() != "string_literal" {
            return None;
        }
        let raw = expr.text();
        let inner = raw.strip_prefix('"')?.strip_suffix('"')?;
        Some(crate::unescape_string_literal(inner))
    }

    /// Decomposes a `method_invocation` node.
    pub fn as_method_call(&self) -> Option<MethodCall<'s>> {
        let expr = self.meaningful();
        if expr.kind() != "method_invocation" {
            return None;
        }
        let name_node = expr.node.child_by_field_name("name")?;
        let name = node_text(self.set.file(self.file).text(), name_node);
        let receiver = expr
            .node
            .child_by_field_name("object")
            .map(|object| self.wrap(object));
        let args = expr
            .node
            .child_by_field_name("arguments")
            .map(|arguments| {
                let mut cursor = arguments.walk();
                arguments
                    .named_children(&mut cursor)
                    .filter(|arg| arg.kind() != "line_comment" && arg.kind() != "block_comment")
                    .map(|arg| self.wrap(arg))
                    .collect()
            })
            .unwrap_or_default();
        Some(MethodCall {
            receiver,
            name,
            args,
            call: expr,
        })
    }

    /// Decomposes an `object_creation_expression` into type name and
    /// constructor arguments.
    pub fn as_object_creation(&self) -> Option<(String, Vec<JavaExpr<'s>>)> {
        let expr = self.meaningful();
        if expr.kind() != "object_creation_expression" {
            return None;
        }
        let ty = expr.node.child_by_field_name("type")?;
        let type_name = java_type_name(node_text(self.set.file(self.file).text(), ty));
        let args = expr
            .node
            .child_by_field_name("arguments")
            .map(|arguments| {
                let mut cursor = arguments.walk();
                arguments
                    .named_children(&mut cursor)
                    .map(|arg| self.wrap(arg))
                    .collect()
            })
            .unwrap_or_default();
        Some((type_name, args))
    }

    /// The method or constructor this expression appears in.
    pub fn enclosing_method(&self) -> Option<MethodDecl<'s>> {
        let mut current = self.node;
        while let Some(parent) = current.parent() {
            if matches!(parent.kind(), "method_declaration" | "constructor_declaration") {
                return Some(MethodDecl::new(self.set, self.file, parent));
            }
            current = parent;
        }
        None
    }

    /// The innermost class or interface this expression appears in.
    pub fn enclosing_class(&self) -> Option<ClassDecl<'s>> {
        let mut current = self.node;
        while let Some(parent) = current.parent() {
            if matches!(parent.kind(), "class_declaration" | "interface_declaration") {
                return Some(ClassDecl::new(self.set, self.file, parent));
            }
            current = parent;
        }
        None
    }

    /// Resolves an identifier or field access to its definition inside the
    /// source set. Anything declared outside the set resolves to `None`.
    pub fn resolve(&self) -> Option<Definition<'s>> {
        let expr = self.meaningful();
        match expr.kind() {
            "identifier" => expr.resolve_name(expr.text()),
            "field_access" => {
                let object = expr.wrap(expr.node.child_by_field_name("object")?);
                let field_node = expr.node.child_by_field_name("field")?;
                let field_name = node_text(self.set.file(self.file).text(), field_node);
                expr.resolve_member(object, field_name)
            }
            _ => None,
        }
    }

    fn resolve_name(&self, name: &str) -> Option<Definition<'s>> {
        if let Some(method) = self.enclosing_method() {
            // Shadowing: the last declaration before the use site wins.
            let mut best: Option<Definition<'s>> = None;
            if let Some(body) = method.body() {
                for decl in body.find_all("local_variable_declaration") {
                    if decl.node.start_byte() >= self.node.start_byte() {
                        continue;
                    }
                    let type_text = decl
                        .node
                        .child_by_field_name("type")
                        .map(|t| node_text(self.set.file(self.file).text(), t).to_string());
                    let mut cursor = decl.node.walk();
                    for declarator in decl.node.named_children(&mut cursor) {
                        if declarator.kind() != "variable_declarator" {
                            continue;
                        }
                        let Some(decl_name) = declarator.child_by_field_name("name") else {
                            continue;
                        };
                        if node_text(self.set.file(self.file).text(), decl_name) != name {
                            continue;
                        }
                        best = Some(Definition::Local {
                            type_text: type_text.clone(),
                            initializer: declarator
                                .child_by_field_name("value")
                                .map(|v| self.wrap(v)),
                        });
                    }
                }
            }
            if best.is_some() {
                return best;
            }

            for (param_type, param_name) in method.parameters() {
                if param_name == name {
                    return Some(Definition::Parameter {
                        type_text: param_type,
                    });
                }
            }
        }

        let mut class = self.enclosing_class();
        while let Some(current) = class {
            if let Some(field) = current.find_field_in_hierarchy(name) {
                return Some(Definition::Field(field));
            }
            class = current.enclosing_class();
        }

        if let Some(class) = self.set.class_named(name) {
            return Some(Definition::Class(class));
        }

        // Static imports bring foreign constants into scope by simple name.
        for import in self.set.file(self.file).imports() {
            if !import.is_static {
                continue;
            }
            let Some((class_path, member)) = import.path.rsplit_once('.') else {
                continue;
            };
            if member != name {
                continue;
            }
            let class_simple = class_path.rsplit('.').next().unwrap_or(class_path);
            if let Some(class) = self.set.class_named(class_simple) {
                if let Some(field) = class.find_field(name) {
                    return Some(Definition::Field(field));
                }
            }
        }

        None
    }

    fn resolve_member(&self, object: JavaExpr<'s>, member: &str) -> Option<Definition<'s>> {
        if object.is_this() {
            let mut class = self.enclosing_class();
            while let Some(current) = class {
                if let Some(field) = current.find_field_in_hierarchy(member) {
                    return Some(Definition::Field(field));
                }
                class = current.enclosing_class();
            }
            return None;
        }

        let class = match object.resolve() {
            Some(Definition::Class(class)) => Some(class),
            Some(definition) => definition
                .type_text()
                .map(|ty| java_type_name(&ty))
                .and_then(|ty| self.set.class_named(&ty)),
            None => object
                .as_identifier()
                .and_then(|name| self.set.class_named(name)),
        }?;
        class.find_field(member).map(Definition::Field)
    }
}

impl std::fmt::Debug for JavaExpr<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JavaExpr({} @ {:?})", self.kind(), self.span())
    }
}

impl<'s> MethodCall<'s> {
    /// Resolves the call to a method declared inside the source set.
    ///
    /// Overloads are disambiguated by arity only; with no arity match the
    /// first overload wins.
    pub fn resolve_declaration(&self) -> Option<MethodDecl<'s>> {
        let class = match &self.receiver {
            None => self.call.enclosing_class()?,
            Some(receiver) if receiver.is_this() => self.call.enclosing_class()?,
            Some(receiver) => match receiver.resolve() {
                Some(Definition::Class(class)) => class,
                Some(definition) => {
                    let ty = java_type_name(&definition.type_text()?);
                    self.call.set().class_named(&ty)?
                }
                None => return None,
            },
        };

        let overloads = class.find_methods(self.name);
        overloads
            .iter()
            .find(|m| m.parameters().len() == self.args.len())
            .or_else(|| overloads.first())
            .cloned()
    }
}

const MAX_HIERARCHY_HOPS: usize = 8;

/// A `class_declaration` or `interface_declaration`.
#[derive(Clone, Copy)]
pub struct ClassDecl<'s> {
    set: &'s SourceSet,
    file: FileId,
    node: Node<'s>,
}

impl<'s> ClassDecl<'s> {
    pub(crate) fn new(set: &'s SourceSet, file: FileId, node: Node<'s>) -> Self {
        ClassDecl { set, file, node }
    }

    fn source(&self) -> &'s str {
        self.set.file(self.file).text()
    }

    pub fn set(&self) -> &'s SourceSet {
        self.set
    }

    pub fn span(&self) -> Span {
        Span::new(self.node.start_byte(), self.node.end_byte())
    }

    pub fn name(&self) -> Option<&'s str> {
        self.node
            .child_by_field_name("name")
            .map(|name| node_text(self.source(), name))
    }

    pub fn is_interface(&self) -> bool {
        self.node.kind() == "interface_declaration"
    }

    pub fn annotations(&self) -> Vec<ParsedAnnotation> {
        self.node
            .child_by_field_name("modifiers")
            .or_else(|| find_named_child(self.node, "modifiers"))
            .map(|modifiers| collect_annotations(modifiers, self.source()))
            .unwrap_or_default()
    }

    /// The simple name of the extended class, generics stripped.
    pub fn superclass_name(&self) -> Option<String> {
        let superclass = self.node.child_by_field_name("superclass")?;
        let ty = superclass.named_child(0)?;
        Some(java_type_name(node_text(self.source(), ty)))
    }

    /// Simple names of extended/implemented interfaces, generics stripped.
    pub fn interface_names(&self) -> Vec<String> {
        let mut out = Vec::new();
        for kind in ["super_interfaces", "extends_interfaces"] {
            let Some(clause) = find_named_child(self.node, kind) else {
                continue;
            };
            let Some(list) = find_named_child(clause, "type_list") else {
                continue;
            };
            let mut cursor = list.walk();
            for ty in list.named_children(&mut cursor) {
                out.push(java_type_name(node_text(self.source(), ty)));
            }
        }
        out
    }

    /// Generic type arguments of an interface this class extends or
    /// implements, by the interface's simple name.
    pub fn interface_type_arguments(&self, interface: &str) -> Vec<String> {
        for kind in ["super_interfaces", "extends_interfaces"] {
            let Some(clause) = find_named_child(self.node, kind) else {
                continue;
            };
            let Some(list) = find_named_child(clause, "type_list") else {
                continue;
            };
            let mut cursor = list.walk();
            for ty in list.named_children(&mut cursor) {
                let text = node_text(self.source(), ty);
                if java_type_name(text) != interface {
                    continue;
                }
                let Some(open) = text.find('<') else {
                    continue;
                };
                let inner = text[open + 1..].trim_end().trim_end_matches('>');
                return inner
                    .split(',')
                    .map(|arg| arg.trim().to_string())
                    .filter(|arg| !arg.is_empty())
                    .collect();
            }
        }
        Vec::new()
    }

    fn body(&self) -> Option<Node<'s>> {
        self.node
            .child_by_field_name("body")
            .or_else(|| find_named_child(self.node, "class_body"))
            .or_else(|| find_named_child(self.node, "interface_body"))
    }

    pub fn fields(&self) -> Vec<FieldDecl<'s>> {
        let Some(body) = self.body() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            if child.kind() != "field_declaration" {
                continue;
            }
            let mut inner = child.walk();
            for declarator in child.named_children(&mut inner) {
                if declarator.kind() == "variable_declarator" {
                    out.push(FieldDecl {
                        set: self.set,
                        file: self.file,
                        declaration: child,
                        declarator,
                    });
                }
            }
        }
        out
    }

    pub fn find_field(&self, name: &str) -> Option<FieldDecl<'s>> {
        self.fields().into_iter().find(|f| f.name() == Some(name))
    }

    /// The class this one extends, when it is declared in the same set.
    pub fn superclass(&self) -> Option<ClassDecl<'s>> {
        self.set.class_named(&self.superclass_name()?)
    }

    /// Finds a field declared on this class or inherited from a superclass
    /// in the set. The walk is bounded so a cyclic `extends` chain in broken
    /// source terminates.
    pub fn find_field_in_hierarchy(&self, name: &str) -> Option<FieldDecl<'s>> {
        let mut class = Some(*self);
        for _ in 0..MAX_HIERARCHY_HOPS {
            let current = class?;
            if let Some(field) = current.find_field(name) {
                return Some(field);
            }
            class = current.superclass();
        }
        None
    }

    pub fn methods(&self) -> Vec<MethodDecl<'s>> {
        let Some(body) = self.body() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            if matches!(child.kind(), "method_declaration" | "constructor_declaration") {
                out.push(MethodDecl::new(self.set, self.file, child));
            }
        }
        out
    }

    pub fn find_methods(&self, name: &str) -> Vec<MethodDecl<'s>> {
        self.methods()
            .into_iter()
            .filter(|m| m.name() == Some(name))
            .collect()
    }

    /// The class this one is declared inside, for nested classes.
    pub fn enclosing_class(&self) -> Option<ClassDecl<'s>> {
        let mut current = self.node;
        while let Some(parent) = current.parent() {
            if matches!(parent.kind(), "class_declaration" | "interface_declaration") {
                return Some(ClassDecl::new(self.set, self.file, parent));
            }
            current = parent;
        }
        None
    }
}

impl std::fmt::Debug for ClassDecl<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ClassDecl({:?} @ {:?})", self.name(), self.span())
    }
}

/// One declarator of a `field_declaration` (Java allows several per
/// statement).
#[derive(Clone, Copy)]
pub struct FieldDecl<'s> {
    set: &'s SourceSet,
    file: FileId,
    declaration: Node<'s>,
    declarator: Node<'s>,
}

impl<'s> FieldDecl<'s> {
    fn source(&self) -> &'s str {
        self.set.file(self.file).text()
    }

    pub fn name(&self) -> Option<&'s str> {
        self.declarator
            .child_by_field_name("name")
            .map(|name| node_text(self.source(), name))
    }

    pub fn span(&self) -> Span {
        Span::new(self.declarator.start_byte(), self.declarator.end_byte())
    }

    pub fn type_text(&self) -> Option<String> {
        self.declaration
            .child_by_field_name("type")
            .map(|ty| node_text(self.source(), ty).to_string())
    }

    pub fn initializer(&self) -> Option<JavaExpr<'s>> {
        self.declarator
            .child_by_field_name("value")
            .map(|value| JavaExpr::new(self.set, self.file, value))
    }

    /// The class or interface the field is declared in.
    pub fn declaring_class(&self) -> Option<ClassDecl<'s>> {
        let mut current = self.declaration;
        while let Some(parent) = current.parent() {
            if matches!(parent.kind(), "class_declaration" | "interface_declaration") {
                return Some(ClassDecl::new(self.set, self.file, parent));
            }
            current = parent;
        }
        None
    }

    fn modifier_text(&self) -> &'s str {
        self.declaration
            .child_by_field_name("modifiers")
            .or_else(|| find_named_child(self.declaration, "modifiers"))
            .map(|m| node_text(self.source(), m))
            .unwrap_or("")
    }

    pub fn is_static(&self) -> bool {
        self.modifier_text().split_whitespace().any(|m| m == "static")
    }

    pub fn is_final(&self) -> bool {
        self.modifier_text().split_whitespace().any(|m| m == "final")
    }
}

impl std::fmt::Debug for FieldDecl<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FieldDecl({:?} @ {:?})", self.name(), self.span())
    }
}

/// A `method_declaration` or `constructor_declaration`.
#[derive(Clone, Copy)]
pub struct MethodDecl<'s> {
    set: &'s SourceSet,
    file: FileId,
    node: Node<'s>,
}

impl<'s> MethodDecl<'s> {
    pub(crate) fn new(set: &'s SourceSet, file: FileId, node: Node<'s>) -> Self {
        MethodDecl { set, file, node }
    }

    fn source(&self) -> &'s str {
        self.set.file(self.file).text()
    }

    pub fn span(&self) -> Span {
        Span::new(self.node.start_byte(), self.node.end_byte())
    }

    pub fn name(&self) -> Option<&'s str> {
        self.node
            .child_by_field_name("name")
            .map(|name| node_text(self.source(), name))
    }

    pub fn is_constructor(&self) -> bool {
        self.node.kind() == "constructor_declaration"
    }

    pub fn return_type_text(&self) -> Option<String> {
        self.node
            .child_by_field_name("type")
            .map(|ty| node_text(self.source(), ty).to_string())
    }

    /// Parameters as `(type, name)` pairs, in declaration order.
    pub fn parameters(&self) -> Vec<(Option<String>, String)> {
        let Some(params) = self.node.child_by_field_name("parameters") else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut cursor = params.walk();
        for param in params.named_children(&mut cursor) {
            if !matches!(param.kind(), "formal_parameter" | "spread_parameter") {
                continue;
            }
            let ty = param
                .child_by_field_name("type")
                .or_else(|| find_named_child(param, "type_identifier"))
                .map(|t| node_text(self.source(), t).to_string());
            let name = param
                .child_by_field_name("name")
                .or_else(|| find_named_child(param, "variable_declarator"))
                .and_then(|n| {
                    if n.kind() == "variable_declarator" {
                        n.child_by_field_name("name")
                    } else {
                        Some(n)
                    }
                })
                .or_else(|| find_named_child(param, "identifier"));
            if let Some(name) = name {
                out.push((ty, node_text(self.source(), name).to_string()));
            }
        }
        out
    }

    pub fn annotations(&self) -> Vec<ParsedAnnotation> {
        self.node
            .child_by_field_name("modifiers")
            .or_else(|| find_named_child(self.node, "modifiers"))
            .map(|modifiers| collect_annotations(modifiers, self.source()))
            .unwrap_or_default()
    }

    pub fn body(&self) -> Option<JavaExpr<'s>> {
        self.node
            .child_by_field_name("body")
            .map(|body| JavaExpr::new(self.set, self.file, body))
    }

    /// The expressions of every `return` statement in the body.
    pub fn return_expressions(&self) -> Vec<JavaExpr<'s>> {
        let Some(body) = self.body() else {
            return Vec::new();
        };
        body.find_all("return_statement")
            .into_iter()
            .filter_map(|ret| ret.node().named_child(0).map(|e| JavaExpr::new(self.set, self.file, e)))
            .collect()
    }
}

impl std::fmt::Debug for MethodDecl<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MethodDecl({:?} @ {:?})", self.name(), self.span())
    }
}
