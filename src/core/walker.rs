//! Type reference extraction over tree-sitter TypeScript syntax.

use tree_sitter::Node as TSNode;

use crate::parsers::common::{extract_text, split_qualified};

/// The node kinds the walker tells apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxKind {
    /// A named type in annotation position: `Foo`, `ns.Foo`, `Foo<Bar>`
    TypeReference,
    /// The head of an `extends`/`implements` clause, an expression rather than an annotation
    HeritageReference,
    /// The name being introduced by a declaration, type parameter or `infer`
    DeclarationName,
    Other,
}

impl SyntaxKind {
    pub fn of(node: TSNode<'_>) -> Self {
        match node.kind() {
            "generic_type" => {
                if is_heritage_head(node) {
                    SyntaxKind::HeritageReference
                } else {
                    SyntaxKind::TypeReference
                }
            }
            "type_identifier" | "nested_type_identifier" => classify_identifier(node),
            _ => SyntaxKind::Other,
        }
    }
}

fn classify_identifier(node: TSNode<'_>) -> SyntaxKind {
    let Some(parent) = node.parent() else {
        return SyntaxKind::TypeReference;
    };

    match parent.kind() {
        // Part of a larger reference that is reported on its own
        "generic_type" | "nested_type_identifier" => return SyntaxKind::Other,
        "infer_type" => return SyntaxKind::DeclarationName,
        _ => {}
    }

    if parent
        .child_by_field_name("name")
        .is_some_and(|name| name.id() == node.id())
    {
        return SyntaxKind::DeclarationName;
    }
    if is_heritage_head(node) {
        return SyntaxKind::HeritageReference;
    }
    SyntaxKind::TypeReference
}

fn is_heritage_head(node: TSNode<'_>) -> bool {
    node.parent()
        .is_some_and(|parent| matches!(parent.kind(), "extends_type_clause" | "implements_clause"))
}

/// A syntactic occurrence of a named type
#[derive(Debug, Clone, Copy)]
pub struct TypeReferenceNode<'tree> {
    node: TSNode<'tree>,
}

impl<'tree> TypeReferenceNode<'tree> {
    pub fn node(&self) -> TSNode<'tree> {
        self.node
    }

    /// The (possibly qualified) name without type arguments
    pub fn name_node(&self) -> TSNode<'tree> {
        if self.node.kind() == "generic_type" {
            self.node.child_by_field_name("name").unwrap_or(self.node)
        } else {
            self.node
        }
    }

    pub fn name_parts(&self, source: &[u8]) -> Vec<String> {
        split_qualified(extract_text(&self.name_node(), source))
    }

    pub fn type_arguments(&self) -> Option<TSNode<'tree>> {
        if self.node.kind() == "generic_type" {
            self.node.child_by_field_name("type_arguments")
        } else {
            None
        }
    }

    /// Source text with whitespace collapsed, e.g. `Box<Foo>`
    pub fn display_text(&self, source: &[u8]) -> String {
        extract_text(&self.node, source)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn line(&self) -> usize {
        self.node.start_position().row + 1
    }
}

pub trait TypeReferenceVisitor<'tree> {
    fn visit_type_reference(&mut self, reference: TypeReferenceNode<'tree>);
}

impl<'tree, F> TypeReferenceVisitor<'tree> for F
where
    F: FnMut(TypeReferenceNode<'tree>),
{
    fn visit_type_reference(&mut self, reference: TypeReferenceNode<'tree>) {
        self(reference)
    }
}

/// Depth-first walk of the whole subtree under `root`.
///
/// Every type reference is reported, including ones nested inside the type
/// arguments of another reference; matching never stops the descent.
pub fn walk_type_references<'tree, V>(root: TSNode<'tree>, visitor: &mut V)
where
    V: TypeReferenceVisitor<'tree> + ?Sized,
{
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        match SyntaxKind::of(node) {
            SyntaxKind::TypeReference => visitor.visit_type_reference(TypeReferenceNode { node }),
            SyntaxKind::HeritageReference | SyntaxKind::DeclarationName | SyntaxKind::Other => {}
        }

        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

pub fn collect_type_references<'tree>(root: TSNode<'tree>) -> Vec<TypeReferenceNode<'tree>> {
    let mut references = Vec::new();
    walk_type_references(root, &mut |reference: TypeReferenceNode<'tree>| {
        references.push(reference)
    });
    references
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::typescript::TypeScriptParser;
    use std::path::Path;

    fn reference_names(code: &str) -> Vec<String> {
        let parsed = TypeScriptParser::new()
            .unwrap()
            .parse_source(Path::new("test.d.ts"), code.to_string())
            .unwrap();
        let source = parsed.source_bytes();
        collect_type_references(parsed.tree.root_node())
            .iter()
            .map(|reference| reference.display_text(source))
            .collect()
    }

    #[test]
    fn nested_generic_arguments_are_all_reported() {
        let names = reference_names("declare function f(a: Map<Key, Array<Value>>): Result;");
        assert_eq!(
            names,
            vec!["Map<Key, Array<Value>>", "Key", "Array<Value>", "Value", "Result"]
        );
    }

    #[test]
    fn declaration_names_and_primitives_are_not_references() {
        let names = reference_names(
            "interface Foo<T extends Bound> { a: string; b: T; }\ntype Alias = number;",
        );
        assert_eq!(names, vec!["Bound", "T"]);
    }

    #[test]
    fn qualified_names_are_single_references() {
        let names = reference_names("declare let x: ns.inner.Thing;");
        assert_eq!(names, vec!["ns.inner.Thing"]);
    }

    #[test]
    fn heritage_heads_are_skipped_but_their_arguments_are_not() {
        let names = reference_names("interface A extends Base<Arg> { }");
        assert_eq!(names, vec!["Arg"]);
    }
}
