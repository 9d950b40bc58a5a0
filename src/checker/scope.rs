//! Lexical name resolution over the CST.
//!
//! Lookups walk from the use site up through enclosing scopes, then fall
//! back to the top level of every script (non-module) file and to the
//! `declare global` blocks of module files. Named imports of relative
//! modules are followed into the exporting file. Declaration order and
//! temporal dead zones are not modelled.

use crate::program::{Program, SourceFile};
use crate::ts::SyntaxNode;

/// Bound on `import`/`export` indirection.
const MAX_IMPORT_HOPS: usize = 8;

/// What a value name resolved to.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Binding<'a> {
    /// A `variable_declarator` with an identifier name.
    Variable(SyntaxNode<'a>),
    /// A `required_parameter`, an `optional_parameter`, or the bare
    /// identifier parameter of `x => ...`.
    Parameter { node: SyntaxNode<'a>, optional: bool },
    /// A name inside the destructuring `pattern` of `owner`: a declarator,
    /// a parameter or a `for ... of` statement.
    Destructured {
        owner: SyntaxNode<'a>,
        pattern: SyntaxNode<'a>,
    },
    /// The loop variable of `for (const x of xs)`.
    ForOf(SyntaxNode<'a>),
    /// A function declaration or ambient function signature.
    Function(SyntaxNode<'a>),
    /// A class declaration; the value is its constructor.
    Class(SyntaxNode<'a>),
    /// Named import, resolved by [`resolve_value`] before it is returned.
    Import {
        source: SyntaxNode<'a>,
        name: &'a str,
    },
    /// Declared, but without a type the checker models (enums, namespace
    /// and default imports, catch parameters, `for ... in` keys).
    Opaque,
}

pub(crate) fn resolve_value<'a>(
    program: &'a Program,
    use_site: SyntaxNode<'a>,
    name: &str,
) -> Option<Binding<'a>> {
    let mut found = None;
    let mut current = use_site.parent();
    while let Some(scope) = current {
        if let Some(binding) = value_in_scope(scope, name) {
            found = Some(binding);
            break;
        }
        current = scope.parent();
    }

    let binding = match found {
        Some(binding) => binding,
        None => global_containers(program, use_site.file())
            .find_map(|container| declarations_in(container, name))?,
    };
    Some(follow_import(program, binding, 0))
}

/// Resolve a type name to its `type_alias_declaration`,
/// `interface_declaration` or class declaration.
pub(crate) fn resolve_type<'a>(
    program: &'a Program,
    use_site: SyntaxNode<'a>,
    name: &str,
) -> Option<SyntaxNode<'a>> {
    let mut current = Some(use_site);
    while let Some(scope) = current {
        if is_statement_container(scope.kind()) {
            if let Some(found) = types_in(program, scope, name, 0) {
                return Some(found);
            }
        }
        current = scope.parent();
    }

    global_containers(program, use_site.file())
        .find_map(|container| types_in(program, container, name, 0))
}

/// Script files contribute their top level; module files only their
/// `declare global` blocks.
fn global_containers<'a>(
    program: &'a Program,
    exclude: &'a SourceFile,
) -> impl Iterator<Item = SyntaxNode<'a>> + 'a {
    program.other_files(exclude).flat_map(|file| {
        let root = file.root();
        if file.is_module() {
            root.named_children()
                .into_iter()
                .filter_map(global_block)
                .collect::<Vec<_>>()
        } else {
            vec![root]
        }
    })
}

/// The body of `declare global { ... }`.
fn global_block(stmt: SyntaxNode<'_>) -> Option<SyntaxNode<'_>> {
    if stmt.kind() != "ambient_declaration" || !stmt.has_token("global") {
        return None;
    }
    stmt.named_children()
        .into_iter()
        .find(|child| child.kind() == "statement_block")
}

fn follow_import<'a>(program: &'a Program, binding: Binding<'a>, hops: usize) -> Binding<'a> {
    let Binding::Import { source, name } = binding else {
        return binding;
    };
    if hops >= MAX_IMPORT_HOPS {
        return Binding::Opaque;
    }

    let exported = string_value(source)
        .and_then(|specifier| program.resolve_module(source.file(), specifier))
        .and_then(|module| exported_value(module, name));
    match exported {
        Some(next) => follow_import(program, next, hops + 1),
        None => Binding::Opaque,
    }
}

fn exported_value<'a>(module: &'a SourceFile, name: &str) -> Option<Binding<'a>> {
    let root = module.root();
    root.named_children().into_iter().find_map(|stmt| {
        if stmt.kind() != "export_statement" {
            return None;
        }
        if let Some(decl) = stmt.field("declaration") {
            return statement_binding(decl, name);
        }
        let local = exported_local_name(stmt, name)?;
        declarations_in(root, local)
    })
}

fn exported_type<'a>(
    program: &'a Program,
    module: &'a SourceFile,
    name: &str,
    hops: usize,
) -> Option<SyntaxNode<'a>> {
    let root = module.root();
    if let Some(found) = root
        .named_children()
        .into_iter()
        .filter(|stmt| stmt.kind() == "export_statement")
        .find_map(|stmt| type_statement(stmt, name))
    {
        return Some(found);
    }

    let local = root
        .named_children()
        .into_iter()
        .filter(|stmt| stmt.kind() == "export_statement")
        .find_map(|stmt| exported_local_name(stmt, name))?;
    types_in(program, root, local, hops)
}

/// `export { local as name }` without a `from` clause.
fn exported_local_name<'a>(stmt: SyntaxNode<'a>, name: &str) -> Option<&'a str> {
    if stmt.field("source").is_some() {
        return None;
    }
    let clause = stmt
        .named_children()
        .into_iter()
        .find(|child| child.kind() == "export_clause")?;
    clause.named_children().into_iter().find_map(|specifier| {
        let local = specifier.field("name")?;
        let exported = specifier.field("alias").unwrap_or(local);
        (exported.text() == name).then(|| local.text())
    })
}

fn types_in<'a>(
    program: &'a Program,
    container: SyntaxNode<'a>,
    name: &str,
    hops: usize,
) -> Option<SyntaxNode<'a>> {
    let statements = container.named_children();
    if let Some(found) = statements
        .iter()
        .find_map(|stmt| type_statement(*stmt, name))
    {
        return Some(found);
    }

    if hops >= MAX_IMPORT_HOPS {
        return None;
    }
    statements.into_iter().find_map(|stmt| {
        if stmt.kind() != "import_statement" {
            return None;
        }
        let (source, imported) = named_import(stmt, name)?;
        let module = program.resolve_module(source.file(), string_value(source)?)?;
        exported_type(program, module, imported, hops + 1)
    })
}

fn is_statement_container(kind: &str) -> bool {
    matches!(
        kind,
        "program" | "statement_block" | "switch_case" | "switch_default" | "class_static_block"
    )
}

fn value_in_scope<'a>(scope: SyntaxNode<'a>, name: &str) -> Option<Binding<'a>> {
    match scope.kind() {
        kind if is_statement_container(kind) => declarations_in(scope, name),
        "function_declaration"
        | "function_expression"
        | "function"
        | "generator_function"
        | "generator_function_declaration"
        | "method_definition"
        | "arrow_function" => function_scope(scope, name),
        "for_statement" => scope
            .field("initializer")
            .and_then(|init| declaration_binding(init, name)),
        "for_in_statement" => {
            scope.field("kind")?;
            let left = scope.field("left")?;
            if !pattern_binds(left, name) {
                return None;
            }
            let is_of = scope.field("operator").is_some_and(|op| op.text() == "of");
            Some(match left.kind() {
                "identifier" if is_of => Binding::ForOf(scope),
                "object_pattern" | "array_pattern" if is_of => Binding::Destructured {
                    owner: scope,
                    pattern: left,
                },
                _ => Binding::Opaque,
            })
        }
        "catch_clause" => {
            let parameter = scope.field("parameter")?;
            pattern_binds(parameter, name).then_some(Binding::Opaque)
        }
        "class" | "class_declaration" => {
            let class_name = scope.field("name")?;
            (class_name.text() == name).then_some(Binding::Class(scope))
        }
        _ => None,
    }
}

fn function_scope<'a>(scope: SyntaxNode<'a>, name: &str) -> Option<Binding<'a>> {
    if let Some(parameter) = scope.field("parameter") {
        if parameter.text() == name {
            return Some(Binding::Parameter {
                node: parameter,
                optional: false,
            });
        }
    }

    if let Some(parameters) = scope.field("parameters") {
        for parameter in parameters.named_children() {
            if !matches!(parameter.kind(), "required_parameter" | "optional_parameter") {
                continue;
            }
            let Some(pattern) = parameter.field("pattern") else {
                continue;
            };
            if pattern.kind() == "identifier" && pattern.text() == name {
                return Some(Binding::Parameter {
                    node: parameter,
                    optional: parameter.kind() == "optional_parameter",
                });
            }
            if pattern_binds(pattern, name) {
                return Some(Binding::Destructured {
                    owner: parameter,
                    pattern,
                });
            }
        }
    }

    // Named function expressions bind their own name inside the body.
    if matches!(
        scope.kind(),
        "function_expression" | "function" | "generator_function"
    ) && scope.field("name").is_some_and(|n| n.text() == name)
    {
        return Some(Binding::Function(scope));
    }

    None
}

fn declarations_in<'a>(container: SyntaxNode<'a>, name: &str) -> Option<Binding<'a>> {
    container
        .named_children()
        .into_iter()
        .find_map(|stmt| statement_binding(stmt, name))
}

fn statement_binding<'a>(stmt: SyntaxNode<'a>, name: &str) -> Option<Binding<'a>> {
    match stmt.kind() {
        "lexical_declaration" | "variable_declaration" => declaration_binding(stmt, name),
        "export_statement" => stmt
            .field("declaration")
            .and_then(|decl| statement_binding(decl, name)),
        "ambient_declaration" => stmt.named_children().into_iter().find_map(|decl| {
            if decl.kind() == "statement_block" {
                declarations_in(decl, name)
            } else {
                statement_binding(decl, name)
            }
        }),
        "function_declaration" | "generator_function_declaration" | "function_signature" => {
            let decl_name = stmt.field("name")?;
            (decl_name.text() == name).then_some(Binding::Function(stmt))
        }
        "class_declaration" | "abstract_class_declaration" => {
            let decl_name = stmt.field("name")?;
            (decl_name.text() == name).then_some(Binding::Class(stmt))
        }
        "enum_declaration" => {
            let decl_name = stmt.field("name")?;
            (decl_name.text() == name).then_some(Binding::Opaque)
        }
        "import_statement" => import_binding(stmt, name),
        _ => None,
    }
}

fn declaration_binding<'a>(decl: SyntaxNode<'a>, name: &str) -> Option<Binding<'a>> {
    for declarator in decl.named_children() {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let Some(pattern) = declarator.field("name") else {
            continue;
        };
        if pattern.kind() == "identifier" {
            if pattern.text() == name {
                return Some(Binding::Variable(declarator));
            }
        } else if pattern_binds(pattern, name) {
            return Some(Binding::Destructured {
                owner: declarator,
                pattern,
            });
        }
    }
    None
}

fn type_statement<'a>(stmt: SyntaxNode<'a>, name: &str) -> Option<SyntaxNode<'a>> {
    match stmt.kind() {
        "type_alias_declaration"
        | "interface_declaration"
        | "class_declaration"
        | "abstract_class_declaration" => stmt
            .field("name")
            .is_some_and(|n| n.text() == name)
            .then_some(stmt),
        "export_statement" => stmt
            .field("declaration")
            .and_then(|decl| type_statement(decl, name)),
        "ambient_declaration" => stmt.named_children().into_iter().find_map(|decl| {
            if decl.kind() == "statement_block" {
                decl.named_children()
                    .into_iter()
                    .find_map(|inner| type_statement(inner, name))
            } else {
                type_statement(decl, name)
            }
        }),
        _ => None,
    }
}

/// Whether a binding pattern (identifier, object or array destructuring)
/// introduces `name`.
pub(crate) fn pattern_binds(pattern: SyntaxNode<'_>, name: &str) -> bool {
    match pattern.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => pattern.text() == name,
        "object_pattern" | "array_pattern" | "rest_pattern" => pattern
            .named_children()
            .into_iter()
            .any(|child| pattern_binds(child, name)),
        // Defaults (`{ a = 1 }`, `[b = 2]`) bind only their left side.
        "assignment_pattern" | "object_assignment_pattern" => pattern
            .field("left")
            .is_some_and(|left| pattern_binds(left, name)),
        "pair_pattern" => pattern
            .field("value")
            .is_some_and(|value| pattern_binds(value, name)),
        _ => false,
    }
}

fn import_binding<'a>(stmt: SyntaxNode<'a>, name: &str) -> Option<Binding<'a>> {
    if let Some((source, imported)) = named_import(stmt, name) {
        return Some(Binding::Import {
            source,
            name: imported,
        });
    }

    let clause = stmt
        .named_children()
        .into_iter()
        .find(|child| child.kind() == "import_clause")?;
    let binds = clause.named_children().into_iter().any(|item| match item.kind() {
        "identifier" => item.text() == name,
        "namespace_import" => item
            .first_named_child()
            .is_some_and(|ident| ident.text() == name),
        _ => false,
    });
    binds.then_some(Binding::Opaque)
}

/// `import { imported as name } from "source"`: the source string node and
/// the name the exporting module uses.
fn named_import<'a>(stmt: SyntaxNode<'a>, name: &str) -> Option<(SyntaxNode<'a>, &'a str)> {
    let source = stmt.field("source")?;
    let clause = stmt
        .named_children()
        .into_iter()
        .find(|child| child.kind() == "import_clause")?;
    let named = clause
        .named_children()
        .into_iter()
        .find(|item| item.kind() == "named_imports")?;

    named.named_children().into_iter().find_map(|specifier| {
        let imported = specifier.field("name")?;
        let bound = specifier.field("alias").unwrap_or(imported);
        (bound.text() == name && imported.kind() == "identifier")
            .then(|| (source, imported.text()))
    })
}

/// Contents of a plain string literal node.
pub(crate) fn string_value<'a>(node: SyntaxNode<'a>) -> Option<&'a str> {
    if node.kind() != "string" {
        return None;
    }
    let text = node.text();
    if text.len() < 2 {
        return None;
    }
    text.get(1..text.len() - 1)
}
