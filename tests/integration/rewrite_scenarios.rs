use std::cell::RefCell;
use ts_rewrite::{
    rewrite_file, rewrite_program, CompilerOptions, DeprecatedCallRule, Fragment,
    NullabilityPolicy, Printer, Program, RewriteError, SyntaxNode, Transform, TypeQuery,
    TypeQueryError,
};

fn program(sources: &[(&str, &str)]) -> Program {
    Program::from_sources(sources.iter().copied(), CompilerOptions::default()).unwrap()
}

fn migrate(program: &Program) -> Vec<ts_rewrite::FileRewrite> {
    let query = TypeQuery::new(program.type_checker(), NullabilityPolicy::NullOnly);
    rewrite_program(program, &DeprecatedCallRule::with_defaults(query)).unwrap()
}

fn migrate_one(source: &str) -> String {
    let program = program(&[("main.ts", source)]);
    let rule = DeprecatedCallRule::with_defaults(TypeQuery::new(
        program.type_checker(),
        NullabilityPolicy::NullOnly,
    ));
    rewrite_file(&program.source_files()[0], &rule, &Printer::new())
        .unwrap()
        .rewritten
}

#[test]
fn nullable_subject_takes_optional_chain_and_fallback() {
    let out = migrate_one(
        "type Maybe<T> = T | null;\nlet x: Maybe<string[]> = null;\nconst r = arr.deprecated_some(x, f);\n",
    );
    assert_eq!(
        out,
        "type Maybe<T> = T | null;\nlet x: Maybe<string[]> = null;\nconst r = x?.some(f) ?? false;\n"
    );
}

#[test]
fn non_nullable_subject_is_plain_call() {
    let out = migrate_one("let x: string[] = [];\nconst r = arr.deprecated_some(x, f);\n");
    assert_eq!(out, "let x: string[] = [];\nconst r = x.some(f);\n");
    assert!(!out.contains("?."));
    assert!(!out.contains("??"));
}

#[test]
fn two_occurrences_are_both_applied() {
    let source = "\
function check(a: number[], b: number[] | null) {
    // first
    if (u.deprecated_some(a, isOdd)) {
        return u.deprecated_some(b, (n) => n > 2);
    }
    return false;
}
";
    let out = migrate_one(source);
    assert_eq!(
        out,
        "\
function check(a: number[], b: number[] | null) {
    // first
    if (a.some(isOdd)) {
        return b?.some((n) => n > 2) ?? false;
    }
    return false;
}
"
    );
}

#[test]
fn formatting_and_comments_outside_edits_survive() {
    let source = "let  xs :number[]=[ ];   /* a */\n\n\tconst ok=u.deprecated_some( xs ,  /* pred */ f );// trailing\n";
    let out = migrate_one(source);
    assert_eq!(
        out,
        "let  xs :number[]=[ ];   /* a */\n\n\tconst ok=xs.some(f);// trailing\n"
    );
}

#[test]
fn declaration_files_are_never_visited() {
    let program = program(&[
        ("lib/types.d.ts", "declare const list: string[] | null;\ndeclare const legacy: typeof u.deprecated_some;\n"),
        ("main.ts", "u.deprecated_some(list, f);\n"),
    ]);

    let changed = migrate(&program);
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].path.to_str(), Some("main.ts"));
    assert_eq!(changed[0].rewritten, "list?.some(f) ?? false;\n");
}

#[test]
fn declaration_files_passed_directly_are_refused() {
    let program = program(&[("types.d.ts", "declare const list: string[];\n")]);
    let rule = DeprecatedCallRule::with_defaults(TypeQuery::new(
        program.type_checker(),
        NullabilityPolicy::NullOnly,
    ));
    let result = rewrite_file(&program.source_files()[0], &rule, &Printer::new());
    assert!(matches!(result, Err(RewriteError::DeclarationFile { .. })));
}

#[test]
fn negated_call_keeps_coalesce_grouped() {
    let out = migrate_one(
        "let xs: number[] | null = null;\nconst none = !u.deprecated_some(xs, f) && ready;\n",
    );
    assert_eq!(
        out,
        "let xs: number[] | null = null;\nconst none = !(xs?.some(f) ?? false) && ready;\n"
    );
}

#[test]
fn member_receivers_in_subject_position_are_preserved() {
    let out = migrate_one(
        "let state = { items: [1] };\nconst r = u.deprecated_some(state.items, f).valueOf();\n",
    );
    assert_eq!(
        out,
        "let state = { items: [1] };\nconst r = state.items.some(f).valueOf();\n"
    );
}

#[test]
fn tsx_files_are_supported() {
    let program = program(&[(
        "view.tsx",
        "let rows: string[] | null = null;\nconst v = <List hidden={u.deprecated_some(rows, isEmpty)} />;\n",
    )]);
    let changed = migrate(&program);
    assert_eq!(
        changed[0].rewritten,
        "let rows: string[] | null = null;\nconst v = <List hidden={rows?.some(isEmpty) ?? false} />;\n"
    );
}

#[test]
fn non_strict_mode_never_takes_the_nullable_branch() {
    let program = Program::from_sources(
        [("main.ts", "let x: string[] | null = null;\nu.deprecated_some(x, f);\n")],
        CompilerOptions {
            strict: false,
            ..CompilerOptions::default()
        },
    )
    .unwrap();
    let changed = migrate(&program);
    assert!(changed[0].rewritten.ends_with("\nx.some(f);\n"));
}

#[test]
fn nullable_member_subject_takes_the_fallback() {
    let out = migrate_one(
        "declare const cfg: { items: string[] | null };\nu.deprecated_some(cfg.items, f);\n",
    );
    assert!(out.ends_with("\ncfg.items?.some(f) ?? false;\n"));
}

#[test]
fn nullable_call_result_takes_the_fallback() {
    let out = migrate_one(
        "function get(): string[] | null {\n    return null;\n}\nu.deprecated_some(get(), f);\n",
    );
    assert!(out.ends_with("\nget()?.some(f) ?? false;\n"));
}

#[test]
fn nullable_destructured_parameter_takes_the_fallback() {
    let out = migrate_one(
        "function g({ xs }: { xs: string[] | null }) {\n    return u.deprecated_some(xs, f);\n}\n",
    );
    assert_eq!(
        out,
        "function g({ xs }: { xs: string[] | null }) {\n    return xs?.some(f) ?? false;\n}\n"
    );
}

#[test]
fn optional_chain_subject_continues_the_chain() {
    let out = migrate_one(
        "declare const a: { b: string[] } | null;\nu.deprecated_some(a?.b, f);\n",
    );
    assert!(out.ends_with("\na?.b.some(f);\n"));
}

#[test]
fn configured_ambient_global_resolves_in_subject() {
    let source = "u.deprecated_some(Deno.args, f);\n";
    let configured = Program::from_sources(
        [("main.ts", source)],
        CompilerOptions {
            ambient_globals: vec!["Deno".to_string()],
            ..CompilerOptions::default()
        },
    )
    .unwrap();
    let changed = migrate(&configured);
    assert_eq!(changed[0].rewritten, "Deno.args.some(f);\n");

    let unconfigured = program(&[("main.ts", source)]);
    let query = TypeQuery::new(unconfigured.type_checker(), NullabilityPolicy::NullOnly);
    let err = rewrite_program(&unconfigured, &DeprecatedCallRule::with_defaults(query)).unwrap_err();
    assert!(matches!(
        err,
        RewriteError::TypeQuery {
            source: TypeQueryError::UnresolvedSymbol { ref name, .. },
            ..
        } if name == "Deno"
    ));
}

#[test]
fn unresolved_subject_aborts_the_pass() {
    let program = program(&[
        ("a.ts", "let x: number[] = [];\nu.deprecated_some(x, f);\n"),
        ("b.ts", "u.deprecated_some(nowhere, f);\n"),
    ]);
    let query = TypeQuery::new(program.type_checker(), NullabilityPolicy::NullOnly);
    let err = rewrite_program(&program, &DeprecatedCallRule::with_defaults(query)).unwrap_err();

    assert!(matches!(
        err,
        RewriteError::TypeQuery {
            source: TypeQueryError::UnresolvedSymbol { .. },
            ..
        }
    ));
    assert!(err.to_string().contains("b.ts:1:1"));
}

/// Records every node it is offered and never matches.
#[derive(Default)]
struct Recorder {
    seen: RefCell<Vec<(&'static str, std::ops::Range<usize>)>>,
    replace_kind: Option<&'static str>,
}

impl Transform for Recorder {
    fn transform<'f>(&self, node: SyntaxNode<'f>) -> Result<Option<Fragment<'f>>, TypeQueryError> {
        self.seen.borrow_mut().push((node.kind(), node.span()));
        if Some(node.kind()) == self.replace_kind {
            return Ok(Some(Fragment::Identifier("replaced".to_string())));
        }
        Ok(None)
    }
}

#[test]
fn non_matching_transform_is_identity() {
    let source = "// header\nconst a = f(1, [2, 3]);\n\nexport default a;\n";
    let program = program(&[("main.ts", source)]);
    let recorder = Recorder::default();

    let rewrite = rewrite_file(&program.source_files()[0], &recorder, &Printer::new()).unwrap();
    assert_eq!(rewrite.rewritten, source);
    assert!(rewrite.edits.is_empty());

    // Pre-order: every node comes after the node containing it
    let seen = recorder.seen.borrow();
    assert_eq!(seen[0].0, "program");
    for window in seen.windows(2) {
        assert!(window[0].1.start <= window[1].1.start);
    }
}

#[test]
fn descendants_of_replaced_nodes_are_never_offered() {
    let program = program(&[("main.ts", "f(g(1), h(2));\nk(3);\n")]);
    let recorder = Recorder {
        replace_kind: Some("call_expression"),
        ..Recorder::default()
    };

    let rewrite = rewrite_file(&program.source_files()[0], &recorder, &Printer::new()).unwrap();
    assert_eq!(rewrite.rewritten, "replaced;\nreplaced;\n");

    let seen = recorder.seen.borrow();
    let calls = seen.iter().filter(|(kind, _)| *kind == "call_expression").count();
    assert_eq!(calls, 2);
    assert!(!seen.iter().any(|(kind, _)| *kind == "number"));
}
