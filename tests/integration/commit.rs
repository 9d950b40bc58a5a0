use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use ts_rewrite::{
    rewrite_program, CompilerOptions, DeprecatedCallRule, EditError, EditResult, FileWrite,
    NullabilityPolicy, Program, TypeQuery, WorkspaceGuard,
};

fn write_project(files: &[(&str, &str)]) -> (TempDir, Vec<PathBuf>) {
    let dir = TempDir::new().unwrap();
    let mut paths = Vec::new();
    for (name, text) in files {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, text).unwrap();
        paths.push(path);
    }
    (dir, paths)
}

fn pending_writes(paths: &[PathBuf]) -> Vec<FileWrite> {
    let program = Program::load(paths, CompilerOptions::default()).unwrap();
    let query = TypeQuery::new(program.type_checker(), NullabilityPolicy::NullOnly);
    let rule = DeprecatedCallRule::with_defaults(query);
    rewrite_program(&program, &rule)
        .unwrap()
        .iter()
        .map(|rewrite| rewrite.to_file_write())
        .collect()
}

#[test]
fn rewritten_files_are_committed_and_declarations_untouched() {
    let declaration = "declare const shared: string[] | null;\n";
    let (dir, paths) = write_project(&[
        ("types/env.d.ts", declaration),
        ("src/a.ts", "u.deprecated_some(shared, f);\n"),
        ("src/b.ts", "const nothing = 1;\n"),
    ]);

    let writes = pending_writes(&paths);
    assert_eq!(writes.len(), 1);

    let guard = WorkspaceGuard::new(dir.path()).unwrap();
    for write in &writes {
        guard.validate_path(&write.file).unwrap();
    }

    let results = FileWrite::apply_batch(&writes).unwrap();
    assert!(matches!(results[0], EditResult::Applied { .. }));

    assert_eq!(
        fs::read_to_string(dir.path().join("src/a.ts")).unwrap(),
        "shared?.some(f) ?? false;\n"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("types/env.d.ts")).unwrap(),
        declaration
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("src/b.ts")).unwrap(),
        "const nothing = 1;\n"
    );
}

#[test]
fn second_run_finds_nothing_to_do() {
    let (_dir, paths) = write_project(&[(
        "a.ts",
        "let xs: number[] = [];\nu.deprecated_some(xs, f);\n",
    )]);

    let writes = pending_writes(&paths);
    FileWrite::apply_batch(&writes).unwrap();

    assert!(pending_writes(&paths).is_empty());

    // Replaying the old batch reports it as already done
    let replay = FileWrite::apply_batch(&writes).unwrap();
    assert!(matches!(replay[0], EditResult::AlreadyApplied { .. }));
}

#[test]
fn concurrent_edit_blocks_the_whole_batch() {
    let (dir, paths) = write_project(&[
        ("a.ts", "let xs: number[] = [];\nu.deprecated_some(xs, f);\n"),
        ("b.ts", "let ys: number[] = [];\nu.deprecated_some(ys, g);\n"),
    ]);

    let writes = pending_writes(&paths);
    assert_eq!(writes.len(), 2);

    // Someone edits b.ts after the program was loaded
    fs::write(dir.path().join("b.ts"), "// changed\n").unwrap();

    let result = FileWrite::apply_batch(&writes);
    assert!(matches!(result, Err(EditError::BeforeTextMismatch { .. })));

    assert_eq!(
        fs::read_to_string(dir.path().join("a.ts")).unwrap(),
        "let xs: number[] = [];\nu.deprecated_some(xs, f);\n"
    );
}
