use super::{read, setup_workspace};
use diag_patcher::{
    parse_descriptors, run_patches, ApplyMode, CastDiagnosticParser, CastInsertion,
    DiagnosticError, EditResult, PatchError, PatchOptions,
};

const TTY_TERM: &str = "\
static void
tty_term_free(struct tty_term *term)
{
\tstruct tty_code *code = term->codes;
\tu_int i;

\tfor (i = 0; i < tty_term_ncodes(); i++) {
\t\tchar *s = code[i].value.string;
\t\tfree(s);
\t}
}
";

const CLANG_OUTPUT: &str = "\
src/tty-term.c:4:18: error: cannot initialize a variable of type 'struct tty_code *' with an lvalue of type 'void *'
src/tty-term.c:8:9: error: cannot initialize a variable of type 'char *' with an lvalue of type 'const void *'
";

#[test]
fn test_clang_batch_patches_file() {
    let (dir, guard) = setup_workspace(&[("src/tty-term.c", TTY_TERM)]);
    let descriptors = parse_descriptors(CLANG_OUTPUT, &CastDiagnosticParser).unwrap();

    let report = run_patches(&CastInsertion, &descriptors, &guard, PatchOptions::default()).unwrap();
    assert_eq!(report.applied(), 2);

    let patched = read(&dir, "src/tty-term.c");
    let expected = TTY_TERM
        .replace(
            "*code = term->codes;",
            "*code = (struct tty_code *) term->codes;",
        )
        .replace("*s = code[i]", "*s = (char *) code[i]");
    assert_eq!(patched, expected);
}

#[test]
fn test_other_lines_byte_identical() {
    let (dir, guard) = setup_workspace(&[("src/tty-term.c", TTY_TERM)]);
    let descriptors = parse_descriptors(CLANG_OUTPUT, &CastDiagnosticParser).unwrap();
    let _ = run_patches(&CastInsertion, &descriptors, &guard, PatchOptions::default()).unwrap();

    let patched = read(&dir, "src/tty-term.c");
    for (index, (before, after)) in TTY_TERM.lines().zip(patched.lines()).enumerate() {
        if index != 3 && index != 7 {
            assert_eq!(before, after, "line {} changed", index + 1);
        }
    }
}

#[test]
fn test_rerun_inserts_again() {
    let (dir, guard) = setup_workspace(&[("foo.c", "  x = bar();\n")]);
    let descriptors = parse_descriptors(
        "foo.c:1:5: error: cannot initialize a variable of type 'int'\n",
        &CastDiagnosticParser,
    )
    .unwrap();

    for _ in 0..2 {
        let report =
            run_patches(&CastInsertion, &descriptors, &guard, PatchOptions::default()).unwrap();
        assert_eq!(report.edits[0].outcome, EditResult::Applied);
    }
    assert_eq!(read(&dir, "foo.c"), "  x = (int) (int) bar();\n");
}

#[test]
fn test_garbage_diagnostics_write_nothing() {
    let (dir, _guard) = setup_workspace(&[("foo.c", "  x = bar();\n")]);
    let text = "foo.c:1:5: error: cannot initialize a variable of type 'int'\n\
                garbage text with no positions\n";

    let err = parse_descriptors(text, &CastDiagnosticParser).unwrap_err();
    assert!(matches!(err, DiagnosticError::Unmatched { line_number: 2, .. }));
    assert_eq!(read(&dir, "foo.c"), "  x = bar();\n");
}

#[test]
fn test_batch_mode_writes_same_result() {
    let (dir, guard) = setup_workspace(&[("src/tty-term.c", TTY_TERM)]);
    let descriptors = parse_descriptors(CLANG_OUTPUT, &CastDiagnosticParser).unwrap();
    let options = PatchOptions {
        mode: ApplyMode::Batch,
        dry_run: false,
    };

    let report = run_patches(&CastInsertion, &descriptors, &guard, options).unwrap();
    assert_eq!(report.files.len(), 1);
    assert!(read(&dir, "src/tty-term.c").contains("*code = (struct tty_code *) term->codes;"));
}

#[test]
fn test_stale_line_number() {
    let (_dir, guard) = setup_workspace(&[("foo.c", "x = 1;\n")]);
    let descriptors = parse_descriptors(
        "foo.c:40:5: error: cannot initialize a variable of type 'int'\n",
        &CastDiagnosticParser,
    )
    .unwrap();

    let err = run_patches(&CastInsertion, &descriptors, &guard, PatchOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        PatchError::LineOutOfRange {
            line: 39,
            line_count: 1,
            ..
        }
    ));
    assert!(err.to_string().contains(":40:"));
}
