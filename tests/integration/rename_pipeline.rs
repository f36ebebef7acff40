use super::{read, setup_workspace};
use diag_patcher::{
    parse_descriptors, run_patches, ApplyMode, PatchError, PatchOptions, PositionParser, Rename,
};

const SOURCE: &str = "\
int main(void) {
  int n;
  int count = 0;
  for (n = 0; n < 10; n++)
    count += n;
  return count;
}
";

const POSITIONS: &str = "\
foo.c:3:7: note: 'count' declared here
foo.c:5:5
foo.c:6:10: warning: returning 'count'
";

#[test]
fn test_rename_every_position() {
    let (dir, guard) = setup_workspace(&[("foo.c", SOURCE)]);
    let descriptors = parse_descriptors(POSITIONS, &PositionParser).unwrap();

    let report = run_patches(
        &Rename::new("count", "total"),
        &descriptors,
        &guard,
        PatchOptions::default(),
    )
    .unwrap();

    assert_eq!(report.applied(), 3);
    assert_eq!(read(&dir, "foo.c"), SOURCE.replace("count", "total"));
}

#[test]
fn test_rename_declaration_line() {
    let (dir, guard) = setup_workspace(&[("foo.c", "\n\n  int count = 0;\n")]);
    let descriptors = parse_descriptors("foo.c:3:7\n", &PositionParser).unwrap();

    let _ = run_patches(
        &Rename::new("count", "total"),
        &descriptors,
        &guard,
        PatchOptions::default(),
    )
    .unwrap();
    assert_eq!(read(&dir, "foo.c"), "\n\n  int total = 0;\n");
}

#[test]
fn test_position_on_new_name_is_refused() {
    let source = "total = count;\n";
    let (dir, guard) = setup_workspace(&[("a.c", source)]);
    let descriptors = parse_descriptors("a.c:1:1\n", &PositionParser).unwrap();

    let err = run_patches(
        &Rename::new("count", "total"),
        &descriptors,
        &guard,
        PatchOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, PatchError::Mismatch { .. }));
    assert_eq!(read(&dir, "a.c"), source);
}

#[test]
fn test_misaligned_column_is_refused() {
    let (dir, guard) = setup_workspace(&[("foo.c", SOURCE)]);
    let descriptors = parse_descriptors("foo.c:3:6\n", &PositionParser).unwrap();

    let err = run_patches(
        &Rename::new("count", "total"),
        &descriptors,
        &guard,
        PatchOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, PatchError::Mismatch { .. }));
    assert_eq!(read(&dir, "foo.c"), SOURCE);
}

#[test]
fn test_misaligned_column_unchecked_corrupts() {
    let (dir, guard) = setup_workspace(&[("foo.c", SOURCE)]);
    let descriptors = parse_descriptors("foo.c:3:6\n", &PositionParser).unwrap();

    let _ = run_patches(
        &Rename::unchecked("count", "total"),
        &descriptors,
        &guard,
        PatchOptions::default(),
    )
    .unwrap();
    assert!(read(&dir, "foo.c").contains("  inttotalt = 0;\n"));
}

#[test]
fn test_same_line_positions_need_batch() {
    let source = "int f(int count) { return count * count; }\n";
    let diagnostics = "foo.c:1:11\nfoo.c:1:27\nfoo.c:1:35\n";

    // Sequential: the second position was computed before the first rename
    // shrank the line, so it no longer lands on the identifier.
    let (dir, guard) = setup_workspace(&[("foo.c", source)]);
    let descriptors = parse_descriptors(diagnostics, &PositionParser).unwrap();
    let err = run_patches(&Rename::new("count", "c"), &descriptors, &guard, PatchOptions::default())
        .unwrap_err();
    assert!(matches!(err, PatchError::Mismatch { .. }));
    assert_eq!(read(&dir, "foo.c"), "int f(int c) { return count * count; }\n");

    // Batch resolves every position against the file as reported.
    let (dir, guard) = setup_workspace(&[("foo.c", source)]);
    let options = PatchOptions {
        mode: ApplyMode::Batch,
        dry_run: false,
    };
    let report = run_patches(&Rename::new("count", "c"), &descriptors, &guard, options).unwrap();
    assert_eq!(report.applied(), 3);
    assert_eq!(read(&dir, "foo.c"), "int f(int c) { return c * c; }\n");
}

#[test]
fn test_crlf_terminators_preserved() {
    let (dir, guard) = setup_workspace(&[("foo.c", "int count;\r\nreturn count;\r\n")]);
    let descriptors = parse_descriptors("foo.c:2:8\n", &PositionParser).unwrap();

    let _ = run_patches(
        &Rename::new("count", "total"),
        &descriptors,
        &guard,
        PatchOptions::default(),
    )
    .unwrap();
    assert_eq!(read(&dir, "foo.c"), "int count;\r\nreturn total;\r\n");
}
