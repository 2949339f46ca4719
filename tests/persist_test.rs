use std::fs;

use score_tree::{Configuration, DocumentTemplate, LilyPondFile, Persister, ScoreTree};

#[test]
fn test_yaml_configured_persistence() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("score.yaml");
    fs::write(
        &config_path,
        format!(
            "language: nederlands\nindent_width: 2\noutput_directory: {}\n",
            dir.path().join("out").display()
        ),
    )
    .unwrap();
    let config = Configuration::from_file(&config_path).unwrap();

    let mut tree = ScoreTree::new();
    let staff = tree.staff();
    tree.parse_into(staff, "cs'4 ef'4").unwrap();

    let file = LilyPondFile::from_config(&config).with_title("Etude");
    let report = Persister::with_config(&tree, staff, config)
        .file(file)
        .as_ly("etude")
        .unwrap();

    assert_eq!(report.ly_path, dir.path().join("out").join("etude.ly"));
    let text = fs::read_to_string(&report.ly_path).unwrap();
    assert!(text.contains("\\version \"2.24.0\""));
    assert!(text.contains("\\language \"nederlands\""));
    assert!(text.contains("    title = \"Etude\""));
    assert!(text.contains("\\score {\n  \\new Staff\n  {\n    cis'4\n    ees'4\n  }\n}"));
}

#[test]
fn test_minimal_document_has_no_score_block() {
    let mut tree = ScoreTree::new();
    let container = tree.parse_container("c'4").unwrap();
    let text = Persister::new(&tree, container)
        .file(LilyPondFile::default().with_template(DocumentTemplate::Minimal))
        .render_string()
        .unwrap();
    assert!(text.contains("\\language \"english\""));
    assert!(text.contains("{\n    c'4\n}"));
    assert!(!text.contains("\\score"));
}
