use score_tree::{
    check_wellformedness, is_wellformed, DiagnosticSeverity, Duration, NamedInterval, ScoreTree, Selection,
    SpannerKind, TimeSignature,
};

#[test]
fn test_edited_score_stays_wellformed() {
    let mut tree = ScoreTree::new();
    let score = tree.score();
    let staff = tree.staff();
    let first = tree.measure(TimeSignature::new(2, 4));
    let second = tree.measure(TimeSignature::new(2, 4));
    let beamed = tree.parse_into(first, "c'8 d'8 e'8 f'8").unwrap();
    tree.parse_into(second, "g'4 ~ g'4").unwrap();
    tree.extend(staff, [first, second]).unwrap();
    tree.append(score, staff).unwrap();
    tree.span(SpannerKind::Beam, beamed.as_slice()).unwrap();
    assert!(tree.is_wellformed(score).unwrap());

    let fused = tree.fuse(&Selection::new([first, second])).unwrap();
    assert!(tree.is_wellformed(score).unwrap());

    tree.split_container_by_duration(fused[0], Duration::new(3, 8)).unwrap();
    assert!(tree.is_wellformed(score).unwrap());

    tree.transpose(score, &NamedInterval::from_name("-P5").unwrap()).unwrap();
    let diagnostics = check_wellformedness(&tree, score).unwrap();
    assert!(diagnostics.is_empty(), "{:?}", diagnostics.summary());
    assert!(is_wellformed(&tree, score).unwrap());
}

#[test]
fn test_empty_measure_is_not_wellformed() {
    let mut tree = ScoreTree::new();
    let staff = tree.staff();
    let measure = tree.measure(TimeSignature::new(3, 4));
    tree.append(staff, measure).unwrap();

    let diagnostics = tree.check_wellformedness(staff).unwrap();

    assert!(diagnostics.has_errors());
    assert!(!tree.is_wellformed(staff).unwrap());
    let empty: Vec<_> = diagnostics.of_kind("empty_container").collect();
    assert_eq!(empty.len(), 1);
    assert_eq!(empty[0].severity, DiagnosticSeverity::Warning);
    assert_eq!(diagnostics.of_kind("misdurated_measure").count(), 1);
}

#[test]
fn test_overlapping_slurs_are_reported() {
    let mut tree = ScoreTree::new();
    let staff = tree.staff();
    let leaves = tree.parse_into(staff, "c'8 d'8 e'8").unwrap();
    tree.span(SpannerKind::Slur, &leaves.as_slice()[..2]).unwrap();
    tree.span(SpannerKind::Slur, &leaves.as_slice()[1..]).unwrap();
    tree.span(SpannerKind::Beam, leaves.as_slice()).unwrap();

    let diagnostics = tree.check_wellformedness(staff).unwrap();

    assert_eq!(diagnostics.of_kind("overlapping_slur").count(), 1);
    assert_eq!(diagnostics.of_kind("overlapping_beam").count(), 0);
    assert!(!tree.is_wellformed(staff).unwrap());
}

#[test]
fn test_replacing_inside_a_beam_breaks_it() {
    let mut tree = ScoreTree::new();
    let staff = tree.staff();
    let leaves = tree.parse_into(staff, "c'8 d'8 e'8 f'8").unwrap();
    tree.span(SpannerKind::Beam, leaves.as_slice()).unwrap();
    let recipients = Selection::new(tree.parse_leaves("g'8 a'8").unwrap());

    tree.replace(&leaves.slice(1..3), &recipients).unwrap();

    let diagnostics = tree.check_wellformedness(staff).unwrap();
    assert_eq!(diagnostics.of_kind("discontiguous_spanner").count(), 1);
    assert!(diagnostics.has_errors());
}
