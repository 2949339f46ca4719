use score_tree::{
    ComponentId, FractureSide, GrobOverride, HairpinShape, Indicator, ScoreError, ScoreTree, SpannerId,
    SpannerKind, SpannerState,
};

fn staff_with(text: &str) -> (ScoreTree, ComponentId, Vec<ComponentId>) {
    let mut tree = ScoreTree::new();
    let staff = tree.staff();
    let leaves = tree.parse_into(staff, text).unwrap().as_slice().to_vec();
    (tree, staff, leaves)
}

fn lines(tree: &ScoreTree, id: ComponentId) -> Vec<String> {
    tree.lilypond(id)
        .unwrap()
        .lines()
        .map(|l| l.trim().to_string())
        .collect()
}

#[test]
fn test_fracture_left_splits_beam() {
    let (mut tree, staff, leaves) = staff_with("c'8 d'8 e'8 f'8");
    let beam = tree.span(SpannerKind::Beam, &leaves).unwrap();

    let (original, pieces) = tree.fracture(beam, 2, FractureSide::Left).unwrap();

    assert_eq!(original, beam);
    assert_eq!(tree.spanner(beam).unwrap().state(), SpannerState::Fractured);
    assert!(tree.spanner(beam).unwrap().leaves().is_empty());
    assert_eq!(pieces.len(), 2);
    assert_eq!(tree.spanner(pieces[0]).unwrap().leaves(), &leaves[..2]);
    assert_eq!(tree.spanner(pieces[1]).unwrap().leaves(), &leaves[2..]);
    assert_eq!(
        lines(&tree, staff),
        vec!["\\new Staff", "{", "c'8", "[", "d'8", "]", "e'8", "[", "f'8", "]", "}"]
    );
    assert!(tree.is_wellformed(staff).unwrap());
}

#[test]
fn test_fracture_both_with_negative_index() {
    let (mut tree, _, leaves) = staff_with("c'8 d'8 e'8");
    let slur = tree.span(SpannerKind::Slur, &leaves).unwrap();

    let (_, pieces) = tree.fracture(slur, -1, FractureSide::Both).unwrap();

    let runs: Vec<Vec<ComponentId>> = pieces
        .iter()
        .map(|p| tree.spanner(*p).unwrap().leaves().to_vec())
        .collect();
    assert_eq!(runs, vec![leaves[..2].to_vec(), vec![leaves[2]]]);
    assert!(matches!(
        tree.fracture(pieces[0], 5, FractureSide::Left),
        Err(ScoreError::Structure(_))
    ));
}

#[test]
fn test_fuse_adjacent_beams() {
    let (mut tree, staff, leaves) = staff_with("c'8 d'8 e'8 f'8");
    let left = tree.span(SpannerKind::Beam, &leaves[..2]).unwrap();
    let right = tree.span(SpannerKind::Beam, &leaves[2..]).unwrap();

    let fused = tree.fuse_spanners(left, right).unwrap();

    assert_eq!(tree.spanner(fused).unwrap().leaves(), leaves.as_slice());
    assert_eq!(tree.spanner(left).unwrap().state(), SpannerState::Fused);
    assert_eq!(tree.spanner(right).unwrap().state(), SpannerState::Fused);
    for leaf in &leaves {
        assert_eq!(tree.spanners_of(*leaf).unwrap(), vec![fused]);
    }
    assert_eq!(
        lines(&tree, staff),
        vec!["\\new Staff", "{", "c'8", "[", "d'8", "e'8", "f'8", "]", "}"]
    );
}

#[test]
fn test_fuse_spanners_rejects_mismatches() {
    let (mut tree, _, leaves) = staff_with("c'8 d'8 e'8 f'8 g'8");
    let beam = tree.span(SpannerKind::Beam, &leaves[..2]).unwrap();
    let slur = tree.span(SpannerKind::Slur, &leaves[2..4]).unwrap();
    let err = tree.fuse_spanners(beam, slur).unwrap_err();
    assert!(err.is_incompatible_operand());

    let distant = tree.span(SpannerKind::Beam, &leaves[3..]).unwrap();
    assert!(matches!(
        tree.fuse_spanners(beam, distant),
        Err(ScoreError::Contiguity(_))
    ));
    assert_eq!(tree.spanner(beam).unwrap().state(), SpannerState::Attached);
}

#[test]
fn test_overrides_balance() {
    let (mut tree, staff, leaves) = staff_with("c'8 d'8 e'8");
    let beam = tree.span(SpannerKind::Beam, &leaves).unwrap();
    tree.spanner_mut(beam)
        .unwrap()
        .overrides
        .push(GrobOverride::new("Beam", "positions", "#'(3 . 3)"));

    let text = lines(&tree, staff);

    assert_eq!(
        text,
        vec![
            "\\new Staff",
            "{",
            "\\override Beam.positions = #'(3 . 3)",
            "c'8",
            "[",
            "d'8",
            "e'8",
            "]",
            "\\revert Beam.positions",
            "}",
        ]
    );
    let overrides = text.iter().filter(|l| l.starts_with("\\override")).count();
    let reverts = text.iter().filter(|l| l.starts_with("\\revert")).count();
    assert_eq!(overrides, reverts);
}

fn positioned_beam(tree: &mut ScoreTree, leaves: &[ComponentId]) -> SpannerId {
    let beam = tree.span(SpannerKind::Beam, leaves).unwrap();
    tree.spanner_mut(beam)
        .unwrap()
        .overrides
        .push(GrobOverride::new("Beam", "positions", "#'(3 . 3)"));
    beam
}

#[test]
fn test_fractured_beam_keeps_overrides_balanced() {
    let (mut tree, staff, leaves) = staff_with("c'8 d'8 e'8 f'8");
    let beam = positioned_beam(&mut tree, &leaves);

    let (_, pieces) = tree.fracture(beam, 2, FractureSide::Left).unwrap();

    assert_eq!(pieces.len(), 2);
    assert_eq!(
        lines(&tree, staff),
        vec![
            "\\new Staff",
            "{",
            "\\override Beam.positions = #'(3 . 3)",
            "c'8",
            "[",
            "d'8",
            "]",
            "\\revert Beam.positions",
            "\\override Beam.positions = #'(3 . 3)",
            "e'8",
            "[",
            "f'8",
            "]",
            "\\revert Beam.positions",
            "}",
        ]
    );
}

#[test]
fn test_fused_beams_emit_one_override_pair() {
    let (mut tree, staff, leaves) = staff_with("c'8 d'8 e'8 f'8");
    let left = positioned_beam(&mut tree, &leaves[..2]);
    let right = positioned_beam(&mut tree, &leaves[2..]);
    let before = lines(&tree, staff);
    assert_eq!(before.iter().filter(|l| l.starts_with("\\override")).count(), 2);
    assert_eq!(before.iter().filter(|l| l.starts_with("\\revert")).count(), 2);

    tree.fuse_spanners(left, right).unwrap();

    assert_eq!(
        lines(&tree, staff),
        vec![
            "\\new Staff",
            "{",
            "\\override Beam.positions = #'(3 . 3)",
            "c'8",
            "[",
            "d'8",
            "e'8",
            "f'8",
            "]",
            "\\revert Beam.positions",
            "}",
        ]
    );
}

#[test]
fn test_single_leaf_spanner_uses_once() {
    let (mut tree, staff, leaves) = staff_with("c'4");
    let slur = tree.span(SpannerKind::Slur, &leaves).unwrap();
    tree.spanner_mut(slur)
        .unwrap()
        .overrides
        .push(GrobOverride::new("Slur", "color", "#red"));
    assert_eq!(
        lines(&tree, staff),
        vec!["\\new Staff", "{", "\\once \\override Slur.color = #red", "c'4", "}"]
    );
}

#[test]
fn test_stops_precede_starts() {
    let (mut tree, staff, leaves) = staff_with("c'8 d'8 e'8");
    tree.span(SpannerKind::Slur, &leaves[..2]).unwrap();
    tree.span(SpannerKind::Slur, &leaves[1..]).unwrap();
    assert_eq!(
        lines(&tree, staff),
        vec!["\\new Staff", "{", "c'8", "(", "d'8", ")", "(", "e'8", ")", "}"]
    );
}

#[test]
fn test_hairpin_and_ottava() {
    let (mut tree, staff, leaves) = staff_with("c'4 d'4 e'4");
    tree.span(SpannerKind::Hairpin(HairpinShape::Crescendo), &leaves).unwrap();
    tree.span(SpannerKind::OttavaBracket(1), &leaves[1..]).unwrap();
    assert_eq!(
        lines(&tree, staff),
        vec![
            "\\new Staff",
            "{",
            "c'4",
            "\\<",
            "\\ottava #1",
            "d'4",
            "e'4",
            "\\!",
            "\\ottava #0",
            "}",
        ]
    );
}

#[test]
fn test_attachment_errors() {
    let (mut tree, staff, leaves) = staff_with("c'8 r8 e'8");
    assert!(matches!(
        tree.span(SpannerKind::Tie, &leaves[..2]),
        Err(ScoreError::InvalidAttachment(_))
    ));
    assert!(matches!(
        tree.span(SpannerKind::Beam, &[staff]),
        Err(ScoreError::NotALeaf(_))
    ));
    assert!(matches!(
        tree.span(SpannerKind::Beam, &[leaves[0], leaves[2]]),
        Err(ScoreError::Contiguity(_))
    ));
    let beam = tree.span(SpannerKind::Beam, &leaves[..2]).unwrap();
    assert_eq!(
        tree.attach_spanner(beam, &leaves[..2]),
        Err(ScoreError::AlreadyAttached(beam))
    );
    assert!(tree.spanners_of(leaves[2]).unwrap().is_empty());
}

#[test]
fn test_extend_keeps_contiguity() {
    let (mut tree, staff, leaves) = staff_with("c'8 d'8 e'8 f'8");
    let beam = tree.span(SpannerKind::Beam, &leaves[1..2]).unwrap();

    tree.extend_spanner(beam, &leaves[2..3]).unwrap();
    tree.extend_spanner_left(beam, &leaves[..1]).unwrap();
    assert_eq!(tree.spanner(beam).unwrap().leaves(), &leaves[..3]);

    let before = tree.spanner(beam).unwrap().leaves().to_vec();
    assert!(tree.extend_spanner(beam, &leaves[..1]).is_err());
    assert_eq!(tree.spanner(beam).unwrap().leaves(), before.as_slice());

    let members = tree.spanner(beam).unwrap().leaves().to_vec();
    for pair in members.windows(2) {
        assert_eq!(tree.next_leaf_in_logical_voice(pair[0]).unwrap(), Some(pair[1]));
    }
    assert!(tree.is_wellformed(staff).unwrap());
}

#[test]
fn test_removed_leaf_leaves_its_spanners() {
    let (mut tree, staff, leaves) = staff_with("c'8 d'8 e'8");
    let beam = tree.span(SpannerKind::Beam, &leaves).unwrap();
    tree.remove(leaves[2]).unwrap();
    assert_eq!(tree.spanner(beam).unwrap().leaves(), &leaves[..2]);
    assert!(tree.spanners_of(leaves[2]).unwrap().is_empty());
    assert!(tree.is_wellformed(staff).unwrap());
}

#[test]
fn test_piecewise_markup_follows_fracture() {
    let (mut tree, staff, leaves) = staff_with("c'4 d'4 e'4 f'4");
    let text_spanner = tree.span(SpannerKind::TextSpanner, &leaves).unwrap();
    tree.attach_piecewise(text_spanner, leaves[2], Indicator::markup("rit.", None))
        .unwrap();
    assert!(tree
        .attach_piecewise(text_spanner, staff, Indicator::markup("x", None))
        .is_err());

    let (_, pieces) = tree.fracture(text_spanner, 2, FractureSide::Left).unwrap();

    assert!(tree.spanner(pieces[0]).unwrap().piecewise().is_empty());
    assert_eq!(tree.spanner(pieces[1]).unwrap().piecewise().len(), 1);
    assert_eq!(
        lines(&tree, staff),
        vec![
            "\\new Staff",
            "{",
            "c'4",
            "\\startTextSpan",
            "d'4",
            "\\stopTextSpan",
            "e'4",
            "-\\markup { rit. }",
            "\\startTextSpan",
            "f'4",
            "\\stopTextSpan",
            "}",
        ]
    );
}
