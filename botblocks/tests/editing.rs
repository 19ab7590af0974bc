use botblocks::{Block, BlockError, BlockKind, EditError, Param, Path, Program};

fn leaf(kind: BlockKind) -> Block {
    Block::new(kind)
}

fn turn_left(angle: f64) -> Block {
    Block::new(BlockKind::TurnLeft)
        .with_param(Param::Angle, angle)
        .unwrap()
}

/// [wave, repeat(2){raise_arm, lower_arm}, move_forward]
fn sample() -> Program {
    Program::from_blocks(vec![
        leaf(BlockKind::Wave),
        Block::repeat(
            2.0,
            vec![leaf(BlockKind::RaiseArm), leaf(BlockKind::LowerArm)],
        )
        .unwrap(),
        leaf(BlockKind::MoveForward),
    ])
}

fn root_kinds(program: &Program) -> Vec<BlockKind> {
    program.roots().map(|n| n.kind()).collect()
}

fn child_kinds(program: &Program, path: &Path) -> Vec<BlockKind> {
    program
        .block_at(path)
        .unwrap()
        .children()
        .iter()
        .map(Block::kind)
        .collect()
}

#[test]
fn insert_at_root_and_into_container() {
    let program = sample();
    let edited = program
        .insert(&Path::root(), 0, leaf(BlockKind::Pause))
        .unwrap();
    assert_eq!(
        root_kinds(&edited),
        vec![
            BlockKind::Pause,
            BlockKind::Wave,
            BlockKind::Repeat,
            BlockKind::MoveForward
        ]
    );

    let nested = program
        .insert(&Path::from([1]), 2, leaf(BlockKind::Handshake))
        .unwrap();
    assert_eq!(
        child_kinds(&nested, &Path::from([1])),
        vec![BlockKind::RaiseArm, BlockKind::LowerArm, BlockKind::Handshake]
    );
}

#[test]
fn insert_into_leaf_is_invalid_target() {
    let program = sample();
    let err = program
        .insert(&Path::from([0]), 0, leaf(BlockKind::Pause))
        .unwrap_err();
    assert_eq!(
        err,
        EditError::InvalidTarget {
            path: Path::from([0])
        }
    );
}

#[test]
fn insert_past_end_is_out_of_range() {
    let program = sample();
    let err = program
        .insert(&Path::root(), 4, leaf(BlockKind::Pause))
        .unwrap_err();
    assert!(matches!(err, EditError::OutOfRange { index: 4, len: 3, .. }));
}

#[test]
fn insert_then_remove_restores_program() {
    let program = sample();
    for (parent, index) in [
        (Path::root(), 0),
        (Path::root(), 3),
        (Path::from([1]), 1),
        (Path::from([1]), 2),
    ] {
        let inserted = program
            .insert(&parent, index, turn_left(45.0))
            .unwrap();
        assert_ne!(inserted, program);
        let removed = inserted.remove(&parent, index).unwrap();
        assert_eq!(removed, program, "insert/remove at {}[{}]", parent, index);
    }
}

#[test]
fn remove_out_of_range() {
    let program = sample();
    assert!(matches!(
        program.remove(&Path::root(), 3),
        Err(EditError::OutOfRange { .. })
    ));
    assert!(matches!(
        program.remove(&Path::from([1]), 2),
        Err(EditError::OutOfRange { .. })
    ));
}

#[test]
fn remove_drops_subtree() {
    let program = sample();
    assert_eq!(program.node_count(), 5);
    let edited = program.remove(&Path::root(), 1).unwrap();
    assert_eq!(edited.node_count(), 2);
    assert_eq!(
        root_kinds(&edited),
        vec![BlockKind::Wave, BlockKind::MoveForward]
    );
}

#[test]
fn failed_edit_leaves_program_unchanged() {
    let program = sample();
    let before = program.clone();
    let _ = program.remove(&Path::root(), 10);
    let _ = program.move_node(&Path::from([1]), &Path::from([1]), 0);
    assert_eq!(program, before);
    assert_eq!(program.revision(), before.revision());
}

#[test]
fn successful_edit_bumps_revision() {
    let program = sample();
    let edited = program.reorder(&Path::root(), 0, 2).unwrap();
    assert_eq!(edited.revision(), program.revision() + 1);
    assert_eq!(program.revision(), 0);
}

#[test]
fn reorder_uses_splice_semantics() {
    let program = sample();
    let down = program.reorder(&Path::root(), 0, 2).unwrap();
    assert_eq!(
        root_kinds(&down),
        vec![BlockKind::Repeat, BlockKind::MoveForward, BlockKind::Wave]
    );
    let up = program.reorder(&Path::root(), 2, 0).unwrap();
    assert_eq!(
        root_kinds(&up),
        vec![BlockKind::MoveForward, BlockKind::Wave, BlockKind::Repeat]
    );
}

#[test]
fn reorder_round_trip_restores_order() {
    let program = sample();
    for (i, j) in [(0, 1), (0, 2), (2, 0), (1, 2), (1, 1)] {
        let there = program.reorder(&Path::root(), i, j).unwrap();
        let back = there.reorder(&Path::root(), j, i).unwrap();
        assert_eq!(back, program, "reorder {} <-> {}", i, j);
    }
    let nested = program.reorder(&Path::from([1]), 0, 1).unwrap();
    assert_eq!(
        child_kinds(&nested, &Path::from([1])),
        vec![BlockKind::LowerArm, BlockKind::RaiseArm]
    );
}

#[test]
fn reorder_rejects_bad_indices() {
    let program = sample();
    assert!(matches!(
        program.reorder(&Path::root(), 0, 3),
        Err(EditError::OutOfRange { index: 3, .. })
    ));
    assert!(matches!(
        program.reorder(&Path::from([0]), 0, 0),
        Err(EditError::InvalidTarget { .. })
    ));
}

#[test]
fn move_into_container() {
    let program = sample();
    let edited = program
        .move_node(&Path::from([0]), &Path::from([1]), 1)
        .unwrap();
    // Destination parent was resolved before the wave left the root list.
    assert_eq!(
        root_kinds(&edited),
        vec![BlockKind::Repeat, BlockKind::MoveForward]
    );
    assert_eq!(
        child_kinds(&edited, &Path::from([0])),
        vec![BlockKind::RaiseArm, BlockKind::Wave, BlockKind::LowerArm]
    );
}

#[test]
fn move_out_of_container() {
    let program = sample();
    let edited = program
        .move_node(&Path::from([1, 0]), &Path::root(), 3)
        .unwrap();
    assert_eq!(
        root_kinds(&edited),
        vec![
            BlockKind::Wave,
            BlockKind::Repeat,
            BlockKind::MoveForward,
            BlockKind::RaiseArm
        ]
    );
    assert_eq!(
        child_kinds(&edited, &Path::from([1])),
        vec![BlockKind::LowerArm]
    );
}

#[test]
fn move_into_self_or_descendant_is_cyclic() {
    let inner = Block::repeat(2.0, vec![leaf(BlockKind::Wave)]).unwrap();
    let outer = Block::repeat(3.0, vec![inner]).unwrap();
    let program = Program::from_blocks(vec![outer, leaf(BlockKind::Pause)]);

    for dest in [Path::from([0]), Path::from([0, 0])] {
        let err = program.move_node(&Path::from([0]), &dest, 0).unwrap_err();
        assert_eq!(
            err,
            EditError::CyclicMove {
                moved: Path::from([0]),
                dest: dest.clone()
            }
        );
    }

    // Paths at or below the source are cyclic whatever they address.
    let program = Program::from_blocks(vec![
        leaf(BlockKind::Wave),
        Block::repeat(2.0, vec![leaf(BlockKind::Pause)]).unwrap(),
    ]);
    let cases = [
        (Path::from([0]), Path::from([0])),
        (Path::from([1]), Path::from([1, 0])),
        (Path::from([1]), Path::from([1, 3])),
        (Path::from([1, 0]), Path::from([1, 0, 2])),
    ];
    for (from, dest) in cases {
        assert_eq!(
            program.move_node(&from, &dest, 0).unwrap_err(),
            EditError::CyclicMove {
                moved: from.clone(),
                dest: dest.clone()
            }
        );
    }

    // The inner container may still move to the root.
    let program = Program::from_blocks(vec![
        Block::repeat(3.0, vec![Block::repeat(2.0, vec![leaf(BlockKind::Wave)]).unwrap()])
            .unwrap(),
        leaf(BlockKind::Pause),
    ]);
    let hoisted = program
        .move_node(&Path::from([0, 0]), &Path::root(), 0)
        .unwrap();
    assert_eq!(
        root_kinds(&hoisted),
        vec![BlockKind::Repeat, BlockKind::Repeat, BlockKind::Pause]
    );
}

#[test]
fn move_rejects_leaf_destination_and_root_source() {
    let program = sample();
    assert!(matches!(
        program.move_node(&Path::from([2]), &Path::from([0]), 0),
        Err(EditError::InvalidTarget { .. })
    ));
    assert!(matches!(
        program.move_node(&Path::root(), &Path::from([1]), 0),
        Err(EditError::InvalidTarget { .. })
    ));
}

#[test]
fn move_checks_destination_index_after_detach() {
    let program = sample();
    assert!(program.move_node(&Path::from([0]), &Path::root(), 2).is_ok());
    assert!(matches!(
        program.move_node(&Path::from([0]), &Path::root(), 3),
        Err(EditError::OutOfRange { index: 3, len: 2, .. })
    ));
}

#[test]
fn resolve_through_leaf_is_invalid_target() {
    let program = sample();
    assert!(matches!(
        program.resolve(&Path::from([0, 0])),
        Err(EditError::InvalidTarget { .. })
    ));
    assert!(matches!(
        program.resolve(&Path::from([1, 5])),
        Err(EditError::OutOfRange { index: 5, len: 2, .. })
    ));
}

#[test]
fn node_ids_are_stable_across_edits() {
    let program = sample();
    let id = program.resolve(&Path::from([2])).unwrap();
    let edited = program
        .insert(&Path::root(), 0, leaf(BlockKind::Pause))
        .unwrap();
    assert_eq!(edited.resolve(&Path::from([3])).unwrap(), id);
}

#[test]
fn set_param_clamps_at_mutation() {
    let program = Program::from_blocks(vec![turn_left(90.0)]);
    let edited = program
        .set_param(&Path::from([0]), Param::Angle, 400.0)
        .unwrap();
    assert_eq!(
        edited.block_at(&Path::from([0])).unwrap().param(Param::Angle),
        360.0
    );

    let err = program
        .set_param(&Path::from([0]), Param::Times, 3.0)
        .unwrap_err();
    assert_eq!(
        err,
        EditError::Block(BlockError::ParamNotApplicable {
            kind: BlockKind::TurnLeft,
            param: Param::Times
        })
    );

    assert!(matches!(
        program.set_param(&Path::from([0]), Param::Angle, f64::NAN),
        Err(EditError::Block(BlockError::NonFiniteParam { .. }))
    ));
}

#[test]
fn block_constructors_clamp_and_guard_children() {
    let repeat = Block::repeat(42.4, vec![]).unwrap();
    assert_eq!(repeat.param(Param::Times), 10.0);
    let repeat = Block::repeat(2.6, vec![]).unwrap();
    assert_eq!(repeat.param(Param::Times), 3.0);

    let speed = Block::new(BlockKind::MoveForward)
        .with_param(Param::Speed, 0.01)
        .unwrap();
    assert_eq!(speed.param(Param::Speed), 0.1);
    assert_eq!(speed.param(Param::Duration), 2.0);

    let mut wave = leaf(BlockKind::Wave);
    assert_eq!(
        wave.push_child(leaf(BlockKind::Pause)),
        Err(BlockError::LeafWithChildren(BlockKind::Wave))
    );
}

#[test]
fn palette_has_one_block_per_kind() {
    let palette = BlockKind::palette();
    assert_eq!(palette.len(), BlockKind::ALL.len());
    assert!(palette.iter().all(|b| b.params().is_empty()));
    assert_eq!(palette.iter().filter(|b| b.is_container()).count(), 1);
}

#[test]
fn walk_is_preorder_with_paths() {
    let program = sample();
    let paths: Vec<String> = program
        .walk()
        .iter()
        .map(|(path, node)| format!("{} {}", path, node.kind()))
        .collect();
    assert_eq!(
        paths,
        vec![
            "/0 wave",
            "/1 repeat",
            "/1/0 raise_arm",
            "/1/1 lower_arm",
            "/2 move_forward"
        ]
    );
    assert_eq!(program.leaf_count(), 4);
}

#[test]
fn path_parsing() {
    assert_eq!("/2/0".parse::<Path>().unwrap(), Path::from([2, 0]));
    assert_eq!("2/0".parse::<Path>().unwrap(), Path::from([2, 0]));
    assert_eq!("/".parse::<Path>().unwrap(), Path::root());
    assert!("/a/0".parse::<Path>().is_err());
    assert_eq!(Path::root().to_string(), "/");
    assert!(Path::from([1, 0, 2]).starts_with(&Path::from([1])));
}

#[test]
fn replace_adopts_new_tree_and_compacts() {
    let mut program = sample();
    for _ in 0..5 {
        program = program.insert(&Path::root(), 0, leaf(BlockKind::Pause)).unwrap();
        program = program.remove(&Path::root(), 0).unwrap();
    }
    let revision = program.revision();

    let blocks = vec![leaf(BlockKind::Handshake), turn_left(45.0)];
    let replaced = program.replace(blocks.clone());
    let fresh = Program::from_blocks(blocks);

    assert_eq!(replaced.revision(), revision + 1);
    assert_eq!(replaced, fresh);
    assert_eq!(
        root_kinds(&replaced),
        vec![BlockKind::Handshake, BlockKind::TurnLeft]
    );
    assert_eq!(
        replaced.roots().map(|n| n.id()).collect::<Vec<_>>(),
        fresh.roots().map(|n| n.id()).collect::<Vec<_>>()
    );
    assert_eq!(replaced.node_count(), 2);
}
