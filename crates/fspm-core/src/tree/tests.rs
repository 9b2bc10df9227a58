use super::*;
use crate::metamer::{BudStatus, MetamerSpec};

fn make_tree() -> AppleTree {
    let mut tree = AppleTree::new(GenotypeProfile::default(), RootSystem::default()).unwrap();
    tree.add_root(Metamer::from_spec(&MetamerSpec::default())).unwrap();
    tree
}

fn grow(tree: &mut AppleTree, parent: MetamerId) -> MetamerId {
    let id = tree.allocate_id().unwrap();
    let child = {
        let p = tree.find(parent).unwrap();
        p.sprout(id, p.angle_world)
    };
    tree.register_child(parent, child).unwrap();
    id
}

/// 1 ─ 2 ─ 3
///     └── 4
///  └── 5
fn make_branched_tree() -> AppleTree {
    let mut tree = make_tree();
    let two = grow(&mut tree, 1);
    grow(&mut tree, two);
    grow(&mut tree, two);
    grow(&mut tree, 1);
    tree
}

fn status(tree: &AppleTree, id: MetamerId) -> BudStatus {
    tree.find(id).unwrap().bud_status
}

#[test]
fn register_child_sets_order_and_parent_link() {
    let mut tree = make_tree();
    let child = grow(&mut tree, 1);
    let grandchild = grow(&mut tree, child);
    assert_eq!(tree.len(), 3);
    assert_eq!(tree.find(child).unwrap().order(), 1);
    assert_eq!(tree.find(grandchild).unwrap().order(), 2);
    assert_eq!(tree.find(grandchild).unwrap().parent_id(), Some(child));
    assert_eq!(tree.find(1).unwrap().children(), &[child]);
}

#[test]
fn register_child_overrides_caller_supplied_order() {
    let mut tree = make_tree();
    let orphan = Metamer::from_spec(&MetamerSpec {
        id: 9,
        order: 7,
        ..MetamerSpec::default()
    });
    tree.register_child(1, orphan).unwrap();
    let child = tree.find(9).unwrap();
    assert_eq!(child.order(), 1);
    assert_eq!(child.parent_id(), Some(1));
    assert_eq!(tree.next_id(), 10);
}

#[test]
fn register_child_rejects_duplicate_ids() {
    let mut tree = make_tree();
    let clash = Metamer::from_spec(&MetamerSpec::default());
    assert_eq!(tree.register_child(1, clash), Err(TreeError::DuplicateId(1)));
    assert!(tree.find(1).unwrap().children().is_empty());
}

#[test]
fn register_child_rejects_missing_and_pruned_parents() {
    let mut tree = make_branched_tree();
    let spare = Metamer::from_spec(&MetamerSpec {
        id: 50,
        ..MetamerSpec::default()
    });
    assert_eq!(
        tree.register_child(42, spare.clone()),
        Err(TreeError::NotFound(42))
    );
    tree.prune(3).unwrap();
    assert_eq!(tree.register_child(3, spare), Err(TreeError::PrunedParent(3)));
}

#[test]
fn add_root_rejects_parented_or_ordered_metamers() {
    let mut tree = AppleTree::new(GenotypeProfile::default(), RootSystem::default()).unwrap();
    let parented = Metamer::from_spec(&MetamerSpec {
        parent_id: Some(3),
        ..MetamerSpec::default()
    });
    assert_eq!(tree.add_root(parented), Err(TreeError::InvalidRoot(1)));
    let ordered = Metamer::from_spec(&MetamerSpec {
        order: 2,
        ..MetamerSpec::default()
    });
    assert_eq!(tree.add_root(ordered), Err(TreeError::InvalidRoot(1)));
    assert!(tree.is_empty());
}

#[test]
fn new_rejects_invalid_genotype() {
    let genotype = GenotypeProfile {
        apical_dominance: f64::NAN,
        ..GenotypeProfile::default()
    };
    assert!(matches!(
        AppleTree::new(genotype, RootSystem::default()),
        Err(TreeError::Config(ConfigError::InvalidApicalDominance))
    ));
}

#[test]
fn traversal_is_depth_first_parents_before_children() {
    let tree = make_branched_tree();
    let order: Vec<MetamerId> = tree.iter_all().map(Metamer::id).collect();
    assert_eq!(order, vec![1, 2, 3, 4, 5]);
    let again: Vec<MetamerId> = tree.iter_all().map(Metamer::id).collect();
    assert_eq!(order, again);
}

#[test]
fn active_traversal_skips_pruned_subtrees() {
    let mut tree = make_branched_tree();
    tree.prune(2).unwrap();
    assert_eq!(tree.active_ids(), vec![1, 5]);
    assert_eq!(tree.iter_all().count(), 5);
    assert_eq!(tree.live_count(), 2);
}

#[test]
fn descendant_leaf_area_counts_live_subtree() {
    let mut tree = make_branched_tree();
    for (id, area) in [(2, 5.0), (3, 2.0), (4, 1.0), (5, 7.0)] {
        tree.find_mut(id).unwrap().leaf_area = area;
    }
    assert_eq!(tree.descendant_leaf_area(2), 8.0);
    assert_eq!(tree.descendant_leaf_area(1), 45.0);
    assert_eq!(tree.descendant_leaf_area(3), 2.0);
    assert_eq!(tree.descendant_leaf_area(99), 0.0);

    tree.prune(3).unwrap();
    assert_eq!(tree.descendant_leaf_area(2), 6.0);
    assert_eq!(tree.total_live_leaf_area(), 43.0);

    let bulk = tree.supported_leaf_areas();
    for id in 1..=5 {
        assert_eq!(bulk[&id], tree.descendant_leaf_area(id), "metamer {id}");
    }
}

#[test]
fn apex_is_first_live_metamer_of_highest_order() {
    let mut tree = make_branched_tree();
    assert_eq!(tree.max_live_order(), Some(2));
    assert_eq!(tree.apex(), Some(3));
    tree.prune(3).unwrap();
    assert_eq!(tree.apex(), Some(4));
    tree.prune(2).unwrap();
    assert_eq!(tree.max_live_order(), Some(1));
    assert_eq!(tree.apex(), Some(5));
}

#[test]
fn prune_cascades_to_whole_subtree() {
    let mut tree = make_branched_tree();
    let outcome = tree.prune(2).unwrap();
    assert_eq!(outcome.pruned, vec![2, 3, 4]);
    for id in tree.subtree_ids(2) {
        assert!(tree.find(id).unwrap().is_pruned());
    }
    assert!(!tree.find(1).unwrap().is_pruned());
    assert!(!tree.find(5).unwrap().is_pruned());
}

#[test]
fn pruning_a_leaf_keeps_every_id_indexed() {
    let mut tree = make_branched_tree();
    let before = tree.len();
    tree.prune(5).unwrap();
    assert_eq!(tree.len(), before);
    assert!(tree.find(5).unwrap().is_pruned());
}

#[test]
fn prune_releases_parent_and_surviving_siblings() {
    let mut tree = make_branched_tree();
    let outcome = tree.prune(5).unwrap();
    assert!(!outcome.apex_removed);
    assert_eq!(outcome.activated, vec![1, 2]);
    assert_eq!(status(&tree, 3), BudStatus::Dormant);
    assert_eq!(status(&tree, 4), BudStatus::Dormant);

    let mut tree = make_branched_tree();
    tree.find_mut(2).unwrap().bud_status = BudStatus::Flower;
    let outcome = tree.prune(5).unwrap();
    assert_eq!(outcome.activated, vec![1]);
    assert_eq!(status(&tree, 2), BudStatus::Flower);
}

#[test]
fn removing_the_apex_releases_every_dormant_bud() {
    let mut tree = make_tree();
    let one = grow(&mut tree, 1);
    let tip = grow(&mut tree, one);
    let side = grow(&mut tree, 1);
    tree.find_mut(side).unwrap().bud_status = BudStatus::Dead;
    let outcome = tree.prune(tip).unwrap();
    assert!(outcome.apex_removed);
    assert_eq!(status(&tree, 1), BudStatus::Active);
    assert_eq!(status(&tree, one), BudStatus::Active);
    assert_eq!(status(&tree, side), BudStatus::Dead);
}

#[test]
fn pruning_twice_changes_nothing() {
    let mut tree = make_branched_tree();
    tree.prune(3).unwrap();
    let snapshot = tree.snapshot();
    let outcome = tree.prune(3).unwrap();
    assert_eq!(outcome, PruneOutcome::default());
    assert_eq!(tree.snapshot(), snapshot);
}

#[test]
fn prune_reports_missing_metamer() {
    let mut tree = make_tree();
    assert_eq!(tree.prune(17), Err(TreeError::NotFound(17)));
}

#[test]
fn root_prune_weakens_apical_dominance_once() {
    let mut tree = make_branched_tree();
    let before = tree.genotype().apical_dominance;
    let outcome = tree.prune(1).unwrap();
    assert!(outcome.apical_dominance_released);
    let after = tree.genotype().apical_dominance;
    assert!(after <= before * 0.6 + 1e-12);
    assert!(after >= 0.0);
    assert_eq!(tree.live_count(), 0);

    assert!(!tree.apply_apical_release());
    assert_eq!(tree.genotype().apical_dominance, after);
}

#[test]
fn apical_release_never_raises_dominance() {
    let mut tree = make_tree();
    let before = tree.genotype().apical_dominance;
    assert!(!tree.apply_apical_release());
    assert_eq!(tree.genotype().apical_dominance, before);
    tree.prune(1).unwrap();
    assert!(tree.genotype().apical_dominance < before);
}

#[test]
fn winter_dormancy_resets_all_but_dead() {
    let mut tree = make_branched_tree();
    tree.find_mut(2).unwrap().bud_status = BudStatus::Active;
    tree.find_mut(3).unwrap().bud_status = BudStatus::Flower;
    tree.find_mut(4).unwrap().bud_status = BudStatus::Dead;
    assert_eq!(tree.apply_winter_dormancy(), 2);
    assert_eq!(status(&tree, 2), BudStatus::Dormant);
    assert_eq!(status(&tree, 3), BudStatus::Dormant);
    assert_eq!(status(&tree, 4), BudStatus::Dead);
    assert_eq!(tree.apply_winter_dormancy(), 0);
}

#[test]
fn snapshot_lists_child_ids_and_parameters() {
    let tree = make_branched_tree();
    let snapshot = tree.snapshot();
    assert_eq!(snapshot.roots, vec![1]);
    assert_eq!(snapshot.metamers.len(), 5);
    assert_eq!(snapshot.metamers[0].children, vec![2, 5]);
    assert_eq!(snapshot.metamers[1].children, vec![3, 4]);
    assert_eq!(snapshot.genotype_params["apical_dominance"], 0.85);
    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["metamers"][2]["bud_status"], "Dormant");
}

#[test]
fn tree_spec_builds_from_preset_and_overrides() {
    let spec: TreeSpec = serde_json::from_str(
        r#"{"preset": "orin", "genotype_params": {"apical_decay": 3.0}, "metamer": {"nsc_store": 9.0}}"#,
    )
    .unwrap();
    let tree = spec.build().unwrap();
    assert_eq!(tree.genotype().apical_dominance, 0.65);
    assert_eq!(tree.genotype().apical_decay, 3.0);
    assert_eq!(tree.find(1).unwrap().nsc_store, 9.0);
    assert_eq!(tree.roots(), &[1]);
}

#[test]
fn tree_spec_reports_bad_inputs() {
    let unknown = TreeSpec {
        preset: Some("gala".to_string()),
        ..TreeSpec::default()
    };
    assert!(matches!(
        unknown.build(),
        Err(TreeError::Config(ConfigError::UnknownPreset { .. }))
    ));

    let bad_metamer = TreeSpec {
        metamer: MetamerSpec {
            length: -1.0,
            ..MetamerSpec::default()
        },
        ..TreeSpec::default()
    };
    assert_eq!(
        bad_metamer.build().unwrap_err(),
        TreeError::InvalidMetamer {
            id: 1,
            field: "length"
        }
    );
}
