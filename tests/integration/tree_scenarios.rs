#![allow(missing_docs)]

use sumtree::{MemoryStore, Result, SumTreeError, Tree};

fn tree_with(keys: &[(&[u8], u64)], m: u8) -> Result<Tree<MemoryStore>> {
    let mut tree = Tree::new(MemoryStore::new(), m)?;
    for (key, weight) in keys {
        tree.set(key, *weight)?;
    }
    Ok(tree)
}

const FIVE_KEYS: &[(&[u8], u64)] = &[
    (b"a", 1),
    (b"b", 2),
    (b"c", 3),
    (b"d", 4),
    (b"e", 5),
];

#[test]
fn ordered_inserts_split_and_accumulate() -> Result<()> {
    let tree = tree_with(FIVE_KEYS, 4)?;
    assert_eq!(tree.total_accumulated_value()?, 15);
    assert_eq!(tree.prefix_sum(b"c")?, 6);
    for (key, weight) in FIVE_KEYS {
        assert_eq!(tree.get(key)?, *weight);
    }
    // five leaves cannot fit one branch of capacity 4: the dump must show a
    // multi-branch structure
    let dump = tree.debug_dump()?;
    let branches = dump.lines().filter(|l| l.starts_with("branch")).count();
    assert!(branches >= 3, "expected a split structure, got:\n{dump}");
    Ok(())
}

#[test]
fn removal_restores_sums_and_structure() -> Result<()> {
    let mut tree = tree_with(FIVE_KEYS, 4)?;
    tree.remove(b"c")?;
    assert_eq!(tree.get(b"c")?, 0);
    assert_eq!(tree.total_accumulated_value()?, 12);
    for (key, weight) in FIVE_KEYS {
        if *key != b"c" {
            assert_eq!(tree.get(key)?, *weight);
        }
    }
    assert_eq!(tree.prefix_sum(b"c")?, 3);
    assert_eq!(tree.subset_accumulation(Some(b"b"), None)?, 11);
    Ok(())
}

#[test]
fn empty_tree_answers_zero() -> Result<()> {
    let tree = Tree::new(MemoryStore::new(), 4)?;
    assert_eq!(tree.get(b"x")?, 0);
    assert_eq!(tree.total_accumulated_value()?, 0);
    assert_eq!(tree.subset_accumulation(None, None)?, 0);
    assert_eq!(tree.prefix_sum(b"x")?, 0);
    Ok(())
}

#[test]
fn subset_accumulation_covers_inclusive_window() -> Result<()> {
    let tree = tree_with(FIVE_KEYS, 4)?;
    assert_eq!(tree.subset_accumulation(Some(b"b"), Some(b"d"))?, 9);
    assert_eq!(tree.subset_accumulation(Some(b"a"), Some(b"a"))?, 1);
    assert_eq!(tree.subset_accumulation(None, Some(b"b"))?, 3);
    assert_eq!(tree.subset_accumulation(Some(b"d"), None)?, 9);
    Ok(())
}

#[test]
fn set_then_remove_returns_to_the_seeded_state() -> Result<()> {
    let mut tree = Tree::new(MemoryStore::new(), 4)?;
    let baseline = tree.debug_dump()?;
    tree.set(b"only", 42)?;
    tree.remove(b"only")?;
    assert_eq!(tree.total_accumulated_value()?, 0);
    assert_eq!(tree.get(b"only")?, 0);
    assert_eq!(tree.debug_dump()?, baseline);
    // the seed is a single branch over the sentinel leaf
    assert_eq!(baseline.lines().filter(|l| l.starts_with("branch")).count(), 1);
    assert_eq!(baseline.lines().filter(|l| l.starts_with("leaf")).count(), 1);
    Ok(())
}

#[test]
fn iterators_walk_leaves_in_both_directions() -> Result<()> {
    let tree = tree_with(FIVE_KEYS, 4)?;
    let forward: Vec<_> = tree.iter(Some(b"b"), Some(b"e"))?.collect();
    assert_eq!(
        forward,
        vec![(b"b".to_vec(), 2), (b"c".to_vec(), 3), (b"d".to_vec(), 4)]
    );
    let backward: Vec<_> = tree.iter_rev(None, None)?.collect();
    assert_eq!(backward.first(), Some(&(b"e".to_vec(), 5)));
    assert_eq!(backward.last(), Some(&(Vec::new(), 0))); // sentinel
    Ok(())
}

#[test]
fn invalid_arguments_are_rejected() {
    let err = Tree::new(MemoryStore::new(), 1).unwrap_err();
    assert!(matches!(err, SumTreeError::Invalid(_)));

    let tree = Tree::new(MemoryStore::new(), 4).expect("new tree");
    let err = tree
        .subset_accumulation(Some(b"z"), Some(b"a"))
        .unwrap_err();
    assert!(matches!(err, SumTreeError::Invalid(_)));
}

#[test]
fn reopening_over_an_existing_store_keeps_data() -> Result<()> {
    let mut tree = tree_with(FIVE_KEYS, 4)?;
    tree.set(b"f", 6)?;
    let store = tree.into_store();

    let reopened = Tree::new(store, 4)?;
    assert_eq!(reopened.total_accumulated_value()?, 21);
    assert_eq!(reopened.get(b"f")?, 6);
    assert_eq!(reopened.prefix_sum(b"c")?, 6);
    Ok(())
}
