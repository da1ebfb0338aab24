#![allow(missing_docs)]

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sumtree::{MemoryStore, Result, Tree};

fn random_key(rng: &mut ChaCha8Rng) -> Vec<u8> {
    let len = rng.gen_range(1..=3);
    (0..len).map(|_| rng.gen_range(b'a'..=b'f')).collect()
}

#[test]
fn randomized_churn_matches_reference_map() -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut tree = Tree::new(MemoryStore::new(), 4)?;
    let mut reference: BTreeMap<Vec<u8>, u64> = BTreeMap::new();
    reference.insert(Vec::new(), 0); // construction seeds the sentinel leaf

    for step in 0..600 {
        let key = random_key(&mut rng);
        if rng.gen_bool(0.6) {
            let weight = rng.gen_range(0..1_000);
            tree.set(&key, weight)?;
            reference.insert(key, weight);
        } else {
            tree.remove(&key)?;
            reference.remove(&key);
        }
        if step % 50 == 0 {
            assert_eq!(
                tree.total_accumulated_value()?,
                reference.values().sum::<u64>(),
                "total diverged at step {step}"
            );
        }
    }

    for (key, weight) in &reference {
        assert_eq!(tree.get(key)?, *weight);
        let expected: u64 = reference.range(..=key.clone()).map(|(_, w)| *w).sum();
        assert_eq!(tree.prefix_sum(key)?, expected);
    }

    let collected: Vec<_> = tree.iter(None, None)?.collect();
    let expected: Vec<_> = reference.iter().map(|(k, w)| (k.clone(), *w)).collect();
    assert_eq!(collected, expected);

    let reversed: Vec<_> = tree.iter_rev(None, None)?.collect();
    let mut expected_rev = expected;
    expected_rev.reverse();
    assert_eq!(reversed, expected_rev);

    // random inclusive windows against the reference fold
    for _ in 0..50 {
        let mut a = random_key(&mut rng);
        let mut b = random_key(&mut rng);
        if a > b {
            std::mem::swap(&mut a, &mut b);
        }
        let expected: u64 = reference
            .range(a.clone()..=b.clone())
            .map(|(_, w)| *w)
            .sum();
        assert_eq!(
            tree.subset_accumulation(Some(&a), Some(&b))?,
            expected,
            "window [{:?}, {:?}]",
            a,
            b
        );
    }
    Ok(())
}
