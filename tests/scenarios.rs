use bptree::{BTreeError, Tree};
use rand::rng;
use rand::seq::SliceRandom;

/// Lets `RUST_LOG=trace cargo test` surface the split/borrow/merge traces
/// emitted through the `log` facade; harmless no-op otherwise.
fn init_logging() {
    let _ = env_logger::try_init();
}

#[test]
fn order_5_fourteen_key_scenario() {
    init_logging();
    let mut tree = Tree::<i64, i64>::new(5).unwrap();
    let values = [5, 8, 10, 15, 16, 17, 18, 6, 7, 9, 19, 20, 21, 22];
    for &v in &values {
        tree.insert(v, v, false).unwrap();
    }
    assert_eq!(tree.search(&8), Ok(&8));
    assert_eq!(tree.search(&11), Err(BTreeError::KeyNotFound));

    for &v in &values {
        tree.delete(&v).unwrap();
    }
    assert_eq!(tree.len(), 0);
}

#[test]
fn order_100_thousand_random_keys() {
    let mut rng = rng();
    let mut keys: Vec<i64> = (0..1000).collect();
    keys.shuffle(&mut rng);

    let mut tree = Tree::<i64, i64>::new(100).unwrap();
    for &k in &keys {
        tree.insert(k, k, false).unwrap();
    }
    assert_eq!(tree.len(), 1000);
    for &k in &keys {
        assert_eq!(tree.search(&k), Ok(&k));
    }

    let mut delete_order = keys.clone();
    delete_order.shuffle(&mut rng);
    for &k in &delete_order {
        tree.delete(&k).unwrap();
    }
    assert_eq!(tree.len(), 0);
}

#[test]
fn order_1000_ten_thousand_keys_delete_half_reinsert() {
    let mut rng = rng();
    let mut keys: Vec<i64> = (0..10_000).collect();
    keys.shuffle(&mut rng);

    let mut tree = Tree::<i64, i64>::new(1000).unwrap();
    for &k in &keys {
        tree.insert(k, k, false).unwrap();
    }

    let mut shuffled = keys.clone();
    shuffled.shuffle(&mut rng);
    let (deleted, retained) = shuffled.split_at(keys.len() / 2);
    for &k in deleted {
        tree.delete(&k).unwrap();
    }

    for &k in deleted {
        assert_eq!(tree.contains(&k), Ok(false));
    }
    for &k in retained {
        assert_eq!(tree.contains(&k), Ok(true));
    }

    for &k in deleted {
        tree.insert(k, k, false).unwrap();
    }
    for &k in &keys {
        assert_eq!(tree.contains(&k), Ok(true));
    }

    let collected: Vec<_> = tree.keys(None, None).unwrap().copied().collect();
    assert!(collected.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(collected.len(), keys.len());
}

#[test]
fn order_3_minimum_fanout_sequential_insert_and_delete() {
    let mut tree = Tree::<i64, i64>::new(3).unwrap();
    for i in 1..=20 {
        tree.insert(i, i, false).unwrap();
    }
    for i in 1..=20 {
        tree.delete(&i).unwrap();
    }
    assert_eq!(tree.len(), 0);
}

#[test]
fn range_query_over_0_to_100_yields_half_open_window() {
    let mut tree = Tree::<i64, i64>::new(5).unwrap();
    for i in 0..100 {
        tree.insert(i, i, false).unwrap();
    }
    let got: Vec<_> = tree
        .items(Some(50), Some(60))
        .unwrap()
        .map(|(k, v)| (*k, *v))
        .collect();
    assert_eq!(got, (50..60).map(|i| (i, i)).collect::<Vec<_>>());
}

#[test]
fn inverted_range_is_invalid() {
    let mut tree = Tree::<i64, i64>::new(5).unwrap();
    for i in 0..100 {
        tree.insert(i, i, false).unwrap();
    }
    assert!(matches!(
        tree.items(Some(60), Some(50)),
        Err(BTreeError::InvalidRange(_))
    ));
}
