use std::time::{SystemTime, UNIX_EPOCH};

use rand::prelude::random;
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::error::RbtreeError;
use crate::rbtree::Rbtree;

#[test]
fn test_id() {
    let tree: Rbtree<i64> = Rbtree::new("test-rbtree");
    assert_eq!(tree.id(), "test-rbtree".to_string());
}

#[test]
fn test_len() {
    let tree: Rbtree<i64> = Rbtree::new("test-rbtree");
    assert_eq!(tree.len(), 0);
    assert!(tree.is_empty());
}

#[test]
fn test_insert_shape() {
    let mut tree: Rbtree<i64> = Rbtree::new("test-rbtree");
    tree.insert(10);
    tree.insert(20);
    tree.insert(30);

    let stats = tree.validate().expect("invalid tree");
    assert_eq!(stats.entries(), 3);
    // 10,20,30 in order forces one rotation; 20 takes the root and the
    // sentinel leaves all sit two levels down.
    let root = tree.root().unwrap();
    assert_eq!(tree.key(root), Some(&20));
    assert_eq!(stats.depths().unwrap().max(), 2);

    let mut buf = vec![0; 3];
    assert_eq!(tree.to_array(&mut buf), 3);
    assert_eq!(buf, vec![10, 20, 30]);
}

#[test]
fn test_duplicates() {
    let mut tree: Rbtree<i64> = Rbtree::new("test-rbtree");
    tree.insert(10);
    tree.insert(10);

    assert_eq!(tree.len(), 2);
    assert!(tree.find(&10).is_some());
    assert!(tree.validate().is_ok());

    let mut buf = vec![0; 4];
    assert_eq!(tree.to_array(&mut buf), 2);
    assert_eq!(&buf[..2], &[10, 10]);

    // erasing one instance leaves the other findable.
    let id = tree.find(&10).unwrap();
    assert_eq!(tree.erase(id), Ok(10));
    assert!(tree.find(&10).is_some());
    let id = tree.find(&10).unwrap();
    assert_eq!(tree.erase(id), Ok(10));
    assert!(tree.find(&10).is_none());
    assert!(tree.validate().is_ok());
}

#[test]
fn test_find() {
    let keys = vec![2, 1, 3, 6, 5, 4, 8, 0, 9, 7];
    let tree = Rbtree::load_from("test-rbtree", keys.iter().cloned());

    for key in 0..10 {
        let id = tree.find(&key).expect("missing key");
        assert_eq!(tree.key(id), Some(&key));
    }
    assert!(tree.find(&10).is_none());
    assert!(tree.find(&-1).is_none());
}

#[test]
fn test_erase_root() {
    let keys = vec![5, 3, 8, 1, 4, 7, 9];
    let mut tree = Rbtree::load_from("test-rbtree", keys.iter().cloned());
    assert!(tree.validate().is_ok());

    let root = tree.root().unwrap();
    let rkey = *tree.key(root).unwrap();
    assert_eq!(tree.erase(root), Ok(rkey));
    assert_eq!(tree.len(), keys.len() - 1);
    assert!(tree.validate().is_ok());

    let mut expect = keys.clone();
    expect.sort();
    let at = expect.iter().position(|&k| k == rkey).unwrap();
    expect.remove(at);

    let mut buf = vec![0; keys.len()];
    let count = tree.to_array(&mut buf);
    assert_eq!(&buf[..count], &expect[..]);
}

#[test]
fn test_erase_leaves() {
    // erasing the minimum over and over hits both the red-leaf splice,
    // which needs no fixup, and the black-leaf fixup cases.
    let mut tree: Rbtree<i64> = Rbtree::new("test-rbtree");
    for key in 1..=64 {
        tree.insert(key);
    }
    for key in 1..=64 {
        let id = tree.min().expect("tree drained early");
        assert_eq!(tree.key(id), Some(&key));
        assert_eq!(tree.erase(id), Ok(key));
        assert!(tree.find(&key).is_none());
        assert!(tree.validate().is_ok());
    }
    assert!(tree.is_empty());
    assert_eq!(tree.min(), None);
    assert_eq!(tree.max(), None);
}

#[test]
fn test_erase_single() {
    let mut tree: Rbtree<i64> = Rbtree::new("test-rbtree");
    let id = tree.insert(42);
    assert_eq!(tree.erase(id), Ok(42));
    assert!(tree.is_empty());
    assert_eq!(tree.root(), None);
    assert!(tree.validate().is_ok());
}

#[test]
fn test_erase_not_member() {
    let mut tree: Rbtree<i64> = Rbtree::new("test-rbtree");
    let id = tree.insert(1);
    tree.insert(2);

    assert_eq!(tree.erase(id), Ok(1));
    assert_eq!(tree.erase(id), Err(RbtreeError::NotAMember));
    assert_eq!(tree.key(id), None);
    assert_eq!(tree.len(), 1);
    assert!(tree.validate().is_ok());
}

#[test]
fn test_min_max() {
    let mut tree: Rbtree<i64> = Rbtree::new("test-rbtree");
    assert_eq!(tree.min(), None);
    assert_eq!(tree.max(), None);

    for key in &[4, 9, 1, 7, 3] {
        tree.insert(*key);
    }
    assert_eq!(tree.key(tree.min().unwrap()), Some(&1));
    assert_eq!(tree.key(tree.max().unwrap()), Some(&9));
}

#[test]
fn test_to_array_truncated() {
    let mut tree: Rbtree<i64> = Rbtree::new("test-rbtree");
    let mut empty: Vec<i64> = vec![0; 4];
    assert_eq!(tree.to_array(&mut empty), 0);

    for key in &[9, 0, 5, 2, 7, 4, 8, 1, 6, 3] {
        tree.insert(*key);
    }
    let mut buf = vec![0; 4];
    assert_eq!(tree.to_array(&mut buf), 4);
    assert_eq!(buf, vec![0, 1, 2, 3]);
}

#[test]
fn test_iter() {
    let keys = vec![6, 2, 9, 2, 0, 5, 7];
    let tree = Rbtree::load_from("test-rbtree", keys.iter().cloned());
    let mut expect = keys.clone();
    expect.sort();

    let got: Vec<i64> = tree.iter().cloned().collect();
    assert_eq!(got, expect);
    assert!(Rbtree::<i64>::new("empty").iter().next().is_none());
}

#[test]
fn test_height_bound() {
    let mut tree: Rbtree<i64> = Rbtree::new("test-rbtree");
    let mut rng = SmallRng::from_seed(make_seed().to_le_bytes());
    for _ in 0..1000 {
        tree.insert(rng.gen::<i64>() % 10_000);
    }

    let stats = tree.validate().expect("invalid tree");
    let bound = 2.0 * ((tree.len() + 1) as f64).log2();
    assert!((stats.depths().unwrap().max() as f64) <= bound);
}

#[test]
fn test_crud() {
    let size = 200;
    let mut tree: Rbtree<i64> = Rbtree::new("test-rbtree");
    let mut refks = RefKeys::new(size);

    for _ in 0..20_000 {
        let key: i64 = (random::<i64>() % (size as i64)).abs();
        let op: i64 = (random::<i64>() % 3).abs();
        match op {
            0 => {
                let id = tree.insert(key);
                refks.insert(key);
                assert_eq!(tree.key(id), Some(&key));
            }
            1 => {
                let id = tree.find(&key);
                assert_eq!(id.is_some(), refks.contains(key));
                if let Some(id) = id {
                    assert_eq!(tree.erase(id), Ok(key));
                    assert!(refks.delete(key));
                }
            }
            2 => {
                assert_eq!(tree.find(&key).is_some(), refks.contains(key));
            }
            op => panic!("unreachable {}", op),
        };

        assert_eq!(tree.len(), refks.len());
        assert!(tree.validate().is_ok());
    }

    println!("index-length {}", tree.len());

    let expect = refks.to_vec();
    let mut buf = vec![0; expect.len() + 1];
    let count = tree.to_array(&mut buf);
    assert_eq!(&buf[..count], &expect[..]);

    let got: Vec<i64> = tree.iter().cloned().collect();
    assert_eq!(got, expect);
}

fn make_seed() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

include!("./ref_test.rs");
