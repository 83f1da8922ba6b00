// Reference model for a key-only multiset over the keys 0..capacity,
// one count per key.
struct RefKeys {
    counts: Vec<usize>,
}

impl RefKeys {
    fn new(capacity: usize) -> RefKeys {
        RefKeys {
            counts: vec![0; capacity],
        }
    }

    fn insert(&mut self, key: i64) {
        self.counts[key as usize] += 1;
    }

    fn contains(&self, key: i64) -> bool {
        self.counts[key as usize] > 0
    }

    fn delete(&mut self, key: i64) -> bool {
        if self.counts[key as usize] == 0 {
            false
        } else {
            self.counts[key as usize] -= 1;
            true
        }
    }

    fn len(&self) -> usize {
        self.counts.iter().sum()
    }

    fn to_vec(&self) -> Vec<i64> {
        let mut acc = vec![];
        for (key, &n) in self.counts.iter().enumerate() {
            for _ in 0..n {
                acc.push(key as i64);
            }
        }
        acc
    }
}
