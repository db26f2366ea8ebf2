/// Lazy power set, yielding subsets in increasing cardinality.
///
/// Within one cardinality subsets come in lexicographic order of item
/// position, so `[a, b, c]` yields `[] [a] [b] [c] [a, b] [a, c] [b, c]
/// [a, b, c]`. Nothing beyond the current subset is materialized.
#[derive(Debug, Clone)]
pub struct PowerSet<T> {
    items: Vec<T>,
    indices: Vec<usize>,
    exhausted: bool,
}

impl<T: Clone> PowerSet<T> {
    pub fn new<I: IntoIterator<Item = T>>(items: I) -> Self {
        Self {
            items: items.into_iter().collect(),
            indices: Vec::new(),
            exhausted: false,
        }
    }

    /// Move `indices` to the next combination, growing the subset size when
    /// the current size is used up.
    fn advance(&mut self) {
        let n = self.items.len();
        let k = self.indices.len();

        for i in (0..k).rev() {
            if self.indices[i] < n - k + i {
                self.indices[i] += 1;
                for j in i + 1..k {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
                return;
            }
        }

        if k == n {
            self.exhausted = true;
        } else {
            self.indices = (0..=k).collect();
        }
    }
}

impl<T: Clone> Iterator for PowerSet<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Vec<T>> {
        if self.exhausted {
            return None;
        }

        let subset = self.indices.iter().map(|&i| self.items[i].clone()).collect();
        self.advance();
        Some(subset)
    }
}
