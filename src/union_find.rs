/// Disjoint sets over row ids `0..n`, with path compression and union by size.
pub(crate) struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    pub(crate) fn new(n_samples: usize) -> Self {
        let parent = (0..n_samples).collect();
        let size = vec![1; n_samples];
        UnionFind { parent, size }
    }

    /// Merges the sets of `m` and `n`. Returns false if they already were one set.
    pub(crate) fn union(&mut self, m: usize, n: usize) -> bool {
        let (mut m, mut n) = (self.find(m), self.find(n));
        if m == n {
            return false;
        }
        if self.size[m] < self.size[n] {
            std::mem::swap(&mut m, &mut n);
        }
        self.parent[n] = m;
        self.size[m] += self.size[n];
        true
    }

    pub(crate) fn find(&mut self, mut n: usize) -> usize {
        let mut root = n;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        while self.parent[n] != root {
            let next = self.parent[n];
            self.parent[n] = root;
            n = next;
        }
        root
    }

    /// Size of the set rooted at `n`.
    pub(crate) fn size_of(&self, n: usize) -> usize {
        self.size[n]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_is_transitive() {
        let mut uf = UnionFind::new(5);
        assert!(uf.union(0, 1));
        assert!(uf.union(1, 2));
        assert!(!uf.union(0, 2));
        let root = uf.find(2);
        assert_eq!(uf.find(0), root);
        assert_eq!(uf.size_of(root), 3);
        assert_ne!(uf.find(3), root);
        let single = uf.find(4);
        assert_eq!(uf.size_of(single), 1);
    }
}
