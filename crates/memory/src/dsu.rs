//! Disjoint set union over record positions.
//!
//! Records are numbered by their position in load order. The root of every
//! set is its smallest member, so a cluster's root is always its oldest
//! record.

/// Union-find over `0..len` with path compression.
#[derive(Debug, Clone)]
pub struct RecordDsu {
    parent: Vec<usize>,
    cluster_count: usize,
}

impl RecordDsu {
    /// Create `len` singleton sets.
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            cluster_count: len,
        }
    }

    /// Find the root of `x`, compressing the path on the way.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Merge the sets containing `a` and `b`.
    ///
    /// Returns the surviving root, or `None` if they were already together.
    pub fn try_merge(&mut self, a: usize, b: usize) -> Option<usize> {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return None;
        }
        let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
        self.parent[child] = root;
        self.cluster_count -= 1;
        Some(root)
    }

    /// Number of disjoint sets.
    pub fn cluster_count(&self) -> usize {
        self.cluster_count
    }

    /// Members of every set, keyed by root, members ascending.
    pub fn clusters(&mut self) -> Vec<(usize, Vec<usize>)> {
        let mut by_root: std::collections::BTreeMap<usize, Vec<usize>> = Default::default();
        for x in 0..self.parent.len() {
            let root = self.find(x);
            by_root.entry(root).or_default().push(x);
        }
        by_root.into_iter().collect()
    }
}
