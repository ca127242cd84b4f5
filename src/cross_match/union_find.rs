/// Sequential disjoint-set forest over record indices `0..n`.
///
/// The smaller root always becomes the parent, so the root of a set is its smallest member
/// and the final partition does not depend on the order of the `union` calls.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Find root with iterative path compression (two-pass).
    #[inline]
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut current = x;
        while current != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    /// Merge the sets of `a` and `b`. Returns `true` if they were distinct.
    #[inline]
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return false;
        }
        if root_a < root_b {
            self.parent[root_b] = root_a;
        } else {
            self.parent[root_a] = root_b;
        }
        true
    }

    /// Members of every set, each list sorted, sets ordered by their smallest member.
    pub fn components(&mut self) -> Vec<Vec<usize>> {
        let mut by_root: Vec<Vec<usize>> = vec![Vec::new(); self.parent.len()];
        for i in 0..self.parent.len() {
            let root = self.find(i);
            by_root[root].push(i);
        }
        by_root.into_iter().filter(|c| !c.is_empty()).collect()
    }
}

#[cfg(test)]
mod union_find_test {
    use super::*;

    #[test]
    fn test_singletons() {
        let mut uf = UnionFind::new(3);
        assert_eq!(uf.components(), vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn test_union_is_transitive() {
        let mut uf = UnionFind::new(5);
        assert!(uf.union(3, 4));
        assert!(uf.union(4, 1));
        assert!(!uf.union(1, 3));
        assert_eq!(uf.find(4), 1);
        assert_eq!(uf.components(), vec![vec![0], vec![1, 3, 4], vec![2]]);
    }

    #[test]
    fn test_union_order_does_not_matter() {
        let pairs = [(0, 5), (5, 2), (7, 6), (2, 9), (6, 3)];
        let mut forward = UnionFind::new(10);
        let mut backward = UnionFind::new(10);
        for &(a, b) in &pairs {
            forward.union(a, b);
        }
        for &(a, b) in pairs.iter().rev() {
            backward.union(b, a);
        }
        assert_eq!(forward.components(), backward.components());
    }
}
