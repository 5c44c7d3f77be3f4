// 🔗 Disjoint-set union over string identifiers
// Path compression + union by size.

use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct DisjointSet {
    index: HashMap<String, usize>,
    names: Vec<String>,
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an identifier (no-op if known) and return its slot
    pub fn insert(&mut self, name: &str) -> usize {
        if let Some(&slot) = self.index.get(name) {
            return slot;
        }

        let slot = self.names.len();
        self.index.insert(name.to_string(), slot);
        self.names.push(name.to_string());
        self.parent.push(slot);
        self.size.push(1);
        slot
    }

    fn root(&mut self, mut slot: usize) -> usize {
        let mut top = slot;
        while self.parent[top] != top {
            top = self.parent[top];
        }

        // compress
        while self.parent[slot] != top {
            let next = self.parent[slot];
            self.parent[slot] = top;
            slot = next;
        }

        top
    }

    /// Representative slot for a known identifier
    pub fn find(&mut self, name: &str) -> Option<usize> {
        let slot = *self.index.get(name)?;
        Some(self.root(slot))
    }

    /// Merge the sets containing `a` and `b`, inserting either if unknown
    pub fn union(&mut self, a: &str, b: &str) {
        let a = self.insert(a);
        let b = self.insert(b);
        let (ra, rb) = (self.root(a), self.root(b));

        if ra == rb {
            return;
        }

        let (big, small) = if self.size[ra] >= self.size[rb] { (ra, rb) } else { (rb, ra) };
        self.parent[small] = big;
        self.size[big] += self.size[small];
    }

    pub fn connected(&mut self, a: &str, b: &str) -> bool {
        match (self.find(a), self.find(b)) {
            (Some(ra), Some(rb)) => ra == rb,
            _ => false,
        }
    }

    /// All identifiers grouped by component, each component sorted
    pub fn components(&mut self) -> Vec<Vec<String>> {
        let mut by_root: HashMap<usize, Vec<String>> = HashMap::new();
        for slot in 0..self.names.len() {
            let root = self.root(slot);
            by_root.entry(root).or_default().push(self.names[slot].clone());
        }

        let mut components: Vec<Vec<String>> = by_root
            .into_values()
            .map(|mut members| {
                members.sort();
                members
            })
            .collect();
        components.sort();
        components
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
