use rustc_hash::FxHashMap;

/// An arena-backed prefix trie mapping lowercased keys to opaque `u32`
/// values. Multiple keys may carry the same value; a prefix walk collects
/// every value in the matching subtree.
#[derive(Debug, Default)]
pub(crate) struct Trie {
    nodes: Vec<Node>,
}

#[derive(Debug, Default)]
struct Node {
    children: FxHashMap<char, u32>,
    values: Vec<u32>,
}

impl Trie {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
        }
    }

    pub(crate) fn insert(&mut self, key: &str, value: u32) {
        let mut node = 0usize;
        for c in key.chars() {
            let next = match self.nodes[node].children.get(&c) {
                Some(&next) => next as usize,
                None => {
                    let next = self.nodes.len();
                    self.nodes.push(Node::default());
                    self.nodes[node]
                        .children
                        .insert(c, u32::try_from(next).expect("trie node overflow"));
                    next
                }
            };
            node = next;
        }
        self.nodes[node].values.push(value);
    }

    /// Every value stored under a key starting with `prefix`. The subtree
    /// walk is iterative; result order is unspecified.
    pub(crate) fn collect_prefix(&self, prefix: &str) -> Vec<u32> {
        let mut node = 0usize;
        for c in prefix.chars() {
            match self.nodes[node].children.get(&c) {
                Some(&next) => node = next as usize,
                None => return Vec::new(),
            }
        }

        let mut values = Vec::new();
        let mut stack = vec![node];
        while let Some(node) = stack.pop() {
            let node = &self.nodes[node];
            values.extend_from_slice(&node.values);
            stack.extend(node.children.values().map(|&child| child as usize));
        }
        values
    }
}
