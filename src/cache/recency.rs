//! Arena-backed doubly linked list tracking recency order.
//!
//! Nodes live in a `Vec` and link to each other by index; freed slots are
//! reused. The head is the most recently used key, the tail the least.

#[derive(Debug)]
struct Node {
    key: String,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Recency list of cache keys.
#[derive(Debug, Default)]
pub(crate) struct RecencyList {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl RecencyList {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Insert `key` at the head and return its node index.
    pub(crate) fn push_front(&mut self, key: String) -> usize {
        let node = Node {
            key,
            prev: None,
            next: self.head,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = Some(node);
                idx
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        if let Some(old_head) = self.head {
            self.node_mut(old_head).prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
        self.len += 1;
        idx
    }

    /// Unlink and free the node at `idx`, returning its key.
    pub(crate) fn remove(&mut self, idx: usize) -> Option<String> {
        let node = self.nodes.get_mut(idx)?.take()?;
        match node.prev {
            Some(prev) => self.node_mut(prev).next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.node_mut(next).prev = node.prev,
            None => self.tail = node.prev,
        }
        self.free.push(idx);
        self.len -= 1;
        Some(node.key)
    }

    /// Move the node at `idx` to the head.
    ///
    /// The node keeps its index, so callers holding it stay valid.
    pub(crate) fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        let (prev, next) = match self.nodes.get(idx).and_then(Option::as_ref) {
            Some(node) => (node.prev, node.next),
            None => return,
        };
        // Detach. idx is not the head, so prev is set.
        if let Some(prev) = prev {
            self.node_mut(prev).next = next;
        }
        match next {
            Some(next) => self.node_mut(next).prev = prev,
            None => self.tail = prev,
        }
        // Reattach at head.
        let old_head = self.head;
        {
            let node = self.node_mut(idx);
            node.prev = None;
            node.next = old_head;
        }
        if let Some(old_head) = old_head {
            self.node_mut(old_head).prev = Some(idx);
        }
        self.head = Some(idx);
    }

    /// Index of the least recently used node.
    pub(crate) fn back(&self) -> Option<usize> {
        self.tail
    }

    /// Keys from most to least recently used.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let idx = cursor?;
            let node = self.nodes[idx].as_ref()?;
            cursor = node.next;
            Some(node.key.as_str())
        })
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node {
        match self.nodes[idx].as_mut() {
            Some(node) => node,
            None => unreachable!("recency list links to freed node {idx}"),
        }
    }
}
