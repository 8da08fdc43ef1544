//! Segment trie, one per HTTP method.
//!
//! Each node holds one path segment. Only the node reached by a complete
//! insertion carries the full pattern; every other node is structural.
//!
//! ```text
//! /p/:lang/doc   /p/blog   /static/*filepath
//!
//! (root)
//! ├── p
//! │   ├── :lang
//! │   │   └── doc        pattern = "/p/:lang/doc"
//! │   └── blog           pattern = "/p/blog"
//! └── static
//!     └── *filepath      pattern = "/static/*filepath"
//! ```

/// Splits a pattern or request path into its segments.
///
/// Empty segments are dropped, so `//a///b/` and `/a/b` are the same path.
/// Parsing stops after the first catch-all (`*name`) segment: anything
/// following it is ignored.
pub(crate) fn parse_pattern(pattern: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    for item in pattern.split('/').filter(|s| !s.is_empty()) {
        parts.push(item);
        if item.starts_with('*') {
            break;
        }
    }
    parts
}

#[derive(Debug, Default)]
pub(crate) struct Node {
    pattern: String,
    part: String,
    children: Vec<Node>,
    is_wild: bool,
}

impl Node {
    fn new(part: &str) -> Self {
        Self {
            pattern: String::new(),
            part: part.to_owned(),
            children: Vec::new(),
            is_wild: part.starts_with(':') || part.starts_with('*'),
        }
    }

    /// The full route pattern ending at this node. Empty for structural nodes.
    pub(crate) fn pattern(&self) -> &str {
        &self.pattern
    }

    /// First child whose part equals `part` or that is a wildcard.
    fn match_child(&self, part: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|child| child.part == part || child.is_wild)
    }

    pub(crate) fn insert(&mut self, pattern: &str, parts: &[&str], depth: usize) {
        if parts.len() == depth {
            self.pattern = pattern.to_owned();
            return;
        }

        let part = parts[depth];
        let idx = match self.match_child(part) {
            Some(idx) => idx,
            None => {
                self.children.push(Node::new(part));
                self.children.len() - 1
            }
        };

        self.children[idx].insert(pattern, parts, depth + 1);
    }

    /// Depth-first search. Children are tried in insertion order and the
    /// first complete match wins.
    pub(crate) fn search(&self, parts: &[&str], depth: usize) -> Option<&Node> {
        if parts.len() == depth || self.part.starts_with('*') {
            if self.pattern.is_empty() {
                return None;
            }
            return Some(self);
        }

        let part = parts[depth];
        self.children
            .iter()
            .filter(|child| child.part == part || child.is_wild)
            .find_map(|child| child.search(parts, depth + 1))
    }
}
