pub mod client;
pub mod code;
pub mod collection;
pub mod java;
pub mod server;

use std::collections::BTreeMap;

/// Rendered files of one target, keyed by path relative to the archive root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputTree {
    files: BTreeMap<String, String>,
}

impl OutputTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<String>, contents: impl Into<String>) {
        self.files.insert(path.into(), contents.into());
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// `(path, contents)` in sorted path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_sorted() {
        let mut tree = OutputTree::new();
        tree.add("b/z.txt", "z");
        tree.add("a/y.txt", "y");
        tree.add("b/a.txt", "a");
        assert_eq!(tree.paths().collect::<Vec<_>>(), vec!["a/y.txt", "b/a.txt", "b/z.txt"]);
        assert_eq!(tree.get("b/z.txt"), Some("z"));
    }
}
