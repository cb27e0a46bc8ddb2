//! Structured source builder.

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Line(String),
    Blank,
    Block(Block),
}

impl Node {
    /// Head of this node if it is a block, for structural assertions.
    pub fn head(&self) -> Option<&str> {
        match self {
            Node::Block(b) => Some(&b.head),
            _ => None,
        }
    }
}

impl From<Block> for Node {
    fn from(b: Block) -> Self {
        Node::Block(b)
    }
}

pub fn line(s: impl Into<String>) -> Node {
    Node::Line(s.into())
}

/// `head` on its own line, the body one level deeper, then `tail`.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub head: String,
    pub body: Vec<Node>,
    pub tail: String,
}

impl Block {
    /// A `{ ... }` block: `head` should end with the opening brace.
    pub fn new(head: impl Into<String>) -> Self {
        Self::with_tail(head, "}")
    }

    pub fn with_tail(head: impl Into<String>, tail: impl Into<String>) -> Self {
        Self {
            head: head.into(),
            body: Vec::new(),
            tail: tail.into(),
        }
    }

    pub fn line(mut self, s: impl Into<String>) -> Self {
        self.body.push(Node::Line(s.into()));
        self
    }

    pub fn lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.body.extend(lines.into_iter().map(|s| Node::Line(s.into())));
        self
    }

    pub fn blank(mut self) -> Self {
        self.body.push(Node::Blank);
        self
    }

    pub fn block(mut self, block: Block) -> Self {
        self.body.push(Node::Block(block));
        self
    }

    pub fn nodes(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.body.extend(nodes);
        self
    }

    pub fn push(&mut self, node: impl Into<Node>) {
        self.body.push(node.into());
    }

    /// First nested block whose head starts with `prefix`, depth first.
    pub fn find(&self, prefix: &str) -> Option<&Block> {
        for node in &self.body {
            if let Node::Block(b) = node {
                if b.head.starts_with(prefix) {
                    return Some(b);
                }
                if let Some(found) = b.find(prefix) {
                    return Some(found);
                }
            }
        }
        None
    }

    pub fn contains_line(&self, needle: &str) -> bool {
        self.body.iter().any(|node| match node {
            Node::Line(l) => l.contains(needle),
            Node::Block(b) => b.head.contains(needle) || b.contains_line(needle),
            Node::Blank => false,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    indent: &'static str,
}

impl Default for Renderer {
    fn default() -> Self {
        Self { indent: "    " }
    }
}

impl Renderer {
    pub fn new(indent: &'static str) -> Self {
        Self { indent }
    }

    pub fn render(&self, nodes: &[Node]) -> String {
        let mut out = String::new();
        for node in nodes {
            self.render_node(node, 0, &mut out);
        }
        out
    }

    fn render_node(&self, node: &Node, depth: usize, out: &mut String) {
        match node {
            Node::Line(text) => self.push_line(text, depth, out),
            Node::Blank => out.push('\n'),
            Node::Block(block) => {
                self.push_line(&block.head, depth, out);
                for child in &block.body {
                    self.render_node(child, depth + 1, out);
                }
                if !block.tail.is_empty() {
                    self.push_line(&block.tail, depth, out);
                }
            }
        }
    }

    fn push_line(&self, text: &str, depth: usize, out: &mut String) {
        for _ in 0..depth {
            out.push_str(self.indent);
        }
        out.push_str(text);
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_nested_blocks() {
        let nodes = vec![
            line("class A {"),
            Node::Block(
                Block::new("void run() {")
                    .line("call();")
                    .block(Block::new("if (x) {").line("y();")),
            ),
            Node::Blank,
            line("}"),
        ];
        let out = Renderer::new("  ").render(&nodes);
        assert_eq!(out, "class A {\nvoid run() {\n  call();\n  if (x) {\n    y();\n  }\n}\n\n}\n");
    }

    #[test]
    fn test_find_and_contains() {
        let block = Block::new("class A {")
            .block(Block::new("void run() {").block(Block::with_tail("return Foo(", ");").line("x: 1,")));
        assert_eq!(block.find("return Foo(").map(|b| b.tail.as_str()), Some(");"));
        assert!(block.contains_line("x: 1"));
        assert!(!block.contains_line("y: 2"));
    }
}
