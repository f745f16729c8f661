//! Lightweight read-only DOM for the parsed document.
//!
//! The structuring service emits a TEI-like tree (`teiHeader`, `text`,
//! `body`, `div`, `head`, `p`, `figure`, `table`, `facsimile`, `zone`).
//! Everything downstream operates on this arena: nodes are allocated
//! once during parsing and addressed by [`NodeId`], and the tree is
//! never mutated afterwards, so a single document can be shared freely
//! across threads.
//!
//! Namespaces are deliberately erased: elements and attributes are
//! matched by local name only, which tolerates inputs with a default
//! namespace, a `tei:` prefix, or no namespace at all.

use crate::util::norm_ws;

/// Index of a node in the document arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// The synthetic document root. Its children are the top-level
    /// elements of the input (normally a single `TEI` element).
    pub const ROOT: NodeId = NodeId(0);

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn new(index: usize) -> NodeId {
        NodeId(index as u32)
    }
}

/// A single node: an element with attributes, or a run of text.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Element with its local name and (local-name, value) attributes.
    Element { name: String, attrs: Vec<(String, String)> },
    /// Character data, exactly as found in the document.
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    /// Local element name, or `None` for text nodes.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { name, .. } => Some(name),
            NodeKind::Text(_) => None,
        }
    }
}

/// A parsed document.
#[derive(Debug, Clone)]
pub struct Tei {
    pub(crate) nodes: Vec<Node>,
}

impl Tei {
    pub(crate) fn with_root() -> Tei {
        Tei {
            nodes: vec![Node {
                kind: NodeKind::Element { name: String::new(), attrs: Vec::new() },
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Local name of an element node, `None` for text nodes.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.node(id).name()
    }

    /// Attribute value by local attribute name (`xml:id` matches `id`).
    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id).children.iter().copied()
    }

    /// Direct element children with the given local name.
    pub fn children_named<'a>(
        &'a self,
        id: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id)
            .filter(move |&c| self.name(c) == Some(name))
    }

    /// First direct element child with the given local name.
    pub fn child_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children_named(id, name).next()
    }

    /// All descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.node(id).children.clone();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// Descendant elements with the given local name, in document order.
    pub fn descendants_named<'a>(
        &'a self,
        id: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.descendants(id)
            .filter(move |&d| self.name(d) == Some(name))
    }

    /// First descendant element with the given local name.
    pub fn first_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.descendants_named(id, name).next()
    }

    /// Walk a chain of descendant names: each step finds the first
    /// matching descendant of the previous node.
    pub fn find(&self, id: NodeId, path: &[&str]) -> Option<NodeId> {
        let mut cur = id;
        for name in path {
            cur = self.first_named(cur, name)?;
        }
        Some(cur)
    }

    /// Nearest ancestor element with the given local name.
    pub fn ancestor_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        let mut cur = self.node(id).parent;
        while let Some(p) = cur {
            if self.name(p) == Some(name) {
                return Some(p);
            }
            cur = self.node(p).parent;
        }
        None
    }

    /// Concatenated text of the subtree, whitespace-collapsed.
    ///
    /// Equivalent to joining every text descendant in document order and
    /// normalizing the result.
    pub fn text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.raw_text_into(id, &mut out);
        norm_ws(&out)
    }

    fn raw_text_into(&self, id: NodeId, out: &mut String) {
        match &self.node(id).kind {
            NodeKind::Text(t) => out.push_str(t),
            NodeKind::Element { .. } => {
                for child in self.children(id) {
                    self.raw_text_into(child, out);
                }
            }
        }
    }

    /// Like [`text`](Self::text) but skips any descendant subtree for
    /// which `skip` returns true. Used by the cleaner to drop citation
    /// markers and nested headings without mutating the tree.
    pub fn text_filtered<F>(&self, id: NodeId, skip: &F) -> String
    where
        F: Fn(&Tei, NodeId) -> bool,
    {
        let mut out = String::new();
        self.filtered_text_into(id, skip, &mut out);
        norm_ws(&out)
    }

    fn filtered_text_into<F>(&self, id: NodeId, skip: &F, out: &mut String)
    where
        F: Fn(&Tei, NodeId) -> bool,
    {
        match &self.node(id).kind {
            NodeKind::Text(t) => out.push_str(t),
            NodeKind::Element { .. } => {
                for child in self.children(id) {
                    if !skip(self, child) {
                        self.filtered_text_into(child, skip, out);
                    }
                }
            }
        }
    }
}

/// Pre-order iterator over a subtree.
pub struct Descendants<'a> {
    doc: &'a Tei,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        let children = &self.doc.node(id).children;
        self.stack.extend(children.iter().rev().copied());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use crate::Tei;
    use super::NodeId;

    const SAMPLE: &str = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0">
        <text><body>
            <div type="intro"><head>Introduction</head><p>First <ref type="bibr">[1]</ref> paragraph.</p></div>
            <div><head>Methods</head><p>Second paragraph.</p></div>
        </body></text>
    </TEI>"#;

    #[test]
    fn test_local_name_matching_ignores_namespace() {
        let doc = Tei::parse(SAMPLE).unwrap();
        let body = doc.first_named(NodeId::ROOT, "body").unwrap();
        assert_eq!(doc.descendants_named(body, "div").count(), 2);
    }

    #[test]
    fn test_attr_lookup() {
        let doc = Tei::parse(SAMPLE).unwrap();
        let div = doc.first_named(NodeId::ROOT, "div").unwrap();
        assert_eq!(doc.attr(div, "type"), Some("intro"));
        assert_eq!(doc.attr(div, "missing"), None);
    }

    #[test]
    fn test_text_preserves_inline_boundaries() {
        let doc = Tei::parse(SAMPLE).unwrap();
        let p = doc.first_named(NodeId::ROOT, "p").unwrap();
        assert_eq!(doc.text(p), "First [1] paragraph.");
    }

    #[test]
    fn test_text_filtered_skips_subtrees() {
        let doc = Tei::parse(SAMPLE).unwrap();
        let div = doc.first_named(NodeId::ROOT, "div").unwrap();
        let text = doc.text_filtered(div, &|d, n| {
            d.name(n) == Some("head") || d.name(n) == Some("ref")
        });
        assert_eq!(text, "First paragraph.");
    }

    #[test]
    fn test_find_path() {
        let doc = Tei::parse(SAMPLE).unwrap();
        let head = doc.find(NodeId::ROOT, &["body", "div", "head"]).unwrap();
        assert_eq!(doc.text(head), "Introduction");
    }
}
