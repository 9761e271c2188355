use std::collections::HashSet;
use std::fmt::Write;

use scraper::Node;

use crate::parse::{Document, Element};

/// Elements serialized without a closing tag.
const VOID_TAGS: &[&str] =
    &["area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr"];

/// Elements never carried into rendered content.
const NEVER_RENDERED: &[&str] = &["script", "style", "noscript", "template"];

/// Which nodes to leave out or flatten when rendering a subtree
#[derive(Debug, Clone, Default)]
pub struct RenderPlan {
    /// Nodes dropped together with their subtree
    pub skip: HashSet<usize>,
    /// Nodes whose tags are dropped but whose children are kept
    pub unwrap: HashSet<usize>,
}

/// A node in the DOM tree representing an element
#[derive(Debug, Clone)]
pub struct DomNode<'a> {
    /// The element itself
    pub element: Element<'a>,
    /// Lowercase tag name
    pub tag_name: String,
    /// Parent node ID (if any)
    pub parent_id: Option<usize>,
    /// Child node IDs in document order
    pub child_ids: Vec<usize>,
}

/// Element arena over a parsed document
///
/// Node IDs are assigned in pre-order starting from `<body>`, so a node's
/// descendants always have larger IDs than the node itself and the scoring
/// passes can walk parents and children without re-querying the document.
#[derive(Debug, Clone)]
pub struct DomTree<'a> {
    nodes: Vec<DomNode<'a>>,
}

impl<'a> DomTree<'a> {
    /// Build the arena from the document body.
    pub fn build(doc: &'a Document) -> Self {
        Self::build_from(doc.body())
    }

    /// Build the arena rooted at an arbitrary element.
    pub fn build_from(root: Element<'a>) -> Self {
        let mut nodes: Vec<DomNode<'a>> = Vec::new();
        let mut stack: Vec<(Element<'a>, Option<usize>)> = vec![(root, None)];

        while let Some((element, parent_id)) = stack.pop() {
            let node_id = nodes.len();
            nodes.push(DomNode { element, tag_name: element.tag_name(), parent_id, child_ids: Vec::new() });

            if let Some(parent) = parent_id.and_then(|id| nodes.get_mut(id)) {
                parent.child_ids.push(node_id);
            }

            let children: Vec<Element<'a>> = element.children().collect();
            stack.extend(children.into_iter().rev().map(|child| (child, Some(node_id))));
        }

        Self { nodes }
    }

    /// Get a node by ID
    pub fn get_node(&self, id: usize) -> Option<&DomNode<'a>> {
        self.nodes.get(id)
    }

    /// Get the parent of a node
    pub fn get_parent(&self, node_id: usize) -> Option<&DomNode<'a>> {
        let parent_id = self.nodes.get(node_id)?.parent_id?;
        self.nodes.get(parent_id)
    }

    /// IDs of the ancestors of a node, nearest first
    pub fn ancestor_ids(&self, node_id: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.nodes.get(node_id).and_then(|n| n.parent_id), |id| {
            self.nodes.get(*id).and_then(|n| n.parent_id)
        })
    }

    /// IDs of every descendant of a node in document order
    pub fn descendant_ids(&self, node_id: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = match self.nodes.get(node_id) {
            Some(node) => node.child_ids.iter().rev().copied().collect(),
            None => return out,
        };

        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(node) = self.nodes.get(id) {
                stack.extend(node.child_ids.iter().rev().copied());
            }
        }

        out
    }

    /// Node IDs in pre-order
    pub fn ids(&self) -> std::ops::Range<usize> {
        0..self.nodes.len()
    }

    /// Get the total number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Serialize a node and its subtree according to `plan`.
    ///
    /// Scripts, styles and comments are dropped; text outside `<pre>` has its
    /// whitespace runs collapsed.
    pub fn render(&self, node_id: usize, plan: &RenderPlan) -> String {
        let mut out = String::new();
        self.render_into(node_id, plan, false, &mut out);
        out
    }

    fn render_into(&self, node_id: usize, plan: &RenderPlan, in_pre: bool, out: &mut String) {
        let Some(node) = self.nodes.get(node_id) else { return };
        if plan.skip.contains(&node_id) || NEVER_RENDERED.contains(&node.tag_name.as_str()) {
            return;
        }

        let element = node.element.element_ref();
        let keep_tag = !plan.unwrap.contains(&node_id);
        if keep_tag {
            out.push('<');
            out.push_str(&node.tag_name);
            for (name, value) in element.value().attrs() {
                let _ = write!(out, " {}=\"{}\"", name, escape(value, true));
            }
            out.push('>');

            if VOID_TAGS.contains(&node.tag_name.as_str()) {
                return;
            }
        }

        let in_pre = in_pre || node.tag_name == "pre";
        let mut child_ids = node.child_ids.iter();
        for child in element.children() {
            match child.value() {
                Node::Text(text) => {
                    if in_pre {
                        out.push_str(&escape(text, false));
                    } else {
                        out.push_str(&escape(&collapse_whitespace(text), false));
                    }
                }
                Node::Element(_) => {
                    if let Some(child_id) = child_ids.next() {
                        self.render_into(*child_id, plan, in_pre, out);
                    }
                }
                _ => {}
            }
        }

        if keep_tag {
            let _ = write!(out, "</{}>", node.tag_name);
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_dom_tree() {
        let html = r#"
            <div class="container">
                <article class="post">
                    <p>Test paragraph</p>
                </article>
            </div>
        "#;

        let doc = Document::parse(html).unwrap();
        let tree = DomTree::build(&doc);
        let tags: Vec<&str> = tree.ids().map(|id| tree.get_node(id).unwrap().tag_name.as_str()).collect();
        assert_eq!(tags, vec!["body", "div", "article", "p"]);
    }

    #[test]
    fn test_parent_child_relationships() {
        let html = r#"
            <div class="parent">
                <p>First</p>
                <p>Second</p>
            </div>
            <p>Outside</p>
        "#;

        let doc = Document::parse(html).unwrap();
        let tree = DomTree::build(&doc);

        let div = tree.get_node(1).unwrap();
        assert_eq!(div.tag_name, "div");
        assert_eq!(div.child_ids, vec![2, 3]);
        assert_eq!(tree.get_parent(3).unwrap().tag_name, "div");
        assert_eq!(tree.get_parent(4).unwrap().tag_name, "body");
        assert_eq!(tree.ancestor_ids(2).collect::<Vec<_>>(), vec![1, 0]);
        assert_eq!(tree.descendant_ids(0), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_render_skips_nodes_and_escapes() {
        let html = r#"<div id="root"><p title="a &quot;b&quot;">Fish &amp; chips</p><aside>skip me</aside><script>x()</script></div>"#;
        let doc = Document::parse(html).unwrap();
        let tree = DomTree::build(&doc);

        let plan = RenderPlan { skip: [3].into_iter().collect(), ..Default::default() };
        let rendered = tree.render(1, &plan);
        assert_eq!(rendered, r#"<div id="root"><p title="a &quot;b&quot;">Fish &amp; chips</p></div>"#);
    }

    #[test]
    fn test_render_preserves_pre_whitespace() {
        let html = "<div><p>a   b\n c</p><pre>fn main() {\n    run();\n}</pre><br></div>";
        let doc = Document::parse(html).unwrap();
        let tree = DomTree::build(&doc);

        let rendered = tree.render(1, &RenderPlan::default());
        assert!(rendered.contains("<p>a b c</p>"));
        assert!(rendered.contains("<pre>fn main() {\n    run();\n}</pre>"));
        assert!(rendered.contains("<br>"));
        assert!(!rendered.contains("</br>"));
    }

    #[test]
    fn test_render_unwraps_wrappers() {
        let doc = Document::parse("<div><div class=\"inner\"><p>Body</p></div></div>").unwrap();
        let tree = DomTree::build(&doc);

        let plan = RenderPlan { unwrap: [2].into_iter().collect(), ..Default::default() };
        assert_eq!(tree.render(1, &plan), "<div><p>Body</p></div>");
    }
}
