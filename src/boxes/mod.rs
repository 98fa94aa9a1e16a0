//! # Box Generation
//!
//! Turns the document tree into the box tree that layout consumes. Boxes
//! live in an arena and refer to their children by [`BoxId`], so layout can
//! hand out skip stacks and placeholder references as plain indices and
//! never aliases or mutates the input.
//!
//! Box generation also pre-builds the boxes that only exist for layout: the
//! anonymous column box of every multi-column container, the line box of
//! every text node, and one template box per `@page` margin box rule.

use crate::model::{
    ColumnDef, ContentItem, Document, MarginSlot, Node, NodeKind, PageRule, PageRules,
};
use crate::style::{BreakValue, ComputedStyle, Display};
use serde::Serialize;
use std::collections::HashMap;

/// Index of a box in its [`BoxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BoxId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum BoxKind {
    /// Block container.
    Block,
    /// The single line box of a text block. Its content is resolved at
    /// layout time because it may contain page-based counters.
    Line { items: Vec<ContentItem> },
    /// Block-level replaced box with an intrinsic size.
    Replaced { width: f64, height: f64 },
    Table { columns: Vec<ColumnDef> },
    TableRow { is_header: bool },
    TableCell { col_span: u32 },
    /// Flex container.
    Flex,
}

#[derive(Debug, Clone)]
pub struct BoxNode {
    pub kind: BoxKind,
    pub style: ComputedStyle,
    pub children: Vec<BoxId>,
    /// Anchor name of the generating element.
    pub anchor: Option<String>,
    pub is_for_root: bool,
    pub is_flex_item: bool,
    /// Start and end page values, for named page breaks.
    pub page_start: String,
    pub page_end: String,
    /// The anonymous column box of a multi-column container. It shares the
    /// container's children.
    pub column_box: Option<BoxId>,
}

/// Which `@page` rule a margin box template comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageSelector {
    Default,
    First,
    Left,
    Right,
    Blank,
    Named(String),
}

/// The arena of all boxes generated for a document.
#[derive(Debug, Clone)]
pub struct BoxTree {
    nodes: Vec<BoxNode>,
    root: BoxId,
    anchors: HashMap<String, BoxId>,
    margin_templates: HashMap<(PageSelector, MarginSlot), BoxId>,
}

impl BoxTree {
    /// Generate the box tree of `document`.
    pub fn build(document: &Document) -> BoxTree {
        let mut tree = BoxTree {
            nodes: Vec::new(),
            root: BoxId(0),
            anchors: HashMap::new(),
            margin_templates: HashMap::new(),
        };
        let root_style = document.style.compute(None);
        let kind = match root_style.display {
            Display::Flex => BoxKind::Flex,
            _ => BoxKind::Block,
        };
        let is_flex = kind == BoxKind::Flex;
        let children = document
            .children
            .iter()
            .filter_map(|child| tree.build_node(child, &root_style, is_flex))
            .collect();
        let root = tree.push(kind, root_style.clone(), children, None);
        tree.nodes[root.0].is_for_root = true;
        tree.finish_box(root);
        tree.root = root;

        tree.build_margin_templates(&document.pages, &root_style);
        tree
    }

    pub fn root(&self) -> BoxId {
        self.root
    }

    pub fn node(&self, id: BoxId) -> &BoxNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The box generated by the element with this anchor name.
    pub fn anchor(&self, name: &str) -> Option<BoxId> {
        self.anchors.get(name).copied()
    }

    pub fn margin_template(&self, selector: &PageSelector, slot: MarginSlot) -> Option<BoxId> {
        self.margin_templates.get(&(selector.clone(), slot)).copied()
    }

    /// Ids of the document's line boxes holding page-based content. Margin
    /// box templates are built after the root and are not included.
    pub fn page_based_lines(&self) -> impl Iterator<Item = BoxId> + '_ {
        let content = self.root.0 + 1;
        self.nodes[..content].iter().enumerate().filter_map(|(i, node)| match &node.kind {
            BoxKind::Line { items } if items.iter().any(ContentItem::is_page_based) => {
                Some(BoxId(i))
            }
            _ => None,
        })
    }

    /// Static text of a box: the literal text of its line boxes, in order.
    pub fn text_content(&self, id: BoxId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: BoxId, out: &mut String) {
        let node = self.node(id);
        if let BoxKind::Line { items } = &node.kind {
            for item in items {
                if let ContentItem::Text(text) = item {
                    out.push_str(text);
                }
            }
        }
        for &child in &node.children {
            self.collect_text(child, out);
        }
    }

    fn push(
        &mut self,
        kind: BoxKind,
        style: ComputedStyle,
        children: Vec<BoxId>,
        anchor: Option<String>,
    ) -> BoxId {
        let id = BoxId(self.nodes.len());
        self.nodes.push(BoxNode {
            kind,
            style,
            children,
            anchor,
            is_for_root: false,
            is_flex_item: false,
            page_start: String::new(),
            page_end: String::new(),
            column_box: None,
        });
        id
    }

    fn build_node(&mut self, node: &Node, parent: &ComputedStyle, parent_is_flex: bool) -> Option<BoxId> {
        let mut style = node.style.compute(Some(parent));
        if style.display == Display::None {
            return None;
        }

        let (kind, children) = match &node.kind {
            NodeKind::View => {
                let kind = if style.display == Display::Flex {
                    BoxKind::Flex
                } else {
                    BoxKind::Block
                };
                let is_flex = kind == BoxKind::Flex;
                let children = node
                    .children
                    .iter()
                    .filter_map(|child| self.build_node(child, &style, is_flex))
                    .collect();
                (kind, children)
            }
            NodeKind::Text { content, items } => {
                let items = if items.is_empty() {
                    vec![ContentItem::Text(content.clone())]
                } else {
                    items.clone()
                };
                let line_style = ComputedStyle::anonymous_from(&style);
                let line = self.push(BoxKind::Line { items }, line_style, vec![], None);
                self.finish_box(line);
                (BoxKind::Block, vec![line])
            }
            NodeKind::Image { width, height } => (
                BoxKind::Replaced {
                    width: *width,
                    height: *height,
                },
                vec![],
            ),
            NodeKind::Table { columns } => {
                let children = node
                    .children
                    .iter()
                    .filter_map(|child| self.build_node(child, &style, false))
                    .collect();
                (
                    BoxKind::Table {
                        columns: columns.clone(),
                    },
                    children,
                )
            }
            NodeKind::TableRow { is_header } => {
                let children = node
                    .children
                    .iter()
                    .filter_map(|child| self.build_node(child, &style, false))
                    .collect();
                (
                    BoxKind::TableRow {
                        is_header: *is_header,
                    },
                    children,
                )
            }
            NodeKind::TableCell { col_span } => {
                let children = node
                    .children
                    .iter()
                    .filter_map(|child| self.build_node(child, &style, false))
                    .collect();
                (
                    BoxKind::TableCell {
                        col_span: (*col_span).max(1),
                    },
                    children,
                )
            }
            NodeKind::PageBreak => {
                style.break_before = BreakValue::Page;
                (BoxKind::Block, vec![])
            }
        };

        let id = self.push(kind, style, children, node.id.clone());
        if parent_is_flex {
            let in_flow = self.nodes[id.0].style.is_in_normal_flow();
            self.nodes[id.0].is_flex_item = in_flow;
        }
        if let Some(anchor) = &node.id {
            self.anchors.entry(anchor.clone()).or_insert(id);
        }
        self.finish_box(id);
        Some(id)
    }

    /// Compute page values and the column box once children exist.
    fn finish_box(&mut self, id: BoxId) {
        let own = self.nodes[id.0].style.page.clone().unwrap_or_default();
        let (start, end) = {
            let children = &self.nodes[id.0].children;
            let start = children
                .first()
                .map(|c| self.nodes[c.0].page_start.clone())
                .unwrap_or_else(|| own.clone());
            let end = children
                .last()
                .map(|c| self.nodes[c.0].page_end.clone())
                .unwrap_or(own);
            (start, end)
        };
        self.nodes[id.0].page_start = start;
        self.nodes[id.0].page_end = end;

        let node = &self.nodes[id.0];
        if node.kind == BoxKind::Block && node.style.is_multicol() {
            let style = ComputedStyle::anonymous_from(&node.style);
            let children = node.children.clone();
            let (page_start, page_end) = (node.page_start.clone(), node.page_end.clone());
            let column = self.push(BoxKind::Block, style, children, None);
            self.nodes[column.0].page_start = page_start;
            self.nodes[column.0].page_end = page_end;
            self.nodes[id.0].column_box = Some(column);
        }
    }

    fn build_margin_templates(&mut self, rules: &PageRules, root_style: &ComputedStyle) {
        let mut sources: Vec<(PageSelector, &PageRule)> = vec![(PageSelector::Default, &rules.default)];
        for (selector, rule) in [
            (PageSelector::First, &rules.first),
            (PageSelector::Left, &rules.left),
            (PageSelector::Right, &rules.right),
            (PageSelector::Blank, &rules.blank),
        ] {
            if let Some(rule) = rule {
                sources.push((selector, rule));
            }
        }
        for (name, rule) in &rules.named {
            sources.push((PageSelector::Named(name.clone()), rule));
        }

        for (selector, rule) in sources {
            for margin_box in &rule.margin_boxes {
                let style = margin_box.style.compute(Some(root_style));
                let items: Vec<ContentItem> = margin_box
                    .content
                    .iter()
                    .filter(|item| !matches!(item, ContentItem::Element { .. }))
                    .cloned()
                    .collect();
                let mut children = Vec::new();
                if !items.is_empty() {
                    let line_style = ComputedStyle::anonymous_from(&style);
                    let line = self.push(BoxKind::Line { items }, line_style, vec![], None);
                    children.push(line);
                }
                let template = self.push(BoxKind::Block, style, children, None);
                self.margin_templates
                    .insert((selector.clone(), margin_box.slot), template);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MarginBoxRule, StringKeyword};
    use crate::style::{Display, Position, Style};

    fn make_text(content: &str) -> Node {
        Node::text(content, Style::default())
    }

    #[test]
    fn text_becomes_block_with_one_line() {
        let doc = Document::new(vec![make_text("Hello world")]);
        let tree = BoxTree::build(&doc);
        let root = tree.node(tree.root());
        assert!(root.is_for_root);
        assert_eq!(root.children.len(), 1);
        let text = tree.node(root.children[0]);
        assert_eq!(text.kind, BoxKind::Block);
        assert_eq!(text.children.len(), 1);
        assert!(matches!(tree.node(text.children[0]).kind, BoxKind::Line { .. }));
        assert_eq!(tree.text_content(root.children[0]), "Hello world");
    }

    #[test]
    fn display_none_generates_nothing() {
        let hidden = Node::view(
            Style {
                display: Some(Display::None),
                ..Default::default()
            },
            vec![make_text("invisible")],
        );
        let doc = Document::new(vec![hidden, make_text("visible")]);
        let tree = BoxTree::build(&doc);
        assert_eq!(tree.node(tree.root()).children.len(), 1);
    }

    #[test]
    fn page_break_forces_break_before() {
        let doc = Document::new(vec![make_text("a"), Node::page_break(), make_text("b")]);
        let tree = BoxTree::build(&doc);
        let children = &tree.node(tree.root()).children;
        assert_eq!(tree.node(children[1]).style.break_before, BreakValue::Page);
    }

    #[test]
    fn flex_children_are_flex_items_unless_out_of_flow() {
        let flex = Node::view(
            Style {
                display: Some(Display::Flex),
                ..Default::default()
            },
            vec![
                make_text("a"),
                Node::view(
                    Style {
                        position: Some(Position::Absolute),
                        ..Default::default()
                    },
                    vec![],
                ),
            ],
        );
        let tree = BoxTree::build(&Document::new(vec![flex]));
        let flex_id = tree.node(tree.root()).children[0];
        assert_eq!(tree.node(flex_id).kind, BoxKind::Flex);
        let items = &tree.node(flex_id).children;
        assert!(tree.node(items[0]).is_flex_item);
        assert!(!tree.node(items[1]).is_flex_item);
    }

    #[test]
    fn page_values_come_from_first_and_last_descendants() {
        let named = |name: &str| Style {
            page: Some(name.to_string()),
            ..Default::default()
        };
        let section = Node::view(
            Style::default(),
            vec![
                Node::text("cover", named("cover")),
                Node::text("body", Style::default()),
                Node::text("index", named("index")),
            ],
        );
        let tree = BoxTree::build(&Document::new(vec![section]));
        let section = tree.node(tree.node(tree.root()).children[0]);
        assert_eq!(section.page_start, "cover");
        assert_eq!(section.page_end, "index");
    }

    #[test]
    fn multicol_boxes_get_a_column_box() {
        let multicol = Node::view(
            Style {
                column_count: Some(2),
                orphans: Some(3),
                ..Default::default()
            },
            vec![make_text("a"), make_text("b")],
        );
        let tree = BoxTree::build(&Document::new(vec![multicol]));
        let id = tree.node(tree.root()).children[0];
        let column = tree.node(id).column_box.expect("column box");
        assert_eq!(tree.node(column).children, tree.node(id).children);
        assert!(!tree.node(column).style.is_multicol());
        assert_eq!(tree.node(column).style.orphans, 3);
    }

    #[test]
    fn margin_templates_keep_text_and_drop_elements() {
        let mut doc = Document::new(vec![]);
        doc.pages.default.margin_boxes.push(MarginBoxRule {
            slot: MarginSlot::BottomCenter,
            content: vec![
                ContentItem::Counter {
                    counter: "page".to_string(),
                },
                ContentItem::Element {
                    element: "header".to_string(),
                    keyword: StringKeyword::First,
                },
            ],
            style: Style::default(),
        });
        let tree = BoxTree::build(&doc);
        let template = tree
            .margin_template(&PageSelector::Default, MarginSlot::BottomCenter)
            .unwrap();
        assert_eq!(tree.node(template).children.len(), 1);
        assert_eq!(tree.page_based_lines().count(), 0);
        assert!(tree
            .margin_template(&PageSelector::First, MarginSlot::BottomCenter)
            .is_none());
    }
}
