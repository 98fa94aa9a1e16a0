//! # Document Model
//!
//! The input representation for the layout engine. A document is a tree of
//! nodes, each with a type, style properties, and children, plus the `@page`
//! rules that describe the page boxes the tree is fragmented into.
//!
//! The model is intentionally close to the DOM mental model: containers
//! (View), text (Text), replaced content (Image), and tables. Pages are
//! *not* nodes: they are produced by layout from the page rules.

use crate::error::QuireError;
use crate::style::Style;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A complete document ready for layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// The children of the root element.
    pub children: Vec<Node>,

    /// Style of the root element.
    #[serde(default)]
    pub style: Style,

    /// `@page` rules: default, selectors, and named pages.
    #[serde(default)]
    pub pages: PageRules,

    /// Limits and metrics used by layout.
    #[serde(default)]
    pub config: LayoutConfig,
}

/// Tuning knobs for the layout passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    /// Maximum number of whole-document repagination passes.
    pub max_loops: usize,
    /// Maximum number of height-growing passes when balancing one column run.
    pub max_column_passes: usize,
    /// Advance width of one character, as a fraction of the font size.
    pub char_width: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_loops: 8,
            max_column_passes: 256,
            char_width: 0.5,
        }
    }
}

/// The `@page` rules of a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRules {
    /// `@page` without selector.
    #[serde(default)]
    pub default: PageRule,
    /// `@page :first`
    #[serde(default)]
    pub first: Option<PageRule>,
    /// `@page :left`
    #[serde(default)]
    pub left: Option<PageRule>,
    /// `@page :right`
    #[serde(default)]
    pub right: Option<PageRule>,
    /// `@page :blank`
    #[serde(default)]
    pub blank: Option<PageRule>,
    /// `@page <name>`, selected by the `page` property.
    #[serde(default)]
    pub named: BTreeMap<String, PageRule>,
}

/// One `@page` rule. Absent values fall through to less specific rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRule {
    #[serde(default)]
    pub size: Option<PageSize>,
    /// Page margins in points (1/72 inch).
    #[serde(default)]
    pub margin: Option<Edges>,
    #[serde(default)]
    pub margin_boxes: Vec<MarginBoxRule>,
    #[serde(default)]
    pub counter_reset: Vec<CounterChange>,
    #[serde(default)]
    pub counter_set: Vec<CounterChange>,
    #[serde(default)]
    pub counter_increment: Vec<CounterChange>,
}

impl PageRule {
    /// Cascade `other` over `self`: every value `other` sets wins.
    pub fn merge(&mut self, other: &PageRule) {
        if other.size.is_some() {
            self.size = other.size;
        }
        if other.margin.is_some() {
            self.margin = other.margin;
        }
        for rule in &other.margin_boxes {
            self.margin_boxes.retain(|existing| existing.slot != rule.slot);
            self.margin_boxes.push(rule.clone());
        }
        if !other.counter_reset.is_empty() {
            self.counter_reset = other.counter_reset.clone();
        }
        if !other.counter_set.is_empty() {
            self.counter_set = other.counter_set.clone();
        }
        if !other.counter_increment.is_empty() {
            self.counter_increment = other.counter_increment.clone();
        }
    }

    pub fn margin_box(&self, slot: MarginSlot) -> Option<&MarginBoxRule> {
        self.margin_boxes.iter().find(|rule| rule.slot == slot)
    }
}

/// A `counter-reset`, `counter-set` or `counter-increment` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterChange {
    pub name: String,
    /// Defaults to 0 for resets and sets, 1 for increments.
    #[serde(default)]
    pub value: Option<i64>,
}

/// A page-margin box declared inside an `@page` rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginBoxRule {
    pub slot: MarginSlot,
    /// Generated content. An empty list means `content: none`.
    #[serde(default)]
    pub content: Vec<ContentItem>,
    #[serde(default)]
    pub style: Style,
}

/// The sixteen page-margin boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarginSlot {
    TopLeftCorner,
    TopLeft,
    TopCenter,
    TopRight,
    TopRightCorner,
    BottomLeftCorner,
    BottomLeft,
    BottomCenter,
    BottomRight,
    BottomRightCorner,
    LeftTop,
    LeftMiddle,
    LeftBottom,
    RightTop,
    RightMiddle,
    RightBottom,
}

impl MarginSlot {
    pub const ALL: [MarginSlot; 16] = [
        MarginSlot::TopLeftCorner,
        MarginSlot::TopLeft,
        MarginSlot::TopCenter,
        MarginSlot::TopRight,
        MarginSlot::TopRightCorner,
        MarginSlot::BottomLeftCorner,
        MarginSlot::BottomLeft,
        MarginSlot::BottomCenter,
        MarginSlot::BottomRight,
        MarginSlot::BottomRightCorner,
        MarginSlot::LeftTop,
        MarginSlot::LeftMiddle,
        MarginSlot::LeftBottom,
        MarginSlot::RightTop,
        MarginSlot::RightMiddle,
        MarginSlot::RightBottom,
    ];
}

/// One piece of generated or text content.
///
/// Variants are matched structurally, so `{"target": …, "counter": …}` must
/// be tried before `{"counter": …}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentItem {
    /// Literal text.
    Text(String),
    /// `target-counter(<anchor>, <counter>)`
    TargetCounter { target: String, counter: String },
    /// `counter(<counter>)`; `page` and `pages` are page-based.
    Counter { counter: String },
    /// `string(<name>, <keyword>)`, only meaningful in margin boxes.
    StringRef {
        string: String,
        #[serde(default)]
        keyword: StringKeyword,
    },
    /// `element(<name>, <keyword>)`, only meaningful in margin boxes.
    Element {
        element: String,
        #[serde(default)]
        keyword: StringKeyword,
    },
}

impl ContentItem {
    /// Whether this item depends on the page the content lands on.
    pub fn is_page_based(&self) -> bool {
        match self {
            ContentItem::Counter { counter } => counter == "page" || counter == "pages",
            ContentItem::TargetCounter { .. } => true,
            _ => false,
        }
    }
}

/// Which assignment of a named string or running element a margin box uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StringKeyword {
    #[default]
    First,
    Start,
    Last,
    FirstExcept,
}

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::A3 => (841.89, 1190.55),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Tabloid => (792.0, 1224.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

/// Edge values (top, right, bottom, left) in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn symmetric(vertical: f64, horizontal: f64) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

/// A node in the document tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// What kind of node this is.
    pub kind: NodeKind,

    /// Style properties for this node.
    #[serde(default)]
    pub style: Style,

    /// Child nodes.
    #[serde(default)]
    pub children: Vec<Node>,

    /// Anchor name, the target of `target-counter()`.
    #[serde(default)]
    pub id: Option<String>,
}

/// The different kinds of nodes in the document tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    /// A generic container, analogous to a <div>.
    View,

    /// A paragraph of text.
    Text {
        #[serde(default)]
        content: String,
        /// Content with counters. When non-empty, `content` is ignored.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        items: Vec<ContentItem>,
    },

    /// Replaced content with an intrinsic size, like an image.
    Image { width: f64, height: f64 },

    /// A table container. Children should be TableRow nodes.
    Table {
        /// Column width definitions. If omitted, columns distribute evenly.
        #[serde(default)]
        columns: Vec<ColumnDef>,
    },

    /// A row inside a Table.
    TableRow {
        /// Header rows repeat at the top of every page the table continues on.
        #[serde(default, rename = "isHeader")]
        is_header: bool,
    },

    /// A cell inside a TableRow.
    TableCell {
        #[serde(default = "default_one", rename = "colSpan")]
        col_span: u32,
    },

    /// An explicit page break.
    PageBreak,
}

fn default_one() -> u32 {
    1
}

/// Column definition for tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Width as a fraction (0.0-1.0) of available table width, or fixed points.
    pub width: ColumnWidth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnWidth {
    /// Fraction of available width (0.0-1.0).
    Fraction(f64),
    /// Fixed width in points.
    Fixed(f64),
    /// Distribute remaining space evenly among Auto columns.
    Auto,
}

impl Node {
    /// Create a View node with children.
    pub fn view(style: Style, children: Vec<Node>) -> Self {
        Self {
            kind: NodeKind::View,
            style,
            children,
            id: None,
        }
    }

    /// Create a Text node.
    pub fn text(content: &str, style: Style) -> Self {
        Self {
            kind: NodeKind::Text {
                content: content.to_string(),
                items: vec![],
            },
            style,
            children: vec![],
            id: None,
        }
    }

    /// Create a Text node from content items (counters, cross-references).
    pub fn text_items(items: Vec<ContentItem>, style: Style) -> Self {
        Self {
            kind: NodeKind::Text {
                content: String::new(),
                items,
            },
            style,
            children: vec![],
            id: None,
        }
    }

    /// Create a replaced node with an intrinsic size.
    pub fn image(width: f64, height: f64, style: Style) -> Self {
        Self {
            kind: NodeKind::Image { width, height },
            style,
            children: vec![],
            id: None,
        }
    }

    pub fn page_break() -> Self {
        Self {
            kind: NodeKind::PageBreak,
            style: Style::default(),
            children: vec![],
            id: None,
        }
    }

    pub fn table(columns: Vec<ColumnDef>, style: Style, rows: Vec<Node>) -> Self {
        Self {
            kind: NodeKind::Table { columns },
            style,
            children: rows,
            id: None,
        }
    }

    pub fn row(is_header: bool, cells: Vec<Node>) -> Self {
        Self {
            kind: NodeKind::TableRow { is_header },
            style: Style::default(),
            children: cells,
            id: None,
        }
    }

    pub fn cell(style: Style, children: Vec<Node>) -> Self {
        Self {
            kind: NodeKind::TableCell { col_span: 1 },
            style,
            children,
            id: None,
        }
    }

    /// Attach an anchor name.
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self {
            children,
            ..Default::default()
        }
    }

    /// Parse a document from JSON and check it for values layout rejects.
    pub fn from_json(json: &str) -> Result<Self, QuireError> {
        let document: Document = serde_json::from_str(json)?;
        document.validate()?;
        Ok(document)
    }

    /// Reject structurally invalid values before layout sees them.
    pub fn validate(&self) -> Result<(), QuireError> {
        validate_style(&self.style, "root")?;
        let mut rules: Vec<(&str, &PageRule)> = vec![("@page", &self.pages.default)];
        for (label, rule) in [
            ("@page :first", &self.pages.first),
            ("@page :left", &self.pages.left),
            ("@page :right", &self.pages.right),
            ("@page :blank", &self.pages.blank),
        ] {
            if let Some(rule) = rule {
                rules.push((label, rule));
            }
        }
        for (name, rule) in &self.pages.named {
            rules.push((name.as_str(), rule));
        }
        for (label, rule) in rules {
            if let Some(size) = rule.size {
                let (w, h) = size.dimensions();
                if !(w > 0.0 && h > 0.0) {
                    return Err(QuireError::InvalidDocument(format!(
                        "{}: page size must be positive, got {}x{}",
                        label, w, h
                    )));
                }
            }
            if let Some(margin) = rule.margin {
                if margin.top < 0.0 || margin.right < 0.0 || margin.bottom < 0.0 || margin.left < 0.0
                {
                    return Err(QuireError::InvalidDocument(format!(
                        "{}: page margins must not be negative",
                        label
                    )));
                }
            }
        }
        self.children.iter().try_for_each(validate_node)
    }
}

fn validate_node(node: &Node) -> Result<(), QuireError> {
    let label = match &node.id {
        Some(id) => format!("#{}", id),
        None => node_kind_name(&node.kind).to_string(),
    };
    validate_style(&node.style, &label)?;
    match &node.kind {
        NodeKind::TableCell { col_span: 0 } => {
            return Err(QuireError::InvalidDocument(format!(
                "{}: colSpan must be at least 1",
                label
            )));
        }
        NodeKind::Image { width, height } if *width < 0.0 || *height < 0.0 => {
            return Err(QuireError::InvalidDocument(format!(
                "{}: intrinsic size must not be negative",
                label
            )));
        }
        _ => {}
    }
    node.children.iter().try_for_each(validate_node)
}

fn node_kind_name(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::View => "View",
        NodeKind::Text { .. } => "Text",
        NodeKind::Image { .. } => "Image",
        NodeKind::Table { .. } => "Table",
        NodeKind::TableRow { .. } => "TableRow",
        NodeKind::TableCell { .. } => "TableCell",
        NodeKind::PageBreak => "PageBreak",
    }
}

fn validate_style(style: &Style, label: &str) -> Result<(), QuireError> {
    if style.column_count == Some(0) {
        return Err(QuireError::InvalidDocument(format!(
            "{}: column-count must be positive",
            label
        )));
    }
    if let Some(width) = style.column_width {
        if width <= 0.0 {
            return Err(QuireError::InvalidDocument(format!(
                "{}: column-width must be positive, got {}",
                label, width
            )));
        }
    }
    if let Some(gap) = style.column_gap {
        if gap < 0.0 {
            return Err(QuireError::InvalidDocument(format!(
                "{}: column-gap must not be negative",
                label
            )));
        }
    }
    if let Some(border) = style.border_width {
        if border.top < 0.0 || border.right < 0.0 || border.bottom < 0.0 || border.left < 0.0 {
            return Err(QuireError::InvalidDocument(format!(
                "{}: border widths must not be negative",
                label
            )));
        }
    }
    if let Some(size) = style.font_size {
        if size <= 0.0 {
            return Err(QuireError::InvalidDocument(format!(
                "{}: font size must be positive",
                label
            )));
        }
    }
    Ok(())
}
