//! # Layout Engine
//!
//! Fragments the box tree into pages.
//!
//! The box tree is immutable input. Every layout function reads boxes by
//! [`BoxId`] and produces fresh [`Fragment`]s; a box that does not fit is
//! resumed on the next page from a [`SkipStack`], a chain of child indices
//! pointing at the first content that was not laid out yet.
//!
//! ```text
//! pagination::layout_document        repaginate until page counters settle
//!   ├─ make_page                     one page: root box against the page area
//!   │    ├─ block::block_level_layout
//!   │    │    ├─ block::block_container_layout   children, margins, breaks
//!   │    │    │    ├─ inline::iter_line_boxes    lines, orphans and widows
//!   │    │    │    ├─ float::float_layout
//!   │    │    │    └─ page_break::*              where a page may break
//!   │    │    ├─ columns::columns_layout         balancing
//!   │    │    ├─ table::table_layout
//!   │    │    └─ flex::flex_layout
//!   │    └─ counters::CounterCollector           what the page read
//!   └─ margin_boxes::make_margin_boxes           headers and footers
//! ```
//!
//! All mutable state of one document pass lives in [`LayoutContext`]: the
//! stack of float exclusions per block formatting context, running elements
//! recorded per page, the strut cache, and the page maker that remembers
//! where each page starts.

pub mod absolute;
pub mod block;
pub mod columns;
pub mod counters;
pub mod flex;
pub mod float;
pub mod fragment;
pub mod inline;
pub mod margin_boxes;
pub mod margins;
pub mod page_break;
pub mod pagination;
pub mod percentages;
pub mod preferred;
pub mod table;
pub mod width;

pub use fragment::{Flow, Fragment, FragmentKind};
pub use pagination::{Page, PageSide};

use crate::boxes::{BoxId, BoxTree};
use crate::model::{LayoutConfig, PageRules};
use crate::style::{BreakValue, Float};
use counters::CounterCollector;
use pagination::PageMakerEntry;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Where to resume a box: the index of the first child not fully laid out,
/// and where to resume inside that child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipStack {
    pub skip: usize,
    pub stack: Option<Box<SkipStack>>,
}

impl SkipStack {
    pub fn new(skip: usize) -> Self {
        Self { skip, stack: None }
    }

    pub fn nested(skip: usize, stack: Option<SkipStack>) -> Self {
        Self {
            skip,
            stack: stack.map(Box::new),
        }
    }

    pub fn inner(&self) -> Option<&SkipStack> {
        self.stack.as_deref()
    }
}

/// The kind of break that ended a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BreakKind {
    #[default]
    Any,
    Page,
    Left,
    Right,
    Recto,
    Verso,
}

impl From<BreakValue> for BreakKind {
    fn from(value: BreakValue) -> Self {
        match value {
            BreakValue::Page => BreakKind::Page,
            BreakValue::Left => BreakKind::Left,
            BreakValue::Right => BreakKind::Right,
            BreakValue::Recto => BreakKind::Recto,
            BreakValue::Verso => BreakKind::Verso,
            BreakValue::Auto | BreakValue::Avoid | BreakValue::AvoidPage => BreakKind::Any,
        }
    }
}

/// What the next page must be: its side and its page name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NextPage {
    pub kind: BreakKind,
    pub page: Option<String>,
}

impl NextPage {
    pub fn any(page: Option<String>) -> Self {
        Self {
            kind: BreakKind::Any,
            page,
        }
    }
}

/// Everything a block-level layout function reports besides its fragment.
#[derive(Debug, Clone)]
pub(crate) struct BlockLayout {
    /// `None` once the box is fully laid out.
    pub resume_at: Option<SkipStack>,
    pub next_page: NextPage,
    /// Margins still collapsing after this box.
    pub adjoining_margins: Vec<f64>,
    /// `adjoining_margins` is the list the parent handed in, extended.
    pub adjoining_shared: bool,
    /// Margins appended to the parent's list before it stopped being shared.
    pub leading_margins: Vec<f64>,
    pub collapsing_through: bool,
}

impl BlockLayout {
    /// The box did not fit and must be retried on the next page.
    pub fn canceled(page: Option<String>) -> Self {
        Self {
            resume_at: None,
            next_page: NextPage::any(page),
            adjoining_margins: Vec::new(),
            adjoining_shared: false,
            leading_margins: Vec::new(),
            collapsing_through: false,
        }
    }

    /// A box that settles its own margins and leaves nothing adjoining.
    pub fn settled(resume_at: Option<SkipStack>, next_page: NextPage) -> Self {
        Self {
            resume_at,
            next_page,
            adjoining_margins: Vec::new(),
            adjoining_shared: false,
            leading_margins: Vec::new(),
            collapsing_through: false,
        }
    }
}

/// The width and, when known, the height of a containing block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ContainingBlock {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: Option<f64>,
    pub rtl: bool,
}

/// A float exclusion: the margin box of a placed float.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Shape {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub side: Float,
}

impl Shape {
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// An absolutely or fixed positioned box waiting for its containing block.
/// The in-flow fragment list holds a `Placeholder` fragment with the same id.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Placeholder {
    pub id: usize,
    pub box_id: BoxId,
    pub index: usize,
    /// Static position of the margin box.
    pub x: f64,
    pub y: f64,
}

/// Observable outcome of a pagination run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutStats {
    /// Whole-document layout passes.
    pub loops: usize,
    /// False when the pass limit was hit before page counters settled.
    pub converged: bool,
    /// Column balancing passes over all pages and loops.
    pub column_passes: usize,
}

/// Mutable state threaded through one document layout.
pub(crate) struct LayoutContext<'a> {
    pub tree: &'a BoxTree,
    pub rules: &'a PageRules,
    pub config: &'a LayoutConfig,
    excluded_shapes_lists: Vec<Vec<Shape>>,
    /// Running elements by name, then page number.
    pub running_elements: HashMap<String, BTreeMap<usize, Vec<BoxId>>>,
    /// Named strings by name, then page number. Filled after pagination.
    pub string_set: HashMap<String, BTreeMap<usize, Vec<String>>>,
    strut_layouts: HashMap<(u64, u64), (f64, f64)>,
    /// Text of line boxes whose content is set for the current layout only.
    pub text_overrides: HashMap<BoxId, String>,
    pub page_maker: Vec<PageMakerEntry>,
    pub current_page: usize,
    /// The current page started after a forced break.
    pub forced_break: bool,
    pub counters: CounterCollector,
    pub stats: LayoutStats,
    next_placeholder: usize,
}

impl<'a> LayoutContext<'a> {
    pub fn new(tree: &'a BoxTree, rules: &'a PageRules, config: &'a LayoutConfig) -> Self {
        Self {
            tree,
            rules,
            config,
            excluded_shapes_lists: Vec::new(),
            running_elements: HashMap::new(),
            string_set: HashMap::new(),
            strut_layouts: HashMap::new(),
            text_overrides: HashMap::new(),
            page_maker: Vec::new(),
            current_page: 0,
            forced_break: false,
            counters: CounterCollector::new(tree),
            stats: LayoutStats::default(),
            next_placeholder: 0,
        }
    }

    // ── Block formatting contexts ───────────────────────────────

    pub fn create_block_formatting_context(&mut self) {
        self.excluded_shapes_lists.push(Vec::new());
    }

    /// Leave the current formatting context. A root with an auto height
    /// grows to contain its floats.
    pub fn finish_block_formatting_context(&mut self, root: &mut Fragment, height_is_auto: bool) {
        if height_is_auto {
            if let Some(shapes) = self.excluded_shapes_lists.last() {
                let box_bottom = root.content_box_y() + root.height;
                let max_shape_bottom = shapes
                    .iter()
                    .map(Shape::bottom)
                    .fold(box_bottom, f64::max);
                root.height += max_shape_bottom - box_bottom;
            }
        }
        self.excluded_shapes_lists.pop();
    }

    /// Leave a formatting context whose root was not placed.
    pub fn discard_block_formatting_context(&mut self) {
        self.excluded_shapes_lists.pop();
    }

    pub fn excluded_shapes(&self) -> &[Shape] {
        self.excluded_shapes_lists
            .last()
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn add_excluded_shape(&mut self, shape: Shape) {
        if let Some(shapes) = self.excluded_shapes_lists.last_mut() {
            shapes.push(shape);
        }
    }

    /// Number of shapes in the current context, to roll back a trial layout.
    pub fn excluded_shapes_len(&self) -> usize {
        self.excluded_shapes().len()
    }

    pub fn truncate_excluded_shapes(&mut self, len: usize) {
        if let Some(shapes) = self.excluded_shapes_lists.last_mut() {
            shapes.truncate(len);
        }
    }

    // ── Caches and ids ──────────────────────────────────────────

    /// Height and baseline of an empty line for a font size and line height.
    pub fn strut(&mut self, font_size: f64, line_height: f64) -> (f64, f64) {
        *self
            .strut_layouts
            .entry((font_size.to_bits(), line_height.to_bits()))
            .or_insert_with(|| {
                let height = font_size * line_height;
                let half_leading = (height - font_size) / 2.0;
                (height, half_leading + font_size * 0.8)
            })
    }

    pub fn next_placeholder_id(&mut self) -> usize {
        self.next_placeholder += 1;
        self.next_placeholder
    }

    /// Text of a line box as laid out now.
    pub fn line_text(&self, id: BoxId) -> String {
        match self.text_overrides.get(&id) {
            Some(text) => text.clone(),
            None => self.counters.line_text(self.tree, id),
        }
    }

    /// Record a running element met on the current page.
    pub fn add_running_element(&mut self, name: &str, id: BoxId) {
        let elements = self
            .running_elements
            .entry(name.to_string())
            .or_default()
            .entry(self.current_page)
            .or_default();
        if !elements.contains(&id) {
            elements.push(id);
        }
    }
}

/// Lengths of the placeholder lists and of the current exclusions, to undo
/// everything a layout attempt registered when the attempt is dropped.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Rollback {
    absolute: usize,
    fixed: usize,
    shapes: usize,
}

impl Rollback {
    pub fn mark(ctx: &LayoutContext, absolute_boxes: &[Placeholder], fixed_boxes: &[Placeholder]) -> Self {
        Self {
            absolute: absolute_boxes.len(),
            fixed: fixed_boxes.len(),
            shapes: ctx.excluded_shapes_len(),
        }
    }

    pub fn undo(
        &self,
        ctx: &mut LayoutContext,
        absolute_boxes: &mut Vec<Placeholder>,
        fixed_boxes: &mut Vec<Placeholder>,
    ) {
        absolute_boxes.truncate(self.absolute);
        fixed_boxes.truncate(self.fixed);
        ctx.truncate_excluded_shapes(self.shapes);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::model::{Document, Node};
    use crate::style::Style;

    pub fn make_text(content: &str) -> Node {
        Node::text(content, Style::default())
    }

    pub fn make_styled_view(style: Style, children: Vec<Node>) -> Node {
        Node::view(style, children)
    }

    /// A block of fixed height.
    pub fn make_block(height: f64) -> Node {
        Node::view(
            Style {
                height: Some(crate::style::Dimension::Pt(height)),
                ..Default::default()
            },
            vec![],
        )
    }

    /// A document with a custom page of `width` x `height` and no margins.
    pub fn default_doc(children: Vec<Node>, width: f64, height: f64) -> Document {
        let mut doc = Document::new(children);
        doc.pages.default.size = Some(crate::model::PageSize::Custom { width, height });
        doc.pages.default.margin = Some(crate::model::Edges::uniform(0.0));
        doc
    }

    pub fn layout_doc(doc: &Document) -> Vec<Page> {
        crate::paginate(doc).0
    }
}
