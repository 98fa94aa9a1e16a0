//! # Fragments
//!
//! The output of layout. A fragment is the part of one box that landed on
//! one page, positioned in page coordinates. `x`/`y` locate the top-left
//! corner of the margin box; `width`/`height` are the content box.

use super::percentages::UsedBox;
use super::SkipStack;
use crate::boxes::{BoxId, BoxTree};
use crate::model::{Edges, MarginSlot};
use crate::style::ComputedStyle;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum FragmentKind {
    Block,
    Line { text: String, baseline: f64 },
    Replaced,
    Table,
    TableRow,
    TableCell,
    Flex,
    /// One column of a multi-column container.
    Column,
    MarginBox { slot: MarginSlot },
    /// Where an absolutely positioned box sits in the flow until its
    /// containing block is laid out.
    Placeholder { id: usize },
}

/// How a fragment takes part in its parent's layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Flow {
    InFlow,
    Float,
    Absolute,
    Fixed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    pub kind: FragmentKind,
    pub box_id: BoxId,
    /// Index of the box among its parent box's children.
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub margin: Edges,
    pub padding: Edges,
    pub border: Edges,
    pub flow: Flow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clearance: Option<f64>,
    /// Where the content continues, for line fragments.
    #[serde(skip)]
    pub resume_at: Option<SkipStack>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Fragment>,
}

impl Fragment {
    pub fn empty(kind: FragmentKind, box_id: BoxId) -> Self {
        Self {
            kind,
            box_id,
            index: 0,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            margin: Edges::default(),
            padding: Edges::default(),
            border: Edges::default(),
            flow: Flow::InFlow,
            clearance: None,
            resume_at: None,
            children: Vec::new(),
        }
    }

    /// A fragment for a box whose used values are resolved. An auto height
    /// starts at zero.
    pub(crate) fn from_used(kind: FragmentKind, box_id: BoxId, index: usize, used: &UsedBox) -> Self {
        Self {
            kind,
            box_id,
            index,
            x: used.x,
            y: used.y,
            width: used.width.unwrap_or(0.0),
            height: used.height.unwrap_or(0.0),
            margin: used.margins(),
            padding: used.padding,
            border: used.border,
            flow: Flow::InFlow,
            clearance: None,
            resume_at: None,
            children: Vec::new(),
        }
    }

    pub fn style<'t>(&self, tree: &'t BoxTree) -> &'t ComputedStyle {
        &tree.node(self.box_id).style
    }

    // ── Geometry ────────────────────────────────────────────────

    pub fn border_box_x(&self) -> f64 {
        self.x + self.margin.left
    }

    pub fn border_box_y(&self) -> f64 {
        self.y + self.margin.top
    }

    pub fn padding_box_x(&self) -> f64 {
        self.border_box_x() + self.border.left
    }

    pub fn padding_box_y(&self) -> f64 {
        self.border_box_y() + self.border.top
    }

    pub fn content_box_x(&self) -> f64 {
        self.padding_box_x() + self.padding.left
    }

    pub fn content_box_y(&self) -> f64 {
        self.padding_box_y() + self.padding.top
    }

    pub fn padding_width(&self) -> f64 {
        self.width + self.padding.horizontal()
    }

    pub fn padding_height(&self) -> f64 {
        self.height + self.padding.vertical()
    }

    pub fn border_width(&self) -> f64 {
        self.padding_width() + self.border.horizontal()
    }

    pub fn border_height(&self) -> f64 {
        self.padding_height() + self.border.vertical()
    }

    pub fn margin_width(&self) -> f64 {
        self.border_width() + self.margin.horizontal()
    }

    pub fn margin_height(&self) -> f64 {
        self.border_height() + self.margin.vertical()
    }

    /// Bottom of the border box.
    pub fn border_box_bottom(&self) -> f64 {
        self.border_box_y() + self.border_height()
    }

    // ── Tree operations ─────────────────────────────────────────

    pub fn translate(&mut self, dx: f64, dy: f64) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        self.x += dx;
        self.y += dy;
        for child in &mut self.children {
            child.translate(dx, dy);
        }
    }

    pub fn is_in_normal_flow(&self) -> bool {
        self.flow == Flow::InFlow
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, FragmentKind::Placeholder { .. })
    }

    pub fn is_line(&self) -> bool {
        matches!(self.kind, FragmentKind::Line { .. })
    }

    /// Drop the top and/or bottom decorations of a fragment that continues
    /// from or onto another page.
    pub fn remove_decoration(&mut self, start: bool, end: bool) {
        if start {
            self.margin.top = 0.0;
            self.padding.top = 0.0;
            self.border.top = 0.0;
        }
        if end {
            self.margin.bottom = 0.0;
            self.padding.bottom = 0.0;
            self.border.bottom = 0.0;
        }
    }

    /// Ids of the placeholders in this subtree.
    pub fn placeholder_ids(&self, out: &mut Vec<usize>) {
        if let FragmentKind::Placeholder { id } = self.kind {
            out.push(id);
        }
        for child in &self.children {
            child.placeholder_ids(out);
        }
    }

    /// Replace the placeholder `id` anywhere in this subtree. Returns false
    /// when it is not found.
    pub fn replace_placeholder(&mut self, id: usize, fragment: Fragment) -> bool {
        let mut fragment = Some(fragment);
        self.replace_placeholder_inner(id, &mut fragment)
    }

    fn replace_placeholder_inner(&mut self, id: usize, fragment: &mut Option<Fragment>) -> bool {
        for child in &mut self.children {
            if child.kind == (FragmentKind::Placeholder { id }) {
                if let Some(new) = fragment.take() {
                    *child = new;
                }
                return true;
            }
            if child.replace_placeholder_inner(id, fragment) {
                return true;
            }
        }
        false
    }

    /// Visit this fragment and all its descendants in tree order.
    pub fn walk<'s>(&'s self, visit: &mut impl FnMut(&'s Fragment)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}
