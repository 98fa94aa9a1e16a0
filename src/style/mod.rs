//! # Style System
//!
//! A CSS-like style model for document nodes. `Style` is what the document
//! author specifies (every property optional); `ComputedStyle` is the
//! concrete, inherited result that box generation attaches to every box.
//!
//! Computed values are not yet *used* values: lengths may still be `Auto`
//! or a percentage. Layout resolves them against the containing block.
//!
//! We implement the subset of CSS that block layout and fragmentation need:
//! the box model, positioning, floats, breaks, multi-column, and enough
//! flexbox and typography for the collaborators.

use crate::model::Edges;
use serde::{Deserialize, Serialize};

/// The complete set of style properties for a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    // ── Display & Positioning ──────────────────────────────────
    /// Outer display type. `None` generates no box at all.
    pub display: Option<Display>,
    /// Positioning scheme.
    pub position: Option<Position>,
    /// Offsets for positioned boxes.
    pub top: Option<Dimension>,
    pub right: Option<Dimension>,
    pub bottom: Option<Dimension>,
    pub left: Option<Dimension>,
    /// Float side.
    pub float: Option<Float>,
    /// Which floats this box must clear.
    pub clear: Option<Clear>,
    /// Inline base direction. Inherited.
    pub direction: Option<Direction>,
    /// Overflow behavior. Anything but visible establishes a formatting context.
    pub overflow: Option<Overflow>,

    // ── Box Model ──────────────────────────────────────────────
    pub width: Option<Dimension>,
    pub height: Option<Dimension>,
    pub min_width: Option<Dimension>,
    pub min_height: Option<Dimension>,
    /// `Auto` means `none`.
    pub max_width: Option<Dimension>,
    /// `Auto` means `none`.
    pub max_height: Option<Dimension>,
    /// Margin outside the border. `Auto` margins are allowed.
    pub margin: Option<EdgeValues<Dimension>>,
    /// Padding inside the border.
    pub padding: Option<EdgeValues<Dimension>>,
    /// Border width for all sides, in points.
    pub border_width: Option<Edges>,
    pub box_sizing: Option<BoxSizing>,

    // ── Fragmentation ──────────────────────────────────────────
    pub break_before: Option<BreakValue>,
    pub break_after: Option<BreakValue>,
    pub break_inside: Option<BreakInside>,
    /// Legacy alias of `break_before`.
    pub page_break_before: Option<LegacyPageBreak>,
    /// Legacy alias of `break_after`.
    pub page_break_after: Option<LegacyPageBreak>,
    /// Legacy alias of `break_inside`.
    pub page_break_inside: Option<BreakInside>,
    /// Minimum lines left at the bottom of a page. Inherited. Default: 2.
    pub orphans: Option<u32>,
    /// Minimum lines carried to the top of the next page. Inherited. Default: 2.
    pub widows: Option<u32>,
    pub box_decoration_break: Option<BoxDecorationBreak>,
    pub margin_break: Option<MarginBreak>,
    /// Named page this box wants to be laid out on. `None` inherits.
    pub page: Option<String>,

    // ── Multi-column ───────────────────────────────────────────
    pub column_width: Option<f64>,
    pub column_count: Option<u32>,
    /// Gap between columns. Default: 1em.
    pub column_gap: Option<f64>,
    pub column_fill: Option<ColumnFill>,
    pub column_span: Option<ColumnSpan>,

    // ── Flexbox ────────────────────────────────────────────────
    pub flex_direction: Option<FlexDirection>,
    pub flex_wrap: Option<FlexWrap>,
    pub flex_grow: Option<f64>,
    pub flex_shrink: Option<f64>,
    pub flex_basis: Option<Dimension>,
    pub align_items: Option<AlignItems>,
    /// Gap between flex items and flex lines.
    pub gap: Option<f64>,
    /// Gap between flex lines (overrides `gap`).
    pub row_gap: Option<f64>,

    // ── Typography ─────────────────────────────────────────────
    /// Font size in points. Inherited.
    pub font_size: Option<f64>,
    /// Line height as a multiplier of font size. Inherited.
    pub line_height: Option<f64>,
    /// Vertical alignment of margin box content.
    pub vertical_align: Option<VerticalAlign>,

    // ── Generated Content ──────────────────────────────────────
    /// Named strings assigned by this element, read back in margin boxes.
    pub string_set: Option<Vec<StringSet>>,
}

/// A dimension that can be points, percentage, or auto.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Dimension {
    /// Fixed size in points (1/72 inch).
    Pt(f64),
    /// Percentage of the containing block's corresponding dimension.
    Percent(f64),
    /// Size determined by layout.
    Auto,
}

impl Dimension {
    /// Resolve this dimension given a parent size.
    /// Returns None for Auto.
    pub fn resolve(&self, parent_size: f64) -> Option<f64> {
        match self {
            Dimension::Pt(v) => Some(*v),
            Dimension::Percent(p) => Some(parent_size * p / 100.0),
            Dimension::Auto => None,
        }
    }

    /// Resolve against a parent size that may itself be unknown.
    /// Percentages of an unknown size behave as `auto`.
    pub fn resolve_opt(&self, parent_size: Option<f64>) -> Option<f64> {
        match (self, parent_size) {
            (Dimension::Pt(v), _) => Some(*v),
            (Dimension::Percent(p), Some(size)) => Some(size * p / 100.0),
            _ => None,
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, Dimension::Auto)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Display {
    #[default]
    Block,
    Flex,
    None,
}

/// Positioning scheme. `Running` takes the box out of the flow and makes it
/// available to margin boxes under the given name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
    Running(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Float {
    #[default]
    None,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Clear {
    #[default]
    None,
    Left,
    Right,
    Both,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoxSizing {
    #[default]
    ContentBox,
    BorderBox,
}

/// A break value between two boxes. Used both as the `break-before` /
/// `break-after` property and as the transient result of a break decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BreakValue {
    #[default]
    Auto,
    Avoid,
    AvoidPage,
    Page,
    Left,
    Right,
    Recto,
    Verso,
}

impl BreakValue {
    /// `avoid` or `avoid-page`.
    pub fn is_avoid(self) -> bool {
        matches!(self, BreakValue::Avoid | BreakValue::AvoidPage)
    }

    /// Any value that forces a page break.
    pub fn is_forced(self) -> bool {
        matches!(
            self,
            BreakValue::Page
                | BreakValue::Left
                | BreakValue::Right
                | BreakValue::Recto
                | BreakValue::Verso
        )
    }

    /// Whether `self`, met later in tree order, replaces `current` as the
    /// winning value. Side-specific breaks always win.
    pub fn wins_over(self, current: BreakValue) -> bool {
        use BreakValue::*;
        match self {
            Left | Right | Recto | Verso => true,
            Page => matches!(current, Auto | Avoid | AvoidPage),
            Avoid | AvoidPage => current == Auto,
            Auto => false,
        }
    }
}

/// The CSS 2 `page-break-before` / `page-break-after` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegacyPageBreak {
    Auto,
    Always,
    Avoid,
    Left,
    Right,
}

impl From<LegacyPageBreak> for BreakValue {
    fn from(value: LegacyPageBreak) -> Self {
        match value {
            LegacyPageBreak::Auto => BreakValue::Auto,
            LegacyPageBreak::Always => BreakValue::Page,
            LegacyPageBreak::Avoid => BreakValue::Avoid,
            LegacyPageBreak::Left => BreakValue::Left,
            LegacyPageBreak::Right => BreakValue::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakInside {
    #[default]
    Auto,
    Avoid,
    AvoidPage,
}

impl BreakInside {
    pub fn is_avoid(self) -> bool {
        !matches!(self, BreakInside::Auto)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoxDecorationBreak {
    #[default]
    Slice,
    Clone,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarginBreak {
    #[default]
    Auto,
    Keep,
    Discard,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnFill {
    #[default]
    Balance,
    Auto,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnSpan {
    #[default]
    None,
    All,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlexDirection {
    #[default]
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlexWrap {
    #[default]
    NoWrap,
    Wrap,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlignItems {
    FlexStart,
    FlexEnd,
    Center,
    #[default]
    Stretch,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerticalAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

/// One `string-set` assignment: `name` receives either a literal value or,
/// when `value` is absent, the text content of the element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringSet {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// Values for each edge (top, right, bottom, left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeValues<T: Copy> {
    pub top: T,
    pub right: T,
    pub bottom: T,
    pub left: T,
}

impl<T: Copy> EdgeValues<T> {
    pub fn uniform(v: T) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn symmetric(vertical: T, horizontal: T) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }
}

/// Fully computed style. Every property has a value; inherited properties
/// have been taken from the parent.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    pub display: Display,
    pub position: Position,
    pub top: Dimension,
    pub right: Dimension,
    pub bottom: Dimension,
    pub left: Dimension,
    pub float: Float,
    pub clear: Clear,
    pub direction: Direction,
    pub overflow: Overflow,

    pub width: Dimension,
    pub height: Dimension,
    pub min_width: Dimension,
    pub min_height: Dimension,
    pub max_width: Dimension,
    pub max_height: Dimension,
    pub margin: EdgeValues<Dimension>,
    pub padding: EdgeValues<Dimension>,
    pub border_width: Edges,
    pub box_sizing: BoxSizing,

    pub break_before: BreakValue,
    pub break_after: BreakValue,
    pub break_inside: BreakInside,
    pub orphans: u32,
    pub widows: u32,
    pub box_decoration_break: BoxDecorationBreak,
    pub margin_break: MarginBreak,
    pub page: Option<String>,

    pub column_width: Option<f64>,
    pub column_count: Option<u32>,
    pub column_gap: f64,
    pub column_fill: ColumnFill,
    pub column_span: ColumnSpan,

    pub flex_direction: FlexDirection,
    pub flex_wrap: FlexWrap,
    pub flex_grow: f64,
    pub flex_shrink: f64,
    pub flex_basis: Dimension,
    pub align_items: AlignItems,
    pub gap: f64,
    pub row_gap: f64,

    pub font_size: f64,
    pub line_height: f64,
    pub vertical_align: VerticalAlign,

    pub string_set: Vec<StringSet>,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Style::default().compute(None)
    }
}

impl Style {
    /// Compute this style against the parent's computed style.
    pub fn compute(&self, parent: Option<&ComputedStyle>) -> ComputedStyle {
        let font_size = self
            .font_size
            .unwrap_or_else(|| parent.map(|p| p.font_size).unwrap_or(12.0));
        let gap = self.gap.unwrap_or(0.0);

        let break_before = self
            .break_before
            .or(self.page_break_before.map(BreakValue::from))
            .unwrap_or_default();
        let break_after = self
            .break_after
            .or(self.page_break_after.map(BreakValue::from))
            .unwrap_or_default();

        ComputedStyle {
            display: self.display.unwrap_or_default(),
            position: self.position.clone().unwrap_or_default(),
            top: self.top.unwrap_or(Dimension::Auto),
            right: self.right.unwrap_or(Dimension::Auto),
            bottom: self.bottom.unwrap_or(Dimension::Auto),
            left: self.left.unwrap_or(Dimension::Auto),
            float: self.float.unwrap_or_default(),
            clear: self.clear.unwrap_or_default(),
            direction: self
                .direction
                .unwrap_or_else(|| parent.map(|p| p.direction).unwrap_or_default()),
            overflow: self.overflow.unwrap_or_default(),

            width: self.width.unwrap_or(Dimension::Auto),
            height: self.height.unwrap_or(Dimension::Auto),
            min_width: self.min_width.unwrap_or(Dimension::Pt(0.0)),
            min_height: self.min_height.unwrap_or(Dimension::Pt(0.0)),
            max_width: self.max_width.unwrap_or(Dimension::Auto),
            max_height: self.max_height.unwrap_or(Dimension::Auto),
            margin: self
                .margin
                .unwrap_or(EdgeValues::uniform(Dimension::Pt(0.0))),
            padding: self
                .padding
                .unwrap_or(EdgeValues::uniform(Dimension::Pt(0.0))),
            border_width: self.border_width.unwrap_or_default(),
            box_sizing: self.box_sizing.unwrap_or_default(),

            break_before,
            break_after,
            break_inside: self
                .break_inside
                .or(self.page_break_inside)
                .unwrap_or_default(),
            orphans: self
                .orphans
                .unwrap_or_else(|| parent.map(|p| p.orphans).unwrap_or(2))
                .max(1),
            widows: self
                .widows
                .unwrap_or_else(|| parent.map(|p| p.widows).unwrap_or(2))
                .max(1),
            box_decoration_break: self.box_decoration_break.unwrap_or_default(),
            margin_break: self.margin_break.unwrap_or_default(),
            page: self
                .page
                .clone()
                .or_else(|| parent.and_then(|p| p.page.clone())),

            column_width: self.column_width,
            column_count: self.column_count,
            column_gap: self.column_gap.unwrap_or(font_size),
            column_fill: self.column_fill.unwrap_or_default(),
            column_span: self.column_span.unwrap_or_default(),

            flex_direction: self.flex_direction.unwrap_or_default(),
            flex_wrap: self.flex_wrap.unwrap_or_default(),
            flex_grow: self.flex_grow.unwrap_or(0.0),
            flex_shrink: self.flex_shrink.unwrap_or(1.0),
            flex_basis: self.flex_basis.unwrap_or(Dimension::Auto),
            align_items: self.align_items.unwrap_or_default(),
            gap,
            row_gap: self.row_gap.unwrap_or(gap),

            font_size,
            line_height: self
                .line_height
                .unwrap_or_else(|| parent.map(|p| p.line_height).unwrap_or(1.2)),
            vertical_align: self.vertical_align.unwrap_or_default(),

            string_set: self.string_set.clone().unwrap_or_default(),
        }
    }
}

impl ComputedStyle {
    /// Style of an anonymous box generated inside `parent`: inherited
    /// properties come from the parent, everything else is initial.
    pub fn anonymous_from(parent: &ComputedStyle) -> ComputedStyle {
        Style::default().compute(Some(parent))
    }

    pub fn is_floated(&self) -> bool {
        self.float != Float::None
    }

    /// Absolute or fixed.
    pub fn is_absolutely_positioned(&self) -> bool {
        matches!(self.position, Position::Absolute | Position::Fixed)
    }

    pub fn is_running(&self) -> bool {
        matches!(self.position, Position::Running(_))
    }

    pub fn is_in_normal_flow(&self) -> bool {
        !(self.is_floated() || self.is_absolutely_positioned() || self.is_running())
    }

    pub fn is_relative(&self) -> bool {
        self.position == Position::Relative
    }

    /// Has `column-width` or `column-count`.
    pub fn is_multicol(&self) -> bool {
        self.column_width.is_some() || self.column_count.is_some()
    }
}
