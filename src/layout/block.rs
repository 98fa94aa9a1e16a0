//! # Block Layout
//!
//! Block-level boxes and block containers: the recursive procedure that
//! stacks children down the page, collapses their margins, places floats
//! and placeholders, and decides where the page breaks.
//!
//! A container that does not fit entirely returns its fragment with a
//! [`SkipStack`] to resume from. A container that cannot place anything
//! at all returns no fragment: the caller breaks before it instead.

use super::absolute::absolute_layout;
use super::columns::columns_layout;
use super::flex::flex_layout;
use super::float::{avoid_collisions, float_layout, get_clearance, CollisionBox};
use super::fragment::{Flow, Fragment, FragmentKind};
use super::inline::iter_line_boxes;
use super::margins::{collapse_margin, AdjoiningMargins};
use super::page_break::{
    block_level_page_break, block_level_page_name, find_earlier_page_break, remove_placeholders,
    Sibling,
};
use super::percentages::{resolve_percentages, UsedBox};
use super::table::table_layout;
use super::width::{block_level_width, replaced_size, solve_block_width};
use super::{BlockLayout, ContainingBlock, LayoutContext, NextPage, Placeholder, Rollback, SkipStack};
use crate::boxes::{BoxId, BoxKind, BoxTree};
use crate::style::{
    BoxDecorationBreak, BreakValue, ComputedStyle, Direction, Float, MarginBreak, Overflow, Position,
};

/// A block container about to lay out its children.
///
/// Column boxes lay out a run of the multi-column container's children:
/// `children` is then a slice starting at child index `child_base`, and skip
/// stacks keep using indices into the full child list.
pub(crate) struct Container<'t> {
    pub id: BoxId,
    pub kind: FragmentKind,
    pub index: usize,
    pub style: &'t ComputedStyle,
    pub children: &'t [BoxId],
    pub child_base: usize,
    pub used: UsedBox,
    pub clearance: Option<f64>,
    pub is_for_root: bool,
    pub is_flex_item: bool,
    /// Opens a block formatting context of its own.
    pub new_bfc: bool,
    /// Margins of its children never collapse with its own.
    pub establishes_fc: bool,
}

impl<'t> Container<'t> {
    pub fn new(
        tree: &'t BoxTree,
        id: BoxId,
        index: usize,
        kind: FragmentKind,
        used: UsedBox,
        clearance: Option<f64>,
    ) -> Self {
        let node = tree.node(id);
        let style = &node.style;
        let new_bfc = matches!(node.kind, BoxKind::TableCell { .. } | BoxKind::Flex)
            || style.overflow != Overflow::Visible;
        Self {
            id,
            kind,
            index,
            style,
            children: &node.children,
            child_base: 0,
            used,
            clearance,
            is_for_root: node.is_for_root,
            is_flex_item: node.is_flex_item,
            new_bfc,
            establishes_fc: new_bfc || style.is_floated() || style.is_absolutely_positioned(),
        }
    }

    /// Restrict the container to `children`, the first of which has index
    /// `child_base` in the box's child list.
    pub fn with_children(mut self, children: &'t [BoxId], child_base: usize) -> Self {
        self.children = children;
        self.child_base = child_base;
        self
    }
}

/// Lay out the block-level box `id` with its margin box at (`x`, `y`).
///
/// `adjoining` holds the margins collapsing above the box. `discard` lays
/// out fragments that are measured rather than drawn: they never fill the
/// rest of the page.
#[allow(clippy::too_many_arguments)]
pub(crate) fn block_level_layout(
    ctx: &mut LayoutContext,
    id: BoxId,
    index: usize,
    x: f64,
    y: f64,
    max_y: f64,
    skip: Option<&SkipStack>,
    cb: &ContainingBlock,
    page_is_empty: bool,
    absolute_boxes: &mut Vec<Placeholder>,
    fixed_boxes: &mut Vec<Placeholder>,
    adjoining: Vec<f64>,
    discard: bool,
) -> (Option<Fragment>, BlockLayout) {
    let tree = ctx.tree;
    let node = tree.node(id);
    let style = &node.style;

    let mut used = resolve_percentages(style, cb);
    used.x = x;
    used.y = y;
    used.margin.top.get_or_insert(0.0);
    used.margin.bottom.get_or_insert(0.0);

    if ctx.current_page > 1 && page_is_empty {
        match style.margin_break {
            MarginBreak::Discard => used.margin.top = Some(0.0),
            MarginBreak::Auto if !ctx.forced_break => used.margin.top = Some(0.0),
            _ => {}
        }
    }

    let mut adjoining = adjoining;
    let mut with_top = adjoining.clone();
    with_top.push(used.margin_top());
    let collapsed = collapse_margin(&with_top);
    let clearance = get_clearance(ctx.excluded_shapes(), style.clear, used.y, collapsed);
    if let Some(clearance) = clearance {
        let top_border_edge = used.y + collapsed + clearance;
        used.y = top_border_edge - used.margin_top();
        adjoining = Vec::new();
    }

    let (fragment, mut layout) = match &node.kind {
        BoxKind::Block => block_box_layout(
            ctx,
            id,
            index,
            used,
            clearance,
            max_y,
            skip,
            cb,
            page_is_empty,
            absolute_boxes,
            fixed_boxes,
            adjoining,
            discard,
        ),
        BoxKind::Replaced { width, height } => {
            let fragment = block_replaced_box_layout(ctx, id, index, used, (*width, *height), clearance, cb);
            (Some(fragment), BlockLayout::settled(None, NextPage::any(None)))
        }
        BoxKind::Table { .. } => table_layout(
            ctx,
            id,
            index,
            used,
            clearance,
            max_y,
            skip,
            cb,
            page_is_empty,
            absolute_boxes,
            fixed_boxes,
            adjoining,
        ),
        BoxKind::Flex => flex_layout(
            ctx,
            id,
            index,
            used,
            clearance,
            max_y,
            skip,
            cb,
            page_is_empty,
            absolute_boxes,
            fixed_boxes,
        ),
        BoxKind::Line { .. } | BoxKind::TableRow { .. } | BoxKind::TableCell { .. } => {
            unreachable!("{:?} is laid out by its parent", node.kind)
        }
    };

    if clearance.is_some() {
        layout.leading_margins.clear();
        layout.adjoining_shared = false;
    }
    (fragment, layout)
}

#[allow(clippy::too_many_arguments)]
fn block_box_layout(
    ctx: &mut LayoutContext,
    id: BoxId,
    index: usize,
    mut used: UsedBox,
    clearance: Option<f64>,
    max_y: f64,
    skip: Option<&SkipStack>,
    cb: &ContainingBlock,
    page_is_empty: bool,
    absolute_boxes: &mut Vec<Placeholder>,
    fixed_boxes: &mut Vec<Placeholder>,
    adjoining: Vec<f64>,
    discard: bool,
) -> (Option<Fragment>, BlockLayout) {
    let tree = ctx.tree;
    if tree.node(id).style.is_multicol() {
        let rollback = Rollback::mark(ctx, absolute_boxes, fixed_boxes);
        let (fragment, layout) = columns_layout(
            ctx,
            id,
            index,
            used.clone(),
            clearance,
            max_y,
            skip,
            cb,
            page_is_empty,
            absolute_boxes,
            fixed_boxes,
            adjoining.clone(),
        );
        // A last fragment must keep room for its bottom spacing.
        if let Some(fragment) = &fragment {
            let bottom_spacing = fragment.margin.bottom + fragment.padding.bottom + fragment.border.bottom;
            let overflows = fragment.y + fragment.margin_height() > max_y;
            if layout.resume_at.is_none() && bottom_spacing != 0.0 && overflows {
                rollback.undo(ctx, absolute_boxes, fixed_boxes);
                return columns_layout(
                    ctx,
                    id,
                    index,
                    used,
                    clearance,
                    max_y - bottom_spacing,
                    skip,
                    cb,
                    page_is_empty,
                    absolute_boxes,
                    fixed_boxes,
                    adjoining,
                );
            }
        }
        return (fragment, layout);
    }

    block_level_width(&mut used, cb.width, cb.rtl, false);
    let container = Container::new(tree, id, index, FragmentKind::Block, used, clearance);
    block_container_layout(
        ctx,
        &container,
        max_y,
        skip,
        page_is_empty,
        absolute_boxes,
        fixed_boxes,
        adjoining,
        discard,
    )
}

/// Size a block-level replaced box and keep it clear of the floats.
fn block_replaced_box_layout(
    ctx: &LayoutContext,
    id: BoxId,
    index: usize,
    mut used: UsedBox,
    (intrinsic_width, intrinsic_height): (f64, f64),
    clearance: Option<f64>,
    cb: &ContainingBlock,
) -> Fragment {
    let (width, height) = replaced_size(&used, intrinsic_width, intrinsic_height);
    used.width = Some(width);
    used.height = Some(height);
    solve_block_width(&mut used, cb.width, cb.rtl, false);

    let mut fragment = Fragment::from_used(FragmentKind::Replaced, id, index, &used);
    fragment.clearance = clearance;
    let candidate = CollisionBox {
        y: fragment.y,
        width: fragment.border_width(),
        height: fragment.border_height(),
        margin_left: fragment.margin.left,
        margin_right: fragment.margin.right,
        margin_top: fragment.margin.top,
        float: Float::None,
        is_line: false,
    };
    let (x, y, _) = avoid_collisions(ctx.excluded_shapes(), &candidate, cb, false);
    fragment.translate(x - fragment.x, y - fragment.y);
    fragment
}

/// Lay out the children of a block container and size it.
///
/// Returns no fragment when nothing could be placed on this page.
#[allow(clippy::too_many_arguments)]
pub(crate) fn block_container_layout(
    ctx: &mut LayoutContext,
    container: &Container,
    max_y: f64,
    skip: Option<&SkipStack>,
    page_is_empty: bool,
    absolute_boxes: &mut Vec<Placeholder>,
    fixed_boxes: &mut Vec<Placeholder>,
    adjoining: Vec<f64>,
    discard: bool,
) -> (Option<Fragment>, BlockLayout) {
    let tree = ctx.tree;
    if container.new_bfc {
        ctx.create_block_formatting_context();
    }
    let rollback = Rollback::mark(ctx, absolute_boxes, fixed_boxes);

    // A relatively positioned box is the containing block of its
    // absolutely positioned descendants.
    let relative = container.style.is_relative();
    let mut own_absolute = Vec::new();
    let absolute_list = if relative {
        &mut own_absolute
    } else {
        &mut *absolute_boxes
    };

    let result = lay_out_children(
        ctx,
        container,
        max_y,
        skip,
        page_is_empty,
        absolute_list,
        fixed_boxes,
        adjoining,
        discard,
    );
    let (mut fragment, mut layout, fragmented) = match result {
        Ok(result) => result,
        Err(layout) => {
            rollback.undo(ctx, absolute_boxes, fixed_boxes);
            if container.new_bfc {
                ctx.discard_block_formatting_context();
            }
            return (None, layout);
        }
    };

    if relative {
        let cb = ContainingBlock {
            x: fragment.padding_box_x(),
            y: fragment.padding_box_y(),
            width: fragment.padding_width(),
            height: Some(fragment.padding_height()),
            rtl: container.style.direction == Direction::Rtl,
        };
        for placeholder in &own_absolute {
            absolute_layout(ctx, placeholder, &cb, &mut fragment, fixed_boxes);
        }
    }

    let (cb_width, cb_height) = (fragment.width, fragment.height);
    for child in &mut fragment.children {
        relative_positioning(tree, child, cb_width, Some(cb_height));
    }

    if container.new_bfc {
        ctx.finish_block_formatting_context(&mut fragment, container.used.height.is_none());
    }

    if discard || !fragmented {
        fragment.height = container.used.clamp_height(fragment.height);
    } else if max_y.is_finite() {
        // A broken box fills the page down to its bottom edge.
        let decorations = fragment.margin_height() - fragment.height;
        fragment.height = (max_y - fragment.y - decorations).max(0.0);
    }

    if layout.next_page.page.is_none() {
        layout.next_page.page = Some(tree.node(container.id).page_end.clone());
    }
    (Some(fragment), layout)
}

fn last_in_flow(children: &[Fragment]) -> Option<&Fragment> {
    children.iter().rev().find(|child| child.is_in_normal_flow())
}

fn remove_fragment_placeholders(
    fragment: &Fragment,
    absolute_boxes: &mut Vec<Placeholder>,
    fixed_boxes: &mut Vec<Placeholder>,
) {
    let mut ids = Vec::new();
    fragment.placeholder_ids(&mut ids);
    remove_placeholders(&ids, absolute_boxes, fixed_boxes);
}

/// `Err` cancels the container: it must be laid out on the next page.
#[allow(clippy::too_many_arguments)]
fn lay_out_children(
    ctx: &mut LayoutContext,
    container: &Container,
    max_y: f64,
    skip: Option<&SkipStack>,
    page_is_empty: bool,
    absolute_boxes: &mut Vec<Placeholder>,
    fixed_boxes: &mut Vec<Placeholder>,
    adjoining: Vec<f64>,
    discard: bool,
) -> Result<(Fragment, BlockLayout, bool), BlockLayout> {
    let tree = ctx.tree;
    let style = container.style;
    let page_start = || Some(tree.node(container.id).page_start.clone());

    // Absorb floating point rounding errors.
    let allowed_max_y = max_y * (1.0 + 1e-9);

    let mut used = container.used.clone();
    let is_start = skip.is_none();
    let slice = style.box_decoration_break == BoxDecorationBreak::Slice;
    if slice && !is_start {
        used.margin.top = Some(0.0);
        used.padding.top = 0.0;
        used.border.top = 0.0;
    }
    // Children leave room for bottom decorations drawn on every fragment.
    let max_y = if discard || style.box_decoration_break == BoxDecorationBreak::Clone {
        max_y - used.bottom_spacing()
    } else {
        max_y
    };

    let mut margins = AdjoiningMargins::inherit(adjoining);
    margins.push(used.margin_top());

    let collapsing_with_children = !(used.border.top != 0.0
        || used.padding.top != 0.0
        || container.is_flex_item
        || container.establishes_fc
        || container.is_for_root);
    let mut top_settled = !collapsing_with_children;
    let mut position_y = if collapsing_with_children {
        used.y
    } else {
        used.y += margins.collapse() - used.margin_top();
        margins.clear();
        used.content_box_y()
    };

    let position_x = used.content_box_x();
    let child_cb = ContainingBlock {
        x: position_x,
        y: used.content_box_y(),
        width: used.width.unwrap_or(0.0),
        height: used.height,
        rtl: style.direction == Direction::Rtl,
    };

    let mut new_children: Vec<Fragment> = Vec::new();
    let mut next_page = NextPage::default();
    let mut resume_at: Option<SkipStack> = None;
    let mut stopped = false;

    let skip_index = skip.map_or(container.child_base, |skip| skip.skip);
    let mut child_skip = skip.and_then(SkipStack::inner).cloned();
    let first = skip_index.saturating_sub(container.child_base);

    for (offset, &child_id) in container.children.iter().enumerate().skip(first) {
        let index = container.child_base + offset;
        let child = tree.node(child_id);
        let child_style = &child.style;

        // ── Out of flow ─────────────────────────────────────────
        if !child_style.is_in_normal_flow() {
            let static_y = position_y + margins.collapse();
            if child_style.is_absolutely_positioned() {
                let id = ctx.next_placeholder_id();
                let is_fixed = child_style.position == Position::Fixed;
                let mut fragment = Fragment::empty(FragmentKind::Placeholder { id }, child_id);
                fragment.index = index;
                fragment.x = position_x;
                fragment.y = static_y;
                fragment.flow = if is_fixed { Flow::Fixed } else { Flow::Absolute };
                new_children.push(fragment);
                let placeholder = Placeholder {
                    id,
                    box_id: child_id,
                    index,
                    x: position_x,
                    y: static_y,
                };
                if is_fixed {
                    fixed_boxes.push(placeholder);
                } else {
                    absolute_boxes.push(placeholder);
                }
            } else if child_style.is_floated() {
                let shapes = ctx.excluded_shapes_len();
                let float = float_layout(
                    ctx,
                    child_id,
                    index,
                    &child_cb,
                    position_x,
                    static_y,
                    absolute_boxes,
                    fixed_boxes,
                );
                if (page_is_empty && new_children.is_empty()) || float.border_box_bottom() <= allowed_max_y {
                    new_children.push(float);
                } else {
                    ctx.truncate_excluded_shapes(shapes);
                    remove_fragment_placeholders(&float, absolute_boxes, fixed_boxes);
                    let page_break = match last_in_flow(&new_children) {
                        Some(last) => block_level_page_break(tree, Sibling::Laid(last), Sibling::Pending(child_id)),
                        None => BreakValue::Auto,
                    };
                    if !new_children.is_empty() && page_break.is_avoid() {
                        if let Some((children, resume)) =
                            find_earlier_page_break(tree, &new_children, absolute_boxes, fixed_boxes)
                        {
                            new_children = children;
                            resume_at = Some(resume);
                            stopped = true;
                            break;
                        }
                    }
                    resume_at = Some(SkipStack::new(index));
                    stopped = true;
                    break;
                }
            } else if let Position::Running(name) = &child_style.position {
                ctx.add_running_element(name, child_id);
            }
            continue;
        }

        // ── Lines ───────────────────────────────────────────────
        if let BoxKind::Line { .. } = child.kind {
            if !margins.is_empty() {
                position_y += margins.collapse();
                margins.clear();
            }
            let line_skip = child_skip.take();
            let mut lines = iter_line_boxes(ctx, child_id, position_y, line_skip.as_ref(), &child_cb);
            let mut page_break = false;
            while let Some(mut line) = lines.next() {
                line.index = index;
                let mut new_position_y = line.y + line.height;
                let offset_y = if line.resume_at.is_none()
                    || style.box_decoration_break == BoxDecorationBreak::Clone
                {
                    used.border.bottom + used.padding.bottom
                } else {
                    0.0
                };

                // The first line of an empty page goes in even when it is
                // taller than the page.
                if new_position_y + offset_y > allowed_max_y && (!new_children.is_empty() || !page_is_empty) {
                    let over_orphans = new_children.len() as i64 - i64::from(style.orphans);
                    if over_orphans < 0 && !page_is_empty {
                        return Err(BlockLayout::canceled(Some(child.page_start.clone())));
                    }
                    // Lines the next page lacks for widows, besides this one.
                    let remaining = lines.len() as i64;
                    let needed = (i64::from(style.widows) - 1 - remaining).max(0);
                    if needed > over_orphans && !page_is_empty {
                        return Err(BlockLayout::canceled(Some(child.page_start.clone())));
                    }
                    if needed > 0 && needed <= over_orphans {
                        let keep = new_children.len() - needed as usize;
                        new_children.truncate(keep);
                    }
                    page_break = true;
                    break;
                } else if page_is_empty && new_position_y > allowed_max_y {
                    let margin_top = used.margin_top();
                    new_position_y -= margin_top;
                    line.translate(0.0, -margin_top);
                    used.margin.top = Some(0.0);
                }
                position_y = new_position_y;
                new_children.push(line);
            }
            if let Some(last) = new_children.last() {
                resume_at = Some(SkipStack::nested(index, last.resume_at.clone()));
            }
            if page_break {
                stopped = true;
                break;
            }
            continue;
        }

        // ── In-flow block-level children ────────────────────────
        let mut page_break = BreakValue::Auto;
        let last = last_in_flow(&new_children);
        if let Some(last) = last {
            page_break = block_level_page_break(tree, Sibling::Laid(last), Sibling::Pending(child_id));
            let page_name = block_level_page_name(tree, Sibling::Laid(last), Sibling::Pending(child_id));
            if page_name.is_some() || page_break.is_forced() {
                next_page = NextPage {
                    kind: page_break.into(),
                    page: Some(child.page_start.clone()),
                };
                resume_at = Some(SkipStack::new(index));
                stopped = true;
                break;
            }
        } else if collapsing_with_children && !top_settled {
            // The first in-flow child's top margin joins ours, unless it
            // needs clearance.
            let child_margin_top = resolve_percentages(child_style, &child_cb).margin_top();
            let old_collapsed = margins.collapse();
            let new_collapsed = margins.collapse_with(child_margin_top);
            let difference = new_collapsed - old_collapsed;
            for previous in &mut new_children {
                previous.translate(0.0, difference);
            }
            let clearance = get_clearance(ctx.excluded_shapes(), child_style.clear, position_y, new_collapsed);
            if clearance.is_some() {
                for previous in &mut new_children {
                    previous.translate(0.0, -difference);
                }
                used.y += margins.collapse() - used.margin_top();
                margins.clear();
                position_y = used.content_box_y();
                top_settled = true;
            }
        }

        let page_is_empty_with_no_children =
            page_is_empty && new_children.iter().all(Fragment::is_placeholder);

        let margins_before = margins.clone();
        let shapes = ctx.excluded_shapes_len();
        let nested_skip = child_skip.take();
        let (new_child, child_layout) = block_level_layout(
            ctx,
            child_id,
            index,
            position_x,
            position_y,
            max_y,
            nested_skip.as_ref(),
            &child_cb,
            page_is_empty_with_no_children,
            absolute_boxes,
            fixed_boxes,
            margins.as_slice().to_vec(),
            discard,
        );
        next_page = child_layout.next_page.clone();

        let new_child = match new_child {
            Some(mut new_child) => {
                let settles_itself = matches!(child.kind, BoxKind::Block | BoxKind::Table { .. });
                if settles_itself {
                    margins.extend_from_child(&child_layout.leading_margins);
                    margins.adopt(child_layout.adjoining_margins, child_layout.adjoining_shared);
                } else {
                    margins.push(new_child.margin.top);
                    if new_child.clearance.is_none() {
                        let offset = margins.collapse() - new_child.margin.top;
                        new_child.translate(0.0, offset);
                    }
                    margins.clear();
                }
                margins.push(new_child.margin.bottom);

                let mut overflows = false;
                if !child_layout.collapsing_through {
                    let new_position_y = new_child.border_box_bottom();
                    if new_position_y > allowed_max_y && !page_is_empty_with_no_children {
                        overflows = true;
                    } else {
                        position_y = new_position_y;
                    }
                }
                if overflows {
                    remove_fragment_placeholders(&new_child, absolute_boxes, fixed_boxes);
                    ctx.truncate_excluded_shapes(shapes);
                    margins = margins_before;
                    None
                } else {
                    if new_child.clearance.is_some() {
                        position_y = new_child.border_box_bottom();
                    }
                    Some(new_child)
                }
            }
            None => None,
        };

        let Some(new_child) = new_child else {
            // Nothing of this child fits: break before it, or earlier.
            if page_break.is_avoid() {
                if let Some((children, resume)) =
                    find_earlier_page_break(tree, &new_children, absolute_boxes, fixed_boxes)
                {
                    new_children = children;
                    resume_at = Some(resume);
                    stopped = true;
                    break;
                }
                if !page_is_empty {
                    return Err(BlockLayout::canceled(Some(child.page_start.clone())));
                }
            }
            if new_children
                .iter()
                .all(|child| matches!(child.flow, Flow::Absolute | Flow::Fixed))
            {
                // Only placeholders: keep them for the next page.
                for child in &new_children {
                    remove_fragment_placeholders(child, absolute_boxes, fixed_boxes);
                }
                new_children.clear();
            }
            if new_children.is_empty() {
                return Err(BlockLayout::canceled(Some(child.page_start.clone())));
            }
            resume_at = Some(SkipStack::new(index));
            stopped = true;
            break;
        };

        new_children.push(new_child);
        if let Some(child_resume) = child_layout.resume_at {
            resume_at = Some(SkipStack::nested(index, Some(child_resume)));
            stopped = true;
            break;
        }
    }

    if !stopped {
        resume_at = None;
    }
    let fragmented = resume_at.is_some();

    if fragmented && style.break_inside.is_avoid() && !page_is_empty {
        return Err(BlockLayout::canceled(page_start()));
    }

    if !top_settled {
        used.y += collapse_margin(&margins.box_margins()) - used.margin_top();
    }

    let mut collapsing_through = false;
    if last_in_flow(&new_children).is_none() {
        let collapsed = margins.collapse();
        let no_height = used.height.is_none() || used.height == Some(0.0);
        let clearance = get_clearance(ctx.excluded_shapes(), style.clear, used.y, collapsed);
        if no_height
            && clearance.is_none()
            && used.min_height == 0.0
            && used.border.top == 0.0
            && used.padding.top == 0.0
            && used.border.bottom == 0.0
            && used.padding.bottom == 0.0
        {
            collapsing_through = true;
        } else {
            position_y += collapsed;
            margins.clear();
        }
    } else if used.height.is_some() {
        // The last child's bottom margin does not adjoin ours.
        margins.clear();
    }

    if used.border.bottom != 0.0
        || used.padding.bottom != 0.0
        || container.establishes_fc
        || container.is_for_root
        || container.is_flex_item
    {
        position_y += margins.collapse();
        margins.clear();
    }

    let mut fragment = Fragment::from_used(container.kind.clone(), container.id, container.index, &used);
    fragment.clearance = container.clearance;
    fragment.children = new_children;
    if slice && fragmented && !discard {
        fragment.remove_decoration(false, true);
    }
    if used.height.is_none() {
        fragment.height = (position_y - fragment.content_box_y()).max(0.0);
    }

    let (adjoining_margins, adjoining_shared, leading_margins) = margins.into_parts();
    let layout = BlockLayout {
        resume_at,
        next_page,
        adjoining_margins,
        adjoining_shared,
        leading_margins,
        collapsing_through,
    };
    Ok((fragment, layout, fragmented))
}

/// Shift a relatively positioned fragment by its offsets. Percentages
/// refer to the containing block; `left` wins over `right` in
/// left-to-right text and loses in right-to-left text.
pub(crate) fn relative_positioning(tree: &BoxTree, fragment: &mut Fragment, cb_width: f64, cb_height: Option<f64>) {
    if fragment.is_placeholder() || fragment.is_line() {
        return;
    }
    let style = fragment.style(tree);
    if !style.is_relative() {
        return;
    }
    let left = style.left.resolve(cb_width);
    let right = style.right.resolve(cb_width);
    let dx = match (left, right) {
        (Some(left), Some(right)) => {
            if style.direction == Direction::Ltr {
                left
            } else {
                -right
            }
        }
        (Some(left), None) => left,
        (None, Some(right)) => -right,
        (None, None) => 0.0,
    };
    let dy = match (style.top.resolve_opt(cb_height), style.bottom.resolve_opt(cb_height)) {
        (Some(top), _) => top,
        (None, Some(bottom)) => -bottom,
        (None, None) => 0.0,
    };
    fragment.translate(dx, dy);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::test_support::*;
    use crate::layout::Page;
    use crate::model::Node;
    use crate::style::{BreakInside, Clear, Dimension, EdgeValues, Style};

    fn vertical_margins(top: f64, bottom: f64) -> Option<EdgeValues<Dimension>> {
        Some(EdgeValues {
            top: Dimension::Pt(top),
            right: Dimension::Pt(0.0),
            bottom: Dimension::Pt(bottom),
            left: Dimension::Pt(0.0),
        })
    }

    fn block(height: f64, style: Style) -> Node {
        Node::view(
            Style {
                height: Some(Dimension::Pt(height)),
                ..style
            },
            vec![],
        )
    }

    fn body(page: &Page) -> &[Fragment] {
        &page.root.children
    }

    /// Each word on its own 10pt line.
    fn paragraph(words: usize, style: Style) -> Node {
        let text: Vec<&str> = std::iter::repeat("aaaa").take(words).collect();
        Node::text(
            &text.join(" "),
            Style {
                font_size: Some(10.0),
                line_height: Some(1.0),
                ..style
            },
        )
    }

    #[test]
    fn blocks_stack_and_break() {
        let doc = default_doc(vec![make_block(30.0), make_block(30.0)], 100.0, 65.0);
        let pages = layout_doc(&doc);
        assert_eq!(pages.len(), 1);
        let children = body(&pages[0]);
        assert_eq!((children[0].y, children[1].y), (0.0, 30.0));

        let doc = default_doc(
            vec![make_block(30.0), make_block(30.0), make_block(30.0)],
            100.0,
            65.0,
        );
        let pages = layout_doc(&doc);
        assert_eq!(pages.len(), 2);
        assert_eq!(body(&pages[0]).len(), 2);
        let third = &body(&pages[1])[0];
        assert_eq!(third.y, 0.0);
        assert_eq!(third.index, 2);
    }

    #[test]
    fn sibling_margins_collapse() {
        let doc = default_doc(
            vec![
                block(10.0, Style {
                    margin: vertical_margins(0.0, 20.0),
                    ..Default::default()
                }),
                block(10.0, Style {
                    margin: vertical_margins(10.0, 0.0),
                    ..Default::default()
                }),
            ],
            100.0,
            200.0,
        );
        let pages = layout_doc(&doc);
        assert_eq!(body(&pages[0])[1].border_box_y(), 30.0);
    }

    #[test]
    fn parent_and_first_child_margins_collapse() {
        let doc = default_doc(
            vec![make_styled_view(
                Style {
                    margin: vertical_margins(10.0, 0.0),
                    ..Default::default()
                },
                vec![block(10.0, Style {
                    margin: vertical_margins(20.0, 0.0),
                    ..Default::default()
                })],
            )],
            100.0,
            200.0,
        );
        let pages = layout_doc(&doc);
        let parent = &body(&pages[0])[0];
        assert_eq!(parent.border_box_y(), 20.0);
        assert_eq!(parent.children[0].border_box_y(), 20.0);
        assert_eq!(parent.height, 10.0);
    }

    #[test]
    fn empty_blocks_collapse_through() {
        let doc = default_doc(
            vec![
                make_block(10.0),
                make_styled_view(
                    Style {
                        margin: vertical_margins(8.0, 15.0),
                        ..Default::default()
                    },
                    vec![],
                ),
                block(10.0, Style {
                    margin: vertical_margins(5.0, 0.0),
                    ..Default::default()
                }),
            ],
            100.0,
            200.0,
        );
        let pages = layout_doc(&doc);
        assert_eq!(body(&pages[0])[2].border_box_y(), 25.0);
    }

    #[test]
    fn padding_stops_collapsing() {
        let doc = default_doc(
            vec![make_styled_view(
                Style {
                    margin: vertical_margins(10.0, 0.0),
                    padding: Some(EdgeValues::uniform(Dimension::Pt(5.0))),
                    ..Default::default()
                },
                vec![block(10.0, Style {
                    margin: vertical_margins(20.0, 0.0),
                    ..Default::default()
                })],
            )],
            100.0,
            200.0,
        );
        let pages = layout_doc(&doc);
        let parent = &body(&pages[0])[0];
        assert_eq!(parent.border_box_y(), 10.0);
        assert_eq!(parent.children[0].border_box_y(), 35.0);
        assert_eq!(parent.height, 30.0);
    }

    #[test]
    fn break_after_avoid_keeps_blocks_together() {
        let doc = default_doc(
            vec![
                make_block(30.0),
                block(30.0, Style {
                    break_after: Some(BreakValue::Avoid),
                    ..Default::default()
                }),
                make_block(30.0),
            ],
            100.0,
            65.0,
        );
        let pages = layout_doc(&doc);
        assert_eq!(pages.len(), 2);
        assert_eq!(body(&pages[0]).len(), 1);
        let second: Vec<usize> = body(&pages[1]).iter().map(|f| f.index).collect();
        assert_eq!(second, vec![1, 2]);
        assert_eq!(body(&pages[1])[0].y, 0.0);
    }

    #[test]
    fn forced_breaks_start_a_new_page() {
        let doc = default_doc(
            vec![
                make_block(10.0),
                block(10.0, Style {
                    break_before: Some(BreakValue::Page),
                    ..Default::default()
                }),
            ],
            100.0,
            200.0,
        );
        let pages = layout_doc(&doc);
        assert_eq!(pages.len(), 2);
        assert_eq!(body(&pages[1])[0].index, 1);
    }

    #[test]
    fn widows_pull_lines_to_the_next_page() {
        // Six lines fit; seven would leave a single widow.
        let doc = default_doc(vec![paragraph(7, Style::default())], 30.0, 65.0);
        let pages = layout_doc(&doc);
        assert_eq!(pages.len(), 2);
        assert_eq!(body(&pages[0])[0].children.len(), 5);
        assert_eq!(body(&pages[1])[0].children.len(), 2);

        let doc = default_doc(vec![paragraph(8, Style::default())], 30.0, 65.0);
        let pages = layout_doc(&doc);
        assert_eq!(body(&pages[0])[0].children.len(), 6);
        assert_eq!(body(&pages[1])[0].children.len(), 2);
    }

    #[test]
    fn orphans_move_the_whole_paragraph() {
        let doc = default_doc(
            vec![
                make_block(45.0),
                paragraph(4, Style {
                    orphans: Some(3),
                    ..Default::default()
                }),
            ],
            30.0,
            65.0,
        );
        let pages = layout_doc(&doc);
        assert_eq!(pages.len(), 2);
        assert_eq!(body(&pages[0]).len(), 1);
        let paragraph = &body(&pages[1])[0];
        assert_eq!(paragraph.children.len(), 4);
        assert_eq!(paragraph.y, 0.0);
    }

    #[test]
    fn broken_blocks_fill_the_page() {
        let doc = default_doc(
            vec![make_styled_view(
                Style::default(),
                vec![make_block(40.0), make_block(40.0)],
            )],
            100.0,
            65.0,
        );
        let pages = layout_doc(&doc);
        assert_eq!(pages.len(), 2);
        assert_eq!(body(&pages[0])[0].height, 65.0);
        assert_eq!(body(&pages[1])[0].height, 40.0);
    }

    #[test]
    fn break_inside_avoid_moves_the_block() {
        let doc = default_doc(
            vec![
                make_block(30.0),
                make_styled_view(
                    Style {
                        break_inside: Some(BreakInside::Avoid),
                        ..Default::default()
                    },
                    vec![make_block(20.0), make_block(20.0)],
                ),
            ],
            100.0,
            65.0,
        );
        let pages = layout_doc(&doc);
        assert_eq!(pages.len(), 2);
        assert_eq!(body(&pages[0]).len(), 1);
        assert_eq!(body(&pages[1])[0].children.len(), 2);
    }

    #[test]
    fn top_margins_are_truncated_after_unforced_breaks() {
        let doc = default_doc(
            vec![
                make_block(60.0),
                block(20.0, Style {
                    margin: vertical_margins(10.0, 0.0),
                    ..Default::default()
                }),
            ],
            100.0,
            65.0,
        );
        let pages = layout_doc(&doc);
        assert_eq!(body(&pages[1])[0].border_box_y(), 0.0);
    }

    #[test]
    fn discarded_margins_drop_after_forced_breaks() {
        let doc = default_doc(
            vec![
                make_block(10.0),
                block(20.0, Style {
                    break_before: Some(BreakValue::Page),
                    margin: vertical_margins(10.0, 0.0),
                    margin_break: Some(MarginBreak::Discard),
                    ..Default::default()
                }),
            ],
            100.0,
            65.0,
        );
        let pages = layout_doc(&doc);
        assert_eq!(pages.len(), 2);
        assert_eq!(body(&pages[1])[0].border_box_y(), 0.0);
    }

    #[test]
    fn kept_margins_survive_unforced_breaks() {
        let doc = default_doc(
            vec![
                make_block(60.0),
                block(20.0, Style {
                    margin: vertical_margins(10.0, 0.0),
                    margin_break: Some(MarginBreak::Keep),
                    ..Default::default()
                }),
            ],
            100.0,
            65.0,
        );
        let pages = layout_doc(&doc);
        assert_eq!(pages.len(), 2);
        assert_eq!(body(&pages[1])[0].border_box_y(), 10.0);
    }

    fn bordered(decoration: BoxDecorationBreak) -> Vec<Page> {
        let doc = default_doc(
            vec![make_styled_view(
                Style {
                    border_width: Some(crate::model::Edges::uniform(5.0)),
                    box_decoration_break: Some(decoration),
                    ..Default::default()
                },
                vec![make_block(40.0), make_block(40.0)],
            )],
            100.0,
            65.0,
        );
        layout_doc(&doc)
    }

    #[test]
    fn sliced_decorations_open_at_the_break() {
        let pages = bordered(BoxDecorationBreak::Slice);
        assert_eq!(pages.len(), 2);
        let first = &body(&pages[0])[0];
        assert_eq!((first.border.top, first.border.bottom), (5.0, 0.0));
        let second = &body(&pages[1])[0];
        assert_eq!((second.border.top, second.border.bottom), (0.0, 5.0));
        assert_eq!(second.children[0].y, 0.0);
    }

    #[test]
    fn cloned_decorations_wrap_every_fragment() {
        let pages = bordered(BoxDecorationBreak::Clone);
        assert_eq!(pages.len(), 2);
        for page in &pages {
            let fragment = &body(page)[0];
            assert_eq!((fragment.border.top, fragment.border.bottom), (5.0, 5.0));
            assert_eq!(fragment.children.len(), 1);
            assert_eq!(fragment.children[0].y, 5.0);
        }
    }

    #[test]
    fn floats_past_the_page_bottom_move_to_the_next_page() {
        let doc = default_doc(
            vec![
                make_block(40.0),
                block(40.0, Style {
                    float: Some(Float::Left),
                    width: Some(Dimension::Pt(20.0)),
                    ..Default::default()
                }),
            ],
            100.0,
            65.0,
        );
        let pages = layout_doc(&doc);
        assert_eq!(pages.len(), 2);
        assert_eq!(body(&pages[0]).len(), 1);
        let float = &body(&pages[1])[0];
        assert_eq!((float.index, float.flow), (1, Flow::Float));
        assert_eq!(float.border_box_y(), 0.0);
    }

    #[test]
    fn clearance_moves_below_floats() {
        let doc = default_doc(
            vec![
                block(30.0, Style {
                    float: Some(Float::Left),
                    width: Some(Dimension::Pt(20.0)),
                    ..Default::default()
                }),
                block(10.0, Style {
                    clear: Some(Clear::Left),
                    ..Default::default()
                }),
            ],
            100.0,
            200.0,
        );
        let pages = layout_doc(&doc);
        let children = body(&pages[0]);
        assert_eq!(children[0].flow, Flow::Float);
        assert_eq!(children[1].border_box_y(), 30.0);
        assert!(children[1].clearance.is_some());
    }

    #[test]
    fn relative_offsets_translate_after_layout() {
        let doc = default_doc(
            vec![
                block(10.0, Style {
                    position: Some(Position::Relative),
                    top: Some(Dimension::Pt(5.0)),
                    left: Some(Dimension::Pt(7.0)),
                    ..Default::default()
                }),
                make_block(10.0),
            ],
            100.0,
            200.0,
        );
        let pages = layout_doc(&doc);
        let children = body(&pages[0]);
        assert_eq!((children[0].x, children[0].y), (7.0, 5.0));
        // Siblings keep their static positions.
        assert_eq!(children[1].y, 10.0);
    }

    #[test]
    fn replaced_boxes_center_with_auto_margins() {
        let doc = default_doc(
            vec![Node::image(
                40.0,
                20.0,
                Style {
                    margin: Some(EdgeValues::symmetric(Dimension::Pt(0.0), Dimension::Auto)),
                    ..Default::default()
                },
            )],
            100.0,
            200.0,
        );
        let pages = layout_doc(&doc);
        let image = &body(&pages[0])[0];
        assert_eq!(image.kind, FragmentKind::Replaced);
        assert_eq!(image.border_box_x(), 30.0);
        assert_eq!((image.width, image.height), (40.0, 20.0));
    }
}
