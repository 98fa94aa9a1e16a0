//! # Flex Layout
//!
//! Row flex containers split their items into flex lines, distribute the
//! free space of each line by `flex-grow` and `flex-shrink`, and align the
//! items across the line. Pages break between flex lines, never inside one.
//!
//! Column flex containers stack their items with the block container
//! algorithm; their items never collapse margins with the container.

use super::absolute::absolute_layout;
use super::block::{block_container_layout, block_level_layout, relative_positioning, Container};
use super::fragment::{Flow, Fragment, FragmentKind};
use super::percentages::{resolve_percentages, UsedBox};
use super::preferred::{max_content_width, min_content_width};
use super::width::block_level_width;
use super::{BlockLayout, ContainingBlock, LayoutContext, NextPage, Placeholder, Rollback, SkipStack};
use crate::boxes::{BoxId, BoxKind};
use crate::style::{AlignItems, Dimension, Direction, FlexDirection, FlexWrap, Position};

/// A run of items laid out on one flex line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapLine {
    /// Index of the first item in this line.
    pub start: usize,
    /// One past the last item.
    pub end: usize,
}

/// Split items into lines no wider than `available_width`. Every line takes
/// at least one item, so oversized items get a line of their own.
pub fn partition_into_lines(base_widths: &[f64], gap: f64, available_width: f64) -> Vec<WrapLine> {
    if base_widths.is_empty() {
        return vec![];
    }

    let mut lines = Vec::new();
    let mut line_start = 0;
    let mut line_width = 0.0;
    for (i, &width) in base_widths.iter().enumerate() {
        let needed = if i == line_start { width } else { gap + width };
        if i > line_start && line_width + needed > available_width {
            lines.push(WrapLine {
                start: line_start,
                end: i,
            });
            line_start = i;
            line_width = width;
        } else {
            line_width += needed;
        }
    }
    lines.push(WrapLine {
        start: line_start,
        end: base_widths.len(),
    });
    lines
}

/// Share `remaining` free space among `(width, flex_grow)` items.
pub fn distribute_grow(items: &mut [(f64, f64)], remaining: f64) {
    let total_grow: f64 = items.iter().map(|(_, grow)| grow).sum();
    if total_grow <= 0.0 || remaining <= 0.0 {
        return;
    }
    for (width, grow) in items.iter_mut() {
        *width += remaining * (*grow / total_grow);
    }
}

/// Take a negative `overflow` back from `(width, flex_shrink)` items, in
/// proportion to their scaled shrink factors.
pub fn distribute_shrink(items: &mut [(f64, f64)], overflow: f64) {
    let total_shrink_weighted: f64 = items.iter().map(|(width, shrink)| width * shrink).sum();
    if total_shrink_weighted <= 0.0 || overflow >= 0.0 {
        return;
    }
    let overflow = overflow.abs();
    for (width, shrink) in items.iter_mut() {
        let factor = (*width * *shrink) / total_shrink_weighted;
        *width = (*width - overflow * factor).max(0.0);
    }
}

/// An in-flow item with its outer sizes.
struct FlexItem {
    id: BoxId,
    index: usize,
    /// Outer hypothetical width.
    base: f64,
    /// Outer min-content width, the floor when shrinking.
    floor: f64,
    /// Margins, borders and paddings.
    extra: f64,
}

/// Lay out the flex container `id` with its margin box at `used.x`/`used.y`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn flex_layout(
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
) -> (Option<Fragment>, BlockLayout) {
    let tree = ctx.tree;
    let style = &tree.node(id).style;
    if !style.is_floated() && !style.is_absolutely_positioned() {
        block_level_width(&mut used, cb.width, cb.rtl, false);
    }

    if style.flex_direction == FlexDirection::Column {
        let container = Container::new(tree, id, index, FragmentKind::Flex, used, clearance);
        let (fragment, layout) = block_container_layout(
            ctx,
            &container,
            max_y,
            skip,
            page_is_empty,
            absolute_boxes,
            fixed_boxes,
            Vec::new(),
            false,
        );
        return (fragment, BlockLayout::settled(layout.resume_at, layout.next_page));
    }

    ctx.create_block_formatting_context();
    let result = flex_row_layout(
        ctx,
        id,
        index,
        used,
        max_y,
        skip,
        page_is_empty,
        absolute_boxes,
        fixed_boxes,
    );
    match result {
        Some((mut fragment, layout)) => {
            fragment.clearance = clearance;
            ctx.finish_block_formatting_context(&mut fragment, false);
            (Some(fragment), layout)
        }
        None => {
            ctx.discard_block_formatting_context();
            let page = Some(tree.node(id).page_start.clone());
            (None, BlockLayout::canceled(page))
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn flex_row_layout(
    ctx: &mut LayoutContext,
    id: BoxId,
    index: usize,
    used: UsedBox,
    max_y: f64,
    skip: Option<&SkipStack>,
    page_is_empty: bool,
    absolute_boxes: &mut Vec<Placeholder>,
    fixed_boxes: &mut Vec<Placeholder>,
) -> Option<(Fragment, BlockLayout)> {
    let tree = ctx.tree;
    let node = tree.node(id);
    let style = &node.style;
    let allowed_max_y = max_y * (1.0 + 1e-9);
    let rollback = Rollback::mark(ctx, absolute_boxes, fixed_boxes);

    let relative = style.is_relative();
    let mut own_absolute = Vec::new();
    let absolute_list: &mut Vec<Placeholder> = if relative {
        &mut own_absolute
    } else {
        &mut *absolute_boxes
    };

    let available = used.width.unwrap_or(0.0);
    let content_x = used.content_box_x();
    let content_y = used.content_box_y();
    let rtl = style.direction == Direction::Rtl;
    let item_cb = ContainingBlock {
        x: content_x,
        y: content_y,
        width: available,
        height: used.height,
        rtl,
    };

    let mut children: Vec<Fragment> = Vec::new();
    let mut items: Vec<FlexItem> = Vec::new();
    let first = skip.map_or(0, |skip| skip.skip);
    for (child_index, &child_id) in node.children.iter().enumerate().skip(first) {
        let child_style = &tree.node(child_id).style;
        if child_style.is_absolutely_positioned() {
            let placeholder_id = ctx.next_placeholder_id();
            let is_fixed = child_style.position == Position::Fixed;
            let mut fragment = Fragment::empty(FragmentKind::Placeholder { id: placeholder_id }, child_id);
            fragment.index = child_index;
            fragment.x = content_x;
            fragment.y = content_y;
            fragment.flow = if is_fixed { Flow::Fixed } else { Flow::Absolute };
            children.push(fragment);
            let placeholder = Placeholder {
                id: placeholder_id,
                box_id: child_id,
                index: child_index,
                x: content_x,
                y: content_y,
            };
            if is_fixed {
                fixed_boxes.push(placeholder);
            } else {
                absolute_list.push(placeholder);
            }
            continue;
        }
        if let Position::Running(name) = &child_style.position {
            ctx.add_running_element(name, child_id);
            continue;
        }

        let outer = max_content_width(ctx, child_id, true);
        let extra = outer - max_content_width(ctx, child_id, false);
        let base = match child_style.flex_basis {
            Dimension::Pt(basis) => basis + extra,
            Dimension::Percent(percent) => available * percent / 100.0 + extra,
            Dimension::Auto => match child_style.width.resolve(available) {
                Some(width) if matches!(child_style.width, Dimension::Percent(_)) => width + extra,
                _ => outer,
            },
        };
        items.push(FlexItem {
            id: child_id,
            index: child_index,
            base,
            floor: min_content_width(ctx, child_id, true),
            extra,
        });
    }

    let bases: Vec<f64> = items.iter().map(|item| item.base).collect();
    let lines = match style.flex_wrap {
        FlexWrap::NoWrap if items.is_empty() => Vec::new(),
        FlexWrap::NoWrap => vec![WrapLine {
            start: 0,
            end: items.len(),
        }],
        FlexWrap::Wrap => partition_into_lines(&bases, style.gap, available),
    };

    let mut position_y = content_y;
    let mut resume_at: Option<SkipStack> = None;
    let mut placed_lines = 0;
    for line in &lines {
        let line_items = &items[line.start..line.end];
        let gaps = style.gap * line_items.len().saturating_sub(1) as f64;
        let mut widths: Vec<(f64, f64)> = line_items
            .iter()
            .map(|item| (item.base, tree.node(item.id).style.flex_grow))
            .collect();
        let free = available - gaps - bases[line.start..line.end].iter().sum::<f64>();
        if free > 0.0 {
            distribute_grow(&mut widths, free);
        } else if free < 0.0 {
            for (width, item) in widths.iter_mut().zip(line_items) {
                width.1 = tree.node(item.id).style.flex_shrink;
            }
            distribute_shrink(&mut widths, free);
            for (width, item) in widths.iter_mut().zip(line_items) {
                width.0 = width.0.max(item.floor);
            }
        }

        let line_top = if placed_lines > 0 {
            position_y + style.row_gap
        } else {
            position_y
        };
        let line_rollback = Rollback::mark(ctx, absolute_list, fixed_boxes);
        let mut line_fragments = Vec::with_capacity(line_items.len());
        let mut x = content_x;
        for (item, &(outer_width, _)) in line_items.iter().zip(&widths) {
            let item_x = if rtl {
                content_x + available - (x - content_x) - outer_width
            } else {
                x
            };
            let fragment = item_layout(
                ctx,
                item,
                item_x,
                line_top,
                outer_width,
                &item_cb,
                absolute_list,
                fixed_boxes,
            );
            line_fragments.push(fragment);
            x += outer_width + style.gap;
        }

        let line_height = line_fragments
            .iter()
            .map(Fragment::margin_height)
            .fold(0.0, f64::max);
        for fragment in &mut line_fragments {
            let item_style = fragment.style(tree);
            let slack = line_height - fragment.margin_height();
            match style.align_items {
                AlignItems::Stretch if item_style.height == Dimension::Auto => {
                    fragment.height += slack;
                }
                AlignItems::FlexEnd => fragment.translate(0.0, slack),
                AlignItems::Center => fragment.translate(0.0, slack / 2.0),
                _ => {}
            }
        }

        if line_top + line_height > allowed_max_y && (placed_lines > 0 || !page_is_empty) {
            line_rollback.undo(ctx, absolute_list, fixed_boxes);
            if placed_lines == 0 {
                rollback.undo(ctx, absolute_boxes, fixed_boxes);
                return None;
            }
            resume_at = Some(SkipStack::new(line_items[0].index));
            break;
        }
        children.extend(line_fragments);
        position_y = line_top + line_height;
        placed_lines += 1;
    }

    if resume_at.is_some() && style.break_inside.is_avoid() && !page_is_empty {
        rollback.undo(ctx, absolute_boxes, fixed_boxes);
        return None;
    }

    let mut fragment = Fragment::from_used(FragmentKind::Flex, id, index, &used);
    let content_height = position_y - content_y;
    fragment.height = used.clamp_height(used.height.unwrap_or(content_height));
    fragment.children = children;

    let (cb_width, cb_height) = (fragment.width, fragment.height);
    for child in &mut fragment.children {
        relative_positioning(tree, child, cb_width, Some(cb_height));
    }
    if relative {
        let abs_cb = ContainingBlock {
            x: fragment.padding_box_x(),
            y: fragment.padding_box_y(),
            width: fragment.padding_width(),
            height: Some(fragment.padding_height()),
            rtl,
        };
        for placeholder in &own_absolute {
            absolute_layout(ctx, placeholder, &abs_cb, &mut fragment, fixed_boxes);
        }
    }

    let page = if resume_at.is_some() {
        None
    } else {
        Some(node.page_end.clone())
    };
    Some((fragment, BlockLayout::settled(resume_at, NextPage::any(page))))
}

/// Lay out one item with its margin box at (`x`, `y`) and `outer_width`
/// wide. Block items take the flexed width as their used width; other
/// boxes size themselves against a containing block of that width.
#[allow(clippy::too_many_arguments)]
fn item_layout(
    ctx: &mut LayoutContext,
    item: &FlexItem,
    x: f64,
    y: f64,
    outer_width: f64,
    cb: &ContainingBlock,
    absolute_boxes: &mut Vec<Placeholder>,
    fixed_boxes: &mut Vec<Placeholder>,
) -> Fragment {
    let tree = ctx.tree;
    let node = tree.node(item.id);
    if node.kind == BoxKind::Block && !node.style.is_multicol() {
        let mut used = resolve_percentages(&node.style, cb);
        used.x = x;
        used.y = y;
        for margin in [
            &mut used.margin.top,
            &mut used.margin.right,
            &mut used.margin.bottom,
            &mut used.margin.left,
        ] {
            margin.get_or_insert(0.0);
        }
        used.width = Some((outer_width - item.extra).max(0.0));
        let container = Container::new(tree, item.id, item.index, FragmentKind::Block, used, None);
        let (fragment, _) = block_container_layout(
            ctx,
            &container,
            f64::INFINITY,
            None,
            true,
            absolute_boxes,
            fixed_boxes,
            Vec::new(),
            false,
        );
        return fragment
            .unwrap_or_else(|| Fragment::from_used(FragmentKind::Block, item.id, item.index, &container.used));
    }

    let item_cb = ContainingBlock {
        x,
        width: outer_width,
        ..*cb
    };
    let (fragment, _) = block_level_layout(
        ctx,
        item.id,
        item.index,
        x,
        y,
        f64::INFINITY,
        None,
        &item_cb,
        true,
        absolute_boxes,
        fixed_boxes,
        Vec::new(),
        false,
    );
    fragment.unwrap_or_else(|| {
        let mut empty = Fragment::empty(FragmentKind::Block, item.id);
        empty.index = item.index;
        empty.x = x;
        empty.y = y;
        empty
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::test_support::*;
    use crate::model::Node;
    use crate::style::{Display, Style};

    fn flex_row(style: Style, children: Vec<Node>) -> Node {
        Node::view(
            Style {
                display: Some(Display::Flex),
                ..style
            },
            children,
        )
    }

    fn item(width: f64, height: f64, grow: f64) -> Node {
        Node::view(
            Style {
                width: Some(Dimension::Pt(width)),
                height: Some(Dimension::Pt(height)),
                flex_grow: Some(grow),
                ..Default::default()
            },
            vec![],
        )
    }

    #[test]
    fn grow_distribution() {
        let mut items = vec![(100.0, 1.0), (100.0, 2.0)];
        distribute_grow(&mut items, 90.0);
        assert!((items[0].0 - 130.0).abs() < 0.01);
        assert!((items[1].0 - 160.0).abs() < 0.01);
    }

    #[test]
    fn shrink_takes_more_from_wider_items() {
        let mut items = vec![(200.0, 1.0), (100.0, 1.0)];
        distribute_shrink(&mut items, -60.0);
        assert!((items[0].0 - 160.0).abs() < 0.01);
        assert!((items[1].0 - 80.0).abs() < 0.01);
    }

    #[test]
    fn lines_take_at_least_one_item() {
        let lines = partition_into_lines(&[30.0, 30.0, 80.0, 10.0], 10.0, 75.0);
        assert_eq!(
            lines,
            vec![
                WrapLine { start: 0, end: 2 },
                WrapLine { start: 2, end: 3 },
                WrapLine { start: 3, end: 4 },
            ]
        );
        assert!(partition_into_lines(&[], 0.0, 10.0).is_empty());
    }

    #[test]
    fn items_sit_side_by_side_and_stretch() {
        let doc = default_doc(
            vec![flex_row(
                Style::default(),
                vec![
                    item(20.0, 10.0, 0.0),
                    Node::view(
                        Style {
                            width: Some(Dimension::Pt(30.0)),
                            ..Default::default()
                        },
                        vec![make_block(25.0)],
                    ),
                ],
            )],
            100.0,
            200.0,
        );
        let pages = layout_doc(&doc);
        let flex = &pages[0].root.children[0];
        assert_eq!(flex.kind, FragmentKind::Flex);
        assert_eq!(flex.height, 25.0);
        assert_eq!((flex.children[0].x, flex.children[1].x), (0.0, 20.0));
        // Fixed heights do not stretch.
        assert_eq!(flex.children[0].height, 10.0);
        assert_eq!(flex.children[1].height, 25.0);
    }

    #[test]
    fn free_space_goes_to_growing_items() {
        let doc = default_doc(
            vec![flex_row(
                Style::default(),
                vec![item(20.0, 10.0, 1.0), item(20.0, 10.0, 3.0)],
            )],
            100.0,
            200.0,
        );
        let pages = layout_doc(&doc);
        let flex = &pages[0].root.children[0];
        assert_eq!(flex.children[0].width, 35.0);
        assert_eq!(flex.children[1].width, 65.0);
        assert_eq!(flex.children[1].x, 35.0);
    }

    #[test]
    fn wrapped_lines_break_across_pages() {
        let doc = default_doc(
            vec![flex_row(
                Style {
                    flex_wrap: Some(FlexWrap::Wrap),
                    ..Default::default()
                },
                (0..6).map(|_| item(50.0, 20.0, 0.0)).collect(),
            )],
            100.0,
            50.0,
        );
        let pages = layout_doc(&doc);
        assert_eq!(pages.len(), 2);
        let first = &pages[0].root.children[0];
        assert_eq!(first.children.len(), 4);
        assert_eq!(first.children[2].y, 20.0);
        let second = &pages[1].root.children[0];
        let indices: Vec<usize> = second.children.iter().map(|child| child.index).collect();
        assert_eq!(indices, vec![4, 5]);
        assert_eq!(second.children[0].y, 0.0);
    }

    #[test]
    fn column_flex_stacks_items() {
        let doc = default_doc(
            vec![flex_row(
                Style {
                    flex_direction: Some(FlexDirection::Column),
                    ..Default::default()
                },
                vec![make_block(10.0), make_block(15.0)],
            )],
            100.0,
            200.0,
        );
        let pages = layout_doc(&doc);
        let flex = &pages[0].root.children[0];
        assert_eq!(flex.kind, FragmentKind::Flex);
        assert_eq!(flex.children[1].y, 10.0);
        assert_eq!(flex.height, 25.0);
    }
}
