//! # Multi-Column Layout
//!
//! A multi-column container splits its children into runs of column
//! content and `column-span: all` blocks. Each run is balanced: starting
//! from the total content height divided by the column count, the column
//! height grows until the run fits in the columns, then the run is laid
//! out for real.
//!
//! Column boxes are laid out with the block container algorithm over a
//! slice of the container's children, so skip stacks returned by a column
//! are skip stacks of the multi-column container itself.

use super::absolute::absolute_layout;
use super::block::{block_container_layout, block_level_layout, Container};
use super::fragment::{Fragment, FragmentKind};
use super::margins::collapse_margin;
use super::percentages::{resolve_percentages, UsedBox};
use super::width::block_level_width;
use super::{BlockLayout, ContainingBlock, LayoutContext, NextPage, Placeholder, SkipStack};
use crate::boxes::BoxId;
use crate::style::{BoxDecorationBreak, ColumnFill, ColumnSpan, Direction};
use log::{debug, warn};

/// Used column count and column width for an available width.
pub(crate) fn column_count_and_width(
    available: f64,
    column_width: Option<f64>,
    column_count: Option<u32>,
    gap: f64,
) -> (usize, f64) {
    let fitting = |width: f64| ((available + gap) / (width + gap)).floor().max(1.0) as usize;
    match (column_width, column_count) {
        (None, Some(count)) => {
            let count = count.max(1) as usize;
            let width = (available - (count - 1) as f64 * gap).max(0.0) / count as f64;
            (count, width)
        }
        (Some(width), None) => {
            let count = fitting(width);
            (count, (available + gap) / count as f64 - gap)
        }
        (Some(width), Some(count)) => {
            let count = (count.max(1) as usize).min(fitting(width));
            (count, (available + gap) / count as f64 - gap)
        }
        (None, None) => (1, available),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    /// Children `start..end`, flowed into columns.
    Run { start: usize, end: usize },
    /// A spanning child, laid out across all columns.
    Span(usize),
}

fn segments(ctx: &LayoutContext, children: &[BoxId], start: usize) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut run_start = start;
    for (index, &child) in children.iter().enumerate().skip(start) {
        let style = &ctx.tree.node(child).style;
        if style.column_span == ColumnSpan::All && style.is_in_normal_flow() {
            if run_start < index {
                segments.push(Segment::Run {
                    start: run_start,
                    end: index,
                });
            }
            segments.push(Segment::Span(index));
            run_start = index + 1;
        }
    }
    if run_start < children.len() {
        segments.push(Segment::Run {
            start: run_start,
            end: children.len(),
        });
    }
    segments
}

/// Geometry shared by every column of a container.
struct ColumnSet {
    column_box: BoxId,
    index: usize,
    start: usize,
    end: usize,
    x: f64,
    width: f64,
    cb: ContainingBlock,
}

impl ColumnSet {
    fn container<'t>(&self, ctx: &LayoutContext<'t>, x: f64, y: f64) -> Container<'t> {
        let tree = ctx.tree;
        let node = tree.node(self.column_box);
        let mut used: UsedBox = resolve_percentages(&node.style, &self.cb);
        used.x = x;
        used.y = y;
        used.width = Some(self.width);
        for margin in [
            &mut used.margin.top,
            &mut used.margin.right,
            &mut used.margin.bottom,
            &mut used.margin.left,
        ] {
            margin.get_or_insert(0.0);
        }
        let mut container = Container::new(tree, self.column_box, self.index, FragmentKind::Column, used, None)
            .with_children(&node.children[self.start..self.end], self.start);
        container.establishes_fc = true;
        container
    }

    /// Lay out one column at the first column position into throwaway
    /// placeholder lists.
    fn trial(
        &self,
        ctx: &mut LayoutContext,
        y: f64,
        max_y: f64,
        skip: Option<&SkipStack>,
        page_is_empty: bool,
    ) -> (Option<Fragment>, BlockLayout) {
        let container = self.container(ctx, self.x, y);
        block_container_layout(
            ctx,
            &container,
            max_y,
            skip,
            page_is_empty,
            &mut Vec::new(),
            &mut Vec::new(),
            Vec::new(),
            true,
        )
    }
}

/// Height of a column fragment, from `top` to its bottom margin edge.
fn column_bottom(column: &Fragment, top: f64) -> f64 {
    column.y + column.margin_height() - top
}

/// Lay out the multi-column container `id`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn columns_layout(
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
) -> (Option<Fragment>, BlockLayout) {
    let tree = ctx.tree;
    let node = tree.node(id);
    let style = &node.style;
    let Some(column_box) = node.column_box else {
        unreachable!("multi-column box without a column box")
    };
    let children = &node.children;

    let relative = style.is_relative();
    let mut own_absolute = Vec::new();
    let absolute_boxes: &mut Vec<Placeholder> = if relative {
        &mut own_absolute
    } else {
        absolute_boxes
    };

    if skip.is_some() && style.box_decoration_break == BoxDecorationBreak::Slice {
        used.margin.top = Some(0.0);
        used.padding.top = 0.0;
        used.border.top = 0.0;
    }
    let mut with_top = adjoining;
    with_top.push(used.margin_top());
    used.y += collapse_margin(&with_top) - used.margin_top();

    let original_max_y = max_y;
    let mut max_y = max_y;
    let known_height = used.height.is_some();
    if let Some(height) = used.height {
        max_y = max_y.min(used.content_box_y() + height);
    }

    block_level_width(&mut used, cb.width, cb.rtl, false);
    let available = used.width.unwrap_or(0.0);
    let gap = style.column_gap;
    let (count, width) = column_count_and_width(available, style.column_width, style.column_count, gap);
    let rtl = style.direction == Direction::Rtl;
    let content_x = used.content_box_x();
    let multicol_cb = ContainingBlock {
        x: content_x,
        y: used.content_box_y(),
        width: available,
        height: used.height,
        rtl,
    };

    let start = skip.map_or(0, |skip| skip.skip);
    let segments = segments(ctx, children, start);
    let last_segment = segments.len().saturating_sub(1);

    let mut margins: Vec<f64> = Vec::new();
    let mut current_y = used.content_box_y();
    let mut new_children: Vec<Fragment> = Vec::new();
    let mut next_page = NextPage::any(None);
    let mut resume_at: Option<SkipStack> = None;
    let mut pending_skip = skip.cloned();

    for (segment_index, segment) in segments.into_iter().enumerate() {
        let segment_skip = pending_skip.take();
        match segment {
            Segment::Span(child_index) => {
                let nested = segment_skip.as_ref().and_then(SkipStack::inner);
                let (child, layout) = block_level_layout(
                    ctx,
                    children[child_index],
                    child_index,
                    content_x,
                    current_y,
                    original_max_y,
                    nested,
                    &multicol_cb,
                    page_is_empty,
                    absolute_boxes,
                    fixed_boxes,
                    margins.clone(),
                    false,
                );
                next_page = layout.next_page;
                let Some(child) = child else {
                    if !new_children.is_empty() {
                        resume_at = Some(SkipStack::new(child_index));
                    }
                    break;
                };
                margins = layout.adjoining_margins;
                margins.push(child.margin.bottom);
                current_y = child.border_box_bottom();
                new_children.push(child);
                if let Some(child_resume) = layout.resume_at {
                    resume_at = Some(SkipStack::nested(child_index, Some(child_resume)));
                    break;
                }
            }
            Segment::Run { start, end } => {
                current_y += collapse_margin(&margins);
                margins.clear();

                let set = ColumnSet {
                    column_box,
                    index,
                    start,
                    end,
                    x: content_x,
                    width,
                    cb: multicol_cb,
                };
                let fill_page = style.column_fill == ColumnFill::Auto && segment_index == last_segment;
                let height = balance(
                    ctx,
                    &set,
                    count,
                    current_y,
                    max_y,
                    segment_skip.as_ref(),
                    page_is_empty,
                    fill_page,
                );

                // Render the columns for good.
                let mut column_max_y = (current_y + height).min(max_y);
                let mut column_skip = segment_skip.clone();
                let mut columns: Vec<Fragment> = Vec::new();
                let mut max_column_height: f64 = 0.0;
                let mut i = 0;
                loop {
                    if i == count - 1 {
                        column_max_y = max_y;
                    }
                    let offset = i as f64;
                    let x = if rtl {
                        content_x + available - (offset + 1.0) * width - offset * gap
                    } else {
                        content_x + offset * (width + gap)
                    };
                    let container = set.container(ctx, x, current_y);
                    let (column, layout) = block_container_layout(
                        ctx,
                        &container,
                        column_max_y,
                        column_skip.as_ref(),
                        page_is_empty,
                        absolute_boxes,
                        fixed_boxes,
                        Vec::new(),
                        true,
                    );
                    let Some(column) = column else {
                        break;
                    };
                    next_page = layout.next_page;
                    column_skip = layout.resume_at;
                    max_column_height = max_column_height.max(column.margin_height());
                    columns.push(column);
                    if column_skip.is_none() {
                        break;
                    }
                    i += 1;
                    // Columns of a container with a height go on sideways.
                    if i == count && !known_height {
                        break;
                    }
                }

                if columns.is_empty() {
                    if new_children.is_empty() {
                        return (None, BlockLayout::canceled(Some(node.page_start.clone())));
                    }
                    resume_at = Some(segment_skip.unwrap_or(SkipStack::new(start)));
                    break;
                }

                current_y += max_column_height;
                for mut column in columns {
                    column.height = max_column_height;
                    new_children.push(column);
                }
                if column_skip.is_some() {
                    resume_at = column_skip;
                    break;
                }
            }
        }
    }

    if !children.is_empty() && new_children.is_empty() {
        return (None, BlockLayout::canceled(Some(node.page_start.clone())));
    }

    current_y += collapse_margin(&margins);
    let content_y = used.content_box_y();
    let content_height = current_y - content_y;
    let height = used.clamp_height(used.height.unwrap_or(content_height));
    let difference = height - content_height;
    for column in new_children
        .iter_mut()
        .rev()
        .take_while(|child| child.kind == FragmentKind::Column)
    {
        column.height += difference;
    }

    let mut fragment = Fragment::from_used(FragmentKind::Block, id, index, &used);
    fragment.height = height;
    fragment.clearance = clearance;
    fragment.children = new_children;
    if resume_at.is_some() && style.box_decoration_break == BoxDecorationBreak::Slice {
        fragment.remove_decoration(false, true);
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

    if next_page.page.is_none() {
        next_page.page = Some(node.page_end.clone());
    }
    let layout = BlockLayout {
        resume_at,
        next_page,
        adjoining_margins: Vec::new(),
        adjoining_shared: false,
        leading_margins: vec![fragment.margin.top],
        collapsing_through: false,
    };
    (Some(fragment), layout)
}

/// The column height that fits the run in `count` columns.
///
/// Each pass lays the columns out at the candidate height and grows it by
/// the smallest amount that pulls the next box up into a column, at least
/// one point. Passes stop at the full content height or after
/// `max_column_passes`.
#[allow(clippy::too_many_arguments)]
fn balance(
    ctx: &mut LayoutContext,
    set: &ColumnSet,
    count: usize,
    top: f64,
    max_y: f64,
    skip: Option<&SkipStack>,
    page_is_empty: bool,
    fill_page: bool,
) -> f64 {
    let shapes = ctx.excluded_shapes_len();

    let (column, _) = set.trial(ctx, top, f64::INFINITY, skip, page_is_empty);
    let total = column.map_or(0.0, |column| column_bottom(&column, top));
    let mut height = if fill_page && max_y.is_finite() {
        (max_y - top).max(0.0)
    } else if fill_page {
        total
    } else {
        total / count as f64
    };

    let mut passes = 0;
    loop {
        ctx.truncate_excluded_shapes(shapes);
        let mut column_skip = skip.cloned();
        let mut lost_space = f64::INFINITY;
        let mut rendered_all = false;
        let mut empty_render = false;

        for _ in 0..count {
            let (column, layout) = set.trial(ctx, top, top + height, column_skip.as_ref(), page_is_empty);
            let Some(column) = column else {
                empty_render = true;
                break;
            };
            column_skip = layout.resume_at;

            let last = column.children.iter().rev().find(|child| child.is_in_normal_flow());
            let (empty_space, next_box_size) = match (last, &column_skip) {
                (Some(last), Some(next_skip)) => {
                    let empty_space = height - (last.y - top + last.margin_height());
                    // The smallest piece of the next box a column can take.
                    let (next, _) = set.trial(ctx, top, top, Some(next_skip), true);
                    let next_box_size = next
                        .and_then(|next| {
                            next.children
                                .iter()
                                .find(|child| child.is_in_normal_flow())
                                .map(Fragment::margin_height)
                        })
                        .unwrap_or(0.0);
                    (empty_space, next_box_size)
                }
                _ => (0.0, 0.0),
            };
            // Differences under a point are rounding noise.
            if next_box_size - empty_space > 1.0 {
                lost_space = lost_space.min(next_box_size - empty_space);
            }
            if column_skip.is_none() {
                rendered_all = true;
                break;
            }
        }
        ctx.truncate_excluded_shapes(shapes);

        if empty_render {
            height = total;
            break;
        }
        if rendered_all || height >= total {
            break;
        }
        passes += 1;
        ctx.stats.column_passes += 1;
        if passes >= ctx.config.max_column_passes {
            warn!(
                "column balancing gave up after {} passes, using the full height {}",
                passes, total
            );
            height = total;
            break;
        }
        let step = if lost_space.is_finite() {
            lost_space.max(1.0)
        } else {
            1.0
        };
        height += step;
        debug!("column balancing pass {}: height {}", passes, height);
    }
    height
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::test_support::*;
    use crate::model::Node;
    use crate::style::{Dimension, Style};

    fn multicol(count: u32, children: Vec<Node>) -> Node {
        make_styled_view(
            Style {
                column_count: Some(count),
                column_gap: Some(0.0),
                ..Default::default()
            },
            children,
        )
    }

    fn columns(fragment: &Fragment) -> Vec<&Fragment> {
        fragment
            .children
            .iter()
            .filter(|child| child.kind == FragmentKind::Column)
            .collect()
    }

    #[test]
    fn count_and_width() {
        assert_eq!(column_count_and_width(100.0, None, Some(2), 10.0), (2, 45.0));
        assert_eq!(column_count_and_width(100.0, Some(30.0), None, 5.0), (3, 30.0));
        assert_eq!(column_count_and_width(100.0, Some(30.0), Some(2), 5.0).0, 2);
        // Too narrow for even one column of the requested width
        assert_eq!(column_count_and_width(20.0, Some(30.0), None, 5.0), (1, 20.0));
    }

    #[test]
    fn even_content_splits_in_halves() {
        let doc = default_doc(
            vec![multicol(2, (0..4).map(|_| make_block(10.0)).collect())],
            100.0,
            200.0,
        );
        let pages = layout_doc(&doc);
        let multicol = &pages[0].root.children[0];
        let columns = columns(multicol);
        assert_eq!(columns.len(), 2);
        assert_eq!((columns[0].x, columns[1].x), (0.0, 50.0));
        assert_eq!(columns[0].children.len(), 2);
        assert_eq!(multicol.height, 20.0);
    }

    #[test]
    fn balancing_grows_until_the_content_fits() {
        let doc = default_doc(
            vec![multicol(2, (0..3).map(|_| make_block(10.0)).collect())],
            100.0,
            200.0,
        );
        let pages = layout_doc(&doc);
        let multicol = &pages[0].root.children[0];
        let columns = columns(multicol);
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].children.len(), 2);
        assert_eq!(columns[1].children.len(), 1);
        assert_eq!(multicol.height, 20.0);
        assert!(columns.iter().all(|column| column.height == 20.0));
    }

    #[test]
    fn spanning_blocks_split_runs() {
        let span = Node::view(
            Style {
                height: Some(Dimension::Pt(10.0)),
                column_span: Some(ColumnSpan::All),
                ..Default::default()
            },
            vec![],
        );
        let doc = default_doc(
            vec![multicol(2, vec![make_block(10.0), span, make_block(10.0)])],
            100.0,
            200.0,
        );
        let pages = layout_doc(&doc);
        let multicol = &pages[0].root.children[0];
        let span = multicol
            .children
            .iter()
            .find(|child| child.kind == FragmentKind::Block)
            .expect("spanning block");
        assert_eq!((span.y, span.width), (10.0, 100.0));
        let last = multicol.children.last().expect("columns");
        assert_eq!(last.kind, FragmentKind::Column);
        assert_eq!(last.y, 20.0);
        assert_eq!(multicol.height, 30.0);
    }

    #[test]
    fn columns_continue_on_the_next_page() {
        let doc = default_doc(
            vec![multicol(2, (0..6).map(|_| make_block(10.0)).collect())],
            100.0,
            25.0,
        );
        let pages = layout_doc(&doc);
        assert_eq!(pages.len(), 2);
        let first = columns(&pages[0].root.children[0]);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].children.len(), 2);
        assert_eq!(first[1].children.len(), 2);
        let second = columns(&pages[1].root.children[0]);
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].children[0].index, 4);
        assert_eq!(second[1].children[0].index, 5);
    }

    #[test]
    fn run_after_a_span_moves_to_the_next_page_when_nothing_fits() {
        let span = Node::view(
            Style {
                height: Some(Dimension::Pt(40.0)),
                column_span: Some(ColumnSpan::All),
                ..Default::default()
            },
            vec![],
        );
        let doc = default_doc(
            vec![make_block(10.0), multicol(2, vec![span, make_block(30.0)])],
            100.0,
            65.0,
        );
        let pages = layout_doc(&doc);
        assert_eq!(pages.len(), 2);

        let first = &pages[0].root.children[1];
        assert!(columns(first).is_empty());
        assert_eq!(first.children.len(), 1);

        let second = columns(&pages[1].root.children[0]);
        assert!(!second.is_empty());
        assert_eq!(second[0].children.len(), 1);
        assert_eq!(second[0].children[0].height, 30.0);
    }

    #[test]
    fn column_passes_are_counted() {
        let doc = default_doc(
            vec![multicol(2, (0..3).map(|_| make_block(10.0)).collect())],
            100.0,
            200.0,
        );
        let (_, stats) = crate::paginate(&doc);
        assert!(stats.column_passes >= 1);
    }
}
