//! # Table Layout
//!
//! Tables are laid out row by row. Column widths come from the table's
//! column definitions; cells are block containers stretched to the height
//! of their row. Rows never break: a row that does not fit moves to the
//! next page, and header rows are repeated at the top of every page the
//! table continues on.

use super::absolute::absolute_layout;
use super::block::{block_container_layout, Container};
use super::float::{avoid_collisions, CollisionBox};
use super::fragment::{Fragment, FragmentKind};
use super::margins::collapse_margin;
use super::page_break::{block_level_page_break, find_earlier_page_break, remove_placeholders, Sibling};
use super::percentages::{resolve_percentages, UsedBox};
use super::width::block_level_width;
use super::{BlockLayout, ContainingBlock, LayoutContext, NextPage, Placeholder, Rollback, SkipStack};
use crate::boxes::{BoxId, BoxKind, BoxTree};
use crate::model::{ColumnDef, ColumnWidth};
use crate::style::{BoxDecorationBreak, Direction, Float};

/// Resolve column widths from definitions and the available width.
///
/// Fixed and fractional columns are served first; auto columns share what
/// is left. Without definitions the columns of the first row share the
/// width equally.
pub(crate) fn resolve_column_widths(
    tree: &BoxTree,
    columns: &[ColumnDef],
    available_width: f64,
    rows: &[BoxId],
) -> Vec<f64> {
    if columns.is_empty() {
        let count = rows
            .first()
            .map(|&row| {
                tree.node(row)
                    .children
                    .iter()
                    .map(|&cell| col_span(tree, cell))
                    .sum::<usize>()
            })
            .unwrap_or(1)
            .max(1);
        return vec![available_width / count as f64; count];
    }

    let mut widths = Vec::with_capacity(columns.len());
    let mut remaining = available_width;
    let mut auto_count = 0;
    for column in columns {
        match column.width {
            ColumnWidth::Fixed(width) => {
                widths.push(width);
                remaining -= width;
            }
            ColumnWidth::Fraction(fraction) => {
                let width = available_width * fraction;
                widths.push(width);
                remaining -= width;
            }
            ColumnWidth::Auto => {
                widths.push(0.0);
                auto_count += 1;
            }
        }
    }

    if auto_count > 0 {
        let auto_width = (remaining / auto_count as f64).max(0.0);
        for (width, column) in widths.iter_mut().zip(columns) {
            if matches!(column.width, ColumnWidth::Auto) {
                *width = auto_width;
            }
        }
    }
    widths
}

fn col_span(tree: &BoxTree, cell: BoxId) -> usize {
    match tree.node(cell).kind {
        BoxKind::TableCell { col_span } => col_span as usize,
        _ => 1,
    }
}

fn is_header(tree: &BoxTree, row: BoxId) -> bool {
    matches!(tree.node(row).kind, BoxKind::TableRow { is_header: true })
}

/// Lay out one row at (`x`, `y`). Cells are laid out without a page limit
/// and stretched to the tallest one.
#[allow(clippy::too_many_arguments)]
fn row_layout(
    ctx: &mut LayoutContext,
    row: BoxId,
    index: usize,
    x: f64,
    y: f64,
    widths: &[f64],
    rtl: bool,
    absolute_boxes: &mut Vec<Placeholder>,
    fixed_boxes: &mut Vec<Placeholder>,
) -> Fragment {
    let tree = ctx.tree;
    let node = tree.node(row);
    let total_width: f64 = widths.iter().sum();

    let mut fragment = Fragment::empty(FragmentKind::TableRow, row);
    fragment.index = index;
    fragment.x = x;
    fragment.y = y;
    fragment.width = total_width;

    let mut column = 0;
    let mut cell_x = x;
    for (cell_index, &cell) in node.children.iter().enumerate() {
        let span = col_span(tree, cell);
        let end = (column + span).min(widths.len());
        let cell_width: f64 = widths[column..end].iter().sum();
        column = end;

        let cb = ContainingBlock {
            x: cell_x,
            y,
            width: cell_width,
            height: None,
            rtl,
        };
        let mut used: UsedBox = resolve_percentages(&tree.node(cell).style, &cb);
        used.x = if rtl { x + total_width - (cell_x - x) - cell_width } else { cell_x };
        used.y = y;
        used.margin.top = Some(0.0);
        used.margin.right = Some(0.0);
        used.margin.bottom = Some(0.0);
        used.margin.left = Some(0.0);
        used.width = Some((cell_width - used.horizontal_decorations()).max(0.0));
        cell_x += cell_width;

        let container = Container::new(tree, cell, cell_index, FragmentKind::TableCell, used, None);
        let (laid, _) = block_container_layout(
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
        let laid = laid
            .unwrap_or_else(|| Fragment::from_used(FragmentKind::TableCell, cell, cell_index, &container.used));
        fragment.children.push(laid);
    }

    let row_style = &node.style;
    let min_height = row_style.min_height.resolve(0.0).unwrap_or(0.0);
    let content_height = row_style.height.resolve(0.0).unwrap_or(0.0);
    let height = fragment
        .children
        .iter()
        .map(Fragment::margin_height)
        .fold(content_height.max(min_height), f64::max);
    for cell in &mut fragment.children {
        cell.height += height - cell.margin_height();
    }
    fragment.height = height;
    fragment
}

/// Lay out the table `id`. Tables settle their own top margin against the
/// margins collapsing above them.
#[allow(clippy::too_many_arguments)]
pub(crate) fn table_layout(
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
    let BoxKind::Table { columns } = &node.kind else {
        unreachable!("table layout of a {:?} box", node.kind)
    };
    let page_start = || Some(node.page_start.clone());
    let allowed_max_y = max_y * (1.0 + 1e-9);

    let rollback = Rollback::mark(ctx, absolute_boxes, fixed_boxes);
    let relative = style.is_relative();
    let mut own_absolute = Vec::new();
    let absolute_list: &mut Vec<Placeholder> = if relative {
        &mut own_absolute
    } else {
        &mut *absolute_boxes
    };

    let slice = style.box_decoration_break == BoxDecorationBreak::Slice;
    if slice && skip.is_some() {
        used.margin.top = Some(0.0);
        used.padding.top = 0.0;
        used.border.top = 0.0;
    }
    let mut with_top = adjoining;
    with_top.push(used.margin_top());
    used.y += collapse_margin(&with_top) - used.margin_top();

    block_level_width(&mut used, cb.width, cb.rtl, false);
    let candidate = CollisionBox {
        y: used.y,
        width: used.width.unwrap_or(0.0) + used.horizontal_decorations(),
        height: 0.0,
        margin_left: used.margins().left,
        margin_right: used.margins().right,
        margin_top: used.margin_top(),
        float: Float::None,
        is_line: false,
    };
    let (x, y, _) = avoid_collisions(ctx.excluded_shapes(), &candidate, cb, false);
    used.x = x;
    used.y = y;

    let rtl = style.direction == Direction::Rtl;
    let content_x = used.content_box_x();
    let content_y = used.content_box_y();
    let widths = resolve_column_widths(tree, columns, used.width.unwrap_or(0.0), &node.children);
    let bottom_decorations = used.padding.bottom + used.border.bottom;

    let headers: Vec<usize> = (0..node.children.len())
        .filter(|&i| is_header(tree, node.children[i]))
        .collect();
    let body: Vec<usize> = (0..node.children.len())
        .filter(|&i| !is_header(tree, node.children[i]))
        .collect();
    let first_body = skip.map_or(0, |skip| skip.skip);

    let mut rows: Vec<Fragment> = Vec::new();
    let mut position_y = content_y;
    for &row_index in &headers {
        let row = row_layout(
            ctx,
            node.children[row_index],
            row_index,
            content_x,
            position_y,
            &widths,
            rtl,
            absolute_list,
            fixed_boxes,
        );
        position_y += row.margin_height();
        rows.push(row);
    }

    let mut resume_at: Option<SkipStack> = None;
    let mut next_page = NextPage::default();
    let mut body_rows = 0;
    let remaining: Vec<usize> = body.into_iter().filter(|&i| i >= first_body).collect();
    let last_body = remaining.last().copied();

    for row_index in remaining {
        let row_id = node.children[row_index];
        let previous = rows.last().filter(|_| body_rows > 0);
        let page_break = previous.map(|previous| {
            block_level_page_break(tree, Sibling::Laid(previous), Sibling::Pending(row_id))
        });
        if let Some(page_break) = page_break.filter(|value| value.is_forced()) {
            next_page = NextPage {
                kind: page_break.into(),
                page: page_start(),
            };
            resume_at = Some(SkipStack::new(row_index));
            break;
        }

        let row = row_layout(
            ctx,
            row_id,
            row_index,
            content_x,
            position_y,
            &widths,
            rtl,
            absolute_list,
            fixed_boxes,
        );
        let reserved = if Some(row_index) == last_body || !slice {
            bottom_decorations
        } else {
            0.0
        };
        let bottom = row.y + row.margin_height() + reserved;
        if bottom > allowed_max_y {
            if body_rows == 0 {
                if !page_is_empty {
                    rollback.undo(ctx, absolute_boxes, fixed_boxes);
                    return (None, BlockLayout::canceled(page_start()));
                }
            } else {
                let mut ids = Vec::new();
                row.placeholder_ids(&mut ids);
                remove_placeholders(&ids, absolute_list, fixed_boxes);
                if page_break.is_some_and(|value| value.is_avoid()) {
                    match find_earlier_page_break(tree, &rows, absolute_list, fixed_boxes) {
                        Some((kept, resume)) => {
                            rows = kept;
                            resume_at = Some(resume);
                            break;
                        }
                        None if !page_is_empty => {
                            rollback.undo(ctx, absolute_boxes, fixed_boxes);
                            return (None, BlockLayout::canceled(page_start()));
                        }
                        None => {}
                    }
                }
                resume_at = Some(SkipStack::new(row_index));
                break;
            }
        }
        position_y = row.y + row.margin_height();
        rows.push(row);
        body_rows += 1;
    }

    let fragmented = resume_at.is_some();
    if fragmented && style.break_inside.is_avoid() && !page_is_empty {
        rollback.undo(ctx, absolute_boxes, fixed_boxes);
        return (None, BlockLayout::canceled(page_start()));
    }

    let content_height = rows
        .last()
        .map_or(0.0, |row| row.y + row.margin_height() - content_y);
    let mut fragment = Fragment::from_used(FragmentKind::Table, id, index, &used);
    fragment.clearance = clearance;
    fragment.height = used.clamp_height(used.height.unwrap_or(0.0).max(content_height));
    fragment.children = rows;
    if slice && fragmented {
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
