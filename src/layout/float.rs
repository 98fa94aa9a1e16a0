//! # Floats
//!
//! Float placement against the exclusions of the current block formatting
//! context, clearance, and the collision search that lines, replaced boxes
//! and tables also use to stay clear of floats.

use super::block::{block_container_layout, Container};
use super::flex::flex_layout;
use super::fragment::{Flow, Fragment, FragmentKind};
use super::percentages::{resolve_percentages, UsedBox};
use super::preferred::shrink_to_fit;
use super::table::table_layout;
use super::width::{handle_min_max_width, replaced_size};
use super::{ContainingBlock, LayoutContext, Placeholder, Shape};
use crate::boxes::{BoxId, BoxKind};
use crate::style::{Clear, Direction, Float};

/// A box looking for room next to the floats.
///
/// With `outer` collision checks the size is the margin box; otherwise it
/// is the border box and `y` is still the top of the margin box.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CollisionBox {
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub margin_top: f64,
    pub float: Float,
    pub is_line: bool,
}

/// Find where `b` fits between the floats: the left edge of the free band,
/// the top of the box, and the width of the band.
///
/// A box too wide for the band next to the floats it meets moves down to
/// the highest bottom of those floats and tries again. Positions returned
/// for non-outer boxes are margin-box positions.
pub(crate) fn avoid_collisions(
    shapes: &[Shape],
    b: &CollisionBox,
    cb: &ContainingBlock,
    outer: bool,
) -> (f64, f64, f64) {
    let mut position_y = if outer { b.y } else { b.y + b.margin_top };

    let (max_left, max_right) = loop {
        let bottom = position_y + b.height;
        let colliding: Vec<&Shape> = shapes
            .iter()
            .filter(|shape| {
                (shape.y < position_y && position_y < shape.bottom())
                    || (shape.y < bottom && bottom < shape.bottom())
                    || (shape.y >= position_y && shape.bottom() <= bottom)
            })
            .collect();

        let mut max_left = cb.x;
        let mut max_right = cb.x + cb.width;
        if !outer {
            max_left += b.margin_left;
            max_right -= b.margin_right;
        }
        for shape in &colliding {
            match shape.side {
                Float::Left => max_left = max_left.max(shape.x + shape.width),
                Float::Right => max_right = max_right.min(shape.x),
                Float::None => {}
            }
        }

        if !colliding.is_empty() && b.width > max_right - max_left {
            let new_y = colliding
                .iter()
                .map(|shape| shape.bottom())
                .fold(f64::INFINITY, f64::min);
            if new_y > position_y {
                position_y = new_y;
                continue;
            }
        }
        break (max_left, max_right);
    };

    let available = max_right - max_left;
    let mut position_x = max_left;
    if b.float == Float::None && cb.rtl && !b.is_line {
        position_x += available - b.width;
    }
    if !outer {
        position_x -= b.margin_left;
        position_y -= b.margin_top;
    }
    (position_x, position_y, available)
}

/// Clearance a box with `clear` needs so that its border box starts below
/// the matching floats, given the margins collapsing above it. `None` when
/// it clears nothing.
pub(crate) fn get_clearance(
    shapes: &[Shape],
    clear: Clear,
    position_y: f64,
    collapsed_margin: f64,
) -> Option<f64> {
    if clear == Clear::None {
        return None;
    }
    let hypothetical = position_y + collapsed_margin;
    let mut clearance: Option<f64> = None;
    for shape in shapes {
        let matches = match shape.side {
            Float::Left => matches!(clear, Clear::Left | Clear::Both),
            Float::Right => matches!(clear, Clear::Right | Clear::Both),
            Float::None => false,
        };
        if matches && hypothetical < shape.bottom() {
            let needed = shape.bottom() - hypothetical;
            clearance = Some(clearance.map_or(needed, |c: f64| c.max(needed)));
        }
    }
    clearance
}

/// Place a laid-out float: as high as the last float allows, then clear
/// of the floats it would overlap.
fn find_float_position(shapes: &[Shape], fragment: &mut Fragment, side: Float, cb: &ContainingBlock) {
    if let Some(last) = shapes.last() {
        if fragment.y < last.y {
            let dy = last.y - fragment.y;
            fragment.translate(0.0, dy);
        }
    }
    let candidate = CollisionBox {
        y: fragment.y,
        width: fragment.margin_width(),
        height: fragment.margin_height(),
        margin_left: 0.0,
        margin_right: 0.0,
        margin_top: 0.0,
        float: side,
        is_line: false,
    };
    let (mut position_x, position_y, available) = avoid_collisions(shapes, &candidate, cb, true);
    if side == Float::Right {
        position_x += available - fragment.margin_width();
    }
    fragment.translate(position_x - fragment.x, position_y - fragment.y);
}

/// Lay out the float `id` at the static position (`x`, `y`) and register
/// it as an exclusion of the current formatting context.
#[allow(clippy::too_many_arguments)]
pub(crate) fn float_layout(
    ctx: &mut LayoutContext,
    id: BoxId,
    index: usize,
    cb: &ContainingBlock,
    x: f64,
    y: f64,
    absolute_boxes: &mut Vec<Placeholder>,
    fixed_boxes: &mut Vec<Placeholder>,
) -> Fragment {
    let tree = ctx.tree;
    let node = tree.node(id);
    let style = &node.style;

    let mut used = resolve_percentages(style, cb);
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

    let clearance = get_clearance(ctx.excluded_shapes(), style.clear, used.y, 0.0);
    if let Some(clearance) = clearance {
        used.y += clearance;
    }

    let mut fragment = match &node.kind {
        BoxKind::Replaced { width, height } => {
            let (w, h) = replaced_size(&used, *width, *height);
            used.width = Some(w);
            used.height = Some(h);
            Fragment::from_used(FragmentKind::Replaced, id, index, &used)
        }
        kind => {
            let available = cb.width - used.margins().horizontal() - used.horizontal_decorations();
            let shrunk = used.width.is_none().then(|| shrink_to_fit(ctx, id, available));
            handle_min_max_width(&mut used, |used: &mut UsedBox| {
                if used.width.is_none() {
                    used.width = shrunk;
                }
            });
            out_of_flow_content_layout(ctx, id, index, kind, used, absolute_boxes, fixed_boxes)
        }
    };

    fragment.clearance = clearance;
    find_float_position(ctx.excluded_shapes(), &mut fragment, style.float, cb);
    ctx.add_excluded_shape(Shape {
        x: fragment.x,
        y: fragment.y,
        width: fragment.margin_width(),
        height: fragment.margin_height(),
        side: style.float,
    });
    fragment.flow = Flow::Float;
    fragment
}

/// Lay out the content of a float or an absolutely positioned box whose
/// width is already known. It has no page limit and its own formatting
/// context.
pub(crate) fn out_of_flow_content_layout(
    ctx: &mut LayoutContext,
    id: BoxId,
    index: usize,
    kind: &BoxKind,
    used: UsedBox,
    absolute_boxes: &mut Vec<Placeholder>,
    fixed_boxes: &mut Vec<Placeholder>,
) -> Fragment {
    let tree = ctx.tree;
    let cb = ContainingBlock {
        x: used.content_box_x(),
        y: used.content_box_y(),
        width: used.width.unwrap_or(0.0),
        height: used.height,
        rtl: tree.node(id).style.direction == Direction::Rtl,
    };
    let fallback = Fragment::from_used(FragmentKind::Block, id, index, &used);
    let (fragment, _) = match kind {
        BoxKind::Table { .. } => table_layout(
            ctx,
            id,
            index,
            used,
            None,
            f64::INFINITY,
            None,
            &cb,
            true,
            absolute_boxes,
            fixed_boxes,
            Vec::new(),
        ),
        BoxKind::Flex => flex_layout(
            ctx,
            id,
            index,
            used,
            None,
            f64::INFINITY,
            None,
            &cb,
            true,
            absolute_boxes,
            fixed_boxes,
        ),
        _ => {
            let container = Container::new(tree, id, index, FragmentKind::Block, used, None);
            ctx.create_block_formatting_context();
            let (fragment, layout) = block_container_layout(
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
            let fragment = fragment.map(|mut fragment| {
                let height_is_auto = container.used.height.is_none();
                ctx.finish_block_formatting_context(&mut fragment, height_is_auto);
                fragment
            });
            if fragment.is_none() {
                ctx.finish_block_formatting_context(&mut Fragment::empty(FragmentKind::Block, id), false);
            }
            (fragment, layout)
        }
    };
    fragment.unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cb(width: f64) -> ContainingBlock {
        ContainingBlock {
            x: 0.0,
            y: 0.0,
            width,
            height: None,
            rtl: false,
        }
    }

    fn shape(x: f64, y: f64, width: f64, height: f64, side: Float) -> Shape {
        Shape {
            x,
            y,
            width,
            height,
            side,
        }
    }

    fn candidate(y: f64, width: f64, height: f64) -> CollisionBox {
        CollisionBox {
            y,
            width,
            height,
            margin_left: 0.0,
            margin_right: 0.0,
            margin_top: 0.0,
            float: Float::None,
            is_line: false,
        }
    }

    #[test]
    fn boxes_fit_between_left_and_right_floats() {
        let shapes = [
            shape(0.0, 0.0, 20.0, 50.0, Float::Left),
            shape(80.0, 0.0, 20.0, 30.0, Float::Right),
        ];
        let (x, y, available) = avoid_collisions(&shapes, &candidate(10.0, 40.0, 10.0), &cb(100.0), true);
        assert_eq!((x, y, available), (20.0, 10.0, 60.0));
    }

    #[test]
    fn too_wide_boxes_move_below_the_first_float_that_ends() {
        let shapes = [
            shape(0.0, 0.0, 20.0, 50.0, Float::Left),
            shape(80.0, 0.0, 20.0, 30.0, Float::Right),
        ];
        let (x, y, available) = avoid_collisions(&shapes, &candidate(10.0, 70.0, 10.0), &cb(100.0), true);
        assert_eq!((x, y, available), (20.0, 30.0, 80.0));
    }

    #[test]
    fn rtl_blocks_hug_the_right_edge() {
        let mut containing = cb(100.0);
        containing.rtl = true;
        let (x, _, _) = avoid_collisions(&[], &candidate(0.0, 40.0, 10.0), &containing, true);
        assert_eq!(x, 60.0);
    }

    #[test]
    fn clearance_reaches_below_matching_floats() {
        let shapes = [
            shape(0.0, 0.0, 20.0, 50.0, Float::Left),
            shape(80.0, 0.0, 20.0, 70.0, Float::Right),
        ];
        assert_eq!(get_clearance(&shapes, Clear::Left, 10.0, 5.0), Some(35.0));
        assert_eq!(get_clearance(&shapes, Clear::Both, 10.0, 5.0), Some(55.0));
        assert_eq!(get_clearance(&shapes, Clear::None, 10.0, 5.0), None);
        assert_eq!(get_clearance(&shapes, Clear::Left, 60.0, 0.0), None);
    }

    #[test]
    fn right_floats_stack_leftwards() {
        let shapes = [shape(70.0, 0.0, 30.0, 20.0, Float::Right)];
        let mut fragment = Fragment::empty(FragmentKind::Block, crate::boxes::BoxId(1));
        fragment.width = 30.0;
        fragment.height = 10.0;
        find_float_position(&shapes, &mut fragment, Float::Right, &cb(100.0));
        assert_eq!((fragment.x, fragment.y), (40.0, 0.0));
    }
}
