//! # Width Solver
//!
//! Resolves `margin-left`, `width` and `margin-right` of a block-level box
//! in normal flow so that its margin box fills the containing block.

use super::percentages::UsedBox;

/// Run `solve`, then clamp the width to `max-width` and `min-width`. Each
/// clamp re-runs `solve` from the margins and position the box had before
/// solving, so clamping never compounds.
pub(crate) fn handle_min_max_width(used: &mut UsedBox, solve: impl Fn(&mut UsedBox)) {
    let computed_margins = (used.margin.left, used.margin.right);
    let computed_x = used.x;
    solve(used);
    if let Some(width) = used.width {
        if width > used.max_width {
            used.width = Some(used.max_width);
            (used.margin.left, used.margin.right) = computed_margins;
            used.x = computed_x;
            solve(used);
        }
    }
    if let Some(width) = used.width {
        if width < used.min_width {
            used.width = Some(used.min_width);
            (used.margin.left, used.margin.right) = computed_margins;
            used.x = computed_x;
            solve(used);
        }
    }
}

/// Width of a block-level box in normal flow, with min/max clamping.
pub(crate) fn block_level_width(used: &mut UsedBox, cb_width: f64, rtl: bool, is_column: bool) {
    handle_min_max_width(used, |used| solve_block_width(used, cb_width, rtl, is_column));
}

/// Resolve the width and horizontal margins without min/max clamping.
pub(crate) fn solve_block_width(used: &mut UsedBox, cb_width: f64, rtl: bool, is_column: bool) {
    let paddings_plus_borders = used.horizontal_decorations();
    let mut margin_l = used.margin.left;
    let mut margin_r = used.margin.right;

    if let Some(width) = used.width {
        let total =
            paddings_plus_borders + width + margin_l.unwrap_or(0.0) + margin_r.unwrap_or(0.0);
        if total > cb_width {
            margin_l = Some(margin_l.unwrap_or(0.0));
            margin_r = Some(margin_r.unwrap_or(0.0));
        }
    }

    let width = match (used.width, margin_l, margin_r) {
        (Some(width), Some(left), Some(right)) => {
            // Over-constrained: the start edge wins.
            if rtl && !is_column {
                used.x += cb_width - paddings_plus_borders - width - right - left;
            }
            width
        }
        (Some(width), _, _) => width,
        (None, left, right) => {
            margin_l = Some(left.unwrap_or(0.0));
            margin_r = Some(right.unwrap_or(0.0));
            cb_width - paddings_plus_borders - left.unwrap_or(0.0) - right.unwrap_or(0.0)
        }
    };
    used.width = Some(width);

    let margin_sum = cb_width - paddings_plus_borders - width;
    match (margin_l, margin_r) {
        (None, None) => {
            margin_l = Some(margin_sum / 2.0);
            margin_r = Some(margin_sum / 2.0);
        }
        (None, Some(right)) => margin_l = Some(margin_sum - right),
        (Some(left), None) => margin_r = Some(margin_sum - left),
        (Some(_), Some(_)) => {}
    }
    used.margin.left = margin_l;
    used.margin.right = margin_r;
}

/// Used size of a replaced box with intrinsic size `intrinsic_width` x
/// `intrinsic_height`. An auto dimension follows the intrinsic ratio; two
/// auto dimensions are clamped together so the ratio survives.
pub(crate) fn replaced_size(used: &UsedBox, intrinsic_width: f64, intrinsic_height: f64) -> (f64, f64) {
    let ratio = (intrinsic_height > 0.0).then(|| intrinsic_width / intrinsic_height);
    match (used.width, used.height) {
        (Some(width), Some(height)) => (
            width.min(used.max_width).max(used.min_width),
            height.min(used.max_height).max(used.min_height),
        ),
        (Some(width), None) => {
            let width = width.min(used.max_width).max(used.min_width);
            let height = ratio.map_or(intrinsic_height, |ratio| width / ratio);
            (width, height.min(used.max_height).max(used.min_height))
        }
        (None, Some(height)) => {
            let height = height.min(used.max_height).max(used.min_height);
            let width = ratio.map_or(intrinsic_width, |ratio| height * ratio);
            (width.min(used.max_width).max(used.min_width), height)
        }
        (None, None) => min_max_auto_replaced(used, intrinsic_width, intrinsic_height),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Violation {
    None,
    Min,
    Max,
}

/// The constraint table for replaced boxes with auto width and height.
fn min_max_auto_replaced(used: &UsedBox, width: f64, height: f64) -> (f64, f64) {
    let (min_width, min_height) = (used.min_width, used.min_height);
    let max_width = used.max_width.max(min_width);
    let max_height = used.max_height.max(min_height);
    let violation = |value: f64, min: f64, max: f64| {
        if value < min {
            Violation::Min
        } else if value > max {
            Violation::Max
        } else {
            Violation::None
        }
    };
    let violations = (
        violation(width, min_width, max_width),
        violation(height, min_height, max_height),
    );
    let width = if width == 0.0 { 1e-6 } else { width };
    let height = if height == 0.0 { 1e-6 } else { height };

    use Violation::*;
    match violations {
        (None, None) => (width, height),
        (Max, None) => (max_width, (max_width * height / width).max(min_height)),
        (Min, None) => (min_width, (min_width * height / width).min(max_height)),
        (None, Max) => ((max_height * width / height).max(min_width), max_height),
        (None, Min) => ((min_height * width / height).min(max_width), min_height),
        (Max, Max) => {
            if max_width / width <= max_height / height {
                (max_width, min_height.max(max_width * height / width))
            } else {
                (min_width.max(max_height * width / height), max_height)
            }
        }
        (Min, Min) => {
            if min_width / width <= min_height / height {
                (max_width.min(min_height * width / height), min_height)
            } else {
                (min_width, max_height.min(min_width * height / width))
            }
        }
        (Min, Max) => (min_width, max_height),
        (Max, Min) => (max_width, min_height),
    }
}
