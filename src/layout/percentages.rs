//! Used values of the box model properties.

use super::ContainingBlock;
use crate::model::Edges;
use crate::style::{BoxSizing, ComputedStyle, Dimension, EdgeValues};

/// A box's geometry while it is being laid out. `None` is `auto`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UsedBox {
    pub x: f64,
    pub y: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub margin: EdgeValues<Option<f64>>,
    pub padding: Edges,
    pub border: Edges,
    pub min_width: f64,
    pub max_width: f64,
    pub min_height: f64,
    pub max_height: f64,
}

impl UsedBox {
    /// Margins with `auto` treated as zero.
    pub fn margins(&self) -> Edges {
        Edges {
            top: self.margin.top.unwrap_or(0.0),
            right: self.margin.right.unwrap_or(0.0),
            bottom: self.margin.bottom.unwrap_or(0.0),
            left: self.margin.left.unwrap_or(0.0),
        }
    }

    pub fn margin_top(&self) -> f64 {
        self.margin.top.unwrap_or(0.0)
    }

    pub fn margin_bottom(&self) -> f64 {
        self.margin.bottom.unwrap_or(0.0)
    }

    pub fn border_box_y(&self) -> f64 {
        self.y + self.margin_top()
    }

    pub fn content_box_x(&self) -> f64 {
        self.x + self.margin.left.unwrap_or(0.0) + self.border.left + self.padding.left
    }

    pub fn content_box_y(&self) -> f64 {
        self.border_box_y() + self.border.top + self.padding.top
    }

    /// Horizontal padding and borders.
    pub fn horizontal_decorations(&self) -> f64 {
        self.padding.horizontal() + self.border.horizontal()
    }

    pub fn vertical_decorations(&self) -> f64 {
        self.padding.vertical() + self.border.vertical()
    }

    /// Bottom padding, border and margin.
    pub fn bottom_spacing(&self) -> f64 {
        self.padding.bottom + self.border.bottom + self.margin_bottom()
    }

    pub fn clamp_height(&self, height: f64) -> f64 {
        height.min(self.max_height).max(self.min_height)
    }
}

fn percent_of(value: Dimension, base: f64) -> Option<f64> {
    value.resolve(base)
}

/// Resolve the box model properties of `style` against its containing block.
///
/// Widths, margins and paddings use the containing block width. Heights use
/// its height, and a percentage of an unknown height is `auto`.
pub(crate) fn resolve_percentages(style: &ComputedStyle, cb: &ContainingBlock) -> UsedBox {
    let cb_width = cb.width;
    let margin = EdgeValues {
        top: percent_of(style.margin.top, cb_width),
        right: percent_of(style.margin.right, cb_width),
        bottom: percent_of(style.margin.bottom, cb_width),
        left: percent_of(style.margin.left, cb_width),
    };
    let padding = Edges {
        top: percent_of(style.padding.top, cb_width).unwrap_or(0.0),
        right: percent_of(style.padding.right, cb_width).unwrap_or(0.0),
        bottom: percent_of(style.padding.bottom, cb_width).unwrap_or(0.0),
        left: percent_of(style.padding.left, cb_width).unwrap_or(0.0),
    };

    let mut used = UsedBox {
        x: cb.x,
        y: cb.y,
        width: style.width.resolve(cb_width),
        height: style.height.resolve_opt(cb.height),
        margin,
        padding,
        border: style.border_width,
        min_width: style.min_width.resolve(cb_width).unwrap_or(0.0),
        max_width: style.max_width.resolve(cb_width).unwrap_or(f64::INFINITY),
        min_height: style.min_height.resolve_opt(cb.height).unwrap_or(0.0),
        max_height: style
            .max_height
            .resolve_opt(cb.height)
            .unwrap_or(f64::INFINITY),
    };

    if style.box_sizing == BoxSizing::BorderBox {
        let horizontal = used.horizontal_decorations();
        let vertical = used.vertical_decorations();
        if horizontal > 0.0 {
            used.width = used.width.map(|w| (w - horizontal).max(0.0));
            used.max_width = (used.max_width - horizontal).max(0.0);
            used.min_width = (used.min_width - horizontal).max(0.0);
        }
        if vertical > 0.0 {
            used.height = used.height.map(|h| (h - vertical).max(0.0));
            used.max_height = (used.max_height - vertical).max(0.0);
            used.min_height = (used.min_height - vertical).max(0.0);
        }
    }
    used
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Style;

    fn cb(width: f64, height: Option<f64>) -> ContainingBlock {
        ContainingBlock {
            x: 0.0,
            y: 0.0,
            width,
            height,
            rtl: false,
        }
    }

    #[test]
    fn percentages_use_the_containing_block_width() {
        let style = Style {
            width: Some(Dimension::Percent(50.0)),
            margin: Some(EdgeValues::uniform(Dimension::Percent(10.0))),
            padding: Some(EdgeValues::symmetric(Dimension::Percent(5.0), Dimension::Pt(2.0))),
            ..Default::default()
        }
        .compute(None);
        let used = resolve_percentages(&style, &cb(200.0, Some(1000.0)));
        assert_eq!(used.width, Some(100.0));
        // Vertical margins and paddings use the width too
        assert_eq!(used.margin.top, Some(20.0));
        assert_eq!(used.padding.top, 10.0);
        assert_eq!(used.padding.left, 2.0);
        assert_eq!(used.max_width, f64::INFINITY);
    }

    #[test]
    fn percentage_height_of_auto_height_is_auto() {
        let style = Style {
            height: Some(Dimension::Percent(50.0)),
            min_height: Some(Dimension::Percent(10.0)),
            ..Default::default()
        }
        .compute(None);
        let used = resolve_percentages(&style, &cb(200.0, None));
        assert_eq!(used.height, None);
        assert_eq!(used.min_height, 0.0);
        let used = resolve_percentages(&style, &cb(200.0, Some(300.0)));
        assert_eq!(used.height, Some(150.0));
        assert_eq!(used.min_height, 30.0);
    }

    #[test]
    fn border_box_sizing_shrinks_the_content_box() {
        let style = Style {
            width: Some(Dimension::Pt(100.0)),
            height: Some(Dimension::Pt(10.0)),
            padding: Some(EdgeValues::uniform(Dimension::Pt(10.0))),
            border_width: Some(Edges::uniform(2.0)),
            box_sizing: Some(BoxSizing::BorderBox),
            ..Default::default()
        }
        .compute(None);
        let used = resolve_percentages(&style, &cb(500.0, None));
        assert_eq!(used.width, Some(76.0));
        assert_eq!(used.height, Some(0.0));
        assert_eq!(used.min_width, 0.0);
    }

    #[test]
    fn auto_margins_stay_auto() {
        let style = Style {
            margin: Some(EdgeValues::symmetric(Dimension::Pt(4.0), Dimension::Auto)),
            ..Default::default()
        }
        .compute(None);
        let used = resolve_percentages(&style, &cb(100.0, None));
        assert_eq!(used.margin.left, None);
        assert_eq!(used.margins().left, 0.0);
        assert_eq!(used.margin_top(), 4.0);
    }
}
