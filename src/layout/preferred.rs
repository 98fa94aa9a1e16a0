//! # Preferred Widths
//!
//! Min-content and max-content widths, used for shrink-to-fit sizing of
//! floats and absolutely positioned boxes and to distribute the page
//! margin boxes.
//!
//! Only fixed lengths contribute: a percentage margin, padding or width
//! counts as zero or `auto` here.

use super::inline;
use super::LayoutContext;
use crate::boxes::{BoxId, BoxKind};
use crate::style::{BoxSizing, ComputedStyle, Dimension, FlexDirection, FlexWrap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intrinsic {
    Min,
    Max,
}

/// The narrowest a box can be without overflowing its content.
pub(crate) fn min_content_width(ctx: &LayoutContext, id: BoxId, outer: bool) -> f64 {
    preferred_width(ctx, id, outer, Intrinsic::Min)
}

/// The width of a box when nothing wraps.
pub(crate) fn max_content_width(ctx: &LayoutContext, id: BoxId, outer: bool) -> f64 {
    preferred_width(ctx, id, outer, Intrinsic::Max)
}

/// `min(max(min-content, available), max-content)` of the content box.
pub(crate) fn shrink_to_fit(ctx: &LayoutContext, id: BoxId, available: f64) -> f64 {
    min_content_width(ctx, id, false)
        .max(available)
        .min(max_content_width(ctx, id, false))
}

/// Min-content and max-content widths of the content box of a block
/// container whose children are not its own in the box tree, like a margin
/// box holding a running element.
pub(crate) fn block_preferred_widths(
    ctx: &LayoutContext,
    style: &ComputedStyle,
    children: &[BoxId],
) -> (f64, f64) {
    let min = children_width(ctx, children, Intrinsic::Min);
    let max = children_width(ctx, children, Intrinsic::Max);
    (
        min_max(style, own_width(style).unwrap_or(min)),
        min_max(style, own_width(style).unwrap_or(max)),
    )
}

fn preferred_width(ctx: &LayoutContext, id: BoxId, outer: bool, intrinsic: Intrinsic) -> f64 {
    let tree = ctx.tree;
    let node = tree.node(id);
    let style = &node.style;

    let content = match &node.kind {
        BoxKind::Line { .. } => {
            let text = ctx.line_text(id);
            let char_width = ctx.config.char_width;
            return match intrinsic {
                Intrinsic::Min => inline::min_content_width(&text, style.font_size, char_width),
                Intrinsic::Max => inline::max_content_width(&text, style.font_size, char_width),
            };
        }
        BoxKind::Replaced { width, .. } => *width,
        BoxKind::Table { .. } => node
            .children
            .iter()
            .map(|&row| preferred_width(ctx, row, true, intrinsic))
            .fold(0.0, f64::max),
        BoxKind::TableRow { .. } => {
            return node
                .children
                .iter()
                .map(|&cell| preferred_width(ctx, cell, true, intrinsic))
                .sum();
        }
        BoxKind::Flex => {
            let widths: Vec<f64> = node
                .children
                .iter()
                .filter(|&&child| tree.node(child).style.is_in_normal_flow())
                .map(|&child| preferred_width(ctx, child, true, intrinsic))
                .collect();
            let sums = style.flex_direction == FlexDirection::Row
                && (intrinsic == Intrinsic::Max || style.flex_wrap == FlexWrap::NoWrap);
            if sums {
                let gaps = style.gap * widths.len().saturating_sub(1) as f64;
                widths.iter().sum::<f64>() + gaps
            } else {
                widths.into_iter().fold(0.0, f64::max)
            }
        }
        BoxKind::Block | BoxKind::TableCell { .. } => children_width(ctx, &node.children, intrinsic),
    };

    let width = own_width(style).unwrap_or(content);
    adjust(style, outer, min_max(style, width))
}

fn children_width(ctx: &LayoutContext, children: &[BoxId], intrinsic: Intrinsic) -> f64 {
    children
        .iter()
        .filter(|&&child| {
            let style = &ctx.tree.node(child).style;
            !style.is_absolutely_positioned()
        })
        .map(|&child| preferred_width(ctx, child, true, intrinsic))
        .fold(0.0, f64::max)
}

fn fixed(value: Dimension) -> f64 {
    match value {
        Dimension::Pt(v) => v,
        _ => 0.0,
    }
}

fn horizontal_decorations(style: &ComputedStyle) -> f64 {
    fixed(style.padding.left)
        + fixed(style.padding.right)
        + style.border_width.left
        + style.border_width.right
}

/// The content width from a fixed `width`.
fn own_width(style: &ComputedStyle) -> Option<f64> {
    match style.width {
        Dimension::Pt(width) if style.box_sizing == BoxSizing::BorderBox => {
            Some((width - horizontal_decorations(style)).max(0.0))
        }
        Dimension::Pt(width) => Some(width),
        _ => None,
    }
}

fn min_max(style: &ComputedStyle, width: f64) -> f64 {
    let width = match style.max_width {
        Dimension::Pt(max) => width.min(max),
        _ => width,
    };
    match style.min_width {
        Dimension::Pt(min) => width.max(min),
        _ => width,
    }
}

fn adjust(style: &ComputedStyle, outer: bool, width: f64) -> f64 {
    if outer {
        width + horizontal_decorations(style) + fixed(style.margin.left) + fixed(style.margin.right)
    } else {
        width
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxes::BoxTree;
    use crate::layout::test_support::*;
    use crate::model::{Document, Edges, Node};
    use crate::style::{EdgeValues, Style};

    fn first_child(tree: &BoxTree) -> BoxId {
        tree.node(tree.root()).children[0]
    }

    #[test]
    fn text_blocks_use_words_and_lines() {
        // 12pt font, 6pt per character
        let doc = Document::new(vec![make_text("aa bbbb")]);
        let tree = BoxTree::build(&doc);
        let ctx = LayoutContext::new(&tree, &doc.pages, &doc.config);
        let id = first_child(&tree);
        assert_eq!(min_content_width(&ctx, id, false), 24.0);
        assert_eq!(max_content_width(&ctx, id, false), 42.0);
        assert_eq!(shrink_to_fit(&ctx, id, 30.0), 30.0);
        assert_eq!(shrink_to_fit(&ctx, id, 10.0), 24.0);
        assert_eq!(shrink_to_fit(&ctx, id, 100.0), 42.0);
    }

    #[test]
    fn outer_widths_add_fixed_decorations() {
        let doc = Document::new(vec![make_styled_view(
            Style {
                padding: Some(EdgeValues::uniform(Dimension::Pt(4.0))),
                margin: Some(EdgeValues::symmetric(
                    Dimension::Pt(0.0),
                    Dimension::Percent(10.0),
                )),
                border_width: Some(Edges::uniform(1.0)),
                ..Default::default()
            },
            vec![Node::image(50.0, 20.0, Style::default())],
        )]);
        let tree = BoxTree::build(&doc);
        let ctx = LayoutContext::new(&tree, &doc.pages, &doc.config);
        let id = first_child(&tree);
        assert_eq!(max_content_width(&ctx, id, false), 50.0);
        // Percentage margins count as zero
        assert_eq!(max_content_width(&ctx, id, true), 60.0);
    }

    #[test]
    fn fixed_width_and_clamps_win_over_content() {
        let doc = Document::new(vec![
            make_styled_view(
                Style {
                    width: Some(Dimension::Pt(80.0)),
                    ..Default::default()
                },
                vec![make_text("a")],
            ),
            make_styled_view(
                Style {
                    max_width: Some(Dimension::Pt(20.0)),
                    ..Default::default()
                },
                vec![make_text("aaaaaaaaaa")],
            ),
        ]);
        let tree = BoxTree::build(&doc);
        let ctx = LayoutContext::new(&tree, &doc.pages, &doc.config);
        let children = &tree.node(tree.root()).children;
        assert_eq!(min_content_width(&ctx, children[0], false), 80.0);
        assert_eq!(max_content_width(&ctx, children[1], false), 20.0);
    }
}
