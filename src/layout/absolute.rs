//! # Absolute Positioning
//!
//! Absolutely and fixed positioned boxes leave a placeholder in the flow.
//! Once their containing block has its final size, they are laid out in a
//! second pass and swapped in for their placeholder.

use super::float::out_of_flow_content_layout;
use super::fragment::{Flow, Fragment, FragmentKind};
use super::percentages::{resolve_percentages, UsedBox};
use super::preferred::shrink_to_fit;
use super::width::{handle_min_max_width, replaced_size};
use super::{ContainingBlock, LayoutContext, Placeholder};
use crate::boxes::BoxKind;
use crate::style::Position;
use log::debug;

/// Lay out the box of `placeholder` against `cb` and put it in the place of
/// the placeholder inside `target`.
///
/// Offsets that are `auto` keep the static position. Without a `width`
/// the box is as wide as `left` and `right` allow, or shrinks to fit.
pub(crate) fn absolute_layout(
    ctx: &mut LayoutContext,
    placeholder: &Placeholder,
    cb: &ContainingBlock,
    target: &mut Fragment,
    fixed_boxes: &mut Vec<Placeholder>,
) {
    let fragment = absolute_box_layout(ctx, placeholder, cb, fixed_boxes);
    if !target.replace_placeholder(placeholder.id, fragment) {
        debug!("placeholder {} left its containing block", placeholder.id);
    }
}

/// Lay out the box of `placeholder` against `cb` and return its fragment.
pub(crate) fn absolute_box_layout(
    ctx: &mut LayoutContext,
    placeholder: &Placeholder,
    cb: &ContainingBlock,
    fixed_boxes: &mut Vec<Placeholder>,
) -> Fragment {
    let tree = ctx.tree;
    let node = tree.node(placeholder.box_id);
    let style = &node.style;

    let mut used: UsedBox = resolve_percentages(style, cb);
    for margin in [
        &mut used.margin.top,
        &mut used.margin.right,
        &mut used.margin.bottom,
        &mut used.margin.left,
    ] {
        margin.get_or_insert(0.0);
    }
    let margins = used.margins();
    let left = style.left.resolve(cb.width);
    let right = style.right.resolve(cb.width);
    let top = style.top.resolve_opt(cb.height);
    let bottom = style.bottom.resolve_opt(cb.height);

    let mut fragment = match &node.kind {
        BoxKind::Replaced { width, height } => {
            let (width, height) = replaced_size(&used, *width, *height);
            used.width = Some(width);
            used.height = Some(height);
            Fragment::from_used(FragmentKind::Replaced, placeholder.box_id, placeholder.index, &used)
        }
        kind => {
            let outer = margins.horizontal() + used.horizontal_decorations();
            let stretched = match (left, right) {
                (Some(left), Some(right)) => Some((cb.width - left - right - outer).max(0.0)),
                _ => None,
            };
            let available = cb.width - outer - left.unwrap_or(0.0) - right.unwrap_or(0.0);
            let shrunk = shrink_to_fit(ctx, placeholder.box_id, available.max(0.0));
            handle_min_max_width(&mut used, |used: &mut UsedBox| {
                if used.width.is_none() {
                    used.width = Some(stretched.unwrap_or(shrunk));
                }
            });
            if used.height.is_none() {
                if let (Some(top), Some(bottom), Some(height)) = (top, bottom, cb.height) {
                    let height = height - top - bottom - margins.vertical() - used.vertical_decorations();
                    used.height = Some(used.clamp_height(height.max(0.0)));
                }
            }

            // Absolutely positioned descendants are placed against this box.
            let mut own_absolute = Vec::new();
            let mut fragment = out_of_flow_content_layout(
                ctx,
                placeholder.box_id,
                placeholder.index,
                kind,
                used.clone(),
                &mut own_absolute,
                fixed_boxes,
            );
            if let Some(height) = used.height {
                fragment.height = height;
            }
            let inner_cb = ContainingBlock {
                x: fragment.padding_box_x(),
                y: fragment.padding_box_y(),
                width: fragment.padding_width(),
                height: Some(fragment.padding_height()),
                rtl: cb.rtl,
            };
            for inner in &own_absolute {
                absolute_layout(ctx, inner, &inner_cb, &mut fragment, fixed_boxes);
            }
            fragment
        }
    };

    let x = match (left, right) {
        (Some(left), _) => cb.x + left,
        (None, Some(right)) => cb.x + cb.width - right - fragment.margin_width(),
        (None, None) => placeholder.x,
    };
    let y = match (top, bottom, cb.height) {
        (Some(top), _, _) => cb.y + top,
        (None, Some(bottom), Some(height)) => cb.y + height - bottom - fragment.margin_height(),
        _ => placeholder.y,
    };
    fragment.translate(x - fragment.x, y - fragment.y);
    fragment.index = placeholder.index;
    fragment.flow = if style.position == Position::Fixed {
        Flow::Fixed
    } else {
        Flow::Absolute
    };
    fragment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::test_support::*;
    use crate::model::Node;
    use crate::style::{Dimension, Style};

    fn positioned(style: Style, children: Vec<Node>) -> Node {
        Node::view(
            Style {
                position: Some(Position::Absolute),
                ..style
            },
            children,
        )
    }

    fn relative_parent(children: Vec<Node>) -> Node {
        Node::view(
            Style {
                position: Some(Position::Relative),
                height: Some(Dimension::Pt(50.0)),
                ..Default::default()
            },
            children,
        )
    }

    #[test]
    fn offsets_are_relative_to_the_positioned_ancestor() {
        let doc = default_doc(
            vec![
                make_block(10.0),
                relative_parent(vec![positioned(
                    Style {
                        top: Some(Dimension::Pt(5.0)),
                        left: Some(Dimension::Pt(7.0)),
                        width: Some(Dimension::Pt(20.0)),
                        height: Some(Dimension::Pt(10.0)),
                        ..Default::default()
                    },
                    vec![],
                )]),
            ],
            100.0,
            200.0,
        );
        let pages = layout_doc(&doc);
        let parent = &pages[0].root.children[1];
        let child = &parent.children[0];
        assert_eq!(child.flow, Flow::Absolute);
        assert_eq!((child.x, child.y), (7.0, 15.0));
    }

    #[test]
    fn right_and_bottom_offsets() {
        let doc = default_doc(
            vec![relative_parent(vec![positioned(
                Style {
                    right: Some(Dimension::Pt(10.0)),
                    bottom: Some(Dimension::Pt(10.0)),
                    width: Some(Dimension::Pt(20.0)),
                    height: Some(Dimension::Pt(20.0)),
                    ..Default::default()
                },
                vec![],
            )])],
            100.0,
            200.0,
        );
        let pages = layout_doc(&doc);
        let child = &pages[0].root.children[0].children[0];
        assert_eq!((child.x, child.y), (70.0, 20.0));
    }

    #[test]
    fn auto_width_shrinks_to_fit() {
        // 12pt font, 6pt per character
        let doc = default_doc(
            vec![relative_parent(vec![positioned(
                Style::default(),
                vec![make_text("aa bbbb")],
            )])],
            100.0,
            200.0,
        );
        let pages = layout_doc(&doc);
        let child = &pages[0].root.children[0].children[0];
        assert_eq!(child.width, 42.0);
    }

    #[test]
    fn positioned_boxes_take_no_room_in_the_flow() {
        let doc = default_doc(
            vec![relative_parent(vec![
                positioned(
                    Style {
                        height: Some(Dimension::Pt(30.0)),
                        ..Default::default()
                    },
                    vec![],
                ),
                make_block(10.0),
            ])],
            100.0,
            200.0,
        );
        let pages = layout_doc(&doc);
        let parent = &pages[0].root.children[0];
        assert_eq!(parent.children[0].flow, Flow::Absolute);
        assert_eq!(parent.children[1].y, 0.0);
    }

    #[test]
    fn top_and_bottom_stretch_the_height() {
        let doc = default_doc(
            vec![relative_parent(vec![positioned(
                Style {
                    top: Some(Dimension::Pt(10.0)),
                    bottom: Some(Dimension::Pt(15.0)),
                    ..Default::default()
                },
                vec![],
            )])],
            100.0,
            200.0,
        );
        let pages = layout_doc(&doc);
        let child = &pages[0].root.children[0].children[0];
        assert_eq!(child.height, 25.0);
        assert_eq!(child.y, 10.0);
    }
}
