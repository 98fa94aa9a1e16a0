//! # Page Break Decisions
//!
//! Which break value wins where two block-level siblings meet, and where
//! to break instead when the natural break point is to be avoided.

use super::fragment::{Fragment, FragmentKind};
use super::{Placeholder, SkipStack};
use crate::boxes::{BoxId, BoxKind, BoxTree};
use crate::style::BreakValue;

/// Fold break values met in tree order into the winning one.
///
/// `left`, `right`, `recto` and `verso` always win, `page` beats `auto` and
/// `avoid`, and `avoid` beats `auto`.
pub fn decide_break(values: impl IntoIterator<Item = BreakValue>) -> BreakValue {
    values
        .into_iter()
        .fold(BreakValue::Auto, |result, value| {
            if value.wins_over(result) {
                value
            } else {
                result
            }
        })
}

/// One side of a possible break: a fragment already laid out on this page,
/// or a box that is about to be laid out.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Sibling<'f> {
    Laid(&'f Fragment),
    Pending(BoxId),
}

fn is_block_parallel_fragment(fragment: &Fragment) -> bool {
    matches!(
        fragment.kind,
        FragmentKind::Block
            | FragmentKind::Replaced
            | FragmentKind::Table
            | FragmentKind::TableRow
            | FragmentKind::Flex
    )
}

fn is_block_parallel_box(kind: &BoxKind) -> bool {
    matches!(
        kind,
        BoxKind::Block
            | BoxKind::Replaced { .. }
            | BoxKind::Table { .. }
            | BoxKind::TableRow { .. }
            | BoxKind::Flex
    )
}

/// Break values along the last-child chain of `sibling`, outermost first.
fn collect_after(tree: &BoxTree, sibling: Sibling, values: &mut Vec<BreakValue>) {
    let start = values.len();
    match sibling {
        Sibling::Laid(mut fragment) => {
            while is_block_parallel_fragment(fragment) {
                values.push(fragment.style(tree).break_after);
                match fragment.children.last() {
                    Some(last) => fragment = last,
                    None => break,
                }
            }
        }
        Sibling::Pending(mut id) => {
            while is_block_parallel_box(&tree.node(id).kind) {
                values.push(tree.node(id).style.break_after);
                match tree.node(id).children.last() {
                    Some(&last) => id = last,
                    None => break,
                }
            }
        }
    }
    values[start..].reverse();
}

/// Break values along the first-child chain of `sibling`, outermost first.
fn collect_before(tree: &BoxTree, sibling: Sibling, values: &mut Vec<BreakValue>) {
    match sibling {
        Sibling::Laid(mut fragment) => {
            while is_block_parallel_fragment(fragment) {
                values.push(fragment.style(tree).break_before);
                match fragment.children.first() {
                    Some(first) => fragment = first,
                    None => break,
                }
            }
        }
        Sibling::Pending(mut id) => {
            while is_block_parallel_box(&tree.node(id).kind) {
                values.push(tree.node(id).style.break_before);
                match tree.node(id).children.first() {
                    Some(&first) => id = first,
                    None => break,
                }
            }
        }
    }
}

/// The break value that wins at the margin between two siblings: the
/// `break-after` values of `before` and its last descendants, then the
/// `break-before` values of `after` and its first descendants.
pub(crate) fn block_level_page_break(tree: &BoxTree, before: Sibling, after: Sibling) -> BreakValue {
    let mut values = Vec::new();
    collect_after(tree, before, &mut values);
    collect_before(tree, after, &mut values);
    decide_break(values)
}

/// The break value before `after` when no in-flow sibling precedes it.
pub(crate) fn leading_page_break(tree: &BoxTree, after: Sibling) -> BreakValue {
    let mut values = Vec::new();
    collect_before(tree, after, &mut values);
    decide_break(values)
}

fn page_values<'t>(tree: &'t BoxTree, sibling: Sibling) -> (&'t str, &'t str) {
    let id = match sibling {
        Sibling::Laid(fragment) => fragment.box_id,
        Sibling::Pending(id) => id,
    };
    let node = tree.node(id);
    (&node.page_start, &node.page_end)
}

/// The page name `after` starts on, when it differs from the one `before`
/// ends on.
pub(crate) fn block_level_page_name(tree: &BoxTree, before: Sibling, after: Sibling) -> Option<String> {
    let (_, before_end) = page_values(tree, before);
    let (after_start, _) = page_values(tree, after);
    (before_end != after_start).then(|| after_start.to_string())
}

/// Find the last place where `children` may break because the natural break
/// is to be avoided. Returns the children to keep and where to resume.
///
/// Placeholders of the removed fragments are dropped from the placeholder
/// lists.
pub(crate) fn find_earlier_page_break(
    tree: &BoxTree,
    children: &[Fragment],
    absolute_boxes: &mut Vec<Placeholder>,
    fixed_boxes: &mut Vec<Placeholder>,
) -> Option<(Vec<Fragment>, SkipStack)> {
    let (new_children, resume_at) = earlier_break(tree, children)?;

    let mut before = Vec::new();
    for child in children {
        child.placeholder_ids(&mut before);
    }
    let mut kept = Vec::new();
    for child in &new_children {
        child.placeholder_ids(&mut kept);
    }
    before.retain(|id| !kept.contains(id));
    remove_placeholders(&before, absolute_boxes, fixed_boxes);

    Some((new_children, resume_at))
}

fn earlier_break(tree: &BoxTree, children: &[Fragment]) -> Option<(Vec<Fragment>, SkipStack)> {
    if let Some(first) = children.first() {
        if first.is_line() {
            // Lines take orphans and widows from their block.
            let style = first.style(tree);
            let keep = children.len().checked_sub(style.widows as usize)?;
            if keep < style.orphans as usize || keep == 0 {
                return None;
            }
            let new_children = children[..keep].to_vec();
            let resume = new_children[keep - 1].resume_at.clone();
            return Some((new_children, SkipStack::nested(0, resume)));
        }
    }

    let mut previous_in_flow: Option<&Fragment> = None;
    for (index, child) in children.iter().enumerate().rev() {
        if !child.is_in_normal_flow() {
            continue;
        }
        if is_repeated_header(tree, child) {
            return None;
        }
        if let Some(previous) = previous_in_flow {
            let value = block_level_page_break(tree, Sibling::Laid(child), Sibling::Laid(previous));
            if !value.is_avoid() {
                let new_children = children[..=index].to_vec();
                let resume = SkipStack::new(children[index + 1].index);
                return Some((new_children, resume));
            }
        }
        previous_in_flow = Some(child);

        if !child.style(tree).break_inside.is_avoid() && can_break_inside(child) {
            if let Some((grand_children, resume)) = earlier_break(tree, &child.children) {
                let mut new_child = child.clone();
                new_child.children = grand_children;
                let resume = SkipStack::nested(child.index, Some(resume));
                let mut new_children = children[..index].to_vec();
                new_children.push(new_child);
                return Some((new_children, resume));
            }
        }
    }
    None
}

/// Blocks and tables may be broken again inside. Multi-column containers
/// hold columns, which are balanced as a whole.
fn can_break_inside(fragment: &Fragment) -> bool {
    match fragment.kind {
        FragmentKind::Block => !fragment
            .children
            .iter()
            .any(|child| child.kind == FragmentKind::Column),
        FragmentKind::Table => true,
        _ => false,
    }
}

fn is_repeated_header(tree: &BoxTree, fragment: &Fragment) -> bool {
    fragment.kind == FragmentKind::TableRow
        && matches!(
            tree.node(fragment.box_id).kind,
            BoxKind::TableRow { is_header: true }
        )
}

/// Drop the placeholders with these ids.
pub(crate) fn remove_placeholders(
    ids: &[usize],
    absolute_boxes: &mut Vec<Placeholder>,
    fixed_boxes: &mut Vec<Placeholder>,
) {
    if ids.is_empty() {
        return;
    }
    absolute_boxes.retain(|placeholder| !ids.contains(&placeholder.id));
    fixed_boxes.retain(|placeholder| !ids.contains(&placeholder.id));
}
