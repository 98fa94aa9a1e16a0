//! # Page-Margin Boxes
//!
//! Headers, footers and corners are built once pagination is final, from
//! the `@page` rules that apply to each page. Their content may read the
//! final page counters, named strings and running elements.
//!
//! Sizing follows the margin box rules of CSS Paged Media: the three boxes
//! of a side share its length by their min-content and max-content sizes,
//! then each box fills the page margin in the other dimension.

use super::absolute::absolute_layout;
use super::block::{block_container_layout, block_level_layout, Container};
use super::fragment::{Fragment, FragmentKind};
use super::pagination::Page;
use super::percentages::{resolve_percentages, UsedBox};
use super::preferred::block_preferred_widths;
use super::{ContainingBlock, LayoutContext};
use crate::boxes::{BoxId, BoxKind, PageSelector};
use crate::model::{ContentItem, MarginSlot, StringKeyword};
use crate::style::{EdgeValues, VerticalAlign};
use log::debug;
use std::collections::BTreeMap;

/// One dimension of a margin box: its two margins and its inner size,
/// `None` standing for `auto`.
#[derive(Debug, Clone, Copy)]
struct Oriented {
    margin_a: Option<f64>,
    margin_b: Option<f64>,
    inner: Option<f64>,
    padding_plus_border: f64,
    min_content: f64,
    max_content: f64,
}

impl Oriented {
    fn sugar(&self) -> f64 {
        self.padding_plus_border + self.margin_a.unwrap_or(0.0) + self.margin_b.unwrap_or(0.0)
    }

    fn outer(&self) -> f64 {
        self.sugar() + self.inner.unwrap_or(0.0)
    }

    fn outer_min_content(&self) -> f64 {
        self.sugar() + self.inner.unwrap_or(self.min_content)
    }

    fn outer_max_content(&self) -> f64 {
        self.sugar() + self.inner.unwrap_or(self.max_content)
    }

    fn shrink_to_fit(&mut self, available: f64) {
        self.inner = Some(self.min_content.max(available).min(self.max_content));
    }

    fn auto_count(&self) -> usize {
        [self.margin_a, self.margin_b, self.inner]
            .iter()
            .filter(|value| value.is_none())
            .count()
    }
}

struct MarginBox {
    slot: MarginSlot,
    template: Option<BoxId>,
    element: Option<BoxId>,
    generated: bool,
    used: UsedBox,
    min_content: f64,
    max_content: f64,
}

impl MarginBox {
    fn horizontal(&self) -> Oriented {
        Oriented {
            margin_a: self.used.margin.left,
            margin_b: self.used.margin.right,
            inner: self.used.width,
            padding_plus_border: self.used.horizontal_decorations(),
            min_content: self.min_content,
            max_content: self.max_content,
        }
    }

    /// Content heights are not measured before layout: any height fits.
    fn vertical(&self) -> Oriented {
        Oriented {
            margin_a: self.used.margin.top,
            margin_b: self.used.margin.bottom,
            inner: self.used.height,
            padding_plus_border: self.used.vertical_decorations(),
            min_content: 0.0,
            max_content: 1e6,
        }
    }

    fn oriented(&self, vertical: bool) -> Oriented {
        if vertical {
            self.vertical()
        } else {
            self.horizontal()
        }
    }

    fn restore(&mut self, oriented: Oriented, vertical: bool) {
        if vertical {
            self.used.margin.top = oriented.margin_a;
            self.used.margin.bottom = oriented.margin_b;
            self.used.height = oriented.inner;
        } else {
            self.used.margin.left = oriented.margin_a;
            self.used.margin.right = oriented.margin_b;
            self.used.width = oriented.inner;
        }
    }

    fn margin_width(&self) -> f64 {
        self.used.width.unwrap_or(0.0) + self.used.horizontal_decorations() + self.used.margins().horizontal()
    }

    fn margin_height(&self) -> f64 {
        self.used.height.unwrap_or(0.0) + self.used.vertical_decorations() + self.used.margins().vertical()
    }
}

/// Give a margin box its size in the dimension that is fixed by the page
/// margin, `outer`. `top_or_left` picks the margin that absorbs an
/// over-constrained size.
fn compute_fixed_dimension(mut dim: Oriented, outer: f64, top_or_left: bool) -> Oriented {
    let total = dim.padding_plus_border
        + dim.margin_a.unwrap_or(0.0)
        + dim.margin_b.unwrap_or(0.0)
        + dim.inner.unwrap_or(0.0);
    if total > outer {
        dim.margin_a.get_or_insert(0.0);
        dim.margin_b.get_or_insert(0.0);
        // Keeps the inner size from going negative; the margins absorb it.
        dim.inner.get_or_insert(0.0);
    }
    if dim.auto_count() == 0 {
        if top_or_left {
            dim.margin_a = None;
        } else {
            dim.margin_b = None;
        }
    }
    if dim.auto_count() == 1 {
        let known = |value: Option<f64>| value.unwrap_or(0.0);
        let rest = outer - dim.padding_plus_border;
        if dim.inner.is_none() {
            dim.inner = Some(rest - known(dim.margin_a) - known(dim.margin_b));
        } else if dim.margin_a.is_none() {
            dim.margin_a = Some(rest - known(dim.margin_b) - known(dim.inner));
        } else {
            dim.margin_b = Some(rest - known(dim.margin_a) - known(dim.inner));
        }
    }
    if dim.inner.is_none() {
        let margin_a = *dim.margin_a.get_or_insert(0.0);
        let margin_b = *dim.margin_b.get_or_insert(0.0);
        dim.inner = Some(outer - dim.padding_plus_border - margin_a - margin_b);
    }
    if dim.margin_a.is_none() && dim.margin_b.is_none() {
        let half = (outer - dim.padding_plus_border - dim.inner.unwrap_or(0.0)) / 2.0;
        dim.margin_a = Some(half);
        dim.margin_b = Some(half);
    }
    dim
}

/// Share `outer_sum` between the three boxes of one side: start (left or
/// top), center and end.
fn compute_variable_dimension(dims: &mut [Oriented; 3], generated: [bool; 3], outer_sum: f64) {
    for dim in dims.iter_mut() {
        dim.margin_a.get_or_insert(0.0);
        dim.margin_b.get_or_insert(0.0);
    }
    let [a, b, c] = dims;

    if generated[1] {
        if b.inner.is_none() {
            let ac_max = 2.0 * a.outer_max_content().max(c.outer_max_content());
            if outer_sum >= b.outer_max_content() + ac_max {
                b.inner = Some(b.max_content);
            } else {
                let ac_min = 2.0 * a.outer_min_content().max(c.outer_min_content());
                b.inner = Some(b.min_content);
                let available = outer_sum - b.outer() - ac_min;
                let weight_ac = ac_max - ac_min;
                let weight_b = b.max_content - b.min_content;
                let weight_sum = weight_ac + weight_b;
                if available > 0.0 && weight_sum > 0.0 {
                    b.inner = Some(b.min_content + available * weight_b / weight_sum);
                }
            }
        }
        let side = (outer_sum - b.outer()) / 2.0;
        if a.inner.is_none() {
            let sugar = a.sugar();
            a.shrink_to_fit(side - sugar);
        }
        if c.inner.is_none() {
            let sugar = c.sugar();
            c.shrink_to_fit(side - sugar);
        }
    } else if a.inner.is_none() && c.inner.is_none() {
        if outer_sum >= a.outer_max_content() + c.outer_max_content() {
            a.inner = Some(a.max_content);
            c.inner = Some(c.max_content);
        } else {
            a.inner = Some(a.min_content);
            c.inner = Some(c.min_content);
            let available = outer_sum - a.outer() - c.outer();
            let weight_a = a.max_content - a.min_content;
            let weight_c = c.max_content - c.min_content;
            let weight_sum = weight_a + weight_c;
            if available > 0.0 && weight_sum > 0.0 {
                a.inner = Some(a.min_content + available * weight_a / weight_sum);
                c.inner = Some(c.min_content + available * weight_c / weight_sum);
            }
        }
    } else if a.inner.is_none() {
        let available = outer_sum - c.outer() - a.sugar();
        a.shrink_to_fit(available);
    } else if c.inner.is_none() {
        let available = outer_sum - a.outer() - c.sugar();
        c.shrink_to_fit(available);
    }
}

// ── Named strings and running elements ─────────────────────────

/// The assignment that `keyword` selects on `page`: one made on the page,
/// or else the last one made on an earlier page.
fn pick<T: Clone>(
    assignments: Option<&BTreeMap<usize, Vec<T>>>,
    page: usize,
    keyword: StringKeyword,
    starts_page: bool,
) -> Option<T> {
    let assignments = assignments?;
    if let Some(values) = assignments.get(&page) {
        match keyword {
            StringKeyword::First => return values.first().cloned(),
            StringKeyword::Last => return values.last().cloned(),
            StringKeyword::FirstExcept => return None,
            StringKeyword::Start if starts_page => return values.first().cloned(),
            StringKeyword::Start => {}
        }
    }
    assignments
        .range(..page)
        .next_back()
        .and_then(|(_, values)| values.last().cloned())
}

/// Whether the first box of the page, or one of its first descendants,
/// sets the named string `name`.
fn page_starts_with_string(ctx: &LayoutContext, root: &Fragment, name: &str) -> bool {
    let mut fragment = root;
    loop {
        let style = fragment.style(ctx.tree);
        if style.string_set.iter().any(|set| set.name == name) {
            return true;
        }
        match fragment.children.first() {
            Some(first) => fragment = first,
            None => return false,
        }
    }
}

fn string_for(ctx: &LayoutContext, page: &Page, name: &str, keyword: StringKeyword) -> String {
    let starts_page = page_starts_with_string(ctx, &page.root, name);
    pick(ctx.string_set.get(name), ctx.current_page, keyword, starts_page).unwrap_or_default()
}

/// A running element is never in the flow, so no page starts with one.
fn element_for(ctx: &LayoutContext, name: &str, keyword: StringKeyword) -> Option<BoxId> {
    pick(ctx.running_elements.get(name), ctx.current_page, keyword, false)
}

fn content_text(ctx: &LayoutContext, page: &Page, items: &[ContentItem]) -> String {
    items
        .iter()
        .map(|item| match item {
            ContentItem::Text(text) => text.clone(),
            ContentItem::Counter { counter } => ctx.counters.value(counter).to_string(),
            ContentItem::TargetCounter { target, counter } => {
                ctx.counters.target_value(target, counter).to_string()
            }
            ContentItem::StringRef { string, keyword } => string_for(ctx, page, string, *keyword),
            ContentItem::Element { .. } => String::new(),
        })
        .collect()
}

// ── Page margin boxes ──────────────────────────────────────────

/// The template of the margin box in `slot`, from the most specific rule
/// of the page that declares it.
fn template_for(ctx: &LayoutContext, selectors: &[PageSelector], slot: MarginSlot) -> Option<BoxId> {
    selectors
        .iter()
        .rev()
        .find_map(|selector| ctx.tree.margin_template(selector, slot))
}

fn make_box(ctx: &mut LayoutContext, page: &Page, slot: MarginSlot, cb: &ContainingBlock) -> MarginBox {
    let tree = ctx.tree;
    let rule = page.rule.margin_box(slot);
    let template = template_for(ctx, &page.selectors, slot);
    let generated = template.is_some() && rule.is_some_and(|rule| !rule.content.is_empty());

    let (Some(template), Some(rule), true) = (template, rule, generated) else {
        return MarginBox {
            slot,
            template,
            element: None,
            generated: false,
            used: empty_used(cb),
            min_content: 0.0,
            max_content: 0.0,
        };
    };

    let node = tree.node(template);
    for &child in &node.children {
        if let BoxKind::Line { items } = &tree.node(child).kind {
            let text = content_text(ctx, page, items);
            ctx.text_overrides.insert(child, text);
        }
    }
    let element = rule.content.iter().find_map(|item| match item {
        ContentItem::Element { element, keyword } => element_for(ctx, element, *keyword),
        _ => None,
    });

    let mut children = node.children.clone();
    children.extend(element);
    let (min_content, max_content) = block_preferred_widths(ctx, &node.style, &children);
    MarginBox {
        slot,
        template: Some(template),
        element,
        generated: true,
        used: resolve_percentages(&node.style, cb),
        min_content,
        max_content,
    }
}

/// A box that is not generated takes no room.
fn empty_used(cb: &ContainingBlock) -> UsedBox {
    UsedBox {
        x: cb.x,
        y: cb.y,
        width: Some(0.0),
        height: Some(0.0),
        margin: EdgeValues::uniform(Some(0.0)),
        padding: Default::default(),
        border: Default::default(),
        min_width: 0.0,
        max_width: f64::INFINITY,
        min_height: 0.0,
        max_height: f64::INFINITY,
    }
}

fn size_cb(width: f64, height: f64) -> ContainingBlock {
    ContainingBlock {
        x: 0.0,
        y: 0.0,
        width,
        height: Some(height),
        rtl: false,
    }
}

/// Lay out the margin boxes of `page`. Counters, named strings and running
/// elements must be final, and `ctx.current_page` must be the page number.
pub(crate) fn make_margin_boxes(ctx: &mut LayoutContext, page: &Page) -> Vec<Fragment> {
    let margin = page.margin;
    let max_box_width = page.width - margin.horizontal();
    let max_box_height = page.height - margin.vertical();
    let page_end_x = margin.left + max_box_width;
    let page_end_y = margin.top + max_box_height;

    let mut boxes = Vec::new();

    // Sides: slots, containing block, position, whether the side runs
    // vertically.
    let sides = [
        (
            [MarginSlot::TopLeft, MarginSlot::TopCenter, MarginSlot::TopRight],
            (max_box_width, margin.top),
            (margin.left, 0.0),
            false,
            true,
        ),
        (
            [MarginSlot::BottomLeft, MarginSlot::BottomCenter, MarginSlot::BottomRight],
            (max_box_width, margin.bottom),
            (margin.left, page_end_y),
            false,
            false,
        ),
        (
            [MarginSlot::LeftTop, MarginSlot::LeftMiddle, MarginSlot::LeftBottom],
            (margin.left, max_box_height),
            (0.0, margin.top),
            true,
            true,
        ),
        (
            [MarginSlot::RightTop, MarginSlot::RightMiddle, MarginSlot::RightBottom],
            (margin.right, max_box_height),
            (page_end_x, margin.top),
            true,
            false,
        ),
    ];
    for (slots, (cb_width, cb_height), (x, y), vertical, top_or_left) in sides {
        let cb = size_cb(cb_width, cb_height);
        let mut side: Vec<MarginBox> = slots.iter().map(|&slot| make_box(ctx, page, slot, &cb)).collect();
        if side.iter().all(|margin_box| !margin_box.generated) {
            continue;
        }
        let (variable_outer, fixed_outer) = if vertical {
            (cb_height, cb_width)
        } else {
            (cb_width, cb_height)
        };
        let mut dims = [
            side[0].oriented(vertical),
            side[1].oriented(vertical),
            side[2].oriented(vertical),
        ];
        let generated = [side[0].generated, side[1].generated, side[2].generated];
        compute_variable_dimension(&mut dims, generated, variable_outer);

        for ((margin_box, dim), offset) in side.iter_mut().zip(dims).zip([0.0, 0.5, 1.0]) {
            if !margin_box.generated {
                continue;
            }
            margin_box.restore(dim, vertical);
            margin_box.used.x = x;
            margin_box.used.y = y;
            if vertical {
                margin_box.used.y += offset * (variable_outer - margin_box.margin_height());
            } else {
                margin_box.used.x += offset * (variable_outer - margin_box.margin_width());
            }
            let fixed = compute_fixed_dimension(margin_box.oriented(!vertical), fixed_outer, top_or_left);
            margin_box.restore(fixed, !vertical);
        }
        boxes.extend(side.into_iter().filter(|margin_box| margin_box.generated));
    }

    let corners = [
        (MarginSlot::TopLeftCorner, (margin.left, margin.top), (0.0, 0.0)),
        (MarginSlot::TopRightCorner, (margin.right, margin.top), (page_end_x, 0.0)),
        (MarginSlot::BottomLeftCorner, (margin.left, margin.bottom), (0.0, page_end_y)),
        (MarginSlot::BottomRightCorner, (margin.right, margin.bottom), (page_end_x, page_end_y)),
    ];
    for (slot, (cb_width, cb_height), (x, y)) in corners {
        let mut margin_box = make_box(ctx, page, slot, &size_cb(cb_width, cb_height));
        if !margin_box.generated {
            continue;
        }
        margin_box.used.x = x;
        margin_box.used.y = y;
        let top = matches!(slot, MarginSlot::TopLeftCorner | MarginSlot::TopRightCorner);
        let left = matches!(slot, MarginSlot::TopLeftCorner | MarginSlot::BottomLeftCorner);
        let height = compute_fixed_dimension(margin_box.vertical(), cb_height, top);
        margin_box.restore(height, true);
        let width = compute_fixed_dimension(margin_box.horizontal(), cb_width, left);
        margin_box.restore(width, false);
        boxes.push(margin_box);
    }

    boxes
        .into_iter()
        .filter_map(|margin_box| margin_box_content_layout(ctx, margin_box))
        .collect()
}

/// Lay out the content of a sized margin box and align it vertically.
fn margin_box_content_layout(ctx: &mut LayoutContext, margin_box: MarginBox) -> Option<Fragment> {
    let tree = ctx.tree;
    let template = margin_box.template?;
    let mut container = Container::new(
        tree,
        template,
        0,
        FragmentKind::MarginBox {
            slot: margin_box.slot,
        },
        margin_box.used,
        None,
    );
    container.new_bfc = true;
    container.establishes_fc = true;

    let mut absolute_boxes = Vec::new();
    let mut fixed_boxes = Vec::new();
    let (fragment, _) = block_container_layout(
        ctx,
        &container,
        f64::INFINITY,
        None,
        true,
        &mut absolute_boxes,
        &mut fixed_boxes,
        Vec::new(),
        false,
    );
    let Some(mut fragment) = fragment else {
        debug!("margin box {:?} has no content", margin_box.slot);
        return None;
    };

    let inner_cb = ContainingBlock {
        x: fragment.content_box_x(),
        y: fragment.content_box_y(),
        width: fragment.width,
        height: Some(fragment.height),
        rtl: false,
    };
    if let Some(element) = margin_box.element {
        let y = fragment
            .children
            .last()
            .map(|last| last.y + last.margin_height())
            .unwrap_or(inner_cb.y);
        let (laid_out, _) = block_level_layout(
            ctx,
            element,
            0,
            inner_cb.x,
            y,
            f64::INFINITY,
            None,
            &inner_cb,
            true,
            &mut absolute_boxes,
            &mut fixed_boxes,
            Vec::new(),
            false,
        );
        fragment.children.extend(laid_out);
    }

    let padding_cb = ContainingBlock {
        x: fragment.padding_box_x(),
        y: fragment.padding_box_y(),
        width: fragment.padding_width(),
        height: Some(fragment.padding_height()),
        rtl: false,
    };
    absolute_boxes.append(&mut fixed_boxes);
    for placeholder in &absolute_boxes {
        absolute_layout(ctx, placeholder, &padding_cb, &mut fragment, &mut fixed_boxes);
    }

    let align = fragment.style(tree).vertical_align;
    if align != VerticalAlign::Top {
        if let (Some(first), Some(last)) = (fragment.children.first(), fragment.children.last()) {
            let content_height = last.y + last.margin_height() - first.y;
            let mut offset = fragment.height - content_height;
            if align == VerticalAlign::Middle {
                offset /= 2.0;
            }
            for child in &mut fragment.children {
                child.translate(0.0, offset);
            }
        }
    }
    Some(fragment)
}
