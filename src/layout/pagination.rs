//! # Pagination
//!
//! Lays the root box out page after page, then repeats the whole run while
//! page-based counters keep changing what the content says.
//!
//! The page maker remembers, for every page, where its content starts, what
//! kind of page it must be and the counter values at its top. A pass only
//! makes again the pages whose content read a value that changed, or whose
//! starting point moved; every other page is reused as it was.
//!
//! Once the page count settles, named strings are collected, fixed boxes
//! are repeated on every page and the margin boxes are built.

use super::absolute::{absolute_box_layout, absolute_layout};
use super::block::block_level_layout;
use super::counters::{PageState, PAGES};
use super::fragment::{Fragment, FragmentKind};
use super::margin_boxes::make_margin_boxes;
use super::page_break::{leading_page_break, Sibling};
use super::{BreakKind, ContainingBlock, LayoutContext, NextPage, Placeholder, SkipStack};
use crate::boxes::PageSelector;
use crate::model::{Edges, PageRule, PageRules};
use crate::style::{BreakValue, Direction};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Page margin when no `@page` rule sets one (~0.75 inch).
const DEFAULT_MARGIN: f64 = 54.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSide {
    Left,
    Right,
}

/// One laid-out page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// 1-based.
    pub number: usize,
    pub width: f64,
    pub height: f64,
    pub margin: Edges,
    pub side: PageSide,
    /// Inserted to honour a left or right break; it holds no content.
    pub blank: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub root: Fragment,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub margin_boxes: Vec<Fragment>,
    /// Counter values of the page, `pages` included.
    pub counters: BTreeMap<String, i64>,
    #[serde(skip)]
    pub(crate) fixed_boxes: Vec<Placeholder>,
    #[serde(skip)]
    pub(crate) selectors: Vec<PageSelector>,
    #[serde(skip)]
    pub(crate) rule: PageRule,
}

impl Page {
    /// The page area, containing block of the root and of fixed boxes.
    pub(crate) fn area(&self) -> ContainingBlock {
        ContainingBlock {
            x: self.margin.left,
            y: self.margin.top,
            width: (self.width - self.margin.horizontal()).max(0.0),
            height: Some((self.height - self.margin.vertical()).max(0.0)),
            rtl: false,
        }
    }
}

/// Why a page may have to be made again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RemakeState {
    /// The content of the page is out of date.
    pub content_changed: bool,
    /// The page shows the page count.
    pub pages_wanted: bool,
    /// Anchors first met on the page.
    pub anchors: Vec<String>,
    /// Anchors the page's `target-counter()` values read.
    pub targets: Vec<String>,
}

/// Where a page starts and what it must be.
#[derive(Debug, Clone)]
pub(crate) struct PageMakerEntry {
    pub resume_at: Option<SkipStack>,
    pub next_page: NextPage,
    pub right_page: bool,
    /// Counters before the page rule of the page applies.
    pub state: PageState,
    pub remake: RemakeState,
}

/// The selectors a page matches, least specific first.
#[derive(Debug, Clone)]
struct PageType {
    side: PageSide,
    blank: bool,
    first: bool,
    name: Option<String>,
}

impl PageType {
    fn selectors(&self) -> Vec<PageSelector> {
        let mut selectors = vec![PageSelector::Default];
        selectors.push(match self.side {
            PageSide::Left => PageSelector::Left,
            PageSide::Right => PageSelector::Right,
        });
        if self.first {
            selectors.push(PageSelector::First);
        }
        if self.blank {
            selectors.push(PageSelector::Blank);
        }
        if let Some(name) = &self.name {
            selectors.push(PageSelector::Named(name.clone()));
        }
        selectors
    }
}

/// Cascade the rules matched by `selectors` in order.
fn page_rule(rules: &PageRules, selectors: &[PageSelector]) -> PageRule {
    let mut rule = PageRule::default();
    for selector in selectors {
        let matched = match selector {
            PageSelector::Default => Some(&rules.default),
            PageSelector::First => rules.first.as_ref(),
            PageSelector::Left => rules.left.as_ref(),
            PageSelector::Right => rules.right.as_ref(),
            PageSelector::Blank => rules.blank.as_ref(),
            PageSelector::Named(name) => rules.named.get(name),
        };
        if let Some(matched) = matched {
            rule.merge(matched);
        }
    }
    rule
}

fn is_rtl(ctx: &LayoutContext) -> bool {
    ctx.tree.node(ctx.tree.root()).style.direction == Direction::Rtl
}

/// A page name, the empty name standing for no name.
fn named(page: Option<&str>) -> Option<String> {
    page.filter(|name| !name.is_empty()).map(str::to_string)
}

/// Start the page maker with the first page: its side follows a break
/// forced before the document content.
fn initialize_page_maker(ctx: &mut LayoutContext) {
    let tree = ctx.tree;
    let root = tree.root();
    let rtl = is_rtl(ctx);
    let right_page = match leading_page_break(tree, Sibling::Pending(root)) {
        BreakValue::Right => true,
        BreakValue::Left => false,
        BreakValue::Recto => !rtl,
        BreakValue::Verso => rtl,
        _ => !rtl,
    };
    ctx.page_maker = vec![PageMakerEntry {
        resume_at: None,
        next_page: NextPage::any(named(Some(&tree.node(root).page_start))),
        right_page,
        state: PageState::default(),
        remake: RemakeState::default(),
    }];
}

/// Lay out one page from `resume_at`. Returns the page, where the next one
/// resumes and what it must be.
fn make_page(
    ctx: &mut LayoutContext,
    page_type: &PageType,
    resume_at: Option<&SkipStack>,
    number: usize,
    state: &mut PageState,
) -> (Page, Option<SkipStack>, NextPage) {
    let tree = ctx.tree;
    let root_id = tree.root();
    let selectors = page_type.selectors();
    let rule = page_rule(ctx.rules, &selectors);
    let (width, height) = rule.size.unwrap_or_default().dimensions();
    let margin = rule.margin.unwrap_or(Edges::uniform(DEFAULT_MARGIN));
    let area_height = (height - margin.vertical()).max(0.0);
    let area = ContainingBlock {
        x: margin.left,
        y: margin.top,
        width: (width - margin.horizontal()).max(0.0),
        height: Some(area_height),
        rtl: is_rtl(ctx),
    };

    ctx.current_page = number;
    state.update(&rule);
    ctx.counters.state = state.clone();
    for pages in ctx.running_elements.values_mut() {
        pages.remove(&number);
    }

    let mut fixed_boxes = Vec::new();
    let (root, resume_at, next_page) = if page_type.blank {
        let mut root = Fragment::empty(FragmentKind::Block, root_id);
        root.x = area.x;
        root.y = area.y;
        root.width = area.width;
        (root, resume_at.cloned(), NextPage::default())
    } else {
        ctx.create_block_formatting_context();
        let mut absolute_boxes = Vec::new();
        let (root, layout) = block_level_layout(
            ctx,
            root_id,
            0,
            area.x,
            area.y,
            area.y + area_height,
            resume_at,
            &area,
            true,
            &mut absolute_boxes,
            &mut fixed_boxes,
            Vec::new(),
            false,
        );
        match root {
            Some(mut root) => {
                let mut positioned = absolute_boxes;
                positioned.extend(fixed_boxes.iter().cloned());
                while !positioned.is_empty() {
                    let mut nested = Vec::new();
                    for placeholder in &positioned {
                        absolute_layout(ctx, placeholder, &area, &mut root, &mut nested);
                    }
                    fixed_boxes.extend(nested.iter().cloned());
                    positioned = nested;
                }
                let height_is_auto = tree.node(root_id).style.height.is_auto();
                ctx.finish_block_formatting_context(&mut root, height_is_auto);
                (root, layout.resume_at, layout.next_page)
            }
            None => {
                warn!("page {}: the root box does not fit, dropping the rest", number);
                ctx.discard_block_formatting_context();
                let root = Fragment::empty(FragmentKind::Block, root_id);
                (root, None, NextPage::default())
            }
        }
    };

    record_page_based_content(ctx, number - 1, &root);

    let page = Page {
        number,
        width,
        height,
        margin,
        side: page_type.side,
        blank: page_type.blank,
        name: page_type.name.clone(),
        root,
        margin_boxes: Vec::new(),
        counters: state.counters.clone(),
        fixed_boxes,
        selectors,
        rule,
    };
    (page, resume_at, next_page)
}

/// Note what the page at `index` read from page-based values, and mark the
/// pages that read an anchor whose page counters just changed.
fn record_page_based_content(ctx: &mut LayoutContext, index: usize, root: &Fragment) {
    let mut cached: HashSet<String> = ctx.page_maker[..index]
        .iter()
        .flat_map(|entry| entry.remake.anchors.iter().cloned())
        .collect();
    let scan = ctx.counters.scan_page(ctx.tree, root, &mut cached);

    let remake = &mut ctx.page_maker[index].remake;
    remake.anchors = scan.anchors;
    remake.targets = scan.targets;
    remake.pages_wanted = scan.pages_wanted;
    for anchor in &scan.moved_anchors {
        for entry in &mut ctx.page_maker {
            if entry.remake.targets.contains(anchor) {
                entry.remake.content_changed = true;
            }
        }
    }
}

/// Make the page at `index` from its page maker entry and update the entry
/// of the following page.
fn remake_page(ctx: &mut LayoutContext, index: usize) -> (Page, Option<SkipStack>) {
    let entry = ctx.page_maker[index].clone();
    let rtl = is_rtl(ctx);
    let wanted_side = match entry.next_page.kind {
        BreakKind::Left => Some(PageSide::Left),
        BreakKind::Right => Some(PageSide::Right),
        BreakKind::Recto if rtl => Some(PageSide::Left),
        BreakKind::Recto => Some(PageSide::Right),
        BreakKind::Verso if rtl => Some(PageSide::Right),
        BreakKind::Verso => Some(PageSide::Left),
        BreakKind::Any | BreakKind::Page => None,
    };
    let side = if entry.right_page {
        PageSide::Right
    } else {
        PageSide::Left
    };
    let blank = wanted_side.is_some_and(|wanted| wanted != side);
    let page_type = PageType {
        side,
        blank,
        first: index == 0,
        name: if blank { None } else { named(entry.next_page.page.as_deref()) },
    };
    ctx.forced_break = entry.next_page.kind != BreakKind::Any || named(entry.next_page.page.as_deref()).is_some();

    let mut state = entry.state.clone();
    let (page, resume_at, mut next_page) =
        make_page(ctx, &page_type, entry.resume_at.as_ref(), index + 1, &mut state);
    if blank {
        next_page.page = entry.next_page.page.clone();
    }
    let right_page = !entry.right_page;

    let changed = match ctx.page_maker.get(index + 1) {
        None => true,
        Some(next) => {
            next.resume_at != resume_at
                || next.next_page != next_page
                || next.right_page != right_page
                || next.state != state
        }
    };
    if changed {
        let item = PageMakerEntry {
            resume_at: resume_at.clone(),
            next_page,
            right_page,
            state,
            remake: RemakeState {
                // The last entry has no page to make.
                content_changed: resume_at.is_some(),
                ..Default::default()
            },
        };
        if index + 1 < ctx.page_maker.len() {
            ctx.page_maker[index + 1] = item;
        } else {
            ctx.page_maker.push(item);
        }
    }
    (page, resume_at)
}

/// Make every page of the document, reusing the pages of the last pass
/// that are still up to date.
fn make_all_pages(ctx: &mut LayoutContext, previous: Vec<Page>) -> Vec<Page> {
    let mut previous: Vec<Option<Page>> = previous.into_iter().map(Some).collect();
    let mut pages = Vec::new();
    let mut index = 0;
    loop {
        let remake = &ctx.page_maker[index].remake;
        let outdated = remake.content_changed || remake.pages_wanted;
        let cached = previous.get_mut(index).and_then(Option::take);
        let (page, resume_at) = match cached {
            Some(page) if !outdated => {
                debug!("page {} up-to-date", index + 1);
                let resume_at = ctx.page_maker[index + 1].resume_at.clone();
                (page, resume_at)
            }
            _ => {
                debug!("creating page {}", index + 1);
                ctx.page_maker[index].remake = RemakeState::default();
                remake_page(ctx, index)
            }
        };
        pages.push(page);
        index += 1;
        if resume_at.is_none() {
            ctx.page_maker.truncate(index + 1);
            return pages;
        }
    }
}

/// Paginate the document until page-based counters settle, then finish the
/// pages: named strings, repeated fixed boxes and margin boxes.
pub(crate) fn layout_document(ctx: &mut LayoutContext) -> Vec<Page> {
    initialize_page_maker(ctx);
    let max_loops = ctx.config.max_loops.max(1);
    let mut pages = Vec::new();
    let mut converged = false;

    for pass in 1..=max_loops {
        info!("pagination pass {}", pass);
        ctx.stats.loops = pass;
        let initial_total = pages.len();
        pages = make_all_pages(ctx, std::mem::take(&mut pages));
        ctx.counters.total_pages = pages.len() as i64;

        let reloop_content = ctx.page_maker.iter().any(|entry| entry.remake.content_changed);
        let reloop_pages = initial_total != pages.len()
            && ctx.page_maker.iter().any(|entry| entry.remake.pages_wanted);
        if !reloop_content && !reloop_pages {
            converged = true;
            break;
        }
    }
    if !converged {
        warn!(
            "page-based counters did not settle after {} passes, keeping the last layout",
            ctx.stats.loops
        );
    }
    ctx.stats.converged = converged;

    let total = pages.len() as i64;
    for page in &mut pages {
        page.counters.insert(PAGES.to_string(), total);
    }
    collect_string_sets(ctx, &pages);
    repeat_fixed_boxes(ctx, &mut pages);
    for index in 0..pages.len() {
        ctx.current_page = index + 1;
        ctx.counters.state = PageState {
            counters: pages[index].counters.clone(),
        };
        let margin_boxes = make_margin_boxes(ctx, &pages[index]);
        pages[index].margin_boxes = margin_boxes;
    }
    pages
}

/// Record `string-set` assignments per page, from the first fragment of
/// each box.
fn collect_string_sets(ctx: &mut LayoutContext, pages: &[Page]) {
    let tree = ctx.tree;
    ctx.string_set.clear();
    let mut seen = HashSet::new();
    for page in pages {
        page.root.walk(&mut |fragment| {
            let node = tree.node(fragment.box_id);
            if node.style.string_set.is_empty() || !seen.insert(fragment.box_id) {
                return;
            }
            for set in &node.style.string_set {
                let value = set
                    .value
                    .clone()
                    .unwrap_or_else(|| tree.text_content(fragment.box_id));
                ctx.string_set
                    .entry(set.name.clone())
                    .or_default()
                    .entry(page.number)
                    .or_default()
                    .push(value);
            }
        });
    }
}

/// Lay out the fixed boxes of every page on every other page: those of
/// earlier pages below the root content, those of later pages above it.
fn repeat_fixed_boxes(ctx: &mut LayoutContext, pages: &mut [Page]) {
    let fixed: Vec<Vec<Placeholder>> = pages.iter().map(|page| page.fixed_boxes.clone()).collect();
    if fixed.iter().all(Vec::is_empty) {
        return;
    }
    for (index, page) in pages.iter_mut().enumerate() {
        ctx.current_page = page.number;
        let area = page.area();
        let before = layout_fixed_boxes(ctx, fixed[..index].iter().flatten(), &area);
        let after = layout_fixed_boxes(ctx, fixed[index + 1..].iter().flatten(), &area);
        let content = std::mem::take(&mut page.root.children);
        page.root.children = before.into_iter().chain(content).chain(after).collect();
    }
}

fn layout_fixed_boxes<'p>(
    ctx: &mut LayoutContext,
    placeholders: impl Iterator<Item = &'p Placeholder>,
    area: &ContainingBlock,
) -> Vec<Fragment> {
    placeholders
        .map(|placeholder| {
            let mut nested = Vec::new();
            let mut fragment = absolute_box_layout(ctx, placeholder, area, &mut nested);
            // Fixed boxes inside fixed boxes stay with their parent.
            while !nested.is_empty() {
                let mut next = Vec::new();
                for inner in &nested {
                    absolute_layout(ctx, inner, area, &mut fragment, &mut next);
                }
                nested = next;
            }
            fragment
        })
        .collect()
}
