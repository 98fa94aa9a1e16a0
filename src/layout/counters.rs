//! # Page-Based Counters
//!
//! `counter(page)`, `counter(pages)` and `target-counter()` make the text of
//! a line depend on the page it lands on. The collector holds the counter
//! values of the page being laid out, the page count of the previous pass
//! and the page counters of every anchor met so far. After each page it
//! reports which of these values the page read, so the pagination driver
//! knows what to make again.

use super::fragment::Fragment;
use crate::boxes::{BoxId, BoxKind, BoxTree};
use crate::model::{ContentItem, CounterChange, PageRule};
use std::collections::{BTreeMap, HashMap, HashSet};

pub const PAGE: &str = "page";
pub const PAGES: &str = "pages";

/// Counter values at a page boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageState {
    pub counters: BTreeMap<String, i64>,
}

impl PageState {
    /// Value of a counter; counters never set read as 0.
    pub fn value(&self, name: &str) -> i64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    /// Apply the counter properties of a page rule: resets, then sets, then
    /// increments. The `page` counter goes up by one unless the rule
    /// mentions it. `pages` is never touched.
    pub fn update(&mut self, rule: &PageRule) {
        let touches_page = rule
            .counter_reset
            .iter()
            .chain(&rule.counter_set)
            .chain(&rule.counter_increment)
            .any(|change| change.name == PAGE);

        for change in applicable(&rule.counter_reset) {
            self.counters.insert(change.name.clone(), change.value.unwrap_or(0));
        }
        for change in applicable(&rule.counter_set) {
            self.counters.insert(change.name.clone(), change.value.unwrap_or(0));
        }
        if !touches_page {
            *self.counters.entry(PAGE.to_string()).or_insert(0) += 1;
        }
        for change in applicable(&rule.counter_increment) {
            *self.counters.entry(change.name.clone()).or_insert(0) += change.value.unwrap_or(1);
        }
    }
}

fn applicable(changes: &[CounterChange]) -> impl Iterator<Item = &CounterChange> {
    changes.iter().filter(|change| change.name != PAGES)
}

/// What a laid-out page read from, and gave to, page-based content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageScan {
    /// A line on the page shows the page count.
    pub pages_wanted: bool,
    /// Anchors read by `target-counter()` on the page.
    pub targets: Vec<String>,
    /// Anchors whose first box in the document is on this page.
    pub anchors: Vec<String>,
    /// Those of `anchors` whose page counters differ from the last pass.
    pub moved_anchors: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CounterCollector {
    /// Counters of the page being laid out, after its page rule applied.
    pub state: PageState,
    /// Page count of the previous pass; 0 before the first one completes.
    pub total_pages: i64,
    /// Page counters of the page each anchor first appeared on.
    targets: HashMap<String, PageState>,
    page_based: HashSet<BoxId>,
}

impl CounterCollector {
    pub fn new(tree: &BoxTree) -> Self {
        Self {
            page_based: tree.page_based_lines().collect(),
            ..Default::default()
        }
    }

    /// Value of `counter(name)` on the current page.
    pub fn value(&self, name: &str) -> i64 {
        if name == PAGES {
            self.total_pages
        } else {
            self.state.value(name)
        }
    }

    /// Value of `target-counter(target, name)`, 0 while the target has not
    /// been laid out.
    pub fn target_value(&self, target: &str, name: &str) -> i64 {
        if name == PAGES {
            return self.total_pages;
        }
        self.targets
            .get(target)
            .map(|state| state.value(name))
            .unwrap_or(0)
    }

    /// Text of the line box `id` with counters resolved for the current page.
    /// Named strings and running elements only make sense in margin boxes
    /// and resolve to nothing here.
    pub fn line_text(&self, tree: &BoxTree, id: BoxId) -> String {
        let BoxKind::Line { items } = &tree.node(id).kind else {
            return String::new();
        };
        items
            .iter()
            .map(|item| match item {
                ContentItem::Text(text) => text.clone(),
                ContentItem::Counter { counter } => self.value(counter).to_string(),
                ContentItem::TargetCounter { target, counter } => {
                    self.target_value(target, counter).to_string()
                }
                ContentItem::StringRef { .. } | ContentItem::Element { .. } => String::new(),
            })
            .collect()
    }

    /// Record the anchors of a laid-out page and what its lines read.
    /// `cached` holds the anchors already met on earlier pages of this pass.
    pub fn scan_page(&mut self, tree: &BoxTree, root: &Fragment, cached: &mut HashSet<String>) -> PageScan {
        let mut scan = PageScan::default();
        root.walk(&mut |fragment| {
            let node = tree.node(fragment.box_id);
            if let Some(anchor) = &node.anchor {
                if cached.insert(anchor.clone()) {
                    scan.anchors.push(anchor.clone());
                    if self.targets.get(anchor) != Some(&self.state) {
                        self.targets.insert(anchor.clone(), self.state.clone());
                        scan.moved_anchors.push(anchor.clone());
                    }
                }
            }
            if !fragment.is_line() || !self.page_based.contains(&fragment.box_id) {
                return;
            }
            let BoxKind::Line { items } = &node.kind else {
                return;
            };
            for item in items {
                match item {
                    ContentItem::Counter { counter } if counter == PAGES => scan.pages_wanted = true,
                    ContentItem::TargetCounter { target, counter } => {
                        scan.pages_wanted |= counter == PAGES;
                        if !scan.targets.contains(target) {
                            scan.targets.push(target.clone());
                        }
                    }
                    _ => {}
                }
            }
        });
        scan
    }
}
