//! # Quire
//!
//! A page-native block layout engine.
//!
//! Most renderers treat a document as an infinite vertical canvas and then
//! slice it into pages after layout. Quire does the opposite: **the page is
//! the fundamental unit of layout.** Every block, column run, table row and
//! flex line is placed with the bottom of the page area as a hard
//! constraint, and content that does not fit is resumed on the next page.
//!
//! ## Architecture
//!
//! ```text
//! Input (JSON/API)
//!       ↓
//!   [model]    : Document tree and @page rules
//!       ↓
//!   [style]    : Computed values, inheritance, defaults
//!       ↓
//!   [boxes]    : Box tree: anonymous column and line boxes
//!       ↓
//!   [layout]   : Fragmentation into pages, margin boxes, counters
//!       ↓
//!   Pages (fragment trees, serializable as JSON)
//! ```

pub mod boxes;
pub mod error;
pub mod layout;
pub mod model;
pub mod style;

pub use error::QuireError;
pub use layout::{Fragment, FragmentKind, LayoutStats, Page, PageSide};
pub use model::Document;

use boxes::BoxTree;
use layout::LayoutContext;
use serde::Serialize;

/// Laid-out pages of a document and how the run went.
#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub pages: Vec<Page>,
    pub stats: LayoutStats,
}

/// Fragment a document into pages.
///
/// This is the primary entry point. Layout always produces a result:
/// content that cannot fit is pushed to the next page or overflows.
pub fn paginate(document: &Document) -> (Vec<Page>, LayoutStats) {
    let tree = BoxTree::build(document);
    let mut ctx = LayoutContext::new(&tree, &document.pages, &document.config);
    let pages = layout::pagination::layout_document(&mut ctx);
    (pages, ctx.stats)
}

/// Fragment a document described as JSON into pages.
pub fn paginate_json(json: &str) -> Result<Pagination, QuireError> {
    let document = Document::from_json(json)?;
    let (pages, stats) = paginate(&document);
    Ok(Pagination { pages, stats })
}
