//! Integration tests for the quire pagination pipeline.
//!
//! These tests exercise the full path from a document (built in Rust or
//! parsed from JSON) to laid-out pages. They verify:
//! - JSON deserialization and validation
//! - Page breaks happen at the right places
//! - Page rules, named and blank pages
//! - Margin boxes resolve counters, named strings and running elements

use quire::model::*;
use quire::style::*;
use quire::{Fragment, FragmentKind, Page, QuireError};

// ─── Helpers ────────────────────────────────────────────────────

fn make_text(content: &str) -> Node {
    Node::text(content, Style::default())
}

fn make_block(height: f64) -> Node {
    Node::view(
        Style {
            height: Some(Dimension::Pt(height)),
            ..Default::default()
        },
        vec![],
    )
}

fn make_styled_view(style: Style, children: Vec<Node>) -> Node {
    Node::view(style, children)
}

fn counter(name: &str) -> ContentItem {
    ContentItem::Counter {
        counter: name.to_string(),
    }
}

/// A document on pages of `width` x `height` with `margin` on every side.
fn make_doc(children: Vec<Node>, width: f64, height: f64, margin: f64) -> Document {
    let mut doc = Document::new(children);
    doc.pages.default.size = Some(PageSize::Custom { width, height });
    doc.pages.default.margin = Some(Edges::uniform(margin));
    doc
}

fn layout_doc(doc: &Document) -> Vec<Page> {
    quire::paginate(doc).0
}

/// Text of every line under `fragment`, in tree order.
fn all_text(fragment: &Fragment) -> String {
    let mut text = String::new();
    fragment.walk(&mut |f| {
        if let FragmentKind::Line { text: line, .. } = &f.kind {
            text.push_str(line);
        }
    });
    text
}

fn margin_box_text(page: &Page, slot: MarginSlot) -> Option<String> {
    page.margin_boxes
        .iter()
        .find(|b| b.kind == FragmentKind::MarginBox { slot })
        .map(all_text)
}

fn bottom_center_page_numbers() -> MarginBoxRule {
    MarginBoxRule {
        slot: MarginSlot::BottomCenter,
        content: vec![
            ContentItem::Text("Page ".to_string()),
            counter("page"),
            ContentItem::Text(" of ".to_string()),
            counter("pages"),
        ],
        style: Style::default(),
    }
}

// ─── Basic Pipeline Tests ───────────────────────────────────────

#[test]
fn test_empty_document_has_one_page() {
    let doc = make_doc(vec![], 100.0, 100.0, 10.0);
    let pages = layout_doc(&doc);
    assert_eq!(pages.len(), 1);
    assert!(pages[0].root.children.is_empty());
    assert_eq!(pages[0].counters["pages"], 1);
}

#[test]
fn test_root_fills_the_page_area() {
    let doc = make_doc(vec![make_block(10.0)], 200.0, 300.0, 20.0);
    let pages = layout_doc(&doc);
    let root = &pages[0].root;
    assert_eq!((root.x, root.y), (20.0, 20.0));
    assert_eq!(root.width, 160.0);
    assert_eq!(root.children[0].width, 160.0);
}

#[test]
fn test_blocks_flow_into_pages() {
    let doc = make_doc(
        vec![make_block(30.0), make_block(30.0), make_block(30.0)],
        100.0,
        65.0,
        0.0,
    );
    let pages = layout_doc(&doc);
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].root.children.len(), 2);
    assert_eq!(pages[1].root.children.len(), 1);
    assert_eq!(pages[1].root.children[0].index, 2);
}

#[test]
fn test_break_after_avoid_pulls_the_previous_block_along() {
    let doc = make_doc(
        vec![
            make_block(30.0),
            make_styled_view(
                Style {
                    height: Some(Dimension::Pt(30.0)),
                    break_after: Some(BreakValue::Avoid),
                    ..Default::default()
                },
                vec![],
            ),
            make_block(30.0),
        ],
        100.0,
        65.0,
        0.0,
    );
    let pages = layout_doc(&doc);
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].root.children.len(), 1);
    let second: Vec<usize> = pages[1].root.children.iter().map(|f| f.index).collect();
    assert_eq!(second, vec![1, 2]);
}

#[test]
fn test_explicit_page_breaks() {
    let doc = make_doc(
        vec![
            make_text("One"),
            Node::page_break(),
            make_text("Two"),
            Node::page_break(),
            make_text("Three"),
        ],
        200.0,
        200.0,
        10.0,
    );
    let pages = layout_doc(&doc);
    assert_eq!(pages.len(), 3);
    let texts: Vec<String> = pages.iter().map(|page| all_text(&page.root)).collect();
    assert_eq!(texts, vec!["One", "Two", "Three"]);
}

// ─── JSON ───────────────────────────────────────────────────────

#[test]
fn test_minimal_json() {
    let json = r#"{
        "pages": { "default": { "size": { "Custom": { "width": 100, "height": 65 } }, "margin": { "top": 0, "right": 0, "bottom": 0, "left": 0 } } },
        "children": [
            { "kind": { "type": "View" }, "style": { "height": { "Pt": 30 } } },
            { "kind": { "type": "View" }, "style": { "height": { "Pt": 30 } } },
            { "kind": { "type": "View" }, "style": { "height": { "Pt": 30 } } }
        ]
    }"#;
    let pagination = quire::paginate_json(json).unwrap();
    assert_eq!(pagination.pages.len(), 2);
    assert!(pagination.stats.converged);
    assert_eq!(pagination.stats.loops, 1);
}

#[test]
fn test_default_page_is_a4_with_default_margins() {
    let json = r#"{ "children": [{ "kind": { "type": "Text", "content": "Hello" } }] }"#;
    let pagination = quire::paginate_json(json).unwrap();
    let page = &pagination.pages[0];
    assert_eq!((page.width, page.height), (595.28, 841.89));
    assert_eq!(page.margin, Edges::uniform(54.0));
}

#[test]
fn test_pages_serialize_to_json() {
    let json = r#"{ "children": [{ "kind": { "type": "Text", "content": "Hello" } }] }"#;
    let pagination = quire::paginate_json(json).unwrap();
    let value = serde_json::to_value(&pagination).unwrap();
    assert_eq!(value["pages"][0]["number"], 1);
    assert_eq!(value["pages"][0]["side"], "right");
    assert_eq!(value["stats"]["converged"], true);
}

#[test]
fn test_syntax_error_has_a_hint() {
    let err = quire::paginate_json(r#"{ "children": [], }"#).unwrap_err();
    assert!(matches!(err, QuireError::Parse { .. }));
    assert!(err.to_string().contains("Hint"));
}

#[test]
fn test_invalid_page_size_is_rejected() {
    let json = r#"{
        "pages": { "default": { "size": { "Custom": { "width": 0, "height": 100 } } } },
        "children": []
    }"#;
    let err = quire::paginate_json(json).unwrap_err();
    assert!(matches!(err, QuireError::InvalidDocument(_)), "got {}", err);
}

// ─── Page Rules ─────────────────────────────────────────────────

#[test]
fn test_named_pages_take_their_own_size() {
    let mut doc = make_doc(
        vec![
            make_block(10.0),
            make_styled_view(
                Style {
                    page: Some("landscape".to_string()),
                    ..Default::default()
                },
                vec![make_block(10.0), make_block(10.0)],
            ),
            make_block(10.0),
        ],
        100.0,
        200.0,
        0.0,
    );
    doc.pages.named.insert(
        "landscape".to_string(),
        PageRule {
            size: Some(PageSize::Custom {
                width: 200.0,
                height: 100.0,
            }),
            ..Default::default()
        },
    );
    let pages = layout_doc(&doc);
    let names: Vec<Option<&str>> = pages.iter().map(|page| page.name.as_deref()).collect();
    assert_eq!(names, vec![None, Some("landscape"), None]);
    assert_eq!(pages[1].width, 200.0);
    assert_eq!(pages[2].width, 100.0);
}

#[test]
fn test_blank_pages_count_but_hold_no_content() {
    let mut doc = make_doc(
        vec![
            make_block(10.0),
            make_styled_view(
                Style {
                    break_before: Some(BreakValue::Right),
                    height: Some(Dimension::Pt(10.0)),
                    ..Default::default()
                },
                vec![],
            ),
        ],
        100.0,
        100.0,
        0.0,
    );
    doc.pages.blank = Some(PageRule {
        margin: Some(Edges::uniform(5.0)),
        ..Default::default()
    });
    let pages = layout_doc(&doc);
    assert_eq!(pages.len(), 3);
    let blank: Vec<bool> = pages.iter().map(|page| page.blank).collect();
    assert_eq!(blank, vec![false, true, false]);
    assert_eq!(pages[1].margin, Edges::uniform(5.0));
    assert!(pages[1].root.children.is_empty());
    assert_eq!(pages[2].counters["page"], 3);
}

#[test]
fn test_left_and_right_rules() {
    let mut doc = make_doc(
        vec![make_block(30.0), make_block(30.0), make_block(30.0)],
        100.0,
        50.0,
        0.0,
    );
    doc.pages.left = Some(PageRule {
        margin: Some(Edges::symmetric(0.0, 10.0)),
        ..Default::default()
    });
    let pages = layout_doc(&doc);
    assert_eq!(pages.len(), 3);
    assert_eq!(pages[0].margin.left, 0.0);
    assert_eq!(pages[1].margin.left, 10.0);
    assert_eq!(pages[1].root.children[0].width, 80.0);
    assert_eq!(pages[2].margin.left, 0.0);
}

// ─── Margin Boxes ───────────────────────────────────────────────

#[test]
fn test_page_numbers_in_the_bottom_margin() {
    let mut doc = make_doc(
        vec![make_block(100.0), make_block(100.0)],
        300.0,
        200.0,
        30.0,
    );
    doc.pages.default.margin_boxes.push(bottom_center_page_numbers());
    let (pages, stats) = quire::paginate(&doc);
    assert_eq!(pages.len(), 2);
    assert_eq!(
        margin_box_text(&pages[0], MarginSlot::BottomCenter).as_deref(),
        Some("Page 1 of 2")
    );
    assert_eq!(
        margin_box_text(&pages[1], MarginSlot::BottomCenter).as_deref(),
        Some("Page 2 of 2")
    );
    // Margin boxes never feed back into the content
    assert_eq!(stats.loops, 1);

    let bottom = &pages[0].margin_boxes[0];
    assert_eq!(bottom.border_box_y(), 170.0);
    assert_eq!(bottom.border_height(), 30.0);
}

#[test]
fn test_first_page_rule_suppresses_a_margin_box() {
    let mut doc = make_doc(
        vec![make_block(100.0), make_block(100.0)],
        300.0,
        200.0,
        30.0,
    );
    doc.pages.default.margin_boxes.push(bottom_center_page_numbers());
    doc.pages.first = Some(PageRule {
        margin_boxes: vec![MarginBoxRule {
            slot: MarginSlot::BottomCenter,
            content: vec![],
            style: Style::default(),
        }],
        ..Default::default()
    });
    let pages = layout_doc(&doc);
    assert!(pages[0].margin_boxes.is_empty());
    assert_eq!(
        margin_box_text(&pages[1], MarginSlot::BottomCenter).as_deref(),
        Some("Page 2 of 2")
    );
}

#[test]
fn test_named_strings_in_the_header() {
    let chapter = |title: &str, break_before: Option<BreakValue>| {
        Node::text(
            title,
            Style {
                break_before,
                string_set: Some(vec![StringSet {
                    name: "chapter".to_string(),
                    value: None,
                }]),
                ..Default::default()
            },
        )
    };
    let mut doc = make_doc(
        vec![
            chapter("Intro", None),
            make_block(100.0),
            chapter("Body", Some(BreakValue::Page)),
            make_block(100.0),
            make_block(100.0),
        ],
        300.0,
        200.0,
        30.0,
    );
    doc.pages.default.margin_boxes.push(MarginBoxRule {
        slot: MarginSlot::TopCenter,
        content: vec![ContentItem::StringRef {
            string: "chapter".to_string(),
            keyword: StringKeyword::First,
        }],
        style: Style::default(),
    });
    let pages = layout_doc(&doc);
    assert_eq!(pages.len(), 3);
    let headers: Vec<Option<String>> = pages
        .iter()
        .map(|page| margin_box_text(page, MarginSlot::TopCenter))
        .collect();
    assert_eq!(
        headers,
        vec![
            Some("Intro".to_string()),
            Some("Body".to_string()),
            Some("Body".to_string()),
        ]
    );
}

#[test]
fn test_running_elements_move_into_the_header() {
    let running = Node::text(
        "Annual Report",
        Style {
            position: Some(Position::Running("header".to_string())),
            ..Default::default()
        },
    );
    let mut doc = make_doc(
        vec![running, make_block(100.0), make_block(100.0)],
        300.0,
        200.0,
        30.0,
    );
    doc.pages.default.margin_boxes.push(MarginBoxRule {
        slot: MarginSlot::TopCenter,
        content: vec![ContentItem::Element {
            element: "header".to_string(),
            keyword: StringKeyword::First,
        }],
        style: Style::default(),
    });
    let pages = layout_doc(&doc);
    assert_eq!(pages.len(), 2);
    // Out of the flow: the first block starts at the top of the page area
    let first_in_flow = pages[0]
        .root
        .children
        .iter()
        .find(|f| f.is_in_normal_flow())
        .unwrap();
    assert_eq!(first_in_flow.border_box_y(), 30.0);
    for page in &pages {
        assert_eq!(
            margin_box_text(page, MarginSlot::TopCenter).as_deref(),
            Some("Annual Report"),
            "page {}",
            page.number
        );
    }
}

// ─── Cross-References ───────────────────────────────────────────

#[test]
fn test_table_of_contents_points_at_later_pages() {
    let json = r#"{
        "pages": { "default": { "size": { "Custom": { "width": 100, "height": 100 } }, "margin": { "top": 0, "right": 0, "bottom": 0, "left": 0 } } },
        "children": [
            { "kind": { "type": "Text", "items": [{ "target": "totals", "counter": "page" }] } },
            { "kind": { "type": "View" }, "style": { "height": { "Pt": 90 } } },
            { "kind": { "type": "View" }, "style": { "height": { "Pt": 90 } } },
            { "kind": { "type": "View" }, "id": "totals", "style": { "height": { "Pt": 10 } } }
        ]
    }"#;
    let pagination = quire::paginate_json(json).unwrap();
    assert_eq!(pagination.pages.len(), 3);
    assert_eq!(all_text(&pagination.pages[0].root), "3");
    assert!(pagination.stats.loops >= 2);
    assert!(pagination.stats.converged);
}

// ─── Tables and Columns ─────────────────────────────────────────

#[test]
fn test_table_header_repeats_across_pages() {
    let row = |is_header: bool| {
        Node::row(
            is_header,
            vec![Node::cell(Style::default(), vec![make_block(10.0)])],
        )
    };
    let doc = make_doc(
        vec![Node::table(
            vec![],
            Style::default(),
            vec![row(true), row(false), row(false), row(false), row(false)],
        )],
        100.0,
        35.0,
        0.0,
    );
    let pages = layout_doc(&doc);
    assert_eq!(pages.len(), 2);
    let continued = &pages[1].root.children[0];
    assert_eq!(continued.kind, FragmentKind::Table);
    assert_eq!(continued.children[0].index, 0);
}

#[test]
fn test_columns_balance_on_the_last_page() {
    let doc = make_doc(
        vec![make_styled_view(
            Style {
                column_count: Some(2),
                column_gap: Some(0.0),
                ..Default::default()
            },
            (0..4).map(|_| make_block(10.0)).collect(),
        )],
        100.0,
        200.0,
        0.0,
    );
    let pages = layout_doc(&doc);
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].root.children[0].height, 20.0);
}
