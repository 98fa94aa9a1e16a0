//! # Line Breaking
//!
//! Greedy line breaking of the single line box of a text block. Glyph
//! metrics are monospace: every character advances `char_width` em, which
//! is enough for layout to make real decisions about line counts.
//!
//! Lines avoid the floats of the current formatting context. A line that
//! cannot fit its first word next to a float moves down below it.

use super::float::{avoid_collisions, CollisionBox};
use super::fragment::{Fragment, FragmentKind};
use super::{ContainingBlock, LayoutContext, SkipStack};
use crate::boxes::BoxId;
use crate::style::Float;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token<'t> {
    Word(&'t str),
    HardBreak,
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    for (i, segment) in text.split('\n').enumerate() {
        if i > 0 {
            tokens.push(Token::HardBreak);
        }
        tokens.extend(segment.split_whitespace().map(Token::Word));
    }
    tokens
}

/// Advance width of `text`.
pub(crate) fn text_width(text: &str, font_size: f64, char_width: f64) -> f64 {
    text.chars().count() as f64 * font_size * char_width
}

/// Width of the longest word.
pub(crate) fn min_content_width(text: &str, font_size: f64, char_width: f64) -> f64 {
    text.split_whitespace()
        .map(|word| text_width(word, font_size, char_width))
        .fold(0.0, f64::max)
}

/// Width of the longest hard-broken segment laid out on one line.
pub(crate) fn max_content_width(text: &str, font_size: f64, char_width: f64) -> f64 {
    text.split('\n')
        .map(|segment| {
            let words: Vec<&str> = segment.split_whitespace().collect();
            text_width(&words.join(" "), font_size, char_width)
        })
        .fold(0.0, f64::max)
}

/// The lines of `line_id` from `skip` on, starting at `position_y`.
///
/// Every line carries the skip stack of the content after it in
/// `resume_at`; the last line of the text has none.
pub(crate) fn iter_line_boxes(
    ctx: &mut LayoutContext,
    line_id: BoxId,
    position_y: f64,
    skip: Option<&SkipStack>,
    cb: &ContainingBlock,
) -> std::vec::IntoIter<Fragment> {
    let tree = ctx.tree;
    let style = &tree.node(line_id).style;
    let (line_height, baseline) = ctx.strut(style.font_size, style.line_height);
    let char_width = ctx.config.char_width;
    let font_size = style.font_size;
    let text = ctx.line_text(line_id);
    let tokens = tokenize(&text);
    let space = text_width(" ", font_size, char_width);

    let mut lines = Vec::new();
    let mut position = skip.map_or(0, |s| s.skip);
    let mut y = position_y;
    while position < tokens.len() {
        let first_width = match tokens[position] {
            Token::Word(word) => text_width(word, font_size, char_width),
            Token::HardBreak => 0.0,
        };
        let candidate = CollisionBox {
            y,
            width: first_width,
            height: line_height,
            margin_left: 0.0,
            margin_right: 0.0,
            margin_top: 0.0,
            float: Float::None,
            is_line: true,
        };
        let (left, line_y, available) = avoid_collisions(ctx.excluded_shapes(), &candidate, cb, false);
        y = line_y;

        let mut words: Vec<&str> = Vec::new();
        let mut width = 0.0;
        while position < tokens.len() {
            match tokens[position] {
                Token::HardBreak => {
                    position += 1;
                    break;
                }
                Token::Word(word) => {
                    let word_width = text_width(word, font_size, char_width);
                    let needed = if words.is_empty() {
                        word_width
                    } else {
                        width + space + word_width
                    };
                    if !words.is_empty() && needed > available {
                        break;
                    }
                    width = needed;
                    words.push(word);
                    position += 1;
                }
            }
        }

        let x = if cb.rtl {
            left + available - width
        } else {
            left
        };
        let mut line = Fragment::empty(
            FragmentKind::Line {
                text: words.join(" "),
                baseline,
            },
            line_id,
        );
        line.x = x;
        line.y = y;
        line.width = width;
        line.height = line_height;
        line.resume_at = (position < tokens.len()).then(|| SkipStack::new(position));
        lines.push(line);
        y += line_height;
    }
    lines.into_iter()
}
