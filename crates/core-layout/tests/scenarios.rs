//! End-to-end layout scenarios: wrapping, edits above the viewport,
//! proportional deletes across a wrap point, and scroll clamping.

use core_layout::{
    DEFAULT_STYLE, EditDescriptor, EditPlacement, GlyphTable, LayoutEngine, LayoutOptions,
    Monospace, TextView, WrapMode, WrapPolicy,
};
use core_text::{Buffer, NoopObserver, ScratchText};

fn options(wrap: WrapMode, width: u32, rows: u32) -> LayoutOptions {
    LayoutOptions {
        wrap,
        tab_distance: 8,
        viewport_width: width,
        viewport_height: rows,
        line_height: 1,
    }
}

/// `count` lines of ten bytes each: "line-0000\n", "line-0001\n", ...
fn ten_byte_lines(count: usize) -> String {
    (0..count).map(|i| format!("line-{i:04}\n")).collect()
}

#[test]
fn wraps_at_the_last_blank_that_fits() {
    let text = ScratchText::new("aaaa bbbb cccc");
    let styles = Monospace::new(1);
    let engine = LayoutEngine::new(options(WrapMode::AtColumn(10), 80, 4), &text, &styles);
    // "aaaa bbbb " is exactly ten columns, so only "cccc" moves down
    assert_eq!(engine.buffer_line_count(), 2);
    assert_eq!(engine.line_starts(), &[Some(0), Some(10), None, None]);
    assert_eq!(engine.line_length(&text, &styles, 0), 9);
    assert_eq!(engine.line_length(&text, &styles, 1), 4);
}

#[test]
fn narrower_margin_breaks_after_each_word() {
    let buffer = Buffer::from_str("a", "aaaa bbbb cccc").unwrap();
    let view = TextView::new(
        buffer,
        Box::new(Monospace::new(1)),
        options(WrapMode::AtColumn(8), 80, 4),
    );
    assert_eq!(view.visible_lines(), vec!["aaaa", "bbbb", "cccc"]);
    assert_eq!(view.engine().line_start(1), Some(5));
}

#[test]
fn blank_that_overflows_becomes_the_wrap_point() {
    let buffer = Buffer::from_str("a", "aaaa bbbb cccc").unwrap();
    let view = TextView::new(
        buffer,
        Box::new(Monospace::new(1)),
        options(WrapMode::AtColumn(9), 80, 4),
    );
    assert_eq!(view.visible_lines(), vec!["aaaa bbbb", "cccc"]);
}

#[test]
fn insert_above_the_viewport_only_shifts() {
    let styles = Monospace::new(1);
    let mut buffer = Buffer::from_str("b", &ten_byte_lines(20)).unwrap();
    let mut engine = LayoutEngine::new(options(WrapMode::AtColumn(20), 80, 3), &buffer, &styles);
    assert_eq!(engine.policy(), WrapPolicy::FixedColumn(20));
    engine.scroll_to(&buffer, &styles, 6, 0);
    assert_eq!(engine.viewport().first_visible, 50);
    assert_eq!(engine.line_starts(), &[Some(50), Some(60), Some(70)]);

    buffer.insert(0, "x", &mut NoopObserver);
    let before = engine.metrics().counter_invocations;
    let r = engine.reconcile(
        &buffer,
        &styles,
        EditDescriptor {
            position: 0,
            chars_inserted: 1,
            chars_deleted: 0,
            lines_inserted: 0,
            lines_deleted: 0,
        },
    );
    assert_eq!(r.placement, EditPlacement::BeforeViewport);
    assert!(!r.scrolled);
    assert_eq!(engine.metrics().counter_invocations, before);
    assert_eq!(engine.line_starts(), &[Some(51), Some(61), Some(71)]);
    let v = engine.viewport();
    assert_eq!(v.first_visible, 51);
    assert_eq!(v.top_line, 6);
}

#[test]
fn unwrapped_edit_above_the_viewport_never_counts() {
    let buffer = Buffer::from_str("b", &ten_byte_lines(20)).unwrap();
    let mut view = TextView::new(buffer, Box::new(Monospace::new(1)), options(WrapMode::NoWrap, 80, 3));
    view.scroll_to(6, 0);
    let before = view.engine().metrics();
    let r = view.insert(0, "x").unwrap();
    assert_eq!(r.placement, EditPlacement::BeforeViewport);
    let after = view.engine().metrics();
    assert_eq!(after.counter_invocations, before.counter_invocations);
    assert_eq!(after.edits_before_viewport, before.edits_before_viewport + 1);
    assert_eq!(view.engine().line_starts(), &[Some(51), Some(61), Some(71)]);

    // a new line above the viewport moves the top line number, not the rows
    let r = view.insert(1, "\n").unwrap();
    assert_eq!(r.placement, EditPlacement::BeforeViewport);
    assert_eq!(view.viewport().top_line, 7);
    assert_eq!(view.visible_lines(), vec!["line-0005", "line-0006", "line-0007"]);
}

#[test]
fn proportional_delete_across_a_wrap_point() {
    let buffer = Buffer::from_str("c", "aaaa bbbb cccc dddd").unwrap();
    let mut view = TextView::new(buffer, Box::new(GlyphTable::new(10)), options(WrapMode::AtBounds, 50, 4));
    assert_eq!(view.engine().policy(), WrapPolicy::PixelWidth(50));
    assert_eq!(view.visible_lines(), vec!["aaaa", "bbbb", "cccc", "dddd"]);

    view.remove(3, 7);
    assert_eq!(view.buffer().text(), "aaabb cccc dddd");
    assert_eq!(view.visible_lines(), vec!["aaabb", "cccc", "dddd"]);
    let m = view.engine().metrics();
    assert_eq!(m.pre_measured_deletes, 1);
    assert_eq!(m.consistency_failures, 0);
    assert_eq!(view.engine().buffer_line_count(), 3);
}

#[test]
fn scroll_past_the_end_is_clamped() {
    let content: Vec<String> = (0..10).map(|i| format!("line{i}")).collect();
    let text = ScratchText::new(content.join("\n"));
    let styles = Monospace::new(1);
    let mut engine = LayoutEngine::new(options(WrapMode::NoWrap, 80, 4), &text, &styles);
    let v = engine.scroll_to(&text, &styles, 1000, 0);
    // the last line sits above one blank row
    assert_eq!(v.top_line, 8);
    assert_eq!(v.first_visible, 42);
    assert_eq!(engine.line_starts(), &[Some(42), Some(48), Some(54), None]);
    assert_eq!(engine.metrics().consistency_failures, 0);
}

#[test]
fn text_shorter_than_the_viewport_never_scrolls() {
    let text = ScratchText::new("one\ntwo");
    let styles = Monospace::new(1);
    let mut engine = LayoutEngine::new(options(WrapMode::NoWrap, 80, 5), &text, &styles);
    assert_eq!(engine.scroll_to(&text, &styles, 3, 0).top_line, 1);
}

#[test]
fn newline_after_a_proportional_rewrap_matches_a_fresh_layout() {
    let styles = GlyphTable::new(3)
        .with_advance(DEFAULT_STYLE, ' ', 2)
        .with_advance(DEFAULT_STYLE, 'x', 11);
    let buffer = Buffer::from_str("p", "a  xx").unwrap();
    let mut view = TextView::new(
        buffer,
        Box::new(styles.clone()),
        options(WrapMode::AtBounds, 18, 4),
    );
    // "a  x" is exactly 18px; each x past it needs a row of its own
    assert_eq!(view.engine().line_starts(), &[Some(0), Some(3), Some(4), None]);
    assert_eq!(view.engine().buffer_line_count(), 3);

    view.insert(4, "\n");
    assert_eq!(view.buffer().text(), "a  x\nx");
    assert_eq!(view.engine().line_starts(), &[Some(0), Some(5), None, None]);
    assert_eq!(view.engine().buffer_line_count(), 2);

    let fresh = LayoutEngine::new(options(WrapMode::AtBounds, 18, 4), view.buffer(), &styles);
    assert_eq!(view.engine().line_starts(), fresh.line_starts());
    assert_eq!(view.viewport(), fresh.viewport());
    assert_eq!(view.engine().buffer_line_count(), fresh.buffer_line_count());
}

#[test]
fn tab_wider_than_the_margin_at_the_end_adds_no_line() {
    let text = ScratchText::new("a\n\t");
    let styles = Monospace::new(1);
    let mut opts = options(WrapMode::AtColumn(3), 80, 4);
    opts.tab_distance = 4;
    let engine = LayoutEngine::new(opts, &text, &styles);
    assert_eq!(engine.line_starts(), &[Some(0), Some(2), None, None]);
    assert_eq!(engine.buffer_line_count(), 2);
}
