//! Incremental line layout for a word-wrapping text viewport.
//!
//! The engine keeps one buffer offset per visible row (the line-start table)
//! and updates it after each edit by touching only the rows the edit can have
//! changed. Everything it knows about wrapping comes from a single forward
//! scan, the wrapped line counter, which runs over the live buffer or over a
//! scratch copy of text that has just been deleted.
//!
//! Module map:
//! - `counter`: wrapped line counting and the display line navigation built on it.
//! - `line_starts`: the per-row table, its fill routine and consistency check.
//! - `engine`: engine state, creation, re-wrapping and absolute line numbers.
//! - `reconcile`: edit hooks, wrap-range widening and the table patch cases.
//! - `viewport`: scrolling, resizing, settling and keeping a position visible.
//! - `position`: offset and pixel conversion, row widths.
//! - `view`: a buffer, its styles and its engine kept in step.
//!
//! Invariants (checked after every reconcile):
//! - Row 0 holds the first visible offset.
//! - Filled rows are non-decreasing and never exceed the text length.
//! - Once a row is empty, every row below it is empty.
//!
//! Offsets are UTF-8 byte offsets into the text; every scan steps whole
//! characters.
//!
//! Telemetry:
//! - `layout.reconcile`: one debug event per reconciled edit, a warning when
//!   the table fails its consistency check and is rebuilt.
//! - `layout.viewport`: scroll clamping, resize and re-wrap events.
//! - `layout.counter`: trace events from display line navigation.
//! - [`LayoutMetrics`] counts scans, placements and rebuilds.

pub mod counter;
pub mod engine;
pub mod error;
pub mod line_starts;
pub mod metrics;
pub mod policy;
pub mod position;
pub mod reconcile;
pub mod style;
pub mod view;
pub mod viewport;

pub use counter::{LineCount, LineCounter};
pub use engine::{LayoutEngine, LayoutOptions, ViewportState, visible_lines};
pub use error::LayoutError;
pub use line_starts::LineStarts;
pub use metrics::{LayoutMetrics, LayoutMetricsSnapshot};
pub use policy::{WrapMode, WrapPolicy};
pub use position::{PixelPos, Rounding};
pub use reconcile::{EditDescriptor, EditPlacement, Reconciled};
pub use style::{DEFAULT_STYLE, GlyphTable, Monospace, StyleResolver, StyleRun, StyleTag, glyph_width};
pub use view::TextView;
