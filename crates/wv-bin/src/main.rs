//! wrapview entrypoint: lay a text file out in a word-wrapping viewport,
//! optionally apply edits through the incremental reconciler, and print the
//! visible rows.
use anyhow::{Result, bail};
use clap::Parser;
use core_config::{ConfigContext, EffectiveConfig, WrapSetting, load_from};
use core_layout::{LayoutOptions, Monospace, TextView, WrapMode};
use core_text::Buffer;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;

/// Pixel width of one display column.
const CELL_WIDTH: u32 = 8;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "wrapview", version, about = "Word-wrapping text layout viewer")]
struct Args {
    /// Path of the UTF-8 text file to lay out.
    pub path: PathBuf,
    /// Optional configuration file path (overrides discovery of `wrapview.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// 1-based display line shown in the first row.
    #[arg(long = "top-line", default_value_t = 1)]
    pub top_line: usize,
    /// Viewport width in pixels (overrides `[viewport] width`).
    #[arg(long)]
    pub width: Option<u32>,
    /// Viewport height in pixels (overrides `[viewport] height`).
    #[arg(long)]
    pub height: Option<u32>,
    /// Insert TEXT at byte offset POS after scrolling. `\n` and `\t` are unescaped.
    #[arg(long = "insert", value_name = "POS:TEXT", value_parser = parse_insert)]
    pub insert: Vec<InsertArg>,
    /// Delete LEN bytes at byte offset POS, applied after all inserts.
    #[arg(long = "delete", value_name = "POS:LEN", value_parser = parse_delete)]
    pub delete: Vec<DeleteArg>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct InsertArg {
    pos: usize,
    text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DeleteArg {
    pos: usize,
    len: usize,
}

fn parse_offset(s: &str) -> Result<usize, String> {
    s.trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid offset `{s}`: {e}"))
}

fn parse_insert(s: &str) -> Result<InsertArg, String> {
    let (pos, text) = s
        .split_once(':')
        .ok_or_else(|| format!("expected POS:TEXT, got `{s}`"))?;
    Ok(InsertArg {
        pos: parse_offset(pos)?,
        text: text.replace("\\n", "\n").replace("\\t", "\t"),
    })
}

fn parse_delete(s: &str) -> Result<DeleteArg, String> {
    let (pos, len) = s
        .split_once(':')
        .ok_or_else(|| format!("expected POS:LEN, got `{s}`"))?;
    Ok(DeleteArg {
        pos: parse_offset(pos)?,
        len: parse_offset(len)?,
    })
}

struct AppStartup {
    log_guard: Option<WorkerGuard>,
}

impl AppStartup {
    fn new() -> Self {
        Self { log_guard: None }
    }

    fn configure_logging(&mut self) -> Result<()> {
        let log_dir = Path::new(".");
        let log_path = log_dir.join("wrapview.log");
        if log_path.exists() {
            let _ = std::fs::remove_file(&log_path);
        }

        let file_appender = tracing_appender::rolling::never(log_dir, "wrapview.log");
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        match tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .try_init()
        {
            Ok(_) => {
                self.log_guard = Some(guard);
            }
            Err(_err) => {
                // Global tracing subscriber already installed; drop guard so writer shuts down.
            }
        }

        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }
}

fn layout_options(effective: &EffectiveConfig) -> LayoutOptions {
    let wrap = match effective.wrap {
        WrapSetting::None => WrapMode::NoWrap,
        WrapSetting::Column => WrapMode::AtColumn(effective.margin),
        WrapSetting::Bounds => WrapMode::AtBounds,
    };
    LayoutOptions {
        wrap,
        tab_distance: effective.tab_distance,
        viewport_width: effective.width,
        viewport_height: effective.height,
        line_height: effective.line_height,
    }
}

fn read_text(path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            debug!(target: "io", file = %path.display(), size_bytes = content.len(), "file_read_ok");
            Ok(content.replace("\r\n", "\n"))
        }
        Err(e) => {
            error!(target: "io", file = %path.display(), ?e, "file_open_error");
            Err(e.into())
        }
    }
}

/// Build the view, scroll to the requested line and apply the edits in
/// order: inserts first, then deletes.
fn lay_out(name: &str, content: &str, options: LayoutOptions, args: &Args) -> Result<TextView> {
    if args.top_line == 0 {
        bail!("--top-line is 1-based");
    }
    let buffer = Buffer::from_str(name, content)?;
    let mut view = TextView::new(buffer, Box::new(Monospace::new(CELL_WIDTH)), options);
    view.scroll_to(args.top_line, 0);

    for edit in &args.insert {
        let outcome = view.insert(edit.pos, &edit.text);
        debug!(target: "runtime", pos = edit.pos, bytes = edit.text.len(), ?outcome, "insert_applied");
    }
    for edit in &args.delete {
        let end = edit.pos.saturating_add(edit.len);
        let outcome = view.remove(edit.pos, end);
        debug!(target: "runtime", pos = edit.pos, len = edit.len, ?outcome, "delete_applied");
    }
    Ok(view)
}

/// One output line per filled row, prefixed with its row index and start
/// offset, then a summary line.
fn render(view: &TextView) -> Vec<String> {
    let engine = view.engine();
    let mut out: Vec<String> = view
        .visible_lines()
        .into_iter()
        .enumerate()
        .map(|(row, text)| {
            let start = engine.line_start(row).unwrap_or_default();
            format!("{row:>4} {start:>8} | {text}")
        })
        .collect();
    let v = view.viewport();
    out.push(format!(
        "-- top_line {} of {}, offsets {}..{}, {} rows",
        v.top_line,
        engine.buffer_line_count(),
        v.first_visible,
        v.last_visible,
        engine.line_count(),
    ));
    out
}

fn run(args: &Args) -> Result<Vec<String>> {
    let mut config = load_from(args.config.clone())?;
    let effective = config.apply_context(ConfigContext::new(args.width, args.height));
    let content = read_text(&args.path)?;
    let name = args
        .path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("file");

    let view = lay_out(name, &content, layout_options(&effective), args)?;
    let metrics = view.engine().metrics();
    info!(
        target: "runtime",
        buffer = name,
        wrap = ?effective.wrap,
        top_line = view.viewport().top_line,
        counter_invocations = metrics.counter_invocations,
        full_rebuilds = metrics.full_rebuilds,
        consistency_failures = metrics.consistency_failures,
        "layout_complete"
    );
    Ok(render(&view))
}

fn main() -> Result<()> {
    let mut startup = AppStartup::new();
    startup.configure_logging()?;
    AppStartup::install_panic_hook();
    info!(target: "runtime", "startup");

    let args = Args::parse();
    let lines = run(&args)?;
    for line in lines {
        println!("{line}");
    }

    info!(target: "runtime", "shutdown");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["wrapview", "notes.txt"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    fn column_options(margin: u32, rows: u32) -> LayoutOptions {
        LayoutOptions {
            wrap: WrapMode::AtColumn(margin),
            tab_distance: 8,
            viewport_width: 640,
            viewport_height: rows * 16,
            line_height: 16,
        }
    }

    #[test]
    fn parses_edit_arguments() {
        assert_eq!(
            parse_insert("4:a\\nb").unwrap(),
            InsertArg {
                pos: 4,
                text: "a\nb".into()
            }
        );
        // only the first colon separates the offset
        assert_eq!(parse_insert("0:x:y").unwrap().text, "x:y");
        assert_eq!(parse_delete("3:10").unwrap(), DeleteArg { pos: 3, len: 10 });
        assert!(parse_insert("nope").is_err());
        assert!(parse_delete("1:x").is_err());
    }

    #[test]
    fn cli_collects_repeated_edits() {
        let a = args(&["--insert", "0:a", "--insert", "1:b", "--delete", "2:1", "--top-line", "3"]);
        assert_eq!(a.insert.len(), 2);
        assert_eq!(a.delete, vec![DeleteArg { pos: 2, len: 1 }]);
        assert_eq!(a.top_line, 3);
        assert!(a.width.is_none());
    }

    #[test]
    fn wrap_setting_maps_to_mode() {
        let mut eff = EffectiveConfig::default();
        assert_eq!(layout_options(&eff).wrap, WrapMode::NoWrap);
        eff.wrap = WrapSetting::Column;
        eff.margin = 30;
        assert_eq!(layout_options(&eff).wrap, WrapMode::AtColumn(30));
        eff.wrap = WrapSetting::Bounds;
        eff.width = 320;
        let opts = layout_options(&eff);
        assert_eq!(opts.wrap, WrapMode::AtBounds);
        assert_eq!(opts.viewport_width, 320);
    }

    #[test]
    fn edits_are_reconciled_before_rendering() {
        let a = args(&["--insert", "0:zero\\n", "--delete", "5:4"]);
        let view = lay_out("t", "one\ntwo\nthree\n", column_options(20, 3), &a).unwrap();
        // "zero\n" lands first, then "one\n" is removed
        assert_eq!(view.buffer().text(), "zero\ntwo\nthree\n");
        assert_eq!(view.visible_lines(), vec!["zero", "two", "three"]);
        assert_eq!(view.engine().metrics().consistency_failures, 0);
    }

    #[test]
    fn render_lists_rows_and_summary() {
        let a = args(&["--top-line", "2"]);
        let view = lay_out("t", "aaaa bbbb\ncc\ndd\nee", column_options(5, 2), &a).unwrap();
        let out = render(&view);
        // the first logical line wraps, so display line 2 is its second half
        assert_eq!(out[0], "   0        5 | bbbb");
        assert_eq!(out[1], "   1       10 | cc");
        assert!(out[2].starts_with("-- top_line 2 of 5"), "{}", out[2]);
    }

    #[test]
    fn zero_top_line_is_rejected() {
        let a = args(&["--top-line", "0"]);
        assert!(lay_out("t", "x", column_options(5, 2), &a).is_err());
    }
}
