use super::context::AppContext;
use super::crawl::load_snapshot;
use crate::output::{new_table, Output};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{Cell, Color};
use marquee_core::{EntryOutcome, EntryResolution, WindowResolution, WindowSession};
use marquee_models::{PinnedEntry, ResolvedMovie};
use marquee_sources::letterboxd::split_title_year;
use serde_json::json;

pub struct ResolveOptions {
    pub size: Option<usize>,
    pub reveal: usize,
    pub pins: Vec<String>,
    pub refresh: bool,
}

pub async fn run_resolve(profile: &str, username: &str, options: ResolveOptions, output: &Output) -> Result<()> {
    let ctx = AppContext::load(profile, true)?;
    let snapshot = load_snapshot(&ctx, username, options.refresh).await?;

    let size = options.size.unwrap_or(ctx.config.window.size);
    if size == 0 {
        return Err(eyre!("--size must be at least 1"));
    }

    let session = WindowSession::new(snapshot, size);
    for pin in &options.pins {
        session.pin(PinnedEntry::new(split_title_year(pin)));
    }

    let mut resolution = session.resolve(&ctx.service).await;
    for _ in 0..options.reveal {
        if session.window().covers(session.snapshot()) {
            break;
        }
        if let Some(revealed) = session.reveal_more(&ctx.service).await {
            resolution = revealed;
        }
    }
    ctx.persist_cache().await;

    render_resolution(&resolution, session.window().len(), session.snapshot().len(), output);
    Ok(())
}

pub fn render_resolution(resolution: &WindowResolution, visible: usize, total: usize, output: &Output) {
    output.json(&json!({
        "visible": visible,
        "total": total,
        "entries": resolution.entries.iter().map(entry_json).collect::<Vec<_>>(),
        "summary": {
            "resolved": resolution.summary.resolved,
            "cached": resolution.summary.cached,
            "failed": resolution.summary.failed,
            "pending": resolution.summary.pending,
        },
    }));
    if !output.is_human() {
        return;
    }

    let mut table = new_table(&["#", "Title", "Year", "Director", "Runtime", "Genres"]);
    for (n, resolution) in resolution.entries.iter().enumerate() {
        let marker = if resolution.pinned { format!("{} *", n + 1) } else { (n + 1).to_string() };
        match &resolution.outcome {
            EntryOutcome::Resolved(movie) => {
                table.add_row(movie_row(marker, movie));
            }
            EntryOutcome::Pending => {
                table.add_row(vec![
                    Cell::new(marker),
                    Cell::new(resolution.entry.to_string()),
                    Cell::new("still resolving, run again shortly").fg(Color::Yellow),
                ]);
            }
            EntryOutcome::Failed(reason) => {
                table.add_row(vec![
                    Cell::new(marker),
                    Cell::new(resolution.entry.to_string()),
                    Cell::new(format!("unresolved: {}", reason)).fg(Color::Red),
                ]);
            }
        }
    }
    output.table(&table);

    let summary = &resolution.summary;
    output.info(format!(
        "Showing {} of {} entries | {} resolved, {} cached, {} failed, {} pending",
        visible, total, summary.resolved, summary.cached, summary.failed, summary.pending
    ));
    if summary.failed > 0 {
        output.warn("Failed entries are retried automatically on a later run");
    }
}

pub fn movie_row(marker: String, movie: &ResolvedMovie) -> Vec<Cell> {
    vec![
        Cell::new(marker),
        Cell::new(&movie.title),
        Cell::new(movie.release_year.map(|y| y.to_string()).unwrap_or_default()),
        Cell::new(&movie.director),
        Cell::new(movie.runtime_minutes.map(|m| format!("{} min", m)).unwrap_or_default()),
        Cell::new(movie.genres.join(", ")),
    ]
}

fn entry_json(resolution: &EntryResolution) -> serde_json::Value {
    let (status, movie, error) = match &resolution.outcome {
        EntryOutcome::Resolved(movie) => ("resolved", serde_json::to_value(movie.as_ref()).ok(), None),
        EntryOutcome::Pending => ("pending", None, None),
        EntryOutcome::Failed(reason) => ("failed", None, Some(reason.to_string())),
    };
    json!({
        "entry": resolution.entry,
        "pinned": resolution.pinned,
        "status": status,
        "movie": movie,
        "error": error,
    })
}
