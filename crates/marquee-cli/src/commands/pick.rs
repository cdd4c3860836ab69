use super::context::AppContext;
use super::crawl::load_snapshot;
use super::resolve::movie_row;
use crate::output::{new_table, Output};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use marquee_core::{initial_window, pick_by_title, pick_random};
use serde_json::json;

pub async fn run_pick(
    profile: &str,
    username: &str,
    count: usize,
    titles: Vec<String>,
    refresh: bool,
    output: &Output,
) -> Result<()> {
    let ctx = AppContext::load(profile, true)?;
    let snapshot = load_snapshot(&ctx, username, refresh).await?;
    let window = initial_window(&snapshot, ctx.config.window.size);
    let resolution = ctx.service.resolve_visible(&window, &[]).await;
    ctx.persist_cache().await;

    let pool = resolution.movies();
    if pool.is_empty() {
        return Err(eyre!("Nothing in the first window of '{}' could be resolved", username));
    }

    let picks = if titles.is_empty() {
        pick_random(&pool, count, &mut rand::thread_rng())
    } else {
        let (picks, missing) = pick_by_title(&pool, &titles);
        for title in missing {
            output.warn(format!("'{}' is not among the resolved movies", title));
        }
        picks
    };
    if picks.is_empty() {
        output.warn("No movies picked; nothing recorded");
        return Ok(());
    }

    let log = ctx
        .service
        .record_selection(&ctx.identity, &snapshot.username, picks)
        .map_err(|e| eyre!("Failed to record selection: {}", e))?;

    output.json(&json!({
        "username": log.username,
        "selected_at": log.selected_at.to_rfc3339(),
        "picks": log.picks,
    }));
    if output.is_human() {
        let mut table = new_table(&["#", "Title", "Year", "Director", "Runtime", "Genres"]);
        for (n, movie) in log.picks.iter().enumerate() {
            table.add_row(movie_row((n + 1).to_string(), movie));
        }
        output.table(&table);
        output.success(format!("Recorded {} pick(s) from {}'s watchlist", log.picks.len(), log.username));
    }
    Ok(())
}
