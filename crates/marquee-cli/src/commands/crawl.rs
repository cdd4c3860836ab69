use super::context::AppContext;
use super::ui::Spinner;
use crate::output::{new_table, Output};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use marquee_core::DeliveryError;
use marquee_models::WatchlistSnapshot;
use serde_json::json;

const PREVIEW_ENTRIES: usize = 10;

pub async fn run_crawl(profile: &str, username: &str, refresh: bool, output: &Output) -> Result<()> {
    let ctx = AppContext::load(profile, false)?;
    let snapshot = load_snapshot(&ctx, username, refresh).await?;

    output.json(&json!({
        "username": snapshot.username,
        "entries": snapshot.entries,
        "pages_fetched": snapshot.pages_fetched,
        "exhausted": snapshot.exhausted,
        "crawled_at": snapshot.crawled_at.to_rfc3339(),
    }));
    if !output.is_human() {
        return Ok(());
    }

    output.success(format!(
        "{} entries in {}'s watchlist ({} page(s), crawled {})",
        snapshot.len(),
        snapshot.username,
        snapshot.pages_fetched,
        snapshot.crawled_at.format("%Y-%m-%d %H:%M UTC")
    ));
    if snapshot.is_empty() {
        return Ok(());
    }

    let mut table = new_table(&["#", "Title", "Year"]);
    for (n, entry) in snapshot.entries.iter().take(PREVIEW_ENTRIES).enumerate() {
        table.add_row(vec![
            (n + 1).to_string(),
            entry.title.clone(),
            entry.year.clone().unwrap_or_default(),
        ]);
    }
    output.table(&table);
    if snapshot.len() > PREVIEW_ENTRIES {
        output.info(format!("... and {} more", snapshot.len() - PREVIEW_ENTRIES));
    }
    Ok(())
}

/// Stored or freshly crawled snapshot, with a spinner while crawling.
/// A crawl failure becomes one actionable error.
pub async fn load_snapshot(ctx: &AppContext, username: &str, refresh: bool) -> Result<WatchlistSnapshot> {
    let spinner = Spinner::start(format!("Loading watchlist for '{}'...", username));
    let result = ctx.service.get_snapshot(&ctx.identity, username, refresh).await;
    spinner.finish();

    result.map_err(|e| match e {
        DeliveryError::Crawl(crawl) => eyre!(
            "Could not read the watchlist for '{}': {}. Check the username and try again later.",
            username,
            crawl
        ),
        DeliveryError::Store(store) => eyre!("Local store problem: {}", store),
    })
}
