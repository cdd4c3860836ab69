use super::context::AppContext;
use crate::output::{new_table, Output};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde_json::json;

pub async fn run_history(profile: &str, output: &Output) -> Result<()> {
    let ctx = AppContext::load(profile, false)?;
    let logs = ctx
        .service
        .selection_history(&ctx.identity)
        .map_err(|e| eyre!("Failed to read selection history: {}", e))?;

    output.json(&json!({ "identity": ctx.identity.as_str(), "selections": logs }));
    if !output.is_human() {
        return Ok(());
    }
    if logs.is_empty() {
        output.info("No selections recorded yet. Try `marquee pick <username>`.");
        return Ok(());
    }

    let mut table = new_table(&["Selected", "Watchlist", "Picks"]);
    for log in &logs {
        let titles: Vec<String> = log
            .picks
            .iter()
            .map(|movie| match movie.release_year {
                Some(year) => format!("{} ({})", movie.title, year),
                None => movie.title.clone(),
            })
            .collect();
        table.add_row(vec![
            log.selected_at.format("%Y-%m-%d %H:%M").to_string(),
            log.username.clone(),
            titles.join("\n"),
        ]);
    }
    output.table(&table);
    Ok(())
}
