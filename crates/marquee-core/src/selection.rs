use crate::disambiguation::titles_match;
use marquee_models::ResolvedMovie;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;

/// Up to `count` distinct movies, chosen uniformly at random
pub fn pick_random<R: Rng + ?Sized>(pool: &[Arc<ResolvedMovie>], count: usize, rng: &mut R) -> Vec<ResolvedMovie> {
    pool.choose_multiple(rng, count)
        .map(|movie| movie.as_ref().clone())
        .collect()
}

/// Movies named explicitly, in the order asked for. Titles with no match in
/// the pool come back in the second list.
pub fn pick_by_title(pool: &[Arc<ResolvedMovie>], titles: &[String]) -> (Vec<ResolvedMovie>, Vec<String>) {
    let mut picks: Vec<ResolvedMovie> = Vec::new();
    let mut missing = Vec::new();

    for title in titles {
        match pool.iter().find(|movie| titles_match(&movie.title, title)) {
            Some(movie) if !picks.iter().any(|p| p.id == movie.id) => picks.push(movie.as_ref().clone()),
            Some(_) => {}
            None => missing.push(title.clone()),
        }
    }
    (picks, missing)
}
