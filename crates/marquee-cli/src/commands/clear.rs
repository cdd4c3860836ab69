use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use marquee_config::PathManager;
use marquee_core::{FileStore, PersistentStore, ResolutionCacheStorage};

pub async fn run_clear(all: bool, cache: bool, store: bool, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();

    if !(all || cache || store) {
        output.warn("No clear option specified. Use --cache, --store, or --all");
        output.info("\nExample: marquee clear --cache");
        return Ok(());
    }

    if all || cache {
        let storage = ResolutionCacheStorage::new(path_manager.resolution_cache_file());
        let removed = storage
            .remove()
            .map_err(|e| eyre!("Failed to clear resolution cache: {}", e))?;
        if removed {
            output.success(format!("Cleared resolution cache: {}", storage.path().display()));
        } else {
            output.info("No resolution cache found to clear");
        }
    }

    if all || store {
        let store_dir = path_manager.store_dir();
        FileStore::new(&store_dir)
            .clear()
            .map_err(|e| eyre!("Failed to clear stored watchlists: {}", e))?;
        output.success(format!("Cleared stored watchlists and selections: {}", store_dir.display()));
    }

    Ok(())
}
