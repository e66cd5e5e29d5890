use anyhow::Result;
use tracing::{info, warn};

use crate::cache::SqliteCacheStore;
use crate::cli::StatusArgs;
use crate::preprocess::TechniqueReference;

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = args.cache.resolved_db_path();
    let ttp_context_path = args
        .ttp_context_path
        .clone()
        .unwrap_or_else(|| args.cache.default_ttp_context_path());

    info!(cache_root = %args.cache.cache_root.display(), "status requested");

    if ttp_context_path.exists() {
        let reference = TechniqueReference::load(&ttp_context_path)?;
        if reference.is_empty() {
            warn!(path = %ttp_context_path.display(), "technique table is empty");
        }
        info!(
            path = %ttp_context_path.display(),
            techniques = reference.len(),
            "technique table present"
        );
    } else {
        warn!(path = %ttp_context_path.display(), "technique table missing");
    }

    if !db_path.exists() {
        warn!(path = %db_path.display(), "cache database missing");
        return Ok(());
    }

    let store = SqliteCacheStore::open(&db_path)?;
    let entries = store.count()?;
    info!(
        path = %db_path.display(),
        entries,
        "cache database status"
    );

    for entry in store.recent_entries(args.limit)? {
        info!(
            submission_id = %entry.submission_id,
            sentences = entry.sentence_count,
            stored_at = %entry.stored_at.to_rfc3339(),
            content_hash = %entry.content_hash,
            "cached entry"
        );
    }

    Ok(())
}
