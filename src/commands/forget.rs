use anyhow::Result;
use tracing::{info, warn};

use crate::cache::SqliteCacheStore;
use crate::cli::ForgetArgs;

pub fn run(args: ForgetArgs) -> Result<()> {
    let db_path = args.cache.resolved_db_path();
    if !db_path.exists() {
        warn!(path = %db_path.display(), "cache database missing, nothing to forget");
        return Ok(());
    }

    let store = SqliteCacheStore::open(&db_path)?;
    if store.remove(&args.submission_id)? {
        info!(submission_id = %args.submission_id, "removed cached sentences");
    } else {
        warn!(submission_id = %args.submission_id, "no cached sentences to remove");
    }

    Ok(())
}
