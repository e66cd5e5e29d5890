use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::{build_enricher, build_naturalizer, pipeline_config, print_json, print_sentences};
use crate::cache::SqliteCacheStore;
use crate::cli::ProcessArgs;
use crate::filter::FilterOutcome;
use crate::pipeline::Pipeline;
use crate::sources::{KartonClient, TriageClient};

pub fn run(args: ProcessArgs) -> Result<()> {
    let config = pipeline_config(&args.cache, &args.upstream);
    info!(
        submission_id = %args.submission_id,
        db_path = %config.cache_db_path.display(),
        reprocess = args.reprocess,
        "process requested"
    );

    let naturalizer = build_naturalizer(&args.upstream);
    debug!(sections = ?naturalizer.sections(), "naturalizer sections");

    let pipeline = Pipeline::new(
        KartonClient::new(&config)?,
        TriageClient::new(&config)?,
        SqliteCacheStore::open(&config.cache_db_path)?,
        naturalizer,
        build_enricher(&config)?,
        config.record_detail_kind,
    );

    let outcome = pipeline
        .process(
            &args.submission_id,
            &args.pattern,
            args.use_regex,
            args.reprocess,
        )
        .with_context(|| format!("failed to process submission {}", args.submission_id))?;

    if outcome == FilterOutcome::NoMatches {
        warn!(pattern = %args.pattern, "no sentences matched the pattern");
    } else {
        info!(count = outcome.sentences().len(), "sentences selected");
    }

    if args.json {
        print_json(&outcome)
    } else {
        print_sentences(outcome.sentences())
    }
}
