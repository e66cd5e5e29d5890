use anyhow::{Context, Result};
use tracing::info;

use super::{build_enricher, build_naturalizer, pipeline_config, print_json, print_sentences};
use crate::cli::NaturalizeArgs;
use crate::preprocess::{Preprocessor, ReportNormalizer};
use crate::sources::TriageClient;
use crate::util::read_json_file;

pub fn run(args: NaturalizeArgs) -> Result<()> {
    let config = pipeline_config(&args.cache, &args.upstream);
    let raw = read_json_file(&args.report_path)?;

    let normalizer = ReportNormalizer::new(TriageClient::new(&config)?, config.record_detail_kind);
    let naturalizer = build_naturalizer(&args.upstream);
    let enricher = build_enricher(&config)?;

    let structure = normalizer
        .process(raw)
        .context("failed to normalize report")?;
    let sentences = naturalizer
        .process(structure)
        .context("failed to naturalize report")?;
    let sentences = enricher
        .process(sentences)
        .context("failed to enrich sentences")?;

    info!(
        path = %args.report_path.display(),
        count = sentences.len(),
        "naturalized report"
    );

    if args.json {
        print_json(&sentences)
    } else {
        print_sentences(&sentences)
    }
}
