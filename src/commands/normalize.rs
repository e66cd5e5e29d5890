use anyhow::{Context, Result, bail};
use tracing::info;

use super::{pipeline_config, print_json};
use crate::cli::NormalizeArgs;
use crate::pipeline::fetch_raw_report;
use crate::preprocess::{Preprocessor, ReportNormalizer};
use crate::sources::{KartonClient, TriageClient};
use crate::util::{read_json_file, write_json_pretty};

pub fn run(args: NormalizeArgs) -> Result<()> {
    let config = pipeline_config(&args.cache, &args.upstream);

    let raw = match (&args.report_path, &args.submission_id) {
        (Some(path), _) => read_json_file(path)?,
        (None, Some(submission_id)) => {
            let reports = KartonClient::new(&config)?;
            fetch_raw_report(&reports, submission_id)
                .with_context(|| format!("failed to fetch submission {submission_id}"))?
        }
        (None, None) => bail!("either --report-path or --submission-id is required"),
    };

    let normalizer = ReportNormalizer::new(TriageClient::new(&config)?, config.record_detail_kind);
    let structure = normalizer
        .process(raw)
        .context("failed to normalize report")?;

    info!(
        results = structure.results.len(),
        configs = structure.configs.len(),
        triage_results = structure.triage_results.len(),
        "normalized report"
    );

    match &args.output_path {
        Some(path) => {
            write_json_pretty(path, &structure)?;
            info!(path = %path.display(), "wrote canonical structure");
            Ok(())
        }
        None => print_json(&structure),
    }
}
