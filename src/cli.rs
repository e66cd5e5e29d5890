use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::preprocess::Section;

#[derive(Parser, Debug)]
#[command(
    name = "amplec",
    version,
    about = "Turns Karton and Triage analysis reports into filtered natural-language sentences"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline for a submission and filter the sentences.
    Process(ProcessArgs),
    /// Write the canonical structure of a report.
    Normalize(NormalizeArgs),
    /// Naturalize and enrich a raw report file without caching.
    Naturalize(NaturalizeArgs),
    Status(StatusArgs),
    /// Drop the cached sentences of a submission.
    Forget(ForgetArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CacheArgs {
    #[arg(long, default_value = ".cache/amplec")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}

impl CacheArgs {
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.cache_root.join("amplec_cache.sqlite"))
    }

    pub fn default_ttp_context_path(&self) -> PathBuf {
        self.cache_root.join("ttp_context.json")
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum SectionArg {
    Configs,
    Hierarchy,
    Results,
    Triage,
}

impl From<SectionArg> for Section {
    fn from(value: SectionArg) -> Self {
        match value {
            SectionArg::Configs => Self::Configs,
            SectionArg::Hierarchy => Self::Hierarchy,
            SectionArg::Results => Self::Results,
            SectionArg::Triage => Self::TriageResults,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct UpstreamArgs {
    #[arg(long, env = "KARTON_RESULT_API_URL")]
    pub karton_result_api_url: Option<String>,

    #[arg(long, env = "TRIAGE_URL", default_value = "https://tria.ge/api/v0")]
    pub triage_url: String,

    #[arg(long, env = "TRIAGE_API_KEY", hide_env_values = true, default_value = "")]
    pub triage_api_key: String,

    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    #[arg(long)]
    pub ttp_context_path: Option<PathBuf>,

    /// Store the full triage report instead of the overview on every result record.
    #[arg(long, default_value_t = false)]
    pub rich_triage: bool,

    #[arg(long = "section", value_enum)]
    pub sections: Vec<SectionArg>,
}

#[derive(Args, Debug, Clone)]
pub struct ProcessArgs {
    pub submission_id: String,

    #[arg(long, default_value = "")]
    pub pattern: String,

    #[arg(long = "regex", default_value_t = false)]
    pub use_regex: bool,

    /// Ignore cached sentences and recompute them.
    #[arg(long, default_value_t = false)]
    pub reprocess: bool,

    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[command(flatten)]
    pub cache: CacheArgs,

    #[command(flatten)]
    pub upstream: UpstreamArgs,
}

#[derive(Args, Debug, Clone)]
pub struct NormalizeArgs {
    #[arg(long, conflicts_with = "submission_id", required_unless_present = "submission_id")]
    pub report_path: Option<PathBuf>,

    #[arg(long)]
    pub submission_id: Option<String>,

    /// Written to stdout when omitted.
    #[arg(long)]
    pub output_path: Option<PathBuf>,

    #[command(flatten)]
    pub cache: CacheArgs,

    #[command(flatten)]
    pub upstream: UpstreamArgs,
}

#[derive(Args, Debug, Clone)]
pub struct NaturalizeArgs {
    #[arg(long)]
    pub report_path: PathBuf,

    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[command(flatten)]
    pub cache: CacheArgs,

    #[command(flatten)]
    pub upstream: UpstreamArgs,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value_t = 10)]
    pub limit: usize,

    #[command(flatten)]
    pub cache: CacheArgs,

    #[arg(long)]
    pub ttp_context_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ForgetArgs {
    pub submission_id: String,

    #[command(flatten)]
    pub cache: CacheArgs,
}
