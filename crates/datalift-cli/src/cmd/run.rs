//! `datalift run` / `ingest` / `arxiv` - execute ingestion jobs

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;

use datalift_core::{
    ArxivSource, DataSource, Destination, IngestionJob, JobRunner, KaggleSource, SharedProgress,
};

use crate::cmd::{job_runner, print_summary};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Job name from the [jobs] section of the config
    #[arg(short, long)]
    pub job: String,

    /// Workspace root (default: config `workspace`, then data/tmp)
    #[arg(short, long)]
    pub workspace: Option<PathBuf>,
}

/// Options shared by the ad-hoc commands.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Only keep files with these exact base names (repeatable)
    #[arg(short, long = "file")]
    pub files: Vec<String>,

    /// Destination bucket (default: config `default_bucket`)
    #[arg(short, long)]
    pub bucket: Option<String>,

    /// Object name prefix
    #[arg(short, long, default_value = "")]
    pub prefix: String,

    /// Workspace root (default: config `workspace`, then data/tmp)
    #[arg(short, long)]
    pub workspace: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Kaggle dataset reference, OWNER/SLUG
    pub dataset: String,

    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(Args, Debug)]
pub struct ArxivArgs {
    /// arXiv category, e.g. cs.LG
    pub category: String,

    /// Dataset slug used to name the job
    #[arg(short, long)]
    pub dataset: String,

    #[command(flatten)]
    pub target: TargetArgs,
}

pub fn run(args: RunArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    // Job definition errors come before any client or store setup
    let workspace = args.workspace.unwrap_or_else(|| config.workspace.clone());
    let job = config
        .jobs_config()
        .build_job(&args.job, &config.origin(), &workspace)?;

    let runner = job_runner(config, Some(workspace), progress)?;
    execute(&runner, &job, progress, |r| r.run_job(&job))
}

pub fn ingest(args: IngestArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let (owner, slug) = parse_dataset_ref(&args.dataset)?;
    let source = KaggleSource::new(owner, slug, files(&args.target.files));
    adhoc(source.into(), slug, args.target, config, progress)
}

pub fn arxiv(args: ArxivArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let source = ArxivSource::new(&args.category, &args.dataset, files(&args.target.files));
    adhoc(source.into(), &args.dataset, args.target, config, progress)
}

fn adhoc(
    source: DataSource,
    slug: &str,
    target: TargetArgs,
    config: &Config,
    progress: &SharedProgress,
) -> Result<()> {
    let bucket = target
        .bucket
        .or_else(|| config.default_bucket.clone())
        .context("No bucket given: pass --bucket or set default_bucket in the config")?;
    let runner = job_runner(config, target.workspace, progress)?;

    let job = IngestionJob::new(
        adhoc_job_id(slug),
        source,
        Destination::new(bucket, target.prefix),
    )
    .with_workspace(runner.orchestrator().workspace());

    execute(&runner, &job, progress, |r| r.run_adhoc(&job))
}

/// Run `op`, print each published object on stdout and a summary on stderr.
fn execute(
    runner: &JobRunner,
    job: &IngestionJob,
    progress: &SharedProgress,
    op: impl FnOnce(&JobRunner) -> datalift_core::Result<Vec<String>>,
) -> Result<()> {
    let line = progress.job_line(job.job_id());
    line.set_message(format!("{} -> {}", job.source().name(), job.destination().bucket));
    let start = Instant::now();
    let result = op(runner);
    line.finish_and_clear();

    let uploaded = result.with_context(|| format!("Job {} failed", job.job_id()))?;
    for object in &uploaded {
        println!("{object}");
    }

    print_summary(
        "Job",
        &[
            ("Id", job.job_id().to_string()),
            ("Source", job.source().name().to_string()),
            ("Bucket", job.destination().bucket.clone()),
            ("Objects", uploaded.len().to_string()),
            ("Workspace", job.workspace_path().display().to_string()),
            ("Time", format!("{:.1}s", start.elapsed().as_secs_f64())),
        ],
    );
    Ok(())
}

fn parse_dataset_ref(dataset: &str) -> Result<(&str, &str)> {
    dataset
        .split_once('/')
        .map(|(owner, slug)| (owner.trim(), slug.trim()))
        .filter(|(owner, slug)| !owner.is_empty() && !slug.is_empty() && !slug.contains('/'))
        .with_context(|| format!("Invalid dataset reference '{dataset}', expected OWNER/SLUG"))
}

fn files(names: &[String]) -> Option<&[String]> {
    (!names.is_empty()).then_some(names)
}

/// `<slug>-<timestamp>`, unique per second-and-millisecond.
fn adhoc_job_id(slug: &str) -> String {
    format!("{slug}-{}", chrono::Local::now().format("%Y%m%dT%H%M%S%3f"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_job_reported_before_store_setup() {
        // No [storage] section: resolving the store would fail first
        let config = Config::default();
        let progress = std::sync::Arc::new(datalift_core::ProgressContext::hidden());
        let args = RunArgs {
            job: "typo".to_string(),
            workspace: None,
        };

        let err = run(args, &config, &progress).unwrap_err();
        assert!(
            format!("{err:#}").contains("job 'typo' not defined"),
            "{err:#}"
        );
    }

    #[test]
    fn dataset_ref_parses() {
        assert_eq!(parse_dataset_ref("owner/slug").unwrap(), ("owner", "slug"));
        assert_eq!(parse_dataset_ref(" owner / slug ").unwrap(), ("owner", "slug"));
    }

    #[test]
    fn dataset_ref_rejects_malformed() {
        for bad in ["slug", "/slug", "owner/", "a/b/c"] {
            assert!(parse_dataset_ref(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn no_files_means_no_filter() {
        assert!(files(&[]).is_none());
        assert_eq!(files(&["x.csv".to_string()]).map(<[String]>::len), Some(1));
    }

    #[test]
    fn adhoc_job_id_has_slug_prefix() {
        let id = adhoc_job_id("titanic");
        assert!(id.starts_with("titanic-"));
        assert!(!id.contains('/'));
    }
}
