//! `datalift jobs` - list managed jobs

use anyhow::Result;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};

use datalift_core::SourceKind;

use crate::config::Config;

pub fn run(config: &Config) -> Result<()> {
    if config.jobs.is_empty() {
        eprintln!("No jobs defined in {}.", config.origin());
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Job").fg(Color::Cyan),
            Cell::new("Source").fg(Color::Cyan),
            Cell::new("Dataset").fg(Color::Cyan),
            Cell::new("Files").fg(Color::Cyan),
            Cell::new("Destination").fg(Color::Cyan),
        ]);

    for (name, job) in &config.jobs {
        let ds = &job.dataset;
        let locator = match ds.source {
            SourceKind::Kaggle => ds.owner_slug.as_deref(),
            SourceKind::Arxiv => ds.category.as_deref(),
        };
        let dataset = format!("{}/{}", locator.unwrap_or("?"), ds.dataset_slug);
        let files = match &ds.file_names {
            Some(names) if !names.is_empty() => names.join(", "),
            _ => "all".to_string(),
        };
        let bucket = job
            .destination
            .bucket
            .as_deref()
            .or(config.default_bucket.as_deref())
            .unwrap_or("?");
        let prefix = job.destination.prefix.as_deref().unwrap_or_default();
        let destination = if prefix.trim_matches('/').is_empty() {
            bucket.to_string()
        } else {
            format!("{bucket}/{}", prefix.trim_matches('/'))
        };

        table.add_row(vec![
            Cell::new(name),
            Cell::new(ds.source),
            Cell::new(dataset),
            Cell::new(files),
            Cell::new(destination),
        ]);
    }

    eprintln!("\n{table}");
    Ok(())
}
