//! Ordered pipeline registry with first-match dispatch

use crate::error::IngestionError;
use crate::model::IngestionJob;
use crate::pipeline::Pipeline;

/// Ordered set of pipelines.
///
/// Source variants are expected to be mutually exclusive across pipelines.
/// When they are not, the first match wins; [`PipelineRegistry::matching`]
/// exposes every match so overlapping registrations can be detected.
#[derive(Default)]
pub struct PipelineRegistry {
    pipelines: Vec<Box<dyn Pipeline>>,
}

impl PipelineRegistry {
    pub fn new(pipelines: Vec<Box<dyn Pipeline>>) -> Self {
        Self { pipelines }
    }

    /// Append a pipeline after the existing ones.
    pub fn register(&mut self, pipeline: Box<dyn Pipeline>) {
        self.pipelines.push(pipeline);
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Names of every pipeline that accepts `job`, in registration order.
    pub fn matching(&self, job: &IngestionJob) -> Vec<&'static str> {
        self.pipelines
            .iter()
            .filter(|p| p.can_handle(job))
            .map(|p| p.name())
            .collect()
    }

    /// First pipeline whose `can_handle` accepts `job`.
    pub fn resolve(&self, job: &IngestionJob) -> Result<&dyn Pipeline, IngestionError> {
        let mut matches = self.pipelines.iter().filter(|p| p.can_handle(job));
        let first = matches.next().ok_or_else(|| IngestionError::NoPipeline {
            job_id: job.job_id().to_string(),
        })?;

        let shadowed: Vec<&'static str> = matches.map(|p| p.name()).collect();
        if !shadowed.is_empty() {
            log::warn!(
                "{}: {} source handled by several pipelines, using {} (ignoring {})",
                job.job_id(),
                job.kind(),
                first.name(),
                shadowed.join(", ")
            );
        }

        log::debug!("{}: resolved to {}", job.job_id(), first.name());
        Ok(&**first)
    }
}
