use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, info_span};

use crate::domain::Table;
use crate::infra::csv_store;
use crate::pipeline::processing::{EnrichReport, GeocodingEnricher, NormalizeReport, TextNormalizer};
use crate::pipeline::RemoteSourceLoader;

/// Outcome of one load → normalize → enrich → save run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRunReport {
    pub endpoint: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub rows_loaded: Option<usize>,
    pub normalize: Option<NormalizeReport>,
    pub enrich: Option<EnrichReport>,
    pub output_file: PathBuf,
    pub saved: bool,
    pub errors: Vec<String>,
}

/// Use case chaining the pipeline stages in best-effort mode: a failing stage
/// is recorded in the report and only the stages depending on it are skipped.
pub struct PipelineUseCase {
    loader: RemoteSourceLoader,
    normalizer: TextNormalizer,
    enricher: Option<GeocodingEnricher>,
}

impl PipelineUseCase {
    pub fn new(loader: RemoteSourceLoader, enricher: Option<GeocodingEnricher>) -> Self {
        Self {
            loader,
            normalizer: TextNormalizer::new(),
            enricher,
        }
    }

    /// Run every stage and return the final table alongside the report.
    pub fn run(&self, endpoint: &str, output: &Path) -> (Option<Table>, PipelineRunReport) {
        let span = info_span!("pipeline", endpoint = %endpoint);
        let _enter = span.enter();

        let mut report = PipelineRunReport {
            endpoint: endpoint.to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            rows_loaded: None,
            normalize: None,
            enrich: None,
            output_file: output.to_path_buf(),
            saved: false,
            errors: Vec::new(),
        };

        info!("Loading source data");
        let mut table = match self.loader.load(endpoint) {
            Ok(table) => table,
            Err(e) => {
                error!("Error loading data: {}", e);
                report.errors.push(format!("load: {}", e));
                report.finished_at = Utc::now();
                return (None, report);
            }
        };
        report.rows_loaded = Some(table.n_rows());

        match self.normalizer.normalize(&mut table) {
            Ok(normalize) => report.normalize = Some(normalize),
            Err(e) => {
                error!("Text normalization failed: {}", e);
                report.errors.push(format!("normalize: {}", e));
            }
        }

        if let Some(enricher) = &self.enricher {
            match enricher.enrich(&mut table) {
                Ok(enrich) => report.enrich = Some(enrich),
                Err(e) => {
                    error!("Geocoding enrichment failed: {}", e);
                    report.errors.push(format!("enrich: {}", e));
                }
            }
        }

        report.saved = csv_store::save_csv(&table, output);
        if !report.saved {
            report
                .errors
                .push(format!("save: could not write {}", output.display()));
        }

        report.finished_at = Utc::now();
        info!(
            rows = table.n_rows(),
            saved = report.saved,
            errors = report.errors.len(),
            "Pipeline finished"
        );
        (Some(table), report)
    }
}
