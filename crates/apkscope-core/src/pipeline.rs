//! Sequential load orchestrator with timing.

use std::collections::HashMap;
use std::time::Instant;

use log::info;

use crate::config::AnalysisConfig;
use crate::corpus::load_corpus;
use crate::error::Result;
use crate::session::AnalysisSession;

/// Phase labels for progress reporting.
const PHASE_LABELS: &[(&str, &str)] = &[
    ("corpus", "Loading decompiled sources"),
    ("manifest", "Classifying manifest components"),
];

/// Progress callback type: (phase_name, label).
pub type ProgressCallback = Box<dyn FnMut(&str, &str)>;

fn report(progress_callback: &mut Option<ProgressCallback>, name: &str) {
    if let Some(ref mut cb) = progress_callback {
        let label = PHASE_LABELS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, l)| *l)
            .unwrap_or(name);
        cb(name, label);
    }
}

/// Load the corpus named by `config.input_path` and open a session over it.
pub fn run_pipeline(
    config: &AnalysisConfig,
    mut progress_callback: Option<ProgressCallback>,
) -> Result<AnalysisSession> {
    let mut timings: HashMap<String, f64> = HashMap::new();
    let total_start = Instant::now();

    report(&mut progress_callback, "corpus");
    let start = Instant::now();
    let corpus = load_corpus(&config.input_path, config)?;
    timings.insert("corpus".to_string(), start.elapsed().as_secs_f64());

    report(&mut progress_callback, "manifest");
    let start = Instant::now();
    let session = AnalysisSession::new(corpus, config.clone())?;
    timings.insert("manifest".to_string(), start.elapsed().as_secs_f64());

    info!(
        "Session ready in {:.1} ms",
        total_start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(session.with_timings(timings))
}
