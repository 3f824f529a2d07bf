//! Business metrics and Prometheus export.
//!
//! Handlers record through [`Metrics`], which forwards to a pluggable
//! [`MetricsSink`]. Emission is fire-and-forget: a failing or panicking sink
//! is logged and otherwise ignored.

use metrics::{counter, histogram, Label};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub const DEFAULT_NAMESPACE: &str = "RoleReady";

/// Install the Prometheus recorder. Later calls are no-ops.
///
/// The exporter and every `counter!`/`histogram!` call must share one
/// `metrics` facade version, or the recorder never sees a sample.
pub fn init_metrics() {
    METRICS_HANDLE.get_or_init(|| {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        if metrics::set_global_recorder(recorder).is_err() {
            tracing::warn!("A metrics recorder was already installed; Prometheus export is inactive");
        }
        handle
    });
}

/// Current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricUnit {
    Count,
    Milliseconds,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One named measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDatum {
    pub namespace: String,
    pub name: String,
    pub value: f64,
    pub unit: MetricUnit,
    pub dimensions: Vec<Dimension>,
}

impl MetricDatum {
    pub fn dimension(&self, name: &str) -> Option<&str> {
        self.dimensions
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.value.as_str())
    }
}

pub trait MetricsSink: Send + Sync {
    fn put_metric(&self, datum: &MetricDatum) -> anyhow::Result<()>;
}

/// Engagement bucket for an evaluation score.
pub fn engagement_level(score: f64) -> &'static str {
    if score >= 80.0 {
        "High"
    } else if score >= 50.0 {
        "Medium"
    } else {
        "Low"
    }
}

#[derive(Clone)]
pub struct Metrics {
    sink: Arc<dyn MetricsSink>,
    namespace: String,
}

impl Metrics {
    pub fn new(sink: Arc<dyn MetricsSink>, namespace: impl Into<String>) -> Self {
        Self {
            sink,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn emit(&self, name: &str, value: f64, unit: MetricUnit, dimensions: Vec<Dimension>) {
        let datum = MetricDatum {
            namespace: self.namespace.clone(),
            name: name.to_string(),
            value,
            unit,
            dimensions,
        };

        match catch_unwind(AssertUnwindSafe(|| self.sink.put_metric(&datum))) {
            Ok(Ok(())) => {
                tracing::debug!(metric = %name, value, "Emitted metric");
            }
            Ok(Err(e)) => {
                tracing::warn!(metric = %name, error = %e, "Failed to emit metric");
            }
            Err(_) => {
                tracing::warn!(metric = %name, "Metrics sink panicked");
            }
        }
    }

    fn count(&self, name: &str, dimensions: Vec<Dimension>) {
        self.emit(name, 1.0, MetricUnit::Count, dimensions);
    }

    pub fn questions_retrieved(&self, count: usize) {
        self.emit("QuestionsRetrieved", count as f64, MetricUnit::Count, vec![]);
    }

    pub fn question_viewed(&self, category: &str) {
        let dimensions = if category.is_empty() {
            vec![]
        } else {
            vec![Dimension::new("Category", category)]
        };
        self.count("QuestionViewed", dimensions);
    }

    pub fn question_not_found(&self) {
        self.count("QuestionNotFound", vec![]);
    }

    pub fn api_latency(&self, latency_ms: f64, operation: &str) {
        self.emit(
            "APILatency",
            latency_ms,
            MetricUnit::Milliseconds,
            vec![Dimension::new("Operation", operation)],
        );
    }

    pub fn answer_evaluated(&self, score: f64, competency_type: &str, is_correct: bool) {
        self.count("AnswerEvaluated", vec![]);
        self.emit("EvaluationScore", score, MetricUnit::None, vec![]);
        self.count(
            "EvaluationByCompetency",
            vec![Dimension::new("CompetencyType", competency_type)],
        );
        // Capitalized to match the dimension values dashboards already filter on.
        let correctness = if is_correct { "True" } else { "False" };
        self.count(
            "AnswerCorrectness",
            vec![Dimension::new("IsCorrect", correctness)],
        );
    }

    pub fn evaluation_success(&self) {
        self.count("EvaluationSuccess", vec![]);
    }

    pub fn evaluation_failure(&self, error_type: &str) {
        self.count(
            "EvaluationFailure",
            vec![Dimension::new("ErrorType", error_type)],
        );
    }

    pub fn ai_response_time(&self, duration_ms: f64) {
        self.emit(
            "MarcusResponseTime",
            duration_ms,
            MetricUnit::Milliseconds,
            vec![],
        );
    }

    pub fn user_engagement(&self, score: f64) {
        self.count(
            "UserEngagement",
            vec![Dimension::new("EngagementLevel", engagement_level(score))],
        );
    }

    pub fn cold_start(&self) {
        self.count("ColdStart", vec![]);
    }
}

/// Records through the `metrics` facade; counts become counters and
/// everything else a histogram.
#[derive(Debug, Clone, Default)]
pub struct PrometheusSink;

impl MetricsSink for PrometheusSink {
    fn put_metric(&self, datum: &MetricDatum) -> anyhow::Result<()> {
        let name = format!(
            "{}_{}",
            snake_case(&datum.namespace),
            snake_case(&datum.name)
        );
        let labels: Vec<Label> = datum
            .dimensions
            .iter()
            .map(|d| Label::new(snake_case(&d.name), d.value.clone()))
            .collect();

        match datum.unit {
            MetricUnit::Count => {
                counter!(name, labels).increment(datum.value.max(0.0) as u64);
            }
            MetricUnit::Milliseconds | MetricUnit::None => {
                histogram!(name, labels).record(datum.value);
            }
        }
        Ok(())
    }
}

/// `APILatency` -> `api_latency`, `RoleReady` -> `role_ready`.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower)
            {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// Keeps every datum in memory. Can be switched into a failing mode.
#[derive(Debug, Default)]
pub struct InMemoryMetricsSink {
    records: Mutex<Vec<MetricDatum>>,
    failing: AtomicBool,
}

impl InMemoryMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<MetricDatum> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn named(&self, name: &str) -> Vec<MetricDatum> {
        self.records()
            .into_iter()
            .filter(|d| d.name == name)
            .collect()
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl MetricsSink for InMemoryMetricsSink {
    fn put_metric(&self, datum: &MetricDatum) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("metrics sink unavailable");
        }
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(datum.clone());
        Ok(())
    }
}
