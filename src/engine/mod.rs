mod catalog;
mod http;
mod simulated;

pub use http::HttpClassifier;
pub use simulated::{LatencyBand, SimulatedClassifier};

use crate::model::{ClassificationResult, ImageSubmission, WorkflowConfig};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

/// Cooperative cancellation token handed to every classification.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        while !self.is_cancelled() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

/// Every way a classification can fail. The workflow treats all of them alike.
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend returned HTTP {0}")]
    Status(u16),

    #[error("could not decode backend response: {0}")]
    Decode(String),

    #[error("backend response out of contract: {0}")]
    InvalidResponse(String),

    #[error("classification timed out after {0:?}")]
    Timeout(Duration),

    #[error("classification cancelled")]
    Cancelled,
}

/// Maps one validated image to one typed result.
///
/// Implementations must return a confidence within 0..=100 and draw any mood from
/// [`Mood::ALL`](crate::model::Mood::ALL); both are enforced by the result types.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Classifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn classify(
        &self,
        submission: Arc<ImageSubmission>,
        cancel: CancelFlag,
    ) -> Result<ClassificationResult, ClassificationError>;
}

/// Pick the classification strategy from config: the HTTP backend when a URL is given,
/// otherwise the catalog-driven simulation.
pub fn build_classifier(cfg: &WorkflowConfig) -> Result<Arc<dyn Classifier>> {
    match cfg.backend_url.as_deref() {
        Some(url) => Ok(Arc::new(HttpClassifier::new(url, cfg)?)),
        None => {
            let band = LatencyBand::new(cfg.min_latency, cfg.max_latency)?;
            Ok(Arc::new(SimulatedClassifier::new(cfg.catalog, band, cfg.seed)))
        }
    }
}
