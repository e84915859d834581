//! Catalog-driven stand-in for a real model.
//!
//! Picks a catalog entry (biased by the file name), then draws confidence, mood and
//! scores uniformly from fixed bands after a simulated inference delay.

use super::catalog::{self, LivestockEntry, WildlifeEntry};
use super::{CancelFlag, ClassificationError, Classifier};
use crate::model::{
    CatalogKind, ClassificationResult, ImageSubmission, LivestockTraits, Mood, Narrative, Percent,
    SubjectProfile,
};
use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub(crate) const WILDLIFE_CONFIDENCE: RangeInclusive<u8> = 85..=99;
pub(crate) const LIVESTOCK_CONFIDENCE: RangeInclusive<u8> = 80..=99;
const BODY_STRUCTURE_SCORE: RangeInclusive<u8> = 85..=99;
const BODY_SIZE: RangeInclusive<u8> = 80..=99;
const POSTURE: RangeInclusive<u8> = 75..=99;
const SYMMETRY: RangeInclusive<u8> = 85..=99;

/// Granularity at which the simulated delay checks for cancellation.
const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Inclusive range the simulated inference delay is drawn from.
#[derive(Debug, Clone, Copy)]
pub struct LatencyBand {
    min: Duration,
    max: Duration,
}

impl LatencyBand {
    pub fn new(min: Duration, max: Duration) -> Result<Self> {
        if min > max {
            anyhow::bail!("minimum latency {min:?} exceeds maximum latency {max:?}");
        }
        Ok(Self { min, max })
    }

    fn sample(&self, rng: &mut impl Rng) -> Duration {
        let lo = self.min.as_millis() as u64;
        let hi = self.max.as_millis() as u64;
        Duration::from_millis(rng.gen_range(lo..=hi))
    }
}

impl Default for LatencyBand {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(2000),
            max: Duration::from_millis(3500),
        }
    }
}

pub struct SimulatedClassifier {
    catalog: CatalogKind,
    latency: LatencyBand,
    rng: Mutex<StdRng>,
}

impl SimulatedClassifier {
    pub fn new(catalog: CatalogKind, latency: LatencyBand, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            catalog,
            latency,
            rng: Mutex::new(rng),
        }
    }

    /// Draw the delay and the result up front so the RNG lock is never held across an await.
    fn draw(&self, file_name: &str) -> (Duration, ClassificationResult) {
        let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
        let delay = self.latency.sample(&mut *rng);
        let result = match self.catalog {
            CatalogKind::Wildlife => {
                let entry = catalog::match_wildlife(file_name)
                    .or_else(|| catalog::WILDLIFE.choose(&mut *rng))
                    .unwrap_or(&catalog::WILDLIFE[0]);
                wildlife_result(entry, &mut *rng)
            }
            CatalogKind::Livestock => {
                let is_buffalo =
                    file_name.to_lowercase().contains("buffalo") || rng.gen::<f64>() > 0.6;
                let entry = if is_buffalo {
                    &catalog::BUFFALO
                } else {
                    &catalog::CATTLE
                };
                livestock_result(entry, &mut *rng)
            }
        };
        (delay, result)
    }
}

fn percent_in(rng: &mut impl Rng, band: RangeInclusive<u8>) -> Percent {
    Percent::saturating(rng.gen_range(band))
}

fn wildlife_result(entry: &WildlifeEntry, rng: &mut impl Rng) -> ClassificationResult {
    let mood = Mood::ALL[rng.gen_range(0..Mood::ALL.len())];
    ClassificationResult {
        subject_type: entry.name.to_string(),
        confidence: percent_in(rng, WILDLIFE_CONFIDENCE),
        narrative: Narrative {
            description: entry.description.to_string(),
            context: entry.habitat.to_string(),
            guidance: entry.safety_tips.iter().map(|s| s.to_string()).collect(),
            highlight_fact: entry.fun_fact.to_string(),
        },
        profile: SubjectProfile::Wildlife { mood: Some(mood) },
    }
}

fn livestock_result(entry: &LivestockEntry, rng: &mut impl Rng) -> ClassificationResult {
    let confidence = percent_in(rng, LIVESTOCK_CONFIDENCE);
    let body_structure_score = percent_in(rng, BODY_STRUCTURE_SCORE);
    let traits = LivestockTraits {
        body_size: percent_in(rng, BODY_SIZE),
        posture: percent_in(rng, POSTURE),
        symmetry: percent_in(rng, SYMMETRY),
    };
    let take = rng.gen_range(2..=3);
    ClassificationResult {
        subject_type: entry.name.to_string(),
        confidence,
        narrative: Narrative {
            description: entry.description.to_string(),
            context: catalog::LIVESTOCK_CONTEXT.to_string(),
            guidance: catalog::LIVESTOCK_RECOMMENDATIONS
                .iter()
                .take(take)
                .map(|s| s.to_string())
                .collect(),
            highlight_fact: entry.fun_fact.to_string(),
        },
        profile: SubjectProfile::Livestock {
            body_structure_score,
            traits,
        },
    }
}

async fn simulate_inference(delay: Duration, cancel: &CancelFlag) -> Result<(), ClassificationError> {
    let deadline = Instant::now() + delay;
    loop {
        if cancel.is_cancelled() {
            return Err(ClassificationError::Cancelled);
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(());
        }
        tokio::time::sleep((deadline - now).min(CANCEL_POLL)).await;
    }
}

#[async_trait]
impl Classifier for SimulatedClassifier {
    fn name(&self) -> &'static str {
        match self.catalog {
            CatalogKind::Wildlife => "simulated-wildlife",
            CatalogKind::Livestock => "simulated-livestock",
        }
    }

    async fn classify(
        &self,
        submission: Arc<ImageSubmission>,
        cancel: CancelFlag,
    ) -> Result<ClassificationResult, ClassificationError> {
        let (delay, result) = self.draw(&submission.name);
        log::debug!(
            "{}: simulating {:?} of inference for {}",
            self.name(),
            delay,
            submission.name
        );
        simulate_inference(delay, &cancel).await?;
        Ok(result)
    }
}
