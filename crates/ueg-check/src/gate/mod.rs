//! The ingestion gate: an entropy-based obfuscation filter applied to raw
//! source text before any front-end turns it into a fragment.
//!
//! The decision is a pure function of the text and the configured threshold.
//! Rejections are fatal for that input and carry the measured ratio, the
//! threshold and the declared language. Recording rejected samples for a
//! hostile-sample corpus is left to a caller-supplied [`RejectionObserver`].
//!
//! This is a frequency-shape heuristic, not a semantic check: benign text can
//! be rejected and hostile text can pass.

pub mod entropy;

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use ueg_core::EntropyCertificate;

pub use entropy::{entropy_fingerprint, EntropyReading};

/// Ratio above which text is considered obfuscated.
pub const DEFAULT_OBFUSCATION_THRESHOLD: f64 = 1.05;

/// Gate configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub threshold: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        GateConfig {
            threshold: DEFAULT_OBFUSCATION_THRESHOLD,
        }
    }
}

/// A rejected ingestion attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{language} source rejected: entropy ratio {ratio:.3} exceeds limit {threshold:.3}")]
pub struct IngestRejection {
    pub ratio: f64,
    pub threshold: f64,
    pub language: String,
}

/// An admitted text: its reading plus the certificate to attach to the
/// fragment a front-end builds from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    pub language: String,
    pub reading: EntropyReading,
    pub certificate: EntropyCertificate,
}

/// Receives every rejection the gate makes.
pub trait RejectionObserver: Send + Sync {
    fn on_rejection(&self, text: &str, rejection: &IngestRejection);
}

/// A rejected sample kept for later study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostileSample {
    pub language: String,
    pub ratio: f64,
    pub threshold: f64,
    pub text: String,
}

/// In-memory [`RejectionObserver`] that keeps every rejected sample.
#[derive(Debug, Default)]
pub struct HostileSampleLog {
    samples: Mutex<Vec<HostileSample>>,
}

impl HostileSampleLog {
    pub fn new() -> Self {
        HostileSampleLog::default()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes and returns the collected samples.
    pub fn drain(&self) -> Vec<HostileSample> {
        std::mem::take(&mut *self.samples.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl RejectionObserver for HostileSampleLog {
    fn on_rejection(&self, text: &str, rejection: &IngestRejection) {
        let sample = HostileSample {
            language: rejection.language.clone(),
            ratio: rejection.ratio,
            threshold: rejection.threshold,
            text: text.to_string(),
        };
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sample);
    }
}

/// The ingestion gate.
#[derive(Clone, Default)]
pub struct IngestionGate {
    config: GateConfig,
    observer: Option<Arc<dyn RejectionObserver>>,
}

impl std::fmt::Debug for IngestionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionGate")
            .field("config", &self.config)
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

impl IngestionGate {
    pub fn new(config: GateConfig) -> Self {
        IngestionGate {
            config,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RejectionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Measures `text` and admits or rejects it.
    pub fn admit(&self, text: &str, language: &str) -> Result<Admission, IngestRejection> {
        let reading = entropy_fingerprint(text);
        debug!(
            language,
            ratio = reading.ratio,
            length = reading.length,
            distinct = reading.distinct,
            "entropy reading"
        );

        if reading.exceeds(self.config.threshold) {
            let rejection = IngestRejection {
                ratio: reading.ratio,
                threshold: self.config.threshold,
                language: language.to_string(),
            };
            warn!(%rejection, "ingestion rejected");
            if let Some(observer) = &self.observer {
                observer.on_rejection(text, &rejection);
            }
            return Err(rejection);
        }

        Ok(Admission {
            language: language.to_string(),
            reading,
            certificate: EntropyCertificate::attest(reading.ratio, language),
        })
    }
}
