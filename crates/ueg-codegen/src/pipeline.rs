//! End-to-end composition: gate, validator, hasher and dispatcher.
//!
//! Front-ends sit between [`Pipeline::admit`] and the wire-level calls; the
//! pipeline never parses source text itself.

use std::sync::Arc;

use tracing::{info, warn};

use ueg_check::{
    Admission, IngestRejection, IngestionGate, ValidatedFragment, ValidationError, Validator,
};
use ueg_core::{HashRegistry, RegistryMetadata, WireFragment};

use crate::dispatch::{Dispatcher, Lowering};
use crate::error::LowerError;

/// Accepted hashes are written here after validation.
struct Registration {
    registry: Arc<dyn HashRegistry>,
    origin: String,
}

pub struct Pipeline {
    gate: IngestionGate,
    validator: Validator,
    dispatcher: Dispatcher,
    registration: Option<Registration>,
}

impl Pipeline {
    pub fn new(gate: IngestionGate, validator: Validator, dispatcher: Dispatcher) -> Self {
        Pipeline {
            gate,
            validator,
            dispatcher,
            registration: None,
        }
    }

    /// Registers every accepted fragment's hash under `origin`.
    pub fn with_registration(mut self, registry: Arc<dyn HashRegistry>, origin: impl Into<String>) -> Self {
        self.registration = Some(Registration {
            registry,
            origin: origin.into(),
        });
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Runs the ingestion gate over raw source text.
    pub fn admit(&self, text: &str, language: &str) -> Result<Admission, IngestRejection> {
        self.gate.admit(text, language)
    }

    /// Decodes and validates a wire fragment, registering its hash on success.
    pub fn accept_wire(&self, wire: &WireFragment) -> Result<ValidatedFragment, ValidationError> {
        let validated = self.validator.validate_wire(wire)?;
        if let Some(registration) = &self.registration {
            let metadata = RegistryMetadata::new(
                registration.origin.clone(),
                hex(validated.fragment().provenance().as_bytes()),
            );
            match registration.registry.register(&validated.semantic_hash(), metadata) {
                Ok(()) => info!(hash = %validated.semantic_hash(), "hash registered"),
                Err(err) => warn!(hash = %validated.semantic_hash(), error = %err, "hash registration failed"),
            }
        }
        Ok(validated)
    }

    /// Decodes, validates and lowers a wire fragment for `target`.
    ///
    /// With `require_complete`, any per-node failure fails the whole call.
    pub fn lower_wire(
        &self,
        wire: &WireFragment,
        target: &str,
        require_complete: bool,
    ) -> Result<Lowering, LowerError> {
        let validated = self.accept_wire(wire).map_err(|err| match err {
            ValidationError::Taxonomy(violation) => LowerError::Taxonomy(violation),
            ValidationError::Rejected(report) => LowerError::Rejected(report),
        })?;
        if require_complete {
            self.dispatcher.lower_complete(&validated, target)
        } else {
            self.dispatcher.lower(&validated, target)
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
