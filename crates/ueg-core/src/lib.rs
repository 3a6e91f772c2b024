pub mod certificate;
pub mod error;
pub mod fragment;
pub mod hash;
pub mod id;
pub mod node;
pub mod provenance;
pub mod registry;
pub mod tags;
pub mod verify;
pub mod wire;

// Re-export commonly used types
pub use certificate::{CertificateClaim, EntropyCertificate};
pub use error::{CoreError, RegistryError, TaxonomyViolation};
pub use fragment::{Fragment, FragmentBuilder, WiringGraph};
pub use hash::{hash_node, hash_nodes};
pub use id::{NodeId, SemanticHash};
pub use node::{
    is_identifier, is_well_formed_annotation, EffectKind, KindTag, Node, NodeKind, ObligationId, Param,
    ProofRef, Type, Value,
};
pub use provenance::{Provenance, ProvenanceLog};
pub use registry::{HashRegistry, Lookup, RegistryMetadata};
pub use tags::{ConcurrencyModel, Property, PropertySet, SafetyLineage, Tags, DEFAULT_ENTROPY_BUDGET};
pub use verify::{DischargedSet, Verdict, Verifier};
pub use wire::{DecodeError, DecodeIssue, WireFragment, WireNode};
