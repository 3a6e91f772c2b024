pub mod gate;
pub mod validate;

pub use gate::{
    entropy_fingerprint, Admission, EntropyReading, GateConfig, HostileSample, HostileSampleLog,
    IngestRejection, IngestionGate, RejectionObserver,
};
pub use validate::{
    DuplicatePolicy, ForbiddenCombination, Notice, PolicyTable, ValidatedFragment, ValidationError,
    ValidationReport, Validator, ValidatorConfig, Violation,
};
