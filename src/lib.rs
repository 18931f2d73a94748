// Curation Service Library
// Expands a branching sample-processing template into concrete,
// identifier-bearing records for each biosample and protocol.

pub mod error;
pub mod inject;
pub mod mapping;
pub mod materialize;
pub mod prune;
pub mod reconcile;
pub mod service;
pub mod template;

// Re-export commonly used types
pub use error::{ServiceError, ServiceResult};

// Re-export template types
pub use template::{Blueprint, ParseError, ProtocolStep, ProtocolTemplate, TemplateParser};

// Re-export mapping types
pub use mapping::{MappingError, MappingTable, ParameterOverride, SampleMapping};

// Re-export injection types
pub use inject::{InjectionReport, OverrideOutcome, ParameterInjector};

// Re-export pruning types
pub use prune::{GraphPruner, PruneError, PruneOutcome};

// Re-export materialization types
pub use materialize::{
    FinalOutputSet, IdMinter, MaterializeError, MaterializedSample, MaterializedStep,
    MaterializedUnit, Materializer, MintError, ProcessTypeValidator, RecordBatch, RecordStore,
    ResolvedTable, StandardProcessTypes,
};

// Re-export reconciliation types
pub use reconcile::{DeferredLinkage, ReconcileError, Reconciler, Reconciliation, UpdateAction};

// Re-export service types
pub use service::{CurationOutcome, CurationService, UnitSummary, DEFAULT_ROOT_PLACEHOLDER};
