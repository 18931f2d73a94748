// Graph Materializer
// Topological execution of a pruned template: reference substitution,
// identifier minting, referential-integrity checks, final-output computation.

pub mod engine;
pub mod records;
pub mod resolved;

pub use engine::{
    FinalOutputSet, IdMinter, MaterializeError, MaterializedUnit, Materializer, MintError,
    ProcessTypeValidator, StandardProcessTypes,
};
pub use records::{MaterializedSample, MaterializedStep, RecordBatch, RecordStore};
pub use resolved::ResolvedTable;
