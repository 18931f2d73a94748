// Service Error
// Aggregate error type for a whole curation run

use crate::mapping::MappingError;
use crate::materialize::MaterializeError;
use crate::prune::PruneError;
use crate::reconcile::ReconcileError;
use crate::template::ParseError;

use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Any failure of a curation run. All variants are fatal for the unit of
/// work that raised them; the service aborts the whole run on the first one.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Prune(#[from] PruneError),

    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}
