pub mod applicator;
pub mod loader;
pub mod schema;

pub use applicator::{apply_operation, apply_plan, resolve_target, ApplicationError};
pub use loader::{load_from_path, load_from_str, ConfigError, PlanSource};
pub use schema::{
    BlockOperation, EditDefinition, EditPlan, EditRef, ExtractOperation, ExtractPatterns,
    LineOperation, MarkerSpec, Metadata, Operation, ReplaceOperation, StateSpec,
    ValidationError, ValidationIssue,
};
