//! Features Module - input rows to model-ordered vectors
//!
//! Owns the column schema, CSV parsing and median imputation.

pub mod layout;
pub mod table;
pub mod resolver;

pub use layout::{FeatureSchema, LayoutError};
pub use table::{Table, TableError};
pub use resolver::{MissingNames, ResolveError, MAX_REPORTED_MISSING};
