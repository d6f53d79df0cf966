//! Data access for lookups and students, plus form validation.

mod lookup;
mod student;
mod validation;
pub use lookup::{LookupKind, LookupService};
pub use student::{assemble, Related, StudentService};
pub use validation::{validate_name, StudentValidator};
