//! Template storage and recipient-data validation.
//!
//! [`store`] implements C3 (Template Store): tenant-scoped CRUD on
//! templates and their immutable published versions. [`validator`]
//! implements C4 (Field-Schema Validator): checks a recipient payload
//! against a version's `fieldSchema` before a certificate is generated.

pub mod model;
pub mod store;
pub mod validator;

pub use model::{DraftVersion, Template, TemplateStatus, TemplateVersion, VersionStatus};
pub use store::TemplateStore;
pub use validator::{validate, FieldError, ValidationReport};
