//! C7 (Hash Index) and C8 (Certificate Engine): the only crate allowed
//! to write to the `certificates` and `certificate_hashes` tables.

pub mod engine;
pub mod hash_index;
pub mod model;

pub use engine::{generate_certificate_number, CertificateEngine};
pub use hash_index::HashIndex;
pub use model::{Certificate, CertificateHash, CertificateStatus, GenerateRequest, GenerationMode};
