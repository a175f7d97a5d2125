//! C9 (Generation Queue), C10 (Generation Worker), and C11 (Preview
//! Sweeper): the durable bus between the certificate engine's async
//! path and the workers that drive it, plus the periodic cleanup task
//! for aged previews.

pub mod delivery;
pub mod message;
pub mod publisher;
pub mod sweeper;
pub mod topology;
pub mod worker;

pub use delivery::Delivery;
pub use message::GenerationMessage;
pub use publisher::GenerationPublisher;
pub use sweeper::PreviewSweeper;
pub use worker::GenerationWorker;
