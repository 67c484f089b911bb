//! Platform seams: image fetching, user notifications and artifact sinks.
//!
//! These are the collaborators the certificate pipeline talks to but does
//! not own. Each surface is a small trait with a production implementation
//! and an in-memory or noop one suitable for tests and embedding.

pub mod download;
pub mod images;
pub mod notify;

pub use download::{ArtifactSink, DirectorySink, MemorySink};
#[cfg(feature = "http")]
pub use images::HttpImageFetcher;
pub use images::{ImageFetcher, NoopImageFetcher};
pub use notify::{CollectingNotifier, Level, LogNotifier, Notification, Notifier};
