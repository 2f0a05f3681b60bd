pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::ArchiveBackend;
pub use crate::models::{RecordingInfo, RecordingStream};
pub use crate::path::{SafeSegment, confine, validate_segment};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn ArchiveBackend + Send + Sync>;
