//! Read-only queries over an archive of hourly radio recordings.
//!
//! A [`Library`] wraps one storage backend and answers the questions a
//! listener asks: which stations exist, which hours have recordings, which
//! files fall into an hour, and whether a recording exists for an exact
//! minute.

pub mod error;
mod query;
mod recording;

pub use crate::query::Library;
pub use crate::recording::{Recording, RecordingRef, Resolution, content_type_for};
