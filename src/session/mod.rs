//! Session and gallery state.

mod controller;
mod media;

pub use controller::{
    GenerationOutcome, StudioMode, StudioSession, STATUS_ENHANCING, STATUS_GENERATING_IMAGE,
    STATUS_GENERATING_VIDEO,
};
pub use media::{MediaItem, MediaKind};
