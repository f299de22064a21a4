//! Gallery media records.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Kind of artifact held in the gallery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// File extension used when saving an artifact of this kind.
    pub fn file_extension(&self) -> &'static str {
        match self {
            MediaKind::Image => "png",
            MediaKind::Video => "mp4",
        }
    }
}

/// A generated artifact. Immutable once created; items are only ever
/// appended to the gallery and discarded with the whole session.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaItem {
    /// Opaque token, unique across the session.
    pub id: String,
    pub kind: MediaKind,
    /// URI or data URI pointing at the artifact content.
    pub locator: String,
    /// The prompt the artifact was generated from.
    pub source_prompt: String,
    /// Creation time, milliseconds since the unix epoch.
    pub created_at_ms: u64,
    /// Data URI copy kept for re-use; present for image items only.
    pub inline_data: Option<String>,
}

impl MediaItem {
    pub fn new(kind: MediaKind, locator: String, source_prompt: String) -> Self {
        let inline_data = matches!(kind, MediaKind::Image).then(|| locator.clone());
        Self {
            id: next_media_id(),
            kind,
            locator,
            source_prompt,
            created_at_ms: unix_millis(),
            inline_data,
        }
    }
}

static MEDIA_SEQ: AtomicU64 = AtomicU64::new(0);

/// Time-based id with a monotonic tail so items created within the same
/// millisecond stay distinct.
fn next_media_id() -> String {
    let seq = MEDIA_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}", unix_millis(), seq)
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
