//! StudioSession - single source of truth for the studio's mutable state.

use std::path::{Path, PathBuf};

use super::media::{MediaItem, MediaKind};
use crate::download::{DownloadError, Downloader};
use crate::gemini::{GeminiClient, GeminiError, ReferenceImage};
use crate::keygate::{KeyGate, KeySelection};

/// Status line shown while the enhancement request is in flight.
pub const STATUS_ENHANCING: &str = "Consulting the AI muse...";

/// Status line shown while an image is being generated.
pub const STATUS_GENERATING_IMAGE: &str = "Weaving pixels...";

/// Status line shown while a video is being generated.
pub const STATUS_GENERATING_VIDEO: &str = "Rendering dreams (this may take a minute)...";

/// Which generation surface is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudioMode {
    Image,
    Video,
}

/// Result of a generation request, for the UI to act on.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    /// A new item was prepended to the gallery and selected.
    Completed { id: String },
    /// Video generation is blocked on key selection. A one-shot retry is
    /// armed; the UI should surface the acquisition prompt.
    Blocked,
    /// The provider reported a failure; `message` is user-facing.
    Failed { message: String },
    /// The prompt was empty, or there was nothing to retry.
    NothingToDo,
    /// A generation is already in flight.
    Busy,
}

/// Owns the prompt, mode, reference image, gallery, selection, and the
/// in-progress flags. All session state is mutated here and nowhere else.
pub struct StudioSession {
    client: GeminiClient,
    gate: KeyGate,
    downloader: Downloader,
    prompt: String,
    mode: StudioMode,
    reference: Option<ReferenceImage>,
    gallery: Vec<MediaItem>,
    selected: Option<String>,
    generating: bool,
    status: String,
    retry_armed: bool,
}

impl StudioSession {
    pub fn new(client: GeminiClient, gate: KeyGate) -> Self {
        Self {
            client,
            gate,
            downloader: Downloader::new(),
            prompt: String::new(),
            mode: StudioMode::Image,
            reference: None,
            gallery: Vec::new(),
            selected: None,
            generating: false,
            status: String::new(),
            retry_armed: false,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn mode(&self) -> StudioMode {
        self.mode
    }

    /// Switch the active mode. Always drops the held reference image: the
    /// reference only lives while composing in image mode.
    pub fn set_mode(&mut self, mode: StudioMode) {
        self.mode = mode;
        self.reference = None;
    }

    pub fn reference_image(&self) -> Option<&ReferenceImage> {
        self.reference.as_ref()
    }

    /// Attach a reference photo for image editing. Ignored outside image
    /// mode.
    pub fn set_reference_image(&mut self, image: ReferenceImage) {
        if self.mode != StudioMode::Image {
            log::debug!("ignoring reference image outside image mode");
            return;
        }
        self.reference = Some(image);
    }

    pub fn clear_reference_image(&mut self) {
        self.reference = None;
    }

    pub fn gallery(&self) -> &[MediaItem] {
        &self.gallery
    }

    /// The currently viewed item: the explicit selection if one was made,
    /// otherwise the first (most recent) gallery item.
    pub fn selected_item(&self) -> Option<&MediaItem> {
        if let Some(id) = &self.selected {
            if let Some(item) = self.gallery.iter().find(|item| &item.id == id) {
                return Some(item);
            }
        }
        self.gallery.first()
    }

    /// Select a gallery item by id. Returns false when the id is unknown,
    /// leaving the selection unchanged.
    pub fn select(&mut self, id: &str) -> bool {
        if self.gallery.iter().any(|item| item.id == id) {
            self.selected = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn status_message(&self) -> &str {
        &self.status
    }

    /// Whether a blocked generation is waiting to retry after key
    /// selection.
    pub fn is_retry_armed(&self) -> bool {
        self.retry_armed
    }

    /// Rewrite the prompt in place via the enhancement operation.
    ///
    /// No-op on an empty prompt. Cannot fail observably: enhancement is
    /// best-effort and falls back to the original text. The in-progress
    /// flag and status are cleared on completion regardless of outcome.
    pub async fn run_enhancement(&mut self) {
        if self.prompt.trim().is_empty() {
            return;
        }

        self.generating = true;
        self.status = STATUS_ENHANCING.to_string();

        let enhanced = self.client.enhance_prompt(&self.prompt).await;
        self.prompt = enhanced;

        self.generating = false;
        self.status.clear();
    }

    /// Run a generation in the active mode.
    ///
    /// Empty prompts are a no-op. At most one generation runs at a time.
    /// Video requests consult the key gate first; a missing credential
    /// arms a one-shot retry and reports `Blocked` instead of an error.
    /// On success the new item lands at the front of the gallery and
    /// becomes the selection. The in-progress flag and status are cleared
    /// on every exit path.
    pub async fn run_generation(&mut self) -> GenerationOutcome {
        if self.prompt.trim().is_empty() {
            return GenerationOutcome::NothingToDo;
        }
        if self.generating {
            return GenerationOutcome::Busy;
        }

        if self.mode == StudioMode::Video && !self.gate.has_credential().await {
            self.retry_armed = true;
            return GenerationOutcome::Blocked;
        }

        self.generating = true;
        self.status = match self.mode {
            StudioMode::Image => STATUS_GENERATING_IMAGE,
            StudioMode::Video => STATUS_GENERATING_VIDEO,
        }
        .to_string();

        let result = match self.mode {
            StudioMode::Image => {
                self.client
                    .generate_image(&self.prompt, self.reference.as_ref())
                    .await
            }
            StudioMode::Video => self.client.generate_video(&self.prompt, &self.gate).await,
        };

        let outcome = match result {
            Ok(locator) => {
                let kind = match self.mode {
                    StudioMode::Image => MediaKind::Image,
                    StudioMode::Video => MediaKind::Video,
                };
                let item = MediaItem::new(kind, locator, self.prompt.clone());
                let id = item.id.clone();
                self.gallery.insert(0, item);
                self.selected = Some(id.clone());
                GenerationOutcome::Completed { id }
            }
            Err(GeminiError::CredentialRequired) => {
                self.retry_armed = true;
                GenerationOutcome::Blocked
            }
            Err(err) => GenerationOutcome::Failed {
                message: format!("Generation failed: {}", err),
            },
        };

        self.generating = false;
        self.status.clear();
        outcome
    }

    /// Run the interactive key selection flow and, if the user completes
    /// it, retry the blocked generation exactly once.
    ///
    /// The armed continuation is cleared before the retry runs so a second
    /// completion can never fire the generation again.
    pub async fn complete_key_selection(&mut self) -> GenerationOutcome {
        match self.gate.request_credential().await {
            KeySelection::Completed => {
                if std::mem::take(&mut self.retry_armed) {
                    self.run_generation().await
                } else {
                    GenerationOutcome::NothingToDo
                }
            }
            KeySelection::Abandoned => {
                self.retry_armed = false;
                GenerationOutcome::NothingToDo
            }
        }
    }

    /// The user closed the acquisition prompt without selecting a key;
    /// drop the armed retry and return to idle.
    pub fn dismiss_key_prompt(&mut self) {
        self.retry_armed = false;
    }

    /// Save the currently viewed item into `dir`. Returns the written path,
    /// or `None` when the gallery is empty. Mutates no session state.
    pub async fn download_selected(&self, dir: &Path) -> Result<Option<PathBuf>, DownloadError> {
        match self.selected_item() {
            Some(item) => Ok(Some(self.downloader.save(item, dir).await?)),
            None => Ok(None),
        }
    }
}
