//! Generative media client module.
//!
//! Wraps the hosted provider's three capabilities: prompt enhancement,
//! multimodal image synthesis, and long-running video jobs with status
//! polling.

mod client;
mod poll;

pub use client::{
    validate_prompt, with_key_param, GeminiClient, GeminiError, ModelSet, ReferenceImage,
    GEMINI_API_BASE_URL, GEMINI_API_KEY_ENV, IMAGE_MODEL, TEXT_MODEL, VIDEO_MODEL,
};
pub use poll::{PollPolicy, DEFAULT_MAX_POLLS, DEFAULT_POLL_INTERVAL};
