// caption-events
//
// Message vocabulary shared by the caption backend and its clients.
// Frames are decoded once at the channel boundary; everything past that point
// works with the closed `ServerEvent` / `ClientEvent` types, never raw names.

mod caption;
mod error;
mod language;
mod wire;

pub use caption::{Caption, DEFAULT_CAPTION_DURATION};
pub use error::DecodeError;
pub use language::{Language, LanguageInfo, SupportedLanguages, UnsupportedLanguage};
pub use wire::{ClientEvent, EventKind, LifecycleSignal, ServerEvent};
