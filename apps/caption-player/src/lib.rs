pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod observability;
pub mod orchestrator;
pub mod status;
pub mod video_url;

pub use clock::{ClockReading, ClockSource, PlaybackClock, PositionProbe, TimeUpdater, WallClockProbe};
pub use commands::PlayerCommand;
pub use config::Config;
pub use error::SessionError;
pub use orchestrator::{MediaSource, SessionHandle, SessionOrchestrator, SessionParts};
pub use status::connectivity_status;
pub use video_url::extract_video_id;
