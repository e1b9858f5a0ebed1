pub mod backend;
pub mod file;
pub mod mic;
pub mod pcm;
pub mod playback;

pub use backend::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource};
pub use mic::MicBackend;
pub use playback::{buffer_duration, Playback, PlaybackSchedule};
