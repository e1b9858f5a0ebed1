pub mod attendance;
pub mod audio;
pub mod config;
pub mod error;
pub mod gemini;
pub mod http;
pub mod session;

pub use attendance::{
    export_filename, records_to_csv, write_csv, AttendanceRecord, AttendanceStatus,
    AttendanceStore,
};
pub use audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource, Playback,
    PlaybackSchedule,
};
pub use config::Config;
pub use error::{Error, Result};
pub use gemini::{GeminiClient, LiveEvent, LiveSession};
pub use http::{create_router, AppState};
pub use session::{
    AttendanceSession, LiveAttendanceSession, SessionConfig, SessionEvent, SessionStatus,
    SessionStep,
};
