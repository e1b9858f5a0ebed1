//! Attendance session management
//!
//! Two controller variants share the capture and extraction plumbing:
//! - `AttendanceSession`: the staged pipeline (record, transcribe, extract)
//!   driven by the seven-step machine in `state`
//! - `LiveAttendanceSession`: the persistent duplex session with incremental
//!   transcript accumulation and model-audio playback

mod config;
mod live;
mod pipeline;
mod state;

pub use config::{SessionConfig, SessionStatus};
pub use live::LiveAttendanceSession;
pub use pipeline::AttendanceSession;
pub use state::{SessionEvent, SessionStep};
