//! Vidstream core call-session logic.
//!
//! Pure Rust crate with no platform dependencies. The RTC engine is
//! supplied by the native shell through the [`engine::RtcEngine`] trait.
//! Consumed by native UI shells via UniFFI bindings.

pub mod controls;
pub mod engine;
pub mod errors;
pub mod events;
pub mod join;
pub mod participants;
pub mod permissions;
pub mod session;
pub mod settings;

#[cfg(test)]
pub(crate) mod testing;

pub use controls::CallControls;
pub use engine::{
    ChannelMediaOptions, EngineEvent, EngineEventSender, EngineFactory, OfflineReason, RenderMode,
    RtcEngine, SurfaceHandle, VideoCanvas,
};
pub use errors::VidstreamError;
pub use events::{SessionEvent, SessionEventListener, SessionState};
pub use join::{JoinForm, JoinRequest, UserRole};
pub use participants::ParticipantManager;
pub use permissions::{Permission, PermissionGate, PermissionProvider, PermissionStatus};
pub use session::CallSession;
pub use settings::{Settings, SettingsStore};
