use std::sync::Arc;

use tokio::sync::mpsc;

use crate::errors::VidstreamError;
use crate::join::UserRole;

/// Channel profile for live broadcasting (host/audience roles).
pub const CHANNEL_PROFILE_LIVE_BROADCASTING: i32 = 1;

/// Uid hint passed on join; 0 lets the engine assign one.
pub const UID_AUTO_ASSIGN: u32 = 0;

/// Options sent alongside a join request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMediaOptions {
    pub client_role_type: i32,
    pub channel_profile: i32,
}

impl ChannelMediaOptions {
    pub fn for_role(role: UserRole) -> Self {
        Self {
            client_role_type: role.client_role_type(),
            channel_profile: CHANNEL_PROFILE_LIVE_BROADCASTING,
        }
    }
}

/// Opaque platform rendering target (SurfaceView, UIView, ...).
///
/// The platform owns the surface; the core only passes the handle through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderMode {
    Hidden,
    #[default]
    Fit,
}

/// Binds a surface to a participant's video stream. uid 0 is the local user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoCanvas {
    pub surface: SurfaceHandle,
    pub render_mode: RenderMode,
    pub uid: u32,
}

impl VideoCanvas {
    pub fn local(surface: SurfaceHandle) -> Self {
        Self {
            surface,
            render_mode: RenderMode::Fit,
            uid: 0,
        }
    }

    pub fn remote(surface: SurfaceHandle, uid: u32) -> Self {
        Self {
            surface,
            render_mode: RenderMode::Fit,
            uid,
        }
    }
}

/// Why a remote user left the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfflineReason {
    Quit,
    Dropped,
    BecomeAudience,
    Unknown(i32),
}

impl From<i32> for OfflineReason {
    fn from(code: i32) -> Self {
        match code {
            0 => OfflineReason::Quit,
            1 => OfflineReason::Dropped,
            2 => OfflineReason::BecomeAudience,
            other => OfflineReason::Unknown(other),
        }
    }
}

/// Callbacks delivered by the engine, possibly from its own threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    JoinChannelSuccess { channel: String, uid: u32, elapsed_ms: i32 },
    UserJoined { uid: u32, elapsed_ms: i32 },
    UserOffline { uid: u32, reason: OfflineReason },
    Error { code: i32, message: String },
}

/// Thread-safe handle the engine's callback side uses to report events.
///
/// Events are queued and applied in order by the session's reducer task.
/// Once the session is torn down the queue is closed and events are dropped.
#[derive(Debug, Clone)]
pub struct EngineEventSender {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EngineEventSender {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, event: EngineEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::debug!("engine event dropped after teardown: {:?}", e.0);
        }
    }

    pub fn on_join_channel_success(&self, channel: &str, uid: u32, elapsed_ms: i32) {
        self.send(EngineEvent::JoinChannelSuccess {
            channel: channel.to_string(),
            uid,
            elapsed_ms,
        });
    }

    pub fn on_user_joined(&self, uid: u32, elapsed_ms: i32) {
        self.send(EngineEvent::UserJoined { uid, elapsed_ms });
    }

    pub fn on_user_offline(&self, uid: u32, reason: i32) {
        self.send(EngineEvent::UserOffline {
            uid,
            reason: reason.into(),
        });
    }

    pub fn on_error(&self, code: i32, message: &str) {
        self.send(EngineEvent::Error {
            code,
            message: message.to_string(),
        });
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The external real-time engine, wrapped by the native shell.
///
/// Implementations must be Send + Sync (called from tokio tasks).
pub trait RtcEngine: Send + Sync {
    fn enable_video(&self);
    fn join_channel(
        &self,
        token: Option<&str>,
        channel: &str,
        uid_hint: u32,
        options: &ChannelMediaOptions,
    ) -> Result<(), VidstreamError>;
    fn leave_channel(&self);
    fn mute_local_audio_stream(&self, muted: bool);
    fn mute_local_video_stream(&self, muted: bool);
    fn setup_local_video(&self, canvas: &VideoCanvas);
    fn setup_remote_video(&self, canvas: &VideoCanvas);
    fn start_preview(&self);
    fn stop_preview(&self);
    fn destroy(&self);
}

/// Creates an engine bound to a session's event queue.
pub trait EngineFactory: Send + Sync {
    fn create(
        &self,
        app_id: &str,
        events: EngineEventSender,
    ) -> Result<Arc<dyn RtcEngine>, VidstreamError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_follow_role() {
        let opts = ChannelMediaOptions::for_role(UserRole::Audience);
        assert_eq!(opts.client_role_type, 0);
        assert_eq!(opts.channel_profile, 1);
    }

    #[test]
    fn offline_reason_codes() {
        assert_eq!(OfflineReason::from(0), OfflineReason::Quit);
        assert_eq!(OfflineReason::from(1), OfflineReason::Dropped);
        assert_eq!(OfflineReason::from(2), OfflineReason::BecomeAudience);
        assert_eq!(OfflineReason::from(9), OfflineReason::Unknown(9));
    }

    #[test]
    fn sender_drops_silently_when_closed() {
        let (sender, rx) = EngineEventSender::channel();
        drop(rx);
        assert!(sender.is_closed());
        sender.on_user_joined(7, 0);
    }

    #[tokio::test]
    async fn sender_preserves_order() {
        let (sender, mut rx) = EngineEventSender::channel();
        sender.on_user_joined(7, 0);
        sender.on_user_offline(7, 1);
        assert_eq!(rx.recv().await, Some(EngineEvent::UserJoined { uid: 7, elapsed_ms: 0 }));
        assert_eq!(
            rx.recv().await,
            Some(EngineEvent::UserOffline { uid: 7, reason: OfflineReason::Dropped })
        );
    }
}
