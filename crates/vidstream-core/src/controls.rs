use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::engine::RtcEngine;
use crate::errors::VidstreamError;
use crate::events::{EventEmitter, SessionEvent};
use crate::session::EngineSlot;

/// Local publish state shared between a session and its controls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct MediaState {
    pub(crate) audio_muted: bool,
    pub(crate) video_muted: bool,
}

/// Controls for local media (microphone, camera).
///
/// Both flags toggle independently while the session holds a live engine.
pub struct CallControls {
    engine: EngineSlot,
    torn_down: Arc<AtomicBool>,
    media: Arc<Mutex<MediaState>>,
    emitter: EventEmitter,
}

impl CallControls {
    pub(crate) fn new(
        engine: EngineSlot,
        torn_down: Arc<AtomicBool>,
        media: Arc<Mutex<MediaState>>,
        emitter: EventEmitter,
    ) -> Self {
        Self {
            engine,
            torn_down,
            media,
            emitter,
        }
    }

    /// Mute or unmute the local audio stream.
    pub async fn set_microphone_muted(&self, muted: bool) -> Result<(), VidstreamError> {
        let engine = self.engine().await?;
        engine.mute_local_audio_stream(muted);
        self.media.lock().await.audio_muted = muted;

        tracing::info!("microphone muted: {muted}");
        self.emitter.emit(SessionEvent::LocalAudioMuted(muted));
        Ok(())
    }

    /// Stop or resume publishing the local video stream.
    pub async fn set_camera_muted(&self, muted: bool) -> Result<(), VidstreamError> {
        let engine = self.engine().await?;
        engine.mute_local_video_stream(muted);
        self.media.lock().await.video_muted = muted;

        tracing::info!("camera muted: {muted}");
        self.emitter.emit(SessionEvent::LocalVideoMuted(muted));
        Ok(())
    }

    /// Flip the microphone state. Returns the new muted flag.
    pub async fn toggle_microphone(&self) -> Result<bool, VidstreamError> {
        let muted = !self.is_microphone_muted().await;
        self.set_microphone_muted(muted).await?;
        Ok(muted)
    }

    /// Flip the camera state. Returns the new muted flag.
    pub async fn toggle_camera(&self) -> Result<bool, VidstreamError> {
        let muted = !self.is_camera_muted().await;
        self.set_camera_muted(muted).await?;
        Ok(muted)
    }

    pub async fn is_microphone_muted(&self) -> bool {
        self.media.lock().await.audio_muted
    }

    pub async fn is_camera_muted(&self) -> bool {
        self.media.lock().await.video_muted
    }

    async fn engine(&self) -> Result<Arc<dyn RtcEngine>, VidstreamError> {
        if self.torn_down.load(Ordering::SeqCst) {
            return Err(VidstreamError::Terminated);
        }
        self.engine
            .lock()
            .await
            .clone()
            .ok_or(VidstreamError::NotJoined)
    }
}
