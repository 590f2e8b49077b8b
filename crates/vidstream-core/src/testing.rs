//! Recording engine and permission doubles for session tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::engine::{ChannelMediaOptions, EngineEventSender, EngineFactory, RtcEngine, VideoCanvas};
use crate::errors::VidstreamError;
use crate::events::{SessionEvent, SessionEventListener};
use crate::permissions::{Permission, PermissionProvider};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    EnableVideo,
    JoinChannel {
        token: Option<String>,
        channel: String,
        uid_hint: u32,
        options: ChannelMediaOptions,
    },
    LeaveChannel,
    MuteLocalAudio(bool),
    MuteLocalVideo(bool),
    SetupLocalVideo(VideoCanvas),
    SetupRemoteVideo(VideoCanvas),
    StartPreview,
    StopPreview,
    Destroy,
}

#[derive(Default)]
pub struct MockEngine {
    calls: Mutex<Vec<EngineCall>>,
    fail_join: Option<String>,
}

impl MockEngine {
    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &EngineCall) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }
}

impl RtcEngine for MockEngine {
    fn enable_video(&self) {
        self.record(EngineCall::EnableVideo);
    }

    fn join_channel(
        &self,
        token: Option<&str>,
        channel: &str,
        uid_hint: u32,
        options: &ChannelMediaOptions,
    ) -> Result<(), VidstreamError> {
        self.record(EngineCall::JoinChannel {
            token: token.map(str::to_string),
            channel: channel.to_string(),
            uid_hint,
            options: *options,
        });
        match &self.fail_join {
            Some(reason) => Err(VidstreamError::Join(reason.clone())),
            None => Ok(()),
        }
    }

    fn leave_channel(&self) {
        self.record(EngineCall::LeaveChannel);
    }

    fn mute_local_audio_stream(&self, muted: bool) {
        self.record(EngineCall::MuteLocalAudio(muted));
    }

    fn mute_local_video_stream(&self, muted: bool) {
        self.record(EngineCall::MuteLocalVideo(muted));
    }

    fn setup_local_video(&self, canvas: &VideoCanvas) {
        self.record(EngineCall::SetupLocalVideo(*canvas));
    }

    fn setup_remote_video(&self, canvas: &VideoCanvas) {
        self.record(EngineCall::SetupRemoteVideo(*canvas));
    }

    fn start_preview(&self) {
        self.record(EngineCall::StartPreview);
    }

    fn stop_preview(&self) {
        self.record(EngineCall::StopPreview);
    }

    fn destroy(&self) {
        self.record(EngineCall::Destroy);
    }
}

#[derive(Default)]
pub struct MockFactory {
    engines: Mutex<Vec<Arc<MockEngine>>>,
    senders: Mutex<Vec<EngineEventSender>>,
    app_ids: Mutex<Vec<String>>,
    fail_create: AtomicBool,
    fail_join: Mutex<Option<String>>,
}

impl MockFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_join(&self, reason: Option<&str>) {
        *self.fail_join.lock().unwrap() = reason.map(str::to_string);
    }

    pub fn created(&self) -> usize {
        self.engines.lock().unwrap().len()
    }

    pub fn engine(&self, index: usize) -> Arc<MockEngine> {
        self.engines.lock().unwrap()[index].clone()
    }

    pub fn last_engine(&self) -> Arc<MockEngine> {
        self.engines.lock().unwrap().last().cloned().expect("no engine created")
    }

    pub fn last_sender(&self) -> EngineEventSender {
        self.senders.lock().unwrap().last().cloned().expect("no engine created")
    }

    pub fn app_ids(&self) -> Vec<String> {
        self.app_ids.lock().unwrap().clone()
    }
}

impl EngineFactory for MockFactory {
    fn create(
        &self,
        app_id: &str,
        events: EngineEventSender,
    ) -> Result<Arc<dyn RtcEngine>, VidstreamError> {
        self.app_ids.lock().unwrap().push(app_id.to_string());
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(VidstreamError::EngineCreate("invalid app id".into()));
        }
        let engine = Arc::new(MockEngine {
            calls: Mutex::new(Vec::new()),
            fail_join: self.fail_join.lock().unwrap().clone(),
        });
        self.engines.lock().unwrap().push(engine.clone());
        self.senders.lock().unwrap().push(events);
        Ok(engine as Arc<dyn RtcEngine>)
    }
}

pub struct StaticPermissions {
    pub mic: bool,
    pub camera: bool,
}

impl StaticPermissions {
    pub fn granted() -> Self {
        Self { mic: true, camera: true }
    }
}

impl PermissionProvider for StaticPermissions {
    fn is_granted(&self, permission: Permission) -> bool {
        match permission {
            Permission::Microphone => self.mic,
            Permission::Camera => self.camera,
        }
    }
}

#[derive(Default)]
pub struct EventRecorder {
    events: Mutex<Vec<SessionEvent>>,
}

impl EventRecorder {
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl SessionEventListener for EventRecorder {
    fn on_event(&self, event: SessionEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Give the reducer task a chance to drain queued engine events.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}
