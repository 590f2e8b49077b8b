use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::controls::{CallControls, MediaState};
use crate::engine::{
    ChannelMediaOptions, EngineEvent, EngineEventSender, EngineFactory, RtcEngine, SurfaceHandle,
    UID_AUTO_ASSIGN, VideoCanvas,
};
use crate::errors::VidstreamError;
use crate::events::{EventEmitter, SessionEvent, SessionEventListener, SessionState};
use crate::join::{JoinRequest, UserRole};
use crate::participants::ParticipantManager;
use crate::permissions::{Permission, PermissionGate, PermissionProvider, PermissionStatus};
use crate::settings::Settings;

/// The engine owned by a session, if one is alive.
pub(crate) type EngineSlot = Arc<Mutex<Option<Arc<dyn RtcEngine>>>>;

/// Manages the lifecycle of one call.
///
/// Unpermitted → Joining → Active → Terminated, with JoinFailed reachable
/// from Joining. Engine callbacks are queued through an [`EngineEventSender`]
/// and applied by a single reducer task, the only writer of participant state.
pub struct CallSession {
    id: Uuid,
    request: JoinRequest,
    app_id: String,
    app_token: Option<String>,
    factory: Arc<dyn EngineFactory>,
    gate: PermissionGate,
    engine: EngineSlot,
    emitter: EventEmitter,
    participants: Arc<Mutex<ParticipantManager>>,
    state: Arc<Mutex<SessionState>>,
    media: Arc<Mutex<MediaState>>,
    torn_down: Arc<AtomicBool>,
    event_loop: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl CallSession {
    pub fn new(request: JoinRequest, settings: &Settings, factory: Arc<dyn EngineFactory>) -> Self {
        let id = Uuid::new_v4();
        tracing::info!(
            session = %id,
            "call session created: channel={} role={}",
            request.channel_name,
            request.role
        );
        Self {
            id,
            request,
            app_id: settings.app_id.clone(),
            app_token: settings.app_token.clone(),
            factory,
            gate: PermissionGate::new(),
            engine: Arc::new(Mutex::new(None)),
            emitter: EventEmitter::new(),
            participants: Arc::new(Mutex::new(ParticipantManager::new())),
            state: Arc::new(Mutex::new(SessionState::Unpermitted)),
            media: Arc::new(Mutex::new(MediaState {
                audio_muted: settings.mic_muted_on_join,
                video_muted: settings.camera_muted_on_join,
            })),
            torn_down: Arc::new(AtomicBool::new(false)),
            event_loop: std::sync::Mutex::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn channel_name(&self) -> &str {
        &self.request.channel_name
    }

    pub fn role(&self) -> UserRole {
        self.request.role
    }

    /// Register a listener for session events.
    pub fn add_listener(&self, listener: Arc<dyn SessionEventListener>) {
        self.emitter.add_listener(listener);
    }

    /// Create CallControls bound to this session.
    pub fn controls(&self) -> CallControls {
        CallControls::new(
            self.engine.clone(),
            self.torn_down.clone(),
            self.media.clone(),
            self.emitter.clone(),
        )
    }

    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    pub async fn local_uid(&self) -> Option<u32> {
        self.participants.lock().await.local_uid()
    }

    /// Remote uids in arrival order.
    pub async fn remote_uids(&self) -> Vec<u32> {
        self.participants.lock().await.remote_uids().to_vec()
    }

    /// What the retry affordance must request from the platform.
    pub fn permissions_to_request(&self) -> Vec<Permission> {
        self.gate.permissions_to_request()
    }

    /// Query current grants and join if both are present.
    pub async fn check_permissions(
        &self,
        provider: &dyn PermissionProvider,
    ) -> Result<(), VidstreamError> {
        let status = self.gate.check(provider);
        self.apply_permission_status(status).await
    }

    /// Apply the result of a request-multiple prompt and join if all granted.
    pub async fn on_permission_result(
        &self,
        results: &[(Permission, bool)],
    ) -> Result<(), VidstreamError> {
        let status = self.gate.evaluate(results);
        self.apply_permission_status(status).await
    }

    async fn apply_permission_status(&self, status: PermissionStatus) -> Result<(), VidstreamError> {
        self.ensure_alive()?;
        if self.state().await != SessionState::Unpermitted {
            tracing::debug!(session = %self.id, "permissions already settled");
            return Ok(());
        }

        match status {
            PermissionStatus::Granted => self.start_join().await,
            PermissionStatus::Denied { missing } => {
                let missing = missing
                    .iter()
                    .map(Permission::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                tracing::info!(
                    session = %self.id,
                    "permissions missing for channel {}: {missing}",
                    self.request.channel_name
                );
                Err(VidstreamError::PermissionDenied(missing))
            }
        }
    }

    /// Start a new join attempt after a failure.
    pub async fn retry_join(&self) -> Result<(), VidstreamError> {
        self.ensure_alive()?;
        match self.state().await {
            SessionState::JoinFailed { .. } => {
                self.abort_event_loop();
                self.release_engine(false).await;
                self.start_join().await
            }
            SessionState::Unpermitted => Err(VidstreamError::PermissionDenied(
                "permissions not granted".into(),
            )),
            SessionState::Terminated => Err(VidstreamError::Terminated),
            SessionState::Joining | SessionState::Active => {
                tracing::debug!(session = %self.id, "retry ignored, join already in progress");
                Ok(())
            }
        }
    }

    async fn start_join(&self) -> Result<(), VidstreamError> {
        let channel = self.request.channel_name.clone();
        let (sender, events) = EngineEventSender::channel();

        let engine = {
            let mut slot = self.engine.lock().await;
            // Teardown flips the flag before taking the slot, so checking
            // under the lock keeps a late engine from outliving the session.
            self.ensure_alive()?;
            self.set_state(SessionState::Joining).await;

            let engine = match self.factory.create(&self.app_id, sender) {
                Ok(engine) => engine,
                Err(e) => {
                    tracing::warn!(session = %self.id, "engine creation failed: {e}");
                    self.set_state(SessionState::JoinFailed { reason: e.to_string() }).await;
                    return Err(e);
                }
            };
            *slot = Some(engine.clone());
            engine
        };

        engine.enable_video();
        let media = *self.media.lock().await;
        if media.audio_muted {
            engine.mute_local_audio_stream(true);
        }
        if media.video_muted {
            engine.mute_local_video_stream(true);
        }

        self.spawn_event_loop(events);

        let options = ChannelMediaOptions::for_role(self.request.role);
        tracing::info!(
            session = %self.id,
            "joining channel {channel}: client_role_type={} channel_profile={}",
            options.client_role_type,
            options.channel_profile
        );
        if let Err(e) = engine.join_channel(
            self.app_token.as_deref(),
            &channel,
            UID_AUTO_ASSIGN,
            &options,
        ) {
            tracing::warn!(session = %self.id, "join request for {channel} failed: {e}");
            self.abort_event_loop();
            self.release_engine(false).await;
            self.set_state(SessionState::JoinFailed { reason: e.to_string() }).await;
            return Err(e);
        }

        Ok(())
    }

    /// Leave the channel and release the engine. Safe to call repeatedly.
    pub async fn end_call(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            tracing::debug!(session = %self.id, "end_call ignored, already terminated");
            return;
        }
        tracing::info!(session = %self.id, "ending call on channel {}", self.request.channel_name);

        self.abort_event_loop();
        self.release_engine(true).await;
        self.participants.lock().await.clear();
        *self.state.lock().await = SessionState::Terminated;
        self.emitter.emit(SessionEvent::StateChanged(SessionState::Terminated));
    }

    /// Attach the local preview surface and start previewing.
    pub async fn bind_local_video(&self, surface: SurfaceHandle) -> Result<(), VidstreamError> {
        let engine = self.live_engine().await?;
        engine.setup_local_video(&VideoCanvas::local(surface));
        engine.start_preview();
        tracing::debug!(session = %self.id, "local video bound to surface {}", surface.0);
        Ok(())
    }

    /// Called when the local preview surface goes away.
    pub async fn unbind_local_video(&self) -> Result<(), VidstreamError> {
        let engine = self.live_engine().await?;
        engine.stop_preview();
        Ok(())
    }

    /// Bind a surface to a remote participant. Rebinding the same uid is allowed.
    pub async fn bind_remote_video(
        &self,
        uid: u32,
        surface: SurfaceHandle,
    ) -> Result<(), VidstreamError> {
        let engine = self.live_engine().await?;
        if !self.participants.lock().await.contains_remote(uid) {
            return Err(VidstreamError::UnknownParticipant(uid));
        }
        engine.setup_remote_video(&VideoCanvas::remote(surface, uid));
        tracing::debug!(session = %self.id, uid, "remote video bound to surface {}", surface.0);
        Ok(())
    }

    fn ensure_alive(&self) -> Result<(), VidstreamError> {
        if self.torn_down.load(Ordering::SeqCst) {
            Err(VidstreamError::Terminated)
        } else {
            Ok(())
        }
    }

    async fn live_engine(&self) -> Result<Arc<dyn RtcEngine>, VidstreamError> {
        self.ensure_alive()?;
        self.engine
            .lock()
            .await
            .clone()
            .ok_or(VidstreamError::NotJoined)
    }

    async fn set_state(&self, state: SessionState) {
        {
            let mut current = self.state.lock().await;
            if *current == SessionState::Terminated || *current == state {
                return;
            }
            *current = state.clone();
        }
        tracing::info!(session = %self.id, "session state: {state:?}");
        self.emitter.emit(SessionEvent::StateChanged(state));
    }

    async fn release_engine(&self, leave: bool) {
        let engine = self.engine.lock().await.take();
        if let Some(engine) = engine {
            if leave {
                engine.leave_channel();
            }
            engine.destroy();
            tracing::info!(session = %self.id, "engine destroyed");
        }
    }

    fn spawn_event_loop(&self, events: mpsc::UnboundedReceiver<EngineEvent>) {
        let ctx = ReducerContext {
            session_id: self.id,
            emitter: self.emitter.clone(),
            participants: self.participants.clone(),
            state: self.state.clone(),
            torn_down: self.torn_down.clone(),
        };
        let handle = tokio::spawn(async move {
            Self::event_loop(events, ctx).await;
        });
        let mut slot = match self.event_loop.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(old) = slot.replace(handle) {
            old.abort();
        }
    }

    fn abort_event_loop(&self) {
        let handle = match self.event_loop.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    async fn event_loop(mut events: mpsc::UnboundedReceiver<EngineEvent>, ctx: ReducerContext) {
        while let Some(event) = events.recv().await {
            if ctx.torn_down.load(Ordering::SeqCst) {
                tracing::debug!(session = %ctx.session_id, "dropping engine event after teardown: {event:?}");
                break;
            }

            match event {
                EngineEvent::JoinChannelSuccess { channel, uid, elapsed_ms } => {
                    tracing::info!(
                        session = %ctx.session_id,
                        "joined channel {channel} as uid {uid} in {elapsed_ms}ms"
                    );
                    let had_remotes = {
                        let mut pm = ctx.participants.lock().await;
                        let had_remotes = pm.remote_count() > 0;
                        pm.set_local_uid(uid);
                        had_remotes
                    };
                    if !ctx.transition(SessionState::Active).await {
                        break;
                    }
                    ctx.emitter.emit(SessionEvent::LocalJoined { channel, uid });
                    if had_remotes {
                        ctx.emitter.emit(SessionEvent::RemoteSurfacesChanged(Vec::new()));
                    }
                }

                EngineEvent::UserJoined { uid, .. } => {
                    let remotes = {
                        let mut pm = ctx.participants.lock().await;
                        pm.add_remote(uid).then(|| pm.remote_uids().to_vec())
                    };
                    match remotes {
                        Some(remotes) => {
                            tracing::info!(session = %ctx.session_id, uid, "participant joined");
                            ctx.emitter.emit(SessionEvent::ParticipantJoined(uid));
                            ctx.emitter.emit(SessionEvent::RemoteSurfacesChanged(remotes));
                        }
                        None => {
                            tracing::debug!(session = %ctx.session_id, uid, "duplicate or local join ignored");
                        }
                    }
                }

                EngineEvent::UserOffline { uid, reason } => {
                    let remotes = {
                        let mut pm = ctx.participants.lock().await;
                        pm.remove_remote(uid).then(|| pm.remote_uids().to_vec())
                    };
                    if let Some(remotes) = remotes {
                        tracing::info!(session = %ctx.session_id, uid, "participant left: {reason:?}");
                        ctx.emitter.emit(SessionEvent::ParticipantLeft { uid, reason });
                        ctx.emitter.emit(SessionEvent::RemoteSurfacesChanged(remotes));
                    }
                }

                EngineEvent::Error { code, message } => {
                    let joining = *ctx.state.lock().await == SessionState::Joining;
                    if joining {
                        tracing::warn!(session = %ctx.session_id, "join failed with engine error {code}: {message}");
                        let reason = format!("engine error {code}: {message}");
                        ctx.transition(SessionState::JoinFailed { reason }).await;
                        break;
                    }
                    tracing::warn!(session = %ctx.session_id, "engine error {code}: {message}");
                }
            }
        }

        tracing::info!(session = %ctx.session_id, "session event loop ended");
    }
}

impl Drop for CallSession {
    fn drop(&mut self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!(session = %self.id, "call session dropped without end_call, tearing down");
        self.abort_event_loop();
        if let Ok(mut slot) = self.engine.try_lock() {
            if let Some(engine) = slot.take() {
                engine.leave_channel();
                engine.destroy();
            }
        }
    }
}

/// Shared state the reducer task mutates.
struct ReducerContext {
    session_id: Uuid,
    emitter: EventEmitter,
    participants: Arc<Mutex<ParticipantManager>>,
    state: Arc<Mutex<SessionState>>,
    torn_down: Arc<AtomicBool>,
}

impl ReducerContext {
    /// Returns false if the session was terminated meanwhile.
    async fn transition(&self, next: SessionState) -> bool {
        {
            let mut current = self.state.lock().await;
            if *current == SessionState::Terminated {
                return false;
            }
            if *current == next {
                return true;
            }
            *current = next.clone();
        }
        tracing::info!(session = %self.session_id, "session state: {next:?}");
        self.emitter.emit(SessionEvent::StateChanged(next));
        true
    }
}
