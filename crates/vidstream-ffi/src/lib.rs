//! UniFFI bindings for vidstream-core.
//!
//! Provides a VidstreamClient object that wraps the settings store, the
//! join form and the current CallSession into a single FFI-safe interface.
//! The native shell supplies the RTC engine by implementing `NativeEngine`
//! and forwards SDK callbacks through `EngineCallbacks`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};

use vidstream_core::{
    CallSession, EngineEventSender, JoinForm, JoinRequest,
    ChannelMediaOptions as CoreChannelMediaOptions, OfflineReason as CoreOfflineReason,
    Permission as CorePermission, RenderMode as CoreRenderMode, SessionEvent as CoreSessionEvent,
    SessionState as CoreSessionState, SurfaceHandle, UserRole as CoreUserRole,
    VideoCanvas as CoreVideoCanvas,
};

uniffi::include_scaffolding!("vidstream");

// ── Namespace functions ──────────────────────────────────────────────

/// Initialize tracing/logging. Call once from the host before using VidstreamClient.
/// On Android, stderr goes to logcat for debuggable builds.
fn init_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("vidstream_core=debug,vidstream_ffi=debug"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .init();
    });
}

/// Whether the join button should be enabled for this input.
fn can_submit_channel(channel_name: String) -> bool {
    let mut form = JoinForm::default();
    form.set_channel_name(channel_name);
    form.can_submit()
}

// ── FFI-safe type conversions ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Broadcaster,
    Audience,
}

impl From<CoreUserRole> for UserRole {
    fn from(r: CoreUserRole) -> Self {
        match r {
            CoreUserRole::Broadcaster => Self::Broadcaster,
            CoreUserRole::Audience => Self::Audience,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Microphone,
    Camera,
}

impl From<CorePermission> for Permission {
    fn from(p: CorePermission) -> Self {
        match p {
            CorePermission::Microphone => Self::Microphone,
            CorePermission::Camera => Self::Camera,
        }
    }
}

impl From<Permission> for CorePermission {
    fn from(p: Permission) -> Self {
        match p {
            Permission::Microphone => Self::Microphone,
            Permission::Camera => Self::Camera,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Hidden,
    Fit,
}

impl From<CoreRenderMode> for RenderMode {
    fn from(m: CoreRenderMode) -> Self {
        match m {
            CoreRenderMode::Hidden => Self::Hidden,
            CoreRenderMode::Fit => Self::Fit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unpermitted,
    Joining,
    Active,
    JoinFailed { reason: String },
    Terminated,
}

impl From<CoreSessionState> for SessionState {
    fn from(s: CoreSessionState) -> Self {
        match s {
            CoreSessionState::Unpermitted => Self::Unpermitted,
            CoreSessionState::Joining => Self::Joining,
            CoreSessionState::Active => Self::Active,
            CoreSessionState::JoinFailed { reason } => Self::JoinFailed { reason },
            CoreSessionState::Terminated => Self::Terminated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfflineReason {
    Quit,
    Dropped,
    BecomeAudience,
    Unknown { code: i32 },
}

impl From<CoreOfflineReason> for OfflineReason {
    fn from(r: CoreOfflineReason) -> Self {
        match r {
            CoreOfflineReason::Quit => Self::Quit,
            CoreOfflineReason::Dropped => Self::Dropped,
            CoreOfflineReason::BecomeAudience => Self::BecomeAudience,
            CoreOfflineReason::Unknown(code) => Self::Unknown { code },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VidstreamEvent {
    StateChanged { state: SessionState },
    LocalJoined { channel: String, uid: u32 },
    ParticipantJoined { uid: u32 },
    ParticipantLeft { uid: u32, reason: OfflineReason },
    RemoteSurfacesChanged { uids: Vec<u32> },
    LocalAudioMuted { muted: bool },
    LocalVideoMuted { muted: bool },
}

impl From<CoreSessionEvent> for VidstreamEvent {
    fn from(e: CoreSessionEvent) -> Self {
        match e {
            CoreSessionEvent::StateChanged(s) => Self::StateChanged { state: s.into() },
            CoreSessionEvent::LocalJoined { channel, uid } => Self::LocalJoined { channel, uid },
            CoreSessionEvent::ParticipantJoined(uid) => Self::ParticipantJoined { uid },
            CoreSessionEvent::ParticipantLeft { uid, reason } => {
                Self::ParticipantLeft { uid, reason: reason.into() }
            }
            CoreSessionEvent::RemoteSurfacesChanged(uids) => Self::RemoteSurfacesChanged { uids },
            CoreSessionEvent::LocalAudioMuted(muted) => Self::LocalAudioMuted { muted },
            CoreSessionEvent::LocalVideoMuted(muted) => Self::LocalVideoMuted { muted },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub app_id: String,
    pub app_token: Option<String>,
    pub last_channel_name: Option<String>,
    pub role: UserRole,
    pub mic_muted_on_join: bool,
    pub camera_muted_on_join: bool,
}

impl From<vidstream_core::Settings> for Settings {
    fn from(s: vidstream_core::Settings) -> Self {
        Self {
            app_id: s.app_id,
            app_token: s.app_token,
            last_channel_name: s.last_channel_name,
            role: s.role.into(),
            mic_muted_on_join: s.mic_muted_on_join,
            camera_muted_on_join: s.camera_muted_on_join,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMediaOptions {
    pub client_role_type: i32,
    pub channel_profile: i32,
}

impl From<CoreChannelMediaOptions> for ChannelMediaOptions {
    fn from(o: CoreChannelMediaOptions) -> Self {
        Self {
            client_role_type: o.client_role_type,
            channel_profile: o.channel_profile,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoCanvas {
    pub surface: u64,
    pub render_mode: RenderMode,
    pub uid: u32,
}

impl From<CoreVideoCanvas> for VideoCanvas {
    fn from(c: CoreVideoCanvas) -> Self {
        Self {
            surface: c.surface.0,
            render_mode: c.render_mode.into(),
            uid: c.uid,
        }
    }
}

// ── Error conversion ──────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum VidstreamError {
    #[error("channel name must not be empty")]
    EmptyChannelName,
    #[error("Invalid payload: {msg}")]
    InvalidPayload { msg: String },
    #[error("Permission denied: {msg}")]
    PermissionDenied { msg: String },
    #[error("Engine creation failed: {msg}")]
    EngineCreate { msg: String },
    #[error("Join failed: {msg}")]
    Join { msg: String },
    #[error("not joined to a channel")]
    NotJoined,
    #[error("unknown participant: {uid}")]
    UnknownParticipant { uid: u32 },
    #[error("session terminated")]
    Terminated,
    #[error("Config error: {msg}")]
    Config { msg: String },
    #[error("no call session open")]
    NoSession,
}

impl From<vidstream_core::VidstreamError> for VidstreamError {
    fn from(e: vidstream_core::VidstreamError) -> Self {
        tracing::error!("VidstreamError: {e}");
        match e {
            vidstream_core::VidstreamError::EmptyChannelName => Self::EmptyChannelName,
            vidstream_core::VidstreamError::InvalidPayload(msg) => Self::InvalidPayload { msg },
            vidstream_core::VidstreamError::PermissionDenied(msg) => Self::PermissionDenied { msg },
            vidstream_core::VidstreamError::EngineCreate(msg) => Self::EngineCreate { msg },
            vidstream_core::VidstreamError::Join(msg) => Self::Join { msg },
            vidstream_core::VidstreamError::NotJoined => Self::NotJoined,
            vidstream_core::VidstreamError::UnknownParticipant(uid) => Self::UnknownParticipant { uid },
            vidstream_core::VidstreamError::Terminated => Self::Terminated,
            vidstream_core::VidstreamError::Settings(msg) => Self::Config { msg },
        }
    }
}

// ── Callback interfaces ───────────────────────────────────────────────

pub trait VidstreamEventListener: Send + Sync {
    fn on_event(&self, event: VidstreamEvent);
}

pub trait PermissionChecker: Send + Sync {
    fn is_granted(&self, permission: Permission) -> bool;
}

/// The vendor RTC engine as wrapped by the native shell.
///
/// `create` and `join_channel` return the SDK status code; 0 means success.
pub trait NativeEngine: Send + Sync {
    fn create(&self, app_id: String, callbacks: Arc<EngineCallbacks>) -> i32;
    fn enable_video(&self);
    fn join_channel(
        &self,
        token: Option<String>,
        channel: String,
        uid_hint: u32,
        options: ChannelMediaOptions,
    ) -> i32;
    fn leave_channel(&self);
    fn mute_local_audio_stream(&self, muted: bool);
    fn mute_local_video_stream(&self, muted: bool);
    fn setup_local_video(&self, canvas: VideoCanvas);
    fn setup_remote_video(&self, canvas: VideoCanvas);
    fn start_preview(&self);
    fn stop_preview(&self);
    fn destroy(&self);
}

// ── Engine callbacks: native SDK thread → session reducer ─────────────

/// Handed to the native engine on create. Safe to call from any thread.
pub struct EngineCallbacks {
    events: EngineEventSender,
}

impl EngineCallbacks {
    pub fn on_join_channel_success(&self, channel: String, uid: u32, elapsed: i32) {
        self.events.on_join_channel_success(&channel, uid, elapsed);
    }

    pub fn on_user_joined(&self, uid: u32, elapsed: i32) {
        self.events.on_user_joined(uid, elapsed);
    }

    pub fn on_user_offline(&self, uid: u32, reason: i32) {
        self.events.on_user_offline(uid, reason);
    }

    pub fn on_error(&self, code: i32, message: String) {
        self.events.on_error(code, &message);
    }
}

// ── Bridges: FFI callbacks → core traits ──────────────────────────────

struct BridgeListener {
    ffi_listener: Arc<dyn VidstreamEventListener>,
}

impl vidstream_core::SessionEventListener for BridgeListener {
    fn on_event(&self, event: CoreSessionEvent) {
        self.ffi_listener.on_event(event.into());
    }
}

struct BridgePermissions {
    checker: Box<dyn PermissionChecker>,
}

impl vidstream_core::PermissionProvider for BridgePermissions {
    fn is_granted(&self, permission: CorePermission) -> bool {
        self.checker.is_granted(permission.into())
    }
}

struct NativeEngineFactory {
    native: Arc<dyn NativeEngine>,
}

impl vidstream_core::EngineFactory for NativeEngineFactory {
    fn create(
        &self,
        app_id: &str,
        events: EngineEventSender,
    ) -> Result<Arc<dyn vidstream_core::RtcEngine>, vidstream_core::VidstreamError> {
        let code = self
            .native
            .create(app_id.to_string(), Arc::new(EngineCallbacks { events }));
        if code != 0 {
            return Err(vidstream_core::VidstreamError::EngineCreate(format!(
                "native engine create returned {code}"
            )));
        }
        Ok(Arc::new(NativeEngineAdapter {
            native: self.native.clone(),
        }))
    }
}

struct NativeEngineAdapter {
    native: Arc<dyn NativeEngine>,
}

impl vidstream_core::RtcEngine for NativeEngineAdapter {
    fn enable_video(&self) {
        self.native.enable_video();
    }

    fn join_channel(
        &self,
        token: Option<&str>,
        channel: &str,
        uid_hint: u32,
        options: &CoreChannelMediaOptions,
    ) -> Result<(), vidstream_core::VidstreamError> {
        let code = self.native.join_channel(
            token.map(str::to_string),
            channel.to_string(),
            uid_hint,
            (*options).into(),
        );
        if code != 0 {
            return Err(vidstream_core::VidstreamError::Join(format!(
                "joinChannel returned {code}"
            )));
        }
        Ok(())
    }

    fn leave_channel(&self) {
        self.native.leave_channel();
    }

    fn mute_local_audio_stream(&self, muted: bool) {
        self.native.mute_local_audio_stream(muted);
    }

    fn mute_local_video_stream(&self, muted: bool) {
        self.native.mute_local_video_stream(muted);
    }

    fn setup_local_video(&self, canvas: &CoreVideoCanvas) {
        self.native.setup_local_video((*canvas).into());
    }

    fn setup_remote_video(&self, canvas: &CoreVideoCanvas) {
        self.native.setup_remote_video((*canvas).into());
    }

    fn start_preview(&self) {
        self.native.start_preview();
    }

    fn stop_preview(&self) {
        self.native.stop_preview();
    }

    fn destroy(&self) {
        self.native.destroy();
    }
}

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// ── VidstreamClient: main FFI object ──────────────────────────────────

pub struct VidstreamClient {
    settings: vidstream_core::SettingsStore,
    factory: Arc<NativeEngineFactory>,
    session: StdMutex<Option<Arc<CallSession>>>,
    listeners: StdMutex<Vec<Arc<BridgeListener>>>,
    rt: tokio::runtime::Runtime,
}

impl VidstreamClient {
    pub fn new(data_dir: String, engine: Box<dyn NativeEngine>) -> Self {
        tracing::info!("VidstreamClient::new() data_dir={data_dir}");
        let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
        Self {
            settings: vidstream_core::SettingsStore::new(&data_dir),
            factory: Arc::new(NativeEngineFactory {
                native: Arc::from(engine),
            }),
            session: StdMutex::new(None),
            listeners: StdMutex::new(Vec::new()),
            rt,
        }
    }

    pub fn get_settings(&self) -> Settings {
        self.settings.get().into()
    }

    pub fn set_app_credentials(
        &self,
        app_id: String,
        app_token: Option<String>,
    ) -> Result<(), VidstreamError> {
        Ok(self.settings.set_app_credentials(app_id, app_token)?)
    }

    pub fn set_mic_muted_on_join(&self, muted: bool) -> Result<(), VidstreamError> {
        Ok(self.settings.set_mic_muted_on_join(muted)?)
    }

    pub fn set_camera_muted_on_join(&self, muted: bool) -> Result<(), VidstreamError> {
        Ok(self.settings.set_camera_muted_on_join(muted)?)
    }

    /// Channel name the join screen starts with.
    pub fn default_channel_name(&self) -> String {
        let settings = self.settings.get();
        JoinForm::new(settings.last_channel_name.as_deref(), settings.role)
            .channel_name()
            .to_string()
    }

    /// Submit the join form. Returns the navigation extras for the call screen.
    pub fn prepare_join(&self, channel_name: String) -> Result<HashMap<String, String>, VidstreamError> {
        let settings = self.settings.get();
        let mut form = JoinForm::new(settings.last_channel_name.as_deref(), settings.role);
        form.set_channel_name(channel_name);
        let request = form.submit()?;
        self.settings
            .set_last_channel_name(Some(request.channel_name.clone()))?;
        Ok(request.to_extras())
    }

    /// Create the call session for the call screen, ending any previous one.
    pub fn open_session(&self, extras: HashMap<String, String>) -> Result<(), VidstreamError> {
        let request = JoinRequest::from_extras(&extras)?;

        let previous = lock(&self.session).take();
        if let Some(previous) = previous {
            tracing::info!("replacing session {}", previous.id());
            self.rt.block_on(previous.end_call());
        }

        let session = CallSession::new(request, &self.settings.get(), self.factory.clone());
        for listener in lock(&self.listeners).iter() {
            session.add_listener(listener.clone());
        }
        *lock(&self.session) = Some(Arc::new(session));
        Ok(())
    }

    pub fn permissions_to_request(&self) -> Vec<Permission> {
        vidstream_core::PermissionGate::new()
            .permissions_to_request()
            .into_iter()
            .map(Permission::from)
            .collect()
    }

    pub fn check_permissions(&self, checker: Box<dyn PermissionChecker>) -> Result<(), VidstreamError> {
        let session = self.current_session()?;
        let provider = BridgePermissions { checker };
        self.guarded("check_permissions", || {
            self.rt
                .block_on(session.check_permissions(&provider))
                .map_err(VidstreamError::from)
        })
    }

    pub fn on_permission_result(
        &self,
        microphone_granted: bool,
        camera_granted: bool,
    ) -> Result<(), VidstreamError> {
        let session = self.current_session()?;
        let results = [
            (CorePermission::Microphone, microphone_granted),
            (CorePermission::Camera, camera_granted),
        ];
        self.guarded("on_permission_result", || {
            self.rt
                .block_on(session.on_permission_result(&results))
                .map_err(VidstreamError::from)
        })
    }

    pub fn retry_join(&self) -> Result<(), VidstreamError> {
        let session = self.current_session()?;
        self.guarded("retry_join", || {
            self.rt
                .block_on(session.retry_join())
                .map_err(VidstreamError::from)
        })
    }

    pub fn session_state(&self) -> SessionState {
        match self.current_session() {
            Ok(session) => self.rt.block_on(session.state()).into(),
            Err(_) => SessionState::Unpermitted,
        }
    }

    pub fn local_uid(&self) -> Option<u32> {
        let session = self.current_session().ok()?;
        self.rt.block_on(session.local_uid())
    }

    pub fn remote_uids(&self) -> Vec<u32> {
        match self.current_session() {
            Ok(session) => self.rt.block_on(session.remote_uids()),
            Err(_) => Vec::new(),
        }
    }

    pub fn toggle_microphone(&self) -> Result<bool, VidstreamError> {
        let controls = self.current_session()?.controls();
        Ok(self.rt.block_on(controls.toggle_microphone())?)
    }

    pub fn toggle_camera(&self) -> Result<bool, VidstreamError> {
        let controls = self.current_session()?.controls();
        Ok(self.rt.block_on(controls.toggle_camera())?)
    }

    pub fn is_microphone_muted(&self) -> bool {
        match self.current_session() {
            Ok(session) => self.rt.block_on(session.controls().is_microphone_muted()),
            Err(_) => self.settings.get().mic_muted_on_join,
        }
    }

    pub fn is_camera_muted(&self) -> bool {
        match self.current_session() {
            Ok(session) => self.rt.block_on(session.controls().is_camera_muted()),
            Err(_) => self.settings.get().camera_muted_on_join,
        }
    }

    pub fn bind_local_video(&self, surface: u64) -> Result<(), VidstreamError> {
        let session = self.current_session()?;
        Ok(self.rt.block_on(session.bind_local_video(SurfaceHandle(surface)))?)
    }

    pub fn unbind_local_video(&self) -> Result<(), VidstreamError> {
        let session = self.current_session()?;
        Ok(self.rt.block_on(session.unbind_local_video())?)
    }

    pub fn bind_remote_video(&self, uid: u32, surface: u64) -> Result<(), VidstreamError> {
        let session = self.current_session()?;
        Ok(self
            .rt
            .block_on(session.bind_remote_video(uid, SurfaceHandle(surface)))?)
    }

    pub fn end_call(&self) {
        if let Ok(session) = self.current_session() {
            self.rt.block_on(session.end_call());
        }
    }

    pub fn add_listener(&self, listener: Box<dyn VidstreamEventListener>) {
        let bridge = Arc::new(BridgeListener {
            ffi_listener: Arc::from(listener),
        });
        if let Ok(session) = self.current_session() {
            session.add_listener(bridge.clone());
        }
        lock(&self.listeners).push(bridge);
    }

    fn current_session(&self) -> Result<Arc<CallSession>, VidstreamError> {
        lock(&self.session).clone().ok_or(VidstreamError::NoSession)
    }

    /// Run `f`, converting a panic into an error so it never crosses the FFI boundary.
    fn guarded<T>(
        &self,
        op: &str,
        f: impl FnOnce() -> Result<T, VidstreamError>,
    ) -> Result<T, VidstreamError> {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
            Ok(result) => result,
            Err(panic_info) => {
                let msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic".to_string()
                };
                tracing::error!("{op}() panicked: {msg}");
                Err(VidstreamError::Join {
                    msg: format!("panic in {op}: {msg}"),
                })
            }
        }
    }
}

impl Drop for VidstreamClient {
    fn drop(&mut self) {
        let session = lock(&self.session).take();
        if let Some(session) = session {
            self.rt.block_on(session.end_call());
        }
    }
}
