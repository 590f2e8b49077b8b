use std::sync::Arc;

use crate::engine::OfflineReason;

/// Lifecycle of a call session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Microphone and camera not both granted yet.
    Unpermitted,
    Joining,
    Active,
    /// Engine creation or join failed. `retry_join` restarts the attempt.
    JoinFailed { reason: String },
    Terminated,
}

/// Events emitted by the core to native UI listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StateChanged(SessionState),
    LocalJoined { channel: String, uid: u32 },
    ParticipantJoined(u32),
    ParticipantLeft { uid: u32, reason: OfflineReason },
    /// Remote uids in arrival order; the renderer rebinds its surfaces from this.
    RemoteSurfacesChanged(Vec<u32>),
    LocalAudioMuted(bool),
    LocalVideoMuted(bool),
}

/// Trait for receiving events from the core.
/// Implementations must be Send + Sync (called from tokio tasks).
pub trait SessionEventListener: Send + Sync {
    fn on_event(&self, event: SessionEvent);
}

/// Internal event emitter that dispatches to registered listeners.
#[derive(Clone, Default)]
pub struct EventEmitter {
    listeners: Arc<std::sync::RwLock<Vec<Arc<dyn SessionEventListener>>>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: Arc<dyn SessionEventListener>) {
        match self.listeners.write() {
            Ok(mut listeners) => listeners.push(listener),
            Err(poisoned) => poisoned.into_inner().push(listener),
        }
    }

    pub fn emit(&self, event: SessionEvent) {
        let listeners = match self.listeners.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for listener in listeners.iter() {
            listener.on_event(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingListener {
        count: Arc<AtomicUsize>,
    }

    impl SessionEventListener for CountingListener {
        fn on_event(&self, _event: SessionEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn emitter_dispatches_to_multiple_listeners() {
        let emitter = EventEmitter::new();
        let count1 = Arc::new(AtomicUsize::new(0));
        let count2 = Arc::new(AtomicUsize::new(0));

        emitter.add_listener(Arc::new(CountingListener { count: count1.clone() }));
        emitter.add_listener(Arc::new(CountingListener { count: count2.clone() }));

        emitter.emit(SessionEvent::StateChanged(SessionState::Active));

        assert_eq!(count1.load(Ordering::SeqCst), 1);
        assert_eq!(count2.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn emitter_without_listeners_is_noop() {
        let emitter = EventEmitter::new();
        emitter.emit(SessionEvent::ParticipantJoined(7));
    }
}
