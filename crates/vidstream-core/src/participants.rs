/// Tracks the local uid and the remote uids of a call.
///
/// Updated by the session reducer. Read by native UI layers.
/// Remote uids are unique and kept in arrival order.
#[derive(Debug, Clone, Default)]
pub struct ParticipantManager {
    remote: Vec<u32>,
    local_uid: Option<u32>,
}

impl ParticipantManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the local uid on join success. Clears any stale remote entries.
    pub fn set_local_uid(&mut self, uid: u32) {
        self.local_uid = Some(uid);
        self.remote.clear();
    }

    pub fn local_uid(&self) -> Option<u32> {
        self.local_uid
    }

    /// Returns true if the set changed.
    pub fn add_remote(&mut self, uid: u32) -> bool {
        if self.local_uid == Some(uid) || self.remote.contains(&uid) {
            return false;
        }
        self.remote.push(uid);
        true
    }

    /// Returns true if the set changed. Removing an absent uid is a no-op.
    pub fn remove_remote(&mut self, uid: u32) -> bool {
        let before = self.remote.len();
        self.remote.retain(|r| *r != uid);
        self.remote.len() != before
    }

    pub fn remote_uids(&self) -> &[u32] {
        &self.remote
    }

    pub fn contains_remote(&self, uid: u32) -> bool {
        self.remote.contains(&uid)
    }

    pub fn remote_count(&self) -> usize {
        self.remote.len()
    }

    pub fn clear(&mut self) {
        self.remote.clear();
        self.local_uid = None;
    }
}
