use std::fmt;

/// Device capabilities a call needs before joining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Microphone,
    Camera,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Microphone => f.write_str("microphone"),
            Permission::Camera => f.write_str("camera"),
        }
    }
}

/// Permissions required to enter a call, always requested together.
pub const REQUIRED_PERMISSIONS: [Permission; 2] = [Permission::Microphone, Permission::Camera];

/// Platform permission query, implemented by the native shell.
pub trait PermissionProvider: Send + Sync {
    fn is_granted(&self, permission: Permission) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied { missing: Vec<Permission> },
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

/// All-or-nothing gate over [`REQUIRED_PERMISSIONS`].
#[derive(Debug, Clone, Default)]
pub struct PermissionGate;

impl PermissionGate {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate the result of a request-multiple prompt.
    ///
    /// A required permission absent from `results` counts as denied.
    pub fn evaluate(&self, results: &[(Permission, bool)]) -> PermissionStatus {
        let missing: Vec<Permission> = REQUIRED_PERMISSIONS
            .iter()
            .copied()
            .filter(|required| {
                !results
                    .iter()
                    .any(|(permission, granted)| permission == required && *granted)
            })
            .collect();

        if missing.is_empty() {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied { missing }
        }
    }

    /// Query the platform for the current grant state.
    pub fn check(&self, provider: &dyn PermissionProvider) -> PermissionStatus {
        let results: Vec<(Permission, bool)> = REQUIRED_PERMISSIONS
            .iter()
            .map(|p| (*p, provider.is_granted(*p)))
            .collect();
        self.evaluate(&results)
    }

    /// What the retry affordance must request. Always the full set.
    pub fn permissions_to_request(&self) -> Vec<Permission> {
        REQUIRED_PERMISSIONS.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        mic: bool,
        camera: bool,
    }

    impl PermissionProvider for Fixed {
        fn is_granted(&self, permission: Permission) -> bool {
            match permission {
                Permission::Microphone => self.mic,
                Permission::Camera => self.camera,
            }
        }
    }

    #[test]
    fn granted_only_when_all_granted() {
        let gate = PermissionGate::new();
        assert!(gate.check(&Fixed { mic: true, camera: true }).is_granted());
        assert_eq!(
            gate.check(&Fixed { mic: true, camera: false }),
            PermissionStatus::Denied { missing: vec![Permission::Camera] }
        );
        assert_eq!(
            gate.check(&Fixed { mic: false, camera: false }),
            PermissionStatus::Denied {
                missing: vec![Permission::Microphone, Permission::Camera]
            }
        );
    }

    #[test]
    fn omitted_permission_counts_as_denied() {
        let gate = PermissionGate::new();
        let status = gate.evaluate(&[(Permission::Microphone, true)]);
        assert_eq!(status, PermissionStatus::Denied { missing: vec![Permission::Camera] });
    }

    #[test]
    fn retry_requests_both() {
        let gate = PermissionGate::new();
        assert_eq!(
            gate.permissions_to_request(),
            vec![Permission::Microphone, Permission::Camera]
        );
    }
}
