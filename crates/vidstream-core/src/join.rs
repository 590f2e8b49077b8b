use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::VidstreamError;

/// Navigation payload key carrying the channel name.
pub const EXTRA_CHANNEL_NAME: &str = "channel_name";
/// Navigation payload key carrying the role name.
pub const EXTRA_ROLE: &str = "role";

/// Channel name prefilled on the join screen when nothing was saved.
pub const DEFAULT_CHANNEL_NAME: &str = "test";

/// Whether the local participant publishes media or only watches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    #[default]
    Broadcaster,
    Audience,
}

impl UserRole {
    /// Client role flag passed to the engine on join.
    pub fn client_role_type(self) -> i32 {
        match self {
            UserRole::Broadcaster => 1,
            UserRole::Audience => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Broadcaster => "Broadcaster",
            UserRole::Audience => "Audience",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = VidstreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Broadcaster" => Ok(UserRole::Broadcaster),
            "Audience" => Ok(UserRole::Audience),
            other => Err(VidstreamError::InvalidPayload(format!("unknown role: {other}"))),
        }
    }
}

/// What the join screen hands to the call screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub channel_name: String,
    pub role: UserRole,
}

impl JoinRequest {
    /// Encode as string key/value navigation extras.
    pub fn to_extras(&self) -> HashMap<String, String> {
        HashMap::from([
            (EXTRA_CHANNEL_NAME.to_string(), self.channel_name.clone()),
            (EXTRA_ROLE.to_string(), self.role.as_str().to_string()),
        ])
    }

    /// Decode navigation extras produced by [`JoinRequest::to_extras`].
    pub fn from_extras(extras: &HashMap<String, String>) -> Result<Self, VidstreamError> {
        let channel_name = extras
            .get(EXTRA_CHANNEL_NAME)
            .ok_or_else(|| VidstreamError::InvalidPayload(format!("missing {EXTRA_CHANNEL_NAME}")))?;
        if channel_name.is_empty() {
            return Err(VidstreamError::EmptyChannelName);
        }
        let role = extras
            .get(EXTRA_ROLE)
            .ok_or_else(|| VidstreamError::InvalidPayload(format!("missing {EXTRA_ROLE}")))?
            .parse()?;

        Ok(Self {
            channel_name: channel_name.clone(),
            role,
        })
    }
}

/// State behind the join screen form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinForm {
    channel_name: String,
    role: UserRole,
    role_selection_enabled: bool,
}

impl JoinForm {
    /// Build a form prefilled with the last used channel, or the default one.
    pub fn new(last_channel_name: Option<&str>, role: UserRole) -> Self {
        let channel_name = last_channel_name
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_CHANNEL_NAME)
            .to_string();
        Self {
            channel_name,
            role,
            role_selection_enabled: false,
        }
    }

    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    pub fn set_channel_name(&mut self, name: impl Into<String>) {
        self.channel_name = name.into();
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn role_selection_enabled(&self) -> bool {
        self.role_selection_enabled
    }

    pub fn set_role_selection_enabled(&mut self, enabled: bool) {
        self.role_selection_enabled = enabled;
    }

    /// Change the role. Ignored while the role picker is disabled.
    pub fn set_role(&mut self, role: UserRole) {
        if self.role_selection_enabled {
            self.role = role;
        } else {
            tracing::debug!("role selection disabled, keeping {}", self.role);
        }
    }

    /// Whether the join button is enabled.
    pub fn can_submit(&self) -> bool {
        !self.channel_name.is_empty()
    }

    pub fn submit(&self) -> Result<JoinRequest, VidstreamError> {
        if !self.can_submit() {
            return Err(VidstreamError::EmptyChannelName);
        }
        tracing::info!("join requested: channel={} role={}", self.channel_name, self.role);
        Ok(JoinRequest {
            channel_name: self.channel_name.clone(),
            role: self.role,
        })
    }
}

impl Default for JoinForm {
    fn default() -> Self {
        Self::new(None, UserRole::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_flags() {
        assert_eq!(UserRole::Broadcaster.client_role_type(), 1);
        assert_eq!(UserRole::Audience.client_role_type(), 0);
    }

    #[test]
    fn role_parses_variant_names_only() {
        assert_eq!("Audience".parse::<UserRole>().unwrap(), UserRole::Audience);
        assert!("audience".parse::<UserRole>().is_err());
    }

    #[test]
    fn form_defaults_to_test_channel_and_broadcaster() {
        let form = JoinForm::default();
        assert_eq!(form.channel_name(), "test");
        assert_eq!(form.role(), UserRole::Broadcaster);
        assert!(form.can_submit());
    }

    #[test]
    fn form_prefills_last_channel() {
        let form = JoinForm::new(Some("room1"), UserRole::Broadcaster);
        assert_eq!(form.channel_name(), "room1");

        let form = JoinForm::new(Some(""), UserRole::Broadcaster);
        assert_eq!(form.channel_name(), "test");
    }

    #[test]
    fn submission_enabled_iff_channel_non_empty() {
        let mut form = JoinForm::default();
        form.set_channel_name("");
        assert!(!form.can_submit());
        assert_eq!(form.submit(), Err(VidstreamError::EmptyChannelName));

        form.set_channel_name("r");
        assert!(form.can_submit());
        assert_eq!(form.submit().unwrap().channel_name, "r");
    }

    #[test]
    fn role_change_ignored_while_picker_disabled() {
        let mut form = JoinForm::default();
        form.set_role(UserRole::Audience);
        assert_eq!(form.role(), UserRole::Broadcaster);

        form.set_role_selection_enabled(true);
        form.set_role(UserRole::Audience);
        assert_eq!(form.role(), UserRole::Audience);
    }

    #[test]
    fn extras_carry_channel_and_role() {
        let req = JoinRequest {
            channel_name: "room1".into(),
            role: UserRole::Audience,
        };
        let extras = req.to_extras();
        assert_eq!(extras.get("channel_name").map(String::as_str), Some("room1"));
        assert_eq!(extras.get("role").map(String::as_str), Some("Audience"));
        assert_eq!(JoinRequest::from_extras(&extras).unwrap(), req);
    }

    #[test]
    fn extras_missing_role_rejected() {
        let extras = HashMap::from([("channel_name".to_string(), "room1".to_string())]);
        assert!(matches!(
            JoinRequest::from_extras(&extras),
            Err(VidstreamError::InvalidPayload(_))
        ));
    }

    #[test]
    fn extras_unknown_role_rejected() {
        let extras = HashMap::from([
            ("channel_name".to_string(), "room1".to_string()),
            ("role".to_string(), "Host".to_string()),
        ]);
        assert!(JoinRequest::from_extras(&extras).is_err());
    }
}
