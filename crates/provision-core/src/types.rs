use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::error::{ProvisionError, Result};

/// Lifecycle of a provisioned service.
///
/// States are ordered and a service only ever moves to a later one. Records
/// may carry states written by sagas that run after setup; those are kept
/// verbatim as `Downstream` and rank after every known state. An empty
/// state reads as `Initialized`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ServiceState {
    #[default]
    Initialized,
    Planned,
    /// Reached by the start sagas that run after setup.
    Active,
    Downstream(String),
}

impl ServiceState {
    fn rank(&self) -> u8 {
        match self {
            Self::Initialized => 0,
            Self::Planned => 1,
            Self::Active => 2,
            Self::Downstream(_) => 3,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Initialized => "initialized",
            Self::Planned => "planned",
            Self::Active => "active",
            Self::Downstream(name) => name,
        }
    }
}

impl Ord for ServiceState {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.as_str().cmp(other.as_str()))
    }
}

impl PartialOrd for ServiceState {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl From<String> for ServiceState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "" | "initialized" => Self::Initialized,
            "planned" => Self::Planned,
            "active" => Self::Active,
            _ => Self::Downstream(value),
        }
    }
}

impl From<ServiceState> for String {
    fn from(state: ServiceState) -> Self {
        match state {
            ServiceState::Downstream(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Data,
    Code,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlanUser {
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Runtime requirements reported by an image's `plan` hook.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub users: Vec<PlanUser>,
    #[serde(default)]
    pub default_user: String,
}

impl Plan {
    /// The declared default user, if it names one of the plan's users.
    ///
    /// When a username repeats, the last entry wins.
    #[must_use]
    pub fn default_user(&self) -> Option<&PlanUser> {
        if self.default_user.is_empty() {
            return None;
        }
        self.users
            .iter()
            .rfind(|user| user.username == self.default_user)
    }
}

/// Persisted record of a provisioned service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Service {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub internal_ip: Option<Ipv4Addr>,
    #[serde(default)]
    pub external_ip: Option<Ipv4Addr>,
    #[serde(default)]
    pub state: ServiceState,
    #[serde(default, rename = "type")]
    pub kind: Option<ServiceType>,
    #[serde(default)]
    pub plan: Plan,
}

impl Service {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether setup already ran for this record.
    #[must_use]
    pub fn is_past(&self, state: ServiceState) -> bool {
        self.state > state
    }

    /// Move the record to `next`.
    ///
    /// # Errors
    ///
    /// Returns `StateRegression` if `next` precedes the current state.
    pub fn advance(&mut self, next: ServiceState) -> Result<()> {
        if next < self.state {
            return Err(ProvisionError::StateRegression {
                name: self.name.clone(),
                from: self.state.clone(),
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_forward() {
        let mut service = Service::new("data.db");

        service
            .advance(ServiceState::Planned)
            .expect("forward move should succeed");

        assert_eq!(service.state, ServiceState::Planned);
    }

    #[test]
    fn advance_to_same_state_is_allowed() {
        let mut service = Service::new("data.db");
        service.state = ServiceState::Planned;

        assert!(service.advance(ServiceState::Planned).is_ok());
    }

    #[test]
    fn advance_rejects_regression() {
        let mut service = Service::new("data.db");
        service.state = ServiceState::Active;

        let err = service
            .advance(ServiceState::Planned)
            .expect_err("regression should fail");

        assert!(matches!(
            err,
            ProvisionError::StateRegression {
                from: ServiceState::Active,
                to: ServiceState::Planned,
                ..
            }
        ));
        assert_eq!(service.state, ServiceState::Active);
        assert!(err.to_string().contains("data.db"));
    }

    #[test]
    fn is_past_compares_lifecycle_position() {
        let mut service = Service::new("web");
        assert!(!service.is_past(ServiceState::Initialized));

        service.state = ServiceState::Planned;
        assert!(service.is_past(ServiceState::Initialized));
        assert!(!service.is_past(ServiceState::Planned));
    }

    #[test]
    fn record_without_state_deserializes_as_initialized() {
        let service: Service =
            serde_json::from_str(r#"{"name":"data.db"}"#).expect("valid record");

        assert_eq!(service.state, ServiceState::Initialized);
        assert!(service.internal_ip.is_none());
        assert!(service.plan.users.is_empty());
    }

    #[test]
    fn service_type_serializes_under_type_key() {
        let mut service = Service::new("data.db");
        service.kind = Some(ServiceType::Data);

        let json = serde_json::to_value(&service).expect("serializable");

        assert_eq!(json["type"], "data");
        assert_eq!(json["state"], "initialized");
    }

    #[test]
    fn plan_parses_without_passwords_or_default_user() {
        let plan: Plan = serde_json::from_str(r#"{"users":[{"username":"root"}]}"#)
            .expect("valid plan");

        assert_eq!(plan.users.len(), 1);
        assert_eq!(plan.users[0].password, "");
        assert!(plan.default_user().is_none());
    }

    #[test]
    fn default_user_lookup_requires_matching_user() {
        let plan = Plan {
            users: vec![PlanUser {
                username: "alice".to_string(),
                password: "p1".to_string(),
            }],
            default_user: "bob".to_string(),
        };

        assert!(plan.default_user().is_none());
    }

    #[test]
    fn repeated_default_user_resolves_to_last_entry() {
        let user = |password: &str| PlanUser {
            username: "a".to_string(),
            password: password.to_string(),
        };
        let plan = Plan {
            users: vec![user("p1"), user("p2")],
            default_user: "a".to_string(),
        };

        assert_eq!(plan.default_user().map(|u| u.password.as_str()), Some("p2"));
    }

    #[test]
    fn record_written_by_a_later_stage_is_past_setup() {
        let service: Service = serde_json::from_str(r#"{"name":"data.db","state":"started"}"#)
            .expect("unknown states decode");

        assert!(service.is_past(ServiceState::Initialized));
        assert!(service.is_past(ServiceState::Active));
    }

    #[test]
    fn record_with_empty_state_is_not_past_setup() {
        let service: Service =
            serde_json::from_str(r#"{"name":"data.db","state":""}"#).expect("empty state decodes");

        assert!(!service.is_past(ServiceState::Initialized));
    }
}
