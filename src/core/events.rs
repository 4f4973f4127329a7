//! Marathon event bus payloads.
//!
//! Every body carries an `eventType` discriminant. Decoding is two-phase: the
//! discriminant is read on its own first, then the body is decoded again into the
//! shape for that kind.

use serde::{Deserialize, Serialize};

use super::apps::App;
use super::error::SyncError;
use super::health::Health;
use super::tasks::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ApiPost,
    DeploymentInfo,
    AppTerminated,
    StatusUpdate,
    HealthStatusChanged,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::ApiPost,
        EventKind::DeploymentInfo,
        EventKind::AppTerminated,
        EventKind::StatusUpdate,
        EventKind::HealthStatusChanged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ApiPost => "api_post_event",
            EventKind::DeploymentInfo => "deployment_info",
            EventKind::AppTerminated => "app_terminated_event",
            EventKind::StatusUpdate => "status_update_event",
            EventKind::HealthStatusChanged => "health_status_changed_event",
        }
    }

    /// Exact match against the known discriminants.
    pub fn parse(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == kind)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPostEvent {
    pub event_type: String,
    pub app_definition: App,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentInfoEvent {
    pub event_type: String,
    #[serde(default)]
    pub plan: DeploymentPlan,
    /// Decoded for completeness; reconciliation only looks at the plan target.
    #[serde(default)]
    pub current_step: CurrentStep,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentPlan {
    #[serde(default)]
    pub target: DeploymentTarget,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentTarget {
    #[serde(default)]
    pub apps: Vec<App>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentStep {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub app: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppTerminatedEvent {
    pub event_type: String,
    pub app_id: String,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ApiPost(ApiPostEvent),
    DeploymentInfo(DeploymentInfoEvent),
    AppTerminated(AppTerminatedEvent),
    StatusUpdate(Task),
    HealthStatusChanged(Health),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ApiPost(_) => EventKind::ApiPost,
            Event::DeploymentInfo(_) => EventKind::DeploymentInfo,
            Event::AppTerminated(_) => EventKind::AppTerminated,
            Event::StatusUpdate(_) => EventKind::StatusUpdate,
            Event::HealthStatusChanged(_) => EventKind::HealthStatusChanged,
        }
    }

    /// Applications touched by this event. Events that only name an application
    /// yield a record carrying just its id.
    pub fn apps(&self) -> Vec<App> {
        match self {
            Event::ApiPost(e) => vec![e.app_definition.clone()],
            Event::DeploymentInfo(e) => e.plan.target.apps.clone(),
            Event::AppTerminated(e) => vec![App::with_id(&e.app_id)],
            Event::StatusUpdate(task) => vec![App::with_id(&task.app_id)],
            Event::HealthStatusChanged(health) => vec![App::with_id(&health.app_id)],
        }
    }
}

#[derive(Deserialize)]
struct Discriminant {
    #[serde(default, rename = "eventType")]
    event_type: Option<String>,
}

/// Read only the `eventType` field of a body.
pub fn detect_kind(body: &[u8]) -> Result<String, SyncError> {
    let base: Discriminant = serde_json::from_slice(body)?;
    match base.event_type {
        Some(kind) if !kind.is_empty() => Ok(kind),
        _ => Err(SyncError::NoEventKind),
    }
}

/// Decode a body into the variant its discriminant names.
pub fn decode(body: &[u8]) -> Result<Event, SyncError> {
    let kind = detect_kind(body)?;
    let kind = EventKind::parse(&kind).ok_or(SyncError::UnknownEventKind(kind))?;
    decode_as(kind, body)
}

/// Decode a body whose discriminant has already been read.
pub fn decode_as(kind: EventKind, body: &[u8]) -> Result<Event, SyncError> {
    let event = match kind {
        EventKind::ApiPost => Event::ApiPost(serde_json::from_slice(body)?),
        EventKind::DeploymentInfo => Event::DeploymentInfo(serde_json::from_slice(body)?),
        EventKind::AppTerminated => Event::AppTerminated(serde_json::from_slice(body)?),
        EventKind::StatusUpdate => Event::StatusUpdate(serde_json::from_slice(body)?),
        EventKind::HealthStatusChanged => {
            Event::HealthStatusChanged(serde_json::from_slice(body)?)
        }
    };
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tasks::TaskStatus;

    #[test]
    fn detect_kind_reads_discriminant() {
        let kind = detect_kind(br#"{"eventType":"api_post_event","other":1}"#).unwrap();
        assert_eq!(kind, "api_post_event");
    }

    #[test]
    fn detect_kind_rejects_missing_or_empty_discriminant() {
        assert!(matches!(
            detect_kind(br#"{"appId":"/a"}"#),
            Err(SyncError::NoEventKind)
        ));
        assert!(matches!(
            detect_kind(br#"{"eventType":""}"#),
            Err(SyncError::NoEventKind)
        ));
    }

    #[test]
    fn detect_kind_rejects_malformed_body() {
        assert!(matches!(
            detect_kind(b"{not json"),
            Err(SyncError::MalformedBody(_))
        ));
        assert!(matches!(
            detect_kind(b"[1,2,3]"),
            Err(SyncError::MalformedBody(_))
        ));
    }

    #[test]
    fn decode_rejects_unknown_kind() {
        match decode(br#"{"eventType":"framework_message_event"}"#) {
            Err(SyncError::UnknownEventKind(kind)) => assert_eq!(kind, "framework_message_event"),
            other => panic!("expected UnknownEventKind, got {:?}", other),
        }
    }

    #[test]
    fn decode_api_post_event() {
        let body = br#"{"eventType":"api_post_event","appDefinition":{"id":"/test","instances":1}}"#;
        let event = decode(body).unwrap();
        assert_eq!(event.kind(), EventKind::ApiPost);
        let apps = event.apps();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].id, "/test");
        assert_eq!(apps[0].fields["instances"], 1);
    }

    #[test]
    fn decode_deployment_info_keeps_target_and_step() {
        let body = br#"{
            "eventType":"deployment_info",
            "plan":{"target":{"apps":[{"id":"/a"},{"id":"/b"}]}},
            "currentStep":{"action":"ScaleApplication","app":"/a"}
        }"#;
        let event = decode(body).unwrap();
        let ids: Vec<String> = event.apps().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["/a", "/b"]);
        match event {
            Event::DeploymentInfo(info) => {
                assert_eq!(info.current_step.action, "ScaleApplication");
                assert_eq!(info.current_step.app, "/a");
            }
            other => panic!("unexpected variant {:?}", other),
        }
    }

    #[test]
    fn decode_app_terminated_synthesizes_app() {
        let body = br#"{"eventType":"app_terminated_event","appId":"test","timestamp":"2014-03-01T23:29:30.158Z"}"#;
        let event = decode(body).unwrap();
        assert_eq!(event.kind(), EventKind::AppTerminated);
        assert_eq!(event.apps(), vec![App::with_id("test")]);
    }

    #[test]
    fn decode_status_update_event() {
        let body = br#"{
            "eventType":"status_update_event",
            "timestamp":"2014-03-01T23:29:30.158Z",
            "slaveId":"20140909-054127-177048842-5050-1494-0",
            "taskId":"my-app_0-1396592784349",
            "taskStatus":"TASK_RUNNING",
            "appId":"/my-app",
            "host":"slave-1234.acme.org",
            "ports":[31372],
            "version":"2014-04-04T06:26:23.051Z"
        }"#;
        let event = decode(body).unwrap();
        assert_eq!(event.apps(), vec![App::with_id("/my-app")]);
        match event {
            Event::StatusUpdate(task) => {
                assert_eq!(task.id, "my-app_0-1396592784349");
                assert_eq!(task.task_status, TaskStatus::Running);
                assert_eq!(task.ports, vec![31372]);
                assert_eq!(task.host, "slave-1234.acme.org");
            }
            other => panic!("unexpected variant {:?}", other),
        }
    }

    #[test]
    fn decode_health_status_changed_event() {
        let body = br#"{"eventType":"health_status_changed_event","appId":"/my-app","taskId":"t1","timestamp":"ts","alive":true}"#;
        let event = decode(body).unwrap();
        assert_eq!(event.kind(), EventKind::HealthStatusChanged);
        match event {
            Event::HealthStatusChanged(health) => {
                assert_eq!(health.task_id, "t1");
                assert!(health.alive);
            }
            other => panic!("unexpected variant {:?}", other),
        }
    }

    #[test]
    fn decoding_is_repeatable() {
        let body = br#"{"eventType":"app_terminated_event","appId":"test"}"#;
        assert_eq!(decode(body).unwrap(), decode(body).unwrap());
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::parse("API_POST_EVENT"), None);
    }
}
