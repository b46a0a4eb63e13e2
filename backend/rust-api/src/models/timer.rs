use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum GateEvent {
    GateTick(GateTick),
    GateOpen(GateOpen),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GateTick {
    pub session_id: String,
    pub remaining_seconds: u64,
    pub total_seconds: u64,
    pub deadline: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GateOpen {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl GateEvent {
    pub fn to_sse_data(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            GateEvent::GateTick(_) => "gate-tick",
            GateEvent::GateOpen(_) => "gate-open",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_serializes_with_kebab_case_tag() {
        let now = Utc::now();
        let event = GateEvent::GateTick(GateTick {
            session_id: "s1".to_string(),
            remaining_seconds: 7,
            total_seconds: 20,
            deadline: now,
            timestamp: now,
        });

        let json: serde_json::Value = serde_json::from_str(&event.to_sse_data()).unwrap();
        assert_eq!(json["type"], "gate-tick");
        assert_eq!(json["remaining_seconds"], 7);
        assert_eq!(event.event_name(), "gate-tick");
    }

    #[test]
    fn open_event_name() {
        let event = GateEvent::GateOpen(GateOpen {
            session_id: "s1".to_string(),
            timestamp: Utc::now(),
            message: "ready".to_string(),
        });
        assert_eq!(event.event_name(), "gate-open");
    }
}
