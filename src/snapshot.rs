use crate::session::{Outcome, Phase};
use serde::Serialize;

/// Read-only view of a session handed to the presentation layer each tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub lives: u32,
    pub score: u32,
    /// Challenges still queued, not counting the active one.
    pub remaining: usize,
    pub outcome: Option<Outcome>,
    pub active: Option<ActiveView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveView {
    pub identifier: String,
    pub vertical_position: f64,
    pub horizontal_position: f64,
    pub is_resolving: bool,
    /// 0.0 when the pop starts, 1.0 when the challenge is about to clear.
    pub resolution_progress: Option<f64>,
}

impl SessionSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_for_headless_output() {
        let snap = SessionSnapshot {
            phase: Phase::Active,
            lives: 2,
            score: 4,
            remaining: 1,
            outcome: None,
            active: Some(ActiveView {
                identifier: "kiss".into(),
                vertical_position: 12.5,
                horizontal_position: 40.0,
                is_resolving: false,
                resolution_progress: None,
            }),
        };
        let json: serde_json::Value = serde_json::from_str(&snap.to_json().unwrap()).unwrap();
        assert_eq!(json["phase"], "Active");
        assert_eq!(json["active"]["identifier"], "kiss");
        assert_eq!(json["outcome"], serde_json::Value::Null);
    }
}
