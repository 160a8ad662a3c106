//! Tool registry: the boundary where personal-information logic plugs in.
//!
//! Tools are a closed set of variants keyed by name. Each variant owns its
//! argument handling and result shape; the store behind them is reached
//! through [`EventSource`].

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// A calendar event as exposed to clients. Times are Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    pub title: String,
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, thiserror::Error)]
#[error("event store unavailable: {0}")]
pub struct EventSourceError(pub String);

/// Read access to the calendar store.
pub trait EventSource: Send + Sync {
    /// Events overlapping `[start, end)`.
    fn events_between(&self, start: SystemTime, end: SystemTime) -> Result<Vec<Event>, EventSourceError>;
}

/// Fixed list of events held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEvents {
    events: Vec<Event>,
}

impl InMemoryEvents {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }
}

impl EventSource for InMemoryEvents {
    fn events_between(&self, start: SystemTime, end: SystemTime) -> Result<Vec<Event>, EventSourceError> {
        let start = unix_secs(start);
        let end = unix_secs(end);
        Ok(self
            .events
            .iter()
            .filter(|e| e.start < end && e.end > start)
            .cloned()
            .collect())
    }
}

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Start and end of the UTC day containing `now`.
pub fn day_bounds(now: SystemTime) -> (SystemTime, SystemTime) {
    let start = unix_secs(now) / SECONDS_PER_DAY * SECONDS_PER_DAY;
    let start = UNIX_EPOCH + Duration::from_secs(start);
    (start, start + Duration::from_secs(SECONDS_PER_DAY))
}

/// Every tool the server offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    GetEventsToday,
}

impl Tool {
    pub const ALL: [Tool; 1] = [Tool::GetEventsToday];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tool::GetEventsToday => "get_events_today",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Tool::GetEventsToday => "Get a list of today's calendar events.",
        }
    }

    pub fn input_schema(&self) -> Value {
        match self {
            Tool::GetEventsToday => json!({ "type": "object", "properties": {} }),
        }
    }

    fn descriptor(&self) -> Value {
        json!({
            "name": self.name(),
            "description": self.description(),
            "inputSchema": self.input_schema(),
        })
    }
}

/// One block of tool output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text { text: String },
}

/// Result of `tools/call`. Tool failures are results with `is_error` set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<Content>,
    pub is_error: bool,
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: true,
        }
    }
}

/// Dispatches tool calls to their implementations.
#[derive(Clone)]
pub struct ToolRegistry {
    events: Arc<dyn EventSource>,
}

impl ToolRegistry {
    pub fn new(events: Arc<dyn EventSource>) -> Self {
        Self { events }
    }

    /// `tools/list` result.
    pub fn list(&self) -> Value {
        let tools: Vec<Value> = Tool::ALL.iter().map(Tool::descriptor).collect();
        json!({ "tools": tools })
    }

    /// `tools/call` for `name`, evaluated at the current time.
    pub fn call(&self, name: &str, arguments: &Value) -> ToolResult {
        self.call_at(name, arguments, SystemTime::now())
    }

    pub fn call_at(&self, name: &str, _arguments: &Value, now: SystemTime) -> ToolResult {
        let Some(tool) = Tool::from_name(name) else {
            tracing::warn!(tool = %name, "Unknown tool requested");
            return ToolResult::error(format!("Unknown tool: {}", name));
        };

        tracing::debug!(tool = tool.name(), "Calling tool");
        match tool {
            Tool::GetEventsToday => self.get_events_today(now),
        }
    }

    fn get_events_today(&self, now: SystemTime) -> ToolResult {
        let (start, end) = day_bounds(now);
        let events = match self.events.events_between(start, end) {
            Ok(events) => events,
            Err(e) => return ToolResult::error(format!("Error getting events: {}", e)),
        };
        match serde_json::to_string(&events) {
            Ok(json) => ToolResult::text(json),
            Err(e) => ToolResult::error(format!("Error getting events: {}", e)),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryEvents::default()))
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSource;

    impl EventSource for FailingSource {
        fn events_between(&self, _: SystemTime, _: SystemTime) -> Result<Vec<Event>, EventSourceError> {
            Err(EventSourceError("access denied".into()))
        }
    }

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn event(title: &str, start: u64, end: u64) -> Event {
        Event {
            identifier: None,
            title: title.into(),
            start,
            end,
        }
    }

    #[test]
    fn day_bounds_cover_utc_day() {
        let (start, end) = day_bounds(at(3 * SECONDS_PER_DAY + 4000));
        assert_eq!(start, at(3 * SECONDS_PER_DAY));
        assert_eq!(end, at(4 * SECONDS_PER_DAY));
    }

    #[test]
    fn list_describes_every_tool() {
        let list = ToolRegistry::default().list();
        assert_eq!(list["tools"][0]["name"], "get_events_today");
        assert_eq!(list["tools"][0]["inputSchema"]["type"], "object");
    }

    #[test]
    fn unknown_tool_is_error_result() {
        let result = ToolRegistry::default().call("make_coffee", &Value::Null);
        assert!(result.is_error);
        assert_eq!(
            result.content,
            vec![Content::Text { text: "Unknown tool: make_coffee".into() }]
        );
    }

    #[test]
    fn events_today_filters_other_days() {
        let day = 10 * SECONDS_PER_DAY;
        let source = InMemoryEvents::new(vec![
            event("standup", day + 100, day + 200),
            event("yesterday", day - 500, day - 100),
            event("overnight", day - 100, day + 100),
            event("tomorrow", day + SECONDS_PER_DAY, day + SECONDS_PER_DAY + 10),
        ]);
        let registry = ToolRegistry::new(Arc::new(source));

        let result = registry.call_at("get_events_today", &Value::Null, at(day + 1000));
        assert!(!result.is_error);
        let Content::Text { text } = &result.content[0];
        let events: Vec<Event> = serde_json::from_str(text).unwrap();
        let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["standup", "overnight"]);
    }

    #[test]
    fn store_failure_is_error_result() {
        let registry = ToolRegistry::new(Arc::new(FailingSource));
        let result = registry.call("get_events_today", &Value::Null);
        assert!(result.is_error);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "content": [{"type": "text", "text": "Error getting events: event store unavailable: access denied"}],
                "isError": true
            })
        );
    }
}
