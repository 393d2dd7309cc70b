use serde_json::json;
use smsreply_events::EventBus;
use std::io::Write;
use std::sync::Mutex;

/// Event bus that writes every event as one JSON line.
pub struct JsonLinesEventBus<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesEventBus<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|p| p.into_inner())
    }
}

impl JsonLinesEventBus<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> EventBus for JsonLinesEventBus<W> {
    fn emit(&self, topic: &str, payload: serde_json::Value) {
        let line = json!({ "event": topic, "payload": payload });
        let mut out = self.out.lock().unwrap_or_else(|p| p.into_inner());
        if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            tracing::warn!(topic, error = %e, "failed to write event");
        }
    }
}
