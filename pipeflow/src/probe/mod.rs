//! Introspection of pipeline topology.
//!
//! Every pipe-like component implements [`Probe`] and describes itself into
//! a [`ProbeContext`]: a named node carrying properties and child nodes.
//! [`ProbeExt::get_probe_result`] captures a whole topology into a
//! [`ProbeResult`] that renders as JSON.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// The introspection contract implemented by every component.
pub trait Probe {
    /// Describes this component (and its connected children) into `ctx`.
    fn probe(&self, ctx: &mut ProbeContext);
}

/// A node in the probe tree: a name, a property map, and child nodes.
#[derive(Debug, Clone, Default)]
pub struct ProbeContext {
    name: String,
    properties: serde_json::Map<String, Value>,
    children: Vec<ProbeContext>,
}

impl ProbeContext {
    /// Creates a new named node.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: serde_json::Map::new(),
            children: Vec::new(),
        }
    }

    /// Returns the node name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets a property on this node.
    ///
    /// Values that cannot be serialized render as `null`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Serialize) {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.properties.insert(key.into(), value);
    }

    /// Adds a child node and returns it for the caller to fill in.
    pub fn scope(&mut self, name: impl Into<String>) -> &mut Self {
        self.children.push(Self::new(name));
        match self.children.last_mut() {
            Some(child) => child,
            None => unreachable!("child just pushed"),
        }
    }

    /// Renders the node as a JSON value.
    ///
    /// Properties become object entries; children nest under their names,
    /// with repeated names collapsing into an array.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut object = self.properties.clone();

        let mut grouped: Vec<(String, Vec<Value>)> = Vec::new();
        for child in &self.children {
            let rendered = child.to_value();
            if let Some((_, values)) = grouped.iter_mut().find(|(name, _)| name == &child.name) {
                values.push(rendered);
            } else {
                grouped.push((child.name.clone(), vec![rendered]));
            }
        }

        for (name, mut values) in grouped {
            let value = if values.len() == 1 {
                values.remove(0)
            } else {
                Value::Array(values)
            };
            object.insert(name, value);
        }

        Value::Object(object)
    }
}

/// Host details captured alongside a probe result.
#[derive(Debug, Clone, Serialize)]
pub struct HostInfo {
    /// Operating system family.
    pub os: String,
    /// Process identifier.
    pub process_id: u32,
}

impl HostInfo {
    /// Captures the current host details.
    #[must_use]
    pub fn capture() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            process_id: std::process::id(),
        }
    }
}

/// A captured snapshot of a component topology.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    /// Unique identifier of this capture.
    pub result_id: Uuid,
    /// When the capture started.
    pub started_at: DateTime<Utc>,
    /// How long the capture took.
    pub duration: Duration,
    /// Host details at capture time.
    pub host: HostInfo,
    /// The rendered topology.
    pub results: Value,
}

impl ProbeResult {
    /// Renders the result as a pretty-printed JSON string.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Capture extension available on every [`Probe`] implementation.
pub trait ProbeExt: Probe {
    /// Captures this component's topology into a [`ProbeResult`].
    fn get_probe_result(&self) -> ProbeResult {
        let started_at = Utc::now();
        let capture_start = Instant::now();

        let mut root = ProbeContext::new("probeResult");
        self.probe(&mut root);

        ProbeResult {
            result_id: Uuid::new_v4(),
            started_at,
            duration: capture_start.elapsed(),
            host: HostInfo::capture(),
            results: root.to_value(),
        }
    }
}

impl<P: Probe + ?Sized> ProbeExt for P {}
