use std::collections::BTreeMap;
use std::fmt;

/// Field name prefix under which channel variables are stored
pub const CHAN_VARIABLE: &str = "ChanVariable";

/// One decoded AMI message
///
/// Immutable once built. Channel variables reported as repeated
/// `ChanVariable: NAME=value` lines are stored under `ChanVariable(NAME)` so
/// they survive alongside each other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmiEvent {
    fields: BTreeMap<String, String>,
}

impl AmiEvent {
    /// Parse one message block (without the terminating blank line).
    ///
    /// Lines without a `:` separator are ignored. When a plain key repeats,
    /// the last value wins.
    pub fn parse(block: &str) -> Self {
        let mut fields = BTreeMap::new();

        for line in block.lines() {
            let line = line.trim_end_matches('\r');
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() {
                continue;
            }

            // `ChanVariable: NAME=value` and legacy `ChanVariable(chan): NAME=value`
            if key == CHAN_VARIABLE || key.starts_with("ChanVariable(") {
                if let Some((name, var)) = value.split_once('=') {
                    fields.insert(variable_key(name.trim()), var.trim().to_string());
                    continue;
                }
            }

            fields.insert(key.to_string(), value.to_string());
        }

        Self { fields }
    }

    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Raw field value
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Channel variable value
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.field(&variable_key(name))
    }

    pub fn event_name(&self) -> Option<&str> {
        self.field("Event")
    }

    pub fn is_event(&self, name: &str) -> bool {
        self.event_name().map_or(false, |n| n.eq_ignore_ascii_case(name))
    }

    /// `Response` field of an action reply
    pub fn response(&self) -> Option<&str> {
        self.field("Response")
    }

    pub fn action_id(&self) -> Option<&str> {
        self.field("ActionID")
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for AmiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.event_name(), self.response()) {
            (Some(name), _) => write!(f, "Event {}", name),
            (None, Some(response)) => write!(f, "Response {}", response),
            (None, None) => write!(f, "Message ({} fields)", self.fields.len()),
        }
    }
}

fn variable_key(name: &str) -> String {
    format!("{}({})", CHAN_VARIABLE, name)
}
