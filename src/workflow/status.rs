use serde::{Deserialize, Serialize};
use std::fmt;

/// A patient's clinical stage as the server reports it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Billing,
    Consultation,
    Lab,
    Done,
    /// A status string outside the clinical order (e.g. "registered"), kept as sent.
    Unrecognized(String),
}

/// Fixed clinical order. `Done` is terminal.
pub const STATUS_ORDER: [Status; 4] = [
    Status::Billing,
    Status::Consultation,
    Status::Lab,
    Status::Done,
];

impl Status {
    pub fn position(&self) -> Option<usize> {
        STATUS_ORDER.iter().position(|s| s == self)
    }

    pub fn is_final(&self) -> bool {
        *self == Status::Done
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::Billing => "Sent to Billing",
            Status::Consultation => "Doctor Consultation",
            Status::Lab => "Lab Requested",
            Status::Done => "Completed",
            Status::Unrecognized(_) => "Unknown",
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Status::Billing => "billing",
            Status::Consultation => "consultation",
            Status::Lab => "lab",
            Status::Done => "done",
            Status::Unrecognized(raw) => raw,
        }
    }

    // An empty string is how the server spells "not set yet".
    fn is_blank(&self) -> bool {
        matches!(self, Status::Unrecognized(raw) if raw.trim().is_empty())
    }
}

impl From<String> for Status {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "billing" => Status::Billing,
            "consultation" => Status::Consultation,
            "lab" => Status::Lab,
            "done" => Status::Done,
            _ => Status::Unrecognized(raw),
        }
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        match status {
            Status::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The one legal successor of `current`, or `None` when it is already final.
///
/// A missing or empty status counts as `Billing`. Any other status outside
/// the order sits before the first stage, so it moves to `Billing`.
pub fn next_status(current: Option<&Status>) -> Option<Status> {
    let current = match current {
        Some(status) if !status.is_blank() => status,
        _ => &Status::Billing,
    };
    if current.is_final() {
        return None;
    }

    let next = current.position().map_or(0, |idx| idx + 1);
    STATUS_ORDER.get(next).cloned()
}
