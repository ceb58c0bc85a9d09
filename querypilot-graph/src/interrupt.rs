use serde::{Deserialize, Serialize};

use crate::ConfirmationType;

const APPROVALS: &[&str] = &["", "approve", "approved", "yes", "y", "ok", "okay", "lgtm"];

/// A human's answer to a confirmation checkpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HumanResponse {
    Approve,
    Revise(String),
}

impl HumanResponse {
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if APPROVALS
            .iter()
            .any(|word| trimmed.eq_ignore_ascii_case(word))
        {
            HumanResponse::Approve
        } else {
            HumanResponse::Revise(trimmed.to_string())
        }
    }

    pub fn guidance(&self) -> Option<&str> {
        match self {
            HumanResponse::Approve => None,
            HumanResponse::Revise(text) => Some(text),
        }
    }
}

impl From<&str> for HumanResponse {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl From<String> for HumanResponse {
    fn from(text: String) -> Self {
        Self::parse(&text)
    }
}

/// What a paused turn is waiting for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interrupt {
    pub session_id: String,
    pub confirmation: ConfirmationType,
    pub prompt: String,
}
