use serde::{Deserialize, Serialize};

use crate::config::GREETING;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

impl Role {
    /// Maps a history role tag onto a `Role`, ignoring case.
    ///
    /// The backend writes `user`/`agent`, but older histories carry the
    /// message-type names (`human`, `ai`) or `assistant`.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" | "human" => Some(Role::User),
            "agent" | "ai" | "assistant" => Some(Role::Agent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            content: content.into(),
        }
    }

    pub fn greeting() -> Self {
        Self::agent(GREETING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_wire_is_case_insensitive() {
        assert_eq!(Role::from_wire("User"), Some(Role::User));
        assert_eq!(Role::from_wire("HUMAN"), Some(Role::User));
        assert_eq!(Role::from_wire("Agent"), Some(Role::Agent));
        assert_eq!(Role::from_wire("ai"), Some(Role::Agent));
        assert_eq!(Role::from_wire("system"), None);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::agent("hi")).unwrap();
        assert_eq!(json, r#"{"role":"agent","content":"hi"}"#);
    }
}
