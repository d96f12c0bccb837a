use serde::{Deserialize, Deserializer, Serialize};

/// Sidebar labels are cut to this many characters.
const TITLE_DISPLAY_CHARS: usize = 25;

pub type ChatId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(deserialize_with = "chat_id_from_json")]
    pub id: ChatId,
    #[serde(default)]
    pub title: String,
}

impl Conversation {
    pub fn display_title(&self) -> String {
        if self.title.chars().count() > TITLE_DISPLAY_CHARS {
            let cut: String = self.title.chars().take(TITLE_DISPLAY_CHARS).collect();
            format!("{}...", cut)
        } else {
            self.title.clone()
        }
    }
}

/// Chat ids come back as JSON numbers from some endpoints and as numeric
/// strings (session ids) from others.
pub fn chat_id_from_json<'de, D>(deserializer: D) -> Result<ChatId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(i64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Int(id) => Ok(id),
        RawId::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("chat id is not an integer: {}", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_accepts_number_or_string() {
        let a: Conversation = serde_json::from_str(r#"{"id": 7, "title": "A"}"#).unwrap();
        let b: Conversation = serde_json::from_str(r#"{"id": "8", "title": "B"}"#).unwrap();
        assert_eq!(a.id, 7);
        assert_eq!(b.id, 8);
        assert!(serde_json::from_str::<Conversation>(r#"{"id": "abc"}"#).is_err());
    }

    #[test]
    fn test_display_title_truncates_long_titles() {
        let conv = Conversation {
            id: 1,
            title: "Quarterly planning notes for the platform team".to_string(),
        };
        assert_eq!(conv.display_title(), "Quarterly planning notes ...");

        let short = Conversation {
            id: 2,
            title: "New Chat".to_string(),
        };
        assert_eq!(short.display_title(), "New Chat");
    }
}
