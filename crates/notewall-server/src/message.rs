//! Notes on the wall and the rules for accepting new ones.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const MAX_MESSAGE_CHARS: usize = 500;
pub const MAX_NAME_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteColor {
    Pink,
    Yellow,
    Lavender,
    Blue,
    Green,
    Red,
}

impl NoteColor {
    pub const ALL: [NoteColor; 6] = [
        NoteColor::Pink,
        NoteColor::Yellow,
        NoteColor::Lavender,
        NoteColor::Blue,
        NoteColor::Green,
        NoteColor::Red,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pink => "pink",
            Self::Yellow => "yellow",
            Self::Lavender => "lavender",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Red => "red",
        }
    }
}

impl fmt::Display for NoteColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteColor {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or(ValidationError::InvalidColor)
    }
}

/// A stored note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub message: String,
    pub from_name: String,
    pub to_name: Option<String>,
    pub color: NoteColor,
    pub track_id: Option<String>,
    pub track_name: Option<String>,
    pub artist_name: Option<String>,
    pub album_art: Option<String>,
    /// Identity of the visitor who posted it; the only key for deletion.
    pub visitor_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A validated note waiting to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub message: String,
    pub from_name: String,
    pub to_name: Option<String>,
    pub color: NoteColor,
    pub track_id: Option<String>,
    pub track_name: Option<String>,
    pub artist_name: Option<String>,
    pub album_art: Option<String>,
    pub visitor_id: String,
}

impl NewMessage {
    /// Give the note an id and timestamp.
    pub fn into_message(self) -> Message {
        Message {
            id: Uuid::new_v4(),
            message: self.message,
            from_name: self.from_name,
            to_name: self.to_name,
            color: self.color,
            track_id: self.track_id,
            track_name: self.track_name,
            artist_name: self.artist_name,
            album_art: self.album_art,
            visitor_id: Some(self.visitor_id),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Message is required")]
    MissingMessage,
    #[error("from_name is required")]
    MissingFromName,
    #[error("color must be one of: pink, yellow, lavender, blue, green, red")]
    InvalidColor,
    #[error("Message must be 500 characters or fewer")]
    MessageTooLong,
    #[error("Name must be 50 characters or fewer")]
    NameTooLong,
}

/// Body of `POST /api/messages`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostMessageRequest {
    pub message: Option<String>,
    pub from_name: Option<String>,
    pub to_name: Option<String>,
    pub color: Option<String>,
    #[serde(alias = "spotify_track_id")]
    pub track_id: Option<String>,
    #[serde(alias = "spotify_track_name")]
    pub track_name: Option<String>,
    #[serde(alias = "spotify_artist_name")]
    pub artist_name: Option<String>,
    #[serde(alias = "spotify_album_art")]
    pub album_art: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl PostMessageRequest {
    /// Check the request and normalise it into a note owned by `visitor_id`.
    pub fn validate(self, visitor_id: &str) -> Result<NewMessage, ValidationError> {
        let message = non_blank(self.message).ok_or(ValidationError::MissingMessage)?;
        let from_name = non_blank(self.from_name).ok_or(ValidationError::MissingFromName)?;
        let color = self
            .color
            .as_deref()
            .ok_or(ValidationError::InvalidColor)?
            .parse::<NoteColor>()?;

        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ValidationError::MessageTooLong);
        }
        if from_name.chars().count() > MAX_NAME_CHARS {
            return Err(ValidationError::NameTooLong);
        }

        Ok(NewMessage {
            message,
            from_name,
            to_name: non_blank(self.to_name),
            color,
            track_id: non_empty(self.track_id),
            track_name: non_empty(self.track_name),
            artist_name: non_empty(self.artist_name),
            album_art: non_empty(self.album_art),
            visitor_id: visitor_id.to_string(),
        })
    }
}

/// A note as listed to a particular visitor.
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub is_own: bool,
}

impl MessageView {
    pub fn for_visitor(message: Message, visitor: Option<&str>) -> Self {
        let is_own = matches!(
            (visitor, message.visitor_id.as_deref()),
            (Some(v), Some(owner)) if v == owner
        );
        Self { message, is_own }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PostMessageRequest {
        PostMessageRequest {
            message: Some("  be mine  ".into()),
            from_name: Some(" Ana ".into()),
            color: Some("pink".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_request_is_trimmed() {
        let new = request().validate("visitor").unwrap();
        assert_eq!(new.message, "be mine");
        assert_eq!(new.from_name, "Ana");
        assert_eq!(new.color, NoteColor::Pink);
        assert_eq!(new.to_name, None);
        assert_eq!(new.visitor_id, "visitor");
    }

    #[test]
    fn test_missing_fields() {
        let mut r = request();
        r.message = Some("   ".into());
        assert_eq!(r.validate("v"), Err(ValidationError::MissingMessage));

        let mut r = request();
        r.from_name = None;
        assert_eq!(r.validate("v"), Err(ValidationError::MissingFromName));

        let mut r = request();
        r.color = None;
        assert_eq!(r.validate("v"), Err(ValidationError::InvalidColor));

        let mut r = request();
        r.color = Some("Pink".into());
        assert_eq!(r.validate("v"), Err(ValidationError::InvalidColor));
    }

    #[test]
    fn test_length_limits_count_characters() {
        let mut r = request();
        r.message = Some("❤".repeat(MAX_MESSAGE_CHARS));
        assert!(r.validate("v").is_ok());

        let mut r = request();
        r.message = Some("x".repeat(MAX_MESSAGE_CHARS + 1));
        assert_eq!(r.validate("v"), Err(ValidationError::MessageTooLong));

        let mut r = request();
        r.from_name = Some("n".repeat(MAX_NAME_CHARS + 1));
        assert_eq!(r.validate("v"), Err(ValidationError::NameTooLong));
    }

    #[test]
    fn test_optional_fields_normalised() {
        let mut r = request();
        r.to_name = Some("  ".into());
        r.track_id = Some(String::new());
        r.track_name = Some("Song".into());
        let new = r.validate("v").unwrap();
        assert_eq!(new.to_name, None);
        assert_eq!(new.track_id, None);
        assert_eq!(new.track_name.as_deref(), Some("Song"));
    }

    #[test]
    fn test_color_roundtrip_names() {
        for c in NoteColor::ALL {
            assert_eq!(c.as_str().parse::<NoteColor>().unwrap(), c);
            assert_eq!(serde_json::to_value(c).unwrap(), c.as_str());
        }
    }

    #[test]
    fn test_catalog_field_aliases() {
        let r: PostMessageRequest = serde_json::from_value(serde_json::json!({
            "message": "hi",
            "from_name": "Ana",
            "color": "red",
            "spotify_track_id": "6rqhFgbbKwnb9MLmUQDhG6",
            "spotify_artist_name": "Elvis Presley"
        }))
        .unwrap();
        let new = r.validate("v").unwrap();
        assert_eq!(new.track_id.as_deref(), Some("6rqhFgbbKwnb9MLmUQDhG6"));
        assert_eq!(new.artist_name.as_deref(), Some("Elvis Presley"));
    }

    #[test]
    fn test_view_marks_own_messages() {
        let m = request().validate("me").unwrap().into_message();
        assert!(MessageView::for_visitor(m.clone(), Some("me")).is_own);
        assert!(!MessageView::for_visitor(m.clone(), Some("you")).is_own);
        assert!(!MessageView::for_visitor(m.clone(), None).is_own);

        let json = serde_json::to_value(MessageView::for_visitor(m, Some("me"))).unwrap();
        assert_eq!(json["is_own"], true);
        assert_eq!(json["from_name"], "Ana");
        assert_eq!(json["color"], "pink");
    }
}
