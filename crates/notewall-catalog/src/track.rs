use serde::{Deserialize, Serialize};

/// Album art wider than this is skipped in favour of a smaller rendition.
const MAX_ART_WIDTH: u32 = 300;

const TRACK_URL_MARKER: &str = "open.spotify.com/track/";
const TRACK_URI_MARKER: &str = "spotify:track:";
const BARE_ID_LEN: usize = 22;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiImage {
    pub url: String,
    pub width: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiArtist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiAlbum {
    pub name: String,
    #[serde(default)]
    pub images: Vec<ApiImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiExternalUrls {
    #[serde(default)]
    pub spotify: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ApiArtist>,
    pub album: ApiAlbum,
    pub preview_url: Option<String>,
    pub external_urls: ApiExternalUrls,
    pub duration_ms: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiTrackPage {
    #[serde(default)]
    pub items: Vec<ApiTrack>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiSearchResponse {
    pub tracks: Option<ApiTrackPage>,
}

/// Track summary handed to the web client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResult {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub album_name: String,
    pub album_art: Option<String>,
    pub preview_url: Option<String>,
    pub external_url: String,
    pub duration_ms: u64,
}

impl From<ApiTrack> for TrackResult {
    fn from(track: ApiTrack) -> Self {
        let album_art = track
            .album
            .images
            .iter()
            .find(|i| i.width.is_some_and(|w| w > 0 && w <= MAX_ART_WIDTH))
            .or_else(|| track.album.images.first())
            .map(|i| i.url.clone());

        let artist = track
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            id: track.id,
            name: track.name,
            artist,
            album_name: track.album.name,
            album_art,
            preview_url: track.preview_url,
            external_url: track.external_urls.spotify,
            duration_ms: track.duration_ms,
        }
    }
}

/// Pull a track id out of a share URL, a `spotify:track:` URI, or a bare
/// 22-character id.
pub fn extract_track_id(input: &str) -> Option<String> {
    for marker in [TRACK_URL_MARKER, TRACK_URI_MARKER] {
        if let Some(pos) = input.find(marker) {
            let id: String = input[pos + marker.len()..]
                .chars()
                .take_while(char::is_ascii_alphanumeric)
                .collect();
            if !id.is_empty() {
                return Some(id);
            }
        }
    }

    let trimmed = input.trim();
    if trimmed.len() == BARE_ID_LEN && trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Some(trimmed.to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(url: &str, width: Option<u32>) -> ApiImage {
        ApiImage { url: url.into(), width }
    }

    fn track(images: Vec<ApiImage>) -> ApiTrack {
        ApiTrack {
            id: "6rqhFgbbKwnb9MLmUQDhG6".into(),
            name: "Song".into(),
            artists: vec![ApiArtist { name: "A".into() }, ApiArtist { name: "B".into() }],
            album: ApiAlbum { name: "Album".into(), images },
            preview_url: None,
            external_urls: ApiExternalUrls { spotify: "https://open.spotify.com/track/x".into() },
            duration_ms: 180_000,
        }
    }

    #[test]
    fn test_extract_from_url() {
        assert_eq!(
            extract_track_id("https://open.spotify.com/track/6rqhFgbbKwnb9MLmUQDhG6?si=abc").as_deref(),
            Some("6rqhFgbbKwnb9MLmUQDhG6")
        );
    }

    #[test]
    fn test_extract_from_uri() {
        assert_eq!(
            extract_track_id("spotify:track:6rqhFgbbKwnb9MLmUQDhG6").as_deref(),
            Some("6rqhFgbbKwnb9MLmUQDhG6")
        );
    }

    #[test]
    fn test_extract_bare_id() {
        assert_eq!(
            extract_track_id("  6rqhFgbbKwnb9MLmUQDhG6 ").as_deref(),
            Some("6rqhFgbbKwnb9MLmUQDhG6")
        );
        assert_eq!(extract_track_id("6rqhFgbbKwnb9MLmUQDhG"), None); // 21 chars
        assert_eq!(extract_track_id("6rqhFgbbKwnb9MLmUQ-hG6"), None);
        assert_eq!(extract_track_id("https://open.spotify.com/track/"), None);
        assert_eq!(extract_track_id(""), None);
    }

    #[test]
    fn test_album_art_prefers_small_image() {
        let t = track(vec![
            image("large", Some(640)),
            image("medium", Some(300)),
            image("small", Some(64)),
        ]);
        assert_eq!(TrackResult::from(t).album_art.as_deref(), Some("medium"));
    }

    #[test]
    fn test_album_art_falls_back_to_first() {
        let t = track(vec![image("large", Some(640)), image("unknown", None)]);
        assert_eq!(TrackResult::from(t).album_art.as_deref(), Some("large"));
        assert_eq!(TrackResult::from(track(vec![])).album_art, None);
    }

    #[test]
    fn test_artists_joined() {
        assert_eq!(TrackResult::from(track(vec![])).artist, "A, B");
    }
}
