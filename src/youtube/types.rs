use serde::Deserialize;

/// One video listed from a playlist.
///
/// `playlist_item_id` identifies the membership row in that specific
/// playlist (the handle deletion needs); `video_id` identifies the media
/// itself (the handle insertion needs). Values live for one processing
/// cycle — every cycle re-fetches from the remote source of truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistVideo {
    pub playlist_item_id: String,
    pub video_id: String,
    pub title: String,
    pub video_url: String,
}

impl PlaylistVideo {
    pub fn new(playlist_item_id: String, video_id: String, title: String) -> Self {
        let video_url = format!("https://www.youtube.com/watch?v={}", video_id);
        Self {
            playlist_item_id,
            video_id,
            title,
            video_url,
        }
    }
}

/// Wire shape of one `playlistItems.list` page.
#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistItemsPage {
    #[serde(default)]
    pub items: Vec<PlaylistItemResource>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistItemResource {
    pub id: String,
    pub snippet: Snippet,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Snippet {
    pub title: String,
    #[serde(rename = "resourceId")]
    pub resource_id: ResourceId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResourceId {
    #[serde(rename = "videoId")]
    pub video_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_url_derived_from_video_id() {
        let v = PlaylistVideo::new("pli1".into(), "abc123".into(), "Title".into());
        assert_eq!(v.video_url, "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn test_page_deserializes_api_shape() {
        let raw = r#"{
            "items": [
                {"id": "pli1", "snippet": {"title": "First", "resourceId": {"videoId": "v1"}}}
            ],
            "nextPageToken": "tok2"
        }"#;
        let page: PlaylistItemsPage = serde_json::from_str(raw).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].snippet.resource_id.video_id, "v1");
        assert_eq!(page.next_page_token.as_deref(), Some("tok2"));
    }

    #[test]
    fn test_page_tolerates_missing_items() {
        let page: PlaylistItemsPage = serde_json::from_str("{}").unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_page_token.is_none());
    }
}
