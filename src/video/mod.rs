//! Video metadata and transcript retrieval.
//!
//! A [`VideoSource`] turns a YouTube link into a [`VideoRecord`]: the
//! timestamped transcript plus the video's descriptive fields. The record is
//! what gets stringified into the summary query and stored in examples.

mod captions;
mod youtube;

pub use captions::{
    fetch_caption_lines, parse_json3, render_transcript, select_track, CaptionFormat, CaptionLine,
    CaptionTrack,
};
pub use youtube::YtDlpSource;

use crate::config::YoutubeSettings;
use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use url::Url;

/// Descriptive fields of a video.
///
/// Field names match the records written by earlier versions of the example
/// store, so existing files load unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Video ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Publication date, `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,
    /// Length in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    /// Channel name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Fields we don't know about; kept on rewrite, never rendered.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A video's transcript and information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    /// Transcript text, one `[mm:ss] text` line per caption.
    #[serde(rename = "page_content")]
    pub transcript: String,
    #[serde(rename = "metadata", default)]
    pub info: VideoInfo,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl VideoRecord {
    pub fn new(transcript: String, info: VideoInfo) -> Self {
        Self {
            transcript,
            info,
            extra: BTreeMap::new(),
        }
    }

    /// Render the record as prompt/embedding text.
    ///
    /// Field order is fixed and absent fields are skipped, so the same record
    /// always renders to the same string.
    pub fn to_text(&self) -> String {
        let info = &self.info;
        let mut lines = Vec::new();

        if let Some(title) = &info.title {
            lines.push(format!("Title: {}", title));
        }
        if let Some(author) = &info.author {
            lines.push(format!("Author: {}", author));
        }
        if let Some(date) = &info.publish_date {
            lines.push(format!("Published: {}", date));
        }
        if let Some(length) = info.length {
            lines.push(format!("Length: {}", format_timestamp(length as f64)));
        }
        if let Some(views) = info.view_count {
            lines.push(format!("Views: {}", views));
        }
        if let Some(source) = &info.source {
            lines.push(format!("Source: {}", watch_url(source)));
        }
        if let Some(thumbnail) = &info.thumbnail_url {
            lines.push(format!("Thumbnail: {}", thumbnail));
        }
        if let Some(description) = info.description.as_deref().filter(|d| !d.trim().is_empty()) {
            lines.push(format!("Description: {}", description.trim()));
        }

        let mut text = lines.join("\n");
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        text.push_str("Transcript:\n");
        text.push_str(self.transcript.trim_end());
        text
    }
}

/// Caption language preference with optional translation target.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguagePreference {
    pub languages: Vec<String>,
    pub translation: Option<String>,
}

impl From<&YoutubeSettings> for LanguagePreference {
    fn from(settings: &YoutubeSettings) -> Self {
        Self {
            languages: settings.languages.clone(),
            translation: settings.translation.clone().filter(|t| !t.is_empty()),
        }
    }
}

/// Trait for video metadata/transcript providers.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Fetch the transcript and information for a video link.
    async fn fetch(&self, link: &str, languages: &LanguagePreference) -> Result<VideoRecord>;
}

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("valid regex"))
}

/// Extract the video ID from a YouTube URL or a bare ID.
pub fn parse_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if video_id_regex().is_match(input) {
        return Some(input.to_string());
    }

    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };
    let url = Url::parse(&with_scheme).ok()?;
    let host = url.host_str()?;
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .or_else(|| host.strip_prefix("music."))
        .unwrap_or(host);

    let candidate = match host {
        "youtu.be" => url.path_segments()?.next().map(str::to_string),
        "youtube.com" | "youtube-nocookie.com" => {
            let mut segments = url.path_segments()?;
            match segments.next() {
                Some("watch") => url
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned()),
                Some("embed" | "v" | "shorts" | "live") => segments.next().map(str::to_string),
                _ => None,
            }
        }
        _ => None,
    }?;

    video_id_regex().is_match(&candidate).then_some(candidate)
}

/// Canonical watch URL for a video ID.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Format seconds as MM:SS or HH:MM:SS.
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_video_id() {
        let id = Some("dQw4w9WgXcQ".to_string());
        assert_eq!(parse_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), id);
        assert_eq!(parse_video_id("https://youtu.be/dQw4w9WgXcQ?t=30"), id);
        assert_eq!(parse_video_id("https://youtube.com/embed/dQw4w9WgXcQ"), id);
        assert_eq!(parse_video_id("https://www.youtube.com/shorts/dQw4w9WgXcQ"), id);
        assert_eq!(parse_video_id("https://m.youtube.com/watch?feature=share&v=dQw4w9WgXcQ"), id);
        assert_eq!(parse_video_id("youtube.com/watch?v=dQw4w9WgXcQ"), id);
        assert_eq!(parse_video_id("  dQw4w9WgXcQ "), id);

        assert_eq!(parse_video_id("not-a-video-id"), None);
        assert_eq!(parse_video_id("https://vimeo.com/123456789"), None);
        assert_eq!(parse_video_id("https://www.youtube.com/playlist?list=PLx"), None);
        assert_eq!(parse_video_id(""), None);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(125.0), "02:05");
        assert_eq!(format_timestamp(3725.0), "01:02:05");
    }

    #[test]
    fn test_record_text_is_stable() {
        let info = VideoInfo {
            source: Some("dQw4w9WgXcQ".into()),
            title: Some("Never Gonna".into()),
            author: Some("Rick".into()),
            length: Some(212),
            view_count: Some(42),
            thumbnail_url: Some("https://i.ytimg.com/vi/dQw4w9WgXcQ/hq.jpg".into()),
            ..Default::default()
        };
        let record = VideoRecord::new("[00:00] hello\n[00:05] world\n".into(), info);

        let text = record.to_text();
        assert_eq!(
            text,
            "Title: Never Gonna\nAuthor: Rick\nLength: 03:32\nViews: 42\n\
             Source: https://www.youtube.com/watch?v=dQw4w9WgXcQ\n\
             Thumbnail: https://i.ytimg.com/vi/dQw4w9WgXcQ/hq.jpg\n\n\
             Transcript:\n[00:00] hello\n[00:05] world"
        );
        assert_eq!(text, record.clone().to_text());
    }

    #[test]
    fn test_record_keeps_unknown_fields() {
        let json = serde_json::json!({
            "page_content": "words",
            "metadata": {"title": "T", "length": 10, "category": "music"},
            "type": "Document"
        });
        let record: VideoRecord = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(record.info.title.as_deref(), Some("T"));
        assert_eq!(record.info.extra["category"], "music");
        assert_eq!(serde_json::to_value(&record).unwrap(), json);
        assert!(!record.to_text().contains("music"));
    }
}
