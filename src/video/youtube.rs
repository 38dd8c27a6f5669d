//! YouTube source backed by yt-dlp.

use super::captions::{fetch_caption_lines, render_transcript, select_track, CaptionFormat};
use super::{parse_video_id, watch_url, LanguagePreference, VideoInfo, VideoRecord, VideoSource};
use crate::error::{Result, TldwError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Video source that reads metadata with `yt-dlp --dump-json` and downloads captions over HTTP.
pub struct YtDlpSource {
    http: reqwest::Client,
    binary: String,
}

impl YtDlpSource {
    pub fn new() -> Result<Self> {
        Self::with_binary("yt-dlp")
    }

    /// Use a specific yt-dlp executable.
    pub fn with_binary(binary: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            binary: binary.to_string(),
        })
    }

    /// Run yt-dlp and return its JSON description of the video.
    async fn dump_json(&self, video_id: &str) -> Result<Value> {
        let url = watch_url(video_id);

        let output = tokio::process::Command::new(&self.binary)
            .args([
                "--dump-json",
                "--skip-download",
                "--no-playlist",
                "--no-warnings",
                &url,
            ])
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TldwError::ToolNotFound(self.binary.clone())
                } else {
                    TldwError::VideoSource(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TldwError::VideoSource(format!(
                "Video {} not found or unavailable: {}",
                video_id,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| TldwError::VideoSource(format!("Failed to parse yt-dlp output: {}", e)))
    }
}

/// Map yt-dlp's JSON onto [`VideoInfo`].
pub(crate) fn parse_video_info(video_id: &str, json: &Value) -> VideoInfo {
    let publish_date = json["upload_date"].as_str().and_then(|date_str| {
        // yt-dlp returns date as YYYYMMDD
        chrono::NaiveDate::parse_from_str(date_str, "%Y%m%d")
            .ok()
            .map(|d| d.format("%Y-%m-%d").to_string())
    });

    VideoInfo {
        source: Some(video_id.to_string()),
        title: json["title"].as_str().map(str::to_string),
        description: json["description"].as_str().map(str::to_string),
        view_count: json["view_count"].as_u64(),
        thumbnail_url: json["thumbnail"].as_str().map(str::to_string),
        publish_date,
        length: json["duration"].as_f64().map(|d| d.round() as u64),
        author: json["channel"]
            .as_str()
            .or_else(|| json["uploader"].as_str())
            .map(str::to_string),
        extra: BTreeMap::new(),
    }
}

/// Read one of yt-dlp's track maps. Malformed formats are skipped one by one.
fn parse_tracks(json: &Value, field: &str) -> BTreeMap<String, Vec<CaptionFormat>> {
    let Some(map) = json.get(field).and_then(Value::as_object) else {
        return BTreeMap::new();
    };

    let mut tracks = BTreeMap::new();
    for (language, formats) in map {
        let Some(formats) = formats.as_array() else {
            warn!("Ignoring {} for {}: expected a list of formats", field, language);
            continue;
        };

        let parsed: Vec<CaptionFormat> = formats
            .iter()
            .filter_map(|format| match CaptionFormat::deserialize(format) {
                Ok(format) => Some(format),
                Err(e) => {
                    warn!("Skipping malformed {} format for {}: {}", field, language, e);
                    None
                }
            })
            .collect();

        if !parsed.is_empty() {
            tracks.insert(language.clone(), parsed);
        }
    }
    tracks
}

#[async_trait]
impl VideoSource for YtDlpSource {
    #[instrument(skip(self, languages))]
    async fn fetch(&self, link: &str, languages: &LanguagePreference) -> Result<VideoRecord> {
        let video_id = parse_video_id(link).ok_or_else(|| {
            TldwError::InvalidInput(format!(
                "Invalid YouTube video link: {}. Please make sure the link is correct.",
                link
            ))
        })?;

        info!("Fetching metadata for {}", video_id);
        let json = self.dump_json(&video_id).await?;
        let info = parse_video_info(&video_id, &json);

        let subtitles = parse_tracks(&json, "subtitles");
        let automatic = parse_tracks(&json, "automatic_captions");
        debug!(
            "{} subtitle tracks, {} automatic caption tracks",
            subtitles.len(),
            automatic.len()
        );

        let track = select_track(&subtitles, &automatic, languages).ok_or_else(|| {
            TldwError::VideoSource(format!(
                "No transcript available for {} in {:?}",
                video_id, languages.languages
            ))
        })?;
        info!(
            "Using {} captions ({}){}",
            if track.automatic { "automatic" } else { "manual" },
            track.language,
            track
                .translated_to
                .as_deref()
                .map(|t| format!(" translated to {}", t))
                .unwrap_or_default()
        );

        let lines = fetch_caption_lines(&self.http, &track).await?;

        Ok(VideoRecord::new(render_transcript(&lines), info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_video_info() {
        let json = serde_json::json!({
            "id": "dQw4w9WgXcQ",
            "title": "Never Gonna Give You Up",
            "description": "The official video",
            "view_count": 1500000000u64,
            "thumbnail": "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg",
            "upload_date": "20091025",
            "duration": 212.4,
            "uploader": "Rick Astley"
        });

        let info = parse_video_info("dQw4w9WgXcQ", &json);
        assert_eq!(info.source.as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(info.publish_date.as_deref(), Some("2009-10-25"));
        assert_eq!(info.length, Some(212));
        assert_eq!(info.view_count, Some(1_500_000_000));
        assert_eq!(info.author.as_deref(), Some("Rick Astley"));
    }

    #[test]
    fn test_parse_tracks() {
        let json = serde_json::json!({
            "subtitles": {
                "en": [{"ext": "json3", "url": "https://x/en"}, {"ext": "vtt", "url": "https://x/en.vtt", "name": "English"}]
            }
        });

        let subs = parse_tracks(&json, "subtitles");
        assert_eq!(subs["en"].len(), 2);
        assert!(parse_tracks(&json, "automatic_captions").is_empty());
    }

    #[test]
    fn test_parse_tracks_skips_malformed_formats() {
        let json = serde_json::json!({
            "automatic_captions": {
                "en": [{"ext": "json3"}, {"ext": "json3", "url": "https://x/en.json3"}],
                "de": [{"ext": "vtt"}],
                "fr": "not a list"
            }
        });

        let auto = parse_tracks(&json, "automatic_captions");
        assert_eq!(auto.len(), 1);
        assert_eq!(auto["en"].len(), 1);
        assert_eq!(auto["en"][0].url, "https://x/en.json3");
    }

    #[tokio::test]
    async fn test_invalid_link_rejected_before_spawning() {
        let source = YtDlpSource::with_binary("definitely-not-installed-yt-dlp").unwrap();
        let prefs = LanguagePreference {
            languages: vec!["en".into()],
            translation: None,
        };

        let err = source.fetch("https://vimeo.com/1", &prefs).await.unwrap_err();
        assert!(matches!(err, TldwError::InvalidInput(_)));

        let err = source.fetch("dQw4w9WgXcQ", &prefs).await.unwrap_err();
        assert!(matches!(err, TldwError::ToolNotFound(_)));
    }
}
