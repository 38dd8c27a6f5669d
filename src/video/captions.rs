//! Caption track selection and parsing.

use super::{format_timestamp, LanguagePreference};
use crate::error::{Result, TldwError};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Fallback language when none of the preferred ones is available.
const FALLBACK_LANGUAGE: &str = "en";

/// One downloadable format of a caption track, as listed by yt-dlp.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptionFormat {
    pub ext: String,
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// The caption track chosen for a video.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    /// Language code of the track as published.
    pub language: String,
    /// Download URL (json3), including any translation parameter.
    pub url: String,
    /// Whether the track is YouTube's automatic speech recognition.
    pub automatic: bool,
    /// Language the captions are translated into, if any.
    pub translated_to: Option<String>,
}

/// A single timed caption line.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionLine {
    pub start_seconds: f64,
    pub text: String,
}

type TrackMap = BTreeMap<String, Vec<CaptionFormat>>;

fn json3_url(formats: &[CaptionFormat]) -> Option<&str> {
    formats
        .iter()
        .find(|f| f.ext == "json3")
        .map(|f| f.url.as_str())
}

/// Find a track for `language`: exact code first, then a regional variant (`en` -> `en-US`).
fn find_language<'a>(tracks: &'a TrackMap, language: &str) -> Option<(&'a str, &'a str)> {
    if let Some((code, formats)) = tracks.get_key_value(language) {
        if let Some(url) = json3_url(formats) {
            return Some((code.as_str(), url));
        }
    }
    let prefix = format!("{}-", language);
    tracks
        .iter()
        .filter(|(code, _)| code.starts_with(&prefix) && !code.ends_with("-orig"))
        .find_map(|(code, formats)| json3_url(formats).map(|url| (code.as_str(), url)))
}

/// Choose a caption track.
///
/// Manual subtitles in preference order, then automatic captions in
/// preference order, then English, then (only when a translation target is
/// set) any remaining track. If the chosen track is not already in the
/// translation language, YouTube is asked to translate it.
pub fn select_track(
    subtitles: &TrackMap,
    automatic: &TrackMap,
    prefs: &LanguagePreference,
) -> Option<CaptionTrack> {
    let mut wanted: Vec<&str> = prefs.languages.iter().map(String::as_str).collect();
    if !wanted.contains(&FALLBACK_LANGUAGE) {
        wanted.push(FALLBACK_LANGUAGE);
    }

    let found = find_preferred(subtitles, &wanted)
        .map(|(code, url)| (code, url, false))
        .or_else(|| find_preferred(automatic, &wanted).map(|(code, url)| (code, url, true)))
        .or_else(|| {
            prefs.translation.as_ref()?;
            subtitles
                .iter()
                .find_map(|(code, f)| json3_url(f).map(|url| (code.as_str(), url, false)))
                .or_else(|| {
                    automatic
                        .iter()
                        .filter(|(code, _)| code.ends_with("-orig"))
                        .find_map(|(code, f)| json3_url(f).map(|url| (code.as_str(), url, true)))
                })
        })?;

    let (code, url, is_automatic) = found;
    let language = code.trim_end_matches("-orig").to_string();

    let translated_to = prefs
        .translation
        .as_ref()
        .filter(|target| !same_language(&language, target))
        .cloned();

    let url = match &translated_to {
        Some(target) => {
            let sep = if url.contains('?') { '&' } else { '?' };
            format!("{}{}tlang={}", url, sep, target)
        }
        None => url.to_string(),
    };

    Some(CaptionTrack {
        language,
        url,
        automatic: is_automatic,
        translated_to,
    })
}

fn find_preferred<'a>(tracks: &'a TrackMap, wanted: &[&str]) -> Option<(&'a str, &'a str)> {
    wanted.iter().find_map(|lang| find_language(tracks, lang))
}

fn same_language(a: &str, b: &str) -> bool {
    let base = |s: &str| s.split('-').next().unwrap_or(s).to_lowercase();
    base(a) == base(b)
}

#[derive(Debug, Deserialize)]
struct Json3 {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    segs: Vec<Json3Segment>,
}

#[derive(Debug, Deserialize)]
struct Json3Segment {
    #[serde(default)]
    utf8: String,
}

/// Parse YouTube's json3 caption format into timed lines.
///
/// Events without text (window definitions, bare newlines) are dropped.
pub fn parse_json3(body: &str) -> Result<Vec<CaptionLine>> {
    let parsed: Json3 = serde_json::from_str(body)?;

    Ok(parsed
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs.iter().map(|s| s.utf8.as_str()).collect();
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            (!text.is_empty()).then(|| CaptionLine {
                start_seconds: event.t_start_ms as f64 / 1000.0,
                text,
            })
        })
        .collect())
}

/// Render caption lines as `[mm:ss] text`, one per line.
pub fn render_transcript(lines: &[CaptionLine]) -> String {
    lines
        .iter()
        .map(|l| format!("[{}] {}", format_timestamp(l.start_seconds), l.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Download a caption track and parse it.
#[instrument(skip(client, track), fields(language = %track.language, automatic = track.automatic))]
pub async fn fetch_caption_lines(
    client: &reqwest::Client,
    track: &CaptionTrack,
) -> Result<Vec<CaptionLine>> {
    let response = client.get(&track.url).send().await?;

    if !response.status().is_success() {
        return Err(TldwError::VideoSource(format!(
            "Caption download failed with status {}",
            response.status()
        )));
    }

    let body = response.text().await?;
    let lines = parse_json3(&body)?;
    debug!("Parsed {} caption lines", lines.len());

    if lines.is_empty() {
        return Err(TldwError::VideoSource("Caption track is empty".to_string()));
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tracks(entries: &[(&str, &str)]) -> TrackMap {
        entries
            .iter()
            .map(|(lang, url)| {
                (
                    lang.to_string(),
                    vec![
                        CaptionFormat { ext: "vtt".into(), url: format!("{}&fmt=vtt", url), name: None },
                        CaptionFormat { ext: "json3".into(), url: url.to_string(), name: None },
                    ],
                )
            })
            .collect()
    }

    fn prefs(languages: &[&str], translation: Option<&str>) -> LanguagePreference {
        LanguagePreference {
            languages: languages.iter().map(|s| s.to_string()).collect(),
            translation: translation.map(str::to_string),
        }
    }

    #[test]
    fn test_manual_subtitles_win() {
        let subs = tracks(&[("zh", "https://x/zh?a=1"), ("en", "https://x/en?a=1")]);
        let auto = tracks(&[("en", "https://x/auto-en?a=1")]);

        let track = select_track(&subs, &auto, &prefs(&["en", "zh"], Some("en"))).unwrap();
        assert_eq!(track.language, "en");
        assert!(!track.automatic);
        assert_eq!(track.url, "https://x/en?a=1");
        assert_eq!(track.translated_to, None);
    }

    #[test]
    fn test_automatic_when_no_manual_match() {
        let subs = tracks(&[("de", "https://x/de?a=1")]);
        let auto = tracks(&[("en-orig", "https://x/en-orig?a=1"), ("en-GB", "https://x/en-gb?a=1")]);

        let track = select_track(&subs, &auto, &prefs(&["en"], None)).unwrap();
        assert!(track.automatic);
        assert_eq!(track.language, "en-GB");
    }

    #[test]
    fn test_translation_fallback() {
        let subs = tracks(&[("fr", "https://x/fr?a=1")]);
        let auto = TrackMap::new();

        let track = select_track(&subs, &auto, &prefs(&["zh"], Some("en"))).unwrap();
        assert_eq!(track.language, "fr");
        assert_eq!(track.translated_to.as_deref(), Some("en"));
        assert_eq!(track.url, "https://x/fr?a=1&tlang=en");

        assert!(select_track(&subs, &auto, &prefs(&["zh"], None)).is_none());
    }

    #[test]
    fn test_preferred_language_translated() {
        let subs = tracks(&[("zh", "https://x/zh")]);
        let track = select_track(&subs, &TrackMap::new(), &prefs(&["zh"], Some("en"))).unwrap();
        assert_eq!(track.url, "https://x/zh?tlang=en");
    }

    #[test]
    fn test_parse_json3() {
        let body = r#"{
            "wireMagic": "pb3",
            "events": [
                {"tStartMs": 0, "dDurationMs": 5000, "id": 1},
                {"tStartMs": 1200, "dDurationMs": 3000, "segs": [{"utf8": "hello"}, {"utf8": " there"}]},
                {"tStartMs": 4200, "aAppend": 1, "segs": [{"utf8": "\n"}]},
                {"tStartMs": 65000, "segs": [{"utf8": "second\nline"}]}
            ]
        }"#;

        let lines = parse_json3(body).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "hello there");
        assert_eq!(lines[1].start_seconds, 65.0);
        assert_eq!(render_transcript(&lines), "[00:01] hello there\n[01:05] second line");
    }

    #[tokio::test]
    async fn test_fetch_caption_lines() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/timedtext"))
            .and(query_param("tlang", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"events": [{"tStartMs": 3000, "segs": [{"utf8": "bonjour"}]}]}"#,
            ))
            .mount(&server)
            .await;

        let track = CaptionTrack {
            language: "fr".into(),
            url: format!("{}/api/timedtext?v=abc&tlang=en", server.uri()),
            automatic: false,
            translated_to: Some("en".into()),
        };

        let lines = fetch_caption_lines(&reqwest::Client::new(), &track).await.unwrap();
        assert_eq!(lines, vec![CaptionLine { start_seconds: 3.0, text: "bonjour".into() }]);
    }

    #[tokio::test]
    async fn test_fetch_caption_lines_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let track = CaptionTrack {
            language: "en".into(),
            url: format!("{}/api/timedtext", server.uri()),
            automatic: true,
            translated_to: None,
        };

        let err = fetch_caption_lines(&reqwest::Client::new(), &track).await.unwrap_err();
        assert!(matches!(err, TldwError::VideoSource(_)));
    }
}
