use scraper::{Html, Selector};
use serde_json::json;

use super::ScrapeError;

const ARTIST_URL: &str = "https://open.spotify.com/artist";
const PARTNER_URL: &str = "https://api-partner.spotify.com/pathfinder/v1/query";
const TRACK_QUERY_HASH: &str = "ae85b52abb74d20a4c331d4143d4772c95f34757bfa8c625474b912b9055b5c0";

// Fixed offsets into the partner API payload. Reverse engineered; the
// official API exposes neither play counts nor monthly listeners.
const EXPLICIT_INDEX: usize = 70;
const FIRST_DYNAMIC_INDEX: usize = 159;
const PLAYCOUNT_OFFSET: usize = 51;
const DATE_GAP: usize = 266;
const DATE_LEN: usize = 20;

// The session script embeds `{"accessToken":"<115 chars>"...`.
const TOKEN_START: usize = 16;
const TOKEN_END: usize = 131;
// og:description reads `Artist · <n> monthly listeners.`
const LISTENERS_PREFIX: usize = 9;
const LISTENERS_SUFFIX: usize = 19;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackStats {
    pub monthly_listeners: String,
    pub play_count: String,
    pub release_date: String,
    pub explicit: bool,
}

/// Play-count / monthly-listener stats for a Spotify track, read from the
/// artist page and the first kilobyte of the partner API's track payload.
pub struct TrackStatsClient {
    http: reqwest::Client,
}

impl TrackStatsClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    pub async fn stats(
        &self,
        artist_id: &str,
        track_id: &str,
    ) -> Result<TrackStats, ScrapeError> {
        let page = self
            .http
            .get(format!("{ARTIST_URL}/{artist_id}"))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let (token, monthly_listeners) = extract_session(&page)?;

        let variables = json!({ "uri": format!("spotify:track:{track_id}") }).to_string();
        let extensions = json!({
            "persistedQuery": { "version": 1, "sha256Hash": TRACK_QUERY_HASH }
        })
        .to_string();

        let body = self
            .http
            .get(PARTNER_URL)
            .query(&[
                ("operationName", "getTrack"),
                ("variables", variables.as_str()),
                ("extensions", extensions.as_str()),
            ])
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        // Only the head of the payload is interesting; titles long enough
        // to push the fields past 1 KiB do not exist in practice.
        let head = &body[..body.len().min(1024)];
        let (play_count, release_date, explicit) = parse_track_payload(head)?;

        Ok(TrackStats {
            monthly_listeners,
            play_count,
            release_date,
            explicit,
        })
    }
}

/// Pulls the bearer token and the monthly-listener count out of the artist
/// page: the token from the embedded session script, the listeners from the
/// `og:description` meta tag.
fn extract_session(page: &str) -> Result<(String, String), ScrapeError> {
    let document = Html::parse_document(page);

    let session_selector = Selector::parse(r#"script#session"#).expect("static selector");
    let script = document
        .select(&session_selector)
        .next()
        .ok_or(ScrapeError::Layout("session script missing"))?;
    let content: String = script.text().collect();
    let token = content
        .get(TOKEN_START..TOKEN_END)
        .ok_or(ScrapeError::Layout("session script too short for token"))?
        .to_string();

    let meta_selector =
        Selector::parse(r#"meta[property="og:description"]"#).expect("static selector");
    let description = document
        .select(&meta_selector)
        .next()
        .and_then(|m| m.value().attr("content"))
        .ok_or(ScrapeError::Layout("og:description missing"))?;
    // Char-based slicing: the description contains a middle dot.
    let chars: Vec<char> = description.chars().collect();
    if chars.len() <= LISTENERS_PREFIX + LISTENERS_SUFFIX {
        return Err(ScrapeError::Layout("og:description too short"));
    }
    let listeners: String = chars[LISTENERS_PREFIX..chars.len() - LISTENERS_SUFFIX]
        .iter()
        .collect();

    Ok((token, listeners))
}

/// Walks the head of the partner payload by fixed offsets: explicit flag at
/// a known index, play count a fixed distance after the first `{` past the
/// dynamic region, release date read backwards from its closing `Z`.
pub fn parse_track_payload(data: &[u8]) -> Result<(String, String, bool), ScrapeError> {
    fn off_payload() -> ScrapeError {
        ScrapeError::Layout("ran off the end of the track payload")
    }

    if data.len() <= FIRST_DYNAMIC_INDEX {
        return Err(ScrapeError::Layout("track payload too short"));
    }
    let explicit = data[EXPLICIT_INDEX] == b'E';

    let mut play_count = String::new();
    let mut current = FIRST_DYNAMIC_INDEX;
    let mut left_brackets = 0u32;
    let mut done_playcount = false;

    let release_date = loop {
        let mut byte = *data.get(current).ok_or_else(off_payload)?;
        if byte == b'{' {
            left_brackets += 1;
        }

        if left_brackets == 1 && !done_playcount {
            current += PLAYCOUNT_OFFSET;
            loop {
                let digit = *data.get(current).ok_or_else(off_payload)?;
                if digit == b'"' {
                    break;
                }
                play_count.push(digit as char);
                current += 1;
            }
            current += DATE_GAP;
            done_playcount = true;
            byte = *data.get(current).ok_or_else(off_payload)?;
        }

        // 'Z' terminates the release timestamp.
        if byte == b'Z' {
            let start = current + 1 - DATE_LEN;
            let slice = data.get(start..start + DATE_LEN).ok_or_else(off_payload)?;
            break String::from_utf8_lossy(slice).into_owned();
        }
        current += 1;
    };

    Ok((play_count, release_date, explicit))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATE: &str = "2019-05-31T00:00:00Z";

    /// Builds a payload honoring the offsets the parser walks: explicit
    /// marker, first `{` past the dynamic region, play count digits a fixed
    /// distance later, then the release timestamp.
    fn payload(explicit: bool, play_count: &str, date: &str) -> Vec<u8> {
        let mut data = vec![b'x'; 700];
        if explicit {
            data[EXPLICIT_INDEX] = b'E';
        }

        let bracket = 200;
        data[bracket] = b'{';
        let digits_at = bracket + PLAYCOUNT_OFFSET;
        data[digits_at..digits_at + play_count.len()].copy_from_slice(play_count.as_bytes());
        let quote = digits_at + play_count.len();
        data[quote] = b'"';

        let after_gap = quote + DATE_GAP;
        let date_at = after_gap + 5;
        data[date_at..date_at + date.len()].copy_from_slice(date.as_bytes());
        data
    }

    #[test]
    fn parses_play_count_date_and_explicit() {
        let data = payload(true, "12345678", DATE);
        let (count, date, explicit) = parse_track_payload(&data).unwrap();
        assert_eq!(count, "12345678");
        assert_eq!(date, DATE);
        assert!(explicit);
    }

    #[test]
    fn non_explicit_tracks_are_detected() {
        let data = payload(false, "42", DATE);
        let (count, _, explicit) = parse_track_payload(&data).unwrap();
        assert_eq!(count, "42");
        assert!(!explicit);
    }

    #[test]
    fn truncated_payload_is_a_layout_error() {
        assert!(parse_track_payload(&[0u8; 80]).is_err());
        let mut data = payload(true, "123", DATE);
        data.truncate(300);
        assert!(parse_track_payload(&data).is_err());
    }

    #[test]
    fn session_extraction_reads_token_and_listeners() {
        let token: String = "t".repeat(115);
        let page = format!(
            r#"<html><head>
               <meta property="og:description" content="Artist · 1,234,567 monthly listeners.">
               <script id="session" data-testid="session">{{"accessToken":"{token}","x":1}}</script>
               </head></html>"#
        );
        let (got_token, listeners) = extract_session(&page).unwrap();
        assert_eq!(got_token, token);
        assert_eq!(listeners, "1,234,567");
    }
}
