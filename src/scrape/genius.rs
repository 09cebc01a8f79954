use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::debug;

use super::{Lyrics, LyricsSource, ScrapeError};

const SEARCH_URL: &str = "https://api.genius.com/search";
const PAGE_BASE: &str = "https://genius.com";
// Everything after this marker is recommendation boilerplate, not lyrics.
const TRAILER_MARKER: &str = "You might also like";

#[derive(Deserialize)]
struct SearchResponse {
    response: SearchHits,
}

#[derive(Deserialize)]
struct SearchHits {
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    result: HitResult,
}

#[derive(Deserialize)]
struct HitResult {
    path: String,
}

/// Lyrics client for genius.com: the JSON search API resolves a page path,
/// the lyrics themselves are scraped out of the song page's HTML.
pub struct GeniusClient {
    http: reqwest::Client,
    token: String,
    blank_runs: Regex,
}

impl GeniusClient {
    pub fn new(http: reqwest::Client, token: impl Into<String>) -> Self {
        Self {
            http,
            token: token.into(),
            blank_runs: Regex::new(r"\n{3,}").unwrap(),
        }
    }

    async fn search_path(&self, query: &str) -> Result<Option<String>, ScrapeError> {
        let response: SearchResponse = self
            .http
            .get(SEARCH_URL)
            .query(&[("q", query), ("per_page", "1")])
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.response.hits.into_iter().next().map(|h| h.result.path))
    }

    fn extract(&self, page: &str, url: String) -> Result<Lyrics, ScrapeError> {
        let document = Html::parse_document(page);
        // Genius has shipped both of these container shapes over the years.
        let selector = Selector::parse(r#"div[data-lyrics-container="true"], div.lyrics"#)
            .expect("static selector");

        let mut text = String::new();
        for container in document.select(&selector) {
            for node in container.descendants() {
                match node.value() {
                    scraper::Node::Text(t) => text.push_str(t),
                    scraper::Node::Element(e) if e.name() == "br" => text.push('\n'),
                    _ => {}
                }
            }
            text.push('\n');
        }

        if text.trim().is_empty() {
            return Err(ScrapeError::Layout("no lyrics container in song page"));
        }

        if let Some(index) = text.find(TRAILER_MARKER) {
            text.truncate(index);
        }
        let text = self
            .blank_runs
            .replace_all(text.trim(), "\n\n")
            .into_owned();

        Ok(Lyrics { text, url })
    }
}

impl LyricsSource for GeniusClient {
    async fn lyrics(&self, query: &str) -> Result<Lyrics, ScrapeError> {
        let path = self
            .search_path(query)
            .await?
            .ok_or(ScrapeError::NotFound)?;
        debug!("Genius search hit: {path}");

        let url = format!("{PAGE_BASE}{path}");
        let page = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        self.extract(&page, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeniusClient {
        GeniusClient::new(reqwest::Client::new(), "test-token")
    }

    #[test]
    fn extracts_text_and_breaks_from_container() {
        let page = r#"<html><body>
            <div data-lyrics-container="true">First line<br>Second line<br><br>Chorus</div>
        </body></html>"#;
        let lyrics = client()
            .extract(page, "https://genius.com/x".to_string())
            .unwrap();
        assert_eq!(lyrics.text, "First line\nSecond line\n\nChorus");
    }

    #[test]
    fn cuts_recommendation_trailer() {
        let page = r#"<div data-lyrics-container="true">real lyricsYou might also likeother song</div>"#;
        let lyrics = client()
            .extract(page, String::new())
            .unwrap();
        assert_eq!(lyrics.text, "real lyrics");
    }

    #[test]
    fn missing_container_is_a_layout_error() {
        let err = client()
            .extract("<html><body><p>nope</p></body></html>", String::new())
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Layout(_)));
    }
}
