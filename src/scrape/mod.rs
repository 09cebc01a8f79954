//! Clients for third-party pages the bot reads by reverse engineering.
//! Extraction strategies are kept behind narrow interfaces so a markup
//! change on the target site only touches the one client.

pub mod genius;
pub mod spotify;

use std::fmt;

#[derive(Debug)]
pub enum ScrapeError {
    /// The query produced no usable result.
    NotFound,
    /// The page no longer matches the layout the extractor expects.
    Layout(&'static str),
    Http(reqwest::Error),
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeError::NotFound => write!(f, "no result found"),
            ScrapeError::Layout(what) => write!(f, "unexpected page layout: {what}"),
            ScrapeError::Http(e) => write!(f, "http request failed: {e}"),
        }
    }
}

impl std::error::Error for ScrapeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScrapeError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ScrapeError {
    fn from(e: reqwest::Error) -> Self {
        ScrapeError::Http(e)
    }
}

#[derive(Debug, Clone)]
pub struct Lyrics {
    pub text: String,
    pub url: String,
}

/// Seam for the lyrics extraction strategy.
pub trait LyricsSource {
    fn lyrics(
        &self,
        query: &str,
    ) -> impl std::future::Future<Output = Result<Lyrics, ScrapeError>> + Send;
}
