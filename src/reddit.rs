use anyhow::{bail, Context as _, Result};
use rand::seq::SliceRandom;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::info;

/// A cached submission from the meme subreddit's weekly top listing.
#[derive(Debug, Clone)]
pub struct MemePost {
    pub title: String,
    pub url: String,
    pub permalink: String,
}

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    children: Vec<Child>,
}

#[derive(Deserialize)]
struct Child {
    data: Submission,
}

#[derive(Deserialize)]
struct Submission {
    title: String,
    url: String,
    permalink: String,
    #[serde(default)]
    stickied: bool,
    #[serde(default)]
    over_18: bool,
}

/// Weekly top posts of a subreddit, fetched once at startup through the
/// public JSON listing and refreshable from the dev reload command.
pub struct MemeFeed {
    http: reqwest::Client,
    subreddit: String,
    user_agent: String,
    posts: RwLock<Vec<MemePost>>,
}

impl MemeFeed {
    pub fn new(http: reqwest::Client, subreddit: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            http,
            subreddit: subreddit.into(),
            user_agent: user_agent.into(),
            posts: RwLock::new(Vec::new()),
        }
    }

    pub async fn refresh(&self) -> Result<usize> {
        let url = format!(
            "https://www.reddit.com/r/{}/top.json?limit=100&t=week",
            self.subreddit
        );
        let listing: Listing = self
            .http
            .get(&url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await?
            .error_for_status()
            .context("subreddit listing request rejected")?
            .json()
            .await?;

        let posts: Vec<MemePost> = listing
            .data
            .children
            .into_iter()
            .map(|c| c.data)
            .filter(|s| !s.stickied && !s.over_18)
            .map(|s| MemePost {
                title: s.title,
                url: s.url,
                permalink: format!("https://www.reddit.com{}", s.permalink),
            })
            .collect();

        if posts.is_empty() {
            bail!("listing for r/{} came back empty", self.subreddit);
        }

        let count = posts.len();
        *self.posts.write().await = posts;
        info!("Cached {count} submissions from r/{}", self.subreddit);
        Ok(count)
    }

    pub async fn random(&self) -> Option<MemePost> {
        self.posts.read().await.choose(&mut rand::thread_rng()).cloned()
    }

    pub async fn len(&self) -> usize {
        self.posts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.posts.read().await.is_empty()
    }
}
