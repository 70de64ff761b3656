use super::{
    client::Client,
    error::Result as CourtsideResult,
    player::Player,
    request::{Page, Request},
    utils::{api_time, lenient_u64},
};

use chrono::{DateTime, FixedOffset};

use serde::{Deserialize, Serialize};

use std::{fmt, str::FromStr};

use thiserror::Error;

/// General shot lists.
#[derive(Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum List {
    /// Players' first shots.
    Debuts,
    /// Every shot, most recent first.
    Everyone,
    /// Currently popular shots.
    Popular,
}

impl List {
    pub fn as_str(&self) -> &'static str {
        match self {
            List::Debuts => "debuts",
            List::Everyone => "everyone",
            List::Popular => "popular",
        }
    }
}

impl fmt::Display for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for List {
    type Err = ParseListError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debuts" => Ok(List::Debuts),
            "everyone" => Ok(List::Everyone),
            "popular" => Ok(List::Popular),
            _ => Err(ParseListError(s.to_string())),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown shot list {0:?}")]
pub struct ParseListError(String);

/// A shot: a single uploaded image and its statistics.
#[derive(Debug, PartialEq, Eq, Deserialize, Clone)]
#[non_exhaustive]
pub struct Shot {
    pub id: u64,
    pub title: String,
    pub url: String,
    pub short_url: Option<String>,
    pub image_url: String,
    pub image_teaser_url: Option<String>,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub views_count: u64,
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub comments_count: u64,
    #[serde(default)]
    pub rebounds_count: u64,
    /// The shot this one is a rebound of.
    pub rebound_source_id: Option<u64>,
    #[serde(deserialize_with = "api_time")]
    pub created_at: DateTime<FixedOffset>,
    /// The player who uploaded the shot. Absent from some listings.
    pub player: Option<Player>,
}

/// One page of shots.
#[derive(Debug, PartialEq, Eq, Deserialize, Clone)]
pub struct ShotPage {
    #[serde(deserialize_with = "lenient_u64")]
    pub page: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub per_page: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub pages: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub total: u64,
    pub shots: Vec<Shot>,
}

impl Client {
    /// Returns the shot with the given ID.
    ///
    /// ```no_run
    /// # use courtside::client::Client;
    /// # #[tokio::main]
    /// # async fn main() -> courtside::error::Result<()> {
    /// let client = Client::new("http://api.dribbble.com", "MyProject/1.0")?;
    /// let shot = client.get_shot(21603).await?;
    ///
    /// assert_eq!(shot.id, 21603);
    /// # Ok(()) }
    /// ```
    ///
    /// _Note: This function performs a request; it counts against the call quota and waits for
    /// the next quota window if the current one is exhausted._
    pub async fn get_shot(&self, id: u64) -> CourtsideResult<Shot> {
        self.get_json(Request::new(["shots"]).segment(id)).await
    }

    /// Returns a page of one of the general shot lists.
    ///
    /// ```no_run
    /// # use courtside::client::Client;
    /// # use courtside::request::Page;
    /// # use courtside::shot::List;
    /// # #[tokio::main]
    /// # async fn main() -> courtside::error::Result<()> {
    /// let client = Client::new("http://api.dribbble.com", "MyProject/1.0")?;
    /// let popular = client.shot_list(List::Popular, Page::new().per_page(30)).await?;
    ///
    /// for shot in popular.shots {
    ///     println!("{} ({} likes)", shot.title, shot.likes_count);
    /// }
    /// # Ok(()) }
    /// ```
    ///
    /// _Note: This function performs a request; it counts against the call quota and waits for
    /// the next quota window if the current one is exhausted._
    pub async fn shot_list<T: Into<Option<Page>>>(
        &self,
        list: List,
        page: T,
    ) -> CourtsideResult<ShotPage> {
        let request = Request::new(["shots", list.as_str()]).paged(page);

        self.get_json(request).await
    }
}
