use super::{
    client::Client,
    error::Result as CourtsideResult,
    request::{Page, Request},
    shot::ShotPage,
    utils::{api_time, lenient_u64},
};

use chrono::{DateTime, FixedOffset};

use serde::Deserialize;

/// A player: a member of the site who uploads shots.
#[derive(Debug, PartialEq, Eq, Deserialize, Clone)]
#[non_exhaustive]
pub struct Player {
    pub id: u64,
    pub name: String,
    pub username: String,
    pub url: String,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
    pub twitter_screen_name: Option<String>,
    /// The player who drafted (invited) this one.
    pub drafted_by_player_id: Option<u64>,
    #[serde(default)]
    pub shots_count: u64,
    #[serde(default)]
    pub draftees_count: u64,
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub following_count: u64,
    #[serde(deserialize_with = "api_time")]
    pub created_at: DateTime<FixedOffset>,
}

/// One page of players.
#[derive(Debug, PartialEq, Eq, Deserialize, Clone)]
pub struct PlayerPage {
    #[serde(deserialize_with = "lenient_u64")]
    pub page: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub per_page: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub pages: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub total: u64,
    pub players: Vec<Player>,
}

/// The resources of a single player. Created with [`Client::player`]; nothing is requested until
/// one of its methods is called.
#[derive(Debug, Clone)]
pub struct PlayerResource<'a> {
    client: &'a Client,
    id: String,
}

impl Client {
    /// Returns the resources of the player `id`, which is either their username or their numeric
    /// ID.
    ///
    /// ```no_run
    /// # use courtside::client::Client;
    /// # use courtside::request::Page;
    /// # #[tokio::main]
    /// # async fn main() -> courtside::error::Result<()> {
    /// let client = Client::new("http://api.dribbble.com", "MyProject/1.0")?;
    /// let player = client.player("simplebits");
    ///
    /// println!("{} has {} followers", player.get().await?.name, player.followers(None).await?.total);
    /// # Ok(()) }
    /// ```
    pub fn player(&self, id: impl ToString) -> PlayerResource<'_> {
        PlayerResource {
            client: self,
            id: id.to_string(),
        }
    }
}

impl<'a> PlayerResource<'a> {
    fn request(&self) -> Request {
        Request::new(["players", self.id.as_str()])
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The player's profile.
    pub async fn get(&self) -> CourtsideResult<Player> {
        self.client.get_json(self.request()).await
    }

    /// Shots uploaded by the player.
    pub async fn shots<T: Into<Option<Page>>>(&self, page: T) -> CourtsideResult<ShotPage> {
        let request = self.request().segment("shots").paged(page);
        self.client.get_json(request).await
    }

    /// Shots uploaded by the players this player follows.
    pub async fn following_shots<T: Into<Option<Page>>>(
        &self,
        page: T,
    ) -> CourtsideResult<ShotPage> {
        let request = self
            .request()
            .segment("shots")
            .segment("following")
            .paged(page);
        self.client.get_json(request).await
    }

    /// Players following this player.
    pub async fn followers<T: Into<Option<Page>>>(&self, page: T) -> CourtsideResult<PlayerPage> {
        let request = self.request().segment("followers").paged(page);
        self.client.get_json(request).await
    }

    /// Players this player follows.
    pub async fn following<T: Into<Option<Page>>>(&self, page: T) -> CourtsideResult<PlayerPage> {
        let request = self.request().segment("following").paged(page);
        self.client.get_json(request).await
    }

    /// Players drafted (invited) by this player.
    pub async fn draftees<T: Into<Option<Page>>>(&self, page: T) -> CourtsideResult<PlayerPage> {
        let request = self.request().segment("draftees").paged(page);
        self.client.get_json(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{mock, Matcher};

    fn jsonp(callback: u64, payload: &str) -> String {
        format!("courtside.callbacks.c{}({})", callback, payload)
    }

    #[test]
    fn player_from_json() {
        let player: Player = serde_json::from_str(include_str!("mocked/player_jdoe.json")).unwrap();

        assert_eq!(player.id, 3460);
        assert_eq!(player.username, "jdoe");
        assert_eq!(player.avatar_url, None);
        assert_eq!(player.drafted_by_player_id, Some(1));
        assert_eq!(player.shots_count, 12);
        assert_eq!(player.created_at.offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn sparse_player_from_json() {
        let page: PlayerPage =
            serde_json::from_str(include_str!("mocked/players_followers.json")).unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.players[1].username, "sroe");
        assert_eq!(page.players[1].followers_count, 0);
        assert_eq!(page.players[1].location, None);
    }

    #[tokio::test]
    async fn get_player() {
        let client = Client::new(&mockito::server_url(), "courtside/unit_test").unwrap();

        let response = include_str!("mocked/player_jdoe.json");

        let _m = mock("GET", "/players/jdoe")
            .match_query(Matcher::UrlEncoded(
                "callback".into(),
                "courtside.callbacks.c1".into(),
            ))
            .with_body(jsonp(1, response))
            .create();

        assert_eq!(
            client.player("jdoe").get().await,
            Ok(serde_json::from_str(response).unwrap())
        );
    }

    #[tokio::test]
    async fn following_shots_with_page() {
        let client = Client::new(&mockito::server_url(), "courtside/unit_test").unwrap();

        let _m = mock("GET", "/players/jdoe/shots/following")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "2".into()),
                Matcher::UrlEncoded("per_page".into(), "10".into()),
            ]))
            .with_body(jsonp(1, include_str!("mocked/shots_popular.json")))
            .create();

        let page = client
            .player("jdoe")
            .following_shots(Page::new().page(2).per_page(10))
            .await
            .unwrap();

        assert_eq!(page.shots.len(), 2);
    }

    #[tokio::test]
    async fn followers_following_and_draftees() {
        let client = Client::new(&mockito::server_url(), "courtside/unit_test").unwrap();
        let response = include_str!("mocked/players_followers.json");
        let expected: PlayerPage = serde_json::from_str(response).unwrap();

        // callbacks are numbered in request order
        let _m = [
            mock("GET", "/players/simplebits/followers")
                .match_query(Matcher::UrlEncoded(
                    "callback".into(),
                    "courtside.callbacks.c1".into(),
                ))
                .with_body(jsonp(1, response))
                .create(),
            mock("GET", "/players/simplebits/following")
                .match_query(Matcher::UrlEncoded(
                    "callback".into(),
                    "courtside.callbacks.c2".into(),
                ))
                .with_body(jsonp(2, response))
                .create(),
            mock("GET", "/players/simplebits/draftees")
                .match_query(Matcher::UrlEncoded(
                    "callback".into(),
                    "courtside.callbacks.c3".into(),
                ))
                .with_body(jsonp(3, response))
                .create(),
        ];

        let player = client.player("simplebits");

        assert_eq!(player.followers(None).await.as_ref(), Ok(&expected));
        assert_eq!(player.following(None).await.as_ref(), Ok(&expected));
        assert_eq!(player.draftees(None).await.as_ref(), Ok(&expected));
    }

    #[tokio::test]
    async fn own_shots_by_numeric_id() {
        let client = Client::new(&mockito::server_url(), "courtside/unit_test").unwrap();

        let _m = mock("GET", "/players/3460/shots")
            .match_query(Matcher::Any)
            .with_body(jsonp(1, include_str!("mocked/shots_popular.json")))
            .create();

        let page = client.player(3460).shots(None).await.unwrap();
        assert_eq!(page.pages, 25);
    }
}
