use super::{
    callback::Handler,
    client::Client,
    error::Result as CourtsideResult,
    request::{Page, Request},
    shot::List,
};

use derivative::Derivative;

use futures::{
    future::LocalBoxFuture,
    stream::{FuturesUnordered, StreamExt},
    FutureExt,
};

use serde_json::Value as JsonValue;

use std::fmt;

/// Response handler for a [`Session`] call. Receives the raw payload of the response.
pub struct Callback(Handler);

impl Callback {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(CourtsideResult<JsonValue>) + Send + 'static,
    {
        Callback(Box::new(f))
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback").finish_non_exhaustive()
    }
}

/// Callback-style access to the API.
///
/// Every call is admitted against the call quota as soon as it's made and returns the session, so
/// calls can be chained. Nothing goes over the network until [`Session::run`] is awaited.
///
/// ```no_run
/// # use courtside::{client::Client, request::Page, session::Callback};
/// # #[tokio::main]
/// # async fn main() -> courtside::error::Result<()> {
/// let client = Client::new("http://api.dribbble.com", "MyProject/1.0")?;
/// let mut session = client.session();
///
/// session
///     .shot(21603, Callback::new(|shot| println!("{:?}", shot)))
///     .shots("popular", Page::new().per_page(5), Callback::new(|page| println!("{:?}", page)))
///     .player("simplebits")
///     .followers(None, Callback::new(|page| println!("{:?}", page)));
///
/// session.run().await;
/// # Ok(()) }
/// ```
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Session<'a> {
    client: &'a Client,
    #[derivative(Debug = "ignore")]
    pending: FuturesUnordered<LocalBoxFuture<'a, ()>>,
}

impl<'a> Session<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Session {
            client,
            pending: FuturesUnordered::new(),
        }
    }

    /// Issue an arbitrary request. Without a handler nothing is dispatched.
    pub fn api<T: Into<Option<Callback>>>(&mut self, request: Request, handler: T) -> &mut Self {
        match handler.into() {
            Some(Callback(handler)) => {
                let transfer = self.client.dispatch(&request, handler);
                self.pending.push(transfer.boxed_local());
            }
            None => {
                tracing::debug!(path = %request.path(), "no handler, request skipped");
            }
        }

        self
    }

    /// Fetch a single shot.
    pub fn shot<T>(&mut self, id: impl fmt::Display, handler: T) -> &mut Self
    where
        T: Into<Option<Callback>>,
    {
        self.api(Request::new(["shots".to_string(), id.to_string()]), handler)
    }

    /// Fetch a page of the shot list named `list` (`debuts`, `everyone` or `popular`). Any other
    /// name is ignored.
    pub fn shots<P, T>(&mut self, list: &str, page: P, handler: T) -> &mut Self
    where
        P: Into<Option<Page>>,
        T: Into<Option<Callback>>,
    {
        match list.parse::<List>() {
            Ok(list) => self.api(Request::new(["shots", list.as_str()]).paged(page), handler),
            Err(e) => {
                tracing::debug!(error = %e, "request skipped");
                self
            }
        }
    }

    /// Calls scoped to the player `id`.
    pub fn player(&mut self, id: impl ToString) -> PlayerCalls<'_, 'a> {
        PlayerCalls {
            session: self,
            id: id.to_string(),
        }
    }

    /// Number of requests not yet driven to completion.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Drive every pending request to completion. Returns how many finished.
    pub async fn run(&mut self) -> usize {
        let mut finished = 0;

        while self.pending.next().await.is_some() {
            finished += 1;
        }

        finished
    }
}

/// Session calls for a single player. Each call hands the session back for chaining.
#[derive(Debug)]
pub struct PlayerCalls<'s, 'a> {
    session: &'s mut Session<'a>,
    id: String,
}

impl<'s, 'a> PlayerCalls<'s, 'a> {
    fn request(&self, resource: Option<&str>) -> Request {
        let request = Request::new(["players", self.id.as_str()]);

        match resource {
            Some(resource) => request.segment(resource),
            None => request,
        }
    }

    /// The player's profile.
    pub fn get<T: Into<Option<Callback>>>(self, handler: T) -> &'s mut Session<'a> {
        let request = self.request(None);
        self.session.api(request, handler)
    }

    /// The player's shots, or with `following` the shots of the players they follow.
    pub fn shots<P, T>(self, following: bool, page: P, handler: T) -> &'s mut Session<'a>
    where
        P: Into<Option<Page>>,
        T: Into<Option<Callback>>,
    {
        let mut request = self.request(Some("shots"));
        if following {
            request = request.segment("following");
        }

        self.session.api(request.paged(page), handler)
    }

    pub fn followers<P, T>(self, page: P, handler: T) -> &'s mut Session<'a>
    where
        P: Into<Option<Page>>,
        T: Into<Option<Callback>>,
    {
        let request = self.request(Some("followers")).paged(page);
        self.session.api(request, handler)
    }

    pub fn following<P, T>(self, page: P, handler: T) -> &'s mut Session<'a>
    where
        P: Into<Option<Page>>,
        T: Into<Option<Callback>>,
    {
        let request = self.request(Some("following")).paged(page);
        self.session.api(request, handler)
    }

    /// Players drafted (invited) by this player.
    pub fn draftees<P, T>(self, page: P, handler: T) -> &'s mut Session<'a>
    where
        P: Into<Option<Page>>,
        T: Into<Option<Callback>>,
    {
        let request = self.request(Some("draftees")).paged(page);
        self.session.api(request, handler)
    }
}
