use super::{
    callback::{unwrap_jsonp, CallbackRef, Registry},
    config::{Config, DEFAULT_ENDPOINT},
    error::{Error, Result},
    hooks::Hooks,
    request::{cache_buster, Request},
    session::Session,
};

#[cfg(feature = "rate-limit")]
mod rate_limit;

#[cfg(all(feature = "rate-limit", not(target_family = "wasm")))]
mod tokio_rate_limit;

#[cfg(all(feature = "rate-limit", target_family = "wasm"))]
mod gloo_rate_limit;

#[cfg(not(feature = "rate-limit"))]
mod dummy_rate_limit;

#[cfg(not(feature = "rate-limit"))]
use dummy_rate_limit::RateLimit;
#[cfg(feature = "rate-limit")]
use rate_limit::RateLimit;

use futures::{channel::oneshot, Future};

use reqwest::header::{self, HeaderMap, HeaderValue};

use serde::de::DeserializeOwned;

use serde_json::Value as JsonValue;

use std::sync::Arc;

use url::Url;

/// Snapshot of the client-side call quota.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaStatus {
    /// Calls dispatched in the current window.
    pub calls: usize,
    /// Calls waiting for the next window.
    pub queued: usize,
    /// Whether the quota was exhausted during the current window.
    pub paused: bool,
}

/// Client struct.
#[derive(Debug, Clone)]
pub struct Client {
    client: reqwest::Client,
    base_url: Url,
    rate_limit: RateLimit,
    callbacks: Arc<Registry>,
    hooks: Hooks,
}

/// Drops the callback slot of a request whose future was abandoned before completing.
struct SlotGuard {
    callbacks: Arc<Registry>,
    callback: CallbackRef,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.callbacks.forget(&self.callback);
    }
}

impl Client {
    /// Create a new client for the API at `base_url` with the specified value for the User-Agent
    /// header, using the default call quota of 60 calls per minute.
    ///
    /// ```
    /// # use courtside::client::Client;
    /// # fn main() -> courtside::error::Result<()> {
    /// let client = Client::new("http://api.dribbble.com", "MyProject/1.0")?;
    /// # Ok(()) }
    /// ```
    pub fn new(base_url: &str, user_agent: impl AsRef<str>) -> Result<Self> {
        Self::with_config(Config::new(base_url, user_agent.as_ref()))
    }

    /// Create a new client for the public API endpoint.
    pub fn public(user_agent: impl AsRef<str>) -> Result<Self> {
        Self::new(DEFAULT_ENDPOINT, user_agent)
    }

    /// Create a new client from a [`Config`].
    pub fn with_config(config: Config) -> Result<Self> {
        if config.user_agent.is_empty() {
            return Err(Error::CannotCreateClient(String::from(
                "User Agent mustn't be empty",
            )));
        }

        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidUrl(format!(
                "{} can't be used as a base endpoint",
                base_url
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_str(&config.user_agent)?,
        );

        #[allow(unused_mut)]
        let mut builder = reqwest::Client::builder().default_headers(headers);

        #[cfg(not(target_family = "wasm"))]
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| Error::CannotCreateClient(format!("{:?}", e)))?;

        let hooks = Hooks::default();

        Ok(Client {
            client,
            base_url,
            rate_limit: RateLimit::new(&config.quota, hooks.clone()),
            callbacks: Arc::new(Registry::new(hooks.clone())),
            hooks,
        })
    }

    /// The endpoint every request path is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Called when the call quota is exhausted and requests start being queued. Called at most
    /// once per quota window.
    pub fn on_pause<F: Fn() + Send + Sync + 'static>(&self, hook: F) -> &Self {
        self.hooks.set_on_pause(Some(Arc::new(hook)));
        self
    }

    /// Called when the quota window resets after having been exhausted, before queued requests
    /// are released.
    pub fn on_resume<F: Fn() + Send + Sync + 'static>(&self, hook: F) -> &Self {
        self.hooks.set_on_resume(Some(Arc::new(hook)));
        self
    }

    /// Called every time a response (or failure) has been handed to its handler.
    pub fn on_process<F: Fn() + Send + Sync + 'static>(&self, hook: F) -> &Self {
        self.hooks.set_on_process(Some(Arc::new(hook)));
        self
    }

    /// Remove every lifecycle hook.
    pub fn clear_hooks(&self) -> &Self {
        self.hooks.set_on_pause(None);
        self.hooks.set_on_resume(None);
        self.hooks.set_on_process(None);
        self
    }

    /// Current state of the call quota.
    pub fn quota_status(&self) -> QuotaStatus {
        self.rate_limit.status()
    }

    /// Number of requests whose handler hasn't fired yet.
    pub fn pending_callbacks(&self) -> usize {
        self.callbacks.len()
    }

    /// Start a callback-style [`Session`] on this client.
    pub fn session(&self) -> Session<'_> {
        Session::new(self)
    }

    /// Issue `request`, handing its outcome to `handler`.
    ///
    /// The handler is registered and the request is counted against the call quota (or queued)
    /// right away; the returned future performs the transfer once the quota allows it. If the
    /// future is first polled after the window its slot was counted in has closed, the request is
    /// counted again against the current window.
    ///
    /// The response is a `callback(payload)` script and the payload goes to whichever handler it
    /// names. If the request finishes without its own handler having been invoked, that handler
    /// receives [`Error::UnmatchedCallback`].
    ///
    /// Dropping the future before it completes forgets the handler without calling it.
    pub fn dispatch<H>(&self, request: &Request, handler: H) -> impl Future<Output = ()> + '_
    where
        H: FnOnce(Result<JsonValue>) + Send + 'static,
    {
        let callback = self.callbacks.register(Box::new(handler));
        let guard = SlotGuard {
            callbacks: self.callbacks.clone(),
            callback,
        };

        let admitted = request
            .to_url(&self.base_url, &callback, cache_buster())
            .and_then(|url| Ok((url, self.rate_limit.admit()?)));

        match &admitted {
            Ok(_) => tracing::debug!(%callback, path = %request.path(), "request admitted"),
            Err(e) => {
                tracing::debug!(%callback, path = %request.path(), error = %e, "request refused")
            }
        }

        async move {
            let outcome = match admitted {
                Ok((url, permit)) => match permit.ready().await {
                    Ok(()) => self.get_jsonp(url).await,
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            };

            match outcome {
                Ok((target, payload)) => {
                    if !self.callbacks.deliver(&target, Ok(payload)) {
                        tracing::warn!(
                            callback = %target,
                            "response invoked a callback that isn't waiting"
                        );
                    }
                }
                Err(e) => {
                    self.callbacks.deliver(&callback, Err(e));
                }
            }

            if self.callbacks.is_pending(&guard.callback) {
                tracing::warn!(%callback, "response never invoked its callback");
                self.callbacks.deliver(
                    &callback,
                    Err(Error::UnmatchedCallback(callback.to_string())),
                );
            }
        }
    }

    async fn get_jsonp(&self, url: Url) -> Result<(CallbackRef, JsonValue)> {
        let res = self.client.get(url).send().await?;

        let status = res.status();
        let body = res.text().await?;

        if status.is_success() {
            unwrap_jsonp(&body).map_err(|e| {
                tracing::warn!(error = %e, "couldn't read response script");
                e
            })
        } else {
            Err(Error::Http(status.as_u16(), error_reason(&body)))
        }
    }

    /// Issue `request` and deserialize its payload.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, request: Request) -> Result<T> {
        let (tx, rx) = oneshot::channel();

        self.dispatch(&request, move |outcome| {
            let _ = tx.send(outcome);
        })
        .await;

        let payload = rx
            .await
            .map_err(|_| Error::UnmatchedCallback(request.path()))??;

        Ok(serde_json::from_value(payload)?)
    }
}

/// The `message` the API puts in error payloads, wrapped in a script or not.
fn error_reason(body: &str) -> Option<String> {
    let payload = match unwrap_jsonp(body) {
        Ok((_, payload)) => payload,
        Err(_) => serde_json::from_str::<JsonValue>(body).ok()?,
    };

    payload["message"].as_str().map(String::from)
}
