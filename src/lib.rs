//! Client crate for the [Dribbble](http://dribbble.com) shots and players API.
//!
//! ## Usage
//!
//! First, create a [`Client`]. You have to provide a descriptive User-Agent for your project.
//!
//! ```no_run
//! # use courtside::client::Client;
//! # fn main() -> Result<(), courtside::error::Error> {
//! let client = Client::new("http://api.dribbble.com", "MyProject/1.0")?;
//! # Ok(()) }
//! ```
//!
//! Now it's ready to go! For example you can get shot #21603 like this:
//!
//! ```no_run
//! # use courtside::client::Client;
//! # #[tokio::main]
//! # async fn main() -> Result<(), courtside::error::Error> {
//! # let client = Client::new("http://api.dribbble.com", "MyProject/1.0")?;
//! let shot = client.get_shot(21603).await?;
//!
//! assert_eq!(shot.id, 21603);
//! # Ok(()) }
//! ```
//!
//! Or browse what the players someone follows have been posting:
//!
//! ```no_run
//! # use courtside::{client::Client, request::Page};
//! # #[tokio::main]
//! # async fn main() -> Result<(), courtside::error::Error> {
//! # let client = Client::new("http://api.dribbble.com", "MyProject/1.0")?;
//! let page = client
//!     .player("jdoe")
//!     .following_shots(Page::new().page(2).per_page(10))
//!     .await?;
//!
//! for shot in page.shots {
//!     println!("#{} {}", shot.id, shot.title);
//! }
//! # Ok(()) }
//! ```
//!
//! The same calls are available in a callback style through [`Client::session`], whose handlers
//! receive the raw JSON payload.
//!
//! ## Transport
//!
//! The API answers with scripts of the form `callback(payload);`. Every request is registered
//! under its own callback reference (`courtside.callbacks.c1`, `courtside.callbacks.c2`, ...) and
//! the payload goes to whichever handler the response names. Requests also carry a random `r`
//! query parameter so intermediaries don't serve a cached script.
//!
//! ## Rate Limiting
//!
//! The API accepts 60 calls per minute. `courtside` counts calls in a fixed window opened by the
//! first call: once 60 calls went out, further requests are queued in order and released when the
//! window expires, at most 60 at a time. [`Client::on_pause`] and [`Client::on_resume`] tell you
//! when that happens.
//!
//! The window is shared by all clones of a [`Client`] but not between independently created
//! clients. Disabling the `rate-limit` feature removes the window entirely.
//!
//! [`Client`]: client/struct.Client.html
//! [`Client::session`]: client/struct.Client.html#method.session
//! [`Client::on_pause`]: client/struct.Client.html#method.on_pause
//! [`Client::on_resume`]: client/struct.Client.html#method.on_resume

mod hooks;
mod utils;

/// Response handler registry and script unwrapping.
pub mod callback;

/// Client related structures.
pub mod client;

/// Client configuration.
pub mod config;

/// Error management.
pub mod error;

/// Player management.
pub mod player;

/// Request paths and pagination.
pub mod request;

/// Callback-style sessions.
pub mod session;

/// Shot management.
pub mod shot;
