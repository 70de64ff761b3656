use super::{
    error::{Error, Result as CourtsideResult},
    hooks::Hooks,
};

use derivative::Derivative;

use parking_lot::Mutex;

use serde_json::Value as JsonValue;

use std::{
    collections::HashMap,
    fmt,
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
};

/// Name under which every callback reference is addressed in a request target.
const NAMESPACE: &str = "courtside.callbacks.c";

/// One-shot response handler.
pub type Handler = Box<dyn FnOnce(CourtsideResult<JsonValue>) + Send>;

/// Reference to a registered response handler, sent to the API as the `callback` query parameter.
/// The API answers with a script calling the function of that name.
///
/// ```
/// # use courtside::callback::CallbackRef;
/// let callback: CallbackRef = "courtside.callbacks.c12".parse().unwrap();
///
/// assert_eq!(callback.id(), 12);
/// assert_eq!(callback.to_string(), "courtside.callbacks.c12");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackRef(u64);

impl CallbackRef {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallbackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", NAMESPACE, self.0)
    }
}

impl FromStr for CallbackRef {
    type Err = Error;

    fn from_str(s: &str) -> CourtsideResult<Self> {
        s.strip_prefix(NAMESPACE)
            .and_then(|id| id.parse().ok())
            .map(CallbackRef)
            .ok_or_else(|| Error::MalformedResponse(format!("unknown callback name {:?}", s)))
    }
}

/// Splits a `callback(payload);` script into the callback it calls and its parsed payload.
///
/// ```
/// # use courtside::callback::unwrap_jsonp;
/// let (callback, payload) = unwrap_jsonp(r#"courtside.callbacks.c3({"id": 21603});"#).unwrap();
///
/// assert_eq!(callback.id(), 3);
/// assert_eq!(payload["id"], 21603);
/// ```
pub fn unwrap_jsonp(body: &str) -> CourtsideResult<(CallbackRef, JsonValue)> {
    let script = body.trim().trim_end_matches(';').trim_end();

    let (name, rest) = script
        .split_once('(')
        .ok_or_else(|| Error::MalformedResponse(String::from("missing callback invocation")))?;

    let payload = rest
        .strip_suffix(')')
        .ok_or_else(|| Error::MalformedResponse(String::from("unterminated callback invocation")))?;

    Ok((name.trim().parse()?, serde_json::from_str(payload)?))
}

/// Table of in-flight response handlers, keyed by callback reference.
///
/// Handlers are removed as soon as they fire, so the table only ever holds requests that haven't
/// finished yet.
#[derive(Derivative)]
#[derivative(Debug)]
pub(crate) struct Registry {
    next_id: AtomicU64,
    #[derivative(Debug = "ignore")]
    slots: Mutex<HashMap<CallbackRef, Handler>>,
    hooks: Hooks,
}

impl Registry {
    pub fn new(hooks: Hooks) -> Self {
        Registry {
            next_id: AtomicU64::new(1),
            slots: Mutex::new(HashMap::new()),
            hooks,
        }
    }

    /// Store `handler` and return the reference that will invoke it.
    pub fn register(&self, handler: Handler) -> CallbackRef {
        let callback = CallbackRef(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.slots.lock().insert(callback, handler);
        callback
    }

    /// Fire and forget the handler registered under `callback`, then notify the `on_process` hook.
    /// Returns `false` if no such handler is waiting.
    pub fn deliver(&self, callback: &CallbackRef, outcome: CourtsideResult<JsonValue>) -> bool {
        let handler = self.slots.lock().remove(callback);

        match handler {
            Some(handler) => {
                tracing::debug!(%callback, ok = outcome.is_ok(), "delivering response");
                handler(outcome);
                self.hooks.process();
                true
            }
            None => false,
        }
    }

    /// Drop the handler registered under `callback` without calling it.
    pub fn forget(&self, callback: &CallbackRef) -> bool {
        self.slots.lock().remove(callback).is_some()
    }

    pub fn is_pending(&self, callback: &CallbackRef) -> bool {
        self.slots.lock().contains_key(callback)
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }
}
