use super::{callback::CallbackRef, error::Result as CourtsideResult};

use rand::Rng;

use url::Url;

/// Upper bound (exclusive) of the cache-busting `r` query parameter.
const CACHE_BUSTER_RANGE: u32 = 9_999_999;

/// Pagination values passed through to the API. Only the values that were set are sent.
///
/// ```
/// # use courtside::request::Page;
/// let page = Page::new().page(2).per_page(10);
///
/// assert_eq!(page.number(), Some(2));
/// assert_eq!(page.size(), Some(10));
/// ```
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy)]
pub struct Page {
    page: Option<u32>,
    per_page: Option<u32>,
}

impl Page {
    /// Create a new instance of `Page` with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page number to retrieve.
    pub fn page<T: Into<Option<u32>>>(mut self, page: T) -> Self {
        self.page = page.into();
        self
    }

    /// Set the number of items per page.
    pub fn per_page<T: Into<Option<u32>>>(mut self, per_page: T) -> Self {
        self.per_page = per_page.into();
        self
    }

    pub fn number(&self) -> Option<u32> {
        self.page
    }

    pub fn size(&self) -> Option<u32> {
        self.per_page
    }
}

/// A logical API call: the path of the resource and optional pagination.
///
/// ```
/// # use courtside::request::{Page, Request};
/// let request = Request::new(["players", "jdoe"])
///     .segment("shots")
///     .segment("following")
///     .paged(Page::new().page(2).per_page(10));
///
/// assert_eq!(request.path(), "players/jdoe/shots/following");
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Request {
    segments: Vec<String>,
    page: Page,
}

impl Request {
    /// Create a request for the resource at the given path segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Request {
            segments: segments.into_iter().map(|s| s.to_string()).collect(),
            page: Page::default(),
        }
    }

    /// Append a path segment.
    pub fn segment(mut self, segment: impl ToString) -> Self {
        self.segments.push(segment.to_string());
        self
    }

    /// Set the pagination values. `None` clears them.
    pub fn paged<T: Into<Option<Page>>>(mut self, page: T) -> Self {
        self.page = page.into().unwrap_or_default();
        self
    }

    /// The resource path, segments joined with `/`.
    pub fn path(&self) -> String {
        self.segments.join("/")
    }

    pub fn page(&self) -> Page {
        self.page
    }

    /// Build the full request target under `base`.
    ///
    /// The query always carries the cache buster `r` and the `callback` reference, followed by
    /// `page` and `per_page` when they're set.
    pub fn to_url(
        &self,
        base: &Url,
        callback: &CallbackRef,
        cache_buster: u32,
    ) -> CourtsideResult<Url> {
        let mut url = base.clone();

        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(&self.segments);

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("r", &cache_buster.to_string())
                .append_pair("callback", &callback.to_string());

            if let Some(page) = self.page.page {
                query.append_pair("page", &page.to_string());
            }

            if let Some(per_page) = self.page.per_page {
                query.append_pair("per_page", &per_page.to_string());
            }
        }

        Ok(url)
    }
}

/// Random value keeping intermediaries from serving a cached script.
pub(crate) fn cache_buster() -> u32 {
    rand::thread_rng().gen_range(0..CACHE_BUSTER_RANGE)
}
