//! Cursor-based pagination
//!
//! Lists are fetched with a large page size and followed through the
//! server's `next` URL. The server re-encodes the filters into that URL, so
//! caller parameters are only sent with the first request.

use futures_util::stream::{self, BoxStream, StreamExt, TryStreamExt};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::client::Client;
use crate::error::{Error, Result};

/// Page size requested by `iterate`.
pub const ITERATE_PAGE_SIZE: u32 = 2500;

#[derive(Deserialize)]
struct Page {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    next: Option<String>,
}

/// Where the next page comes from.
struct Cursor {
    url: Option<String>,
    params: Vec<(String, String)>,
}

/// Lazily stream every record of `route` matching `params`, page after page.
///
/// An error on any page ends the stream with that error.
pub(crate) fn iterate<'a>(
    client: &'a Client,
    route: String,
    params: &[(String, String)],
) -> BoxStream<'a, Result<Value>> {
    let mut first_params: Vec<(String, String)> = params
        .iter()
        .filter(|(key, _)| key != "page_size")
        .cloned()
        .collect();
    first_params.push(("page_size".to_string(), ITERATE_PAGE_SIZE.to_string()));

    let start = Cursor {
        url: Some(route),
        params: first_params,
    };

    stream::try_unfold(start, move |cursor| async move {
        let Some(url) = cursor.url else {
            return Ok::<_, Error>(None);
        };

        let response = client
            .request(Method::GET, &url, true, &cursor.params, None)
            .await?;
        let page: Page = response.json().map_err(|e| {
            Error::Decode(format!("invalid page from {}: {e}", response.url()))
        })?;
        debug!(
            url = %response.url(),
            results = page.results.len(),
            has_next = page.next.is_some(),
            "fetched page"
        );

        let next = Cursor {
            url: page.next,
            params: Vec::new(),
        };
        let records = stream::iter(page.results.into_iter().map(Ok::<Value, Error>));
        Ok(Some((records, next)))
    })
    .try_flatten()
    .boxed()
}
