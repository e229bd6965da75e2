use futures::future::BoxFuture;

use crate::{
    domain::{cursor::Cursor, page::Page},
    error::FetchError,
};

/// Loads one page of a collection
///
/// Implementations are supplied per collection (feed posts, chat messages).
/// Pages are returned newest first, starting strictly after `cursor` when one
/// is given. Timeouts are the fetcher's business; the timeline waits for as
/// long as the returned future takes.
pub trait PageFetcher<T>: Send + Sync + 'static {
    fn fetch_page(
        &self,
        cursor: Option<Cursor>,
        limit: usize,
    ) -> BoxFuture<'static, Result<Page<T>, FetchError>>;
}
