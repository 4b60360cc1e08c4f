/// Port trait for resolving a representative image for a song's canonical
/// web page. `None` covers both "the page has no image" and fetch/parse
/// failures; a song without a thumbnail is not an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ThumbnailResolver: Send + Sync {
    async fn resolve(&self, page_url: &str) -> Option<String>;
}

#[async_trait::async_trait]
impl<R: ThumbnailResolver + ?Sized> ThumbnailResolver for std::sync::Arc<R> {
    async fn resolve(&self, page_url: &str) -> Option<String> {
        (**self).resolve(page_url).await
    }
}
