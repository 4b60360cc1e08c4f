use std::collections::HashMap;
use std::time::Duration;

use html_parser::{Dom, Node};
use tokio::sync::Mutex;

use crate::ports::thumbnail::ThumbnailResolver;

/// Resolves a song's thumbnail by fetching its canonical page and taking
/// the `src` of the first `<img>` element in document order.
pub struct PageThumbnailResolver {
    client: reqwest::Client,
}

impl PageThumbnailResolver {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for PageThumbnailResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ThumbnailResolver for PageThumbnailResolver {
    async fn resolve(&self, page_url: &str) -> Option<String> {
        let response = self
            .client
            .get(page_url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .ok()?
            .error_for_status()
            .ok()?;
        let body = response.text().await.ok()?;

        first_img_src(&body)
    }
}

/// The `src` of the first image element in the document, if any.
fn first_img_src(html: &str) -> Option<String> {
    let dom = Dom::parse(html).ok()?;
    find_img(&dom.children)
}

fn find_img(nodes: &[Node]) -> Option<String> {
    for node in nodes {
        if let Node::Element(element) = node {
            if element.name.eq_ignore_ascii_case("img")
                && let Some(Some(src)) = element.attributes.get("src")
            {
                return Some(src.clone());
            }
            if let Some(found) = find_img(&element.children) {
                return Some(found);
            }
        }
    }
    None
}

/// Memoizes resolved thumbnails per canonical URL so a sync pass fetches
/// each distinct page at most once and later passes reuse earlier answers.
/// Negative answers are cached too. `invalidate` drops a single entry.
pub struct CachedThumbnailResolver<R> {
    inner: R,
    cache: Mutex<HashMap<String, Option<String>>>,
}

impl<R> CachedThumbnailResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn invalidate(&self, page_url: &str) {
        self.cache.lock().await.remove(page_url);
    }
}

#[async_trait::async_trait]
impl<R: ThumbnailResolver> ThumbnailResolver for CachedThumbnailResolver<R> {
    async fn resolve(&self, page_url: &str) -> Option<String> {
        if let Some(cached) = self.cache.lock().await.get(page_url) {
            return cached.clone();
        }

        let resolved = self.inner.resolve(page_url).await;
        self.cache
            .lock()
            .await
            .insert(page_url.to_string(), resolved.clone());
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::thumbnail::MockThumbnailResolver;

    #[test]
    fn test_first_img_src() {
        let html = r#"
            <html><body>
                <div><p>Some song</p></div>
                <div><img src="https://i.scdn.co/image/cover.jpg" alt="cover"></div>
                <img src="https://i.scdn.co/image/second.jpg">
            </body></html>
        "#;
        assert_eq!(
            first_img_src(html),
            Some("https://i.scdn.co/image/cover.jpg".to_string())
        );
    }

    #[test]
    fn test_first_img_src_nested_before_sibling() {
        // The nested image comes first in document order
        let html = r#"
            <div><span><img src="/nested.png"></span></div>
            <img src="/toplevel.png">
        "#;
        assert_eq!(first_img_src(html), Some("/nested.png".to_string()));
    }

    #[test]
    fn test_first_img_src_no_image() {
        assert_eq!(first_img_src("<html><body><p>text</p></body></html>"), None);
    }

    #[test]
    fn test_first_img_src_img_without_src() {
        assert_eq!(first_img_src("<img alt='no source'>"), None);
    }

    #[tokio::test]
    async fn test_cached_resolver_fetches_once_per_url() {
        let mut inner = MockThumbnailResolver::new();
        inner
            .expect_resolve()
            .times(1)
            .returning(|_| Some("https://img/cover.jpg".to_string()));

        let resolver = CachedThumbnailResolver::new(inner);
        let first = resolver.resolve("https://open.spotify.com/track/1").await;
        let second = resolver.resolve("https://open.spotify.com/track/1").await;

        assert_eq!(first, Some("https://img/cover.jpg".to_string()));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_cached_resolver_caches_absent() {
        let mut inner = MockThumbnailResolver::new();
        inner.expect_resolve().times(1).returning(|_| None);

        let resolver = CachedThumbnailResolver::new(inner);
        assert_eq!(resolver.resolve("https://page/no-image").await, None);
        assert_eq!(resolver.resolve("https://page/no-image").await, None);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let mut inner = MockThumbnailResolver::new();
        inner
            .expect_resolve()
            .times(2)
            .returning(|_| Some("https://img/cover.jpg".to_string()));

        let resolver = CachedThumbnailResolver::new(inner);
        resolver.resolve("https://open.spotify.com/track/1").await;
        resolver.invalidate("https://open.spotify.com/track/1").await;
        resolver.resolve("https://open.spotify.com/track/1").await;
    }
}
