//! Media strategy backed by the platform API.

use async_trait::async_trait;
use galleria_core::media_url::{build_filename, guess_extension};
use galleria_core::{ElementQuery, ExtractionResult, MediaItem, MediaKind, SourceKind};
use galleria_fetch::{ExtractionRequest, FetchError, MediaStrategy};
use std::rc::Rc;
use tracing::{debug, instrument};

use super::client::MediaApi;
use super::parser::ApiMedia;
use crate::clicked::{dom_order_index, filename_key, find_media_element, media_source_url};

/// Strategy name.
pub const API_STRATEGY_NAME: &str = "twitter-api";

/// Failure reason for a post without attachments.
pub const NO_API_MEDIA: &str = "No media found in API response";

/// Resolves media through a [`MediaApi`]. Requires a resolved identity.
#[derive(Clone)]
pub struct ApiStrategy {
    api: Rc<dyn MediaApi>,
}

impl ApiStrategy {
    /// Creates the strategy on top of `api`.
    pub fn new(api: Rc<dyn MediaApi>) -> Self {
        Self { api }
    }
}

impl std::fmt::Debug for ApiStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiStrategy").finish_non_exhaustive()
    }
}

/// Index of the clicked attachment among `media`.
///
/// Exact URL match against download or preview URLs, then a filename match
/// ignoring the query, then the DOM-order estimate.
pub fn api_clicked_index<E: ElementQuery>(element: &E, media: &[ApiMedia]) -> usize {
    let clicked = find_media_element(element);
    if let Some(url) = clicked.as_ref().and_then(media_source_url) {
        if let Some(position) = media
            .iter()
            .position(|m| m.download_url == url || m.preview_url == url)
        {
            return position;
        }
        if let Some(key) = filename_key(&url) {
            if let Some(position) = media.iter().position(|m| {
                filename_key(&m.download_url).as_deref() == Some(key.as_str())
                    || filename_key(&m.preview_url).as_deref() == Some(key.as_str())
            }) {
                return position;
            }
        }
    }
    dom_order_index(element, clicked.as_ref(), media.len())
}

fn to_media_item(media: &ApiMedia, post_id: &str, author: Option<&str>) -> MediaItem {
    let extension = guess_extension(&media.download_url, media.kind);
    let filename = build_filename(author, Some(post_id), media.index, &extension);
    let mut item = MediaItem::new(
        format!("{post_id}_api_{}", media.index),
        media.download_url.clone(),
        media.kind,
        filename,
    )
    .with_thumbnail(media.preview_url.clone())
    .with_source("api");
    if let (Some(w), Some(h)) = (media.width, media.height) {
        item = item.with_dimensions(w, h);
    }
    if media.kind == MediaKind::Image {
        item.meta.quality_label = Some("orig".to_string());
    }
    item.meta.api_index = Some(media.index);
    item
}

#[async_trait(?Send)]
impl MediaStrategy for ApiStrategy {
    fn name(&self) -> &str {
        API_STRATEGY_NAME
    }

    fn priority(&self) -> u32 {
        1
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::Api
    }

    fn can_handle(&self, request: &ExtractionRequest) -> bool {
        request.identity.as_ref().is_some_and(|identity| identity.is_valid())
    }

    #[instrument(skip(self, request), fields(extraction_id = %request.extraction_id))]
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionResult, FetchError> {
        let identity = request.identity.as_ref().ok_or(FetchError::MissingIdentity)?;
        let media = self.api.fetch_media(&identity.id).await?;

        if media.is_empty() {
            return Ok(ExtractionResult::failure(
                SourceKind::Api,
                API_STRATEGY_NAME,
                NO_API_MEDIA,
            )
            .with_identity(Some(identity.clone())));
        }

        let items: Vec<MediaItem> = media
            .iter()
            .map(|m| to_media_item(m, &identity.id, request.author()))
            .collect();
        let clicked_index = api_clicked_index(&request.element, &media);
        debug!(count = items.len(), clicked_index, "API extraction succeeded");

        Ok(
            ExtractionResult::success(items, clicked_index, SourceKind::Api, API_STRATEGY_NAME)
                .with_identity(Some(identity.clone())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use galleria_core::{Document, Element, ExtractionOptions, Identity};

    struct FixedApi(Vec<ApiMedia>);

    #[async_trait(?Send)]
    impl MediaApi for FixedApi {
        async fn fetch_media(&self, _post_id: &str) -> Result<Vec<ApiMedia>, ApiError> {
            Ok(self.0.clone())
        }
    }

    fn photo(index: usize, stem: &str) -> ApiMedia {
        ApiMedia {
            index,
            media_id: None,
            kind: MediaKind::Image,
            download_url: format!("https://pbs.twimg.com/media/{stem}?format=jpg&name=orig"),
            preview_url: format!("https://pbs.twimg.com/media/{stem}.jpg"),
            width: Some(100),
            height: Some(50),
        }
    }

    fn request(element: Element) -> ExtractionRequest {
        ExtractionRequest::new(element, ExtractionOptions::default())
            .with_identity(Some(Identity::new("42", "alice", "test", 1.0)))
    }

    const POST: &str = r#"<article>
        <img id="one" src="https://pbs.twimg.com/media/ONE?format=jpg&name=small">
        <img id="two" src="https://pbs.twimg.com/media/TWO?format=jpg&name=small">
        <img id="three" src="https://pbs.twimg.com/unrelated.jpg">
    </article>"#;

    #[tokio::test]
    async fn test_extract_builds_items() {
        let doc = Document::parse(POST, None);
        let strategy = ApiStrategy::new(Rc::new(FixedApi(vec![photo(0, "ONE"), photo(1, "TWO")])));
        let req = request(doc.select_first("#two").unwrap());

        assert!(strategy.can_handle(&req));
        let result = strategy.extract(&req).await.unwrap();
        assert!(result.success);
        assert_eq!(result.clicked_index, 1);
        assert_eq!(result.media_items[0].id, "42_api_0");
        assert_eq!(result.media_items[1].filename, "alice_42_2.jpg");
        assert_eq!(result.media_items[1].meta.api_index, Some(1));
        assert_eq!(result.meta.source_kind, SourceKind::Api);
    }

    #[tokio::test]
    async fn test_empty_response_is_a_failure() {
        let doc = Document::parse(POST, None);
        let strategy = ApiStrategy::new(Rc::new(FixedApi(Vec::new())));
        let result = strategy
            .extract(&request(doc.select_first("#one").unwrap()))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.error(), Some(NO_API_MEDIA));
    }

    #[test]
    fn test_missing_identity_is_not_handled() {
        let doc = Document::parse(POST, None);
        let strategy = ApiStrategy::new(Rc::new(FixedApi(Vec::new())));
        let req = ExtractionRequest::new(doc.select_first("#one").unwrap(), ExtractionOptions::default());
        assert!(!strategy.can_handle(&req));
    }

    #[test]
    fn test_clicked_index_falls_back_to_dom_order() {
        let doc = Document::parse(POST, None);
        let media = vec![photo(0, "X"), photo(1, "Y"), photo(2, "Z")];
        let third = doc.select_first("#three").unwrap();
        assert_eq!(api_clicked_index(&third, &media), 2);
        // Out of range positions collapse to the first item.
        assert_eq!(api_clicked_index(&third, &media[..2]), 0);
    }

    #[test]
    fn test_clicked_index_exact_match() {
        let doc = Document::parse(
            r#"<article><img src="https://pbs.twimg.com/media/B.jpg"></article>"#,
            None,
        );
        let img = doc.select_first("img").unwrap();
        assert_eq!(api_clicked_index(&img, &[photo(0, "A"), photo(1, "B")]), 1);
    }
}
