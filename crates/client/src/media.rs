//! Media URL resolution: CDN when configured, signed URLs on request, and a
//! direct backend stream URL whenever anything goes wrong.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use concord_shared::{ApiError, CdnInfo, MediaQuality, SignedUrl};

use crate::api_client::ApiClient;

/// Backend calls needed to resolve a media URL.
#[async_trait(?Send)]
pub trait MediaBackend {
    async fn cdn_info(&self) -> Result<CdnInfo, ApiError>;
    async fn signed_url(&self, hash: &str, quality: MediaQuality) -> Result<SignedUrl, ApiError>;
    /// Origin stream URL; never fails.
    fn direct_url(&self, hash: &str, quality: MediaQuality) -> String;
}

#[async_trait(?Send)]
impl MediaBackend for ApiClient {
    async fn cdn_info(&self) -> Result<CdnInfo, ApiError> {
        ApiClient::cdn_info(self).await
    }

    async fn signed_url(&self, hash: &str, quality: MediaQuality) -> Result<SignedUrl, ApiError> {
        ApiClient::signed_url(self, hash, quality).await
    }

    fn direct_url(&self, hash: &str, quality: MediaQuality) -> String {
        self.url(&direct_path(hash, quality))
    }
}

/// `/api/media/{hash}/stream[?quality=..]`, or `/thumbnail` for thumbnails.
pub fn direct_path(hash: &str, quality: MediaQuality) -> String {
    let hash = urlencoding::encode(hash);
    match quality {
        MediaQuality::Thumbnail => format!("/api/media/{hash}/thumbnail"),
        q => with_quality(format!("/api/media/{hash}/stream"), q),
    }
}

/// `{base}/media/{hash}[?quality=..]`, or `/thumbnail` for thumbnails.
pub fn cdn_url(base_url: &str, hash: &str, quality: MediaQuality) -> String {
    let base = base_url.trim_end_matches('/');
    let hash = urlencoding::encode(hash);
    match quality {
        MediaQuality::Thumbnail => format!("{base}/media/{hash}/thumbnail"),
        q => with_quality(format!("{base}/media/{hash}"), q),
    }
}

fn with_quality(url: String, quality: MediaQuality) -> String {
    match quality.query_value() {
        Some(q) => format!("{url}?quality={q}"),
        None => url,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRequest {
    pub hash: String,
    pub quality: MediaQuality,
    pub signed: bool,
    pub enabled: bool,
}

impl MediaRequest {
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            quality: MediaQuality::Original,
            signed: false,
            enabled: true,
        }
    }

    pub fn quality(mut self, quality: MediaQuality) -> Self {
        self.quality = quality;
        self
    }

    pub fn signed(mut self, signed: bool) -> Self {
        self.signed = signed;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    fn is_active(&self) -> bool {
        self.enabled && !self.hash.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaUrlResolution {
    pub url: Option<String>,
    pub is_cdn: bool,
    pub expires_at: Option<DateTime<Utc>>,
    /// Set when the URL is a fallback after a failed backend call.
    pub error: Option<ApiError>,
}

impl MediaUrlResolution {
    /// Whether a signed URL expires within `window` of `now`.
    pub fn expires_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.expires_at.is_some_and(|at| at - now <= window)
    }
}

/// Resolves content hashes to URLs. Clones share the CDN configuration cache.
#[derive(Clone)]
pub struct MediaUrlResolver {
    backend: Rc<dyn MediaBackend>,
    cdn_cache: Rc<RefCell<Option<CdnInfo>>>,
}

impl MediaUrlResolver {
    pub fn new(backend: Rc<dyn MediaBackend>) -> Self {
        Self {
            backend,
            cdn_cache: Rc::new(RefCell::new(None)),
        }
    }

    /// CDN configuration, fetched at most once successfully.
    async fn cdn_info(&self) -> Result<CdnInfo, ApiError> {
        if let Some(info) = self.cdn_cache.borrow().clone() {
            return Ok(info);
        }
        let info = self.backend.cdn_info().await?;
        *self.cdn_cache.borrow_mut() = Some(info.clone());
        Ok(info)
    }

    pub async fn resolve(&self, request: &MediaRequest) -> MediaUrlResolution {
        if !request.is_active() {
            return MediaUrlResolution::default();
        }
        let (hash, quality) = (request.hash.as_str(), request.quality);

        match self.try_resolve(request).await {
            Ok(resolution) => resolution,
            Err(error) => {
                crate::log_warn!(
                    "media: falling back to direct URL for {}: {}",
                    hash,
                    error
                );
                MediaUrlResolution {
                    url: Some(self.backend.direct_url(hash, quality)),
                    is_cdn: false,
                    expires_at: None,
                    error: Some(error),
                }
            }
        }
    }

    async fn try_resolve(&self, request: &MediaRequest) -> Result<MediaUrlResolution, ApiError> {
        let (hash, quality) = (request.hash.as_str(), request.quality);
        let cdn = self.cdn_info().await?;

        let mut resolution = match cdn.active_base() {
            Some(base) => MediaUrlResolution {
                url: Some(cdn_url(base, hash, quality)),
                is_cdn: true,
                ..Default::default()
            },
            None => MediaUrlResolution {
                url: Some(self.backend.direct_url(hash, quality)),
                ..Default::default()
            },
        };

        if request.signed {
            let signed = self.backend.signed_url(hash, quality).await?;
            resolution.url = Some(signed.url);
            resolution.expires_at = signed.expires_at;
        }
        Ok(resolution)
    }
}
