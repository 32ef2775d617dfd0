use dioxus::prelude::*;

use crate::media::{MediaRequest, MediaUrlResolution, MediaUrlResolver};

/// Resolved media URL plus a way to force re-resolution.
#[derive(Clone, Copy)]
pub struct MediaUrlHandle {
    resource: Resource<MediaUrlResolution>,
    refresh: Signal<()>,
}

impl MediaUrlHandle {
    /// Latest resolution; empty while the first one is in flight.
    pub fn resolution(&self) -> MediaUrlResolution {
        self.resource
            .read()
            .as_ref()
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_loading(&self) -> bool {
        !self.resource.finished()
    }

    /// Resolve again, e.g. to renew a signed URL before it expires.
    pub fn refresh(&self) {
        let mut refresh = self.refresh;
        refresh.write();
    }
}

/// Resolve `request` to a playable URL.
///
/// Re-runs whenever `request` changes or [`MediaUrlHandle::refresh`] is
/// called. The future is owned by the calling component, so a resolution
/// still in flight at unmount never writes back.
///
/// ```rust,ignore
/// let request = use_signal(|| MediaRequest::new(hash).quality(MediaQuality::Hd));
/// let media = use_media_url(request.into());
///
/// rsx! {
///     if let Some(src) = media.resolution().url {
///         video { src }
///     }
///     button { onclick: move |_| media.refresh(), "Renew link" }
/// }
/// ```
pub fn use_media_url(request: ReadSignal<MediaRequest>) -> MediaUrlHandle {
    let resolver = use_context::<MediaUrlResolver>();
    let refresh = use_signal(|| ());

    let resource = use_resource(move || {
        refresh.read();
        let request = request.cloned();
        let resolver = resolver.clone();
        async move { resolver.resolve(&request).await }
    });

    MediaUrlHandle { resource, refresh }
}
