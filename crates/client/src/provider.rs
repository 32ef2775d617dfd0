//! App-root provider for the shared client services.

use std::rc::Rc;

use dioxus::prelude::*;
use futures_channel::mpsc::unbounded;

use crate::api_client::ApiClient;
use crate::config::ClientConfig;
use crate::media::MediaUrlResolver;
use crate::socket::{SocketManager, WsTransport};
use crate::storage::{platform_store, SessionStore};

/// Builds the client services once and provides them to every descendant:
/// [`ClientConfig`], [`ApiClient`], [`SocketManager`], [`MediaUrlResolver`]
/// and `Rc<dyn SessionStore>`.
///
/// The socket pump runs for as long as the provider is mounted. With
/// `auto_connect` set the connection is opened immediately.
#[component]
pub fn ConcordProvider(children: Element) -> Element {
    let config = use_hook(ClientConfig::from_env);

    let socket_config = config.clone();
    let manager = use_hook(move || {
        let (events, receiver) = unbounded();
        let transport = WsTransport::new(
            socket_config.socket_url.clone(),
            socket_config.reconnect.clone(),
            events,
        );
        let manager = SocketManager::new(Rc::new(transport));
        spawn(manager.clone().run(receiver));

        crate::log_info!(
            "ConcordProvider: api={} socket={}",
            socket_config.api_base_url,
            socket_config.socket_url
        );
        if socket_config.auto_connect {
            manager.connect();
        }
        manager
    });

    let on_unmount = manager.clone();
    use_drop(move || on_unmount.disconnect());

    let api_base = config.api_base_url.clone();
    let api = use_hook(move || ApiClient::new().with_base_url(api_base));
    use_context_provider(|| config);
    use_context_provider(|| manager);
    let media_api = api.clone();
    use_context_provider(move || MediaUrlResolver::new(Rc::new(media_api)));
    use_context_provider(|| api);
    use_context_provider::<Rc<dyn SessionStore>>(platform_store);

    children
}
