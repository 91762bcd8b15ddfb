use crate::{
    config::Config,
    repository::Repositories,
    services::{
        EventRouter, FriendshipService, GroupService, LocalMediaStore, MediaStore,
        MessagingService, NotificationDispatcher, PostService, PrefixAutoResponder, UserService,
    },
    websocket::PresenceRegistry,
};
use std::sync::Arc;

/// Shared by every worker; all fields are cheap handles
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub repos: Repositories,
    pub registry: PresenceRegistry,
    pub router: EventRouter,
    pub dispatcher: NotificationDispatcher,
    pub users: UserService,
    pub posts: PostService,
    pub friendships: FriendshipService,
    pub groups: GroupService,
    pub messaging: MessagingService,
}

impl AppState {
    pub fn new(config: Config, repos: Repositories) -> Self {
        let media = Arc::new(LocalMediaStore::from_config(&config.media));
        Self::with_media(config, repos, media)
    }

    pub fn with_media(config: Config, repos: Repositories, media: Arc<dyn MediaStore>) -> Self {
        let registry = PresenceRegistry::new();
        let router = EventRouter::new(registry.clone());
        let dispatcher = NotificationDispatcher::new(repos.notifications.clone(), router.clone());
        let auto_responder = Arc::new(PrefixAutoResponder::from_config(&config.social));

        Self {
            users: UserService::new(repos.users.clone(), media.clone()),
            posts: PostService::new(
                repos.users.clone(),
                repos.posts.clone(),
                media,
                dispatcher.clone(),
                router.clone(),
            ),
            friendships: FriendshipService::new(
                repos.users.clone(),
                repos.friendships.clone(),
                dispatcher.clone(),
                router.clone(),
                auto_responder,
                config.social.suggestion_limit,
            ),
            groups: GroupService::new(
                repos.users.clone(),
                repos.groups.clone(),
                dispatcher.clone(),
            ),
            messaging: MessagingService::new(
                repos.users.clone(),
                repos.messages.clone(),
                router.clone(),
            ),
            config: Arc::new(config),
            repos,
            registry,
            router,
            dispatcher,
        }
    }

    /// Fresh in-memory store, used by tests and `STORE_BACKEND=memory`
    pub fn in_memory(config: Config) -> Self {
        Self::new(config, Repositories::in_memory())
    }
}
