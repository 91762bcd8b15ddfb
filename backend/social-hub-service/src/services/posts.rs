use super::{
    media, require_user, required, EventRouter, MediaStore, MediaUpload, NotificationDispatcher,
};
use crate::error::{AppError, Result};
use crate::models::{
    Comment, CommentWithAuthor, NewComment, NewNotification, NewPost, NotificationKind,
    NotificationSubject, PostPrivacy, PostWithAuthor, Share,
};
use crate::repository::{PostRepository, UserRepository};
use crate::websocket::ServerEvent;
use std::sync::Arc;
use uuid::Uuid;

/// Posts and the reactions on them (likes, comments, shares)
#[derive(Clone)]
pub struct PostService {
    users: Arc<dyn UserRepository>,
    posts: Arc<dyn PostRepository>,
    media: Arc<dyn MediaStore>,
    dispatcher: NotificationDispatcher,
    router: EventRouter,
}

impl PostService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        posts: Arc<dyn PostRepository>,
        media: Arc<dyn MediaStore>,
        dispatcher: NotificationDispatcher,
        router: EventRouter,
    ) -> Self {
        Self {
            users,
            posts,
            media,
            dispatcher,
            router,
        }
    }

    async fn require_post_owner(&self, post_id: Uuid) -> Result<Uuid> {
        self.posts
            .find_owner(post_id)
            .await?
            .ok_or_else(|| AppError::not_found("Post not found"))
    }

    /// Needs text, media, or both. Every open channel hears about the new post.
    pub async fn create_post(
        &self,
        user_id: Uuid,
        content: Option<&str>,
        privacy: Option<&str>,
        media: Option<MediaUpload>,
    ) -> Result<PostWithAuthor> {
        let content = content.map(str::trim).unwrap_or_default();
        if content.is_empty() && media.is_none() {
            return Err(AppError::validation(
                "User ID and either content or media are required",
            ));
        }
        let privacy = match privacy.map(str::trim).filter(|p| !p.is_empty()) {
            Some(raw) => PostPrivacy::parse(raw)
                .ok_or_else(|| AppError::validation(format!("Unknown privacy '{}'", raw)))?,
            None => PostPrivacy::default(),
        };
        require_user(self.users.as_ref(), user_id, "User not found").await?;

        let media_url = match media {
            Some(upload) => Some(self.media.store(upload).await?),
            None => None,
        };

        let created = self
            .posts
            .create_post(NewPost {
                user_id,
                content: content.to_string(),
                media_url: media_url.clone(),
                privacy,
            })
            .await;
        let post = match (created, media_url) {
            (Ok(post), _) => post,
            (Err(e), Some(url)) => {
                media::discard(self.media.as_ref(), &url).await;
                return Err(e);
            }
            (Err(e), None) => return Err(e),
        };

        tracing::info!(post_id = %post.id, user_id = %user_id, privacy = privacy.as_str(), "post created");
        self.router.broadcast(ServerEvent::NewPost(post.clone())).await;
        Ok(post)
    }

    pub async fn feed(&self, viewer_id: Uuid) -> Result<Vec<PostWithAuthor>> {
        self.posts.visible_feed(viewer_id).await
    }

    /// One like per (post, user); a repeat is a `Conflict` and notifies nobody
    pub async fn like(&self, post_id: Uuid, user_id: Uuid) -> Result<()> {
        let owner_id = self.require_post_owner(post_id).await?;
        let liker = require_user(self.users.as_ref(), user_id, "User not found").await?;

        if !self.posts.insert_like(post_id, user_id).await? {
            return Err(AppError::conflict("You have already liked this post"));
        }

        self.dispatcher
            .notify(
                NewNotification::new(
                    owner_id,
                    user_id,
                    NotificationKind::Like,
                    format!("{} liked your post", liker.username),
                )
                .about(NotificationSubject::Post(post_id)),
            )
            .await?;

        self.router.broadcast(ServerEvent::NewLike { post_id }).await;
        Ok(())
    }

    pub async fn like_count(&self, post_id: Uuid) -> Result<i64> {
        self.require_post_owner(post_id).await?;
        self.posts.like_count(post_id).await
    }

    /// Every comment is stored; the owner is notified once per commenter
    pub async fn comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        content: Option<&str>,
    ) -> Result<Comment> {
        let content = required(content, "All fields are required")?;
        let owner_id = self.require_post_owner(post_id).await?;
        let commenter = require_user(self.users.as_ref(), user_id, "User not found").await?;

        let comment = self
            .posts
            .insert_comment(NewComment {
                post_id,
                user_id,
                content: content.to_string(),
            })
            .await?;

        self.dispatcher
            .notify(
                NewNotification::new(
                    owner_id,
                    user_id,
                    NotificationKind::Comment,
                    format!("{} commented on your post", commenter.username),
                )
                .about(NotificationSubject::Post(post_id)),
            )
            .await?;

        self.router
            .broadcast(ServerEvent::NewComment {
                post_id,
                comment_id: comment.id,
                user_id,
                content: comment.content.clone(),
            })
            .await;
        Ok(comment)
    }

    pub async fn comments(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>> {
        self.posts.comments_for(post_id).await
    }

    /// Every share is stored; the owner is notified once per sharer
    pub async fn share(&self, post_id: Uuid, user_id: Uuid) -> Result<Share> {
        let owner_id = self.require_post_owner(post_id).await?;
        let sharer = require_user(self.users.as_ref(), user_id, "User not found").await?;

        let share = self.posts.insert_share(post_id, user_id).await?;

        self.dispatcher
            .notify(
                NewNotification::new(
                    owner_id,
                    user_id,
                    NotificationKind::Share,
                    format!("{} shared your post", sharer.username),
                )
                .about(NotificationSubject::Post(post_id)),
            )
            .await?;
        Ok(share)
    }
}
