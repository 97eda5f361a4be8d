//! Card comments
//!
//! Threaded (one level) card comments with hashtag subtask tagging: the
//! first `#word` in a comment that matches a subtask title on the same card
//! tags that subtask, and its assignee gets a private nudge.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use tb_core::error::{TbError, TbResult};
use tb_core::traits::{Id, UserContext};
use tb_models::Comment;
use tb_realtime::broadcast::EventPublisher;
use tb_realtime::event::DomainEvent;
use tb_realtime::room::RoomKind;

use crate::store::WorkflowStore;

static HASHTAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\w+)").expect("hashtag pattern"));

/// Input for comment creation
#[derive(Debug, Clone, Default)]
pub struct NewComment {
    pub text: String,
    pub parent_comment_id: Option<Id>,
}

/// A top-level comment with its direct replies
#[derive(Debug, Clone, serde::Serialize)]
pub struct CommentThread {
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

pub struct CommentFlow {
    store: Arc<dyn WorkflowStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl CommentFlow {
    pub fn new(store: Arc<dyn WorkflowStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { store, publisher }
    }

    pub async fn create(
        &self,
        card_id: Id,
        input: NewComment,
        ctx: &dyn UserContext,
    ) -> TbResult<Comment> {
        if input.text.trim().is_empty() {
            return Err(TbError::validation("Comment text is required"));
        }
        self.store.card(card_id).await?;

        if let Some(parent_id) = input.parent_comment_id {
            let parent = self.store.comment(parent_id).await?;
            if parent.card_id != card_id {
                return Err(TbError::validation(
                    "Parent comment belongs to a different card",
                ));
            }
            if parent.is_reply() {
                return Err(TbError::validation("Replies cannot be nested further"));
            }
        }

        let tagged = self.detect_subtask(card_id, &input.text).await?;

        let mut comment = Comment::new(card_id, ctx.user_id(), input.text);
        comment.parent_comment_id = input.parent_comment_id;
        comment.subtask_id = tagged.as_ref().and_then(|s| s.id);
        let comment = self.store.insert_comment(comment).await?;

        self.publisher.publish(
            RoomKind::Card(card_id),
            DomainEvent::CommentNew {
                comment: comment.clone(),
            },
        );
        if let Some(subtask) = tagged {
            if let (Some(subtask_id), Some(assignee)) = (subtask.id, subtask.assigned_to) {
                if assignee != ctx.user_id() {
                    self.publisher.publish(
                        RoomKind::User(assignee),
                        DomainEvent::SubtaskCommented {
                            subtask_id,
                            card_id,
                            message: format!("New comment on \"{}\"", subtask.title),
                        },
                    );
                }
            }
        }
        Ok(comment)
    }

    /// Top-level comments with their replies, oldest first.
    pub async fn list_by_card(&self, card_id: Id) -> TbResult<Vec<CommentThread>> {
        self.store.card(card_id).await?;
        let all = self.store.comments_by_card(card_id).await?;
        let mut threads: Vec<CommentThread> = all
            .iter()
            .filter(|c| !c.is_reply())
            .map(|c| CommentThread {
                comment: c.clone(),
                replies: Vec::new(),
            })
            .collect();
        for reply in all.iter().filter(|c| c.is_reply()) {
            if let Some(thread) = threads
                .iter_mut()
                .find(|t| t.comment.id == reply.parent_comment_id)
            {
                thread.replies.push(reply.clone());
            }
        }
        Ok(threads)
    }

    /// Edit a comment's text; author only.
    pub async fn update(&self, comment_id: Id, text: String, ctx: &dyn UserContext) -> TbResult<Comment> {
        if text.trim().is_empty() {
            return Err(TbError::validation("Comment text is required"));
        }
        let existing = self.store.comment(comment_id).await?;
        if existing.user_id != ctx.user_id() {
            return Err(TbError::forbidden("Only the author can edit a comment"));
        }
        let comment = self.store.update_comment_text(comment_id, text).await?;
        self.publisher.publish(
            RoomKind::Card(comment.card_id),
            DomainEvent::CommentUpdated {
                comment: comment.clone(),
            },
        );
        Ok(comment)
    }

    /// Delete a comment; author or admin.
    pub async fn delete(&self, comment_id: Id, ctx: &dyn UserContext) -> TbResult<()> {
        let existing = self.store.comment(comment_id).await?;
        if existing.user_id != ctx.user_id() && !ctx.is_admin() {
            return Err(TbError::forbidden(
                "Only the author or an admin can delete a comment",
            ));
        }
        let deleted = self.store.delete_comment(comment_id).await?;
        self.publisher.publish(
            RoomKind::Card(deleted.card_id),
            DomainEvent::CommentDeleted {
                comment_id,
                card_id: deleted.card_id,
            },
        );
        Ok(())
    }

    /// First `#word` matching a subtask title on this card, if any.
    async fn detect_subtask(
        &self,
        card_id: Id,
        text: &str,
    ) -> TbResult<Option<tb_models::Subtask>> {
        for capture in HASHTAG.captures_iter(text) {
            let name = &capture[1];
            if let Some(subtask) = self.store.find_subtask_by_title(card_id, name).await? {
                debug!(card_id, tag = name, "Comment tagged a subtask");
                return Ok(Some(subtask));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use tb_models::{Board, Card, Project, Subtask};
    use tb_realtime::broadcast::RecordingPublisher;

    struct Author;
    impl UserContext for Author {
        fn user_id(&self) -> Id {
            7
        }
        fn is_admin(&self) -> bool {
            false
        }
        fn is_team_lead(&self) -> bool {
            false
        }
    }

    struct Admin;
    impl UserContext for Admin {
        fn user_id(&self) -> Id {
            1
        }
        fn is_admin(&self) -> bool {
            true
        }
        fn is_team_lead(&self) -> bool {
            false
        }
    }

    async fn card_fixture(store: &MemoryStore) -> Id {
        let project = store.seed_project(Project::new("p", 1)).await;
        let board = store
            .seed_board(Board::new(project.id.unwrap(), "b"))
            .await;
        store
            .seed_card(Card::new(board.id.unwrap(), "c", 1))
            .await
            .id
            .unwrap()
    }

    #[tokio::test]
    async fn test_hashtag_tags_card_scoped_subtask() {
        let store = Arc::new(MemoryStore::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let card_id = card_fixture(&store).await;
        let mut subtask = Subtask::new(card_id, "login", 1);
        subtask.assigned_to = Some(9);
        let subtask = store.seed_subtask(subtask).await;

        let flow = CommentFlow::new(store.clone(), publisher.clone());
        let comment = flow
            .create(
                card_id,
                NewComment {
                    text: "the #login flow breaks on empty input".into(),
                    parent_comment_id: None,
                },
                &Author,
            )
            .await
            .unwrap();

        assert_eq!(comment.subtask_id, subtask.id);
        assert_eq!(
            publisher.event_names(),
            vec!["comment:new", "subtask_commented"]
        );
        assert_eq!(
            publisher.rooms(),
            vec![RoomKind::Card(card_id), RoomKind::User(9)]
        );
    }

    #[tokio::test]
    async fn test_hashtag_without_match_leaves_comment_untagged() {
        let store = Arc::new(MemoryStore::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let card_id = card_fixture(&store).await;

        let flow = CommentFlow::new(store.clone(), publisher.clone());
        let comment = flow
            .create(
                card_id,
                NewComment {
                    text: "see #nonexistent".into(),
                    parent_comment_id: None,
                },
                &Author,
            )
            .await
            .unwrap();
        assert_eq!(comment.subtask_id, None);
        assert_eq!(publisher.event_names(), vec!["comment:new"]);
    }

    #[tokio::test]
    async fn test_no_self_nudge_for_own_subtask() {
        let store = Arc::new(MemoryStore::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let card_id = card_fixture(&store).await;
        let mut subtask = Subtask::new(card_id, "login", 1);
        subtask.assigned_to = Some(7);
        store.seed_subtask(subtask).await;

        let flow = CommentFlow::new(store.clone(), publisher.clone());
        flow.create(
            card_id,
            NewComment {
                text: "note to self about #login".into(),
                parent_comment_id: None,
            },
            &Author,
        )
        .await
        .unwrap();
        assert_eq!(publisher.event_names(), vec!["comment:new"]);
    }

    #[tokio::test]
    async fn test_reply_nesting_is_one_level() {
        let store = Arc::new(MemoryStore::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let card_id = card_fixture(&store).await;
        let flow = CommentFlow::new(store.clone(), publisher.clone());

        let top = flow
            .create(
                card_id,
                NewComment {
                    text: "top".into(),
                    parent_comment_id: None,
                },
                &Author,
            )
            .await
            .unwrap();
        let reply = flow
            .create(
                card_id,
                NewComment {
                    text: "reply".into(),
                    parent_comment_id: top.id,
                },
                &Author,
            )
            .await
            .unwrap();

        let err = flow
            .create(
                card_id,
                NewComment {
                    text: "reply to reply".into(),
                    parent_comment_id: reply.id,
                },
                &Author,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TbError::Validation { .. }));

        let threads = flow.list_by_card(card_id).await.unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].replies.len(), 1);
    }

    #[tokio::test]
    async fn test_update_is_author_only() {
        let store = Arc::new(MemoryStore::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let card_id = card_fixture(&store).await;
        let flow = CommentFlow::new(store.clone(), publisher.clone());
        let comment = flow
            .create(
                card_id,
                NewComment {
                    text: "original".into(),
                    parent_comment_id: None,
                },
                &Author,
            )
            .await
            .unwrap();

        let err = flow
            .update(comment.id.unwrap(), "hijacked".into(), &Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, TbError::Forbidden { .. }));

        let updated = flow
            .update(comment.id.unwrap(), "edited".into(), &Author)
            .await
            .unwrap();
        assert_eq!(updated.text, "edited");
    }

    #[tokio::test]
    async fn test_delete_by_admin_broadcasts() {
        let store = Arc::new(MemoryStore::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let card_id = card_fixture(&store).await;
        let flow = CommentFlow::new(store.clone(), publisher.clone());
        let comment = flow
            .create(
                card_id,
                NewComment {
                    text: "to delete".into(),
                    parent_comment_id: None,
                },
                &Author,
            )
            .await
            .unwrap();
        publisher.clear();

        flow.delete(comment.id.unwrap(), &Admin).await.unwrap();
        assert_eq!(publisher.event_names(), vec!["comment:deleted"]);
        assert!(store.comment(comment.id.unwrap()).await.is_err());
    }
}
