//! End-to-end workflow scenarios against the in-memory store.

use std::sync::Arc;

use tb_core::traits::{Id, UserContext};
use tb_models::{
    AssignmentStatus, CardStatus, CommentCategory, ProjectStatus, ReviewDecision, SubtaskStatus,
    UserTaskStatus,
};
use tb_realtime::broadcast::RecordingPublisher;
use tb_workflow::{
    CardWorkflow, CommentFlow, MemoryStore, NewCard, NewProject, ProjectFlow, SubtaskFlow,
    TimeLedger, WorkflowStore,
};

struct Actor {
    id: Id,
    admin: bool,
    lead: bool,
}

impl UserContext for Actor {
    fn user_id(&self) -> Id {
        self.id
    }
    fn is_admin(&self) -> bool {
        self.admin
    }
    fn is_team_lead(&self) -> bool {
        self.lead
    }
}

const LEAD: Actor = Actor {
    id: 1,
    admin: false,
    lead: true,
};
const DEV: Actor = Actor {
    id: 7,
    admin: false,
    lead: false,
};
const ADMIN: Actor = Actor {
    id: 100,
    admin: true,
    lead: false,
};

struct World {
    store: Arc<MemoryStore>,
    publisher: Arc<RecordingPublisher>,
    projects: ProjectFlow,
    cards: CardWorkflow,
    subtasks: SubtaskFlow,
    comments: CommentFlow,
    ledger: TimeLedger,
}

fn world() -> World {
    let store = Arc::new(MemoryStore::new());
    let publisher = Arc::new(RecordingPublisher::new());
    World {
        projects: ProjectFlow::new(store.clone(), publisher.clone()),
        cards: CardWorkflow::new(store.clone(), publisher.clone()),
        subtasks: SubtaskFlow::new(store.clone(), publisher.clone()),
        comments: CommentFlow::new(store.clone(), publisher.clone()),
        ledger: TimeLedger::new(store.clone(), publisher.clone()),
        store,
        publisher,
    }
}

/// Seed a project/board/card with one subtask, assignment held by DEV.
async fn seeded_card(w: &World) -> (Id, Id, Id) {
    let detail = w
        .projects
        .create(
            NewProject {
                name: "Platform rewrite".into(),
                members: vec![(DEV.id, "member".into())],
                ..Default::default()
            },
            &LEAD,
        )
        .await
        .unwrap();
    let project_id = detail.project.id.unwrap();
    let board = w
        .projects
        .create_board(project_id, "Sprint 1".into())
        .await
        .unwrap();
    let board_id = board.id.unwrap();

    let card = w
        .cards
        .create(
            board_id,
            NewCard {
                title: "Auth service".into(),
                assignee_ids: vec![DEV.id],
                subtask_titles: vec!["Token flow".into()],
                ..Default::default()
            },
            &LEAD,
        )
        .await
        .unwrap();
    let card_id = card.card.id.unwrap();
    let subtask_id = card.subtasks[0].id.unwrap();
    (board_id, card_id, subtask_id)
}

#[tokio::test]
async fn full_single_subtask_lifecycle() {
    let w = world();
    let (_board_id, card_id, subtask_id) = seeded_card(&w).await;

    // Start: everything moves to in_progress.
    w.ledger.start(DEV.id, subtask_id).await.unwrap();
    assert_eq!(
        w.store.card(card_id).await.unwrap().status,
        CardStatus::InProgress
    );
    assert_eq!(w.store.user_task_status(DEV.id).await, UserTaskStatus::Working);

    // End: subtask and card go to review, duration settled.
    let log = w.ledger.end(DEV.id, subtask_id, None).await.unwrap();
    assert!(log.duration_seconds.is_some());
    assert_eq!(
        w.store.subtask(subtask_id).await.unwrap().status,
        SubtaskStatus::Review
    );
    assert_eq!(
        w.store.card(card_id).await.unwrap().status,
        CardStatus::Review
    );

    // Approving the only subtask settles the card as done.
    w.subtasks
        .review(subtask_id, ReviewDecision::Approved, None, &LEAD)
        .await
        .unwrap();
    let card = w.store.card(card_id).await.unwrap();
    assert_eq!(card.status, CardStatus::Done);
    assert!(card.actual_hours.is_some());

    let assignments = w.store.assignments_by_card(card_id).await.unwrap();
    assert!(assignments
        .iter()
        .all(|a| a.status == AssignmentStatus::Completed));
}

#[tokio::test]
async fn rejection_returns_work_and_records_reason() {
    let w = world();
    let (_board_id, card_id, subtask_id) = seeded_card(&w).await;

    w.ledger.start(DEV.id, subtask_id).await.unwrap();
    w.ledger.end(DEV.id, subtask_id, None).await.unwrap();
    w.publisher.clear();

    w.subtasks
        .review(
            subtask_id,
            ReviewDecision::Rejected,
            Some("edge cases missing".into()),
            &LEAD,
        )
        .await
        .unwrap();

    let subtask = w.store.subtask(subtask_id).await.unwrap();
    assert_eq!(subtask.status, SubtaskStatus::InProgress);
    assert_eq!(
        w.store.card(card_id).await.unwrap().status,
        CardStatus::InProgress
    );

    let comments = w.store.comments_by_card(card_id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].category, CommentCategory::Reject);
    assert_eq!(comments[0].text, "edge cases missing");

    // The assignee can pick the subtask back up.
    w.ledger.start(DEV.id, subtask_id).await.unwrap();
    let second = w.ledger.end(DEV.id, subtask_id, None).await.unwrap();
    assert!(second.duration_seconds.is_some());
}

#[tokio::test]
async fn single_active_task_across_cards() {
    let w = world();
    let (board_id, _card_id, subtask_id) = seeded_card(&w).await;

    // A second card with its own subtask, same assignee.
    let other = w
        .cards
        .create(
            board_id,
            NewCard {
                title: "Billing".into(),
                assignee_ids: vec![DEV.id],
                subtask_titles: vec!["Invoices".into()],
                ..Default::default()
            },
            &LEAD,
        )
        .await
        .unwrap();
    let other_subtask = other.subtasks[0].id.unwrap();

    w.ledger.start(DEV.id, subtask_id).await.unwrap();
    assert!(w.ledger.start(DEV.id, other_subtask).await.is_err());

    // After ending the first, the other becomes startable.
    w.ledger.end(DEV.id, subtask_id, None).await.unwrap();
    w.ledger.start(DEV.id, other_subtask).await.unwrap();
}

#[tokio::test]
async fn project_approval_frees_everyone() {
    let w = world();
    let (board_id, card_id, subtask_id) = seeded_card(&w).await;

    w.ledger.start(DEV.id, subtask_id).await.unwrap();
    w.ledger.end(DEV.id, subtask_id, None).await.unwrap();
    w.subtasks
        .review(subtask_id, ReviewDecision::Approved, None, &LEAD)
        .await
        .unwrap();
    assert_eq!(w.store.card(card_id).await.unwrap().status, CardStatus::Done);

    let project = w.projects.request_review(board_id, &LEAD).await.unwrap();
    assert_eq!(project.status, ProjectStatus::Review);

    let project_id = project.id.unwrap();
    w.projects.approve(project_id, &ADMIN).await.unwrap();
    assert_eq!(w.store.user_task_status(DEV.id).await, UserTaskStatus::Available);
    assert_eq!(w.store.user_task_status(LEAD.id).await, UserTaskStatus::Available);
}

#[tokio::test]
async fn comment_hashtag_reaches_assignee() {
    let w = world();
    let (_board_id, card_id, _subtask_id) = seeded_card(&w).await;
    let mut deploy = tb_models::Subtask::new(card_id, "deploy", LEAD.id);
    deploy.assigned_to = Some(DEV.id);
    let deploy = w.store.seed_subtask(deploy).await;
    w.publisher.clear();

    // Tag matching is exact title equality, case-insensitive.
    let comment = w
        .comments
        .create(
            card_id,
            tb_workflow::NewComment {
                text: "the #Deploy step needs a rollback plan".into(),
                parent_comment_id: None,
            },
            &LEAD,
        )
        .await
        .unwrap();
    assert_eq!(comment.subtask_id, deploy.id);
    assert_eq!(
        w.publisher.event_names(),
        vec!["comment:new", "subtask_commented"]
    );

    // A tag matching nothing on this card leaves the comment untagged.
    let untagged = w
        .comments
        .create(
            card_id,
            tb_workflow::NewComment {
                text: "see #elsewhere".into(),
                parent_comment_id: None,
            },
            &LEAD,
        )
        .await
        .unwrap();
    assert_eq!(untagged.subtask_id, None);
}
