//! Repository integration tests against a live PostgreSQL.
//!
//! Run with `cargo test -p moonbrain-db -- --ignored` after starting the test
//! database (see `DEFAULT_TEST_DATABASE_URL`).

use chrono::Utc;
use moonbrain_db::test_fixtures::{connect_test_database, seed_user};
use moonbrain_db::{
    GraphNodeLinks, GraphNoteLink, GraphNoteNode, Note, NoteFilter, NoteLink, NoteMeta,
    NoteRepository, TagRepository, UserRepository,
};
use uuid::Uuid;

fn note(author_id: Uuid, title: &str, published: bool) -> Note {
    let now = Utc::now();
    Note {
        id: format!("note-{}", Uuid::new_v4()),
        author_id,
        content: serde_json::json!({"type": "root", "children": []}),
        meta: NoteMeta {
            title: Some(title.to_string()),
            published,
            tags: vec!["integration".to_string()],
            ..Default::default()
        },
        created_at: now,
        updated_at: now,
        views: 0,
        likes: 0,
    }
}

fn link(source: &str, target: &str) -> GraphNoteLink {
    GraphNoteLink {
        source: source.to_string(),
        target: target.to_string(),
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_private_notes_visible_only_to_author() {
    dotenvy::dotenv().ok();
    let db = connect_test_database().await.unwrap();
    let author = seed_user(&db).await.unwrap();
    let other = seed_user(&db).await.unwrap();

    let private = note(author.id, "private draft", false);
    db.notes.insert(&private).await.unwrap();

    assert!(db.notes.get(&private.id, Some(author.id)).await.unwrap().is_some());
    assert!(db.notes.get(&private.id, Some(other.id)).await.unwrap().is_none());
    assert!(db.notes.get(&private.id, None).await.unwrap().is_none());

    let own = NoteFilter {
        user_id: Some(author.id),
        ..Default::default()
    };
    assert_eq!(db.notes.count(&own, true).await.unwrap(), 1);
    assert_eq!(db.notes.count(&own, false).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_duplicate_insert_is_conflict() {
    dotenvy::dotenv().ok();
    let db = connect_test_database().await.unwrap();
    let author = seed_user(&db).await.unwrap();

    let n = note(author.id, "once", true);
    db.notes.insert(&n).await.unwrap();
    let err = db.notes.insert(&n).await.unwrap_err();
    assert!(matches!(err, moonbrain_db::Error::Conflict(_)));
    assert!(err.is_unique_violation());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_bulk_upsert_preserves_created_at_and_foreign_notes() {
    dotenvy::dotenv().ok();
    let db = connect_test_database().await.unwrap();
    let author = seed_user(&db).await.unwrap();
    let intruder = seed_user(&db).await.unwrap();

    let original = note(author.id, "v1", true);
    db.notes.bulk_upsert(std::slice::from_ref(&original)).await.unwrap();
    let stored = db.notes.get(&original.id, None).await.unwrap().unwrap();

    let mut updated = original.clone();
    updated.meta.title = Some("v2".to_string());
    assert_eq!(
        db.notes.bulk_upsert(&[updated]).await.unwrap(),
        vec![original.id.clone()]
    );

    let mut hijack = original.clone();
    hijack.author_id = intruder.id;
    hijack.meta.title = Some("hijacked".to_string());
    assert!(db.notes.bulk_upsert(&[hijack]).await.unwrap().is_empty());

    let after = db.notes.get(&original.id, None).await.unwrap().unwrap();
    assert_eq!(after.meta.title.as_deref(), Some("v2"));
    assert_eq!(after.author_id, author.id);
    assert_eq!(after.created_at, stored.created_at);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_search_matches_title() {
    dotenvy::dotenv().ok();
    let db = connect_test_database().await.unwrap();
    let author = seed_user(&db).await.unwrap();

    let marker = format!("zebra{}", Uuid::new_v4().simple());
    db.notes
        .bulk_upsert(&[note(author.id, &marker, true), note(author.id, "unrelated", true)])
        .await
        .unwrap();

    let filter = NoteFilter {
        user_id: Some(author.id),
        search_text: Some(marker.clone()),
        ..Default::default()
    };
    let found = db.notes.list(&filter, false).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].meta.title.as_deref(), Some(marker.as_str()));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_tags_are_deduplicated() {
    dotenvy::dotenv().ok();
    let db = connect_test_database().await.unwrap();

    let tag = format!("tag-{}", Uuid::new_v4().simple());
    db.tags
        .bulk_upsert(&[tag.clone(), tag.clone()])
        .await
        .unwrap();
    db.tags.bulk_upsert(&[tag.clone()]).await.unwrap();

    let tags = db.tags.list_all().await.unwrap();
    assert_eq!(tags.iter().filter(|t| **t == tag).count(), 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_find_by_session_and_api_token() {
    dotenvy::dotenv().ok();
    let db = connect_test_database().await.unwrap();
    let user = seed_user(&db).await.unwrap();
    let session = user.token.clone().unwrap();

    let by_session = db.users.find_by_token(&session).await.unwrap().unwrap();
    assert_eq!(by_session.id, user.id);

    let api_token = db
        .users
        .create_api_token(user.id, &format!("key-{}", Uuid::new_v4()), "w")
        .await
        .unwrap();
    let by_key = db.users.find_by_token(&api_token.token).await.unwrap().unwrap();
    assert_eq!(by_key.id, user.id);

    assert!(db.users.delete_api_token(user.id, api_token.id).await.unwrap());
    assert!(!db.users.delete_api_token(user.id, api_token.id).await.unwrap());
    assert!(db.users.find_by_token(&api_token.token).await.unwrap().is_none());

    db.users.clear_session_token(user.id).await.unwrap();
    assert!(db.users.find_by_token(&session).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_concurrent_graph_updates_keep_all_links() {
    dotenvy::dotenv().ok();
    let db = connect_test_database().await.unwrap();
    let user = seed_user(&db).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let db = db.clone();
        let id = format!("n{i}");
        handles.push(tokio::spawn(async move {
            let update = GraphNodeLinks {
                node: GraphNoteNode {
                    id: id.clone(),
                    title: id.clone(),
                    weight: 1,
                },
                links: vec![link(&id, "hub")],
            };
            db.users.upsert_graph_node(user.id, &update).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let graph = db.users.get_note_graph(user.id).await.unwrap();
    assert_eq!(graph.nodes.len(), 8);
    assert_eq!(graph.links.len(), 8);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_linked_note_meta_round_trips() {
    dotenvy::dotenv().ok();
    let db = connect_test_database().await.unwrap();
    let author = seed_user(&db).await.unwrap();

    let mut n = note(author.id, "linked", true);
    n.meta.linked_articles = Some(vec![NoteLink {
        url: "id:other".to_string(),
        name: "Other".to_string(),
    }]);
    let stored = db.notes.insert(&n).await.unwrap();
    assert_eq!(stored.meta, n.meta);
}
