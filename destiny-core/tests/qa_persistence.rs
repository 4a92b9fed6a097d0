//! QA tests for durable state and failed-turn semantics.
//!
//! These tests verify that:
//! - A session reopened over the same directory sees all prior state
//! - A turn that fails mid-flight commits nothing to any store
//! - The same input can be retried after a collaborator outage
//!
//! Run with: `cargo test -p destiny-core --test qa_persistence`

use destiny_core::session::{GameSession, SessionConfig};
use destiny_core::testing::{FailingEmbedder, FailingModel, MockEmbedder, MockModel};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

async fn open_session(dir: &Path, responses: Vec<&str>) -> GameSession {
    GameSession::new(
        SessionConfig::new().with_storage_dir(dir),
        Arc::new(MockModel::new(responses)),
        Arc::new(MockEmbedder::new(16)),
    )
    .await
    .expect("session over storage dir")
}

// =============================================================================
// REOPEN SEES PRIOR STATE
// =============================================================================

#[tokio::test]
async fn test_reopened_session_sees_all_stores() {
    let temp_dir = TempDir::new().expect("temp directory");
    let raw = r#"Mira waves you over and mentions a missing shipment.
{"npcs": [{"npc_name": "Mira", "interaction": "tip", "context": "Mira told the player about a missing shipment"}],
 "quests": [{"quest_name": "Missing Shipment", "progress": "Started", "description": "Find the shipment", "reward": "20 gold", "mandatory": true}]}"#;

    {
        let mut session = open_session(temp_dir.path(), vec![raw, "Mira tipped the player off."]).await;
        session.player_action("talk to Mira").await.unwrap();
    }

    let mut session = open_session(temp_dir.path(), vec!["You set out.", "The player set out."]).await;

    assert_eq!(
        session.episodic().get_recent(5),
        vec!["Mira tipped the player off."]
    );
    assert_eq!(
        session.characters().get_memory("Mira", None, 5).await.unwrap(),
        vec!["Mira told the player about a missing shipment"]
    );
    let quest = session
        .quests()
        .get_active_quest_by_name("Missing Shipment")
        .expect("quest survives reopen");
    assert_eq!(quest.progress_status, 1);
    assert!(quest.mandatory);

    // And the reopened session keeps appending to the same files.
    session.player_action("set out").await.unwrap();
    let session = open_session(temp_dir.path(), vec![]).await;
    assert_eq!(session.episodic().len(), 2);
}

#[tokio::test]
async fn test_semantic_retrieval_survives_reopen() {
    let temp_dir = TempDir::new().expect("temp directory");

    {
        let mut session = open_session(
            temp_dir.path(),
            vec![
                "The dragon circles the mountain peak.",
                "A dragon was seen circling the mountain peak.",
                "The market bustles with traders.",
                "The player browsed the market.",
            ],
        )
        .await;
        session.player_action("watch the sky").await.unwrap();
        session.player_action("visit the market").await.unwrap();
    }

    let session = open_session(temp_dir.path(), vec![]).await;
    let hits = session
        .episodic()
        .retrieve("A dragon was seen circling the mountain peak.", 1)
        .await
        .unwrap();
    assert_eq!(hits, vec!["A dragon was seen circling the mountain peak."]);
}

// =============================================================================
// FAILED TURNS COMMIT NOTHING
// =============================================================================

#[tokio::test]
async fn test_model_outage_leaves_stores_untouched() {
    let temp_dir = TempDir::new().expect("temp directory");

    let mut session = GameSession::new(
        SessionConfig::new().with_storage_dir(temp_dir.path()),
        Arc::new(FailingModel),
        Arc::new(MockEmbedder::new(16)),
    )
    .await
    .unwrap();

    assert!(session.player_action("hello").await.is_err());
    assert!(session.episodic().is_empty());
    assert!(session.characters().is_empty());
    assert!(session.quests().get_active_quests().is_empty());
}

#[tokio::test]
async fn test_embedder_outage_then_retry_commits_once() {
    let temp_dir = TempDir::new().expect("temp directory");
    let raw = r#"Mira greets you.
{"npcs": [{"npc_name": "Mira", "interaction": "greeting", "context": "Mira greeted the player"}],
 "quests": [{"quest_name": "First Steps", "progress": "Started", "description": "Begin", "mandatory": true}]}"#;

    {
        // The summary embedding fails after generation succeeds; no store
        // may retain anything from the turn.
        let mut session = GameSession::new(
            SessionConfig::new().with_storage_dir(temp_dir.path()),
            Arc::new(MockModel::new(vec![raw, "Mira greeted the player."])),
            Arc::new(FailingEmbedder),
        )
        .await
        .unwrap();

        assert!(session.player_action("talk to Mira").await.is_err());
        assert!(session.episodic().is_empty());
        assert!(session.characters().is_empty());
        assert!(session.quests().get_active_quests().is_empty());
    }

    // Retrying the same input with the embedder back commits exactly once.
    let mut session = open_session(temp_dir.path(), vec![raw, "Mira greeted the player."]).await;
    let outcome = session.player_action("talk to Mira").await.unwrap();

    assert_eq!(outcome.npc_updates, vec!["Mira"]);
    assert_eq!(session.episodic().len(), 1);
    assert_eq!(session.quests().get_active_quests().len(), 1);
    assert_eq!(
        session.characters().get_memory("Mira", None, 5).await.unwrap(),
        vec!["Mira greeted the player"]
    );
}

#[tokio::test]
async fn test_reopen_applies_configured_npc_retention() {
    let temp_dir = TempDir::new().expect("temp directory");
    let turns = [
        ("sold the player a lantern", "first"),
        ("warned about the mines", "second"),
        ("asked about the shipment", "third"),
    ];

    {
        let model = MockModel::new(Vec::<&str>::new());
        for (context, summary) in turns {
            model.queue_response(format!(
                r#"Mira speaks.
{{"npcs": [{{"npc_name": "Mira", "interaction": "talk", "context": "{context}"}}], "quests": []}}"#
            ));
            model.queue_response(summary);
        }
        let mut session = GameSession::new(
            SessionConfig::new().with_storage_dir(temp_dir.path()),
            Arc::new(model),
            Arc::new(MockEmbedder::new(16)),
        )
        .await
        .unwrap();
        for _ in turns {
            session.player_action("talk to Mira").await.unwrap();
        }
    }

    let mut config = SessionConfig::new().with_storage_dir(temp_dir.path());
    config.npc_retention = 2;
    let session = GameSession::new(
        config,
        Arc::new(MockModel::new(Vec::<&str>::new())),
        Arc::new(MockEmbedder::new(16)),
    )
    .await
    .unwrap();

    let window = session.characters().get_memory("Mira", None, 10).await.unwrap();
    assert_eq!(window, vec!["warned about the mines", "asked about the shipment"]);
    assert_eq!(session.characters().full_history("Mira").len(), 3);
}

#[tokio::test]
async fn test_abandonment_is_durable() {
    let temp_dir = TempDir::new().expect("temp directory");
    let start = r#"A quest begins.
{"quests": [{"quest_name": "Doomed Venture", "progress": "Started", "description": "Start", "mandatory": true}]}"#;

    {
        let mut session = open_session(
            temp_dir.path(),
            vec![start, "s", "You walk away.", "The player walked away."],
        )
        .await;
        session.player_action("begin").await.unwrap();
        session.player_action("abandon quest").await.unwrap();
    }

    let session = open_session(temp_dir.path(), vec![]).await;
    assert!(session.quests().get_active_quests().is_empty());
    assert!(session.quests().rewards().is_empty());
}
