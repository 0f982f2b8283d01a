use hackvote_db::object_id::UserId;
use serde_json::json;

use crate::common::{assert_error, run_app_test};

#[tokio::test]
async fn feed_replays_from_cursor_and_resumes() {
    run_app_test(|app| async move {
        let event_id = app.seed_event("feed");

        let founder = app.client.as_user(UserId::new());
        let response = founder
            .post(&format!("api/events/{event_id}/hacks"))
            .json(&json!({ "team_name": "Feed Readers" }))
            .send()
            .await?;
        assert_eq!(response.status().as_u16(), 201);

        // Cursor zero replays everything committed so far.
        let response = app
            .client
            .get("api/changes?cursor=0&timeout_ms=0")
            .send()
            .await?;
        assert_eq!(response.status().as_u16(), 200);
        let batch: serde_json::Value = response.json().await?;
        let events = batch["events"].as_array().unwrap();
        // Event insert, then hack and membership from one transaction.
        assert_eq!(events.len(), 3);
        assert_eq!(events[0]["table"], "event");
        assert_eq!(events[1]["table"], "hack");
        assert_eq!(events[2]["table"], "hack_user");
        assert_eq!(events[1]["txid"], events[2]["txid"]);
        assert_eq!(events[0]["op"], "insert");

        // Resuming from the returned cursor yields nothing new.
        let cursor = batch["cursor"].as_u64().unwrap();
        let response = app
            .client
            .get(&format!("api/changes?cursor={cursor}&timeout_ms=0"))
            .send()
            .await?;
        let batch: serde_json::Value = response.json().await?;
        assert!(batch["events"].as_array().unwrap().is_empty());
        assert_eq!(batch["cursor"].as_u64().unwrap(), cursor);

        Ok(())
    })
    .await
}

#[tokio::test]
async fn feed_filters_by_table_but_still_advances() {
    run_app_test(|app| async move {
        let event_id = app.seed_event("feed");
        let award_id = app.seed_award(event_id, "Best Hack");

        let founder = app.client.as_user(UserId::new());
        let response = founder
            .post(&format!("api/events/{event_id}/hacks"))
            .json(&json!({ "team_name": "Filter Fans" }))
            .send()
            .await?;
        let body: serde_json::Value = response.json().await?;
        let hack_id = body["hack"]["hack_id"].as_str().unwrap().to_string();

        let response = founder
            .post(&format!("api/hacks/{hack_id}/votes/{award_id}"))
            .send()
            .await?;
        assert_eq!(response.status().as_u16(), 201);

        let response = app
            .client
            .get("api/changes?cursor=0&timeout_ms=0&tables=hack_votes")
            .send()
            .await?;
        let batch: serde_json::Value = response.json().await?;
        let events = batch["events"].as_array().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["table"], "hack_vote");
        assert_eq!(events[0]["row"]["hack_id"].as_str().unwrap(), hack_id);

        // The cursor still covers the filtered-out events.
        let response = app
            .client
            .get("api/changes?cursor=0&timeout_ms=0")
            .send()
            .await?;
        let all: serde_json::Value = response.json().await?;
        assert_eq!(batch["cursor"], all["cursor"]);

        let response = app
            .client
            .get("api/changes?cursor=0&timeout_ms=0&tables=nonsense")
            .send()
            .await?;
        assert_error(response, 400, "bad_request").await;

        Ok(())
    })
    .await
}

#[tokio::test]
async fn long_poll_wakes_on_commit() {
    run_app_test(|app| async move {
        let event_id = app.seed_event("feed");

        let head = app.store.feed().cursor();
        let client = app.client.clone();
        let poll = tokio::spawn(async move {
            client
                .get(&format!("api/changes?cursor={head}"))
                .send()
                .await
                .unwrap()
                .json::<serde_json::Value>()
                .await
                .unwrap()
        });

        // Give the poll a moment to park, then commit.
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        let founder = app.client.as_user(UserId::new());
        let response = founder
            .post(&format!("api/events/{event_id}/hacks"))
            .json(&json!({ "team_name": "Night Owls" }))
            .send()
            .await?;
        let body: serde_json::Value = response.json().await?;
        let txid = body["txid"].as_u64().unwrap();

        let batch = poll.await?;
        let events = batch["events"].as_array().unwrap();
        assert!(!events.is_empty());
        assert_eq!(events[0]["txid"].as_u64().unwrap(), txid);

        Ok(())
    })
    .await
}

#[tokio::test]
async fn cascade_delete_shares_one_txid() {
    run_app_test(|app| async move {
        let event_id = app.seed_event("feed");
        let award_id = app.seed_award(event_id, "Best Hack");

        let founder = app.client.as_user(UserId::new());
        let response = founder
            .post(&format!("api/events/{event_id}/hacks"))
            .json(&json!({ "team_name": "Doomed" }))
            .send()
            .await?;
        let body: serde_json::Value = response.json().await?;
        let hack_id = body["hack"]["hack_id"].as_str().unwrap().to_string();

        let response = founder
            .post(&format!("api/hacks/{hack_id}/votes/{award_id}"))
            .send()
            .await?;
        assert_eq!(response.status().as_u16(), 201);

        let head = app.store.feed().cursor();
        let response = app.admin.delete(&format!("api/hacks/{hack_id}")).send().await?;
        assert_eq!(response.status().as_u16(), 200);
        let delete_txid = response
            .json::<serde_json::Value>()
            .await?["txid"]
            .as_u64()
            .unwrap();

        let response = app
            .client
            .get(&format!("api/changes?cursor={head}&timeout_ms=0"))
            .send()
            .await?;
        let batch: serde_json::Value = response.json().await?;
        let events = batch["events"].as_array().unwrap();

        // Votes first, then memberships, then the hack row, all in one
        // transaction and all carrying the deleted row's last value.
        let tables: Vec<&str> = events
            .iter()
            .map(|e| e["table"].as_str().unwrap())
            .collect();
        assert_eq!(tables, vec!["hack_vote", "hack_user", "hack"]);
        for event in events {
            assert_eq!(event["op"], "delete");
            assert_eq!(event["txid"].as_u64().unwrap(), delete_txid);
        }
        assert_eq!(events[2]["row"]["team_name"], "Doomed");

        Ok(())
    })
    .await
}
