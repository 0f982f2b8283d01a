//! End-to-end: a replica session speaking to the real HTTP surface.

use std::sync::Arc;

use hackvote_db::hacks::NewHack;
use hackvote_db::object_id::UserId;
use hackvote_replica::{HttpFeedClient, HttpGatewayClient, MutationStatus, ReplicaSession};
use hackvote_test::wait_for;

use crate::common::{run_app_test, TestApp};

fn http_session(app: &TestApp, user_id: UserId) -> ReplicaSession {
    let gateway = Arc::new(HttpGatewayClient::new(app.base_url.clone(), user_id));
    let feed = Arc::new(HttpFeedClient::new(app.base_url.clone(), user_id).with_poll_timeout_ms(500));
    ReplicaSession::new(user_id, gateway, feed)
}

#[tokio::test]
async fn session_syncs_and_mutates_over_http() {
    run_app_test(|app| async move {
        let event_id = app.seed_event("replica");
        let award_id = app.seed_award(event_id, "Best Hack");

        let user = UserId::new();
        let session = http_session(&app, user);
        session.start();

        wait_for(|| async { session.event(event_id) })
            .await
            .expect("session never synced the event");
        assert_eq!(session.awards_for_event(event_id).len(), 1);

        let (_, mut create) = session.create_team(
            event_id,
            NewHack {
                team_name: "Wire Walkers".into(),
                project_name: Some("hackvote".into()),
                project_description: None,
                project_url: None,
                team_image: None,
            },
        )?;
        assert!(matches!(
            create.wait().await,
            MutationStatus::Confirmed { .. }
        ));

        // The confirmed id comes from the server.
        let hack_id = app.store.hacks_for_event(event_id)[0].hack_id;
        assert!(session.hack(hack_id).is_some());
        assert_eq!(session.members_of(hack_id).len(), 1);

        let mut vote = session.cast_vote(hack_id, award_id)?;
        assert!(matches!(
            vote.wait().await,
            MutationStatus::Confirmed { .. }
        ));
        assert_eq!(app.store.votes_for_hack(hack_id).len(), 1);
        assert_eq!(session.votes_for_hack(hack_id).len(), 1);
        assert_eq!(session.overlay_len(), 0);

        // A second session converges on the same rows.
        let observer = http_session(&app, UserId::new());
        observer.start();
        wait_for(|| async { observer.hack(hack_id) })
            .await
            .expect("observer never synced the hack");
        assert_eq!(observer.votes_for_hack(hack_id).len(), 1);

        Ok(())
    })
    .await
}

#[tokio::test]
async fn rejected_http_mutation_reports_its_kind() {
    run_app_test(|app| async move {
        let event_id = app.seed_event("replica");
        let award_id = app.seed_award(event_id, "Best Hack");

        let user = UserId::new();
        let (hack, _) = app
            .store
            .create_team(
                event_id,
                NewHack {
                    team_name: "Double Dippers".into(),
                    project_name: None,
                    project_description: None,
                    project_url: None,
                    team_image: None,
                },
                user,
            )
            .unwrap();
        app.store.cast_vote(hack.hack_id, award_id, user).unwrap();

        // Unsynced session: the duplicate only surfaces at the gateway.
        let session = http_session(&app, user);
        let mut handle = session.cast_vote(hack.hack_id, award_id)?;
        match handle.wait().await {
            MutationStatus::Rejected(err) => {
                assert_eq!(err.kind(), hackvote_replica::ErrorKind::Conflict);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(session.overlay_len(), 0);

        Ok(())
    })
    .await
}
