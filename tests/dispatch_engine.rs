//! Dispatch engine properties against an in-memory database.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use mailcast::auth::Actor;
use mailcast::config::MailConfig;
use mailcast::db::{NewUser, UserRepository};
use mailcast::dispatch::SUCCESS_RESPONSE;
use mailcast::mailing::{
    AttemptRepository, AttemptStatus, Mailing, MailingRepository, MessageRepository, NewMailing,
    NewMessage, NewRecipient, RecipientRepository,
};
use mailcast::{
    Database, DispatchEngine, DispatchSummary, FixedClock, MailcastError, MailingStatus,
    MemoryMailer,
};

const OWNER: i64 = 1;
const OTHER: i64 = 2;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

struct Fixture {
    db: Database,
    engine: DispatchEngine,
    mailer: Arc<MemoryMailer>,
    clock: FixedClock,
}

async fn fixture(mailer: MemoryMailer) -> Fixture {
    let db = Database::open_in_memory().await.unwrap();
    let users = UserRepository::new(db.pool());
    users.create(&NewUser::new("owner", "hash")).await.unwrap();
    users.create(&NewUser::new("other", "hash")).await.unwrap();

    let mailer = Arc::new(mailer);
    let clock = FixedClock::new(t0());
    let mail = MailConfig {
        from: "news@example.com".to_string(),
        ..Default::default()
    };
    let engine =
        DispatchEngine::new(db.clone(), mailer.clone(), &mail).with_clock(Arc::new(clock.clone()));

    Fixture {
        db,
        engine,
        mailer,
        clock,
    }
}

async fn create_mailing(db: &Database, emails: &[&str]) -> Mailing {
    let message = MessageRepository::new(db.pool())
        .create(&NewMessage::new("Hi", "Hello", OWNER))
        .await
        .unwrap();

    let recipients = RecipientRepository::new(db.pool());
    let mut ids = Vec::new();
    for email in emails {
        let recipient = recipients
            .create(&NewRecipient::new(*email, "Recipient", OWNER))
            .await
            .unwrap();
        ids.push(recipient.id);
    }

    MailingRepository::new(db.pool())
        .create(&NewMailing::new(message.id, OWNER).with_recipients(ids))
        .await
        .unwrap()
}

async fn reload(db: &Database, id: i64) -> Mailing {
    MailingRepository::new(db.pool())
        .get_by_id(id)
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_all_sends_succeed() {
    let f = fixture(MemoryMailer::new()).await;
    let mailing = create_mailing(&f.db, &["a@x.com", "b@x.com", "c@x.com"]).await;

    let summary = f.engine.dispatch(mailing.id, &Actor::user(OWNER)).await.unwrap();
    assert_eq!(summary, DispatchSummary { success: 3, failed: 0 });

    let attempts = AttemptRepository::new(f.db.pool())
        .list_for_mailing(mailing.id)
        .await
        .unwrap();
    assert_eq!(attempts.len(), 3);
    assert!(attempts
        .iter()
        .all(|a| a.status == AttemptStatus::Success && a.server_response == SUCCESS_RESPONSE));
    assert_eq!(
        f.mailer.recipients(),
        vec!["a@x.com", "b@x.com", "c@x.com"]
    );
}

#[tokio::test]
async fn test_all_sends_fail() {
    let mailer = MemoryMailer::new()
        .fail_for("a@x.com", "550 mailbox unavailable")
        .fail_for("b@x.com", "550 mailbox unavailable");
    let f = fixture(mailer).await;
    let mailing = create_mailing(&f.db, &["a@x.com", "b@x.com"]).await;

    let summary = f.engine.dispatch(mailing.id, &Actor::user(OWNER)).await.unwrap();
    assert_eq!(summary, DispatchSummary { success: 0, failed: 2 });

    let attempts = AttemptRepository::new(f.db.pool())
        .list_for_mailing(mailing.id)
        .await
        .unwrap();
    assert_eq!(attempts.len(), 2);
    for attempt in &attempts {
        assert_eq!(attempt.status, AttemptStatus::Failed);
        assert_eq!(attempt.server_response, "550 mailbox unavailable");
    }
}

#[tokio::test]
async fn test_mixed_outcome_example() {
    let f = fixture(MemoryMailer::new().fail_for("b@x.com", "SMTP timeout")).await;
    let mailing = create_mailing(&f.db, &["a@x.com", "b@x.com"]).await;

    let summary = f.engine.dispatch(mailing.id, &Actor::user(OWNER)).await.unwrap();
    assert_eq!(summary, DispatchSummary { success: 1, failed: 1 });

    let attempts = AttemptRepository::new(f.db.pool())
        .list_for_mailing(mailing.id)
        .await
        .unwrap();
    let outcomes: Vec<(AttemptStatus, &str)> = attempts
        .iter()
        .map(|a| (a.status, a.server_response.as_str()))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            (AttemptStatus::Success, SUCCESS_RESPONSE),
            (AttemptStatus::Failed, "SMTP timeout"),
        ]
    );
    assert!(attempts.iter().all(|a| a.attempt_time == t0()));

    let mailing = reload(&f.db, mailing.id).await;
    assert_eq!(mailing.status, MailingStatus::Started);
    assert_eq!(mailing.start_time, Some(t0()));
    assert_eq!(mailing.end_time, Some(t0()));
}

#[tokio::test]
async fn test_zero_recipients() {
    let f = fixture(MemoryMailer::new()).await;
    let mailing = create_mailing(&f.db, &[]).await;

    let summary = f.engine.dispatch(mailing.id, &Actor::user(OWNER)).await.unwrap();
    assert_eq!(summary.total(), 0);

    let attempts = AttemptRepository::new(f.db.pool())
        .list_for_mailing(mailing.id)
        .await
        .unwrap();
    assert!(attempts.is_empty());

    let mailing = reload(&f.db, mailing.id).await;
    assert_eq!(mailing.status, MailingStatus::Started);
    assert_eq!(mailing.end_time, Some(t0()));
}

#[tokio::test]
async fn test_non_owner_changes_nothing() {
    let f = fixture(MemoryMailer::new()).await;
    let mailing = create_mailing(&f.db, &["a@x.com"]).await;

    for actor in [Actor::user(OTHER), Actor::manager(OTHER)] {
        let err = f.engine.dispatch(mailing.id, &actor).await.unwrap_err();
        assert!(matches!(err, MailcastError::Permission(_)));
    }

    assert!(f.mailer.sent().is_empty());
    assert!(AttemptRepository::new(f.db.pool())
        .list_for_mailing(mailing.id)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(reload(&f.db, mailing.id).await, mailing);
}

#[tokio::test]
async fn test_missing_mailing() {
    let f = fixture(MemoryMailer::new()).await;

    let err = f.engine.dispatch(404, &Actor::user(OWNER)).await.unwrap_err();
    assert!(matches!(err, MailcastError::NotFound(_)));
}

#[tokio::test]
async fn test_redispatch_appends_attempts() {
    let f = fixture(MemoryMailer::new()).await;
    let mailing = create_mailing(&f.db, &["a@x.com"]).await;

    f.engine.dispatch(mailing.id, &Actor::user(OWNER)).await.unwrap();
    f.clock.advance(Duration::days(1));
    f.engine.dispatch(mailing.id, &Actor::user(OWNER)).await.unwrap();

    let attempts = AttemptRepository::new(f.db.pool())
        .list_for_mailing(mailing.id)
        .await
        .unwrap();
    assert_eq!(attempts.len(), 2);

    let mailing = reload(&f.db, mailing.id).await;
    assert_eq!(mailing.start_time, Some(t0()));
    assert_eq!(mailing.end_time, Some(t0() + Duration::days(1)));
}

#[tokio::test]
async fn test_finished_mailing_stays_finished() {
    let f = fixture(MemoryMailer::new()).await;
    let mailing = create_mailing(&f.db, &["a@x.com"]).await;

    f.engine.dispatch(mailing.id, &Actor::user(OWNER)).await.unwrap();
    f.engine.finish(mailing.id, &Actor::user(OWNER)).await.unwrap();
    f.clock.advance(Duration::hours(2));
    f.engine.dispatch(mailing.id, &Actor::user(OWNER)).await.unwrap();

    let mailing = reload(&f.db, mailing.id).await;
    assert_eq!(mailing.status, MailingStatus::Finished);
    assert_eq!(mailing.end_time, Some(t0() + Duration::hours(2)));
}
