//! Outbox fan-out, inbox retries, dead-lettering and the reviews-core
//! consumer, driven step by step with a manual clock.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backend::domain::events::{
    EventBody, EventHandler, EventStatus, EventType, InboxEvent, REVIEWS_CORE_CONSUMER,
    ReplayMode, RetryPolicy, ReviewsCoreHandler,
};
use backend::domain::ports::{EventStore, ObjectStore};
use backend::domain::photos::{
    CleanupRetention, ConfirmPhotoRequest, OptimisationPolicy, PhotoCleanup, PhotoService,
    PhotoUploadStatus, PhotoUploadView, PhotoWorker, PresignPhotoRequest,
};
use backend::domain::reputation::ReputationEventType;
use backend::domain::{Actor, Error, ErrorCode, UserId};
use backend::outbound::photo_codec::ImagePhotoCodec;
use backend::test_support::MemoryObjectStore;
use chrono::TimeDelta;
use rstest::{fixture, rstest};

mod support;

use support::{World, body, code, key, point, publish_request};

/// Fails the first `failures` deliveries of one event type.
struct FlakyHandler {
    event_type: EventType,
    failures: AtomicU32,
    handled: AtomicU32,
}

impl FlakyHandler {
    fn new(event_type: EventType, failures: u32) -> Self {
        Self {
            event_type,
            failures: AtomicU32::new(failures),
            handled: AtomicU32::new(0),
        }
    }

    fn handled(&self) -> u32 {
        self.handled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventHandler for FlakyHandler {
    fn consumer(&self) -> &str {
        REVIEWS_CORE_CONSUMER
    }

    async fn handle(&self, _event: &InboxEvent, body: EventBody) -> Result<(), Error> {
        if body.event_type() == self.event_type {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(Error::internal("downstream unavailable"));
            }
        }
        self.handled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[fixture]
fn world() -> World {
    World::new()
}

async fn inbox_row(world: &World, event_type: EventType) -> InboxEvent {
    world
        .db
        .inbox_events()
        .await
        .into_iter()
        .find(|row| row.event_type == event_type.as_str())
        .expect("inbox row for event type")
}

#[rstest]
#[tokio::test]
async fn failed_deliveries_back_off_exponentially(world: World) {
    let cafe_id = world.cafe_at(point(55.7558, 37.6173)).await;
    let actor = Actor::user(UserId::random());
    world.publish(actor, publish_request(cafe_id, 3, "first visit")).await;
    world
        .reviews
        .publish(actor, key("republish"), publish_request(cafe_id, 4, "second visit"))
        .await
        .expect("republish");
    assert_eq!(world.drain_outbox().await, 2);
    assert!(
        world
            .db
            .outbox_events()
            .await
            .iter()
            .all(|event| event.status == EventStatus::Processed)
    );

    let handler = Arc::new(FlakyHandler::new(EventType::ReviewUpdated, 2));
    let inbox = world.inbox(handler.clone());
    let start = world.now();

    while inbox.process_once().await.expect("process") {}
    let first = inbox_row(&world, EventType::ReviewUpdated).await;
    assert_eq!(first.status, EventStatus::Pending);
    assert_eq!(first.attempts, 1);
    assert_eq!(first.available_at, start + TimeDelta::seconds(2));
    assert_eq!(first.last_error.as_deref(), Some("downstream unavailable"));

    world.clock.advance(Duration::from_secs(2));
    assert!(inbox.process_once().await.expect("process"));
    let second = inbox_row(&world, EventType::ReviewUpdated).await;
    assert_eq!(second.attempts, 2);
    assert_eq!(second.available_at, world.now() + TimeDelta::seconds(4));

    world.clock.advance(Duration::from_secs(4));
    assert!(inbox.process_once().await.expect("process"));
    let done = inbox_row(&world, EventType::ReviewUpdated).await;
    assert_eq!(done.status, EventStatus::Processed);
    assert_eq!(done.last_error, None);
    assert_eq!(handler.handled(), 2);
}

#[rstest]
#[tokio::test]
async fn exhausted_events_are_dead_lettered_and_replayable(world: World) {
    let cafe_id = world.cafe_at(point(55.7558, 37.6173)).await;
    world
        .publish(Actor::user(UserId::random()), publish_request(cafe_id, 5, "doomed"))
        .await;
    world.drain_outbox().await;

    let policy = RetryPolicy::default();
    let handler = Arc::new(FlakyHandler::new(
        EventType::ReviewCreated,
        u32::try_from(policy.max_attempts).expect("positive attempts"),
    ));
    let inbox = world.inbox(handler.clone());
    for _ in 0..policy.max_attempts {
        assert!(inbox.process_once().await.expect("process"));
        world.clock.advance(Duration::from_secs(301));
    }

    let failed = inbox_row(&world, EventType::ReviewCreated).await;
    assert_eq!(failed.status, EventStatus::Failed);
    assert_eq!(failed.attempts, policy.max_attempts);
    assert!(!inbox.process_once().await.expect("process"));

    let dlq = world.dlq();
    let open = dlq.list(false, None, None).await.expect("list DLQ");
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].attempts, policy.max_attempts);
    assert_eq!(open[0].consumer, REVIEWS_CORE_CONSUMER);

    let outcome = dlq.replay(open[0].id).await.expect("replay");
    assert_eq!(outcome.mode, ReplayMode::ResetInbox);
    assert_eq!(outcome.inbox_id, failed.id);
    let rearmed = inbox_row(&world, EventType::ReviewCreated).await;
    assert_eq!(rearmed.status, EventStatus::Pending);
    assert_eq!(rearmed.attempts, 0);

    assert!(inbox.process_once().await.expect("process"));
    let processed = inbox_row(&world, EventType::ReviewCreated).await;
    assert_eq!(processed.status, EventStatus::Processed);
    assert_eq!(handler.handled(), 1);
    assert!(dlq.list(false, None, None).await.expect("list DLQ").is_empty());
    let all = dlq.list(true, None, None).await.expect("list DLQ");
    assert!(all[0].resolved_at.is_some());
}

#[rstest]
#[tokio::test]
async fn replay_recreates_a_purged_inbox_row(world: World) {
    let cafe_id = world.cafe_at(point(55.7558, 37.6173)).await;
    world
        .publish(Actor::user(UserId::random()), publish_request(cafe_id, 2, "purged"))
        .await;
    world.drain_outbox().await;
    let row = inbox_row(&world, EventType::ReviewCreated).await;
    world
        .events()
        .dead_letter_inbox(&row, "operator gave up", world.now())
        .await
        .expect("dead letter");
    world.db.delete_inbox(row.id).await;

    let entry = world.db.dlq_entries().await.remove(0);
    let outcome = world.dlq().replay(entry.id).await.expect("replay");

    assert_eq!(outcome.mode, ReplayMode::RecreatedInbox);
    let recreated = inbox_row(&world, EventType::ReviewCreated).await;
    assert_eq!(recreated.id, outcome.inbox_id);
    assert_eq!(recreated.status, EventStatus::Pending);
    assert_eq!(recreated.outbox_event_id, row.outbox_event_id);
}

#[rstest]
#[tokio::test]
async fn fan_out_is_idempotent_per_consumer(world: World) {
    let cafe_id = world.cafe_at(point(55.7558, 37.6173)).await;
    world
        .publish(Actor::user(UserId::random()), publish_request(cafe_id, 4, "once"))
        .await;
    let events = world.events();
    let event = events
        .claim_outbox(world.now(), world.now())
        .await
        .expect("claim")
        .expect("pending event");
    let consumers = [REVIEWS_CORE_CONSUMER.to_owned()];

    events
        .fan_out(&event, &consumers, world.now())
        .await
        .expect("fan out");
    events
        .fan_out(&event, &consumers, world.now())
        .await
        .expect("fan out again");

    assert_eq!(world.db.inbox_events().await.len(), 1);
    let stored = events
        .find_outbox(event.id)
        .await
        .expect("find")
        .expect("outbox row");
    assert_eq!(stored.status, EventStatus::Processed);
}

fn photo_worker(world: &World, objects: Arc<MemoryObjectStore>) -> Arc<PhotoWorker> {
    Arc::new(PhotoWorker::new(
        world.db.clone(),
        objects,
        Arc::new(ImagePhotoCodec),
        OptimisationPolicy::default(),
        world.clock(),
    ))
}

fn core_handler(world: &World, objects: Arc<MemoryObjectStore>) -> Arc<ReviewsCoreHandler> {
    Arc::new(ReviewsCoreHandler::new(
        Arc::new(world.rating_engine()),
        world.db.clone(),
        photo_worker(world, objects),
        world.clock(),
    ))
}

#[rstest]
#[tokio::test]
async fn helpful_votes_accrue_reputation_once(world: World) {
    let cafe_id = world.cafe_at(point(55.7558, 37.6173)).await;
    let author = Actor::user(UserId::random());
    let review_id = world.publish(author, publish_request(cafe_id, 5, "pour over")).await;
    world
        .engagement
        .vote_helpful(Actor::user(UserId::random()), key("vote"), review_id)
        .await
        .expect("vote");
    world.drain_outbox().await;

    let inbox = world.inbox(core_handler(&world, Arc::new(MemoryObjectStore::new())));
    while inbox.process_once().await.expect("process") {}

    let ledger = world.db.reputation_of(author.user_id).await;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].event_type, ReputationEventType::HelpfulReceived);
    assert_eq!(ledger[0].points, 2);
    assert!(world.db.inbox_events().await.iter().all(|row| row.status == EventStatus::Processed));

    let vote_row = inbox_row(&world, EventType::VoteHelpfulAdded).await;
    world
        .events()
        .dead_letter_inbox(&vote_row, "forced redelivery", world.now())
        .await
        .expect("dead letter");
    let entry = world.db.dlq_entries().await.remove(0);
    world.dlq().replay(entry.id).await.expect("replay");
    assert!(inbox.process_once().await.expect("process"));
    assert_eq!(world.db.reputation_of(author.user_id).await.len(), 1);
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_fn(width, height, |x, y| {
        let shade = |value: u32| u8::try_from(value % 256).unwrap_or(u8::MAX);
        image::Rgb([shade(x), shade(y), 128])
    });
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    bytes
}

#[rstest]
#[tokio::test]
async fn confirmed_photos_are_optimised_then_swept(world: World) {
    let objects = Arc::new(MemoryObjectStore::new());
    let photos = PhotoService::new(
        world.db.clone(),
        world.db.clone(),
        objects.clone(),
        world.clock(),
    );
    let actor = Actor::user(UserId::random());
    let image = png_bytes(64, 48);

    let presigned = photos
        .presign(
            actor,
            PresignPhotoRequest {
                content_type: "image/png".to_owned(),
                size_bytes: i64::try_from(image.len()).expect("small image"),
            },
        )
        .await
        .expect("presign");
    assert_eq!(presigned.method, "PUT");
    objects.insert(&presigned.object_key, image, "image/png");

    let request = ConfirmPhotoRequest {
        object_key: presigned.object_key.clone(),
    };
    let confirmed = photos
        .confirm(actor, key("photo-1"), request.clone())
        .await
        .expect("confirm");
    assert_eq!(confirmed.status, 202);
    let again = photos
        .confirm(actor, key("photo-2"), request)
        .await
        .expect("confirm again");
    assert_eq!(again.status, 200);
    let view: PhotoUploadView = body(&confirmed);
    assert_eq!(view.status, PhotoUploadStatus::Pending);

    world.drain_outbox().await;
    let inbox = world.inbox(core_handler(&world, objects.clone()));
    while inbox.process_once().await.expect("process") {}

    let ready = photos
        .status(actor, view.upload_id)
        .await
        .expect("photo status");
    assert_eq!(ready.status, PhotoUploadStatus::Ready);
    let final_key = ready.final_object_key.expect("final key");
    assert!(objects.contains(&final_key));
    assert!(!objects.contains(&presigned.object_key));
    assert_eq!(ready.final_url, objects.public_url(&final_key));

    let stranger = photos
        .status(Actor::user(UserId::random()), view.upload_id)
        .await;
    assert_eq!(code(stranger), ErrorCode::NotFound);

    let cleanup = PhotoCleanup::new(
        world.db.clone(),
        objects.clone(),
        CleanupRetention::default(),
        world.clock(),
    );
    assert_eq!(cleanup.sweep().await.expect("sweep"), 0);
    world.clock.advance(Duration::from_secs(4 * 24 * 60 * 60));
    assert_eq!(cleanup.sweep().await.expect("sweep"), 1);
    assert!(world.db.photo_uploads().await.is_empty());
    assert!(objects.contains(&final_key));
}
