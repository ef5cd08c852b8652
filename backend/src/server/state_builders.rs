//! Builders wiring Diesel adapters, outbound clients and domain services
//! into HTTP state and background tasks.

use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr};
use mockable::{Clock, DefaultClock};
use tracing::info;

use backend::domain::background::{BackgroundTask, LoopSchedule};
use backend::domain::checkins::{CheckInPolicy, CheckInService};
use backend::domain::engagement::EngagementService;
use backend::domain::events::{
    ConsumerRegistry, DlqAdmin, InboxDispatcher, OutboxDispatcher, ReviewsCoreHandler,
};
use backend::domain::photos::{
    CleanupRetention, OptimisationPolicy, PhotoCleanup, PhotoService, PhotoWorker,
};
use backend::domain::ports::{
    DisabledObjectStore, DisabledSummarizer, EventStore, ObjectStore, PhotoUploadRepository,
    ReputationRepository, ReviewSummarizer,
};
use backend::domain::rate_limit::ReviewRateLimits;
use backend::domain::rating::{RatingEngine, RatingRebuildTask};
use backend::domain::reputation::ReputationLedger;
use backend::domain::reviews::{ReviewFeed, ReviewsService};
use backend::inbound::http::state::{HttpState, HttpStatePorts};
use backend::outbound::object_store::HttpObjectStore;
use backend::outbound::persistence::{
    DbPool, DieselEventStore, DieselPhotoUploadRepository, DieselRatingRepository,
    DieselReputationRepository, DieselReviewQuery, DieselReviewsStore,
};
use backend::outbound::photo_codec::ImagePhotoCodec;
use backend::outbound::summarizer::HttpSummarizer;

use super::config::AppSettings;

/// A background task and how often it runs.
pub(crate) struct ScheduledTask {
    pub(crate) task: Arc<dyn BackgroundTask>,
    pub(crate) schedule: LoopSchedule,
}

/// Everything the server needs once the pool is open.
pub(crate) struct Backend {
    pub(crate) http_state: HttpState,
    pub(crate) tasks: Vec<ScheduledTask>,
}

fn build_object_store(settings: &AppSettings, clock: Arc<dyn Clock>) -> Result<Arc<dyn ObjectStore>> {
    match settings.object_store()? {
        Some(store_settings) => {
            let store = HttpObjectStore::new(store_settings, clock)
                .wrap_err("failed to build object store client")?;
            Ok(Arc::new(store))
        }
        None => {
            info!("object store not configured; photo uploads disabled");
            Ok(Arc::new(DisabledObjectStore))
        }
    }
}

fn build_summarizer(settings: &AppSettings) -> Result<Arc<dyn ReviewSummarizer>> {
    match settings.summarizer()? {
        Some(ai_settings) => {
            let summarizer =
                HttpSummarizer::new(ai_settings).wrap_err("failed to build summarizer client")?;
            Ok(Arc::new(summarizer))
        }
        None => Ok(Arc::new(DisabledSummarizer)),
    }
}

/// Wire adapters and services around `pool`.
pub(crate) fn build_backend(settings: &AppSettings, pool: &DbPool) -> Result<Backend> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let store = Arc::new(DieselReviewsStore::new(pool.clone()));
    let events: Arc<dyn EventStore> = Arc::new(DieselEventStore::new(pool.clone()));
    let uploads: Arc<dyn PhotoUploadRepository> =
        Arc::new(DieselPhotoUploadRepository::new(pool.clone()));
    let reputation_repo: Arc<dyn ReputationRepository> =
        Arc::new(DieselReputationRepository::new(pool.clone()));
    let objects = build_object_store(settings, clock.clone())?;
    let summarizer = build_summarizer(settings)?;

    let ratings = Arc::new(RatingEngine::new(
        Arc::new(DieselRatingRepository::new(pool.clone())),
        reputation_repo.clone(),
        summarizer,
        &settings.formulas(),
        clock.clone(),
    ));
    let worker = Arc::new(PhotoWorker::new(
        uploads.clone(),
        objects.clone(),
        Arc::new(ImagePhotoCodec),
        OptimisationPolicy::default(),
        clock.clone(),
    ));
    let handler = Arc::new(ReviewsCoreHandler::new(
        ratings.clone(),
        reputation_repo.clone(),
        worker,
        clock.clone(),
    ));
    let policy = settings.retry_policy();

    let tasks = vec![
        ScheduledTask {
            task: Arc::new(OutboxDispatcher::new(
                events.clone(),
                ConsumerRegistry::reviews_core(),
                policy,
                clock.clone(),
            )),
            schedule: settings.outbox_schedule(),
        },
        ScheduledTask {
            task: Arc::new(InboxDispatcher::new(
                events.clone(),
                handler,
                policy,
                clock.clone(),
            )),
            schedule: settings.inbox_schedule(),
        },
        ScheduledTask {
            task: Arc::new(RatingRebuildTask::new(ratings.clone())),
            schedule: settings.rating_rebuild_schedule(),
        },
        ScheduledTask {
            task: Arc::new(PhotoCleanup::new(
                uploads.clone(),
                objects.clone(),
                CleanupRetention::default(),
                clock.clone(),
            )),
            schedule: settings.photo_cleanup_schedule(),
        },
    ];

    let ports = HttpStatePorts {
        reviews: Arc::new(ReviewsService::new(
            store.clone(),
            Arc::new(ReviewRateLimits::default()),
            clock.clone(),
        )),
        check_ins: Arc::new(CheckInService::new(
            store.clone(),
            CheckInPolicy::default(),
            clock.clone(),
        )),
        engagement: Arc::new(EngagementService::new(store.clone(), clock.clone())),
        photos: Arc::new(PhotoService::new(store, uploads, objects, clock.clone())),
        feed: Arc::new(ReviewFeed::new(Arc::new(DieselReviewQuery::new(pool.clone())))),
        ratings,
        reputation: Arc::new(ReputationLedger::new(reputation_repo, clock.clone())),
        dlq: Arc::new(DlqAdmin::new(events, clock)),
    };

    Ok(Backend {
        http_state: HttpState::new(ports, settings.deadlines()),
        tasks,
    })
}
