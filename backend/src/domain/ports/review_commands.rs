//! Driving ports for the review-core use-cases.
//!
//! HTTP handlers hold these as trait objects so the services, which are
//! generic over their [`ReviewsStore`], can be swapped for mocks in tests.

use async_trait::async_trait;
use pagination::{PageParams, Paginated};

use super::{ReviewQuery, ReviewsStore};
use crate::domain::checkins::{
    CheckInService, ClientContext, StartCheckInRequest, VerifyVisitRequest,
};
use crate::domain::engagement::{AbuseReportRequest, EngagementService};
use crate::domain::idempotency::{IdempotencyKey, IdempotentResponse};
use crate::domain::photos::{
    ConfirmPhotoRequest, PhotoService, PhotoUploadView, PresignPhotoRequest, PresignPhotoResponse,
};
use crate::domain::reviews::{
    PublishReviewRequest, RemoveReviewRequest, ReviewFeed, ReviewListItem, ReviewSort,
    ReviewsService, UpdateReviewRequest,
};
use crate::domain::{Actor, CafeId, Error, PhotoUploadId, ReportId, ReviewId};

/// Publish, edit and remove reviews.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewsCommand: Send + Sync {
    async fn publish(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        request: PublishReviewRequest,
    ) -> Result<IdempotentResponse, Error>;

    async fn update(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        review_id: ReviewId,
        request: UpdateReviewRequest,
    ) -> Result<IdempotentResponse, Error>;

    async fn remove(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        review_id: ReviewId,
        request: RemoveReviewRequest,
    ) -> Result<IdempotentResponse, Error>;
}

/// Geofenced check-ins and visit verification.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CheckInCommand: Send + Sync {
    async fn start(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        cafe_id: CafeId,
        request: StartCheckInRequest,
        client: ClientContext,
    ) -> Result<IdempotentResponse, Error>;

    async fn verify(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        review_id: ReviewId,
        request: VerifyVisitRequest,
    ) -> Result<IdempotentResponse, Error>;
}

/// Helpful votes and abuse moderation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EngagementCommand: Send + Sync {
    async fn vote_helpful(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        review_id: ReviewId,
    ) -> Result<IdempotentResponse, Error>;

    async fn report_abuse(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        review_id: ReviewId,
        request: AbuseReportRequest,
    ) -> Result<IdempotentResponse, Error>;

    async fn confirm_abuse(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        report_id: ReportId,
    ) -> Result<IdempotentResponse, Error>;
}

/// Photo upload lifecycle as seen by clients.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PhotoCommand: Send + Sync {
    async fn presign(
        &self,
        actor: Actor,
        request: PresignPhotoRequest,
    ) -> Result<PresignPhotoResponse, Error>;

    async fn confirm(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        request: ConfirmPhotoRequest,
    ) -> Result<IdempotentResponse, Error>;

    async fn status(&self, actor: Actor, upload_id: PhotoUploadId)
    -> Result<PhotoUploadView, Error>;
}

/// Paged review feed of one café.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewFeedQuery: Send + Sync {
    async fn list(
        &self,
        cafe_id: CafeId,
        sort: ReviewSort,
        params: PageParams,
    ) -> Result<Paginated<ReviewListItem>, Error>;
}

#[async_trait]
impl<S> ReviewsCommand for ReviewsService<S>
where
    S: ReviewsStore + 'static,
{
    async fn publish(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        request: PublishReviewRequest,
    ) -> Result<IdempotentResponse, Error> {
        ReviewsService::publish(self, actor, key, request).await
    }

    async fn update(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        review_id: ReviewId,
        request: UpdateReviewRequest,
    ) -> Result<IdempotentResponse, Error> {
        ReviewsService::update(self, actor, key, review_id, request).await
    }

    async fn remove(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        review_id: ReviewId,
        request: RemoveReviewRequest,
    ) -> Result<IdempotentResponse, Error> {
        ReviewsService::remove(self, actor, key, review_id, request).await
    }
}

#[async_trait]
impl<S> CheckInCommand for CheckInService<S>
where
    S: ReviewsStore + 'static,
{
    async fn start(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        cafe_id: CafeId,
        request: StartCheckInRequest,
        client: ClientContext,
    ) -> Result<IdempotentResponse, Error> {
        CheckInService::start(self, actor, key, cafe_id, request, client).await
    }

    async fn verify(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        review_id: ReviewId,
        request: VerifyVisitRequest,
    ) -> Result<IdempotentResponse, Error> {
        CheckInService::verify(self, actor, key, review_id, request).await
    }
}

#[async_trait]
impl<S> EngagementCommand for EngagementService<S>
where
    S: ReviewsStore + 'static,
{
    async fn vote_helpful(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        review_id: ReviewId,
    ) -> Result<IdempotentResponse, Error> {
        EngagementService::vote_helpful(self, actor, key, review_id).await
    }

    async fn report_abuse(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        review_id: ReviewId,
        request: AbuseReportRequest,
    ) -> Result<IdempotentResponse, Error> {
        EngagementService::report_abuse(self, actor, key, review_id, request).await
    }

    async fn confirm_abuse(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        report_id: ReportId,
    ) -> Result<IdempotentResponse, Error> {
        EngagementService::confirm_abuse(self, actor, key, report_id).await
    }
}

#[async_trait]
impl<S> PhotoCommand for PhotoService<S>
where
    S: ReviewsStore + 'static,
{
    async fn presign(
        &self,
        actor: Actor,
        request: PresignPhotoRequest,
    ) -> Result<PresignPhotoResponse, Error> {
        PhotoService::presign(self, actor, request).await
    }

    async fn confirm(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        request: ConfirmPhotoRequest,
    ) -> Result<IdempotentResponse, Error> {
        PhotoService::confirm(self, actor, key, request).await
    }

    async fn status(
        &self,
        actor: Actor,
        upload_id: PhotoUploadId,
    ) -> Result<PhotoUploadView, Error> {
        PhotoService::status(self, actor, upload_id).await
    }
}

#[async_trait]
impl<Q> ReviewFeedQuery for ReviewFeed<Q>
where
    Q: ReviewQuery + 'static,
{
    async fn list(
        &self,
        cafe_id: CafeId,
        sort: ReviewSort,
        params: PageParams,
    ) -> Result<Paginated<ReviewListItem>, Error> {
        ReviewFeed::list(self, cafe_id, sort, params).await
    }
}
