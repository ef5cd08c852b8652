//! Read models, ledger and photo upload rows over the shared tables.
//!
//! Aggregates follow the SQL the Diesel adapters run, so the feed order and
//! snapshot inputs match production for the same rows.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::checkins::Confidence;
use crate::domain::engagement::AbuseStatus;
use crate::domain::photos::{PhotoUpload, PhotoUploadStatus};
use crate::domain::ports::{
    PhotoUploadRepository, RatingRepository, ReadyPhoto, ReputationRepository, ReviewQuery,
    StoreError,
};
use crate::domain::rating::{CafeRatingInputs, RatingSnapshot, ReviewFacts};
use crate::domain::reputation::{NewReputationEvent, ReputationEvent};
use crate::domain::reviews::{Review, ReviewListItem, ReviewSort, ReviewStatus};
use crate::domain::{CafeId, PhotoUploadId, UserId};

use super::MemoryDatabase;
use super::memory_database::Tables;

fn count(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn helpful_totals(tables: &Tables, review: &Review) -> (f64, u32) {
    let votes: Vec<f64> = tables
        .helpful_votes
        .iter()
        .filter(|vote| vote.review_id == review.id)
        .map(|vote| vote.weight)
        .collect();
    (votes.iter().sum(), count(votes.len()))
}

fn confidence_of(tables: &Tables, review: &Review) -> Confidence {
    tables
        .verifications
        .get(&review.id)
        .map_or(Confidence::None, |verification| verification.confidence)
}

const fn confidence_rank(confidence: Confidence) -> u8 {
    match confidence {
        Confidence::High => 3,
        Confidence::Medium => 2,
        Confidence::Low => 1,
        Confidence::None => 0,
    }
}

fn published_at(tables: &Tables, cafe_id: CafeId) -> Vec<&Review> {
    tables
        .reviews
        .iter()
        .filter(|review| review.cafe_id == cafe_id && review.status == ReviewStatus::Published)
        .collect()
}

fn facts(tables: &Tables, review: &Review) -> ReviewFacts {
    let attributes = tables.attributes.get(&review.id);
    let (helpful_score, _) = helpful_totals(tables, review);
    let confirmed_reports = tables
        .abuse_reports
        .iter()
        .filter(|report| report.review_id == review.id && report.status == AbuseStatus::Confirmed)
        .count();
    ReviewFacts {
        review_id: review.id,
        author_id: review.user_id,
        author_display_name: tables.display_names.get(&review.user_id).cloned(),
        rating: review.rating.get(),
        summary: review.summary.clone(),
        summary_length: attributes.map_or_else(
            || count(review.summary.trim().chars().count()),
            |attributes| attributes.summary_length,
        ),
        drink_name: attributes
            .map(|attributes| attributes.drink_name.clone())
            .unwrap_or_default(),
        tags_count: attributes.map_or(0, |attributes| count(attributes.taste_tags.len())),
        photo_count: attributes.map_or(0, |attributes| attributes.photo_count),
        confidence: confidence_of(tables, review),
        confirmed_reports: count(confirmed_reports),
        helpful_score,
        created_at: review.created_at,
    }
}

fn list_item(tables: &Tables, review: &Review) -> ReviewListItem {
    let attributes = tables.attributes.get(&review.id);
    let (helpful_score, helpful_count) = helpful_totals(tables, review);
    let visit_confidence = confidence_of(tables, review);
    ReviewListItem {
        id: review.id,
        user_id: review.user_id,
        author_display_name: tables.display_names.get(&review.user_id).cloned(),
        rating: review.rating.get(),
        summary: review.summary.clone(),
        drink_id: attributes.and_then(|attributes| attributes.drink_id),
        drink_name: attributes
            .map(|attributes| attributes.drink_name.clone())
            .unwrap_or_default(),
        taste_tags: attributes
            .map(|attributes| attributes.taste_tags.clone())
            .unwrap_or_default(),
        photos: tables
            .review_photos
            .get(&review.id)
            .cloned()
            .unwrap_or_default(),
        helpful_score,
        helpful_count,
        visit_confidence,
        visit_verified: visit_confidence.is_verified(),
        created_at: review.created_at,
        updated_at: review.updated_at,
    }
}

fn newest_first(a: &ReviewListItem, b: &ReviewListItem) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

fn feed_order(sort: ReviewSort, a: &ReviewListItem, b: &ReviewListItem) -> Ordering {
    match sort {
        ReviewSort::New => newest_first(a, b),
        ReviewSort::Helpful => b
            .helpful_score
            .total_cmp(&a.helpful_score)
            .then_with(|| newest_first(a, b)),
        ReviewSort::Verified => confidence_rank(b.visit_confidence)
            .cmp(&confidence_rank(a.visit_confidence))
            .then_with(|| newest_first(a, b)),
    }
}

#[async_trait]
impl ReviewQuery for MemoryDatabase {
    async fn cafe_exists(&self, cafe_id: CafeId) -> Result<bool, StoreError> {
        Ok(self.lock().await.cafes.contains_key(&cafe_id))
    }

    async fn list_cafe_reviews(
        &self,
        cafe_id: CafeId,
        sort: ReviewSort,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<ReviewListItem>, StoreError> {
        let offset = usize::try_from(offset)
            .map_err(|_| StoreError::query("listing offset out of range"))?;
        let limit = usize::try_from(limit)
            .map_err(|_| StoreError::query("listing limit out of range"))?;
        let tables = self.lock().await;
        let mut items: Vec<ReviewListItem> = published_at(&tables, cafe_id)
            .into_iter()
            .map(|review| list_item(&tables, review))
            .collect();
        items.sort_by(|a, b| feed_order(sort, a, b));
        Ok(items.into_iter().skip(offset).take(limit).collect())
    }
}

#[async_trait]
impl RatingRepository for MemoryDatabase {
    async fn cafe_exists(&self, cafe_id: CafeId) -> Result<bool, StoreError> {
        Ok(self.lock().await.cafes.contains_key(&cafe_id))
    }

    async fn load_inputs(&self, cafe_id: CafeId) -> Result<CafeRatingInputs, StoreError> {
        let tables = self.lock().await;
        let mut published = published_at(&tables, cafe_id);
        published.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        let reviews = published
            .into_iter()
            .map(|review| facts(&tables, review))
            .collect();

        let ratings: Vec<f64> = tables
            .reviews
            .iter()
            .filter(|review| review.status == ReviewStatus::Published)
            .map(|review| f64::from(review.rating.get()))
            .collect();
        let global_mean = if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
        };
        Ok(CafeRatingInputs {
            reviews,
            global_mean,
        })
    }

    async fn upsert_snapshot(&self, snapshot: &RatingSnapshot) -> Result<(), StoreError> {
        self.lock()
            .await
            .snapshots
            .insert(snapshot.cafe_id, snapshot.clone());
        Ok(())
    }

    async fn find_snapshot(&self, cafe_id: CafeId) -> Result<Option<RatingSnapshot>, StoreError> {
        Ok(self.lock().await.snapshots.get(&cafe_id).cloned())
    }

    async fn list_cafe_ids(&self) -> Result<Vec<CafeId>, StoreError> {
        let mut ids: Vec<CafeId> = self.lock().await.cafes.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

#[async_trait]
impl ReputationRepository for MemoryDatabase {
    async fn append(&self, event: &NewReputationEvent) -> Result<bool, StoreError> {
        Ok(self.lock().await.append_reputation_event(event))
    }

    async fn events_for_user(&self, user_id: UserId) -> Result<Vec<ReputationEvent>, StoreError> {
        Ok(self.lock().await.reputation_events(user_id))
    }
}

#[async_trait]
impl PhotoUploadRepository for MemoryDatabase {
    async fn find(&self, upload_id: PhotoUploadId) -> Result<Option<PhotoUpload>, StoreError> {
        let tables = self.lock().await;
        Ok(tables.uploads.iter().find(|row| row.id == upload_id).cloned())
    }

    async fn claim_for_processing(
        &self,
        upload_id: PhotoUploadId,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> Result<Option<PhotoUpload>, StoreError> {
        let mut tables = self.lock().await;
        let claimed = tables.uploads.iter_mut().find(|row| {
            row.id == upload_id
                && (row.status == PhotoUploadStatus::Pending
                    || (row.status == PhotoUploadStatus::Processing
                        && row.updated_at < stale_before))
        });
        Ok(claimed.map(|row| {
            row.status = PhotoUploadStatus::Processing;
            row.updated_at = now;
            row.clone()
        }))
    }

    async fn mark_ready(
        &self,
        upload_id: PhotoUploadId,
        ready: &ReadyPhoto,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock().await;
        if let Some(row) = tables.uploads.iter_mut().find(|row| row.id == upload_id) {
            row.status = PhotoUploadStatus::Ready;
            row.final_object_key = Some(ready.final_object_key.clone());
            row.mime_type.clone_from(&ready.mime_type);
            row.size_bytes = ready.size_bytes;
            row.error = None;
            row.updated_at = now;
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        upload_id: PhotoUploadId,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock().await;
        if let Some(row) = tables.uploads.iter_mut().find(|row| row.id == upload_id) {
            row.status = PhotoUploadStatus::Failed;
            row.error = Some(error.to_owned());
            row.updated_at = now;
        }
        Ok(())
    }

    async fn sweep(
        &self,
        finished_before: DateTime<Utc>,
        stuck_before: DateTime<Utc>,
    ) -> Result<Vec<PhotoUpload>, StoreError> {
        let mut tables = self.lock().await;
        let (swept, kept): (Vec<PhotoUpload>, Vec<PhotoUpload>) =
            tables.uploads.drain(..).partition(|row| match row.status {
                PhotoUploadStatus::Ready | PhotoUploadStatus::Failed => {
                    row.updated_at < finished_before
                }
                PhotoUploadStatus::Pending | PhotoUploadStatus::Processing => {
                    row.updated_at < stuck_before
                }
            });
        tables.uploads = kept;
        Ok(swept)
    }
}
