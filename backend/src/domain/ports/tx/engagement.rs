//! Helpful votes and abuse reports.

use async_trait::async_trait;

use crate::domain::engagement::{AbuseReport, HelpfulVote};
use crate::domain::ports::StoreError;
use crate::domain::{ReportId, ReviewId, UserId};

#[async_trait]
pub trait EngagementTx: Send {
    /// Insert unless (review, voter) already voted. Returns `true` on insert.
    async fn insert_helpful_vote(&mut self, vote: &HelpfulVote) -> Result<bool, StoreError>;

    async fn find_helpful_vote(
        &mut self,
        review_id: ReviewId,
        voter_user_id: UserId,
    ) -> Result<Option<HelpfulVote>, StoreError>;

    /// Insert unless (review, reporter) already reported. Returns `true` on insert.
    async fn insert_abuse_report(&mut self, report: &AbuseReport) -> Result<bool, StoreError>;

    async fn find_abuse_report(
        &mut self,
        review_id: ReviewId,
        reporter_user_id: UserId,
    ) -> Result<Option<AbuseReport>, StoreError>;

    async fn lock_abuse_report(
        &mut self,
        report_id: ReportId,
    ) -> Result<Option<AbuseReport>, StoreError>;

    async fn update_abuse_report(&mut self, report: &AbuseReport) -> Result<(), StoreError>;
}
