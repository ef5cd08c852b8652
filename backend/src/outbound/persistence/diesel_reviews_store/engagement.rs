//! Helpful votes and abuse reports.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::engagement::{AbuseReport, HelpfulVote};
use crate::domain::ports::StoreError;
use crate::domain::ports::tx::EngagementTx;
use crate::domain::{ReportId, ReviewId, UserId};

use super::DieselReviewsTx;
use crate::outbound::persistence::diesel_helpers::{inserted, map_diesel_error};
use crate::outbound::persistence::models::{AbuseReportRow, HelpfulVoteRow};
use crate::outbound::persistence::schema::{abuse_reports, helpful_votes};

#[async_trait]
impl EngagementTx for DieselReviewsTx<'_> {
    async fn insert_helpful_vote(&mut self, vote: &HelpfulVote) -> Result<bool, StoreError> {
        diesel::insert_into(helpful_votes::table)
            .values(HelpfulVoteRow::from(vote))
            .on_conflict((helpful_votes::review_id, helpful_votes::voter_user_id))
            .do_nothing()
            .execute(self.conn())
            .await
            .map(inserted)
            .map_err(map_diesel_error)
    }

    async fn find_helpful_vote(
        &mut self,
        review_id: ReviewId,
        voter_user_id: UserId,
    ) -> Result<Option<HelpfulVote>, StoreError> {
        let row: Option<HelpfulVoteRow> = helpful_votes::table
            .filter(helpful_votes::review_id.eq(review_id.as_uuid()))
            .filter(helpful_votes::voter_user_id.eq(voter_user_id.as_uuid()))
            .select(HelpfulVoteRow::as_select())
            .first(self.conn())
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(HelpfulVote::from))
    }

    async fn insert_abuse_report(&mut self, report: &AbuseReport) -> Result<bool, StoreError> {
        diesel::insert_into(abuse_reports::table)
            .values(AbuseReportRow::from(report))
            .on_conflict((abuse_reports::review_id, abuse_reports::reporter_user_id))
            .do_nothing()
            .execute(self.conn())
            .await
            .map(inserted)
            .map_err(map_diesel_error)
    }

    async fn find_abuse_report(
        &mut self,
        review_id: ReviewId,
        reporter_user_id: UserId,
    ) -> Result<Option<AbuseReport>, StoreError> {
        let row: Option<AbuseReportRow> = abuse_reports::table
            .filter(abuse_reports::review_id.eq(review_id.as_uuid()))
            .filter(abuse_reports::reporter_user_id.eq(reporter_user_id.as_uuid()))
            .select(AbuseReportRow::as_select())
            .first(self.conn())
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(AbuseReport::try_from).transpose()
    }

    async fn lock_abuse_report(
        &mut self,
        report_id: ReportId,
    ) -> Result<Option<AbuseReport>, StoreError> {
        let row: Option<AbuseReportRow> = abuse_reports::table
            .find(report_id.as_uuid())
            .select(AbuseReportRow::as_select())
            .for_update()
            .first(self.conn())
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(AbuseReport::try_from).transpose()
    }

    async fn update_abuse_report(&mut self, report: &AbuseReport) -> Result<(), StoreError> {
        let row = AbuseReportRow::from(report);
        diesel::update(abuse_reports::table.find(report.id.as_uuid()))
            .set(&row)
            .execute(self.conn())
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }
}
