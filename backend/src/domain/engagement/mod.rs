//! Helpful votes and abuse reports.

mod model;
mod service;

pub use model::{
    AbuseReason, AbuseReport, AbuseStatus, HelpfulVote, UnknownAbuseValue, VOTE_WEIGHT_MAX,
    VOTE_WEIGHT_MIN, helpful_vote_weight,
};
pub use service::{
    ABUSE_DETAILS_MAX_CHARS, AbuseReportRequest, AbuseReportResponse, EngagementService,
    HelpfulVoteResponse,
};
