//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use super::deadline::Deadlines;
use crate::domain::events::DlqAdmin;
use crate::domain::ports::{
    CheckInCommand, EngagementCommand, PhotoCommand, ReviewFeedQuery, ReviewsCommand,
};
use crate::domain::rating::RatingEngine;
use crate::domain::reputation::ReputationLedger;

/// Parameter object bundling all port implementations for HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub reviews: Arc<dyn ReviewsCommand>,
    pub check_ins: Arc<dyn CheckInCommand>,
    pub engagement: Arc<dyn EngagementCommand>,
    pub photos: Arc<dyn PhotoCommand>,
    pub feed: Arc<dyn ReviewFeedQuery>,
    pub ratings: Arc<RatingEngine>,
    pub reputation: Arc<ReputationLedger>,
    pub dlq: Arc<DlqAdmin>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub reviews: Arc<dyn ReviewsCommand>,
    pub check_ins: Arc<dyn CheckInCommand>,
    pub engagement: Arc<dyn EngagementCommand>,
    pub photos: Arc<dyn PhotoCommand>,
    pub feed: Arc<dyn ReviewFeedQuery>,
    pub ratings: Arc<RatingEngine>,
    pub reputation: Arc<ReputationLedger>,
    pub dlq: Arc<DlqAdmin>,
    pub deadlines: Deadlines,
}

impl HttpState {
    /// Construct state from port implementations and call deadlines.
    pub fn new(ports: HttpStatePorts, deadlines: Deadlines) -> Self {
        let HttpStatePorts {
            reviews,
            check_ins,
            engagement,
            photos,
            feed,
            ratings,
            reputation,
            dlq,
        } = ports;
        Self {
            reviews,
            check_ins,
            engagement,
            photos,
            feed,
            ratings,
            reputation,
            dlq,
            deadlines,
        }
    }
}
