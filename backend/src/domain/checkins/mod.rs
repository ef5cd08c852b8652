//! Check-ins and visit verification.

mod geo;
mod model;
mod rules;
mod service;

pub use geo::{GeoPoint, InvalidCoordinates, ip_prefix, user_agent_hash};
pub use model::{
    CheckIn, CheckInStatus, Confidence, UnknownCheckInStatus, UnknownConfidence,
    VisitVerification,
};
pub use rules::{CheckInPolicy, classify_confidence, risk_flags};
pub use service::{
    CheckInResponse, CheckInService, ClientContext, StartCheckInRequest, VerifyVisitRequest,
    VerifyVisitResponse,
};
