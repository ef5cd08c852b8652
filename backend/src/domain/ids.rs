//! Opaque identifiers for reviews-core entities.
//!
//! Every identifier is a UUID newtype so a `ReviewId` can never be passed
//! where a `CafeId` is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Fresh random identifier.
            #[must_use]
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

define_uuid_id!(
    /// Authenticated user, as supplied by the identity provider.
    UserId
);
define_uuid_id!(
    /// Café being reviewed.
    CafeId
);
define_uuid_id!(
    /// Review row.
    ReviewId
);
define_uuid_id!(
    /// Catalogue drink.
    DrinkId
);
define_uuid_id!(
    /// Check-in row.
    CheckInId
);
define_uuid_id!(
    /// Visit verification row.
    VerificationId
);
define_uuid_id!(
    /// Helpful vote row.
    VoteId
);
define_uuid_id!(
    /// Abuse report row.
    ReportId
);
define_uuid_id!(
    /// Outbox event row.
    EventId
);
define_uuid_id!(
    /// Consumer inbox row.
    InboxId
);
define_uuid_id!(
    /// Dead-letter row.
    DlqId
);
define_uuid_id!(
    /// Photo upload row.
    PhotoUploadId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialise_as_bare_uuid_strings() {
        let id = ReviewId::from_uuid(Uuid::nil());
        let value = serde_json::to_value(id).expect("serialise id");
        assert_eq!(value, serde_json::json!("00000000-0000-0000-0000-000000000000"));
    }

    #[test]
    fn parsing_tolerates_surrounding_whitespace() {
        let id: CafeId = " 00000000-0000-0000-0000-000000000000 "
            .parse()
            .expect("parse id");
        assert_eq!(id.as_uuid(), &Uuid::nil());
    }
}
