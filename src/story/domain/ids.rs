//! Identifier newtypes for the story domain.
//!
//! Each identifier wraps a UUID so story, revision, review, and idea
//! identifiers cannot be mixed up. Storage keeps them as hyphenated text.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Parses an identifier from its text form.
            ///
            /// # Errors
            ///
            /// Returns [`uuid::Error`] when `value` is not a UUID.
            pub fn parse(value: &str) -> Result<Self, uuid::Error> {
                Uuid::parse_str(value).map(Self)
            }

            /// Returns the wrapped UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl AsRef<Uuid> for $name {
            fn as_ref(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_identifier!(
    /// Unique identifier for a story aggregate.
    StoryId
);

uuid_identifier!(
    /// Reference to the idea a story was developed from.
    ///
    /// Ideas live outside the workflow store, so this is a plain reference
    /// rather than a foreign key.
    IdeaId
);

uuid_identifier!(
    /// Unique identifier for a title or script revision.
    RevisionId
);

uuid_identifier!(
    /// Unique identifier for a review record.
    ReviewId
);
