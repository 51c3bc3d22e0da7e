//! Cached document copies.
//!
//! A copy is keyed by the ephemeral id of the access attempt that produced
//! it. Its status only moves forward: `Active` to `Expired`, `Viewed` or
//! `Revoked`, never back.

use serde::{Deserialize, Serialize};

use clearance_core::{DocumentId, EphemeralId};

use crate::error::ExpiryError;

/// Lifecycle state of a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyStatus {
    Active,
    Expired,
    Viewed,
    Revoked,
}

impl CopyStatus {
    /// Stable text form used in storage.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Viewed => "viewed",
            Self::Revoked => "revoked",
        }
    }

    /// Parse the storage form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "expired" => Some(Self::Expired),
            "viewed" => Some(Self::Viewed),
            "revoked" => Some(Self::Revoked),
            _ => None,
        }
    }

    /// Whether moving to `next` is allowed.
    pub fn can_transition_to(self, next: CopyStatus) -> bool {
        self == next || self == Self::Active
    }
}

/// View limit of a copy. Serialized as `-1` for unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum MaxViews {
    Unlimited,
    Limited(u32),
}

impl TryFrom<i64> for MaxViews {
    type Error = String;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        match n {
            -1 => Ok(Self::Unlimited),
            n if (0..=u32::MAX as i64).contains(&n) => Ok(Self::Limited(n as u32)),
            n => Err(format!("invalid max views: {n}")),
        }
    }
}

impl From<MaxViews> for i64 {
    fn from(m: MaxViews) -> Self {
        match m {
            MaxViews::Unlimited => -1,
            MaxViews::Limited(n) => i64::from(n),
        }
    }
}

/// Views left on a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RemainingViews {
    Unlimited,
    Count(u32),
}

/// Where the document bytes live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CopyContent {
    /// Encrypted bytes held locally.
    Inline { sealed: Vec<u8> },
    /// Pointer to fetch the encrypted bytes from.
    Remote { url: String },
}

/// A state change applied atomically to one stored copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyUpdate {
    /// Re-evaluate validity, flipping the status if it lapsed.
    Refresh { now: i64 },
    /// Count one view if the copy is still valid.
    RecordView { now: i64 },
    /// Move an active copy to `Revoked`.
    Revoke,
}

/// A locally cached document copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocumentCopy {
    pub ephemeral_id: EphemeralId,
    pub document_id: DocumentId,
    /// Identifier the authority assigned to this disclosure.
    pub copy_id: String,
    pub content: CopyContent,
    pub created_at: i64,
    pub expires_at: i64,
    pub view_count: u32,
    pub max_views: MaxViews,
    pub last_viewed_at: Option<i64>,
    pub status: CopyStatus,
}

impl StoredDocumentCopy {
    /// Why the copy is unreadable at `now`, or `None` if it is readable.
    ///
    /// Pure; does not touch the status.
    pub fn check(&self, now: i64) -> Option<ExpiryError> {
        match self.status {
            CopyStatus::Revoked => return Some(ExpiryError::Revoked),
            CopyStatus::Expired => {
                return Some(ExpiryError::Expired {
                    expires_at: self.expires_at,
                })
            }
            CopyStatus::Viewed | CopyStatus::Active => {}
        }
        if now >= self.expires_at {
            return Some(ExpiryError::Expired {
                expires_at: self.expires_at,
            });
        }
        if let MaxViews::Limited(max_views) = self.max_views {
            if self.view_count >= max_views {
                return Some(ExpiryError::ViewLimitReached { max_views });
            }
        }
        None
    }

    /// Views left, assuming the copy is valid.
    pub fn remaining_views(&self) -> RemainingViews {
        match self.max_views {
            MaxViews::Unlimited => RemainingViews::Unlimited,
            MaxViews::Limited(max) => RemainingViews::Count(max.saturating_sub(self.view_count)),
        }
    }

    /// Validity check that records a lapse in the status.
    pub fn refresh(&mut self, now: i64) -> Result<(), ExpiryError> {
        match self.check(now) {
            None => Ok(()),
            Some(reason) => {
                let next = match reason {
                    ExpiryError::Expired { .. } => CopyStatus::Expired,
                    ExpiryError::ViewLimitReached { .. } => CopyStatus::Viewed,
                    ExpiryError::Revoked => CopyStatus::Revoked,
                };
                if self.status.can_transition_to(next) {
                    self.status = next;
                }
                Err(reason)
            }
        }
    }

    /// The reason a copy in a terminal status is unreadable.
    fn terminal_reason(&self) -> ExpiryError {
        match (self.status, self.max_views) {
            (CopyStatus::Viewed, MaxViews::Limited(max_views)) => {
                ExpiryError::ViewLimitReached { max_views }
            }
            (CopyStatus::Revoked, _) => ExpiryError::Revoked,
            _ => ExpiryError::Expired {
                expires_at: self.expires_at,
            },
        }
    }

    /// Apply an update in place.
    ///
    /// Denied view attempts leave the view count and timestamps untouched.
    pub fn apply(&mut self, update: CopyUpdate) -> Result<RemainingViews, ExpiryError> {
        match update {
            CopyUpdate::Refresh { now } => {
                self.refresh(now)?;
                Ok(self.remaining_views())
            }
            CopyUpdate::RecordView { now } => {
                self.refresh(now)?;
                self.view_count = self.view_count.saturating_add(1);
                self.last_viewed_at = Some(now);
                Ok(self.remaining_views())
            }
            CopyUpdate::Revoke => {
                if self.status != CopyStatus::Active {
                    return Err(self.terminal_reason());
                }
                self.status = CopyStatus::Revoked;
                Ok(RemainingViews::Count(0))
            }
        }
    }
}
