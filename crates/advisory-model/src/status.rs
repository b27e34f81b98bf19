//! Request status lifecycle labels
//!
//! Stored rows spell a few statuses in more than one way; each spelling maps
//! onto a single variant and is written back using the primary label.

use crate::error::ModelError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Status of an advisory request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RequestStatus {
    /// Drafted by the requestor, not yet submitted
    New,
    /// Submitted, waiting for triage
    Submitted,
    /// Being triaged ("In Review" / "Under Review")
    InReview,
    /// Assignee is estimating the work
    Estimation,
    /// Assignee reviews the frozen estimate and sets billability
    Review,
    /// Waiting for the service lead
    PendingReview,
    /// Waiting for the advisory head
    PendingReviewByAdvisoryHead,
    /// Approved ("Approved" / "Approved by Advisory Head")
    Approved,
    /// Waiting for the requestor to accept the estimate
    Approval,
    /// Scope being discussed with the requestor
    UnderDiscussion,
    /// Work in progress
    Implementing,
    /// Work delivered
    Implemented,
    /// Waiting for requestor feedback
    AwaitingFeedback,
    /// Requestor feedback received
    FeedbackReceived,
    /// Parked
    OnHold,
    /// Closed out
    Closed,
    /// Rejected ("Rejected" / "Reject")
    Rejected,
    /// Withdrawn
    Cancelled,
    /// Work finished, awaiting closure
    Completed,
}

impl RequestStatus {
    /// Every status, in lifecycle order
    pub const ALL: [RequestStatus; 19] = [
        Self::New,
        Self::Submitted,
        Self::InReview,
        Self::Estimation,
        Self::Review,
        Self::PendingReview,
        Self::PendingReviewByAdvisoryHead,
        Self::Approved,
        Self::Approval,
        Self::UnderDiscussion,
        Self::Implementing,
        Self::Implemented,
        Self::AwaitingFeedback,
        Self::FeedbackReceived,
        Self::OnHold,
        Self::Closed,
        Self::Rejected,
        Self::Cancelled,
        Self::Completed,
    ];

    /// Primary label as stored by the backend
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Submitted => "Submitted",
            Self::InReview => "In Review",
            Self::Estimation => "Estimation",
            Self::Review => "Review",
            Self::PendingReview => "Pending Review",
            Self::PendingReviewByAdvisoryHead => "Pending Review by Advisory Head",
            Self::Approved => "Approved",
            Self::Approval => "Approval",
            Self::UnderDiscussion => "Under Discussion",
            Self::Implementing => "Implementing",
            Self::Implemented => "Implemented",
            Self::AwaitingFeedback => "Awaiting Feedback",
            Self::FeedbackReceived => "Feedback Received",
            Self::OnHold => "On Hold",
            Self::Closed => "Closed",
            Self::Rejected => "Rejected",
            Self::Cancelled => "Cancelled",
            Self::Completed => "Completed",
        }
    }

    /// Terminal statuses cannot be left once entered
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Implemented | Self::Rejected | Self::Cancelled | Self::Closed
        )
    }

    /// Opposite of [`is_terminal`](Self::is_terminal)
    #[inline]
    #[must_use]
    pub const fn is_active(self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RequestStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s.trim() {
            "New" => Self::New,
            "Submitted" => Self::Submitted,
            "In Review" | "Under Review" => Self::InReview,
            "Estimation" => Self::Estimation,
            "Review" => Self::Review,
            "Pending Review" => Self::PendingReview,
            "Pending Review by Advisory Head" => Self::PendingReviewByAdvisoryHead,
            "Approved" | "Approved by Advisory Head" => Self::Approved,
            "Approval" => Self::Approval,
            "Under Discussion" => Self::UnderDiscussion,
            "Implementing" => Self::Implementing,
            "Implemented" => Self::Implemented,
            "Awaiting Feedback" => Self::AwaitingFeedback,
            "Feedback Received" => Self::FeedbackReceived,
            "On Hold" => Self::OnHold,
            "Closed" => Self::Closed,
            "Rejected" | "Reject" => Self::Rejected,
            "Cancelled" => Self::Cancelled,
            "Completed" => Self::Completed,
            other => return Err(ModelError::UnknownStatus(other.to_string())),
        };
        Ok(status)
    }
}

impl Serialize for RequestStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for RequestStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_collapse_onto_one_variant() {
        assert_eq!("Under Review".parse::<RequestStatus>(), Ok(RequestStatus::InReview));
        assert_eq!("Reject".parse::<RequestStatus>(), Ok(RequestStatus::Rejected));
        assert_eq!(
            "Approved by Advisory Head".parse::<RequestStatus>(),
            Ok(RequestStatus::Approved)
        );
    }

    #[test]
    fn labels_round_trip() {
        for status in RequestStatus::ALL {
            assert_eq!(status.label().parse::<RequestStatus>(), Ok(status));
        }
    }

    #[test]
    fn unknown_label_is_an_error() {
        assert!(matches!(
            "Archived".parse::<RequestStatus>(),
            Err(ModelError::UnknownStatus(_))
        ));
    }

    #[test]
    fn terminal_set() {
        let terminal: Vec<_> = RequestStatus::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![
                RequestStatus::Implemented,
                RequestStatus::Closed,
                RequestStatus::Rejected,
                RequestStatus::Cancelled,
            ]
        );
    }

    #[test]
    fn serde_uses_primary_label() {
        let json = serde_json::to_string(&RequestStatus::InReview).unwrap();
        assert_eq!(json, "\"In Review\"");
        let back: RequestStatus = serde_json::from_str("\"Under Review\"").unwrap();
        assert_eq!(back, RequestStatus::InReview);
    }
}
