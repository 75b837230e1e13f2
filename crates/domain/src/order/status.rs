//! Order status state machine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// Pending ──► Paid ──► Shipped ──► Completed
///    │         │
///    └─────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order placed, awaiting payment.
    #[default]
    Pending,

    /// Payment confirmed.
    Paid,

    /// Handed to the carrier.
    Shipped,

    /// Order was cancelled (terminal state).
    Cancelled,

    /// Order was delivered (terminal state).
    Completed,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Shipped,
        OrderStatus::Cancelled,
        OrderStatus::Completed,
    ];

    /// Statuses reachable from this one in a single step.
    pub fn allowed_transitions(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[OrderStatus::Paid, OrderStatus::Cancelled],
            OrderStatus::Paid => &[OrderStatus::Shipped, OrderStatus::Cancelled],
            OrderStatus::Shipped => &[OrderStatus::Completed],
            OrderStatus::Cancelled | OrderStatus::Completed => &[],
        }
    }

    /// Returns true if `next` is a legal successor. Self transitions never are.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Returns true if the owner may cancel the order in this status.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Completed)
    }

    /// Returns true if entering this status gives the order's units back to stock.
    pub fn returns_stock(&self) -> bool {
        matches!(self, OrderStatus::Cancelled)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a status name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown order status: {0}")]
pub struct ParseOrderStatusError(pub String);

impl std::str::FromStr for OrderStatus {
    type Err = ParseOrderStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseOrderStatusError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_pending_transitions() {
        let status = OrderStatus::Pending;
        assert!(status.can_transition_to(OrderStatus::Paid));
        assert!(status.can_transition_to(OrderStatus::Cancelled));
        assert!(!status.can_transition_to(OrderStatus::Shipped));
        assert!(!status.can_transition_to(OrderStatus::Completed));
        assert!(status.can_cancel());
        assert!(!status.is_terminal());
    }

    #[test]
    fn test_paid_transitions() {
        let status = OrderStatus::Paid;
        assert!(status.can_transition_to(OrderStatus::Shipped));
        assert!(status.can_transition_to(OrderStatus::Cancelled));
        assert!(!status.can_transition_to(OrderStatus::Pending));
        assert!(!status.can_cancel());
    }

    #[test]
    fn test_shipped_transitions() {
        let status = OrderStatus::Shipped;
        assert_eq!(status.allowed_transitions(), &[OrderStatus::Completed]);
        assert!(!status.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_terminal_statuses() {
        for status in [OrderStatus::Cancelled, OrderStatus::Completed] {
            assert!(status.is_terminal());
            for next in OrderStatus::ALL {
                assert!(!status.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_self_transitions_rejected() {
        for status in OrderStatus::ALL {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn test_exactly_five_legal_pairs() {
        let legal = OrderStatus::ALL
            .iter()
            .flat_map(|from| OrderStatus::ALL.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| from.can_transition_to(*to))
            .count();
        assert_eq!(legal, 5);
    }

    #[test]
    fn test_only_cancelled_returns_stock() {
        for status in OrderStatus::ALL {
            assert_eq!(status.returns_stock(), status == OrderStatus::Cancelled);
        }
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert_eq!(
            "refunded".parse::<OrderStatus>(),
            Err(ParseOrderStatusError("refunded".to_string()))
        );
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&OrderStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
    }
}
