//! Checkout state machine.

/// The stage a checkout has reached.
///
/// State transitions:
/// ```text
/// Started ──► StockValidating ──► StockReserved ──► OrderPersisted ──► CartCleared ──► Committed
///    │              │                   │                 │                 │
///    └──────────────┴───────────────────┴─────────────────┴─────────────────┴──► RolledBack
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CheckoutState {
    #[default]
    Started,
    StockValidating,
    StockReserved,
    OrderPersisted,
    CartCleared,
    Committed,
    RolledBack,
}

impl CheckoutState {
    /// Returns true if `next` directly follows this state.
    pub fn can_transition_to(&self, next: CheckoutState) -> bool {
        use CheckoutState::*;
        match (self, next) {
            (Committed | RolledBack, _) => false,
            (_, RolledBack) => true,
            (Started, StockValidating)
            | (StockValidating, StockReserved)
            | (StockReserved, OrderPersisted)
            | (OrderPersisted, CartCleared)
            | (CartCleared, Committed) => true,
            _ => false,
        }
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutState::Committed | CheckoutState::RolledBack)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Started => "Started",
            CheckoutState::StockValidating => "StockValidating",
            CheckoutState::StockReserved => "StockReserved",
            CheckoutState::OrderPersisted => "OrderPersisted",
            CheckoutState::CartCleared => "CartCleared",
            CheckoutState::Committed => "Committed",
            CheckoutState::RolledBack => "RolledBack",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tracks one checkout attempt through its states.
#[derive(Debug, Default)]
pub(crate) struct CheckoutProgress {
    state: CheckoutState,
}

impl CheckoutProgress {
    pub(crate) fn state(&self) -> CheckoutState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: CheckoutState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal checkout transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(from = %self.state, to = %next, "checkout transition");
        self.state = next;
    }
}
