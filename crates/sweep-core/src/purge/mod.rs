//! Convergence loops that turn "delete everything" into bounded remote calls.
//!
//! Every loop has an explicit terminal predicate and stops at
//! `PurgeLimits::max_iterations` at the latest. A backend error stops the
//! loop where it happened; work done so far is not rolled back.

pub mod members;
pub mod messages;

pub use members::{MemberPurgeReport, MembershipPurger};
pub use messages::{BulkMessagePurger, PurgeReport};

/// Why a purge loop stopped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TerminalReason {
    /// Nothing matched when the loop started; no mutation was issued.
    #[default]
    NothingToDo,
    /// A sender search reported fewer matches than one page.
    BelowPageSize,
    /// The chat reports no remaining message, or the id sweep was issued.
    Exhausted,
    /// Every removable member was removed.
    QuotaReached,
    /// A pass made no progress (only unremovable candidates were left).
    Stalled,
    /// The safety cap on loop iterations was hit.
    IterationCap,
}
