//! Pure domain computations.
//!
//! Everything here is synchronous and side-effect free: callers pass read
//! snapshots (and the current time where relevant) and get derived views back.

pub mod ranking;
pub mod stats;
pub mod status;
pub mod validation;

pub use ranking::{percentage, rank, tally, total_votes, winner, RankedProposal, Tally};
pub use stats::{
    active_session_count, completed_session_count, expired_session_count, filter_groups,
    group_stats, recent_wins, results_summary, time_ago, weekly_win_count, GroupStats, RecentWin,
    ResultsSummary, RECENT_WINS_LIMIT,
};
pub use status::{is_session_locked, resolve_status};
pub use validation::{
    validate_group_input, validate_option_input, validate_session_input, ValidationErrors,
};
