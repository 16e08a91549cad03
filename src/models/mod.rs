//! Tournament domain models.
//!
//! Provides the core data types the schedulers and the bracket engine
//! exchange with their collaborators.
//!
//! # Domain Mappings
//!
//! | u-tournament | Classic scheduling |
//! |--------------|--------------------|
//! | Match | Job with one operation |
//! | Court | Machine |
//! | Team | Shared resource two jobs may not hold at once |
//! | Schedule | Machine assignment + start times |

pub mod calendar;
mod constraint;
mod court;
mod fixture;
mod schedule;
mod team;

pub use calendar::TimeWindow;
pub use constraint::{ConstraintSet, TeamRule, TeamWindow};
pub use court::{Court, CourtDay};
pub use fixture::{BracketSide, Match, MatchId, Participant, Phase};
pub use schedule::{Assignment, HardConstraint, Schedule, Unscheduled};
pub use team::Team;
