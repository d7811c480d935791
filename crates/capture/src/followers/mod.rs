//! Following capture policies.
//!
//! Followers consume the driver-supplied capture range as given; none of
//! them mutate `lower_stamp` or `upper_stamp`.

mod any_before;
mod before;
mod closest_before;
mod latched;
mod matched;
mod ranged;

pub use any_before::AnyBefore;
pub use before::Before;
pub use closest_before::ClosestBefore;
pub use latched::Latched;
pub use matched::Matched;
pub use ranged::Ranged;
