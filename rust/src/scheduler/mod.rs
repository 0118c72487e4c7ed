//! Earliest-start scheduling and headcount demand over time.
//!
//! Tasks start as soon as all their predecessors have finished, with no
//! resource limit. The resulting timeline is cut at every start and end
//! point and the headcount of each piece is the sum over the tasks running
//! through it.

mod headcount;
mod timeline;

pub use headcount::{headcount, headcount_for_subgraph, HeadcountInterval, HeadcountResult};
pub use timeline::{earliest_start_windows, TaskWindow};
