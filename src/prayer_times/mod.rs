pub mod clock;
pub mod schedule;
pub mod ticker;

pub use clock::{Clock, SystemClock};
pub use schedule::{ScheduleSnapshot, compute_schedule, day_table, other_times};
pub use ticker::{ScheduleTicker, SharedTimings};
