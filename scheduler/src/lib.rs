//! Request schedulers: the queue of not yet dispatched requests that the
//! seeding coordinator interleaves with a spider's seeds.

mod dupefilter;
mod scheduler_trait;
mod schedulers;
mod types;

pub use dupefilter::DupeFilter;
pub use scheduler_trait::Scheduler;
pub use schedulers::{MemoryScheduler, PriorityScheduler};
pub use types::{SchedulerConfig, SchedulerType};
