mod memory_scheduler;
mod priority_scheduler;

pub use memory_scheduler::MemoryScheduler;
pub use priority_scheduler::PriorityScheduler;
