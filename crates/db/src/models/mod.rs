pub mod area;
pub mod capability;
pub mod collection_visit;
pub mod enterprise;
pub mod ids;
pub mod task;
pub mod task_assignment;
pub mod user;
pub mod waste_report;
pub mod waste_type;
