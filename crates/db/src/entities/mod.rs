pub mod area;
pub mod capability;
pub mod collection_visit;
pub mod enterprise;
pub mod evidence_photo;
pub mod task;
pub mod task_assignment;
pub mod user;
pub mod visit_waste_item;
pub mod waste_report;
pub mod waste_type;
