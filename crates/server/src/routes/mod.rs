pub mod areas;
pub mod capabilities;
pub mod enterprises;
pub mod health;
pub mod reports;
pub mod tasks;
pub mod users;
pub mod visits;
pub mod waste_types;
