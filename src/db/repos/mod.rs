pub mod events;
pub mod focus_groups;
pub mod personas;
pub mod projects;
pub mod responses;
