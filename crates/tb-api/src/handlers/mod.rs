pub mod analytics;
pub mod blockers;
pub mod cards;
pub mod comments;
pub mod projects;
pub mod subtasks;
pub mod time_logs;
pub mod ws;
