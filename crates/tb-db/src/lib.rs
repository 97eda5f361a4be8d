//! PostgreSQL persistence for Taskboard RS
//!
//! Connection pooling plus the Postgres [`tb_workflow::WorkflowStore`]
//! implementation the server wires into the workflow engine.

pub mod pool;
pub mod rows;
pub mod store;

pub use pool::{Database, DatabaseConfig};
pub use store::PgWorkflowStore;
