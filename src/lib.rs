pub mod arguments;
pub mod config;
pub mod errors; // Structured error handling
pub mod logger;
pub mod positions; // Position model, tick state machine, engine registry
pub mod pricing; // Price feed abstraction and replay tape
pub mod trader; // Exit policy, re-entry, executors, monitors
