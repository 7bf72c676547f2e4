// Infrastructure layer (shared components)
pub mod config;
pub mod error;
pub mod telemetry;

// Domain layer (rendering core)
pub mod render;
pub mod stream;
pub mod value;

// Application layer
pub mod campaign;
pub mod delivery;

// External collaborators (narrow seams)
pub mod store;
pub mod transport;
