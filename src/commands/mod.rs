pub mod instances;
pub mod serve;
pub mod timeline;
pub mod watch;

// Re-export command functions for convenience
pub use instances::instances;
pub use serve::serve;
pub use timeline::timeline;
pub use watch::watch;
