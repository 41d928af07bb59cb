// Infrastructure for retrograph: source loading, the syn-based frontend,
// and thread pool setup.

pub mod concurrency;
pub mod frontend;
pub mod project_loader;

pub use frontend::Frontend;
pub use project_loader::ProjectLoader;
