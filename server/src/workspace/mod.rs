pub mod service;

pub use service::{WorkspaceMembers, WorkspaceService, WorkspaceWithMembers};
