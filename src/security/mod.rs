//! Classification-based access control: security levels scoped to a project,
//! grants to a single user, team or project role, and access resolution for
//! levels and for the tickets and projects that carry them.

pub mod catalog;
pub mod directory;
pub mod error;
pub mod events;
pub mod gate;
pub mod grants;
pub mod model;
pub mod payload;
pub mod pg_store;
pub mod resolver;
pub mod service;
pub mod store;

pub use catalog::SecurityLevelCatalog;
pub use directory::{
    EntityClassification, PgDirectory, ProjectDirectory, ProjectRoleMembership, StaticDirectory,
    TeamMembership,
};
pub use error::SecurityError;
pub use events::{BroadcastNotifier, EventNotifier, SecurityEvent};
pub use gate::{AccessClaimGate, Capability, GateError, HttpPermissionGate, PermissionGate};
pub use grants::{GrantRegistry, Revocation};
pub use model::{Classification, EntityKind, EntityMarking, EntityRef, Grant, RecipientRef, SecurityLevel};
pub use pg_store::PgSecurityStore;
pub use resolver::{AccessPath, AccessResolver, EntityAccess};
pub use service::{AccessDecision, EntityAccessDecision, SecurityService};
pub use store::{GrantInsert, MemoryStore, RemovedLevel, SecurityStore};
