mod acl;
mod identity;

pub use acl::{AclMiddlewareFactory, AclMiddlewareService};
pub use identity::{IdentityMiddlewareFactory, IdentityMiddlewareService};
