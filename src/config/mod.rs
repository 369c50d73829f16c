// Static configuration tables

pub mod permissions;

pub use permissions::{Permission, PermissionConfig};
