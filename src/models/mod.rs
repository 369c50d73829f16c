pub mod appointment;
pub mod auth;
pub mod business;
pub mod dashboard;
pub mod invoice;
pub mod order;
pub mod pagination;
pub mod payment;
pub mod points;
pub mod product;
pub mod reward;
pub mod treatment;
pub mod user;
pub mod wallet;

// Re-export common types
pub use auth::*;
pub use pagination::{Page, PageRequest};
pub use user::{User, UserProfile, UserRole};
