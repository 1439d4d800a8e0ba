//! # services
//!
//! Use-case orchestration on top of the domain ports: the ownership-scoped
//! CRUD engine shared by every collection, and account signup/login.

pub mod item_service;
pub mod user_service;
pub mod validation;

pub use item_service::ItemService;
pub use user_service::{AuthSession, LoginRequest, SignupRequest, UserService};
