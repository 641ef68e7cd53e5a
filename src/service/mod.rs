//! Service layer
//!
//! Business logic between the HTTP handlers and the data layer.

mod community;

pub use community::CommunityService;
