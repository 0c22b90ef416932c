//! Feedback service models

pub mod feedback;
pub mod user;

// Re-export for convenience
pub use feedback::{Feedback, FeedbackForm, NewFeedback};
pub use user::{LoginCredentials, NewUser, RegisterForm, User, UserResponse, UserSummary};
