//! Feedback model and related payloads

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Feedback entity, owned by the user whose username it carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Feedback {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub username: String,
}

/// New feedback creation payload
#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub title: String,
    pub content: String,
    pub username: String,
}

/// Add/update feedback request
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FeedbackForm {
    pub title: String,
    pub content: String,
}

impl FeedbackForm {
    /// Attach the owner to a validated form
    pub fn into_new_feedback(self, username: &str) -> NewFeedback {
        NewFeedback {
            title: self.title,
            content: self.content,
            username: username.to_string(),
        }
    }
}

impl From<Feedback> for FeedbackForm {
    fn from(feedback: Feedback) -> Self {
        Self {
            title: feedback.title,
            content: feedback.content,
        }
    }
}
