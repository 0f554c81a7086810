//! Thread Models
//!
//! Conversation threads, their messages, and aggregated entities.

use serde::{Deserialize, Serialize};

use assetworks_core::CoreError;

/// A conversation that accumulates report versions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    pub title: String,
    pub current_report_id: Option<String>,
    /// Report ids, oldest first
    pub report_history: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Author of a thread message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadRole {
    User,
    Assistant,
}

impl ThreadRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreadRole::User => "user",
            ThreadRole::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for ThreadRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(ThreadRole::User),
            "assistant" => Ok(ThreadRole::Assistant),
            other => Err(CoreError::parse(format!("Unknown message role: {}", other))),
        }
    }
}

/// A single message in a thread
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadMessage {
    pub id: String,
    pub thread_id: String,
    pub role: ThreadRole,
    pub content: String,
    pub report_id: Option<String>,
    pub created_at: String,
}

/// Request body for creating a thread
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateThreadRequest {
    pub title: Option<String>,
}

/// An entity aggregated across every report of a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadEntity {
    pub name: String,
    pub kind: String,
    pub mentions: u32,
    pub report_count: u32,
    pub last_report_id: String,
}
