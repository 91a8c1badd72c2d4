//! Group conversation summaries
//!
//! Summaries come from an external text service behind the [`Summarizer`]
//! trait. This crate only assembles the transcript; calling the service
//! happens after the store round trip has finished, never inside a
//! transaction.

use crate::model::GroupId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Summary text returned when a group has no messages yet
pub const EMPTY_SUMMARY: &str = "No messages to summarize.";

/// One message in a transcript, attributed by username
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub sender: String,
    pub content: String,
}

/// Input handed to a [`Summarizer`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub group_id: GroupId,

    /// Oldest first
    pub lines: Vec<TranscriptLine>,
}

impl SummaryRequest {
    pub fn new(group_id: GroupId, lines: Vec<TranscriptLine>) -> Self {
        Self { group_id, lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Distinct senders, sorted
    pub fn participants(&self) -> Vec<String> {
        self.lines
            .iter()
            .map(|line| line.sender.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Plain-text prompt in `sender: content` lines
    pub fn prompt(&self) -> String {
        let mut prompt = String::from(
            "You are an assistant that summarizes group conversations. \
             Given a list of user messages, return a concise summary.\n\nMessages:\n",
        );
        for line in &self.lines {
            prompt.push_str(&line.sender);
            prompt.push_str(": ");
            prompt.push_str(&line.content);
            prompt.push('\n');
        }
        prompt
    }
}

/// Result of summarizing a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub group_id: GroupId,
    pub participants: Vec<String>,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Summarizer request failed: {0}")]
    Upstream(String),

    #[error("Summarizer returned no summary")]
    EmptyResponse,
}

/// External text service that condenses a transcript
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, request: &SummaryRequest) -> Result<String, SummaryError>;
}
