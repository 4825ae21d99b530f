//! Scripted history source.

use std::collections::VecDeque;

use driftline_core::TransportError;
use driftline_proto::{HistoryRequest, HistoryResult, IncomingMessage};

/// Queue of scripted history responses.
///
/// Each fetch pops the next scripted page (or error) and records the request
/// for assertions. An exhausted script serves empty pages, which a store
/// interprets as "start of conversation".
#[derive(Debug, Default)]
pub struct ScriptedHistory {
    responses: VecDeque<HistoryResult>,
    requests: Vec<HistoryRequest>,
}

impl ScriptedHistory {
    /// Empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful page.
    pub fn push_page(&mut self, page: Vec<IncomingMessage>) {
        self.responses.push_back(Ok(page));
    }

    /// Queue a failed fetch.
    pub fn push_error(&mut self, error: TransportError) {
        self.responses.push_back(Err(error));
    }

    /// Serve the next scripted response.
    pub fn fetch(&mut self, request: HistoryRequest) -> HistoryResult {
        self.requests.push(request);
        self.responses.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    /// Requests observed so far, oldest first.
    pub fn requests(&self) -> &[HistoryRequest] {
        &self.requests
    }

    /// Number of fetches served.
    pub fn fetch_count(&self) -> usize {
        self.requests.len()
    }
}
