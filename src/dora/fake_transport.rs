use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::dora::dora_client::CatalogTransport;
use crate::dora::error::CatalogError;

type Reply = Result<String, u16>;

/// Canned catalog responses keyed by full url. Unknown urls answer 404.
///
/// Replies registered for the same url are served in order; the last one
/// repeats.
#[derive(Default)]
pub struct FakeTransport {
    responses: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, url: &str, body: &str) -> Self {
        self.push(url, Ok(body.to_string()))
    }

    pub fn fail(self, url: &str, status: u16) -> Self {
        self.push(url, Err(status))
    }

    fn push(self, url: &str, reply: Reply) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn next_reply(&self, url: &str) -> Reply {
        let mut responses = self.responses.lock().unwrap();
        match responses.get_mut(url) {
            Some(replies) if replies.len() > 1 => replies.pop_front().unwrap_or(Err(404)),
            Some(replies) => replies.front().cloned().unwrap_or(Err(404)),
            None => Err(404),
        }
    }
}

#[async_trait]
impl CatalogTransport for FakeTransport {
    async fn get(&self, url: &str) -> Result<String, CatalogError> {
        self.requests.lock().unwrap().push(url.to_string());

        self.next_reply(url).map_err(|status| CatalogError::Status {
            url: url.to_string(),
            status,
            body: String::new(),
        })
    }
}
