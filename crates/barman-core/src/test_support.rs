//! In-process stand-in for the backup tool, used by unit tests.

use crate::runner::{ProcessOutput, ProcessSpawner};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// One scripted reply.
#[derive(Debug, Clone)]
pub(crate) enum FakeResponse {
    Exit {
        code: Option<i32>,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    },
    SpawnError(String),
}

/// Records every argv it is asked to spawn and answers from a script.
///
/// Queued responses are used first; once the queue is empty every call
/// succeeds with the default document.
pub(crate) struct FakeSpawner {
    default: Value,
    queue: Mutex<VecDeque<FakeResponse>>,
    calls: Mutex<Vec<Vec<String>>>,
    delay: Option<Duration>,
}

impl FakeSpawner {
    pub(crate) fn new(default: Value) -> Self {
        Self {
            default,
            queue: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn push(&self, response: FakeResponse) {
        self.queue.lock().unwrap().push_back(response);
    }

    pub(crate) fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ProcessSpawner for FakeSpawner {
    async fn spawn(&self, argv: &[String]) -> std::io::Result<ProcessOutput> {
        self.calls.lock().unwrap().push(argv.to_vec());
        let response = self.queue.lock().unwrap().pop_front();

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match response {
            Some(FakeResponse::Exit {
                code,
                stdout,
                stderr,
            }) => Ok(ProcessOutput {
                code,
                stdout,
                stderr,
            }),
            Some(FakeResponse::SpawnError(message)) => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                message,
            )),
            None => Ok(ProcessOutput {
                code: Some(0),
                stdout: self.default.to_string().into_bytes(),
                stderr: Vec::new(),
            }),
        }
    }
}
