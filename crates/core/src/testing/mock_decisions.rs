//! Scripted decision channel.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};

use crate::notify::{DecisionChannel, DecisionError, DecisionPrompt};

enum AnswerSource {
    /// Answers popped in order; an empty queue reads as a closed channel.
    Queue(Mutex<VecDeque<Result<bool, DecisionError>>>),
    /// Answers sent by the test while the batch is suspended.
    Manual(tokio::sync::Mutex<mpsc::UnboundedReceiver<bool>>),
    /// Never answers.
    Silent,
}

/// Mock implementation of the DecisionChannel trait.
///
/// Records every prompt and answers from a script, from a test-held
/// sender, or not at all.
pub struct ScriptedDecisions {
    source: AnswerSource,
    prompts: Mutex<Vec<DecisionPrompt>>,
    prompted: Notify,
}

impl Default for ScriptedDecisions {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedDecisions {
    /// Answer from a queue filled with [`push_answer`](Self::push_answer).
    pub fn new() -> Self {
        Self::with_source(AnswerSource::Queue(Mutex::new(VecDeque::new())))
    }

    /// Answer with whatever the test sends, after the prompt is raised.
    pub fn manual() -> (Self, mpsc::UnboundedSender<bool>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self::with_source(AnswerSource::Manual(tokio::sync::Mutex::new(rx))),
            tx,
        )
    }

    /// Never answer.
    pub fn never_answering() -> Self {
        Self::with_source(AnswerSource::Silent)
    }

    fn with_source(source: AnswerSource) -> Self {
        Self {
            source,
            prompts: Mutex::new(Vec::new()),
            prompted: Notify::new(),
        }
    }

    pub fn push_answer(&self, resume: bool) {
        if let AnswerSource::Queue(queue) = &self.source {
            queue.lock().unwrap().push_back(Ok(resume));
        }
    }

    pub fn push_error(&self, error: DecisionError) {
        if let AnswerSource::Queue(queue) = &self.source {
            queue.lock().unwrap().push_back(Err(error));
        }
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<DecisionPrompt> {
        self.prompts.lock().unwrap().clone()
    }

    /// Wait until a prompt has been raised.
    pub async fn wait_for_prompt(&self) {
        self.prompted.notified().await;
    }
}

#[async_trait]
impl DecisionChannel for ScriptedDecisions {
    async fn request_decision(&self, prompt: DecisionPrompt) -> Result<bool, DecisionError> {
        self.prompts.lock().unwrap().push(prompt);
        self.prompted.notify_one();

        match &self.source {
            AnswerSource::Queue(queue) => {
                let next = queue.lock().unwrap().pop_front();
                next.unwrap_or(Err(DecisionError::ChannelClosed))
            }
            AnswerSource::Manual(rx) => {
                let mut rx = rx.lock().await;
                rx.recv().await.ok_or(DecisionError::ChannelClosed)
            }
            AnswerSource::Silent => std::future::pending().await,
        }
    }
}
