//! Mock provider implementations for testing.

use super::{GenerationParams, ProviderError, ProviderResponse, TextProvider};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

enum Reply {
    Text(String),
    Empty,
    Fail(ProviderError),
    /// Answers with a canned recipe naming the food found in the prompt.
    EchoFood,
}

/// Mock text provider for testing.
pub struct MockTextProvider {
    reply: Reply,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockTextProvider {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new(Reply::Text(text.into()))
    }

    /// Responds successfully but without any generated content.
    pub fn empty() -> Self {
        Self::new(Reply::Empty)
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(Reply::Fail(error))
    }

    pub fn echo_food() -> Self {
        Self::new(Reply::EchoFood)
    }

    fn new(reply: Reply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }
}

/// Pulls the quoted food name out of a recipe prompt.
fn quoted_food(prompt: &str) -> &str {
    prompt.split('\'').nth(1).unwrap_or("something")
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn generate(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        match &self.reply {
            Reply::Text(text) => Ok(ProviderResponse::text(text.clone())),
            Reply::Empty => Ok(ProviderResponse {
                text: None,
                ..ProviderResponse::text("")
            }),
            Reply::Fail(error) => Err(error.clone()),
            Reply::EchoFood => {
                let food = quoted_food(prompt);
                Ok(ProviderResponse::text(format!(
                    "Ingredients:\n- {food}\nInstructions:\n1. Serve the {food}."
                )))
            }
        }
    }
}
