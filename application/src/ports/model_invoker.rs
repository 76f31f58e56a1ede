//! Model invoker port
//!
//! Defines the single capability the orchestrator needs from a model
//! backend: send one prompt to one model, get text back or a typed failure.

use async_trait::async_trait;
use council_domain::{FailureKind, ImageAttachment, Message, ModelFailure, ModelId};
use thiserror::Error;

/// One call to one model
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    pub model: ModelId,
    pub system_prompt: Option<String>,
    pub prompt: String,
    /// Prior conversation turns, oldest first
    pub history: Vec<Message>,
    pub images: Vec<ImageAttachment>,
}

impl InvocationRequest {
    pub fn new(model: ModelId, prompt: impl Into<String>) -> Self {
        Self {
            model,
            system_prompt: None,
            prompt: prompt.into(),
            history: Vec::new(),
            images: Vec::new(),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_images(mut self, images: Vec<ImageAttachment>) -> Self {
        self.images = images;
        self
    }
}

/// Successful model output
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationOutput {
    pub text: String,
    pub token_count: Option<u32>,
}

impl InvocationOutput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            token_count: None,
        }
    }

    pub fn with_token_count(mut self, tokens: u32) -> Self {
        self.token_count = Some(tokens);
        self
    }
}

/// A failed model call, classified by [`FailureKind`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct InvocationFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl InvocationFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Timeout, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(FailureKind::RateLimited, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(FailureKind::InvalidResponse, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FailureKind::TransportError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(FailureKind::AuthError, message)
    }

    /// Attach the model this failure belongs to
    pub fn into_model_failure(self, model: ModelId) -> ModelFailure {
        ModelFailure::new(model, self.kind, self.message)
    }
}

/// Gateway to model backends
///
/// Implementations (adapters) live in the infrastructure layer and must be
/// safe to call concurrently for distinct models. Any retrying happens
/// inside the adapter: one call yields one output or one failure.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn invoke(
        &self,
        request: InvocationRequest,
    ) -> Result<InvocationOutput, InvocationFailure>;
}
