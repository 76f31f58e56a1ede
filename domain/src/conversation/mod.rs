//! Conversation domain.
//!
//! - [`entities::Message`]: a prior turn in the conversation history
//! - [`entities::ImageAttachment`]: an encoded image sent with the prompt

pub mod entities;
