//! Chat completion types and helpers

pub mod image;
pub mod models;

pub use image::image_data_uri;
pub use models::{
    ChatOptions, ChatRequest, ChatResponse, Choice, ContentPart, ImageUrl, Message,
    MessageContent, ResponseMessage, Role, Usage,
};

use crate::error::{LlmError, Result};

/// Reject message sequences the API cannot accept
pub fn validate_messages(messages: &[Message]) -> Result<()> {
    if messages.is_empty() {
        return Err(LlmError::InvalidInput("Message sequence cannot be empty".to_string()));
    }

    for (i, message) in messages.iter().enumerate() {
        if let MessageContent::Parts(parts) = &message.content {
            if parts.is_empty() {
                return Err(LlmError::InvalidInput(format!("Message {} has no content parts", i)));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sequence_rejected() {
        assert!(matches!(validate_messages(&[]), Err(LlmError::InvalidInput(_))));
    }

    #[test]
    fn test_empty_parts_rejected() {
        let message = Message {
            role: Role::User,
            content: MessageContent::Parts(Vec::new()),
        };

        assert!(validate_messages(&[Message::system("be brief"), message]).is_err());
    }

    #[test]
    fn test_text_sequence_accepted() {
        assert!(validate_messages(&[Message::system("be brief"), Message::user("hi")]).is_ok());
    }
}
