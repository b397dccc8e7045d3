use crate::error::{LmChatError, Result};
use crate::models::{ContentBlock, Message, Role, ToolCall};

/// Ordered turn history sent as the `messages` array of every request.
///
/// Always starts with the system prompt; everything after it is append-only
/// until [`Conversation::clear`].
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    system_prompt: String,
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        Self {
            messages: vec![Message::system(system_prompt.clone())],
            system_prompt,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether anything beyond the system prompt has been recorded.
    pub fn has_history(&self) -> bool {
        self.messages.iter().any(|m| m.role != Role::System)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn append_user(&mut self, text: impl Into<String>, images: Vec<ContentBlock>) {
        self.push(Message::user_with_images(text, images));
    }

    pub fn append_assistant(&mut self, text: impl Into<String>, tool_calls: Option<Vec<ToolCall>>) {
        let message = match tool_calls {
            Some(calls) if !calls.is_empty() => {
                Message::assistant_with_tool_calls(calls, Some(text.into()))
            }
            _ => Message::assistant(text),
        };
        self.push(message);
    }

    /// Records a tool's output. The id must name the call it answers.
    pub fn append_tool_result(
        &mut self,
        tool_call_id: impl Into<String>,
        result: impl Into<String>,
    ) -> Result<()> {
        let tool_call_id = tool_call_id.into();
        if tool_call_id.trim().is_empty() {
            return Err(LmChatError::InvalidInput(
                "Tool call ID cannot be empty".to_string(),
            ));
        }
        self.push(Message::tool_result(tool_call_id, result));
        Ok(())
    }

    /// Drops all turns. A non-empty prompt replaces the stored one.
    pub fn clear(&mut self, new_system_prompt: Option<&str>) {
        if let Some(prompt) = new_system_prompt.filter(|p| !p.is_empty()) {
            self.system_prompt = prompt.to_string();
        }
        self.messages.clear();
        self.messages.push(Message::system(self.system_prompt.clone()));
    }

    /// The history followed by `pending`, without recording `pending`.
    pub(crate) fn with_pending(&self, pending: Option<&Message>) -> Vec<Message> {
        let mut messages = self.messages.clone();
        messages.extend(pending.cloned());
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_single_system_message() {
        let conversation = Conversation::new("Be brief.");
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.messages()[0].role, Role::System);
        assert_eq!(conversation.messages()[0].text(), "Be brief.");
        assert!(!conversation.has_history());
    }

    #[test]
    fn appends_keep_order() {
        let mut conversation = Conversation::new("sys");
        conversation.append_user("hi", vec![ContentBlock::image("image/png", "AA")]);
        conversation.append_assistant(
            "",
            Some(vec![ToolCall::new("call_1", "lookup", "{}")]),
        );
        conversation.append_tool_result("call_1", "found").unwrap();

        let roles: Vec<Role> = conversation.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::Tool]);
        assert_eq!(conversation.messages()[1].content.len(), 2);
        assert!(conversation.messages()[2].content.is_empty());
        assert_eq!(
            conversation.last().and_then(|m| m.tool_call_id.as_deref()),
            Some("call_1")
        );
        assert!(conversation.has_history());
    }

    #[test]
    fn assistant_without_calls_is_plain_text() {
        let mut conversation = Conversation::new("sys");
        conversation.append_assistant("done", Some(Vec::new()));
        let last = conversation.last().unwrap();
        assert!(last.tool_calls.is_none());
        assert_eq!(last.text(), "done");
    }

    #[test]
    fn tool_result_requires_call_id() {
        let mut conversation = Conversation::new("sys");
        let result = conversation.append_tool_result("  ", "output");
        assert!(matches!(result, Err(LmChatError::InvalidInput(_))));
        assert_eq!(conversation.len(), 1);
    }

    #[test]
    fn clear_resets_and_optionally_replaces_prompt() {
        let mut conversation = Conversation::new("first");
        conversation.append_user("hi", Vec::new());

        conversation.clear(None);
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.system_prompt(), "first");

        conversation.clear(Some(""));
        assert_eq!(conversation.system_prompt(), "first");

        conversation.clear(Some("second"));
        assert_eq!(conversation.messages()[0].text(), "second");
    }

    #[test]
    fn with_pending_does_not_record() {
        let conversation = Conversation::new("sys");
        let pending = Message::user("q");
        assert_eq!(conversation.with_pending(Some(&pending)).len(), 2);
        assert_eq!(conversation.len(), 1);
    }
}
