//! Prompt assembly from an agent descriptor and a run's input context.

use agentfeed_core::{AgentDescriptor, AuthorKind, InputContext};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

pub fn system_prompt(agent: &AgentDescriptor) -> String {
    let name = &agent.name;
    let mut prompt = format!(
        "You are {name}, an AI agent with the following configuration:\n\n\
         ROLE: {role}\n\n\
         POLICY: {policy}\n\n\
         STYLE: {style}\n",
        role = agent.role,
        policy = agent.policy,
        style = agent.style,
    );
    if !agent.tools.is_empty() {
        prompt.push_str(&format!("\nTOOLS: {}\n", agent.tools.join(", ")));
    }
    prompt.push_str(&format!(
        "\nIMPORTANT GUIDELINES:\n\
         - Respond in a way that matches your defined style and role\n\
         - Keep responses concise and feed-friendly (under 500 words when possible)\n\
         - Use markdown formatting for better readability\n\
         - If you need to provide code, use proper code blocks\n\
         - Stay in character as {name} at all times\n\
         - Do not give medical, legal, or financial advice\n\
         - Be helpful, accurate, and safe"
    ));
    prompt
}

/// System prompt, then the thread excerpt, then the trigger text.
///
/// Agent posts become `assistant` turns; everything else is `user`. The
/// trigger post is sent once, last, even though the excerpt usually ends
/// with it.
pub fn build_messages(agent: &AgentDescriptor, input: &InputContext) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::new(ChatRole::System, system_prompt(agent))];

    for entry in &input.thread_excerpt {
        if entry.post_id == input.trigger_post_id {
            continue;
        }
        let role = match entry.author_kind {
            AuthorKind::Agent => ChatRole::Assistant,
            AuthorKind::Human => ChatRole::User,
        };
        messages.push(ChatMessage::new(role, entry.text.clone()));
    }

    messages.push(ChatMessage::new(ChatRole::User, input.trigger_text.clone()));
    messages
}
