//! Mention resolution.
//!
//! Turns raw post text into the ordered, de-duplicated list of enabled
//! agents it addresses. Pure: no I/O, no shared state.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::domain::AgentHandle;

/// An `@handle` token that matched an enabled agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    /// Token as written in the post, including the `@`.
    pub raw_token: String,
    pub agent_handle: AgentHandle,
}

fn mention_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)@([a-z0-9_-]+)").expect("mention pattern is valid"))
}

/// Resolve every `@handle` in `text` against `enabled`.
///
/// Unknown handles are left alone. Each agent appears at most once, at the
/// position of its first mention.
pub fn resolve_mentions(text: &str, enabled: &BTreeSet<AgentHandle>) -> Vec<Mention> {
    let mut seen = BTreeSet::new();
    let mut mentions = Vec::new();

    for caps in mention_pattern().captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Ok(handle) = AgentHandle::parse(name.as_str()) else {
            continue;
        };
        if !enabled.contains(&handle) || !seen.insert(handle.clone()) {
            continue;
        }
        mentions.push(Mention {
            raw_token: whole.as_str().to_string(),
            agent_handle: handle,
        });
    }

    mentions
}

/// Like [`resolve_mentions`] but returns only the handles.
pub fn resolve_handles(text: &str, enabled: &BTreeSet<AgentHandle>) -> Vec<AgentHandle> {
    resolve_mentions(text, enabled)
        .into_iter()
        .map(|m| m.agent_handle)
        .collect()
}
