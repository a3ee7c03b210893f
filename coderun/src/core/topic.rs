//! Issue-title handling for the `Topic:` trigger convention.

pub const TOPIC_PREFIX: &str = "Topic:";

/// Extract the topic from an issue title of the form `Topic: <text>`.
///
/// Returns `None` when the prefix is missing or nothing follows it.
pub fn topic_from_issue_title(title: &str) -> Option<&str> {
    let rest = title.trim_start().strip_prefix(TOPIC_PREFIX)?;
    let topic = rest.trim();
    if topic.is_empty() { None } else { Some(topic) }
}
