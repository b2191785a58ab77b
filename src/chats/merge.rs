use std::collections::HashSet;

use crate::api::models::Conversation;

/// Concatenates the lists in order and keeps the first conversation seen for
/// each id.
pub fn merge<I>(lists: I) -> Vec<Conversation>
where
    I: IntoIterator<Item = Vec<Conversation>>,
{
    let mut seen = HashSet::new();
    lists
        .into_iter()
        .flatten()
        .filter(|conv| seen.insert(conv.id.clone()))
        .collect()
}
