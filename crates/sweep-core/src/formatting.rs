//! Formatting utilities (mention lists, operator-facing HTML).

use crate::{
    domain::UserId,
    remote::types::{FormattedText, TextEntity, UserKind, UserProfile},
};

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Length of `s` in UTF-16 code units (the unit entity offsets are measured in).
pub fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Builds a one-mention-per-line message.
///
/// Users with a public handle are written as `@handle`; everyone else gets
/// their display name covered by a mention entity.
#[derive(Debug, Default)]
pub struct MentionList {
    text: String,
    entities: Vec<TextEntity>,
    count: usize,
}

impl MentionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `user`. Bots, deleted and unknown accounts are skipped.
    pub fn push(&mut self, user: &UserProfile) -> bool {
        if user.kind != UserKind::Regular {
            return false;
        }

        match user.username.as_deref().filter(|u| !u.is_empty()) {
            Some(handle) => {
                self.text.push('@');
                self.text.push_str(handle);
            }
            None => self.push_named(user.id, &display_name(user)),
        }
        self.text.push('\n');
        self.count += 1;
        true
    }

    fn push_named(&mut self, user_id: UserId, name: &str) {
        let offset = utf16_len(&self.text);
        self.text.push_str(name);
        self.entities.push(TextEntity {
            offset,
            length: utf16_len(name),
            mention: user_id,
        });
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn finish(self) -> FormattedText {
        FormattedText {
            text: self.text,
            entities: self.entities,
        }
    }
}

fn display_name(user: &UserProfile) -> String {
    let name = format!("{} {}", user.first_name, user.last_name);
    let name = name.trim();
    if name.is_empty() {
        // A mention entity needs a non-empty span.
        return format!("user {}", user.id.0);
    }
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, first: &str, last: &str, username: Option<&str>, kind: UserKind) -> UserProfile {
        UserProfile {
            id: UserId(id),
            first_name: first.to_string(),
            last_name: last.to_string(),
            username: username.map(|s| s.to_string()),
            kind,
        }
    }

    #[test]
    fn escape_html_basic() {
        assert_eq!(escape_html("<a & \"b\">"), "&lt;a &amp; &quot;b&quot;&gt;");
    }

    #[test]
    fn handles_and_named_mentions() {
        let mut list = MentionList::new();
        assert!(list.push(&user(1, "Ann", "Lee", Some("ann"), UserKind::Regular)));
        assert!(list.push(&user(2, "Bo", "Ng", None, UserKind::Regular)));
        assert!(!list.push(&user(3, "Bot", "", Some("helper_bot"), UserKind::Bot)));
        assert_eq!(list.len(), 2);

        let text = list.finish();
        assert_eq!(text.text, "@ann\nBo Ng\n");
        assert_eq!(
            text.entities,
            vec![TextEntity {
                offset: 5,
                length: 5,
                mention: UserId(2)
            }]
        );
    }

    #[test]
    fn entity_offsets_count_utf16_units() {
        let mut list = MentionList::new();
        list.push(&user(1, "😀", "", None, UserKind::Regular));
        list.push(&user(2, "Zoë", "", None, UserKind::Regular));

        let text = list.finish();
        assert_eq!(text.entities[0].offset, 0);
        assert_eq!(text.entities[0].length, 2);
        // "😀\n" is three UTF-16 units.
        assert_eq!(text.entities[1].offset, 3);
        assert_eq!(text.entities[1].length, 3);
    }

    #[test]
    fn empty_names_still_get_a_mention_span() {
        let mut list = MentionList::new();
        list.push(&user(42, "", "", None, UserKind::Regular));
        let text = list.finish();
        assert_eq!(text.text, "user 42\n");
        assert_eq!(text.entities[0].length, 7);
    }
}
