use crate::domain::UserId;

/// Only operators listed in the allow-list may drive workflows.
pub fn is_authorized(user_id: Option<UserId>, allowed_users: &[i64]) -> bool {
    let Some(user_id) = user_id else {
        return false;
    };
    if allowed_users.is_empty() {
        return false;
    }
    allowed_users.contains(&user_id.0)
}
