use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, Result};

/// Typed configuration, read from the environment (and `.env` when present).
#[derive(Clone, Debug)]
pub struct Config {
    // Operator surface
    pub telegram_bot_token: String,
    pub telegram_allowed_users: Vec<i64>,
    /// Where notices are sent. Defaults to the first allowed user.
    pub notify_chat_id: i64,

    // Backend bridge
    pub bridge_url: String,
    pub bridge_timeout: Duration,

    // Workflows
    pub undo_window: Duration,
    pub purge: PurgeLimits,
    pub broadcast: BroadcastLimits,
}

/// Paging, pacing and safety bounds shared by the purge loops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PurgeLimits {
    /// Page size of a sender search; a page reporting fewer matches ends the loop.
    pub search_page_size: usize,
    pub page_delay: Duration,
    pub member_page_size: usize,
    pub removal_delay: Duration,
    pub ban_duration: Duration,
    /// Emit a progress notice every this many removals (0 disables).
    pub progress_every: usize,
    pub max_iterations: usize,
}

impl Default for PurgeLimits {
    fn default() -> Self {
        Self {
            search_page_size: 100,
            page_delay: Duration::from_millis(1000),
            member_page_size: 200,
            removal_delay: Duration::from_millis(100),
            ban_duration: Duration::from_secs(60),
            progress_every: 50,
            max_iterations: 10_000,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BroadcastLimits {
    pub basic_group_cap: usize,
    pub supergroup_cap: usize,
}

impl Default for BroadcastLimits {
    fn default() -> Self {
        Self {
            basic_group_cap: 100,
            supergroup_cap: 30,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        // Required env vars
        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        let telegram_allowed_users = parse_csv_i64(env_str("TELEGRAM_ALLOWED_USERS"));
        let bridge_url = env_str("TDLIB_BRIDGE_URL").unwrap_or_default();

        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }
        let Some(&first_user) = telegram_allowed_users.first() else {
            return Err(Error::Config(
                "TELEGRAM_ALLOWED_USERS environment variable is required".to_string(),
            ));
        };
        if bridge_url.trim().is_empty() {
            return Err(Error::Config(
                "TDLIB_BRIDGE_URL environment variable is required".to_string(),
            ));
        }

        let notify_chat_id = env_i64("NOTIFY_CHAT_ID").unwrap_or(first_user);
        let bridge_timeout = Duration::from_millis(env_u64("BRIDGE_TIMEOUT_MS").unwrap_or(30_000));
        let undo_window = Duration::from_millis(env_u64("UNDO_WINDOW_MS").unwrap_or(5_000));

        let d = PurgeLimits::default();
        let purge = PurgeLimits {
            search_page_size: env_usize("SEARCH_PAGE_SIZE")
                .filter(|n| *n > 0)
                .unwrap_or(d.search_page_size),
            page_delay: env_millis("PURGE_PAGE_DELAY_MS").unwrap_or(d.page_delay),
            member_page_size: env_usize("MEMBER_PAGE_SIZE")
                .filter(|n| *n > 0)
                .unwrap_or(d.member_page_size),
            removal_delay: env_millis("MEMBER_REMOVAL_DELAY_MS").unwrap_or(d.removal_delay),
            ban_duration: env_u64("BAN_DURATION_SECS")
                .map(Duration::from_secs)
                .unwrap_or(d.ban_duration),
            progress_every: env_usize("PROGRESS_EVERY").unwrap_or(d.progress_every),
            max_iterations: env_usize("MAX_LOOP_ITERATIONS")
                .filter(|n| *n > 0)
                .unwrap_or(d.max_iterations),
        };

        let d = BroadcastLimits::default();
        let broadcast = BroadcastLimits {
            basic_group_cap: env_usize("BROADCAST_BASIC_GROUP_CAP").unwrap_or(d.basic_group_cap),
            supergroup_cap: env_usize("BROADCAST_SUPERGROUP_CAP").unwrap_or(d.supergroup_cap),
        };

        Ok(Self {
            telegram_bot_token,
            telegram_allowed_users,
            notify_chat_id,
            bridge_url,
            bridge_timeout,
            undo_window,
            purge,
            broadcast,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in contents.lines().filter_map(parse_dotenv_line) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv_line(raw: &str) -> Option<(String, String)> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (k, v) = line.split_once('=')?;
    let key = k.trim();
    if key.is_empty() {
        return None;
    }

    let mut val = v.trim();
    // Strip optional surrounding quotes.
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        val = &val[1..val.len() - 1];
    }

    Some((key.to_string(), val.to_string()))
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_i64(key: &str) -> Option<i64> {
    env_str(key).and_then(|s| s.trim().parse::<i64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_millis(key: &str) -> Option<Duration> {
    env_u64(key).map(Duration::from_millis)
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}
