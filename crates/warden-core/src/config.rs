use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    command::{CommandAlias, CommandKind},
    domain::UserId,
    errors::Error,
    Result,
};

const DEFAULT_KICK_ALIASES: &str = ".kick,#kick,.k,kick";
const DEFAULT_RESET_ALIASES: &str = ".resetwarns,#resetwarns,.rw";

/// Typed configuration, loaded from the environment (with `.env` support).
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub bot_token: String,
    /// Configured bot owner; always a protected target.
    pub bot_owner: Option<UserId>,

    // Moderation
    pub command_aliases: Vec<CommandAlias>,
    pub link_policy_enabled: bool,
    /// Admin/Owner senders do not accumulate violations.
    pub admin_exempt: bool,
    /// Violation count at which the offender is removed. 1 means removal on
    /// the first violation.
    pub remove_threshold: u32,

    // Audit
    pub audit_log_path: PathBuf,
    pub audit_log_json: bool,

    // Outbound throttling
    pub throttle_global: Duration,
    pub throttle_per_chat: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let bot_token = env_str("WARDEN_BOT_TOKEN").unwrap_or_default();
        if bot_token.trim().is_empty() {
            return Err(Error::Config(
                "WARDEN_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let bot_owner = env_i64("WARDEN_OWNER_ID").map(UserId);

        let kick_aliases = parse_csv(
            env_str("WARDEN_KICK_ALIASES").unwrap_or_else(|| DEFAULT_KICK_ALIASES.to_string()),
        );
        let reset_aliases = parse_csv(
            env_str("WARDEN_RESET_ALIASES").unwrap_or_else(|| DEFAULT_RESET_ALIASES.to_string()),
        );
        let command_aliases = alias_table(&kick_aliases, &reset_aliases);

        let link_policy_enabled = env_bool("WARDEN_LINK_POLICY").unwrap_or(true);
        let admin_exempt = env_bool("WARDEN_ADMIN_EXEMPT").unwrap_or(true);
        let remove_threshold = env_u32("WARDEN_REMOVE_THRESHOLD").unwrap_or(3).max(1);

        let audit_log_path = PathBuf::from(
            env_str("WARDEN_AUDIT_LOG_PATH").unwrap_or_else(|| "/tmp/warden-audit.log".to_string()),
        );
        let audit_log_json = env_bool("WARDEN_AUDIT_LOG_JSON").unwrap_or(false);

        let throttle_global =
            Duration::from_millis(env_u64("WARDEN_THROTTLE_GLOBAL_MS").unwrap_or(40));
        let throttle_per_chat =
            Duration::from_millis(env_u64("WARDEN_THROTTLE_CHAT_MS").unwrap_or(1050));

        Ok(Self {
            bot_token,
            bot_owner,
            command_aliases,
            link_policy_enabled,
            admin_exempt,
            remove_threshold,
            audit_log_path,
            audit_log_json,
            throttle_global,
            throttle_per_chat,
        })
    }
}

/// Ordered alias table; kick aliases first, then resetwarns.
fn alias_table(kick: &[String], reset: &[String]) -> Vec<CommandAlias> {
    kick.iter()
        .map(|t| CommandAlias::new(t.clone(), CommandKind::Kick))
        .chain(
            reset
                .iter()
                .map(|t| CommandAlias::new(t.clone(), CommandKind::ResetWarnings)),
        )
        .collect()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_i64(key: &str) -> Option<i64> {
    env_str(key).and_then(|s| s.trim().parse::<i64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn parse_csv(v: String) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_parsing_skips_blanks() {
        let parsed = parse_csv(".kick, #kick,, .k ,".to_string());
        assert_eq!(parsed, vec![".kick", "#kick", ".k"]);
    }

    #[test]
    fn alias_table_preserves_order_and_kinds() {
        let table = alias_table(
            &[".kick".to_string(), "kick".to_string()],
            &[".rw".to_string()],
        );

        assert_eq!(table.len(), 3);
        assert_eq!(table[0].token, ".kick");
        assert_eq!(table[0].kind, CommandKind::Kick);
        assert_eq!(table[2].token, ".rw");
        assert_eq!(table[2].kind, CommandKind::ResetWarnings);
    }
}
