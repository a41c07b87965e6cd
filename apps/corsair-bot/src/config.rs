use std::env;

/// Connection parameters for the 3x-ui panel.
#[derive(Debug, Clone)]
pub struct XuiConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub inbound_id: i64,
    pub subscription_prefix: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub xui: XuiConfig,
    pub users_file: String,
    pub promocodes_file: String,
    pub requests_file: String,
    pub admins: Vec<i64>,
}

impl Config {
    /// Reads everything from the environment. Only the bot token is
    /// required; the rest falls back to development defaults.
    pub fn from_env() -> Self {
        let bot_token = env::var("BOT_TOKEN").expect("BOT_TOKEN is not set");

        let xui = XuiConfig {
            host: env::var("XUI_HOST").unwrap_or_else(|_| "http://localhost:2053".to_string()),
            username: env::var("XUI_USERNAME").unwrap_or_else(|_| "admin".to_string()),
            password: env::var("XUI_PASSWORD").unwrap_or_else(|_| "admin".to_string()),
            inbound_id: env::var("XUI_INBOUND_ID")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
            subscription_prefix: env::var("XUI_SUBSCRIPTION_PREFIX")
                .unwrap_or_else(|_| "sub_".to_string()),
        };

        Self {
            bot_token,
            xui,
            users_file: env::var("USERS_FILE").unwrap_or_else(|_| "data/users.json".to_string()),
            promocodes_file: env::var("PROMOCODES_FILE")
                .unwrap_or_else(|_| "data/promocodes.json".to_string()),
            requests_file: env::var("REQUESTS_FILE")
                .unwrap_or_else(|_| "data/requests.json".to_string()),
            admins: parse_admins(&env::var("BOT_ADMINS").unwrap_or_default()),
        }
    }

    pub fn is_admin(&self, tg_id: i64) -> bool {
        self.admins.contains(&tg_id)
    }
}

fn parse_admins(raw: &str) -> Vec<i64> {
    raw.split(',')
        .filter_map(|part| part.trim().parse::<i64>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_list_skips_garbage_entries() {
        assert_eq!(parse_admins("1, 42,notanid, 7 ,"), vec![1, 42, 7]);
        assert!(parse_admins("").is_empty());
    }
}
