use std::net::IpAddr;

use chrono::Duration;

use crate::reset::DEFAULT_TOKEN_TTL_SECS;

/// Longest accepted reset token lifetime: 30 days.
pub const MAX_TOKEN_TTL_SECS: i64 = 30 * 24 * 3600;

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` selects the in-memory user store.
    pub database_url: Option<String>,
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub token_ttl: Duration,
    /// `None` disables the expired-token sweeper.
    pub sweep_interval: Option<std::time::Duration>,
    /// Include the raw token and its expiry in the forget-password response.
    /// Ignored while `reveal_unknown_users` is off.
    pub expose_reset_token: bool,
    /// Answer 404 for unknown usernames instead of a generic success.
    pub reveal_unknown_users: bool,
    /// Include underlying error messages in failure responses.
    pub expose_error_details: bool,
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
    pub mail_from: String,
    pub smtp: Option<SmtpConfig>,
    pub seed_users: Vec<SeedUser>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
}

/// A user created at startup if the username is not taken yet.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());

        let host: IpAddr = env_or("PWRESET_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid PWRESET_HOST: {e}"))?;

        let port: u16 = env_or("PWRESET_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid PWRESET_PORT: {e}"))?;

        let log_level = env_or("PWRESET_LOG_LEVEL", "info");

        let token_ttl = parse_token_ttl(&env_or(
            "PWRESET_TOKEN_TTL_SECS",
            &DEFAULT_TOKEN_TTL_SECS.to_string(),
        ))?;

        let sweep_secs: u64 = env_or("PWRESET_SWEEP_INTERVAL_SECS", "900")
            .parse()
            .map_err(|e| format!("Invalid PWRESET_SWEEP_INTERVAL_SECS: {e}"))?;
        let sweep_interval = (sweep_secs > 0).then(|| std::time::Duration::from_secs(sweep_secs));

        let expose_reset_token = env_flag("PWRESET_EXPOSE_TOKEN", false)?;
        let reveal_unknown_users = env_flag("PWRESET_REVEAL_UNKNOWN_USERS", true)?;
        let expose_error_details = env_flag("PWRESET_EXPOSE_ERROR_DETAILS", true)?;

        let argon2_memory_kib: u32 = env_or("PWRESET_ARGON2_MEMORY_KIB", "19456")
            .parse()
            .map_err(|e| format!("Invalid PWRESET_ARGON2_MEMORY_KIB: {e}"))?;
        let argon2_iterations: u32 = env_or("PWRESET_ARGON2_ITERATIONS", "2")
            .parse()
            .map_err(|e| format!("Invalid PWRESET_ARGON2_ITERATIONS: {e}"))?;

        let smtp = match (
            std::env::var("EMAIL_USER").ok(),
            std::env::var("EMAIL_PASS").ok(),
        ) {
            (Some(user), Some(pass)) => Some(SmtpConfig {
                host: env_or("EMAIL_HOST", "smtp.gmail.com"),
                port: env_or("EMAIL_PORT", "465")
                    .parse()
                    .map_err(|e| format!("Invalid EMAIL_PORT: {e}"))?,
                user,
                pass,
            }),
            _ => None,
        };

        let mail_from = std::env::var("EMAIL_FROM")
            .ok()
            .or_else(|| smtp.as_ref().map(|s| s.user.clone()))
            .unwrap_or_else(|| "noreply@localhost".to_string());

        let seed_users = parse_seed_users(&env_or("PWRESET_SEED_USERS", ""))?;

        Ok(Config {
            database_url,
            host,
            port,
            log_level,
            token_ttl,
            sweep_interval,
            expose_reset_token,
            reveal_unknown_users,
            expose_error_details,
            argon2_memory_kib,
            argon2_iterations,
            mail_from,
            smtp,
            seed_users,
        })
    }
}

fn parse_token_ttl(raw: &str) -> Result<Duration, String> {
    let secs: i64 = raw
        .trim()
        .parse()
        .map_err(|e| format!("Invalid PWRESET_TOKEN_TTL_SECS: {e}"))?;
    if !(1..=MAX_TOKEN_TTL_SECS).contains(&secs) {
        return Err(format!(
            "PWRESET_TOKEN_TTL_SECS must be between 1 and {MAX_TOKEN_TTL_SECS}"
        ));
    }
    Ok(Duration::seconds(secs))
}

/// Parses `username:email:password` entries separated by commas.
pub fn parse_seed_users(raw: &str) -> Result<Vec<SeedUser>, String> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|entry| {
            let mut parts = entry.trim().splitn(3, ':');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(username), Some(email), Some(password))
                    if !username.is_empty() && !email.is_empty() && !password.is_empty() =>
                {
                    Ok(SeedUser {
                        username: username.to_string(),
                        email: email.to_string(),
                        password: password.to_string(),
                    })
                }
                _ => Err(format!(
                    "Invalid PWRESET_SEED_USERS entry '{}': expected username:email:password",
                    entry.trim()
                )),
            }
        })
        .collect()
}

fn parse_flag(key: &str, value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("Invalid {key}: '{other}' is not a boolean")),
    }
}

fn env_flag(key: &str, default: bool) -> Result<bool, String> {
    match std::env::var(key) {
        Ok(value) => parse_flag(key, &value),
        Err(_) => Ok(default),
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_users_parse() {
        let seeds = parse_seed_users("alice:alice@example.com:pw1, bob:bob@example.com:p:w").unwrap();
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].username, "alice");
        assert_eq!(seeds[1].password, "p:w");
        assert!(parse_seed_users("").unwrap().is_empty());
    }

    #[test]
    fn seed_users_reject_incomplete_entry() {
        assert!(parse_seed_users("alice:alice@example.com").is_err());
        assert!(parse_seed_users("alice::pw").is_err());
    }

    #[test]
    fn token_ttl_is_bounded() {
        assert_eq!(parse_token_ttl("3600"), Ok(Duration::hours(1)));
        assert_eq!(
            parse_token_ttl(&MAX_TOKEN_TTL_SECS.to_string()),
            Ok(Duration::days(30))
        );
        assert!(parse_token_ttl("0").is_err());
        assert!(parse_token_ttl("-5").is_err());
        assert!(parse_token_ttl(&(MAX_TOKEN_TTL_SECS + 1).to_string()).is_err());
        assert!(parse_token_ttl("10000000000000").is_err());
        assert!(parse_token_ttl("soon").is_err());
    }

    #[test]
    fn flags() {
        assert_eq!(parse_flag("X", "TRUE"), Ok(true));
        assert_eq!(parse_flag("X", "off"), Ok(false));
        assert!(parse_flag("X", "maybe").is_err());
    }
}
