use chrono::Duration;

use super::OutgoingMail;

pub const PASSWORD_RESET_SUBJECT: &str = "Password Reset";

pub fn render_password_reset(username: &str, token: &str, ttl: Duration) -> String {
    format!(
        "Hello, {username}. You requested a password reset. \
         Use the following token to reset your password: {token}. \
         This token will expire in {}.",
        describe_ttl(ttl)
    )
}

pub fn password_reset_mail(
    from: &str,
    to: &str,
    username: &str,
    token: &str,
    ttl: Duration,
) -> OutgoingMail {
    OutgoingMail {
        from: from.to_string(),
        to: to.to_string(),
        subject: PASSWORD_RESET_SUBJECT.to_string(),
        text: render_password_reset(username, token, ttl),
    }
}

fn describe_ttl(ttl: Duration) -> String {
    match ttl.num_seconds() {
        3600 => "one hour".to_string(),
        s if s > 3600 && s % 3600 == 0 => format!("{} hours", s / 3600),
        60 => "one minute".to_string(),
        s if s > 60 && s % 60 == 0 => format!("{} minutes", s / 60),
        1 => "one second".to_string(),
        s => format!("{s} seconds"),
    }
}
