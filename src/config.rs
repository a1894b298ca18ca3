use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Outbound mail settings: SMTP transport, sender address, and where
/// contact relays go. Carried on the config object rather than in
/// process-wide globals.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_address: String,
    pub admin_recipients: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "eshop".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "eshop-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };
        let mail = MailConfig {
            smtp_host: std::env::var("SMTP_HOST")?,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(587),
            smtp_username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
            smtp_password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
            from_address: std::env::var("MAIL_FROM")?,
            // single address or comma-separated list
            admin_recipients: parse_recipients(&std::env::var("ADMIN_EMAIL")?),
        };
        Ok(Self {
            database_url,
            jwt,
            mail,
        })
    }
}

pub(crate) fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_admin_address() {
        assert_eq!(parse_recipients("admin@shop.test"), vec!["admin@shop.test"]);
    }

    #[test]
    fn comma_separated_admin_addresses() {
        assert_eq!(
            parse_recipients("a@shop.test, b@shop.test ,c@shop.test"),
            vec!["a@shop.test", "b@shop.test", "c@shop.test"]
        );
    }

    #[test]
    fn empty_entries_are_dropped() {
        assert_eq!(parse_recipients("a@shop.test,,"), vec!["a@shop.test"]);
    }
}
