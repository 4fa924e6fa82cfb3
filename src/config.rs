use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub user_ttl_days: i64,
    pub admin_ttl_minutes: i64,
}

/// Identity accepted by the admin login. Either half missing disables it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub enabled: bool,
    pub smtp_host: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub website_url: String,
    pub jwt: JwtConfig,
    pub admin: AdminConfig,
    pub mail: MailConfig,
    pub openai: Option<OpenAiConfig>,
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_or(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let website_url = optional("WEBSITE_URL")
            .unwrap_or_else(|| "http://localhost:3000".into())
            .trim_end_matches('/')
            .to_string();

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "urbansquare".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "urbansquare-users".into()),
            user_ttl_days: parsed_or("JWT_USER_TTL_DAYS", 30),
            admin_ttl_minutes: parsed_or("JWT_ADMIN_TTL_MINUTES", 60),
        };

        let admin = AdminConfig {
            email: optional("ADMIN_EMAIL"),
            password: optional("ADMIN_PASSWORD"),
        };

        let username = optional("EMAIL");
        let mail = MailConfig {
            enabled: std::env::var("ENABLE_EMAIL").map(|v| v == "true").unwrap_or(false),
            smtp_host: optional("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".into()),
            from: username.clone().unwrap_or_else(|| "no-reply@example.com".into()),
            username,
            password: optional("EMAIL_PASS"),
        };
        if mail.enabled && (mail.username.is_none() || mail.password.is_none()) {
            anyhow::bail!("ENABLE_EMAIL=true requires EMAIL and EMAIL_PASS");
        }

        let openai = optional("OPENAI_API_KEY").map(|api_key| OpenAiConfig {
            api_key,
            model: optional("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o".into()),
            base_url: optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".into())
                .trim_end_matches('/')
                .to_string(),
        });

        Ok(Self {
            database_url,
            website_url,
            jwt,
            admin,
            mail,
            openai,
        })
    }
}
