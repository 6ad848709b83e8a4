#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub app_url: String,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub port: u16,
    // SMS provider configurations
    pub sms_api_url: String,
    pub sms_api_key: String,
    // AI provider configurations
    pub ai_api_url: String,
    pub ai_api_key: String,
    pub ai_model: String,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let jwt_maxage = std::env::var("JWT_MAXAGE").expect("JWT_MAXAGE must be set");
        let app_url =
            std::env::var("APP_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8000);

        let sms_api_url = std::env::var("SMS_API_URL")
            .unwrap_or_else(|_| "https://api.ng.termii.com/api/sms/send".to_string());
        let sms_api_key = std::env::var("SMS_API_KEY").unwrap_or_else(|_| "".to_string());

        let ai_api_url = std::env::var("AI_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string());
        let ai_api_key = std::env::var("AI_API_KEY").unwrap_or_else(|_| "".to_string());
        let ai_model = std::env::var("AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        Config {
            database_url,
            app_url,
            jwt_secret,
            jwt_maxage: jwt_maxage.parse::<i64>().unwrap(),
            port,
            sms_api_url,
            sms_api_key,
            ai_api_url,
            ai_api_key,
            ai_model,
        }
    }
}
