use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment, parse_f64,
    parse_i8, parse_report_locale, parse_store_backend, parse_u32, parse_u64,
};
use super::types::{
    AiSettings, ApiSettings, ConfigError, CorsSettings, ReviewSettings, RuntimeSettings,
    ServerHost, ServerPort, ServerSettings, Settings, StoreBackend, StoreSettings,
    TelemetrySettings,
};

/// Backoff doubles per attempt; this keeps the longest single wait under ten minutes.
const MAX_AI_RETRIES: u32 = 10;

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("GRADER_HOST", "0.0.0.0");
        let port = env_or_default("GRADER_PORT", "8000");

        let environment =
            parse_environment(env_optional("GRADER_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("GRADER_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Activity Grader API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let openai_api_key = env_or_default("OPENAI_API_KEY", "");
        let openai_base_url = env_or_default("OPENAI_BASE_URL", "https://api.openai.com/v1");
        let ai_model = env_or_default("AI_MODEL", "gpt-4o-mini");
        let ai_max_tokens = parse_u32("AI_MAX_TOKENS", env_or_default("AI_MAX_TOKENS", "1024"))?;
        let ai_temperature =
            parse_f64("AI_TEMPERATURE", env_or_default("AI_TEMPERATURE", "0.2"))?;
        let ai_request_timeout =
            parse_u64("AI_REQUEST_TIMEOUT", env_or_default("AI_REQUEST_TIMEOUT", "120"))?;
        let ai_max_retries = parse_u32("AI_MAX_RETRIES", env_or_default("AI_MAX_RETRIES", "3"))?;
        let comment_language = env_or_default("AI_COMMENT_LANGUAGE", "Thai");

        let backend = parse_store_backend(env_optional("STORE_BACKEND"))?;
        let sheet_api_url = env_or_default("SHEET_API_URL", "");
        let sheet_api_token = env_or_default("SHEET_API_TOKEN", "");
        let sheet_request_timeout =
            parse_u64("SHEET_REQUEST_TIMEOUT", env_or_default("SHEET_REQUEST_TIMEOUT", "30"))?;
        let seed_path = env_optional("STORE_SEED_PATH");

        let reviewer_name = env_or_default("REVIEWER_NAME", "Reviewer");
        let locale = parse_report_locale(env_optional("REPORT_LOCALE"))?;
        let utc_offset_hours = parse_i8(
            "REPORT_UTC_OFFSET_HOURS",
            env_or_default("REPORT_UTC_OFFSET_HOURS", "7"),
        )?;
        let result_poll_interval_seconds = parse_u64(
            "RESULT_POLL_INTERVAL_SECONDS",
            env_or_default("RESULT_POLL_INTERVAL_SECONDS", "20"),
        )?;
        let result_await_max_seconds = parse_u64(
            "RESULT_AWAIT_MAX_SECONDS",
            env_or_default("RESULT_AWAIT_MAX_SECONDS", "120"),
        )?;

        let log_level = env_or_default("GRADER_LOG_LEVEL", "info");
        let json = env_optional("GRADER_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            cors: CorsSettings { origins: cors_origins },
            ai: AiSettings {
                openai_api_key,
                openai_base_url,
                ai_model,
                ai_max_tokens,
                ai_temperature,
                ai_request_timeout,
                ai_max_retries,
                comment_language,
            },
            store: StoreSettings {
                backend,
                sheet_api_url,
                sheet_api_token,
                request_timeout: sheet_request_timeout,
                seed_path,
            },
            review: ReviewSettings {
                reviewer_name,
                locale,
                utc_offset_hours,
                result_poll_interval_seconds,
                result_await_max_seconds,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn ai(&self) -> &AiSettings {
        &self.ai
    }

    pub(crate) fn store(&self) -> &StoreSettings {
        &self.store
    }

    pub(crate) fn review(&self) -> &ReviewSettings {
        &self.review
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.review.result_poll_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "RESULT_POLL_INTERVAL_SECONDS",
                value: "0".to_string(),
            });
        }

        if !(-12..=14).contains(&self.review.utc_offset_hours) {
            return Err(ConfigError::InvalidValue {
                field: "REPORT_UTC_OFFSET_HOURS",
                value: self.review.utc_offset_hours.to_string(),
            });
        }

        if !(0.0..=2.0).contains(&self.ai.ai_temperature) {
            return Err(ConfigError::InvalidValue {
                field: "AI_TEMPERATURE",
                value: self.ai.ai_temperature.to_string(),
            });
        }

        if self.ai.ai_max_retries > MAX_AI_RETRIES {
            return Err(ConfigError::InvalidValue {
                field: "AI_MAX_RETRIES",
                value: self.ai.ai_max_retries.to_string(),
            });
        }

        if self.store.backend == StoreBackend::Sheet && self.store.sheet_api_url.is_empty() {
            return Err(ConfigError::MissingSecret("SHEET_API_URL"));
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.ai.openai_api_key.is_empty() {
            return Err(ConfigError::MissingSecret("OPENAI_API_KEY"));
        }
        if self.ai.openai_base_url.is_empty() {
            return Err(ConfigError::MissingSecret("OPENAI_BASE_URL"));
        }
        if self.store.backend == StoreBackend::Memory && self.store.seed_path.is_none() {
            return Err(ConfigError::InvalidValue {
                field: "STORE_BACKEND",
                value: "memory store without STORE_SEED_PATH".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ReportLocale;
    use crate::test_support;

    #[tokio::test]
    async fn load_uses_defaults_for_review_settings() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::remove_var("REPORT_LOCALE");
        std::env::remove_var("RESULT_POLL_INTERVAL_SECONDS");

        let settings = Settings::load().expect("settings");

        assert_eq!(settings.review().locale, ReportLocale::Thai);
        assert_eq!(settings.review().result_poll_interval_seconds, 20);
        assert_eq!(settings.store().backend, StoreBackend::Memory);
        assert_eq!(settings.api().api_v1_str, "/api/v1");
    }

    #[tokio::test]
    async fn load_rejects_zero_poll_interval() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("RESULT_POLL_INTERVAL_SECONDS", "0");

        let err = Settings::load().expect_err("zero interval must be rejected");
        std::env::remove_var("RESULT_POLL_INTERVAL_SECONDS");

        assert!(matches!(
            err,
            ConfigError::InvalidValue { field: "RESULT_POLL_INTERVAL_SECONDS", .. }
        ));
    }

    #[tokio::test]
    async fn load_rejects_unbounded_ai_retries() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("AI_MAX_RETRIES", "64");

        let err = Settings::load().expect_err("retry count must be bounded");
        std::env::remove_var("AI_MAX_RETRIES");

        assert!(matches!(err, ConfigError::InvalidValue { field: "AI_MAX_RETRIES", .. }));
    }

    #[tokio::test]
    async fn sheet_backend_requires_url() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("STORE_BACKEND", "sheet");
        std::env::remove_var("SHEET_API_URL");

        let err = Settings::load().expect_err("sheet backend without url");
        std::env::set_var("STORE_BACKEND", "memory");

        assert!(matches!(err, ConfigError::MissingSecret("SHEET_API_URL")));
    }

    #[tokio::test]
    async fn strict_config_requires_ai_key() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("GRADER_STRICT_CONFIG", "1");
        std::env::remove_var("OPENAI_API_KEY");

        let err = Settings::load().expect_err("strict config without key");
        std::env::set_var("GRADER_STRICT_CONFIG", "0");

        assert!(matches!(err, ConfigError::MissingSecret("OPENAI_API_KEY")));
    }
}
