use std::path::PathBuf;

use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment, parse_f64,
    parse_history_backend, parse_u16, parse_u32, parse_u64,
};
use super::types::{
    AiSettings, ApiSettings, ConfigError, CorsSettings, ExamSettings, HistorySettings,
    RedisSettings, RuntimeSettings, ServerHost, ServerPort, ServerSettings, Settings,
    TelemetrySettings,
};

const MAX_QUESTION_COUNT: u32 = 200;

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("PROCTOR_HOST", "0.0.0.0");
        let port = env_or_default("PROCTOR_PORT", "8000");

        let environment =
            parse_environment(env_optional("PROCTOR_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("PROCTOR_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Exam Proctor API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let openai_api_key = env_or_default("OPENAI_API_KEY", "");
        let openai_base_url = env_or_default("OPENAI_BASE_URL", "");
        let ai_model = env_or_default("AI_MODEL", "gpt-4o-mini");
        let ai_max_tokens = parse_u32("AI_MAX_TOKENS", env_or_default("AI_MAX_TOKENS", "16000"))?;
        let ai_temperature = parse_f64("AI_TEMPERATURE", env_or_default("AI_TEMPERATURE", "0.7"))?;
        let ai_request_timeout =
            parse_u64("AI_REQUEST_TIMEOUT", env_or_default("AI_REQUEST_TIMEOUT", "90"))?;

        let default_question_count = parse_u32(
            "EXAM_DEFAULT_QUESTION_COUNT",
            env_or_default("EXAM_DEFAULT_QUESTION_COUNT", "30"),
        )?;
        let generation_timeout_seconds = parse_u64(
            "EXAM_GENERATION_TIMEOUT_SECONDS",
            env_or_default("EXAM_GENERATION_TIMEOUT_SECONDS", "120"),
        )?;
        let tick_interval_ms =
            parse_u64("EXAM_TICK_INTERVAL_MS", env_or_default("EXAM_TICK_INTERVAL_MS", "1000"))?;

        let history_backend = parse_history_backend(env_optional("HISTORY_BACKEND"))?;
        let history_dir = PathBuf::from(env_or_default("HISTORY_DIR", "./data"));

        let log_level = env_or_default("PROCTOR_LOG_LEVEL", "info");
        let json = env_optional("PROCTOR_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings { host: ServerHost::parse(host)?, port: ServerPort::parse(port)? },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            cors: CorsSettings { origins: cors_origins },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            ai: AiSettings {
                openai_api_key,
                openai_base_url,
                ai_model,
                ai_max_tokens,
                ai_temperature,
                ai_request_timeout,
            },
            exam: ExamSettings { default_question_count, generation_timeout_seconds, tick_interval_ms },
            history: HistorySettings { backend: history_backend, dir: history_dir },
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

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn ai(&self) -> &AiSettings {
        &self.ai
    }

    pub(crate) fn exam(&self) -> &ExamSettings {
        &self.exam
    }

    pub(crate) fn history(&self) -> &HistorySettings {
        &self.history
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    pub(crate) fn max_question_count(&self) -> u32 {
        MAX_QUESTION_COUNT
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let count = self.exam.default_question_count;
        if count == 0 || count > MAX_QUESTION_COUNT {
            return Err(ConfigError::InvalidValue {
                field: "EXAM_DEFAULT_QUESTION_COUNT",
                value: count.to_string(),
            });
        }
        if self.exam.generation_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "EXAM_GENERATION_TIMEOUT_SECONDS",
                value: String::from("0"),
            });
        }
        if self.exam.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "EXAM_TICK_INTERVAL_MS",
                value: String::from("0"),
            });
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

        Ok(())
    }
}
