use super::parsing::{
    env_optional, env_or_default, is_valid_extension, parse_bool, parse_cors_origins,
    parse_environment, parse_positive_u32, parse_storage_backend, parse_string_list, parse_u16,
    parse_u64,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    AdminSettings, ApiSettings, ConfigError, CorsSettings, DatabaseSettings, RedisSettings,
    RuntimeSettings, S3Settings, SecuritySettings, ServerHost, ServerPort, ServerSettings,
    Settings, StorageBackend, StorageSettings, TelemetrySettings,
};

/// Upper bound for `MAX_UPLOAD_SIZE_MB`; uploads are buffered in memory.
const MAX_UPLOAD_SIZE_MB_LIMIT: u64 = 1024;

const DEFAULT_UPLOAD_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "txt", "zip", "py", "java", "c", "cpp", "ipynb", "md", "png", "jpg",
    "jpeg",
];

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("PORTAL_HOST", "0.0.0.0");
        let port = env_or_default("PORTAL_PORT", "8000");

        let environment =
            parse_environment(env_optional("PORTAL_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("PORTAL_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Assignment Portal API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };
        let access_token_expire_minutes = parse_u64(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "1440"),
        )?;
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let database_host = env_or_default("DATABASE_HOST", "localhost");
        let database_port = parse_u16("DATABASE_PORT", env_or_default("DATABASE_PORT", "3306"))?;
        let database_user = env_or_default("DATABASE_USER", "portal");
        let database_password = env_or_default("DATABASE_PASSWORD", "");
        let database_name = env_or_default("DATABASE_NAME", "portal_db");
        let database_url = env_optional("DATABASE_URL");
        let database_max_connections = parse_positive_u32(
            "DATABASE_MAX_CONNECTIONS",
            env_or_default("DATABASE_MAX_CONNECTIONS", "10"),
        )?;

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let storage_backend = parse_storage_backend(&env_or_default("STORAGE_BACKEND", "local"))?;
        let upload_dir = env_or_default("UPLOAD_DIR", "uploads");
        let max_upload_size_mb =
            parse_u64("MAX_UPLOAD_SIZE_MB", env_or_default("MAX_UPLOAD_SIZE_MB", "16"))?;
        let allowed_extensions = parse_string_list(
            env_optional("ALLOWED_UPLOAD_EXTENSIONS"),
            DEFAULT_UPLOAD_EXTENSIONS,
        );

        let s3_endpoint = env_or_default("S3_ENDPOINT", "");
        let s3_access_key = env_or_default("S3_ACCESS_KEY", "");
        let s3_secret_key = env_or_default("S3_SECRET_KEY", "");
        let s3_bucket = env_or_default("S3_BUCKET", "assignment-portal");
        let s3_region = env_or_default("S3_REGION", "us-east-1");

        let first_admin_username = env_or_default("FIRST_ADMIN_USERNAME", "admin");
        let first_admin_password = env_or_default("FIRST_ADMIN_PASSWORD", "");
        let first_admin_email = env_or_default("FIRST_ADMIN_EMAIL", "admin@localhost");

        let log_level = env_or_default("PORTAL_LOG_LEVEL", "info");
        let json = env_optional("PORTAL_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings { secret_key, access_token_expire_minutes, algorithm },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                host: database_host,
                port: database_port,
                user: database_user,
                password: database_password,
                name: database_name,
                database_url,
                max_connections: database_max_connections,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            storage: StorageSettings {
                backend: storage_backend,
                upload_dir,
                max_upload_size_mb,
                allowed_extensions,
            },
            s3: S3Settings {
                endpoint: s3_endpoint,
                access_key: s3_access_key,
                secret_key: s3_secret_key,
                bucket: s3_bucket,
                region: s3_region,
            },
            admin: AdminSettings { first_admin_username, first_admin_password, first_admin_email },
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

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn storage(&self) -> &StorageSettings {
        &self.storage
    }

    pub(crate) fn s3(&self) -> &S3Settings {
        &self.s3
    }

    pub(crate) fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.allowed_extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ALLOWED_UPLOAD_EXTENSIONS",
                value: String::from("<empty>"),
            });
        }

        for extension in &self.storage.allowed_extensions {
            if !is_valid_extension(extension) {
                return Err(ConfigError::InvalidValue {
                    field: "ALLOWED_UPLOAD_EXTENSIONS",
                    value: extension.clone(),
                });
            }
        }

        let max_upload_size_mb = self.storage.max_upload_size_mb;
        if max_upload_size_mb == 0 || max_upload_size_mb > MAX_UPLOAD_SIZE_MB_LIMIT {
            return Err(ConfigError::InvalidValue {
                field: "MAX_UPLOAD_SIZE_MB",
                value: max_upload_size_mb.to_string(),
            });
        }

        if self.storage.backend == StorageBackend::Local
            && self.storage.upload_dir.trim().is_empty()
        {
            return Err(ConfigError::InvalidValue {
                field: "UPLOAD_DIR",
                value: String::from("<empty>"),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.password.is_empty() {
            return Err(ConfigError::MissingSecret("DATABASE_PASSWORD"));
        }
        if self.storage.backend == StorageBackend::S3
            && (self.s3.access_key.is_empty() || self.s3.secret_key.is_empty())
        {
            return Err(ConfigError::MissingSecret("S3_ACCESS_KEY/S3_SECRET_KEY"));
        }
        if self.admin.first_admin_password.is_empty() {
            return Err(ConfigError::MissingSecret("FIRST_ADMIN_PASSWORD"));
        }

        Ok(())
    }
}
