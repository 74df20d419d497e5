use std::env;

/// Admission and transfer policy for the upload pipeline.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// The single admissible declared content type (default: application/pdf)
    pub accepted_type: String,

    /// Maximum files in one upload queue (default: 10)
    pub max_files: usize,

    /// Maximum size per file in bytes (default: 100 MB)
    pub max_file_size: usize,

    /// How many files transfer concurrently within a batch (default: 3)
    pub transfer_concurrency: usize,
}

/// Service-wide configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub policy: UploadPolicy,

    /// JWT Secret Key (Required in production)
    pub jwt_secret: String,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            accepted_type: "application/pdf".to_string(),
            max_files: 10,
            max_file_size: 100 * 1024 * 1024, // 100 MB
            transfer_concurrency: 3,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            policy: UploadPolicy::default(),
            jwt_secret: "secret".to_string(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(), // Vite default
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            policy: UploadPolicy {
                accepted_type: env::var("ACCEPTED_CONTENT_TYPE")
                    .unwrap_or(default.policy.accepted_type),

                max_files: env::var("MAX_FILES_PER_BATCH")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(default.policy.max_files),

                max_file_size: env::var("MAX_FILE_SIZE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(default.policy.max_file_size),

                transfer_concurrency: env::var("TRANSFER_CONCURRENCY")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(default.policy.transfer_concurrency),
            },

            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| "secret".to_string()), // Fallback for dev convenience, strictly enforced in production method

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.allowed_origins),
        }
    }

    /// Create config for development (relaxed limits, fixed secret)
    pub fn development() -> Self {
        Self {
            policy: UploadPolicy {
                max_files: 50,
                ..UploadPolicy::default()
            },
            ..Self::default()
        }
    }

    /// Create config for production (strict security)
    pub fn production() -> Self {
        let from_env = Self::from_env();
        Self {
            jwt_secret: env::var("JWT_SECRET").expect("CRITICAL: JWT_SECRET must be set"),
            ..from_env
        }
    }
}
