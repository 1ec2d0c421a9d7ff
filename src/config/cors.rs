use std::env;

#[derive(Clone, Debug)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn from_env() -> Self {
        let allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self { allowed_origins }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_trims_origins() {
        // SAFETY: tests in this module run single-threaded over env state
        unsafe {
            env::set_var(
                "CORS_ALLOWED_ORIGINS",
                "http://localhost:3000, https://admin.example.com ,",
            );
        }
        let config = CorsConfig::from_env();
        assert_eq!(
            config.allowed_origins,
            vec![
                "http://localhost:3000".to_string(),
                "https://admin.example.com".to_string()
            ]
        );
        unsafe {
            env::remove_var("CORS_ALLOWED_ORIGINS");
        }
    }
}
