#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempfile::tempdir;

    use crate::errors::{ AnnotatorError, ErrorSeverity, RecoverableError };
    use crate::implementations::config::{ ConfigError, GatewayConfig, Provider };
    use crate::models::common::{ ImageRef, ModelRole, VerificationMode };

    const MINIMAL_CONFIG: &str = r#"
text_model:
  api_endpoint: http://gpu-box:8000/v1/chat/completions
  model: Qwen/Qwen2.5-14B-Instruct
vision_model:
  provider: anthropic
  api_key: sk-test
  api_endpoint: https://api.anthropic.com/v1/messages
  model: claude-vision
prompt_templates:
  verification: "Judge {{subject}}.\n{{statements}}"
"#;

    #[test]
    fn loads_yaml_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gateway.yaml");
        fs::write(&path, MINIMAL_CONFIG).unwrap();

        let config = GatewayConfig::from_file(&path).unwrap();

        assert_eq!(config.text_model.provider, Provider::OpenAI);
        assert_eq!(config.vision_model.provider, Provider::Anthropic);
        assert_eq!(config.max_tokens, 4096);
        assert_eq!(config.batch_concurrency, 8);
        assert_eq!(config.timeout_secs, 300);
        assert_eq!(config.temperature, 0.0);
        assert!(config.prompt_templates.contains_key("verification"));
        assert_eq!(config.api_for(ModelRole::Vision).model, "claude-vision");
        assert_eq!(config.get_api_key(ModelRole::Vision).unwrap().as_deref(), Some("sk-test"));
    }

    #[test]
    fn rejects_invalid_values() {
        let mut config = GatewayConfig::default();
        config.batch_concurrency = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));

        let mut config = GatewayConfig::default();
        config.temperature = 3.5;
        assert!(config.validate().is_err());

        let mut config = GatewayConfig::default();
        config.vision_model.model = " ".to_string();
        assert!(config.validate().is_err());

        assert!(GatewayConfig::default().validate().is_ok());
    }

    #[test]
    fn config_errors_are_fatal() {
        let missing = GatewayConfig::from_file(Path::new("/nonexistent/gateway.yaml")).unwrap_err();
        assert!(matches!(missing, ConfigError::FileReadError(_)));

        let err = AnnotatorError::from(missing);
        assert!(matches!(err, AnnotatorError::ConfigError(_)));
        assert_eq!(err.severity(), ErrorSeverity::Fatal);
        assert!(err.recovery_strategy().is_some());
    }

    #[test]
    fn gateway_errors_are_recoverable() {
        let overloaded = AnnotatorError::HttpError { status: 503, message: "busy".to_string() };
        assert!(overloaded.is_recoverable());
        assert!(overloaded.recovery_strategy().is_some());

        let mismatch = AnnotatorError::BatchMismatch { expected: 3, actual: 2 };
        assert_eq!(mismatch.severity(), ErrorSeverity::Error);

        assert!(!AnnotatorError::DatasetError("bad".to_string()).is_recoverable());
    }

    #[test]
    fn verification_mode_parses_cli_names() {
        assert_eq!("per-claim".parse::<VerificationMode>(), Ok(VerificationMode::PerClaim));
        assert_eq!("Combined".parse::<VerificationMode>(), Ok(VerificationMode::Combined));
        assert_eq!("batch".parse::<VerificationMode>(), Ok(VerificationMode::Combined));
        assert!("both".parse::<VerificationMode>().is_err());
        assert_eq!(VerificationMode::default(), VerificationMode::PerClaim);
        assert_eq!(VerificationMode::PerClaim.to_string(), "per-claim");
    }

    #[test]
    fn image_refs_resolve_and_guess_media_type() {
        let root = Path::new("/data/images");

        assert_eq!(
            ImageRef::resolve("cat.jpg", Some(root)).location,
            root.join("cat.jpg").to_string_lossy()
        );
        assert_eq!(ImageRef::resolve("/abs/cat.jpg", Some(root)).location, "/abs/cat.jpg");
        assert_eq!(ImageRef::resolve("http://host/cat.jpg", Some(root)).location, "http://host/cat.jpg");
        assert_eq!(ImageRef::resolve("cat.jpg", None).location, "cat.jpg");

        assert_eq!(ImageRef::new("a.webp").media_type(), "image/webp");
        assert_eq!(ImageRef::new("a.jpeg").media_type(), "image/jpeg");
        assert_eq!(ImageRef::new("no_extension").media_type(), "image/jpeg");
    }
}
