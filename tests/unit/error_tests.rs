//! Unit tests for `AppError` display formats and conversions.

use capgate::AppError;

#[test]
fn init_error_display_starts_with_init_prefix() {
    let err = AppError::Init("capability refused settings".into());
    assert_eq!(err.to_string(), "init: capability refused settings");
}

#[test]
fn handler_error_display_includes_message() {
    let err = AppError::Handler("bad payload".into());
    assert!(err.to_string().starts_with("handler:"));
    assert!(err.to_string().contains("bad payload"));
}

#[test]
fn stream_error_is_distinct_from_handler_error() {
    let stream = AppError::Stream("emit failed".into());
    let handler = AppError::Handler("emit failed".into());
    assert_ne!(stream.to_string(), handler.to_string());
    assert!(stream.to_string().starts_with("stream:"));
}

#[test]
fn error_message_has_no_trailing_period() {
    let err = AppError::Config("port missing".into());
    let s = err.to_string();
    assert!(
        !s.ends_with('.'),
        "error message must not end with a period: {s}"
    );
}

#[test]
fn implements_std_error_trait() {
    fn assert_error<E: std::error::Error>(_err: &E) {}
    assert_error(&AppError::NotFound("route".into()));
}

#[test]
fn toml_error_converts_to_config() {
    let toml_err = toml::from_str::<toml::Value>("= nope").expect_err("broken toml");
    let err: AppError = toml_err.into();
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn io_error_converts_to_io() {
    let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
    let err: AppError = io_err.into();
    assert!(matches!(err, AppError::Io(_)));
    assert!(err.to_string().starts_with("io:"));
}
