use std::error::Error;
use tldr_pages::errors::SummaryError;

#[test]
fn test_summary_error_implements_error_trait() {
    fn assert_error<T: Error + Send + Sync + 'static>(_: &T) {}

    let error = SummaryError::InvalidArgument("test error".to_string());
    assert_error(&error);
}

#[test]
fn test_summary_error_display() {
    let error = SummaryError::NotFound("t1".to_string());
    assert_eq!(format!("{error}"), "Record not found: t1");

    let error = SummaryError::Timeout(30);
    assert_eq!(format!("{error}"), "Task timed out after 30s");

    let error = SummaryError::UpstreamFailure("HTTP 503".to_string());
    assert_eq!(format!("{error}"), "Upstream service failed: HTTP 503");
}

#[test]
fn test_summary_error_status_codes() {
    let cases = [
        (SummaryError::NotFound(String::new()), 404),
        (SummaryError::AlreadyExists(String::new()), 409),
        (SummaryError::InvalidArgument(String::new()), 400),
        (SummaryError::TooManyRequests(String::new()), 429),
        (SummaryError::Timeout(1), 504),
        (SummaryError::UpstreamFailure(String::new()), 502),
        (SummaryError::StoreFailure(String::new()), 500),
    ];
    for (error, code) in cases {
        assert_eq!(error.status_code(), code, "{error}");
    }
}

#[test]
fn test_summary_error_from_conversions() {
    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: SummaryError = json_err.into();
    assert!(matches!(err, SummaryError::StoreFailure(_)));

    // We can't easily construct a reqwest::Error, but we can verify
    // that the From<reqwest::Error> trait is implemented
    #[allow(unused)]
    #[allow(clippy::items_after_statements)]
    fn _check_reqwest_conversion(err: reqwest::Error) -> SummaryError {
        SummaryError::from(err)
    }
}
