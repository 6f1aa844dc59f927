use clipfinder::config::{normalize_language, AudioSettings, ClientConfig, ModelSize};
use clipfinder::kernel::error::SessionError;
use clipfinder::search::{build_request, map_response, resolve_clip_url};
use clipfinder::services::backend::{
    extract_detail, Asset, SearchResponse, StatusReport, TransportError,
};

#[test]
fn test_status_report_tolerates_missing_fields() {
    let report: StatusReport = serde_json::from_str(r#"{"stage": "EXTRACTING"}"#).unwrap();
    assert_eq!(report.stage(), "EXTRACTING");
    assert_eq!(report.progress_percent(), 0);
    assert!(!report.ready);
    assert!(report.error_message().is_none());

    let report: StatusReport = serde_json::from_str(
        r#"{"stage": "READY", "progress": 99.6, "ready": true, "error": null, "extra": 1}"#,
    )
    .unwrap();
    assert_eq!(report.progress_percent(), 100);
    assert!(report.ready);
}

#[test]
fn test_status_report_error_is_trimmed() {
    let report: StatusReport =
        serde_json::from_str(r#"{"stage": "FAILED", "error": "  out of memory \n"}"#).unwrap();
    assert_eq!(report.error_message(), Some("out of memory"));

    let report: StatusReport = serde_json::from_str(r#"{"error": ""}"#).unwrap();
    assert!(report.error_message().is_none());
}

#[test]
fn test_search_request_shape() {
    let body = serde_json::to_value(build_request("where is the car")).unwrap();
    assert_eq!(
        body,
        serde_json::json!({"query": "where is the car", "top_k": 3, "clip_duration": 10.0})
    );
}

#[test]
fn test_search_response_alternates_default_to_empty() {
    let response: SearchResponse =
        serde_json::from_str(r#"{"best": {"start": 4.5, "text": "hi"}}"#).unwrap();
    let result = response.into_result();
    assert_eq!(result.best.as_ref().map(|b| b.start), Some(4.5));
    assert!(result.alternates.is_empty());

    let response: SearchResponse =
        serde_json::from_str(r#"{"best": null, "alternates": null}"#).unwrap();
    assert!(response.into_result().is_no_match());
}

#[test]
fn test_clip_url_resolution() {
    let base = "http://localhost:8000/";
    assert_eq!(
        resolve_clip_url(base, "/audio/videos/j/clip.mp4", 42),
        "http://localhost:8000/audio/videos/j/clip.mp4?t=42"
    );
    assert_eq!(
        resolve_clip_url(base, "clips/a.mp4?start=3", 42),
        "http://localhost:8000/clips/a.mp4?start=3&t=42"
    );
    assert_eq!(
        resolve_clip_url(base, "https://cdn.example.com/a.mp4", 7),
        "https://cdn.example.com/a.mp4?t=7"
    );
}

#[test]
fn test_map_response_only_clips_best_match() {
    let response: SearchResponse = serde_json::from_str(
        r#"{"best": {"start": 1.0, "clip_url": "/c.mp4"}, "alternates": [{"start": 2.0, "clip_url": "/d.mp4"}]}"#,
    )
    .unwrap();
    let settled = map_response("http://h:1", response, 5);
    assert_eq!(settled.clip_reference.as_deref(), Some("http://h:1/c.mp4?t=5"));
    assert_eq!(settled.result.alternates.len(), 1);

    let response: SearchResponse =
        serde_json::from_str(r#"{"best": {"start": 1.0, "clip_url": ""}}"#).unwrap();
    assert!(map_response("http://h:1", response, 5).clip_reference.is_none());
}

#[test]
fn test_extract_detail() {
    assert_eq!(extract_detail(r#"{"detail": " Job not found "}"#), "Job not found");
    assert_eq!(
        extract_detail(r#"{"detail": [{"loc": ["body"], "msg": "field required"}]}"#),
        r#"[{"loc":["body"],"msg":"field required"}]"#
    );
    assert_eq!(extract_detail("  Internal Server Error \n"), "Internal Server Error");
    assert_eq!(extract_detail(r#"{"detail": null}"#), r#"{"detail": null}"#);
    assert_eq!(extract_detail(&"x".repeat(500)).len(), 200);
}

#[test]
fn test_user_messages() {
    let detailed = TransportError::Http {
        status: 404,
        detail: "Job not found".to_string(),
    };
    assert_eq!(detailed.user_message(), "Job not found");

    let bare = TransportError::Http {
        status: 502,
        detail: String::new(),
    };
    assert_eq!(bare.user_message(), "Request failed with status 502");

    assert_eq!(
        TransportError::Network("refused".to_string()).user_message(),
        "Could not reach the backend"
    );
    assert_eq!(
        TransportError::Timeout.user_message(),
        "The backend did not respond in time"
    );
}

#[test]
fn test_asset_mime_by_extension() {
    assert_eq!(Asset::from_bytes("a.MP4", vec![1]).mime, "video/mp4");
    assert_eq!(Asset::from_bytes("a.mov", vec![1]).mime, "video/quicktime");
    assert_eq!(Asset::from_bytes("a.webm", vec![1]).mime, "video/webm");
    assert_eq!(
        Asset::from_bytes("noext", vec![1]).mime,
        "application/octet-stream"
    );
    assert!(Asset::from_bytes("a.mp4", Vec::new()).is_empty());
}

#[tokio::test]
async fn test_asset_from_missing_path() {
    let err = Asset::from_path("/definitely/not/here.mp4").await.unwrap_err();
    assert!(matches!(err, TransportError::InvalidAsset(_)));
}

#[test]
fn test_model_size_wire_names() {
    assert_eq!(serde_json::to_string(&ModelSize::LargeV3).unwrap(), r#""large-v3""#);
    let parsed: ModelSize = serde_json::from_str(r#""tiny""#).unwrap();
    assert_eq!(parsed, ModelSize::Tiny);
    assert_eq!(ModelSize::parse(" Medium "), Some(ModelSize::Medium));
    assert_eq!(ModelSize::parse("huge"), None);
    assert_eq!(ModelSize::default(), ModelSize::Small);
}

#[test]
fn test_audio_settings_normalize_language() {
    let settings = AudioSettings::new("  EN ", ModelSize::Base).unwrap();
    assert_eq!(settings.language, "en");
    assert_eq!(normalize_language("\t"), None);
    assert!(matches!(
        AudioSettings::new(" ", ModelSize::Base),
        Err(SessionError::InvalidSettings(_))
    ));

    let defaults = AudioSettings::default();
    assert_eq!(defaults.language, "en");
    assert_eq!(defaults.model_size, ModelSize::Small);
}

#[test]
fn test_client_config_defaults_and_overrides() {
    let config = ClientConfig::default();
    assert_eq!(config.base(), "http://localhost:8000");
    assert_eq!(config.poll_interval().as_millis(), 2000);
    assert!(config.validate().is_ok());

    let config = ClientConfig::from_json(r#"{"base_url": "http://api:9000/", "poll_interval_ms": 500}"#)
        .unwrap();
    assert_eq!(config.base(), "http://api:9000");
    assert_eq!(config.poll_interval_ms, 500);
    assert_eq!(config.request_timeout_secs, 30);

    assert!(ClientConfig::from_json(r#"{"poll_interval_ms": 0}"#).is_err());
    assert!(ClientConfig::from_json(r#"{"base_url": " "}"#).is_err());
    assert!(ClientConfig::from_json("not json").is_err());
}
