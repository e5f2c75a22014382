use sprout_provider::{
    AssessmentModel, ForecastService, OpenAiVisionModel, OpenWeatherForecast, PlantNetIdentifier,
    SpeciesIdentifier, VisionRequest,
};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn vision_request() -> VisionRequest {
    VisionRequest {
        model: "gpt-4o-mini".into(),
        system: "You are an outdoor plant assistant".into(),
        text: "plant_name: Ficus lyrata\nsoil_moisture_percent: 31\n".into(),
        image_jpeg: vec![0xff, 0xd8, 0xff, 0xe0],
    }
}

#[tokio::test]
async fn assessment_returns_model_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_string_contains("plant_name"))
        .and(body_string_contains("data:image/jpeg;base64,"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{
                "message": {"content": "```json\n{\"health\": {}}\n```"},
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let model = OpenAiVisionModel::new("test-key", server.uri());
    let text = model.assess(vision_request()).await.unwrap();
    assert!(text.contains("\"health\""));
}

#[tokio::test]
async fn assessment_server_error_is_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let model = OpenAiVisionModel::new("test-key", server.uri());
    let err = model.assess(vision_request()).await.unwrap_err();
    assert!(err.to_string().contains("[retryable]"));
}

#[tokio::test]
async fn assessment_auth_error_is_not_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let model = OpenAiVisionModel::new("bad-key", server.uri());
    let err = model.assess(vision_request()).await.unwrap_err();
    assert!(!err.to_string().contains("[retryable]"));
}

#[tokio::test]
async fn species_identification_takes_first_candidate() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/identify/all"))
        .and(query_param("api-key", "pn-key"))
        .and(query_param("nb-results", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [
                {"score": 0.92, "species": {"scientificName": "Ficus lyrata"}},
                {"score": 0.03, "species": {"scientificName": "Ficus elastica"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let identifier = PlantNetIdentifier::with_base("pn-key", server.uri());
    let name = identifier.identify(vec![0xff, 0xd8]).await.unwrap();
    assert_eq!(name.as_deref(), Some("Ficus lyrata"));
}

#[tokio::test]
async fn species_identification_no_match_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/identify/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": []})))
        .mount(&server)
        .await;

    let identifier = PlantNetIdentifier::with_base("pn-key", server.uri());
    assert!(identifier.identify(vec![0xff]).await.unwrap().is_none());
}

#[tokio::test]
async fn forecast_reduces_first_eight_samples() {
    let server = MockServer::start().await;

    let mut list = Vec::new();
    for i in 0..8 {
        list.push(serde_json::json!({"main": {"temp": 15.0 + i as f64}}));
    }
    // Within the window: one wet sample.
    list[3] = serde_json::json!({"main": {"temp": 18.0}, "rain": {"3h": 2.5}});
    // Sample 9 is outside the 24h window and must be ignored.
    list.push(serde_json::json!({"main": {"temp": 40.0}, "rain": {"3h": 8.0}}));

    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .and(query_param("lat", "59.91"))
        .and(query_param("lon", "10.75"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"list": list})))
        .expect(1)
        .mount(&server)
        .await;

    let service = OpenWeatherForecast::with_base("ow-key", server.uri());
    let forecast = service.forecast_24h("59.91", "10.75").await.unwrap();
    assert!(forecast.will_rain_next_24h);
    assert!((forecast.rain_mm_next_24h - 2.5).abs() < 1e-9);
    assert_eq!(forecast.max_temp_next_24h_c, 22.0);
}

#[tokio::test]
async fn forecast_http_error_propagates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let service = OpenWeatherForecast::with_base("ow-key", server.uri());
    let err = service.forecast_24h("0", "0").await.unwrap_err();
    assert!(err.to_string().contains("503"));
}
