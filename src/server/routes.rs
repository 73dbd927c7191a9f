//! The user-facing JSON web server. Health, class listing and the
//! prediction route, which hands the forward pass to actix's blocking pool.

use super::protocol::{ClassesResponse, HealthResponse, PredictRequest, PredictResponse};
use super::WebError;
use crate::config::ServerConfig;
use crate::detector::Detector;
use crate::error::InputError;
use actix_web::{get, post, web, HttpRequest, Responder};
use tracing::*;

type Result<T> = std::result::Result<T, WebError>;

/// Register the routes and the shared state they read
pub fn configure(
    detector: web::Data<Detector>,
    server: web::Data<ServerConfig>,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        let limit = server.body_limit_bytes();
        cfg.app_data(detector)
            .app_data(server)
            .app_data(json_config(limit))
            .service(health)
            .service(predict)
            .service(classes);
    }
}

/// Malformed JSON bodies are the caller's fault
fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| {
            warn!("rejected request body: {err}");
            WebError::from(InputError::Body(err.to_string())).into()
        })
}

#[get("/health")]
pub async fn health(_req: HttpRequest, server: web::Data<ServerConfig>) -> impl Responder {
    web::Json(HealthResponse {
        status: "healthy",
        service: server.service_name.clone(),
    })
}

/// Classify a base64 leaf photo
#[post("/predict")]
pub async fn predict(
    req: web::Json<PredictRequest>,
    detector: web::Data<Detector>,
) -> Result<impl Responder> {
    debug!("got request {:?}", req);

    let image = req.into_inner().image.ok_or_else(|| {
        warn!("prediction request without image data");
        InputError::MissingImage
    })?;

    let detector = detector.into_inner();
    let prediction = web::block(move || detector.predict_base64(&image))
        .await?
        .map_err(|err| {
            warn!("prediction failed: {err}");
            err
        })?;

    info!(
        "predicted {} ({:.2}%)",
        prediction.predicted_class, prediction.confidence
    );

    Ok(web::Json(PredictResponse::from(prediction)))
}

/// Every class the model distinguishes, in output order
#[get("/classes")]
pub async fn classes(_req: HttpRequest, detector: web::Data<Detector>) -> impl Responder {
    web::Json(ClassesResponse::from(detector.classes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModelConfig, TEA_CLASSES};
    use crate::detector::tests::{favouring, FixedNetwork};
    use crate::error::InferenceError;
    use crate::preprocess::tests::solid_png;
    use crate::preprocess::ImageTensor;
    use crate::torch::Network;
    use actix_web::http::{header::ContentType, StatusCode};
    use actix_web::{test, App};
    use base64::{engine::general_purpose, Engine as _};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn data(detector: Detector) -> (web::Data<Detector>, web::Data<ServerConfig>) {
        (
            web::Data::new(detector),
            web::Data::new(ServerConfig::default()),
        )
    }

    fn loaded(logits: Vec<f32>) -> Detector {
        Detector::new(&ModelConfig::default(), Box::new(FixedNetwork::new(logits))).unwrap()
    }

    fn leaf_b64() -> String {
        general_purpose::STANDARD.encode(solid_png(64, 48, [40, 160, 60]))
    }

    async fn post_predict(detector: Detector, body: Value) -> (StatusCode, Value) {
        let (detector, server) = data(detector);
        let app = test::init_service(App::new().configure(configure(detector, server))).await;
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        let status = resp.status();
        (status, test::read_body_json(resp).await)
    }

    #[actix_web::test]
    async fn test_health() {
        let (detector, server) = data(loaded(favouring(0)));
        let app = test::init_service(App::new().configure(configure(detector, server))).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body,
            json!({"status": "healthy", "service": "Tea Leaf Disease Detection API"})
        );
    }

    #[actix_web::test]
    async fn test_classes_in_configured_order() {
        let (detector, server) = data(loaded(favouring(0)));
        let app = test::init_service(App::new().configure(configure(detector, server))).await;

        let req = test::TestRequest::get().uri("/classes").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["total_classes"], 8);
        assert_eq!(body["classes"], json!(TEA_CLASSES));
    }

    #[actix_web::test]
    async fn test_predict() {
        let (status, body) = post_predict(loaded(favouring(2)), json!({ "image": leaf_b64() })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["predicted_class"], "bird eye spot");
        assert_eq!(body["is_healthy"], false);
        assert_eq!(body["disease_info"]["severity"], "Moderate");

        let all = body["all_predictions"].as_array().unwrap();
        assert_eq!(all.len(), 8);
        assert_eq!(all[0]["class"], body["predicted_class"]);
        assert_eq!(all[0]["confidence"], body["confidence"]);

        let confidences: Vec<f64> = all.iter().map(|p| p["confidence"].as_f64().unwrap()).collect();
        assert!(confidences.windows(2).all(|w| w[0] >= w[1]));
        assert!((confidences.iter().sum::<f64>() - 100.0).abs() < 1e-3);
    }

    #[actix_web::test]
    async fn test_predict_healthy_data_url() {
        let image = format!("data:image/png;base64,{}", leaf_b64());
        let (status, body) = post_predict(loaded(favouring(5)), json!({ "image": image })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["predicted_class"], "healthy");
        assert_eq!(body["is_healthy"], true);
        assert_eq!(body["disease_info"]["treatment"], "Continue regular care and monitoring.");
    }

    #[actix_web::test]
    async fn test_missing_image() {
        for body in [json!({}), json!({ "image": null }), json!({ "picture": "abc" })] {
            let (status, body) = post_predict(loaded(favouring(0)), body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(
                body,
                json!({"error": "No image data provided", "success": false})
            );
            assert!(body.get("predicted_class").is_none());
        }
    }

    #[actix_web::test]
    async fn test_malformed_body() {
        let (detector, server) = data(loaded(favouring(0)));
        let app = test::init_service(App::new().configure(configure(detector, server))).await;

        let req = test::TestRequest::post()
            .uri("/predict")
            .insert_header(ContentType::plaintext())
            .set_payload("image=abc")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid request body: "));
    }

    #[actix_web::test]
    async fn test_undecodable_image() {
        let (status, body) =
            post_predict(loaded(favouring(0)), json!({ "image": "bm90IGFuIGltYWdl" })).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to process image: "));
        assert!(body.get("predicted_class").is_none());
    }

    #[actix_web::test]
    async fn test_model_not_loaded() {
        let detector = Detector::unloaded(&ModelConfig::default()).unwrap();
        let (status, body) = post_predict(detector, json!({ "image": leaf_b64() })).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Model not loaded", "success": false}));
    }

    /// Passes the startup probe, then panics
    struct PanickingNetwork {
        calls: AtomicUsize,
    }

    impl Network for PanickingNetwork {
        fn forward(&self, _input: &ImageTensor) -> std::result::Result<Vec<f32>, InferenceError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
                panic!("forward pass blew up");
            }
            Ok(vec![0.0; TEA_CLASSES.len()])
        }
    }

    #[actix_web::test]
    async fn test_handler_failure_is_server_error() {
        let network = PanickingNetwork {
            calls: AtomicUsize::new(0),
        };
        let detector = Detector::new(&ModelConfig::default(), Box::new(network)).unwrap();
        let (status, body) = post_predict(detector, json!({ "image": leaf_b64() })).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().starts_with("Server error: "));
    }

    /// Panics on its first request only
    struct PanicOnceNetwork {
        calls: AtomicUsize,
    }

    impl Network for PanicOnceNetwork {
        fn forward(&self, _input: &ImageTensor) -> std::result::Result<Vec<f32>, InferenceError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 1 {
                panic!("forward pass blew up");
            }
            Ok(favouring(5))
        }
    }

    #[actix_web::test]
    async fn test_recovers_after_panicking_request() {
        let network = PanicOnceNetwork {
            calls: AtomicUsize::new(0),
        };
        let detector = Detector::new(&ModelConfig::default(), Box::new(network)).unwrap();
        let (detector, server) = data(detector);
        let app = test::init_service(App::new().configure(configure(detector, server))).await;

        let mut statuses = vec![];
        for _ in 0..3 {
            let req = test::TestRequest::post()
                .uri("/predict")
                .set_json(json!({ "image": leaf_b64() }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            statuses.push(resp.status());

            let body: Value = test::read_body_json(resp).await;
            if statuses.len() == 3 {
                assert_eq!(body["predicted_class"], "healthy");
            }
        }

        assert_eq!(
            statuses,
            vec![
                StatusCode::OK,
                StatusCode::INTERNAL_SERVER_ERROR,
                StatusCode::OK
            ]
        );
    }
}
