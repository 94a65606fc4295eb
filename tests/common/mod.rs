#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt; // for .oneshot()

use tabserve::{
    web::build_router, AppState, Classifier, FeatureSchema, InputMatrix, ServeError, ServeResult,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbaMode {
    Unsupported,
    Binary,
    MultiClass,
    Fails,
    WrongRowCount,
}

/// Echoes the first column of each row as its label and records the last
/// matrix it was handed.
pub struct FakeClassifier {
    pub proba: ProbaMode,
    pub fail_predict: bool,
    pub width: Option<usize>,
    pub seen: Mutex<Option<InputMatrix>>,
}

impl FakeClassifier {
    pub fn new(proba: ProbaMode) -> Self {
        Self {
            proba,
            fail_predict: false,
            width: None,
            seen: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_predict: true,
            ..Self::new(ProbaMode::Binary)
        }
    }

    pub fn last_input(&self) -> Option<InputMatrix> {
        self.seen.lock().unwrap().clone()
    }
}

impl Classifier for FakeClassifier {
    fn kind(&self) -> &'static str {
        "fake"
    }

    fn n_features(&self) -> Option<usize> {
        self.width
    }

    fn predict(&self, input: &InputMatrix) -> ServeResult<Vec<Value>> {
        *self.seen.lock().unwrap() = Some(input.clone());
        if self.fail_predict {
            return Err(ServeError::inference("could not convert string to float: 'Male'"));
        }
        Ok(input.rows().iter().map(|row| row[0].clone()).collect())
    }

    fn supports_proba(&self) -> bool {
        self.proba != ProbaMode::Unsupported
    }

    fn predict_proba(&self, input: &InputMatrix) -> ServeResult<Vec<Vec<f64>>> {
        let n = input.len();
        match self.proba {
            ProbaMode::Unsupported => Err(ServeError::inference("unsupported")),
            // row i: [0.75 - 0.5i, 0.25 + 0.5i]
            ProbaMode::Binary => Ok((0..n)
                .map(|i| {
                    let shift = 0.5 * i as f64;
                    vec![0.75 - shift, 0.25 + shift]
                })
                .collect()),
            ProbaMode::MultiClass => Ok(vec![vec![0.2, 0.3, 0.5]; n]),
            ProbaMode::Fails => Err(ServeError::inference("predict_proba blew up")),
            ProbaMode::WrongRowCount => Ok(vec![vec![0.5, 0.5]; n + 1]),
        }
    }
}

pub fn schema(names: &[&str]) -> FeatureSchema {
    FeatureSchema::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
}

pub fn app_with(names: &[&str], model: Arc<FakeClassifier>) -> Router {
    let state = AppState::new(schema(names), model, 5).expect("state should build");
    build_router(Arc::new(state))
}

pub fn app(names: &[&str], proba: ProbaMode) -> Router {
    app_with(names, Arc::new(FakeClassifier::new(proba)))
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub async fn post_raw(app: &Router, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri("/predict")
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_predict(app: &Router, body: Value) -> (StatusCode, Value) {
    post_raw(app, &body.to_string()).await
}

pub async fn get_health(app: &Router) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri("/health")
        .method("GET")
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}
