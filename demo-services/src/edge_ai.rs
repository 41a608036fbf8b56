//! EdgeAI inference platform.
//!
//! Models are registry entries with a label set; "inference" mixes the input
//! with RNG noise and returns a softmax over the labels. Queued requests go
//! through an mpsc channel to a background worker spawned with the router.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use demo_core::{
    banner, mock, shared, ApiError, ApiResult, DemoService, Payload, Route, ServiceDescriptor,
    Shared,
};
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use uuid::Uuid;

pub const DESCRIPTOR: ServiceDescriptor = ServiceDescriptor {
    name: "edge-ai",
    title: "EdgeAI",
    tagline: "Revolutionary edge computing AI platform",
    version: "1.0.0",
    default_port: 8002,
    features: &[
        "On-device model registry",
        "Low-latency inference",
        "Background inference queue",
    ],
    routes: &[
        Route::new("GET", "/api/status", "Server status"),
        Route::new("GET", "/api/models", "List loaded models"),
        Route::new("POST", "/api/load-model", "Load new model"),
        Route::new("POST", "/api/inference/:model", "Run inference"),
    ],
};

const QUEUE_CAPACITY: usize = 64;
const RECENT_JOBS: usize = 10;

const SAMPLE_MODELS: [(&str, &[&str]); 5] = [
    ("image_classifier", &["cat", "dog", "bird", "car", "person"]),
    ("object_detector", &["background", "vehicle", "pedestrian", "cyclist"]),
    ("speech_recognition", &["silence", "yes", "no", "stop", "go"]),
    ("anomaly_detector", &["normal", "anomaly"]),
    ("predictive_maintenance", &["healthy", "degraded", "failure_imminent"]),
];
const DEFAULT_LABELS: [&str; 4] = ["class_0", "class_1", "class_2", "class_3"];

/// Numerically stable softmax.
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct Model {
    pub name: String,
    pub path: String,
    pub labels: Vec<String>,
    pub initialized: bool,
    pub inferences: u64,
    pub loaded_at: DateTime<Utc>,
}

impl Model {
    fn new(name: &str, path: String, labels: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            path,
            labels,
            initialized: true,
            inferences: 0,
            loaded_at: mock::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoadModelRequest {
    #[serde(default)]
    pub name: String,
    pub path: Option<String>,
    pub labels: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct InferenceRequest {
    #[serde(default)]
    pub input: Vec<f64>,
    #[serde(default)]
    pub queued: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Inference {
    pub model: String,
    pub input_size: usize,
    pub output: Vec<f64>,
    pub labels: Vec<String>,
    pub prediction: String,
    pub confidence: f64,
    pub latency_us: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub job_id: Uuid,
    pub model: String,
    pub prediction: Option<String>,
    pub latency_us: Option<u64>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Job {
    pub id: Uuid,
    pub model: String,
    pub input: Vec<f64>,
}

pub struct EdgeEngine {
    rng: StdRng,
    models: BTreeMap<String, Model>,
    completed: u64,
    recent_jobs: VecDeque<JobRecord>,
}

impl EdgeEngine {
    pub fn new(rng: StdRng) -> Self {
        let models = SAMPLE_MODELS
            .iter()
            .map(|(name, labels)| {
                let labels = labels.iter().map(|l| l.to_string()).collect();
                let model = Model::new(name, format!("models/{}.tflite", name), labels);
                (name.to_string(), model)
            })
            .collect();
        Self {
            rng,
            models,
            completed: 0,
            recent_jobs: VecDeque::with_capacity(RECENT_JOBS),
        }
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.values()
    }

    pub fn load_model(&mut self, request: LoadModelRequest) -> ApiResult<&Model> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ApiError::bad_request("Model name is required"));
        }
        if self.models.contains_key(name) {
            return Err(ApiError::conflict(format!("Model already loaded: {}", name)));
        }
        let labels = match request.labels {
            Some(labels) if !labels.is_empty() => labels,
            _ => DEFAULT_LABELS.iter().map(|l| l.to_string()).collect(),
        };
        let path = request
            .path
            .unwrap_or_else(|| format!("models/{}.tflite", name));
        log::info!("Model loaded: {} ({} labels)", name, labels.len());
        Ok(self
            .models
            .entry(name.to_string())
            .or_insert(Model::new(name, path, labels)))
    }

    /// Checks a request before it is run or queued.
    pub fn validate(&self, model: &str, input: &[f64]) -> ApiResult<()> {
        if !self.models.contains_key(model) {
            return Err(ApiError::not_found(format!("Model not found: {}", model)));
        }
        if input.is_empty() {
            return Err(ApiError::bad_request("Input data must not be empty"));
        }
        Ok(())
    }

    pub fn infer(&mut self, model_name: &str, input: &[f64]) -> ApiResult<Inference> {
        self.validate(model_name, input)?;
        let started = Instant::now();
        let rng = &mut self.rng;
        let Some(model) = self.models.get_mut(model_name) else {
            return Err(ApiError::not_found(format!("Model not found: {}", model_name)));
        };

        let logits: Vec<f64> = (0..model.labels.len())
            .map(|k| input[k % input.len()] + rng.gen_range(-1.0..1.0))
            .collect();
        let output: Vec<f64> = softmax(&logits)
            .into_iter()
            .map(|p| mock::round_to(p, 4))
            .collect();
        let (best, confidence) = output
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::MIN), |acc, (i, p)| if p > acc.1 { (i, p) } else { acc });

        model.inferences += 1;
        self.completed += 1;
        Ok(Inference {
            model: model.name.clone(),
            input_size: input.len(),
            prediction: model.labels[best].clone(),
            labels: model.labels.clone(),
            output,
            confidence,
            latency_us: u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
        })
    }

    pub fn job_id(&mut self) -> Uuid {
        uuid::Builder::from_random_bytes(self.rng.gen()).into_uuid()
    }

    /// Runs a queued job and keeps its outcome in the recent list.
    pub fn run_job(&mut self, job: Job) -> JobRecord {
        let outcome = self.infer(&job.model, &job.input);
        let record = match outcome {
            Ok(inference) => {
                log::info!(
                    "Queued inference completed for {} in {} microseconds",
                    job.model,
                    inference.latency_us
                );
                JobRecord {
                    job_id: job.id,
                    model: job.model,
                    prediction: Some(inference.prediction),
                    latency_us: Some(inference.latency_us),
                    finished_at: mock::now(),
                }
            }
            Err(e) => {
                log::warn!("Queued inference {} failed: {}", job.id, e);
                JobRecord {
                    job_id: job.id,
                    model: job.model,
                    prediction: None,
                    latency_us: None,
                    finished_at: mock::now(),
                }
            }
        };
        if self.recent_jobs.len() == RECENT_JOBS {
            self.recent_jobs.pop_front();
        }
        self.recent_jobs.push_back(record.clone());
        record
    }
}

#[derive(Clone)]
struct EdgeAi {
    engine: Shared<EdgeEngine>,
    jobs: mpsc::Sender<Job>,
    pending: Arc<AtomicUsize>,
}

async fn process_queue(
    engine: Shared<EdgeEngine>,
    mut jobs: mpsc::Receiver<Job>,
    pending: Arc<AtomicUsize>,
) {
    while let Some(job) = jobs.recv().await {
        let mut engine = engine.lock().await;
        engine.run_job(job);
        pending.fetch_sub(1, Ordering::SeqCst);
    }
    log::debug!("Inference queue closed");
}

pub struct EdgeAiService;

impl DemoService for EdgeAiService {
    fn descriptor(&self) -> &'static ServiceDescriptor {
        &DESCRIPTOR
    }

    /// Spawns the queue worker, so this must run inside a tokio runtime.
    fn router(&self, rng: StdRng) -> Router {
        let engine = shared(EdgeEngine::new(rng));
        let pending = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(process_queue(engine.clone(), rx, pending.clone()));

        Router::new()
            .route("/", get(root))
            .route("/api/status", get(status))
            .route("/api/models", get(models))
            .route("/api/load-model", post(load_model))
            .route("/api/inference/:model", post(inference))
            .with_state(EdgeAi {
                engine,
                jobs: tx,
                pending,
            })
    }
}

async fn root() -> Json<Value> {
    Json(banner(&DESCRIPTOR))
}

async fn status(State(state): State<EdgeAi>) -> Json<Value> {
    let engine = state.engine.lock().await;
    let models: Vec<Value> = engine
        .models()
        .map(|m| json!({"name": m.name, "initialized": m.initialized}))
        .collect();
    Json(json!({
        "success": true,
        "status": {
            "server_running": true,
            "models_loaded": models.len(),
            "queue_size": state.pending.load(Ordering::SeqCst),
            "completed_inferences": engine.completed,
            "recent_jobs": engine.recent_jobs,
            "models": models,
        },
    }))
}

async fn models(State(state): State<EdgeAi>) -> Json<Value> {
    let engine = state.engine.lock().await;
    let models: Vec<&Model> = engine.models().collect();
    Json(json!({"success": true, "count": models.len(), "models": models}))
}

async fn load_model(
    State(state): State<EdgeAi>,
    Payload(request): Payload<LoadModelRequest>,
) -> ApiResult<Json<Value>> {
    let mut engine = state.engine.lock().await;
    let model = engine.load_model(request)?;
    Ok(Json(json!({"success": true, "model": model})))
}

async fn inference(
    State(state): State<EdgeAi>,
    Path(model): Path<String>,
    Payload(request): Payload<InferenceRequest>,
) -> ApiResult<Json<Value>> {
    if !request.queued {
        let result = state.engine.lock().await.infer(&model, &request.input)?;
        return Ok(Json(json!({"success": true, "inference": result})));
    }

    let id = {
        let mut engine = state.engine.lock().await;
        engine.validate(&model, &request.input)?;
        engine.job_id()
    };
    state.pending.fetch_add(1, Ordering::SeqCst);
    let job = Job {
        id,
        model,
        input: request.input,
    };
    if state.jobs.send(job).await.is_err() {
        state.pending.fetch_sub(1, Ordering::SeqCst);
        return Err(ApiError::Internal("Inference queue is closed".to_string()));
    }
    Ok(Json(json!({"success": true, "queued": true, "job_id": id})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_app;
    use axum::http::StatusCode;
    use demo_core::testing;
    use std::time::Duration;

    #[test]
    fn test_softmax() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
        let big = softmax(&[1000.0, 1000.0]);
        assert_eq!(big, vec![0.5, 0.5]);
    }

    #[test]
    fn test_sample_models_and_duplicates() {
        let mut engine = EdgeEngine::new(mock::seeded(Some(2)));
        assert_eq!(engine.models().count(), 5);

        let err = engine
            .load_model(LoadModelRequest {
                name: "anomaly_detector".to_string(),
                path: None,
                labels: None,
            })
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let model = engine
            .load_model(LoadModelRequest {
                name: "gesture".to_string(),
                path: None,
                labels: None,
            })
            .unwrap();
        assert_eq!(model.path, "models/gesture.tflite");
        assert_eq!(model.labels.len(), 4);
        assert_eq!(engine.models().count(), 6);
    }

    #[test]
    fn test_inference_output() {
        let mut engine = EdgeEngine::new(mock::seeded(Some(3)));
        let result = engine.infer("anomaly_detector", &[0.2, 0.9, 0.4]).unwrap();
        assert_eq!(result.output.len(), 2);
        assert!((result.output.iter().sum::<f64>() - 1.0).abs() < 1e-3);
        assert!(result.labels.contains(&result.prediction));
        assert_eq!(engine.completed, 1);

        assert!(matches!(engine.infer("missing", &[1.0]), Err(ApiError::NotFound(_))));
        assert!(matches!(
            engine.infer("anomaly_detector", &[]),
            Err(ApiError::BadRequest(_))
        ));
        assert_eq!(engine.completed, 1);
    }

    #[tokio::test]
    async fn test_routes_and_queue() {
        let app = test_app(&EdgeAiService);
        let (status, body) =
            testing::post(&app, "/api/inference/image_classifier", json!({"input": [0.5, 0.1]})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["inference"]["output"].as_array().map(Vec::len), Some(5));

        let (status, _) = testing::post(&app, "/api/inference/nope", json!({"input": [1.0]})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = testing::post(
            &app,
            "/api/inference/object_detector",
            json!({"input": [0.3], "queued": true}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let job_id = body["job_id"].clone();
        assert!(job_id.is_string());

        let mut completed = 0;
        for _ in 0..50 {
            let (_, body) = testing::get(&app, "/api/status").await;
            completed = body["status"]["completed_inferences"].as_u64().unwrap_or(0);
            if completed == 2 {
                assert_eq!(body["status"]["queue_size"], 0);
                assert_eq!(body["status"]["recent_jobs"][0]["job_id"], job_id);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(completed, 2);

        let (status, _) =
            testing::post(&app, "/api/load-model", json!({"name": "image_classifier"})).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
