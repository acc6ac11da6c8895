//! RestStore against a local axum server that mimics the persistence service.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;

use mix_core::calculations::MaterialDistribution;
use mix_core::config::{FormulaParameters, NewAbaMaterialConfig};
use mix_core::errors::{CalcError, CalcResult};
use mix_core::formula::{AbaFormula, FormulaMaterial};
use mix_core::persistence::{
    create_formula, delete_formula, load_config, load_default_config, save_config, set_default, update_formula,
    SaveConfigRequest,
};
use mix_core::store::{InMemoryStore, MixStore, RawMaterial, RestStore};

type Shared = Arc<InMemoryStore>;

fn respond<T: Serialize>(result: CalcResult<T>) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(CalcError::NotFound { .. }) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, Json(json!({ "message": e.to_string() }))).into_response(),
    }
}

async fn list_configs(State(store): State<Shared>) -> Response {
    respond(store.list_configs().await)
}

async fn get_config(State(store): State<Shared>, Path(id): Path<i64>) -> Response {
    respond(store.get_config(id).await)
}

async fn default_config(State(store): State<Shared>) -> Response {
    match store.get_default_config().await {
        Ok(Some(config)) => Json(config).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => respond::<()>(Err(e)),
    }
}

async fn create_config(State(store): State<Shared>, Json(body): Json<NewAbaMaterialConfig>) -> Response {
    respond(store.create_config(&body).await)
}

async fn set_default_config(State(store): State<Shared>, Path(id): Path<i64>) -> Response {
    respond(store.set_default_config(id).await.map(|_| json!({ "success": true })))
}

async fn list_formulas(State(store): State<Shared>) -> Response {
    respond(store.list_formulas().await)
}

async fn post_formula(State(store): State<Shared>, Json(body): Json<AbaFormula>) -> Response {
    respond(store.create_formula(&body).await)
}

async fn put_formula(State(store): State<Shared>, Path(id): Path<i64>, Json(body): Json<AbaFormula>) -> Response {
    respond(store.update_formula(id, &body).await)
}

async fn remove_formula(State(store): State<Shared>, Path(id): Path<i64>) -> Response {
    match store.delete_formula(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => respond::<()>(Err(e)),
    }
}

async fn list_raw_materials(State(store): State<Shared>) -> Response {
    respond(store.list_raw_materials().await)
}

fn service(store: Shared) -> Router {
    Router::new()
        .route("/api/aba-material-configs", get(list_configs).post(create_config))
        .route("/api/aba-material-configs/default", get(default_config))
        .route("/api/aba-material-configs/{id}", get(get_config))
        .route("/api/aba-material-configs/{id}/set-default", post(set_default_config))
        .route("/api/aba-formulas", get(list_formulas).post(post_formula))
        .route("/api/aba-formulas/{id}", put(put_formula).delete(remove_formula))
        .route("/api/raw-materials", get(list_raw_materials))
        .with_state(store)
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn rest_store() -> RestStore {
    let backend = Arc::new(InMemoryStore::with_raw_materials(vec![
        RawMaterial {
            id: 1,
            name: "HDPE".to_string(),
            code: Some("HD-5502".to_string()),
        },
        RawMaterial {
            id: 2,
            name: "Calcium filler".to_string(),
            code: None,
        },
    ]));
    let base_url = spawn(service(backend)).await;
    RestStore::new(base_url, Duration::from_secs(5)).unwrap()
}

fn request(name: &str, make_default: bool) -> SaveConfigRequest {
    SaveConfigRequest {
        name: name.to_string(),
        description: None,
        materials: vec![
            MaterialDistribution::new("HDPE", 75.0, 100.0),
            MaterialDistribution::new("LLDPE", 50.0, 50.0),
            MaterialDistribution::new("Filler", 25.0 + 1.0 / 3.0, 350.0),
            MaterialDistribution::new("MasterBatch", 0.1 + 0.2, 15.0),
        ],
        formula_parameters: FormulaParameters {
            a_total_weight: 155.0 + 1.0 / 7.0,
            b_total_weight: 515.0,
        },
        make_default,
    }
}

#[tokio::test]
async fn save_and_load_over_http_is_exact() {
    let store = rest_store().await;
    let request = request("Film", false);

    let saved = save_config(&store, &request, Some(5)).await.unwrap();
    assert_eq!(saved.created_by, 5);

    let loaded = load_config(&store, saved.id, FormulaParameters::default()).await.unwrap();
    assert_eq!(loaded.formula_parameters, request.formula_parameters);
    for (row, original) in loaded.materials.iter().zip(&request.materials) {
        assert_eq!(row.a_kg, original.a_kg);
        assert_eq!(row.b_kg, original.b_kg);
    }
    assert_eq!(store.list_configs().await.unwrap().len(), 1);
}

#[tokio::test]
async fn default_selection_over_http() {
    let store = rest_store().await;
    assert!(load_default_config(&store, FormulaParameters::default())
        .await
        .unwrap()
        .is_none());

    let first = save_config(&store, &request("First", true), Some(1)).await.unwrap();
    let second = save_config(&store, &request("Second", false), Some(1)).await.unwrap();
    assert!(first.is_default);

    set_default(&store, second.id).await.unwrap();
    let default = load_default_config(&store, FormulaParameters::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(default.id, second.id);

    let flagged = store
        .list_configs()
        .await
        .unwrap()
        .into_iter()
        .filter(|c| c.is_default)
        .count();
    assert_eq!(flagged, 1);
}

#[tokio::test]
async fn missing_ids_map_to_not_found() {
    let store = rest_store().await;
    let err = store.get_config(404).await.unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");
    let err = set_default(&store, 404).await.unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");
    let err = delete_formula(&store, 404).await.unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");
}

#[tokio::test]
async fn formula_crud_over_http() {
    let store = rest_store().await;
    let formula = AbaFormula {
        id: None,
        name: "HDPE 1:2".to_string(),
        description: Some("film".to_string()),
        a_to_b: 0.5,
        materials: vec![
            FormulaMaterial::new("HDPE", 70.0, 30.0),
            FormulaMaterial::new("Filler", 30.0, 70.0),
        ],
    };

    let created = create_formula(&store, &formula).await.unwrap();
    let id = created.id.unwrap();

    let mut changed = created.clone();
    changed.a_to_b = 0.25;
    let updated = update_formula(&store, id, &changed).await.unwrap();
    assert_eq!(updated.a_to_b, 0.25);
    assert_eq!(store.list_formulas().await.unwrap(), vec![updated]);

    delete_formula(&store, id).await.unwrap();
    assert!(store.list_formulas().await.unwrap().is_empty());
}

#[tokio::test]
async fn raw_material_catalogue() {
    let store = rest_store().await;
    let materials = store.list_raw_materials().await.unwrap();
    assert_eq!(materials.len(), 2);
    assert_eq!(materials[0].code.as_deref(), Some("HD-5502"));
    assert_eq!(materials[1].code, None);
}

#[tokio::test]
async fn server_error_is_transport_error() {
    async fn failing() -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "database offline" })),
        )
            .into_response()
    }
    let app = Router::new().route("/api/raw-materials", get(failing));
    let store = RestStore::new(spawn(app).await, Duration::from_secs(5)).unwrap();

    match store.list_raw_materials().await.unwrap_err() {
        CalcError::Transport { status, reason, .. } => {
            assert_eq!(status, Some(500));
            assert!(reason.contains("database offline"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn malformed_response_is_serialization_error() {
    async fn garbage() -> &'static str {
        "<html>not json</html>"
    }
    let app = Router::new().route("/api/aba-formulas", get(garbage));
    let store = RestStore::new(spawn(app).await, Duration::from_secs(5)).unwrap();

    let err = store.list_formulas().await.unwrap_err();
    assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
}

#[tokio::test]
async fn unreachable_service_is_recoverable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store = RestStore::new(format!("http://{}", addr), Duration::from_secs(2)).unwrap();
    let err = store.list_configs().await.unwrap_err();
    assert!(matches!(err, CalcError::Transport { status: None, .. }));
    assert!(err.is_recoverable());
}
