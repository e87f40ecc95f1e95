//! HTTP server for browsing a snapshot
//!
//! Thin axum layer over the query pages: one route per page, the snapshot
//! shared read-only behind an `Arc`. Pages render to full HTML strings so
//! handlers reduce to routing and error mapping.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::errors::{ErrorKind, LobsterError, Result};
use crate::query::{self, HistoSort};
use crate::snapshot::Snapshot;

type SharedSnapshot = Arc<Snapshot>;

/// Build the query router over a resolved snapshot
pub fn router(snapshot: SharedSnapshot) -> Router {
    Router::new()
        .route("/", get(summary))
        .route("/allClasses", get(all_classes))
        .route("/allClassesWithPlatform", get(all_classes_with_platform))
        .route("/class/:id", get(class_page))
        .route("/object/:id", get(object_page))
        .route("/instances/:id", get(instances))
        .route("/allInstances/:id", get(all_instances))
        .route("/histo", get(histo_default))
        .route("/histo/:sort", get(histo))
        .route("/roots/:id", get(roots))
        .route("/allRoots/:id", get(all_roots))
        .route("/refsByType/:id", get(refs_by_type))
        .route("/reachableFrom/:id", get(reachable_from))
        .route("/finalizers", get(finalizers))
        .layer(TraceLayer::new_for_http())
        .with_state(snapshot)
}

/// Serve the query pages until the process is stopped
pub async fn serve(snapshot: SharedSnapshot, addr: SocketAddr) -> Result<()> {
    let app = router(snapshot);
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        LobsterError::config(format!("cannot bind {}: {}", addr, e)).with_source(e)
    })?;
    info!(%addr, "serving snapshot, point a browser at http://{}/", addr);
    axum::serve(listener, app)
        .await
        .map_err(|e| LobsterError::internal(format!("server failed: {}", e)))
}

/// Page result -> HTML response, query errors -> status codes
struct Html(Result<String>);

impl IntoResponse for Html {
    fn into_response(self) -> Response {
        match self.0 {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                let status = match e.kind {
                    ErrorKind::NotFound => StatusCode::NOT_FOUND,
                    ErrorKind::Query => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string()).into_response()
            }
        }
    }
}

#[derive(Deserialize, Default)]
struct InstanceParams {
    /// Only objects new relative to the baseline dump
    #[serde(default)]
    new: bool,
}

async fn summary(State(snapshot): State<SharedSnapshot>) -> Html {
    Html(query::summary::render(&snapshot))
}

async fn all_classes(State(snapshot): State<SharedSnapshot>) -> Html {
    Html(query::all_classes::render(&snapshot, false))
}

async fn all_classes_with_platform(State(snapshot): State<SharedSnapshot>) -> Html {
    Html(query::all_classes::render(&snapshot, true))
}

async fn class_page(State(snapshot): State<SharedSnapshot>, Path(id): Path<String>) -> Html {
    Html(query::class::render(&snapshot, &id))
}

async fn object_page(State(snapshot): State<SharedSnapshot>, Path(id): Path<String>) -> Html {
    Html(query::object::render(&snapshot, &id))
}

async fn instances(
    State(snapshot): State<SharedSnapshot>,
    Path(id): Path<String>,
    Query(params): Query<InstanceParams>,
) -> Html {
    Html(query::instances::render(&snapshot, &id, false, params.new))
}

async fn all_instances(
    State(snapshot): State<SharedSnapshot>,
    Path(id): Path<String>,
    Query(params): Query<InstanceParams>,
) -> Html {
    Html(query::instances::render(&snapshot, &id, true, params.new))
}

async fn histo_default(State(snapshot): State<SharedSnapshot>) -> Html {
    Html(query::histogram::render(&snapshot, HistoSort::Size))
}

async fn histo(State(snapshot): State<SharedSnapshot>, Path(sort): Path<String>) -> Html {
    Html(
        HistoSort::from_param(&sort)
            .and_then(|sort| query::histogram::render(&snapshot, sort)),
    )
}

async fn roots(State(snapshot): State<SharedSnapshot>, Path(id): Path<String>) -> Html {
    Html(query::roots::render(&snapshot, &id, false))
}

async fn all_roots(State(snapshot): State<SharedSnapshot>, Path(id): Path<String>) -> Html {
    Html(query::roots::render(&snapshot, &id, true))
}

async fn refs_by_type(State(snapshot): State<SharedSnapshot>, Path(id): Path<String>) -> Html {
    Html(query::refs_by_type::render(&snapshot, &id))
}

async fn reachable_from(State(snapshot): State<SharedSnapshot>, Path(id): Path<String>) -> Html {
    Html(query::reachable::render(&snapshot, &id))
}

async fn finalizers(State(snapshot): State<SharedSnapshot>) -> Html {
    Html(query::finalizers::render(&snapshot))
}
