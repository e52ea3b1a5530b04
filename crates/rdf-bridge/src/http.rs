use crate::core::{BridgeEvent, Shared};
use crate::host::{ChannelInfo, ControllerUpdate, TargetUpdate};
use crate::notices::Notice;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use rdf_proto::dispatch::ConnectionState;
use rdf_proto::frequency::Frequency;
use rdf_proto::settings::{DrawSettings, GLOBAL_SURFACE};
use rdf_proto::tracker::TransmissionMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

#[derive(Clone)]
struct HttpState {
    shared: Arc<Shared>,
    event_tx: mpsc::Sender<BridgeEvent>,
}

#[derive(Debug, Default, Deserialize)]
struct TransmissionsQuery {
    #[serde(default)]
    freeze: bool,
    /// Surface being drawn; becomes the active surface.
    surface: Option<i32>,
}

#[derive(Debug, Serialize)]
struct TransmissionsResponse {
    /// `r:g:b` to draw with: the concurrent colour when more than one
    /// transmitter is shown.
    color: String,
    transmissions: TransmissionMap,
}

/// Tag item for one callsign: `!` while it is in the last transmitter set.
#[derive(Debug, Serialize)]
struct TagState {
    callsign: String,
    recent: bool,
    tag: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct SurfaceQuery {
    surface: Option<i32>,
}

#[derive(Debug, Serialize)]
struct CommandResult {
    handled: bool,
}

#[derive(Debug, Deserialize)]
struct ToggleRequest {
    name: String,
    /// MHz
    frequency: f64,
    rx: Option<bool>,
    tx: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ChannelsResponse {
    connection: ConnectionState,
    mode: i32,
    channels: Vec<ChannelInfo>,
}

pub fn router(shared: Arc<Shared>, event_tx: mpsc::Sender<BridgeEvent>) -> Router {
    let app_state = HttpState { shared, event_tx };
    Router::new()
        .route("/api/transmissions", get(get_transmissions))
        .route("/api/transmissions/:callsign/state", get(get_tag_state))
        .route("/api/channels", get(get_channels).put(put_channels))
        .route("/api/channels/toggle", post(toggle_channel))
        .route("/api/settings/:surface", get(get_settings))
        .route("/api/command", post(run_command))
        .route("/api/targets/:callsign", put(put_target).delete(delete_target))
        .route("/api/controllers/:callsign", put(put_controller).delete(delete_controller))
        .route("/api/notices", get(get_notices))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

pub fn start_server(
    bind_address: String,
    port: u16,
    shared: Arc<Shared>,
    event_tx: mpsc::Sender<BridgeEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let app = router(shared, event_tx);

        let addr = format!("{}:{}", bind_address, port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}", addr, e);
                return;
            }
        };

        info!("HTTP API server listening on http://{}", addr);

        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    })
}

async fn get_transmissions(
    State(state): State<HttpState>,
    Query(query): Query<TransmissionsQuery>,
) -> Json<TransmissionsResponse> {
    if let Some(surface) = query.surface {
        state.shared.settings.set_active(surface);
    }
    let transmissions = state.shared.tracker().query(query.freeze);
    let settings = state.shared.settings.active_settings();
    let color = if transmissions.len() > 1 {
        settings.rdf_concurrent_color
    } else {
        settings.rdf_color
    };
    Json(TransmissionsResponse {
        color: color.to_string(),
        transmissions,
    })
}

async fn get_tag_state(State(state): State<HttpState>, Path(callsign): Path<String>) -> Json<TagState> {
    let recent = state.shared.tracker().is_recent(&callsign);
    Json(TagState {
        callsign,
        recent,
        tag: if recent { "!" } else { "" },
    })
}

async fn get_channels(State(state): State<HttpState>) -> Json<ChannelsResponse> {
    Json(ChannelsResponse {
        connection: state.shared.dispatcher.connection_state(),
        mode: state.shared.dispatcher.mode(),
        channels: state.shared.host.channel_list(),
    })
}

async fn put_channels(State(state): State<HttpState>, Json(channels): Json<Vec<ChannelInfo>>) -> StatusCode {
    info!("HTTP API: replace {} channels", channels.len());
    state.shared.host.replace_channels(channels);
    StatusCode::OK
}

async fn toggle_channel(
    State(state): State<HttpState>,
    Json(req): Json<ToggleRequest>,
) -> Result<Json<ChannelInfo>, StatusCode> {
    info!("HTTP API: toggle {} {:.3} rx={:?} tx={:?}", req.name, req.frequency, req.rx, req.tx);
    state
        .shared
        .host
        .set_channel(&req.name, Frequency::from_mhz(req.frequency), req.rx, req.tx)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn get_settings(State(state): State<HttpState>, Path(surface): Path<i32>) -> Json<DrawSettings> {
    Json(state.shared.settings.get(surface))
}

async fn run_command(
    State(state): State<HttpState>,
    Query(query): Query<SurfaceQuery>,
    body: String,
) -> Result<Json<CommandResult>, StatusCode> {
    let line = body.trim().to_string();
    info!("HTTP API: command {:?}", line);
    let (reply, answer) = oneshot::channel();
    let evt = BridgeEvent::Command {
        line,
        surface: query.surface.unwrap_or(GLOBAL_SURFACE),
        reply,
    };
    if state.event_tx.send(evt).await.is_err() {
        error!("Failed to send command");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    match answer.await {
        Ok(handled) => Ok(Json(CommandResult { handled })),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

async fn put_target(
    State(state): State<HttpState>,
    Path(callsign): Path<String>,
    Json(update): Json<TargetUpdate>,
) -> StatusCode {
    state.shared.host.put_target(&callsign, update);
    StatusCode::OK
}

async fn delete_target(State(state): State<HttpState>, Path(callsign): Path<String>) -> StatusCode {
    if state.shared.host.remove_target(&callsign) {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn put_controller(
    State(state): State<HttpState>,
    Path(callsign): Path<String>,
    Json(update): Json<ControllerUpdate>,
) -> StatusCode {
    state.shared.host.put_controller(&callsign, update);
    StatusCode::OK
}

async fn delete_controller(State(state): State<HttpState>, Path(callsign): Path<String>) -> StatusCode {
    if state.shared.host.remove_controller(&callsign) {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn get_notices(State(state): State<HttpState>) -> Json<Vec<Notice>> {
    Json(state.shared.notices.snapshot())
}
