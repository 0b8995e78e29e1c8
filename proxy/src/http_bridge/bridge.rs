use crate::http_bridge::model::{AudioQuery, ErrorBody, InfoQuery, StreamQuery, WaterfallEvent};
use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use serde::Serialize;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use warp::http::StatusCode;
use warp::ws::{Message, WebSocket, Ws};
use warp::{Filter, Rejection, Reply};
use wfcore::prelude::{FetchError, ServiceError, ServiceResult, WaterfallLine};
use wfcore::service::window;
use wfcore::session::SessionHandle;
use wfcore::WaterfallService;

/// Hosts the stream, info, status and audio endpoints over one service.
pub struct HttpBridge {
    service: Arc<WaterfallService>,
}

impl HttpBridge {
    pub fn new(service: Arc<WaterfallService>) -> Self {
        Self { service }
    }

    pub fn routes(
        &self,
    ) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone + Send + Sync + 'static
    {
        let service = with_service(self.service.clone());

        let stream_route = warp::path!("stations" / String / "waterfall")
            .and(warp::get())
            .and(warp::query::<StreamQuery>())
            .and(warp::ws())
            .and(service.clone())
            .and_then(open_stream);

        let info_route = warp::path!("stations" / String / "waterfall" / "info")
            .and(warp::get())
            .and(warp::query::<InfoQuery>())
            .and(service.clone())
            .and_then(
                |station_id: String, query: InfoQuery, service: Arc<WaterfallService>| async move {
                    let (min_hz, max_hz) = query.bounds();
                    let result = match window(min_hz, max_hz) {
                        Ok(window) => service.stream_info(&station_id, window).await,
                        Err(err) => Err(err),
                    };
                    Ok::<_, Rejection>(json_reply(result))
                },
            );

        let bands_route = warp::path!("stations" / String / "bands")
            .and(warp::get())
            .and(service.clone())
            .and_then(|station_id: String, service: Arc<WaterfallService>| async move {
                let result = service
                    .bands(&station_id)
                    .await
                    .map(|header| header.as_ref().clone());
                Ok::<_, Rejection>(json_reply(result))
            });

        let status_route = warp::path!("stations" / String / "status")
            .and(warp::get())
            .and(service.clone())
            .and_then(|station_id: String, service: Arc<WaterfallService>| async move {
                Ok::<_, Rejection>(json_reply(service.status(&station_id).await))
            });

        let audio_route = warp::path!("stations" / String / "audio")
            .and(warp::get())
            .and(warp::query::<AudioQuery>())
            .and(service.clone())
            .and_then(
                |station_id: String, query: AudioQuery, service: Arc<WaterfallService>| async move {
                    let result = service
                        .audio_info(&station_id, query.freq, &query.mode)
                        .await;
                    Ok::<_, Rejection>(json_reply(result))
                },
            );

        let metrics_route = warp::path!("metrics")
            .and(warp::get())
            .and(service)
            .map(|service: Arc<WaterfallService>| {
                warp::reply::json(&service.metrics().snapshot())
            });

        stream_route
            .or(info_route)
            .or(bands_route)
            .or(status_route)
            .or(audio_route)
            .or(metrics_route)
    }

    /// Binds the listener; the returned future serves until dropped.
    pub fn bind(
        &self,
        addr: SocketAddr,
    ) -> anyhow::Result<(SocketAddr, impl Future<Output = ()> + 'static)> {
        warp::serve(self.routes())
            .try_bind_ephemeral(addr)
            .with_context(|| format!("binding HTTP bridge to {}", addr))
    }
}

fn with_service(
    service: Arc<WaterfallService>,
) -> impl Filter<Extract = (Arc<WaterfallService>,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

async fn open_stream(
    station_id: String,
    query: StreamQuery,
    ws: Ws,
    service: Arc<WaterfallService>,
) -> Result<Box<dyn Reply>, Rejection> {
    let opened = service
        .open_session(&station_id, query.min, query.max, query.real)
        .await;
    match opened {
        Ok((handle, lines)) => {
            info!(
                "observer attached to {} ({:.0}-{:.0} Hz, real: {})",
                station_id, query.min, query.max, query.real
            );
            Ok(Box::new(ws.on_upgrade(move |socket| {
                pump_lines(socket, handle, lines, station_id)
            })))
        }
        Err(err) => Ok(Box::new(error_reply(&err))),
    }
}

/// Forwards session lines to the socket until either side goes away. A slow
/// socket stalls only this loop; the session drops ticks meanwhile.
async fn pump_lines(
    socket: WebSocket,
    handle: SessionHandle,
    mut lines: mpsc::Receiver<WaterfallLine>,
    station_id: String,
) {
    let (mut outgoing, mut incoming) = socket.split();

    loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else { break };
                let frame = match serde_json::to_string(&WaterfallEvent::waterfall(&line)) {
                    Ok(frame) => frame,
                    Err(err) => {
                        warn!("dropping unserializable line for {}: {}", station_id, err);
                        continue;
                    }
                };
                if outgoing.send(Message::text(frame)).await.is_err() {
                    break;
                }
            }
            message = incoming.next() => match message {
                Some(Ok(message)) if !message.is_close() => {}
                _ => break,
            }
        }
    }

    handle.close();
    handle.join().await;
    info!("observer detached from {}", station_id);
}

fn json_reply<T: Serialize>(result: ServiceResult<T>) -> Box<dyn Reply> {
    match result {
        Ok(value) => Box::new(warp::reply::json(&value)),
        Err(err) => Box::new(error_reply(&err)),
    }
}

fn error_reply(err: &ServiceError) -> warp::reply::WithStatus<warp::reply::Json> {
    let status = match err {
        ServiceError::StationNotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::InvalidWindow { .. } => StatusCode::BAD_REQUEST,
        ServiceError::Fetch(FetchError::AdapterNotFound(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::Fetch(_) => StatusCode::BAD_GATEWAY,
    };
    let body = ErrorBody {
        error: err.to_string(),
    };
    warp::reply::with_status(warp::reply::json(&body), status)
}
