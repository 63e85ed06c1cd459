use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, warn};

use crate::auth::AdminGate;
use crate::engine::{free_slots, Engine, EngineError};
use crate::limits::MAX_LINE_LEN;
use crate::model::*;
use crate::observability;
use crate::protocol::{self, Reply, Request};

/// Per-connection state.
#[derive(Debug, Default)]
pub struct Session {
    pub privileged: bool,
}

/// Serve one client until it disconnects. Every input line gets exactly one
/// reply line; malformed or over-long lines are answered and skipped.
pub async fn process_connection(
    socket: TcpStream,
    engine: Arc<Engine>,
    gate: Arc<AdminGate>,
) -> Result<(), LinesCodecError> {
    let mut framed = Framed::new(socket, LinesCodec::new_with_max_length(MAX_LINE_LEN));
    let mut session = Session::default();

    while let Some(frame) = framed.next().await {
        let line = match frame {
            Ok(line) => line,
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                let reply = Reply::err("limit_exceeded", "request line too long");
                framed.send(reply.to_line()).await?;
                continue;
            }
            Err(e) => return Err(e),
        };
        if line.trim().is_empty() {
            continue;
        }
        let reply = handle_line(&engine, &gate, &mut session, &line).await;
        framed.send(reply.to_line()).await?;
    }
    Ok(())
}

/// Parse, authorize and execute one request line.
pub async fn handle_line(
    engine: &Engine,
    gate: &AdminGate,
    session: &mut Session,
    line: &str,
) -> Reply {
    let request = match protocol::parse_request(line) {
        Ok(req) => req,
        Err(e) => {
            metrics::counter!(observability::REQUESTS_TOTAL, "op" => "unknown", "status" => "error")
                .increment(1);
            return Reply::err("bad_request", e.to_string());
        }
    };

    let op = observability::op_label(&request);
    let started = Instant::now();
    let reply = if request.is_privileged() && !session.privileged {
        Reply::err("unauthorized", format!("{op} requires an authenticated admin session"))
    } else {
        execute(engine, gate, session, request).await
    };

    let status = if reply.ok { "ok" } else { "error" };
    metrics::counter!(observability::REQUESTS_TOTAL, "op" => op, "status" => status).increment(1);
    metrics::histogram!(observability::REQUEST_DURATION_SECONDS, "op" => op)
        .record(started.elapsed().as_secs_f64());
    reply
}

async fn execute(
    engine: &Engine,
    gate: &AdminGate,
    session: &mut Session,
    request: Request,
) -> Reply {
    let result = match request {
        Request::CheckConflicts {
            date,
            slots,
            granularity,
            exclude_id,
        } => {
            let slots = protocol::slot_set(slots);
            to_value(&engine.check_conflicts(date, &slots, granularity, exclude_id).await)
        }
        Request::Availability { date } => {
            let view = engine.get_availability(date).await;
            let free = free_slots(&view);
            to_value(&AvailabilityReply { view, free })
        }
        Request::Submit {
            date,
            slots,
            granularity,
            requester,
        } => {
            let candidate = Candidate {
                date,
                granularity,
                slots: protocol::slot_set(slots),
                requester,
            };
            engine.submit(candidate).await.map_err(engine_err).and_then(|r| to_value(&r))
        }
        Request::Amend {
            id,
            slots,
            granularity,
        } => engine
            .amend(id, protocol::slot_set(slots), granularity)
            .await
            .map_err(engine_err)
            .and_then(|r| to_value(&r)),
        Request::Authenticate { token } => {
            if gate.verify(&token) {
                session.privileged = true;
                Ok(serde_json::json!({ "privileged": true }))
            } else {
                session.privileged = false;
                metrics::counter!(observability::AUTH_FAILURES_TOTAL).increment(1);
                warn!("rejected admin token");
                Err(Reply::err("unauthorized", "invalid admin token"))
            }
        }
        Request::Get { id } => match engine.get_by_id(&id).await {
            Some(r) => to_value(&r),
            None => Err(engine_err(EngineError::NotFound(id))),
        },
        Request::List { date, status } => {
            let status = match status.as_deref().map(Status::from_str).transpose() {
                Ok(s) => s,
                Err(e) => return engine_err(e),
            };
            engine
                .list_reservations(date, status)
                .await
                .map_err(engine_err)
                .and_then(|rows| to_value(&rows))
        }
        Request::Transition { id, status, note } => {
            match Status::from_str(&status) {
                Ok(target) => engine
                    .transition(id, target, note)
                    .await
                    .map_err(engine_err)
                    .and_then(|r| to_value(&r)),
                Err(e) => Err(engine_err(e)),
            }
        }
        Request::Reopen { id, note } => engine
            .reopen(id, note)
            .await
            .map_err(engine_err)
            .and_then(|r| to_value(&r)),
    };

    match result {
        Ok(value) => Reply::ok(value),
        Err(reply) => reply,
    }
}

#[derive(Serialize)]
struct AvailabilityReply {
    #[serde(flatten)]
    view: AvailabilityView,
    free: Vec<Slot>,
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, Reply> {
    serde_json::to_value(value).map_err(|e| Reply::err("internal", format!("encode: {e}")))
}

fn engine_err(e: EngineError) -> Reply {
    debug!("request failed: {e}");
    let reply = Reply::err(e.code(), e.to_string());
    match e {
        EngineError::Conflict { slots } => Reply {
            result: Some(serde_json::json!({ "conflicting_slots": slots })),
            ..reply
        },
        _ => reply,
    }
}
