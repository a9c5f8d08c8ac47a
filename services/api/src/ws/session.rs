//! Manages the WebSocket connection lifecycle for a learner session.

use super::{
    advisor::{AdvisorQueue, AdvisorReply},
    driver::{AskOutcome, DriverError, SessionDriver},
    protocol::{ClientMessage, ServerMessage},
};
use crate::state::AppState;
use anyhow::{Result, anyhow};
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::sync::Arc;
use t2dm_sim_core::{
    EDUCATIONAL_NOTICE, GatewayError, breather::BreatherTimer, session::ChoiceOutcome,
};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Main handler for an individual WebSocket connection.
///
/// The first message from the client must be `init`. Once the session is
/// open, the event loop runs until the client goes away.
#[instrument(name = "ws_session", skip_all, fields(session_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4();
    tracing::Span::current().record("session_id", tracing::field::display(session_id));
    info!("New WebSocket connection. Awaiting initialization...");

    let (mut socket_tx, mut socket_rx) = socket.split();

    let driver = match socket_rx.next().await {
        Some(Ok(Message::Text(text))) => initialize_session(&text, &state),
        Some(Ok(_)) => Err(anyhow!("First message was not a text `init` message.")),
        Some(Err(e)) => {
            warn!(error = ?e, "Error receiving init message.");
            return;
        }
        None => {
            info!("Client disconnected before sending init message.");
            return;
        }
    };

    let driver = match driver {
        Ok(driver) => driver,
        Err(e) => {
            error!("Session initialization failed: {:?}", e);
            let _ = send_msg(
                &mut socket_tx,
                ServerMessage::Error {
                    message: e.to_string(),
                },
            )
            .await;
            return;
        }
    };

    let initialized = match initialized_message(session_id, &driver) {
        Ok(msg) => msg,
        Err(e) => {
            error!(error = ?e, "Failed to build Initialized message.");
            return;
        }
    };
    if send_msg(&mut socket_tx, initialized).await.is_err() {
        error!("Failed to send Initialized message to client.");
        return;
    }

    if let Err(e) = run_session(&state, driver, socket_tx, socket_rx).await {
        error!(error = ?e, "Learner session terminated with error.");
    }
    info!("Learner session finished.");
}

/// Parses the `init` message and opens the requested case.
fn initialize_session(init_text: &str, state: &AppState) -> Result<SessionDriver> {
    let ClientMessage::Init { case_id } = serde_json::from_str::<ClientMessage>(init_text)? else {
        return Err(anyhow!("First message must be `init`"));
    };
    let driver = SessionDriver::new(state.store.clone(), case_id.as_deref())?;
    info!(case_id = %driver.case()?.id, "Session opened");
    Ok(driver)
}

fn initialized_message(
    session_id: Uuid,
    driver: &SessionDriver,
) -> Result<ServerMessage, DriverError> {
    let case = driver.case()?;
    Ok(ServerMessage::Initialized {
        session_id,
        case: case.clone(),
        drugs: driver.store().drugs().to_vec(),
        session: driver.session().snapshot(driver.store(), case)?,
        transcript: driver.transcript().entries().to_vec(),
        notice: EDUCATIONAL_NOTICE.to_string(),
    })
}

/// The main event loop for an open session.
///
/// Multiplexes client messages, breather ticks and finished remote advisor
/// replies. Nothing in here waits on a model call.
async fn run_session(
    state: &AppState,
    mut driver: SessionDriver,
    mut socket_tx: SplitSink<WebSocket, Message>,
    mut socket_rx: SplitStream<WebSocket>,
) -> Result<()> {
    let mut timer = BreatherTimer::default();
    let (queue, mut replies) =
        AdvisorQueue::spawn(state.remote_advisor.clone(), driver.session().generation());

    loop {
        tokio::select! {
            msg_result = socket_rx.next() => {
                let Some(msg_result) = msg_result else {
                    info!("Client stream ended.");
                    break;
                };
                match msg_result {
                    Ok(Message::Text(text)) => {
                        let outgoing = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(msg) => apply(&mut driver, &mut timer, &queue, msg),
                            Err(e) => {
                                warn!(error = %e, "Ignoring malformed client message.");
                                vec![ServerMessage::Error { message: format!("Invalid message: {e}") }]
                            }
                        };
                        for msg in outgoing {
                            send_msg(&mut socket_tx, msg).await?;
                        }
                    }
                    Ok(Message::Binary(_)) => warn!("Ignoring binary message."),
                    Ok(Message::Close(_)) => {
                        info!("Client sent close frame. Shutting down session.");
                        break;
                    }
                    Ok(Message::Ping(_) | Message::Pong(_)) => {}
                    Err(e) => {
                        error!("Error receiving from client WebSocket: {:?}", e);
                        break;
                    }
                }
            },
            Some(()) = timer.next_tick() => {
                if let Some(msg) = on_tick(&mut driver, &mut timer) {
                    send_msg(&mut socket_tx, msg).await?;
                }
            },
            Some(reply) = replies.recv() => {
                if let Some(entry) = driver.accept_reply(reply) {
                    send_msg(&mut socket_tx, ServerMessage::TranscriptAppend { entry }).await?;
                }
            },
        }
    }

    timer.cancel();
    info!("WebSocket connection closed.");
    Ok(())
}

/// Applies one client message and returns what to send back, in order.
fn apply(
    driver: &mut SessionDriver,
    timer: &mut BreatherTimer,
    queue: &AdvisorQueue,
    msg: ClientMessage,
) -> Vec<ServerMessage> {
    match msg {
        ClientMessage::Init { .. } => vec![ServerMessage::Error {
            message: "Session is already initialized.".to_string(),
        }],
        ClientMessage::SetMode { mode } => {
            driver.set_mode(mode);
            timer.cancel();
            queue.set_generation(driver.session().generation());
            vec![session_update(driver)]
        }
        ClientMessage::Choose { drug_id } => match driver.choose(&drug_id) {
            Ok(ChoiceOutcome::BreatherStarted) => {
                timer.start();
                vec![session_update(driver)]
            }
            Ok(ChoiceOutcome::Recorded) => vec![session_update(driver)],
            Err(e) => vec![error_message(&e)],
        },
        ClientMessage::ResetAttempt => match driver.reset_attempt() {
            Ok(()) => {
                timer.cancel();
                queue.set_generation(driver.session().generation());
                vec![session_update(driver)]
            }
            Err(e) => vec![error_message(&e)],
        },
        ClientMessage::Ask { question, remote } => match driver.ask(&question, remote) {
            Ok(AskOutcome::Answered { question, answer }) => vec![
                ServerMessage::TranscriptAppend { entry: question },
                ServerMessage::TranscriptAppend { entry: answer },
            ],
            Ok(AskOutcome::Deferred { question, job }) => {
                let mut outgoing = vec![ServerMessage::TranscriptAppend { entry: question }];
                let generation = job.generation;
                if queue.submit(job).is_err() {
                    warn!("Advisor worker is gone; answering with a failure.");
                    let reply = AdvisorReply {
                        generation,
                        result: Err(GatewayError::ModelUnavailable {
                            failures: Vec::new(),
                        }),
                    };
                    if let Some(entry) = driver.accept_reply(reply) {
                        outgoing.push(ServerMessage::TranscriptAppend { entry });
                    }
                } else {
                    debug!(generation, "Remote advisor job queued");
                }
                outgoing
            }
            Err(e) => vec![error_message(&e)],
        },
    }
}

/// Advances the breather by one second. Stops the timer once it runs out or
/// if the attempt it belonged to is gone.
fn on_tick(driver: &mut SessionDriver, timer: &mut BreatherTimer) -> Option<ServerMessage> {
    if !driver.is_breather_active() {
        timer.cancel();
        return None;
    }
    if driver.tick() == 0 {
        debug!("Breather finished");
        timer.cancel();
    }
    Some(session_update(driver))
}

fn session_update(driver: &SessionDriver) -> ServerMessage {
    driver
        .session_update()
        .unwrap_or_else(|e| error_message(&e))
}

fn error_message(err: &DriverError) -> ServerMessage {
    let message = match err {
        DriverError::Gateway(e) => e.user_message(),
        other => other.to_string(),
    };
    ServerMessage::Error { message }
}

/// A helper function to serialize and send a `ServerMessage` to the client.
pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}
