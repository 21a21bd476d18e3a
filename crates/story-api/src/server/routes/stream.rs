async fn stream_session(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, HttpApiError> {
    let initial_message = {
        let inner = state.inner.lock().await;
        let status = require_session(&inner, &session_id)?.status();
        StreamMessage::session_status(&status)
    };

    Ok(ws.on_upgrade(move |socket| stream_socket(socket, state, session_id, initial_message)))
}

async fn stream_socket(
    mut socket: WebSocket,
    state: AppState,
    session_id: String,
    initial_message: StreamMessage,
) {
    if send_stream_message(&mut socket, &initial_message)
        .await
        .is_err()
    {
        return;
    }

    let mut rx = state.stream_tx.subscribe();

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                        break;
                    }
                    _ => {}
                }
            }
            outgoing = rx.recv() => {
                match outgoing {
                    Ok(message) => {
                        if message.session_id != session_id {
                            continue;
                        }

                        if send_stream_message(&mut socket, &message).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        let warning = StreamMessage::warning(
                            &session_id,
                            0,
                            format!("stream client lagged and skipped {skipped} message(s)"),
                        );

                        if send_stream_message(&mut socket, &warning).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        }
    }
}

async fn send_stream_message(
    socket: &mut WebSocket,
    message: &StreamMessage,
) -> Result<(), axum::Error> {
    let payload = serde_json::to_string(message).map_err(axum::Error::new)?;
    socket.send(Message::Text(payload.into())).await
}

#[derive(Debug, Clone, Serialize)]
struct StreamMessage {
    schema_version: String,
    #[serde(rename = "type")]
    message_type: String,
    session_id: String,
    at_ms: u64,
    sequence: Option<u64>,
    reconnect_token: String,
    payload: Value,
}

impl StreamMessage {
    fn session_status(status: &SessionStatus) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            message_type: "session.status".to_string(),
            session_id: status.session_id.clone(),
            at_ms: status.now_ms,
            sequence: None,
            reconnect_token: reconnect_token(status.now_ms, None, "status"),
            payload: json!(status),
        }
    }

    fn event_appended(event: &StoryEvent) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            message_type: "event.appended".to_string(),
            session_id: event.session_id.clone(),
            at_ms: event.at_ms,
            sequence: Some(event.sequence),
            reconnect_token: reconnect_token(event.at_ms, Some(event.sequence), "event"),
            payload: json!(event),
        }
    }

    fn warning(session_id: &str, at_ms: u64, warning: String) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            message_type: "warning".to_string(),
            session_id: session_id.to_string(),
            at_ms,
            sequence: None,
            reconnect_token: reconnect_token(at_ms, None, "warning"),
            payload: json!({ "message": warning }),
        }
    }
}
