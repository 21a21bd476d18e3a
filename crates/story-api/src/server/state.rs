#[derive(Clone)]
struct AppState {
    inner: Arc<Mutex<ServerInner>>,
    stream_tx: broadcast::Sender<StreamMessage>,
}

impl AppState {
    fn new() -> Self {
        let (stream_tx, _) = broadcast::channel(4_096);
        Self {
            inner: Arc::new(Mutex::new(ServerInner::default())),
            stream_tx,
        }
    }
}

#[derive(Debug, Default)]
struct ServerInner {
    session: Option<SessionApi>,
    /// Wall-clock anchor for realtime sessions; `None` means the session is
    /// advanced manually through the advance route.
    origin: Option<Instant>,
    emitted_event_count: usize,
}

fn require_session<'a>(
    inner: &'a ServerInner,
    session_id: &str,
) -> Result<&'a SessionApi, HttpApiError> {
    let Some(session) = inner.session.as_ref() else {
        return Err(HttpApiError::session_not_found(session_id, None));
    };

    if session.session_id() != session_id {
        return Err(HttpApiError::session_not_found(
            session_id,
            Some(session.session_id()),
        ));
    }

    Ok(session)
}

fn require_session_mut<'a>(
    inner: &'a mut ServerInner,
    session_id: &str,
) -> Result<&'a mut SessionApi, HttpApiError> {
    let active_session_id = inner
        .session
        .as_ref()
        .map(|session| session.session_id().to_string());
    let Some(session) = inner.session.as_mut() else {
        return Err(HttpApiError::session_not_found(session_id, None));
    };

    if session.session_id() != session_id {
        return Err(HttpApiError::session_not_found(
            session_id,
            active_session_id.as_deref(),
        ));
    }

    Ok(session)
}

fn collect_delta_messages(inner: &mut ServerInner) -> Vec<StreamMessage> {
    let mut messages = Vec::new();

    let Some(session) = inner.session.as_ref() else {
        return messages;
    };

    let new_events = &session.events()[inner.emitted_event_count..];
    for event in new_events {
        messages.push(StreamMessage::event_appended(event));
    }
    inner.emitted_event_count = session.events().len();

    messages
}

fn broadcast_messages(state: &AppState, messages: Vec<StreamMessage>) {
    for message in messages {
        let _ = state.stream_tx.send(message);
    }
}
