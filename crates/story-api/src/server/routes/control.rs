#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CreateSessionRequest {
    Config(SessionConfig),
    WithOptions(CreateSessionOptions),
}

#[derive(Debug, Deserialize)]
struct CreateSessionOptions {
    #[serde(default)]
    config: Option<SessionConfig>,
    player_name: Option<String>,
    realtime: Option<bool>,
    prefs_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateSessionResponse {
    schema_version: String,
    session_id: String,
    player_name: String,
    status: SessionStatus,
    replaced_existing_session: bool,
    realtime: bool,
}

async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, HttpApiError> {
    let (config, realtime, prefs_path) = match request {
        CreateSessionRequest::Config(config) => (config, true, default_prefs_path()),
        CreateSessionRequest::WithOptions(options) => {
            let mut config = options.config.unwrap_or_default();
            if let Some(player_name) = options.player_name {
                config.player_name = player_name;
            }
            (
                config,
                options.realtime.unwrap_or(true),
                options
                    .prefs_path
                    .filter(|path| !path.trim().is_empty())
                    .unwrap_or_else(default_prefs_path),
            )
        }
    };

    let session =
        SessionApi::from_config_with_prefs(config, prefs_path).map_err(HttpApiError::from_init)?;

    let (response, messages) = {
        let mut inner = state.inner.lock().await;
        let replaced_existing_session = inner.session.is_some();

        let status = session.status();
        let player_name = session.player_name().to_string();
        inner.session = Some(session);
        inner.origin = realtime.then(Instant::now);
        inner.emitted_event_count = 0;

        let mut messages = Vec::new();
        if replaced_existing_session {
            messages.push(StreamMessage::warning(
                &status.session_id,
                status.now_ms,
                "existing session state was replaced by POST /sessions".to_string(),
            ));
        }
        messages.push(StreamMessage::session_status(&status));

        (
            CreateSessionResponse {
                schema_version: SCHEMA_VERSION_V1.to_string(),
                session_id: status.session_id.clone(),
                player_name,
                status,
                replaced_existing_session,
                realtime,
            },
            messages,
        )
    };
    broadcast_messages(&state, messages);

    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct ReplyRequest {
    email_id: String,
    #[serde(default)]
    body: String,
}

#[derive(Debug, Deserialize)]
struct ChoiceRequest {
    email_id: String,
    option_index: usize,
}

#[derive(Debug, Deserialize)]
struct ComposeRequest {
    to: String,
    subject: String,
    #[serde(default)]
    body: String,
}

#[derive(Debug, Deserialize)]
struct SetFolderRequest {
    folder: String,
}

#[derive(Debug, Deserialize)]
struct AdvanceRequest {
    #[serde(default)]
    to_ms: Option<u64>,
    #[serde(default)]
    by_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
struct AdvanceResponse {
    schema_version: String,
    fired: usize,
    status: SessionStatus,
}

async fn submit_reply(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<ReplyRequest>,
) -> Result<Json<ActionResult>, HttpApiError> {
    let (result, messages) = {
        let mut inner = state.inner.lock().await;
        let session = require_session_mut(&mut inner, &session_id)?;
        let result = session.submit_interactive_reply(&request.email_id, &request.body);
        (result, collect_delta_messages(&mut inner))
    };
    broadcast_messages(&state, messages);
    Ok(Json(result))
}

async fn submit_choice(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<ChoiceRequest>,
) -> Result<Json<ActionResult>, HttpApiError> {
    let (result, messages) = {
        let mut inner = state.inner.lock().await;
        let session = require_session_mut(&mut inner, &session_id)?;
        let result = session.submit_choice_reply(&request.email_id, request.option_index);
        (result, collect_delta_messages(&mut inner))
    };
    broadcast_messages(&state, messages);
    Ok(Json(result))
}

async fn submit_compose(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<ComposeRequest>,
) -> Result<Json<ActionResult>, HttpApiError> {
    let (result, messages) = {
        let mut inner = state.inner.lock().await;
        let session = require_session_mut(&mut inner, &session_id)?;
        let result = session.submit_compose(&request.to, &request.subject, &request.body);
        (result, collect_delta_messages(&mut inner))
    };
    broadcast_messages(&state, messages);
    Ok(Json(result))
}

async fn submit_install(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ActionResult>, HttpApiError> {
    let (result, messages) = {
        let mut inner = state.inner.lock().await;
        let session = require_session_mut(&mut inner, &session_id)?;
        let result = session.submit_install();
        (result, collect_delta_messages(&mut inner))
    };
    broadcast_messages(&state, messages);
    Ok(Json(result))
}

async fn reveal_clue(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ActionResult>, HttpApiError> {
    let (result, messages) = {
        let mut inner = state.inner.lock().await;
        let session = require_session_mut(&mut inner, &session_id)?;
        let result = session.record_clue_revealed();
        (result, collect_delta_messages(&mut inner))
    };
    broadcast_messages(&state, messages);
    Ok(Json(result))
}

async fn open_email(
    Path((session_id, email_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<SessionStatus>, HttpApiError> {
    let mut inner = state.inner.lock().await;
    let session = require_session_mut(&mut inner, &session_id)?;
    session.open_email(&email_id);
    Ok(Json(session.status()))
}

async fn delete_email(
    Path((session_id, email_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<SessionStatus>, HttpApiError> {
    let mut inner = state.inner.lock().await;
    let session = require_session_mut(&mut inner, &session_id)?;
    session.delete_email(&email_id);
    Ok(Json(session.status()))
}

async fn set_folder(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<SetFolderRequest>,
) -> Result<Json<SessionStatus>, HttpApiError> {
    let folder = Folder::parse(&request.folder).ok_or_else(|| {
        HttpApiError::invalid_query(
            "unknown folder",
            Some(format!("folder={}", request.folder)),
        )
    })?;

    let mut inner = state.inner.lock().await;
    let session = require_session_mut(&mut inner, &session_id)?;
    session.set_current_folder(folder);
    Ok(Json(session.status()))
}

async fn advance_session(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<AdvanceRequest>,
) -> Result<Json<AdvanceResponse>, HttpApiError> {
    let (response, messages) = {
        let mut inner = state.inner.lock().await;
        let session = require_session_mut(&mut inner, &session_id)?;

        let fired = match (request.to_ms, request.by_ms) {
            (Some(to_ms), None) => session.advance_to(to_ms),
            (None, Some(by_ms)) => session.advance_by(by_ms),
            _ => {
                return Err(HttpApiError::invalid_query(
                    "provide exactly one of to_ms or by_ms",
                    None,
                ))
            }
        };

        let response = AdvanceResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            fired,
            status: session.status(),
        };
        (response, collect_delta_messages(&mut inner))
    };
    broadcast_messages(&state, messages);
    Ok(Json(response))
}
