#[derive(Debug, Serialize)]
struct ContactsResponse {
    schema_version: String,
    contacts: Vec<Contact>,
}

#[derive(Debug, Serialize)]
struct FolderResponse {
    schema_version: String,
    folder: Folder,
    emails: Vec<Email>,
    unread: usize,
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
    cursor: Option<usize>,
    page_size: Option<usize>,
}

#[derive(Debug, Serialize)]
struct EventsResponse {
    schema_version: String,
    events: Vec<StoryEvent>,
    next_cursor: Option<usize>,
    total: usize,
}

async fn get_status(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SessionStatus>, HttpApiError> {
    let inner = state.inner.lock().await;
    let session = require_session(&inner, &session_id)?;
    Ok(Json(session.status()))
}

async fn get_snapshot(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Snapshot>, HttpApiError> {
    let inner = state.inner.lock().await;
    let session = require_session(&inner, &session_id)?;
    Ok(Json(session.snapshot()))
}

async fn get_contacts(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ContactsResponse>, HttpApiError> {
    let inner = state.inner.lock().await;
    let session = require_session(&inner, &session_id)?;
    Ok(Json(ContactsResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        contacts: session.contacts(),
    }))
}

async fn get_folder(
    Path((session_id, folder)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<FolderResponse>, HttpApiError> {
    let folder = Folder::parse(&folder).ok_or_else(|| {
        HttpApiError::invalid_query("unknown folder", Some(format!("folder={folder}")))
    })?;

    let inner = state.inner.lock().await;
    let session = require_session(&inner, &session_id)?;
    Ok(Json(FolderResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        folder,
        emails: session.folder_emails(folder),
        unread: session.status().unread.get(folder),
    }))
}

async fn get_email(
    Path((session_id, email_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<Email>, HttpApiError> {
    let inner = state.inner.lock().await;
    let session = require_session(&inner, &session_id)?;
    let email = session
        .email(&email_id)
        .ok_or_else(|| HttpApiError::email_not_found(&email_id))?;
    Ok(Json(email.clone()))
}

async fn get_events(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventsResponse>, HttpApiError> {
    let inner = state.inner.lock().await;
    let session = require_session(&inner, &session_id)?;
    let events = session.events();

    let (start, end, next_cursor) = paginate(events.len(), query.cursor, query.page_size)?;

    Ok(Json(EventsResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        events: events[start..end].to_vec(),
        next_cursor,
        total: events.len(),
    }))
}
