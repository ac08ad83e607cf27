use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rocket::tokio::fs;
use rocket::tokio::sync::RwLock;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::auth::{Role, UserSession};
use crate::document::{
    DEFAULT_THEME, Document, FACULTY_ID_PREFIX, FacultyRecord, STUDENT_ID_PREFIX, StudentRecord,
    Theme, UserRecord, default_document,
};
use crate::error::AppError;

/// Handle to the single process-wide document plus runtime session state.
/// Constructed once and passed around explicitly; cloning shares the same
/// underlying state.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    snapshot_path: PathBuf,
    cache_path: PathBuf,
    state: RwLock<StoreState>,
}

#[derive(Default)]
struct StoreState {
    document: Option<Document>,
    sessions: HashMap<String, UserSession>,
}

impl Store {
    pub fn new(snapshot_path: impl Into<PathBuf>, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                snapshot_path: snapshot_path.into(),
                cache_path: cache_path.into(),
                state: RwLock::new(StoreState::default()),
            }),
        }
    }
}

fn document_ref(state: &StoreState) -> Result<&Document, AppError> {
    state
        .document
        .as_ref()
        .ok_or_else(|| AppError::Internal("Document not loaded".to_string()))
}

fn document_mut(state: &mut StoreState) -> Result<&mut Document, AppError> {
    state
        .document
        .as_mut()
        .ok_or_else(|| AppError::Internal("Document not loaded".to_string()))
}

async fn read_document_file(path: &Path, kind: &str) -> Option<Document> {
    match fs::read_to_string(path).await {
        Ok(contents) => match serde_json::from_str::<Document>(&contents) {
            Ok(document) => {
                info!(path = %path.display(), kind = %kind, "Loaded document");
                Some(document)
            }
            Err(err) => {
                warn!(path = %path.display(), kind = %kind, error = %err, "Unparsable document, treating as absent");
                None
            }
        },
        Err(err) => {
            debug!(path = %path.display(), kind = %kind, error = %err, "Document not readable");
            None
        }
    }
}

/// Populates the in-memory document on first use: cached copy first, then the
/// bundled snapshot, then synthesized defaults. Both file reads are non-fatal.
async fn ensure_loaded(store: &Store) -> Result<(), AppError> {
    {
        let state = store.inner.state.read().await;
        if state.document.is_some() {
            return Ok(());
        }
    }

    let mut state = store.inner.state.write().await;
    if state.document.is_some() {
        return Ok(());
    }

    let document = match read_document_file(&store.inner.cache_path, "cache").await {
        Some(document) => document,
        None => match read_document_file(&store.inner.snapshot_path, "snapshot").await {
            Some(document) => document,
            None => {
                info!("No cached or bundled document, synthesizing defaults");
                default_document()?
            }
        },
    };

    state.document = Some(document);
    Ok(())
}

/// Cache writes are best effort. The cache is not a durability boundary, so a
/// failed write degrades to in-memory state with a warning.
async fn write_cache(cache_path: &Path, document: &Document) {
    let payload = match serde_json::to_string_pretty(document) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "Failed to serialize document for cache");
            return;
        }
    };

    if let Some(parent) = cache_path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(err) = fs::create_dir_all(parent).await {
                warn!(path = %parent.display(), error = %err, "Failed to create cache directory");
                return;
            }
        }
    }

    if let Err(err) = fs::write(cache_path, payload).await {
        warn!(path = %cache_path.display(), error = %err, "Failed to write document cache");
    }
}

#[instrument(skip(store))]
pub async fn load_document(store: &Store) -> Result<Document, AppError> {
    ensure_loaded(store).await?;
    let state = store.inner.state.read().await;
    Ok(document_ref(&state)?.clone())
}

#[instrument(skip_all)]
pub async fn save_document(store: &Store, document: Document) -> Result<(), AppError> {
    info!("Replacing in-memory document");
    let mut state = store.inner.state.write().await;
    write_cache(&store.inner.cache_path, &document).await;
    state.document = Some(document);
    Ok(())
}

#[instrument(skip(store))]
pub async fn get_user(store: &Store, username: &str) -> Result<UserRecord, AppError> {
    info!("Fetching user by username");
    match find_user_by_username(store, username).await? {
        Some(record) => Ok(record),
        _ => Err(AppError::NotFound(format!(
            "User with username {} not found in document",
            username
        ))),
    }
}

#[instrument(skip(store))]
pub async fn find_user_by_username(
    store: &Store,
    username: &str,
) -> Result<Option<UserRecord>, AppError> {
    ensure_loaded(store).await?;
    let state = store.inner.state.read().await;
    let document = document_ref(&state)?;

    Ok(document
        .users
        .iter()
        .find(|user| user.username == username)
        .cloned())
}

/// Partial-field update over a user record. Fields present in the update win;
/// everything else is left as stored.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct UserUpdate {
    pub password: Option<String>,
    pub role: Option<Role>,
    pub theme: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Returns whether a matching user was found; a miss is a normal result, not
/// an error, and leaves the document untouched.
#[instrument(skip(store, updates))]
pub async fn update_user(
    store: &Store,
    username: &str,
    updates: UserUpdate,
) -> Result<bool, AppError> {
    info!("Updating user");
    ensure_loaded(store).await?;

    let hashed_password = match &updates.password {
        Some(password) => Some(bcrypt::hash(password, bcrypt::DEFAULT_COST)?),
        None => None,
    };

    let mut state = store.inner.state.write().await;
    let document = document_mut(&mut state)?;

    let record = match document
        .users
        .iter_mut()
        .find(|user| user.username == username)
    {
        Some(record) => record,
        None => return Ok(false),
    };

    if let Some(hash) = hashed_password {
        record.password = hash;
    }
    if let Some(role) = updates.role {
        record.role = role;
    }
    if let Some(theme) = updates.theme {
        record.theme = theme;
    }
    if let Some(last_login) = updates.last_login {
        record.last_login = Some(last_login);
    }

    let snapshot = document.clone();
    write_cache(&store.inner.cache_path, &snapshot).await;
    Ok(true)
}

#[instrument(skip(store))]
pub async fn update_user_theme(
    store: &Store,
    username: &str,
    theme_key: &str,
) -> Result<bool, AppError> {
    update_user(
        store,
        username,
        UserUpdate {
            theme: Some(theme_key.to_string()),
            ..UserUpdate::default()
        },
    )
    .await
}

#[instrument(skip(store))]
pub async fn touch_last_login(store: &Store, username: &str) -> Result<bool, AppError> {
    update_user(
        store,
        username,
        UserUpdate {
            last_login: Some(Utc::now()),
            ..UserUpdate::default()
        },
    )
    .await
}

/// Single credential-check path for the whole portal. Returns the matched
/// record on success, `None` for unknown users and bad passwords alike.
#[instrument(skip_all, fields(username))]
pub async fn authenticate_user(
    store: &Store,
    username: &str,
    password: &str,
) -> Result<Option<UserRecord>, AppError> {
    info!("Authenticating user");
    let user = find_user_by_username(store, username).await?;

    match user {
        Some(record) => match bcrypt::verify(password, &record.password) {
            Ok(true) => Ok(Some(record)),
            _ => Ok(None),
        },
        _ => Ok(None),
    }
}

#[instrument(skip_all, fields(username, role))]
pub async fn create_user(
    store: &Store,
    username: &str,
    password: &str,
    role: Role,
    theme: Option<&str>,
) -> Result<UserRecord, AppError> {
    info!("Creating new user");
    ensure_loaded(store).await?;

    let hashed_password = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;

    let mut state = store.inner.state.write().await;
    let document = document_mut(&mut state)?;

    if document.users.iter().any(|user| user.username == username) {
        return Err(AppError::Validation(format!(
            "Username '{}' already exists",
            username
        )));
    }

    let record = UserRecord {
        username: username.to_string(),
        password: hashed_password,
        role,
        theme: theme.unwrap_or(DEFAULT_THEME).to_string(),
        created_at: Utc::now(),
        last_login: None,
    };

    document.users.push(record.clone());
    let snapshot = document.clone();
    write_cache(&store.inner.cache_path, &snapshot).await;
    Ok(record)
}

#[instrument(skip_all)]
pub async fn add_student(
    store: &Store,
    fields: Map<String, Value>,
) -> Result<StudentRecord, AppError> {
    info!("Adding student record");
    ensure_loaded(store).await?;

    let mut state = store.inner.state.write().await;
    let document = document_mut(&mut state)?;

    let record = StudentRecord {
        id: format!("{}{}", STUDENT_ID_PREFIX, Uuid::new_v4()),
        created_at: Utc::now(),
        fields,
    };

    document.students.push(record.clone());
    let snapshot = document.clone();
    write_cache(&store.inner.cache_path, &snapshot).await;
    Ok(record)
}

#[instrument(skip_all)]
pub async fn add_faculty(
    store: &Store,
    fields: Map<String, Value>,
) -> Result<FacultyRecord, AppError> {
    info!("Adding faculty record");
    ensure_loaded(store).await?;

    let mut state = store.inner.state.write().await;
    let document = document_mut(&mut state)?;

    let record = FacultyRecord {
        id: format!("{}{}", FACULTY_ID_PREFIX, Uuid::new_v4()),
        created_at: Utc::now(),
        fields,
    };

    document.faculty.push(record.clone());
    let snapshot = document.clone();
    write_cache(&store.inner.cache_path, &snapshot).await;
    Ok(record)
}

#[instrument(skip(store))]
pub async fn get_students(store: &Store) -> Result<Vec<StudentRecord>, AppError> {
    info!("Getting all students");
    ensure_loaded(store).await?;
    let state = store.inner.state.read().await;
    Ok(document_ref(&state)?.students.clone())
}

#[instrument(skip(store))]
pub async fn get_faculty(store: &Store) -> Result<Vec<FacultyRecord>, AppError> {
    info!("Getting all faculty");
    ensure_loaded(store).await?;
    let state = store.inner.state.read().await;
    Ok(document_ref(&state)?.faculty.clone())
}

/// Unknown keys resolve to the `default` descriptor.
#[instrument(skip(store))]
pub async fn get_theme(store: &Store, theme_key: &str) -> Result<Theme, AppError> {
    ensure_loaded(store).await?;
    let state = store.inner.state.read().await;
    let document = document_ref(&state)?;

    document
        .themes
        .get(theme_key)
        .or_else(|| document.themes.get(DEFAULT_THEME))
        .cloned()
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Theme {} not found and catalog has no default entry",
                theme_key
            ))
        })
}

#[instrument(skip(store))]
pub async fn get_all_themes(store: &Store) -> Result<BTreeMap<String, Theme>, AppError> {
    ensure_loaded(store).await?;
    let state = store.inner.state.read().await;
    Ok(document_ref(&state)?.themes.clone())
}

#[instrument(skip(store, token))]
pub async fn create_user_session(
    store: &Store,
    username: &str,
    token: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), AppError> {
    info!("Creating user session");

    let mut state = store.inner.state.write().await;
    state.sessions.insert(
        token.to_string(),
        UserSession {
            token: token.to_string(),
            username: username.to_string(),
            created_at: Utc::now(),
            expires_at,
        },
    );

    Ok(())
}

#[instrument(skip(store, token))]
pub async fn get_session_by_token(store: &Store, token: &str) -> Result<UserSession, AppError> {
    let state = store.inner.state.read().await;

    state
        .sessions
        .get(token)
        .cloned()
        .ok_or_else(|| AppError::Authentication("Invalid session token".to_string()))
}

#[instrument(skip(store, token))]
pub async fn invalidate_session(store: &Store, token: &str) -> Result<(), AppError> {
    info!("Invalidating session");

    let mut state = store.inner.state.write().await;
    state.sessions.remove(token);

    Ok(())
}

#[instrument(skip(store))]
pub async fn clean_expired_sessions(store: &Store) -> Result<u64, AppError> {
    let mut state = store.inner.state.write().await;

    let before = state.sessions.len();
    state.sessions.retain(|_, session| session.is_valid());

    Ok((before - state.sessions.len()) as u64)
}
