use std::collections::BTreeMap;

use rocket::State;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::response::Redirect;
use rocket::response::status::Custom;
use rocket::serde::{Deserialize, Serialize, json::Json};
use serde_json::{Map, Value};
use validator::Validate;

use crate::auth::{Permission, Role, User, UserSession};
use crate::document::{DEFAULT_THEME, EXCLUSIVE_THEME, FacultyRecord, StudentRecord, Theme, UserRecord};
use crate::store::{
    Store, UserUpdate, add_faculty, add_student, authenticate_user, create_user,
    create_user_session, get_all_themes, get_faculty, get_students, get_theme, invalidate_session,
    touch_last_login, update_user, update_user_theme,
};
use crate::validation::{AppErrorExt, JsonValidateExt, PermissionCheckExt, ValidationResponse};

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    password: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: Option<UserData>,
    pub error: Option<String>,
    pub redirect_url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UserData {
    pub username: String,
    pub role: String,
    pub theme: String,
}

impl From<UserRecord> for UserData {
    fn from(record: UserRecord) -> Self {
        Self {
            username: record.username,
            role: record.role.to_string(),
            theme: record.theme,
        }
    }
}

impl From<User> for UserData {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            role: user.role.to_string(),
            theme: user.theme,
        }
    }
}

#[post("/login", data = "<login>")]
pub async fn api_login(
    login: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    store: &State<Store>,
) -> Result<Json<LoginResponse>, Custom<Json<ValidationResponse>>> {
    use chrono::Utc;

    let validated = login.validate_custom()?;

    match authenticate_user(store, &validated.username, &validated.password)
        .await
        .validate_custom()?
    {
        Some(record) => {
            let token = UserSession::generate_token();
            let expires_at = Utc::now() + chrono::Duration::hours(1);

            create_user_session(store, &record.username, &token, expires_at)
                .await
                .validate_custom()?;

            touch_last_login(store, &record.username)
                .await
                .validate_custom()?;

            let cookie = Cookie::build(("session_token", token))
                .same_site(SameSite::Lax)
                .http_only(true)
                .max_age(rocket::time::Duration::hours(1));
            cookies.add_private(cookie);

            cookies.add_private(
                Cookie::build(("logged_in", record.username.clone()))
                    .same_site(SameSite::Lax)
                    .max_age(rocket::time::Duration::hours(1)),
            );

            cookies.add_private(
                Cookie::build(("user_role", record.role.to_string()))
                    .same_site(SameSite::Lax)
                    .max_age(rocket::time::Duration::hours(1)),
            );

            cookies.add_private(
                Cookie::build(("current_theme", record.theme.clone()))
                    .same_site(SameSite::Lax)
                    .max_age(rocket::time::Duration::hours(1)),
            );

            Ok(Json(LoginResponse {
                success: true,
                user: Some(UserData::from(record)),
                error: None,
                redirect_url: Some("/ui/profile".to_string()),
            }))
        }
        None => Ok(Json(LoginResponse {
            success: false,
            user: None,
            error: Some("Invalid username or password".to_string()),
            redirect_url: None,
        })),
    }
}

#[post("/logout")]
pub async fn api_logout(cookies: &CookieJar<'_>, store: &State<Store>) -> Redirect {
    let token = cookies
        .get_private("session_token")
        .map(|cookie| cookie.value().to_string());

    if let Some(token) = token {
        let _ = invalidate_session(store, &token).await;
    }

    cookies.remove_private(Cookie::build("session_token"));
    cookies.remove_private(Cookie::build("logged_in"));
    cookies.remove_private(Cookie::build("user_role"));
    cookies.remove_private(Cookie::build("current_theme"));

    Redirect::to("/ui/")
}

#[get("/me")]
pub async fn api_me(user: User) -> Json<UserData> {
    Json(UserData::from(user))
}

#[get("/me", rank = 2)]
pub async fn api_me_unauthorized() -> Status {
    Status::Unauthorized
}

/// The resolved style a session applies: five style attributes plus the theme
/// marker used for downstream styling hooks.
#[derive(Serialize, Deserialize)]
pub struct ActiveTheme {
    pub theme: String,
    pub primary: String,
    pub secondary: String,
    pub navbar: String,
    pub sidebar: String,
    pub accent: String,
}

impl ActiveTheme {
    fn from_parts(key: &str, descriptor: &Theme) -> Self {
        Self {
            theme: key.to_string(),
            primary: descriptor.primary.clone(),
            secondary: descriptor.secondary.clone(),
            navbar: descriptor.navbar.clone(),
            sidebar: descriptor.sidebar.clone(),
            accent: descriptor.accent.clone(),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct ThemesResponse {
    pub themes: BTreeMap<String, Theme>,
    pub active: ActiveTheme,
}

/// Selector filtering: the exclusive theme is not offered to sessions that
/// cannot use it. The change handler re-checks independently.
pub fn visible_themes(catalog: BTreeMap<String, Theme>, user: &User) -> BTreeMap<String, Theme> {
    catalog
        .into_iter()
        .filter(|(key, _)| {
            key != EXCLUSIVE_THEME || user.has_permission(Permission::UseExclusiveTheme)
        })
        .collect()
}

#[get("/themes")]
pub async fn api_get_themes(
    user: User,
    store: &State<Store>,
) -> Result<Json<ThemesResponse>, Status> {
    let catalog = get_all_themes(store).await?;

    let active_key = if catalog.contains_key(&user.theme) {
        user.theme.clone()
    } else {
        DEFAULT_THEME.to_string()
    };
    let descriptor = get_theme(store, &user.theme).await?;
    let active = ActiveTheme::from_parts(&active_key, &descriptor);

    Ok(Json(ThemesResponse {
        themes: visible_themes(catalog, &user),
        active,
    }))
}

#[derive(Deserialize, Validate)]
pub struct ThemeChangeRequest {
    #[validate(length(min = 1, message = "Theme is required"))]
    theme: String,
}

#[put("/me/theme", data = "<request>")]
pub async fn api_set_theme(
    request: Json<ThemeChangeRequest>,
    user: User,
    cookies: &CookieJar<'_>,
    store: &State<Store>,
) -> Result<Json<ActiveTheme>, Custom<Json<ValidationResponse>>> {
    let validated = request.validate_custom()?;

    user.require_permission(Permission::ChangeOwnTheme)
        .validate_custom()?;

    // Enforcement point for the exclusive theme. The catalog filter in
    // api_get_themes is cosmetic; a crafted request still ends up here.
    if validated.theme == EXCLUSIVE_THEME
        && !user.has_permission(Permission::UseExclusiveTheme)
    {
        tracing::warn!(username = %user.username, role = %user.role.as_str(), "Exclusive theme requested without permission");
        return Err(Custom(
            Status::Forbidden,
            Json(ValidationResponse::with_error(
                "theme",
                "Access denied: This theme is exclusive to superroot users",
            )),
        ));
    }

    let catalog = get_all_themes(store).await.validate_custom()?;
    let applied_key = if catalog.contains_key(&validated.theme) {
        validated.theme.clone()
    } else {
        DEFAULT_THEME.to_string()
    };
    let descriptor = get_theme(store, &applied_key).await.validate_custom()?;

    update_user_theme(store, &user.username, &applied_key)
        .await
        .validate_custom()?;

    cookies.add_private(
        Cookie::build(("current_theme", applied_key.clone()))
            .same_site(SameSite::Lax)
            .max_age(rocket::time::Duration::hours(1)),
    );

    Ok(Json(ActiveTheme::from_parts(&applied_key, &descriptor)))
}

fn require_name(
    fields: &Map<String, Value>,
) -> Result<(), Custom<Json<ValidationResponse>>> {
    match fields.get("name").and_then(Value::as_str) {
        Some(name) if !name.trim().is_empty() => Ok(()),
        _ => Err(Custom(
            Status::UnprocessableEntity,
            Json(ValidationResponse::with_error(
                "name",
                "Please fill all required fields.",
            )),
        )),
    }
}

#[post("/students", data = "<record>")]
pub async fn api_add_student(
    record: Json<Map<String, Value>>,
    user: User,
    store: &State<Store>,
) -> Result<Custom<Json<StudentRecord>>, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::AddStudents)
        .validate_custom()?;

    let fields = record.into_inner();
    require_name(&fields)?;

    let created = add_student(store, fields).await.validate_custom()?;

    Ok(Custom(Status::Created, Json(created)))
}

#[get("/students")]
pub async fn api_get_students(
    user: User,
    store: &State<Store>,
) -> Result<Json<Vec<StudentRecord>>, Status> {
    user.require_permission(Permission::ViewStudents)?;

    let students = get_students(store).await?;

    Ok(Json(students))
}

#[post("/faculty", data = "<record>")]
pub async fn api_add_faculty(
    record: Json<Map<String, Value>>,
    user: User,
    store: &State<Store>,
) -> Result<Custom<Json<FacultyRecord>>, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::AddFaculty)
        .validate_custom()?;

    let fields = record.into_inner();
    require_name(&fields)?;

    let created = add_faculty(store, fields).await.validate_custom()?;

    Ok(Custom(Status::Created, Json(created)))
}

#[get("/faculty")]
pub async fn api_get_faculty(
    user: User,
    store: &State<Store>,
) -> Result<Json<Vec<FacultyRecord>>, Status> {
    user.require_permission(Permission::ViewFaculty)?;

    let faculty = get_faculty(store).await?;

    Ok(Json(faculty))
}

#[derive(Deserialize, Validate, Clone)]
pub struct UserRegistrationRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    password: String,
    role: String,
}

#[post("/register", data = "<registration>")]
pub async fn api_register_user(
    registration: Json<UserRegistrationRequest>,
    user: User,
    store: &State<Store>,
) -> Result<Status, Custom<Json<ValidationResponse>>> {
    let validated = registration.validate_custom()?;

    user.require_permission(Permission::RegisterUsers)
        .validate_custom()?;

    let role = Role::from_str(&validated.role)
        .map_err(|err| crate::error::AppError::Validation(err.to_string()))
        .validate_custom()?;

    if role == Role::Superroot || role == Role::Admin {
        user.require_all_permissions(&[Permission::RegisterUsers, Permission::EditUserRoles])
            .validate_custom()?;
    }

    create_user(store, &validated.username, &validated.password, role, None)
        .await
        .validate_custom()?;

    Ok(Status::Created)
}

#[put("/admin/users/<username>", data = "<update>")]
pub async fn api_update_user(
    username: &str,
    update: Json<UserUpdate>,
    user: User,
    store: &State<Store>,
) -> Result<Status, Status> {
    user.require_permission(Permission::EditUserCredentials)?;

    // Role changes need the stronger grant on top of credential editing.
    if update.role.is_some() {
        user.require_all_permissions(&[Permission::EditUserCredentials, Permission::EditUserRoles])?;
    }

    let found = update_user(store, username, update.into_inner()).await?;

    if found {
        Ok(Status::Ok)
    } else {
        Err(Status::NotFound)
    }
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}
