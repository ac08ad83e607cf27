use rocket::Request;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde_json::{Value, json};
use tracing::Instrument;

use crate::store::{Store, find_user_by_username, get_session_by_token};

use super::User;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for User {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let auth_span = tracing::info_span!("user_auth_guard");

        async move {
            let cookies = request.cookies();

            let token = cookies
                .get_private("session_token")
                .map(|c| c.value().to_string());

            if let Some(token) = token {
                let store = match request.rocket().state::<Store>() {
                    Some(store) => store,
                    _ => {
                        tracing::error!("Document store not found in managed state");
                        return Outcome::Error((Status::InternalServerError, ()));
                    }
                };

                match get_session_by_token(store, &token).await {
                    Ok(session) => {
                        if !session.is_valid() {
                            tracing::warn!(token = %token, "Session token expired");
                            return Outcome::Forward(Status::Unauthorized);
                        }

                        match find_user_by_username(store, &session.username).await {
                            Ok(Some(record)) => {
                                let user = User::from(record);
                                tracing::info!(username = %user.username, role = %user.role.as_str(), "User authenticated via session token");
                                return Outcome::Success(user);
                            }
                            Ok(None) => {
                                tracing::error!(username = %session.username, "No user record for valid session");
                                return Outcome::Error((Status::InternalServerError, ()));
                            }
                            Err(err) => {
                                tracing::error!(username = %session.username, error = ?err, "Failed to fetch user for valid session");
                                return Outcome::Error((Status::InternalServerError, ()));
                            }
                        }
                    }
                    Err(err) => {
                        tracing::warn!(token = %token, error = ?err, "Invalid session token");
                        return Outcome::Forward(Status::Unauthorized);
                    }
                }
            }

            Outcome::Error((Status::Unauthorized, ()))
        }
        .instrument(auth_span)
        .await
    }
}

#[catch(401)]
pub fn unauthorized_api(_req: &Request) -> Custom<Json<Value>> {
    let error_json = json!({
        "error": "Unauthorized",
        "message": "Authentication required"
    });

    Custom(Status::Unauthorized, Json(error_json))
}

#[catch(403)]
pub fn forbidden_api(_req: &Request) -> Custom<Json<Value>> {
    let error_json = json!({
        "error": "Forbidden",
        "message": "You don't have permission to perform this action"
    });

    Custom(Status::Forbidden, Json(error_json))
}
