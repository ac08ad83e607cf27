#[cfg(test)]
pub mod test_utils {
    use std::path::PathBuf;
    use std::sync::Once;

    use rocket::http::{ContentType, Cookie};
    use rocket::local::asynchronous::Client;
    use serde_json::json;
    use uuid::Uuid;

    use crate::auth::Role;
    use crate::error::AppError;
    use crate::init_rocket;
    use crate::store::{Store, create_user};

    static INIT: Once = Once::new();
    pub static STANDARD_PASSWORD: &str = "password123";

    fn init_test_logging() {
        INIT.call_once(|| {
            let _ = env_logger::builder().is_test(true).try_init();
        });
    }

    pub fn temp_store_paths(prefix: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("{}-{}", prefix, Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        (dir.join("data.json"), dir.join("appData.json"))
    }

    /// Fresh store over temp paths. Neither file exists yet, so the first
    /// load synthesizes the default document.
    pub fn temp_store(prefix: &str) -> Store {
        init_test_logging();
        let (snapshot_path, cache_path) = temp_store_paths(prefix);
        Store::new(snapshot_path, cache_path)
    }

    #[derive(Default)]
    pub struct TestStoreBuilder {
        users: Vec<TestUser>,
    }

    pub struct TestUser {
        pub username: String,
        pub role: Role,
        pub password: String,
    }

    impl TestStoreBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn student(mut self, username: &str) -> Self {
            self.users.push(TestUser {
                username: username.to_string(),
                role: Role::Student,
                password: STANDARD_PASSWORD.to_string(),
            });
            self
        }

        pub fn faculty_member(mut self, username: &str) -> Self {
            self.users.push(TestUser {
                username: username.to_string(),
                role: Role::Faculty,
                password: STANDARD_PASSWORD.to_string(),
            });
            self
        }

        pub fn admin(mut self, username: &str) -> Self {
            self.users.push(TestUser {
                username: username.to_string(),
                role: Role::Admin,
                password: STANDARD_PASSWORD.to_string(),
            });
            self
        }

        pub fn user_with_password(mut self, username: &str, role: Role, password: &str) -> Self {
            self.users.push(TestUser {
                username: username.to_string(),
                role,
                password: password.to_string(),
            });
            self
        }

        pub async fn build(self) -> Result<Store, AppError> {
            let store = temp_store("campus-portal-test");

            for user in &self.users {
                create_user(&store, &user.username, &user.password, user.role.clone(), None)
                    .await?;
            }

            Ok(store)
        }
    }

    /// One user per role on top of the seeded `admin`/`superroot` accounts.
    pub async fn create_standard_test_store() -> Store {
        TestStoreBuilder::new()
            .student("student_user")
            .faculty_member("faculty_user")
            .admin("admin_user")
            .build()
            .await
            .expect("Failed to build test store")
    }

    pub async fn setup_test_client(store: Store) -> Client {
        Client::untracked(init_rocket(store).await)
            .await
            .expect("valid rocket instance")
    }

    pub async fn login_test_user(
        client: &Client,
        username: &str,
        password: &str,
    ) -> Vec<Cookie<'static>> {
        let response = client
            .post("/api/login")
            .header(ContentType::JSON)
            .body(
                json!({
                    "username": username,
                    "password": password
                })
                .to_string(),
            )
            .dispatch()
            .await;

        response
            .cookies()
            .iter()
            .map(|cookie| cookie.clone().into_owned())
            .collect()
    }
}
