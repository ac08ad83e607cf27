#[cfg(test)]
mod tests {
    use rocket::tokio;
    use serde_json::{Map, Value, json};

    use crate::auth::Role;
    use crate::error::AppError;
    use crate::store::{
        Store, UserUpdate, add_faculty, add_student, authenticate_user, create_user,
        get_all_themes, get_faculty, get_students, get_theme, get_user, load_document,
        save_document, update_user, update_user_theme,
    };
    use crate::test::test_utils::{
        STANDARD_PASSWORD, TestStoreBuilder, temp_store, temp_store_paths,
    };

    fn record_fields(name: &str) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("name".to_string(), json!(name));
        fields.insert("department".to_string(), json!("Computer Science"));
        fields
    }

    #[tokio::test]
    async fn test_default_document_seed() {
        let store = temp_store("campus-default-doc");

        let document = load_document(&store).await.expect("Failed to load document");

        assert_eq!(document.users.len(), 2, "Default document seeds two users");
        assert!(document.students.is_empty());
        assert!(document.faculty.is_empty());

        assert_eq!(document.themes.len(), 6);
        for key in ["default", "green", "purple", "orange", "teal", "superroot"] {
            assert!(document.themes.contains_key(key), "Missing theme {}", key);
        }

        let admin = get_user(&store, "admin").await.expect("Failed to get admin");
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.theme, "default");

        let superroot = get_user(&store, "superroot")
            .await
            .expect("Failed to get superroot");
        assert_eq!(superroot.role, Role::Superroot);
        assert_eq!(superroot.theme, "superroot");
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let store = temp_store("campus-user-missing");

        let result = get_user(&store, "nonexistent").await;

        match result {
            Err(AppError::NotFound(_)) => {}
            other => panic!("Expected NotFound error, got {:?}", other.map(|u| u.username)),
        }
    }

    #[tokio::test]
    async fn test_authenticate_seed_users() {
        let store = temp_store("campus-auth-seed");

        let admin = authenticate_user(&store, "admin", "admin123")
            .await
            .expect("Authentication should not error");
        assert!(admin.is_some(), "Seeded admin credentials should verify");

        let superroot = authenticate_user(&store, "superroot", "superroot123")
            .await
            .expect("Authentication should not error");
        assert!(superroot.is_some());

        let bad_password = authenticate_user(&store, "admin", "wrong_password")
            .await
            .expect("Authentication should not error");
        assert!(bad_password.is_none());

        let unknown_user = authenticate_user(&store, "ghost", "admin123")
            .await
            .expect("Authentication should not error");
        assert!(unknown_user.is_none());
    }

    #[tokio::test]
    async fn test_update_user_theme() {
        let store = temp_store("campus-update-theme");

        let found = update_user_theme(&store, "admin", "green")
            .await
            .expect("Failed to update theme");
        assert!(found);

        let admin = get_user(&store, "admin").await.expect("Failed to get admin");
        assert_eq!(admin.theme, "green");
    }

    #[tokio::test]
    async fn test_update_missing_user_leaves_document_unchanged() {
        let store = temp_store("campus-update-missing");

        let before = load_document(&store).await.expect("Failed to load document");

        let found = update_user(
            &store,
            "nonexistent",
            UserUpdate {
                theme: Some("green".to_string()),
                ..UserUpdate::default()
            },
        )
        .await
        .expect("Update of missing user should not error");
        assert!(!found, "Missing user reports not-found");

        let after = load_document(&store).await.expect("Failed to load document");
        assert_eq!(before, after, "Document must be untouched on a miss");
    }

    #[tokio::test]
    async fn test_update_user_merges_partial_fields() {
        let store = temp_store("campus-partial-update");

        let found = update_user(
            &store,
            "admin",
            UserUpdate {
                role: Some(Role::Faculty),
                ..UserUpdate::default()
            },
        )
        .await
        .expect("Failed to update user");
        assert!(found);

        let admin = get_user(&store, "admin").await.expect("Failed to get admin");
        assert_eq!(admin.role, Role::Faculty, "Updated field takes precedence");
        assert_eq!(admin.theme, "default", "Untouched fields keep stored values");
        assert_eq!(admin.username, "admin");
    }

    #[tokio::test]
    async fn test_add_student_assigns_unique_ids() {
        let store = temp_store("campus-add-student");

        let first = add_student(&store, record_fields("Asha Rao"))
            .await
            .expect("Failed to add student");
        let second = add_student(&store, record_fields("Vikram Shah"))
            .await
            .expect("Failed to add student");

        assert_ne!(first.id, second.id, "Generated ids must be distinct");
        assert!(first.id.starts_with("STU-"));
        assert!(second.id.starts_with("STU-"));

        assert_eq!(first.fields.get("name"), Some(&json!("Asha Rao")));
        assert_eq!(
            first.fields.get("department"),
            Some(&json!("Computer Science"))
        );

        let students = get_students(&store).await.expect("Failed to list students");
        assert_eq!(students.len(), 2);
    }

    #[tokio::test]
    async fn test_add_faculty_assigns_prefixed_id() {
        let store = temp_store("campus-add-faculty");

        let record = add_faculty(&store, record_fields("Dr. Mehta"))
            .await
            .expect("Failed to add faculty");

        assert!(record.id.starts_with("FAC-"));
        assert_eq!(record.fields.get("name"), Some(&json!("Dr. Mehta")));

        let faculty = get_faculty(&store).await.expect("Failed to list faculty");
        assert_eq!(faculty.len(), 1);
    }

    #[tokio::test]
    async fn test_get_theme_falls_back_to_default() {
        let store = temp_store("campus-theme-fallback");

        let unknown = get_theme(&store, "doesNotExist")
            .await
            .expect("Fallback lookup should succeed");
        assert_eq!(unknown.name, "Default Blue");

        let green = get_theme(&store, "green")
            .await
            .expect("Known lookup should succeed");
        assert_eq!(green.name, "Green Theme");
        assert_eq!(green.primary, "#2e7d32");
    }

    #[tokio::test]
    async fn test_get_all_themes_returns_catalog() {
        let store = temp_store("campus-theme-catalog");

        let catalog = get_all_themes(&store).await.expect("Failed to get catalog");

        assert_eq!(catalog.len(), 6);
        assert!(catalog.contains_key("superroot"));
    }

    #[tokio::test]
    async fn test_round_trip_via_cache() {
        let (snapshot_path, cache_path) = temp_store_paths("campus-roundtrip");
        let store = Store::new(snapshot_path.clone(), cache_path.clone());

        let mut document = load_document(&store).await.expect("Failed to load document");
        document
            .extra
            .insert("subjects".to_string(), json!([{"code": "CS101"}]));
        save_document(&store, document.clone())
            .await
            .expect("Failed to save document");

        // Fresh store over the same cache path simulates a reload.
        let reopened = Store::new(snapshot_path, cache_path);
        let reloaded = load_document(&reopened)
            .await
            .expect("Failed to reload document");

        assert_eq!(reloaded, document);
    }

    #[tokio::test]
    async fn test_mutations_survive_reload() {
        let (snapshot_path, cache_path) = temp_store_paths("campus-mutation-reload");
        let store = Store::new(snapshot_path.clone(), cache_path.clone());

        let created = add_student(&store, record_fields("Asha Rao"))
            .await
            .expect("Failed to add student");
        update_user_theme(&store, "admin", "teal")
            .await
            .expect("Failed to update theme");

        let reopened = Store::new(snapshot_path, cache_path);
        let students = get_students(&reopened)
            .await
            .expect("Failed to list students");
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].id, created.id);

        let admin = get_user(&reopened, "admin").await.expect("Failed to get admin");
        assert_eq!(admin.theme, "teal");
    }

    #[tokio::test]
    async fn test_cache_parse_failure_falls_back_to_defaults() {
        let (snapshot_path, cache_path) = temp_store_paths("campus-bad-cache");
        std::fs::write(&cache_path, "{ this is not json").expect("Failed to write bad cache");

        let store = Store::new(snapshot_path, cache_path);
        let document = load_document(&store)
            .await
            .expect("Bad cache must not be fatal");

        assert_eq!(document.users.len(), 2, "Falls through to default document");
    }

    #[tokio::test]
    async fn test_snapshot_used_when_no_cache() {
        let (snapshot_path, cache_path) = temp_store_paths("campus-snapshot-load");

        let seed = Store::new("/nonexistent/data.json", "/nonexistent/appData.json");
        let mut snapshot = load_document(&seed).await.expect("Failed to build snapshot");
        snapshot.extra.insert("naac".to_string(), json!([]));
        std::fs::write(
            &snapshot_path,
            serde_json::to_string_pretty(&snapshot).expect("Failed to serialize snapshot"),
        )
        .expect("Failed to write snapshot");

        let store = Store::new(snapshot_path, cache_path);
        let document = load_document(&store).await.expect("Failed to load document");

        assert_eq!(document, snapshot, "Snapshot collections survive loading");
        assert!(document.extra.contains_key("naac"));
    }

    #[tokio::test]
    async fn test_create_user_duplicate_username_rejected() {
        let store = TestStoreBuilder::new()
            .student("dup_user")
            .build()
            .await
            .expect("Failed to build test store");

        let result = create_user(
            &store,
            "dup_user",
            STANDARD_PASSWORD,
            Role::Student,
            None,
        )
        .await;

        match result {
            Err(AppError::Validation(msg)) => {
                assert!(msg.contains("already exists"));
            }
            other => panic!(
                "Expected Validation error, got {:?}",
                other.map(|r| r.username)
            ),
        }
    }
}
