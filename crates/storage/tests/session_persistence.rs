use storage::Storage;

#[tokio::test]
async fn session_value_survives_reopening_the_database() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("client.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    storage
        .save_session_value("token", "persisted-token")
        .await
        .expect("save");
    storage.pool().close().await;
    drop(storage);

    let reopened = Storage::new(&database_url).await.expect("reopen");
    assert_eq!(
        reopened
            .load_session_value("token")
            .await
            .expect("load")
            .as_deref(),
        Some("persisted-token")
    );
}
