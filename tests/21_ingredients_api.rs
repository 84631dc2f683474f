mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn list_is_owner_scoped_and_name_descending() -> Result<()> {
    let app = TestApp::new();
    let alice = app.user("alice@example.com").await?;
    let bob = app.user("bob@example.com").await?;

    app.create("/ingredients", &alice, json!({"name": "Kale"})).await?;
    app.create("/ingredients", &alice, json!({"name": "Salt"})).await?;
    app.create("/ingredients", &bob, json!({"name": "Vinegar"})).await?;

    let res = app.get("/ingredients", &alice).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.names(), vec!["Salt", "Kale"]);
    Ok(())
}

#[tokio::test]
async fn assigned_only_dedups_shared_ingredients() -> Result<()> {
    let app = TestApp::new();
    let alice = app.user("alice@example.com").await?;

    app.create("/ingredients", &alice, json!({"name": "Turkey"})).await?;
    for title in ["Eggs Benedict", "Coriander eggs"] {
        app.create(
            "/recipes",
            &alice,
            json!({
                "title": title,
                "time_minutes": 20,
                "price": "7.00",
                "ingredients": [{"name": "Eggs"}, {"name": "Salt"}],
            }),
        )
        .await?;
    }

    let res = app.get("/ingredients?assigned_only=1", &alice).await?;
    assert_eq!(res.names(), vec!["Salt", "Eggs"]);

    let res = app.get("/ingredients", &alice).await?;
    assert_eq!(res.names(), vec!["Turkey", "Salt", "Eggs"]);
    Ok(())
}

#[tokio::test]
async fn update_and_delete_are_owner_scoped() -> Result<()> {
    let app = TestApp::new();
    let alice = app.user("alice@example.com").await?;
    let bob = app.user("bob@example.com").await?;
    let id = app.create("/ingredients", &alice, json!({"name": "Cabbage"})).await?;
    let uri = format!("/ingredients/{}", id);

    let res = app.patch(&uri, &bob, json!({"name": "Lettuce"})).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["message"], "Ingredient not found");

    let res = app.patch(&uri, &alice, json!({"name": "Lettuce"})).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data(), &json!({"id": id, "name": "Lettuce"}));

    assert_eq!(app.delete(&uri, &bob).await?.status, StatusCode::NOT_FOUND);
    assert_eq!(app.delete(&uri, &alice).await?.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get("/ingredients", &alice).await?.data(), &json!([]));
    Ok(())
}

#[tokio::test]
async fn patch_with_blank_name_is_rejected() -> Result<()> {
    let app = TestApp::new();
    let alice = app.user("alice@example.com").await?;
    let id = app.create("/ingredients", &alice, json!({"name": "Pepper"})).await?;

    let res = app.patch(&format!("/ingredients/{}", id), &alice, json!({"name": ""})).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["field_errors"]["name"].is_string());

    let res = app.get(&format!("/ingredients/{}", id), &alice).await?;
    assert_eq!(res.data()["name"], "Pepper");
    Ok(())
}
