mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, ADMIN_EMAIL, ADMIN_PASSWORD};
use serde_json::json;

#[tokio::test]
async fn test_health_reports_database() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["migrations"]["total"], body["migrations"]["applied"]);
}

#[tokio::test]
async fn test_first_registration_bootstraps_admin() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/register",
            None,
            Some(json!({
                "fullName": "Store Admin",
                "email": "ADMIN@Example.com",
                "password": ADMIN_PASSWORD,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["users"][0]["roleName"], "admin");
    assert_eq!(body["users"][0]["email"], ADMIN_EMAIL);
    assert!(body["users"][0].get("passwordHash").is_none());

    // Once a user exists, anonymous registration is refused
    let (status, _) = app
        .request(
            Method::POST,
            "/api/register",
            None,
            Some(json!({
                "fullName": "Intruder",
                "email": "intruder@example.com",
                "password": "secret",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let app = TestApp::new().await;
    app.bootstrap_admin().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "email": ADMIN_EMAIL, "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthenticated");
    assert_eq!(body["message"], "Invalid email or password");

    let (status, _) = app
        .request(Method::POST, "/api/login", None, Some(json!({ "email": "" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bad_token_is_rejected() {
    let app = TestApp::new().await;
    app.bootstrap_admin().await;

    let (status, body) = app.get("/api/product", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthenticated");
}

#[tokio::test]
async fn test_admin_registers_batch_and_cashier_is_forbidden_admin_routes() {
    let app = TestApp::new().await;
    let admin = app.bootstrap_admin().await;

    let (status, body) = app
        .post(
            "/api/register",
            &admin,
            json!([
                { "fullName": "Till One", "email": "till1@example.com", "password": "pw-one" },
                { "fullName": "Floor Manager", "email": "mgr@example.com", "password": "pw-two", "roleName": "manager" },
            ]),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["users"][0]["roleName"], "cashier");
    assert_eq!(body["users"][1]["roleName"], "manager");

    let cashier = app.login("till1@example.com", "pw-one").await;

    let (status, body) = app.get("/api/role", &cashier).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");

    let (status, _) = app.get("/api/users", &cashier).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A cashier cannot register users either
    let (status, _) = app
        .post(
            "/api/register",
            &cashier,
            json!({ "fullName": "Someone", "email": "someone@example.com", "password": "pw" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.get("/api/users", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_duplicate_email_is_conflict() {
    let app = TestApp::new().await;
    let admin = app.bootstrap_admin().await;

    let (status, body) = app
        .post(
            "/api/register",
            &admin,
            json!({ "fullName": "Another Admin", "email": ADMIN_EMAIL, "password": "pw" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
}

#[tokio::test]
async fn test_role_and_permission_administration() {
    let app = TestApp::new().await;
    let admin = app.bootstrap_admin().await;

    let (status, body) = app
        .post(
            "/api/permission",
            &admin,
            json!([{ "name": "Product.Write" }, { "name": "order.read" }]),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let permissions = body["data"].as_array().unwrap().clone();
    assert_eq!(permissions.len(), 2);
    assert!(permissions.iter().any(|p| p["name"] == "product.write"));

    // Re-sending only existing names is a conflict
    let (status, _) = app
        .post("/api/permission", &admin, json!({ "name": "order.read" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let ids: Vec<String> = permissions
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect();
    let (status, body) = app
        .post(
            "/api/role",
            &admin,
            json!({ "name": "auditor", "permissions": [ids[0].clone()] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let role_id = body["data"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(
            "/api/role/permissions",
            &admin,
            json!({ "roleId": role_id, "permissions": ids }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["permissions"].as_array().unwrap().len(), 2);

    let (status, body) = app
        .post(
            "/api/role/permissions",
            &admin,
            json!({ "roleId": role_id, "permissions": ["missing"] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Some permissions are invalid");
}
