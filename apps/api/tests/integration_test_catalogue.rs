mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::{json, Value};
use stockroom_core::pricing::TaxPrecedence;

fn tax(code: &str, rate: f64, categories: &[&str]) -> Value {
    json!({
        "name": format!("{} tax", code),
        "code": code,
        "rate": rate,
        "applicableCategories": categories,
    })
}

#[tokio::test]
async fn test_product_price_includes_matching_tax() {
    let app = TestApp::new().await;
    let admin = app.bootstrap_admin().await;

    let (status, body) = app.post("/api/taxes", &admin, tax("VAT", 15.0, &["Snacks"])).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["rate"], 15.0);

    let snack = app.create_product(&admin, "S1", "Snacks", 100, 5).await;
    assert_eq!(snack["basePrice"], 100);
    assert_eq!(snack["priceWithTax"], 115);

    let other = app.create_product(&admin, "G1", "General", 100, 5).await;
    assert_eq!(other["priceWithTax"], 100);

    // Moving a product into a taxed category reprices it
    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/product/{}", other["id"].as_str().unwrap()),
            Some(&admin),
            Some(json!({ "category": "Snacks" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["priceWithTax"], 115);
}

#[tokio::test]
async fn test_exclusive_precedence_rejects_overlapping_tax() {
    let app = TestApp::with_precedence(TaxPrecedence::Exclusive).await;
    let admin = app.bootstrap_admin().await;

    let (status, _) = app.post("/api/taxes", &admin, tax("VAT", 15.0, &["Snacks"])).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post("/api/taxes", &admin, tax("GST", 17.0, &["Drinks", "Snacks"]))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");

    // An inactive rule does not compete
    let mut inactive = tax("GST", 17.0, &["Snacks"]);
    inactive["isActive"] = json!(false);
    let (status, _) = app.post("/api/taxes", &admin, inactive).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_duplicate_sku_is_conflict() {
    let app = TestApp::new().await;
    let admin = app.bootstrap_admin().await;
    app.create_product(&admin, "A1", "General", 100, 1).await;

    let (status, body) = app
        .post(
            "/api/product",
            &admin,
            json!({ "name": "Copy", "sku": "A1", "category": "General", "price": 1, "cost": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
}

#[tokio::test]
async fn test_batch_create_reports_skipped_entries() {
    let app = TestApp::new().await;
    let admin = app.bootstrap_admin().await;

    let (status, body) = app
        .post(
            "/api/product",
            &admin,
            json!([
                { "name": "One", "sku": "B1", "category": "General", "price": 100, "cost": 50 },
                { "name": "Two", "sku": "B1", "category": "General", "price": 100, "cost": 50 },
                { "name": "Three", "sku": "B3", "category": "General", "price": 100, "cost": 50 },
            ]),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["skipped"], 1);
    assert!(body["errors"][0].as_str().unwrap().starts_with("Row 2:"));
}

#[tokio::test]
async fn test_product_list_is_paginated() {
    let app = TestApp::new().await;
    let admin = app.bootstrap_admin().await;
    for sku in ["P1", "P2", "P3"] {
        app.create_product(&admin, sku, "General", 100, 1).await;
    }

    let (status, body) = app.get("/api/product?page=2&limit=2", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["meta"]["total"], 3);
    assert_eq!(body["meta"]["page"], 2);
    assert_eq!(body["meta"]["pages"], 2);
}

#[tokio::test]
async fn test_lookup_by_barcode() {
    let app = TestApp::new().await;
    let admin = app.bootstrap_admin().await;

    let (status, _) = app
        .post(
            "/api/product",
            &admin,
            json!({
                "name": "Cola", "sku": "BEV-1", "barcode": "5000112", "category": "Drinks",
                "price": 120, "cost": 80,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.get("/api/product/barcode/5000112", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["sku"], "BEV-1");

    let (status, _) = app.get("/api/product/barcode/0000000", &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_product_import_reports_row_errors() {
    let app = TestApp::new().await;
    let admin = app.bootstrap_admin().await;

    let csv = "name,sku,category,basePrice,cost,stock\n\
               Cola,BEV-1,Drinks,1.20,0.80,10\n\
               Cola Again,BEV-1,Drinks,1.20,0.80,10\n\
               Water,,Drinks,0.90,0.40,5\n";

    let (status, body) = app.upload("/api/product/import", &admin, "products.csv", csv).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["added"], 1);
    assert_eq!(body["skipped"], 2);

    let errors = body["errors"].as_array().unwrap();
    assert!(errors[0].as_str().unwrap().starts_with("Row 3:"));
    assert!(errors[1].as_str().unwrap().starts_with("Row 4:"));

    let (_, product) = app.get("/api/product/barcode/BEV-1", &admin).await;
    assert_eq!(product["data"]["basePrice"], 120);
    assert_eq!(product["data"]["stock"], 10);
}

#[tokio::test]
async fn test_import_rejects_bad_uploads() {
    let app = TestApp::new().await;
    let admin = app.bootstrap_admin().await;

    let (status, body) = app.upload("/api/product/import", &admin, "products.csv", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "File is empty");

    let (status, _) = app
        .upload("/api/product/import", &admin, "products.txt", "name\nCola\n")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_receiving_stock_makes_product_available() {
    let app = TestApp::new().await;
    let admin = app.bootstrap_admin().await;

    let (status, body) = app
        .post(
            "/api/product",
            &admin,
            json!({
                "name": "Rice", "sku": "GRO-1", "category": "Groceries",
                "price": 2450, "cost": 1800, "stock": 0, "status": "out of stock",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(
            &format!("/api/product/{}/receive-stock", id),
            &admin,
            json!({ "quantityReceived": 10, "costPerUnit": 1750, "notes": "Weekly delivery" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["product"]["stock"], 10);
    assert_eq!(body["data"]["product"]["status"], "available");
    assert_eq!(body["data"]["receipt"]["totalCost"], 17_500);

    let (status, body) = app
        .get(&format!("/api/product/{}/stock-history", id), &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_purchase_order_receipt_adds_stock_once() {
    let app = TestApp::new().await;
    let admin = app.bootstrap_admin().await;
    let product = app.create_product(&admin, "A1", "General", 500, 2).await;
    let product_id = product["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(
            "/api/supplier",
            &admin,
            json!({ "name": "Metro Wholesale", "phone": "+92 300 1234567", "email": "orders@metro.example" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let supplier_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(
            "/api/purchase/order",
            &admin,
            json!({
                "product": product_id,
                "supplier": supplier_id,
                "quantityReceived": 4,
                "costPerUnit": 300,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["status"], "pending");
    let po_id = body["data"]["id"].as_str().unwrap().to_string();
    let status_uri = format!("/api/purchase/order/{}/status", po_id);

    let (status, _) = app
        .request(Method::PUT, &status_uri, Some(&admin), Some(json!({ "status": "received" })))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(Method::PUT, &status_uri, Some(&admin), Some(json!({ "status": "received" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, product) = app.get(&format!("/api/product/{}", product_id), &admin).await;
    assert_eq!(product["stock"], 6);

    let (_, by_supplier) = app
        .get(&format!("/api/purchase/order/supplier/{}", supplier_id), &admin)
        .await;
    assert_eq!(by_supplier.as_array().unwrap().len(), 1);

    let (status, _) = app
        .post(
            "/api/purchase/order",
            &admin,
            json!({
                "product": "missing",
                "supplier": supplier_id,
                "quantityReceived": 1,
                "costPerUnit": 1,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_supplier_import_skips_duplicate_contacts() {
    let app = TestApp::new().await;
    let admin = app.bootstrap_admin().await;

    let csv = "name,email,phone\n\
               Metro,orders@metro.example,0300 1234567\n\
               Metro Copy,orders@metro.example,0300 7654321\n";

    let (status, body) = app.upload("/api/supplier/import", &admin, "suppliers.csv", csv).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["added"], 1);
    assert_eq!(body["skipped"], 1);
    assert!(body["errors"][0].as_str().unwrap().starts_with("Row 3:"));
}

#[tokio::test]
async fn test_category_lifecycle() {
    let app = TestApp::new().await;
    let admin = app.bootstrap_admin().await;

    let (status, body) = app.post("/api/category", &admin, json!({ "name": "Snacks" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app.post("/api/category", &admin, json!({ "name": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/category/{}", id),
            Some(&admin),
            Some(json!({ "name": "Crisps" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Crisps");

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/category/{}", id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, list) = app.get("/api/category", &admin).await;
    assert!(list.as_array().unwrap().is_empty());
}
