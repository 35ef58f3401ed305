//! API integration tests
//!
//! These run against a live server backed by a migrated database:
//! `cargo run` in one shell, then `cargo test -- --ignored`.

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

fn base_url() -> String {
    std::env::var("BOOKSHELF_TEST_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

/// Name that will not collide with rows left by earlier runs
fn unique(prefix: &str) -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{}-{}", prefix, nanos)
}

async fn post(client: &Client, path: &str, body: Value) -> (StatusCode, Value) {
    let response = client
        .post(format!("{}{}", base_url(), path))
        .json(&body)
        .send()
        .await
        .expect("Failed to send request");
    let status = response.status();
    let body = response.json().await.unwrap_or(Value::Null);
    (status, body)
}

async fn get(client: &Client, path: &str) -> (StatusCode, Value) {
    let response = client
        .get(format!("{}{}", base_url(), path))
        .send()
        .await
        .expect("Failed to send request");
    let status = response.status();
    let body = response.json().await.unwrap_or(Value::Null);
    (status, body)
}

async fn delete(client: &Client, path: &str) -> (StatusCode, Value) {
    let response = client
        .delete(format!("{}{}", base_url(), path))
        .send()
        .await
        .expect("Failed to send request");
    let status = response.status();
    let body = response.json().await.unwrap_or(Value::Null);
    (status, body)
}

async fn create_category(client: &Client) -> i64 {
    let (status, body) = post(client, "/categories", json!({ "name": unique("Fiction") })).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().expect("No category ID")
}

async fn create_user(client: &Client) -> i64 {
    let (status, body) = post(
        client,
        "/users",
        json!({ "name": "Test Reader", "email": format!("{}@example.org", unique("reader")) }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().expect("No user ID")
}

async fn create_book(client: &Client, category_id: i64, stock: i64) -> i64 {
    let (status, body) = post(
        client,
        "/books",
        json!({
            "title": unique("Dune"),
            "author": "Frank Herbert",
            "price": 9.99,
            "stock": stock,
            "bookCategoryId": category_id
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().expect("No book ID")
}

async fn stock_of(client: &Client, book_id: i64) -> i64 {
    let (status, body) = get(client, &format!("/books/{}", book_id)).await;
    assert_eq!(status, StatusCode::OK);
    body["stock"].as_i64().expect("No stock")
}

async fn held_by(client: &Client, user_id: i64, book_id: i64) -> Option<i64> {
    let (status, body) = get(client, &format!("/users/{}/current-borrows", user_id)).await;
    assert_eq!(status, StatusCode::OK);
    body.as_array()
        .expect("current borrows array")
        .iter()
        .find(|row| row["bookId"].as_i64() == Some(book_id))
        .and_then(|row| row["quantity"].as_i64())
}

fn ledger(user_id: i64, book_id: i64, quantity: i64) -> Value {
    json!({ "userId": user_id, "bookId": book_id, "quantity": quantity })
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let (status, body) = get(&client, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness_check() {
    let client = Client::new();

    let (status, body) = get(&client, "/ready").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
#[ignore]
async fn test_borrow_return_walkthrough() {
    let client = Client::new();
    let category_id = create_category(&client).await;
    let user_id = create_user(&client).await;
    let book_id = create_book(&client, category_id, 5).await;

    // borrow 3 of 5
    let (status, body) = post(&client, "/borrow", ledger(user_id, book_id, 3)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["stock"], 2);
    assert_eq!(body["outstanding"], 3);
    assert_eq!(body["record"]["action"], "borrow");
    assert_eq!(held_by(&client, user_id, book_id).await, Some(3));

    // 3 more do not fit, nothing changes
    let (status, body) = post(&client, "/borrow", ledger(user_id, book_id, 3)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Insufficient stock"));
    assert_eq!(stock_of(&client, book_id).await, 2);
    assert_eq!(held_by(&client, user_id, book_id).await, Some(3));

    // partial return
    let (status, body) = post(&client, "/return", ledger(user_id, book_id, 2)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["stock"], 4);
    assert_eq!(body["outstanding"], 1);
    assert_eq!(held_by(&client, user_id, book_id).await, Some(1));

    // over-return is refused
    let (status, _) = post(&client, "/return", ledger(user_id, book_id, 2)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(stock_of(&client, book_id).await, 4);

    // full return removes the outstanding row
    let (status, body) = post(&client, "/return", ledger(user_id, book_id, 1)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["stock"], 5);
    assert_eq!(body["outstanding"], 0);
    assert_eq!(held_by(&client, user_id, book_id).await, None);

    // history holds exactly the accepted calls, newest first
    let (status, body) = get(&client, &format!("/borrow-records?bookId={}", book_id)).await;
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["return", "return", "borrow"]);

    let (_, body) = get(
        &client,
        &format!("/borrow-records?bookId={}&action=borrow", book_id),
    )
    .await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
#[ignore]
async fn test_form_encoded_numbers_are_accepted() {
    let client = Client::new();
    let category_id = create_category(&client).await;
    let user_id = create_user(&client).await;
    let book_id = create_book(&client, category_id, 2).await;

    let (status, body) = post(
        &client,
        "/borrow",
        json!({
            "userId": user_id.to_string(),
            "bookId": book_id.to_string(),
            "quantity": "2"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["stock"], 0);
}

#[tokio::test]
#[ignore]
async fn test_return_without_borrow() {
    let client = Client::new();
    let category_id = create_category(&client).await;
    let user_id = create_user(&client).await;
    let book_id = create_book(&client, category_id, 3).await;

    let (status, body) = post(&client, "/return", ledger(user_id, book_id, 1)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Nothing to return"));
    assert_eq!(stock_of(&client, book_id).await, 3);

    let (_, history) = get(&client, &format!("/borrow-records?bookId={}", book_id)).await;
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
#[ignore]
async fn test_invalid_quantities() {
    let client = Client::new();
    let category_id = create_category(&client).await;
    let user_id = create_user(&client).await;
    let book_id = create_book(&client, category_id, 3).await;

    for quantity in [json!(0), json!(-2), json!("two"), json!(1.5)] {
        let (status, body) = post(
            &client,
            "/borrow",
            json!({ "userId": user_id, "bookId": book_id, "quantity": quantity }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "quantity {}", quantity);
        assert!(body["error"].is_string());
    }

    assert_eq!(stock_of(&client, book_id).await, 3);
}

#[tokio::test]
#[ignore]
async fn test_unknown_user_or_book() {
    let client = Client::new();
    let category_id = create_category(&client).await;
    let user_id = create_user(&client).await;
    let book_id = create_book(&client, category_id, 3).await;

    let (status, _) = post(&client, "/borrow", ledger(i32::MAX as i64, book_id, 1)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post(&client, "/return", ledger(user_id, i32::MAX as i64, 1)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&client, &format!("/users/{}/current-borrows", i32::MAX)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(stock_of(&client, book_id).await, 3);
}

#[tokio::test]
#[ignore]
async fn test_delete_book_blocked_while_borrowed() {
    let client = Client::new();
    let category_id = create_category(&client).await;
    let user_id = create_user(&client).await;
    let book_id = create_book(&client, category_id, 4).await;

    let (status, _) = post(&client, "/borrow", ledger(user_id, book_id, 1)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = delete(&client, &format!("/books/{}", book_id)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("currently borrowed"));

    // book, history and outstanding loan are untouched
    assert_eq!(stock_of(&client, book_id).await, 3);
    assert_eq!(held_by(&client, user_id, book_id).await, Some(1));
    let (_, history) = get(&client, &format!("/borrow-records?bookId={}", book_id)).await;
    assert_eq!(history.as_array().unwrap().len(), 1);

    // once returned, delete cascades to history
    let (status, _) = post(&client, "/return", ledger(user_id, book_id, 1)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = delete(&client, &format!("/books/{}", book_id)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = get(&client, &format!("/books/{}", book_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, history) = get(&client, &format!("/borrow-records?bookId={}", book_id)).await;
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
#[ignore]
async fn test_book_validation() {
    let client = Client::new();
    let category_id = create_category(&client).await;

    let (status, body) = post(
        &client,
        "/books",
        json!({ "title": "  ", "author": "A", "price": 1, "stock": 1, "bookCategoryId": category_id }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("title"));

    let (status, _) = post(
        &client,
        "/books",
        json!({ "title": "T", "author": "A", "price": -1, "stock": 1, "bookCategoryId": category_id }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        &client,
        "/books",
        json!({ "title": "T", "author": "A", "price": 1, "stock": "lots", "bookCategoryId": category_id }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post(
        &client,
        "/books",
        json!({ "title": "T", "author": "A", "price": 1, "stock": 1, "bookCategoryId": i32::MAX }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Category"));
}

#[tokio::test]
#[ignore]
async fn test_update_book() {
    let client = Client::new();
    let category_id = create_category(&client).await;
    let book_id = create_book(&client, category_id, 1).await;

    let response = client
        .put(format!("{}/books/{}", base_url(), book_id))
        .json(&json!({
            "title": "  Children of Dune ",
            "author": "Frank Herbert",
            "price": "12.50",
            "stock": 7,
            "bookCategoryId": category_id
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["title"], "Children of Dune");
    assert_eq!(body["stock"], 7);
    assert_eq!(body["price"], 12.5);
}

#[tokio::test]
#[ignore]
async fn test_list_books_filter_and_search() {
    let client = Client::new();
    let category_id = create_category(&client).await;
    let other_category = create_category(&client).await;
    let marker = unique("Needle");

    let (status, _) = post(
        &client,
        "/books",
        json!({ "title": format!("The {}", marker), "author": "Someone", "price": 1, "stock": 1, "bookCategoryId": category_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    create_book(&client, other_category, 1).await;

    let (status, body) = get(
        &client,
        &format!("/books?search={}", marker.to_uppercase()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = get(&client, &format!("/books?categoryId={}", other_category)).await;
    let books = body.as_array().unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["bookCategoryId"], other_category);

    let (status, _) = get(&client, "/books?categoryId=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn test_category_count_unchanged_by_book_crud() {
    let client = Client::new();
    let category_id = create_category(&client).await;

    let (_, before) = get(&client, "/categories").await;
    let before = before.as_array().unwrap().len();

    let book_id = create_book(&client, category_id, 2).await;
    let (status, _) = delete(&client, &format!("/books/{}", book_id)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, after) = get(&client, "/categories").await;
    assert_eq!(after.as_array().unwrap().len(), before);
}

#[tokio::test]
#[ignore]
async fn test_category_delete_is_restricted() {
    let client = Client::new();
    let category_id = create_category(&client).await;
    let book_id = create_book(&client, category_id, 1).await;

    let (status, body) = delete(&client, &format!("/categories/{}", category_id)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("still has books"));

    let (status, _) = delete(&client, &format!("/books/{}", book_id)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = delete(&client, &format!("/categories/{}", category_id)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_user_email() {
    let client = Client::new();
    let email = format!("{}@example.org", unique("dup"));

    let (status, _) = post(&client, "/users", json!({ "name": "First", "email": email })).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = post(
        &client,
        "/users",
        json!({ "name": "Second", "email": email.to_uppercase() }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
}

#[tokio::test]
#[ignore]
async fn test_borrow_records_rejects_unknown_action() {
    let client = Client::new();

    let (status, body) = get(&client, "/borrow-records?action=lend").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
#[ignore]
async fn test_unknown_ids_reported_before_quantity() {
    let client = Client::new();
    let category_id = create_category(&client).await;
    let user_id = create_user(&client).await;
    let book_id = create_book(&client, category_id, 1).await;

    let (status, _) = post(&client, "/borrow", ledger(user_id, i32::MAX as i64, 0)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post(&client, "/return", ledger(i32::MAX as i64, book_id, -1)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post(&client, "/borrow", ledger(user_id, book_id, 0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_borrows_never_oversell() {
    const STOCK: i64 = 3;
    const CALLERS: usize = 10;

    let client = Client::new();
    let category_id = create_category(&client).await;
    let user_id = create_user(&client).await;
    let book_id = create_book(&client, category_id, STOCK).await;

    let mut calls = tokio::task::JoinSet::new();
    for _ in 0..CALLERS {
        let client = client.clone();
        calls.spawn(async move { post(&client, "/borrow", ledger(user_id, book_id, 1)).await.0 });
    }

    let mut accepted = 0;
    while let Some(status) = calls.join_next().await {
        let status = status.expect("borrow task panicked");
        if status == StatusCode::CREATED {
            accepted += 1;
        } else {
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
    }

    assert_eq!(accepted, STOCK);
    assert_eq!(stock_of(&client, book_id).await, 0);
    assert_eq!(held_by(&client, user_id, book_id).await, Some(STOCK));

    let (_, history) = get(&client, &format!("/borrow-records?bookId={}", book_id)).await;
    let borrowed: i64 = history
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["quantity"].as_i64().unwrap())
        .sum();
    assert_eq!(borrowed, STOCK);
}

#[tokio::test]
#[ignore]
async fn test_markup_in_titles_is_stored_as_text() {
    let client = Client::new();
    let category_id = create_category(&client).await;
    let title = "<img src=x onerror=alert(1)>";

    let (status, body) = post(
        &client,
        "/books",
        json!({ "title": title, "author": "Mallory", "price": 1, "stock": 1, "bookCategoryId": category_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["title"], title);

    // the page renders table cells and options as text nodes
    let page = client
        .get(format!("{}/", base_url()))
        .send()
        .await
        .expect("Failed to send request")
        .text()
        .await
        .expect("Failed to read page");
    assert!(page.contains("textContent"));
    assert!(!page.contains("innerHTML"));
}

#[tokio::test]
#[ignore]
async fn test_oversized_fields_are_rejected() {
    let client = Client::new();
    let category_id = create_category(&client).await;

    for body in [
        json!({ "title": "t".repeat(300), "author": "A", "price": 1, "stock": 1, "bookCategoryId": category_id }),
        json!({ "title": "T", "author": "A", "price": "123456789012.345", "stock": 1, "bookCategoryId": category_id }),
        json!({ "title": "T", "author": "A", "price": "1.999", "stock": 1, "bookCategoryId": category_id }),
        json!({ "title": "T", "author": "A", "price": 1, "stock": 2_000_000_000, "bookCategoryId": category_id }),
    ] {
        let (status, response) = post(&client, "/books", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(response["error"].is_string());
    }
}
