//! Full CRUD lifecycle against a live server.
//!
//! Starts the server on a random port over a file store in a temp directory,
//! then drives every client operation over real HTTP using ureq.

use std::sync::Arc;

use todo_client::{ApiError, CreateTodo, HttpMethod, HttpRequest, HttpResponse, TodoClient, UpdateTodo};
use todo_core::{Environment, FileStore, TodoService};

/// Execute an `HttpRequest` using ureq and return an `HttpResponse`.
///
/// Disables ureq's automatic status-code-as-error behavior so 4xx/5xx
/// responses are returned as data for the client to interpret.
fn execute(req: HttpRequest) -> HttpResponse {
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();

    let mut response = match (req.method, req.body) {
        (HttpMethod::Get, _) => agent.get(&req.url).call(),
        (HttpMethod::Delete, _) => agent.delete(&req.url).call(),
        (HttpMethod::Post, Some(body)) => {
            agent.post(&req.url).content_type("application/json").send(body.as_bytes())
        }
        (HttpMethod::Post, None) => agent.post(&req.url).send_empty(),
        (HttpMethod::Put, Some(body)) => {
            agent.put(&req.url).content_type("application/json").send(body.as_bytes())
        }
        (HttpMethod::Put, None) => agent.put(&req.url).send_empty(),
    }
    .expect("HTTP transport error");

    let status = response.status().as_u16();
    let body = response.body_mut().read_to_string().unwrap_or_default();
    HttpResponse::new(status, body)
}

/// Spawn the server on its own runtime thread; returns its base URL.
fn start_server(dir: &tempfile::TempDir) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();
    let data_file = dir.path().join("db.json");

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let store = FileStore::open(&data_file).await.unwrap();
            let router = todo_server::app(TodoService::new(Arc::new(store)), Environment::Test);
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            todo_server::run(listener, router, std::future::pending()).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

#[test]
fn crud_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let client = TodoClient::new(&start_server(&dir));

    // Health first: also waits out the race with server startup.
    let health = client.parse_health(execute(client.build_health())).unwrap();
    assert_eq!(health.status, "OK");
    assert_eq!(health.service, "todo-server");
    assert_eq!(health.environment, "test");
    assert_eq!(health.storage, "file");
    assert!(health.timestamp <= chrono::Utc::now());

    // List — should be empty.
    let todos = client.parse_list_todos(execute(client.build_list_todos())).unwrap();
    assert!(todos.is_empty(), "expected empty list");

    // Create a todo; text is trimmed by the server.
    let create_input = CreateTodo {
        text: "  Integration test  ".to_string(),
        completed: false,
    };
    let req = client.build_create_todo(&create_input).unwrap();
    let created = client.parse_create_todo(execute(req)).unwrap();
    assert_eq!(created.text, "Integration test");
    assert!(!created.completed);
    let id = created.id;

    // Get the created todo.
    let fetched = client.parse_get_todo(execute(client.build_get_todo(id))).unwrap();
    assert_eq!(fetched, created);

    // Update text.
    let update_input = UpdateTodo {
        text: Some("Updated text".to_string()),
        completed: None,
    };
    let req = client.build_update_todo(id, &update_input).unwrap();
    let updated = client.parse_update_todo(execute(req)).unwrap();
    assert_eq!(updated.text, "Updated text");
    assert!(!updated.completed);

    // Update completed.
    let update_input = UpdateTodo {
        text: None,
        completed: Some(true),
    };
    let req = client.build_update_todo(id, &update_input).unwrap();
    let updated = client.parse_update_todo(execute(req)).unwrap();
    assert_eq!(updated.text, "Updated text");
    assert!(updated.completed);

    // Invalid update is rejected with the server's message.
    let update_input = UpdateTodo {
        text: Some("   ".to_string()),
        completed: None,
    };
    let req = client.build_update_todo(id, &update_input).unwrap();
    let err = client.parse_update_todo(execute(req)).unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(ref msg) if msg == "Todo text cannot be empty"));

    // Delete returns the removed record.
    let deleted = client.parse_delete_todo(execute(client.build_delete_todo(id))).unwrap();
    assert_eq!(deleted, updated);

    // Get after delete — NotFound.
    let err = client.parse_get_todo(execute(client.build_get_todo(id))).unwrap_err();
    assert!(matches!(err, ApiError::NotFound));

    // Delete again — NotFound.
    let err = client.parse_delete_todo(execute(client.build_delete_todo(id))).unwrap_err();
    assert!(matches!(err, ApiError::NotFound));
}
