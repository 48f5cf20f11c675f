//! End-to-end registration against a real Postgres.
//!
//! Set `UGPORTAL_TEST_DSN` to a database the suite may create tables in; the
//! tests are skipped when it is unset. Each run inserts students with unique
//! roll numbers so the suite can be repeated against the same database.

use anyhow::{anyhow, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{
    env,
    sync::{Arc, Mutex},
};
use tokio::{net::TcpListener, sync::OnceCell};
use ugportal::{
    client::{HttpPortalApi, PortalApi, PortalError, RegistrationWorkflow, Route},
    portal::{
        self,
        otp::OtpSender,
        types::{SetPasswordRequest, VERIFICATION_TOKEN_HEADER},
        PortalConfig, PortalState,
    },
};
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

// Concurrent `CREATE TABLE IF NOT EXISTS` can still collide in Postgres.
static SCHEMA: OnceCell<()> = OnceCell::const_new();

#[derive(Clone, Default)]
struct CapturingSender {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl CapturingSender {
    fn last_code_for(&self, email: &str) -> Result<String> {
        let sent = self.sent.lock().map_err(|_| anyhow!("sender lock poisoned"))?;
        sent.iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
            .context("no passcode captured")
    }

    fn count(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or_default()
    }
}

impl OtpSender for CapturingSender {
    fn send(&self, email: &str, code: &str) -> Result<()> {
        let mut sent = self.sent.lock().map_err(|_| anyhow!("sender lock poisoned"))?;
        sent.push((email.to_string(), code.to_string()));
        Ok(())
    }
}

struct Student {
    roll_number: String,
    email: String,
}

async fn apply_schema(pool: &PgPool) -> Result<()> {
    SCHEMA
        .get_or_try_init(|| create_tables(pool))
        .await
        .map(|_| ())
}

async fn create_tables(pool: &PgPool) -> Result<()> {
    for (index, statement) in split_sql_statements(SCHEMA_SQL).iter().enumerate() {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute schema statement {}", index + 1))?;
    }
    Ok(())
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    statements
}

async fn insert_student(pool: &PgPool, name: &str) -> Result<Student> {
    let suffix = Uuid::new_v4().simple().to_string();
    let student = Student {
        roll_number: format!("IT{}", &suffix[..12]),
        email: format!("{}@students.example.edu", &suffix[..16]),
    };

    sqlx::query(
        "INSERT INTO students (roll_number, name, email, semester, branch) VALUES ($1, $2, $3, '3', 'CS')",
    )
    .bind(&student.roll_number)
    .bind(name)
    .bind(&student.email)
    .execute(pool)
    .await
    .context("Failed to insert student")?;

    Ok(student)
}

async fn spawn_portal(pool: PgPool, sender: CapturingSender) -> Result<String> {
    let state = PortalState::new(PortalConfig::default(), Arc::new(sender));
    let app = portal::app(pool, Arc::new(state))?;

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service()).await;
    });

    Ok(format!("http://{addr}"))
}

fn wrong_code(code: &str) -> &'static str {
    if code == "000000" {
        "111111"
    } else {
        "000000"
    }
}

#[tokio::test]
async fn registration_flow_end_to_end() -> Result<()> {
    let Ok(dsn) = env::var("UGPORTAL_TEST_DSN") else {
        eprintln!("UGPORTAL_TEST_DSN not set; skipping");
        return Ok(());
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&dsn)
        .await
        .context("Failed to connect to test database")?;
    apply_schema(&pool).await?;

    let student = insert_student(&pool, "A").await?;
    let other = insert_student(&pool, "B").await?;

    let sender = CapturingSender::default();
    let base_url = spawn_portal(pool.clone(), sender.clone()).await?;
    let api = HttpPortalApi::new(&base_url)?;

    // Unknown addresses get the same answer and no passcode.
    api.request_otp("nobody@students.example.edu").await?;
    assert_eq!(sender.count(), 0);

    api.request_otp(&student.email).await?;
    let code = sender.last_code_for(&student.email)?;
    assert_eq!(code.len(), 6);

    assert!(matches!(
        api.verify_otp(&student.email, wrong_code(&code)).await,
        Err(PortalError::Validation(_))
    ));
    let grant = api.verify_otp(&student.email, &code).await?;

    // Single use.
    assert!(matches!(
        api.verify_otp(&student.email, &code).await,
        Err(PortalError::Validation(_))
    ));

    let api = HttpPortalApi::new(&base_url)?;
    let mut workflow = RegistrationWorkflow::mount(api, Some(grant))
        .map_err(|rejection| anyhow!(rejection.notice))?;
    assert_eq!(workflow.view().email.value, student.email);

    workflow.set_roll_number(&student.roll_number);
    workflow.find_student().await?;
    let view = workflow.view();
    assert_eq!(view.name.value, "A");
    assert_eq!(view.semester.value, "3");
    assert_eq!(view.branch.value, "CS");

    workflow.set_password("Abc12345!");
    workflow.set_confirm_password("Abc12345!");
    assert_eq!(workflow.submit_password().await?, Route::Login);

    let api = HttpPortalApi::new(&base_url)?;

    // Tokens the server never issued are refused.
    let forged = api
        .set_password(
            &SetPasswordRequest {
                roll_number: student.roll_number.clone(),
                password: "Another1!".to_string(),
            },
            &SecretString::from("not-a-real-token".to_string()),
        )
        .await;
    assert!(matches!(forged, Err(PortalError::Verification(_))));

    let profile = api
        .login(
            &student.roll_number,
            &SecretString::from("Abc12345!".to_string()),
        )
        .await?;
    assert_eq!(profile.email, student.email);

    assert!(matches!(
        api.login(
            &student.roll_number,
            &SecretString::from("wrong".to_string())
        )
        .await,
        Err(PortalError::Verification(_))
    ));

    // A token issued for one student cannot set another student's password.
    api.request_otp(&other.email).await?;
    let other_code = sender.last_code_for(&other.email)?;
    let other_grant = api.verify_otp(&other.email, &other_code).await?;
    let mismatch = api
        .set_password(
            &SetPasswordRequest {
                roll_number: student.roll_number.clone(),
                password: "Hijack1!".to_string(),
            },
            other_grant.token(),
        )
        .await;
    assert!(matches!(mismatch, Err(PortalError::Verification(_))));

    // The student that never set a password cannot log in.
    assert!(api
        .login(&other.roll_number, &SecretString::from("x".to_string()))
        .await
        .is_err());

    assert_eq!(
        api.lookup_student("ZZ-does-not-exist").await,
        Err(PortalError::NotFound)
    );

    Ok(())
}

async fn connect(dsn: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(dsn)
        .await
        .context("Failed to connect to test database")?;
    apply_schema(&pool).await?;
    Ok(pool)
}

#[tokio::test]
async fn verification_token_is_single_use() -> Result<()> {
    let Ok(dsn) = env::var("UGPORTAL_TEST_DSN") else {
        eprintln!("UGPORTAL_TEST_DSN not set; skipping");
        return Ok(());
    };

    let pool = connect(&dsn).await?;
    let student = insert_student(&pool, "Reuse").await?;
    let sender = CapturingSender::default();
    let base_url = spawn_portal(pool, sender.clone()).await?;
    let api = HttpPortalApi::new(&base_url)?;

    api.request_otp(&student.email).await?;
    let code = sender.last_code_for(&student.email)?;
    let grant = api.verify_otp(&student.email, &code).await?;

    let client = reqwest::Client::new();
    let url = format!("{base_url}/api/student/password");
    let body = json!({"rollNumber": student.roll_number, "password": "Abc12345!"});

    let response = client
        .post(&url)
        .header(VERIFICATION_TOKEN_HEADER, grant.token().expose_secret())
        .json(&body)
        .send()
        .await?;
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let response = client
        .post(&url)
        .header(VERIFICATION_TOKEN_HEADER, grant.token().expose_secret())
        .json(&json!({"rollNumber": student.roll_number, "password": "Other1234!"}))
        .send()
        .await?;
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

    // The first password is the one that stuck.
    api.login(
        &student.roll_number,
        &SecretString::from("Abc12345!".to_string()),
    )
    .await?;

    Ok(())
}

#[tokio::test]
async fn passcode_locks_after_max_attempts() -> Result<()> {
    let Ok(dsn) = env::var("UGPORTAL_TEST_DSN") else {
        eprintln!("UGPORTAL_TEST_DSN not set; skipping");
        return Ok(());
    };

    let pool = connect(&dsn).await?;
    let student = insert_student(&pool, "Guesser").await?;
    let sender = CapturingSender::default();
    let base_url = spawn_portal(pool, sender.clone()).await?;
    let api = HttpPortalApi::new(&base_url)?;

    api.request_otp(&student.email).await?;
    let code = sender.last_code_for(&student.email)?;

    for _ in 0..PortalConfig::default().otp_max_attempts() {
        assert!(matches!(
            api.verify_otp(&student.email, wrong_code(&code)).await,
            Err(PortalError::Validation(_))
        ));
    }

    // The right code no longer works once the attempts are used up.
    assert!(matches!(
        api.verify_otp(&student.email, &code).await,
        Err(PortalError::Validation(_))
    ));

    // A fresh passcode replaces the locked one.
    api.request_otp(&student.email).await?;
    let fresh = sender.last_code_for(&student.email)?;
    api.verify_otp(&student.email, &fresh).await?;

    Ok(())
}

#[tokio::test]
async fn legacy_register_endpoint_dispatches_on_body() -> Result<()> {
    let Ok(dsn) = env::var("UGPORTAL_TEST_DSN") else {
        eprintln!("UGPORTAL_TEST_DSN not set; skipping");
        return Ok(());
    };

    let pool = connect(&dsn).await?;
    let student = insert_student(&pool, "Legacy").await?;

    let base_url = spawn_portal(pool, CapturingSender::default()).await?;
    let client = reqwest::Client::new();
    let url = format!("{base_url}/api/student/register");

    let response = client
        .post(&url)
        .json(&json!({"rollNumber": student.roll_number}))
        .send()
        .await?;
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["name"], "Legacy");
    assert_eq!(body["sem"], "3");

    let response = client
        .post(&url)
        .json(&json!({"rollNumber": student.roll_number, "password": "Abc12345!"}))
        .send()
        .await?;
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

    let response = client
        .post(&url)
        .json(&json!({"rollNumber": student.roll_number, "password": null}))
        .send()
        .await?;
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    Ok(())
}
