
use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::{
    Error, ExecutionGateway, ExecutionRequest, NormalizedResponse, RequesterId,
    INVALID_CODE_MESSAGE, UNAVAILABLE_MESSAGE,
};
use fixtures::{code_samples, defaults::test_config, responses};

fn request(language: &str, code: &str, input: Option<&str>) -> ExecutionRequest {
    ExecutionRequest {
        language: language.to_string(),
        code: code.to_string(),
        input: input.map(str::to_string),
        requester: RequesterId::new("user-42"),
    }
}

#[tokio::test]
async fn test_python_round_trip() -> Result<(), Error> {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/execute"))
        .and(body_partial_json(json!({
            "language": "python",
            "version": "3.10.0",
            "files": [{ "name": "main.py", "content": code_samples::PYTHON_ADD }],
            "stdin": ""
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(responses::run_ok(
            "python", "3.10.0", "2\n",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = ExecutionGateway::new(test_config(mock_server.uri()))?;
    let executed = gateway
        .execute(request("python", code_samples::PYTHON_ADD, Some("")))
        .await?;

    let body = serde_json::to_value(&executed.response).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["stdout"], "2\n");
    assert_eq!(body["stderr"], "");
    assert_eq!(body["compile_output"], "");
    assert_eq!(body["compile_error"], "");
    assert_eq!(body["exit_code"], 0);
    assert_eq!(body["signal"], serde_json::Value::Null);
    assert_eq!(body["language"], "python");
    assert_eq!(body["version"], "3.10.0");
    assert!(body["execution_time"].is_u64());
    Ok(())
}

#[tokio::test]
async fn test_stdin_is_forwarded() -> Result<(), Error> {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/execute"))
        .and(body_partial_json(json!({ "stdin": "Ada\n" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(responses::run_ok(
            "python",
            "3.10.0",
            "Hello, Ada!\n",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = ExecutionGateway::new(test_config(mock_server.uri()))?;
    let executed = gateway
        .execute(request("python", code_samples::PYTHON_WITH_INPUT, Some("Ada\n")))
        .await?;

    match executed.response {
        NormalizedResponse::Success(output) => assert_eq!(output.stdout, "Hello, Ada!\n"),
        other => panic!("expected success, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_java_uses_main_class_file_name() -> Result<(), Error> {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/execute"))
        .and(body_partial_json(json!({
            "language": "java",
            "version": "15.0.2",
            "files": [{ "name": "Main.java" }],
            "run_memory_limit": 268435456u64
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(responses::run_ok(
            "java",
            "15.0.2",
            "Hello from Java!\n",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = ExecutionGateway::new(test_config(mock_server.uri()))?;
    let executed = gateway
        .execute(request("java", code_samples::JAVA_HELLO, None))
        .await?;
    assert!(executed.response.is_success());
    Ok(())
}

#[tokio::test]
async fn test_compile_error_is_a_successful_execution() -> Result<(), Error> {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/execute"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(responses::compile_error("main.cpp:4:1: error: expected ';'")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = ExecutionGateway::new(test_config(mock_server.uri()))?;
    let executed = gateway
        .execute(request("cpp", code_samples::CPP_BROKEN, None))
        .await?;

    match executed.response {
        NormalizedResponse::Success(output) => {
            assert_eq!(output.compile_error, "main.cpp:4:1: error: expected ';'");
            assert_eq!(output.stdout, "");
            assert_eq!(output.exit_code, None);
            assert_eq!(output.language, "cpp");
        }
        other => panic!("expected success envelope, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_remote_rejection_single_call() -> Result<(), Error> {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/execute"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "c++-10.2.0 runtime is unknown"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = ExecutionGateway::new(test_config(mock_server.uri()))?;
    let executed = gateway
        .execute(request("cpp", code_samples::CPP_BROKEN, None))
        .await?;

    match executed.response {
        NormalizedResponse::Failure(failure) => {
            assert!(!failure.success);
            assert_eq!(failure.error, INVALID_CODE_MESSAGE);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_transient_failures_then_success() -> Result<(), Error> {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/execute"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v2/execute"))
        .respond_with(ResponseTemplate::new(200).set_body_json(responses::run_ok(
            "python", "3.10.0", "2\n",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = ExecutionGateway::new(test_config(mock_server.uri()))?;

    let started = Instant::now();
    let executed = gateway
        .execute(request("python", code_samples::PYTHON_ADD, None))
        .await?;

    assert!(executed.response.is_success());
    // Backoffs of 20ms and 40ms.
    assert!(started.elapsed() >= Duration::from_millis(60));
    Ok(())
}

#[tokio::test]
async fn test_exhausted_retries_report_unavailable() -> Result<(), Error> {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/execute"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream connect error"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let gateway = ExecutionGateway::new(test_config(mock_server.uri()))?;
    let executed = gateway
        .execute(request("python", code_samples::PYTHON_ADD, None))
        .await?;

    match executed.response {
        NormalizedResponse::Failure(failure) => {
            assert_eq!(failure.error, UNAVAILABLE_MESSAGE);
            assert!(!failure.error.contains("upstream"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_slow_remote_times_out_each_attempt() -> Result<(), Error> {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/execute"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(responses::run_ok("python", "3.10.0", "late\n"))
                .set_delay(Duration::from_secs(3)),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let config = test_config(mock_server.uri()).with_max_retries(2);
    let gateway = ExecutionGateway::new(config)?;

    let started = Instant::now();
    let executed = gateway
        .execute(request("python", code_samples::PYTHON_ADD, None))
        .await?;

    assert!(!executed.response.is_success());
    // Two 500ms attempts plus one 20ms backoff, well below the remote delay.
    assert!(started.elapsed() < Duration::from_secs(3));
    Ok(())
}

#[tokio::test]
async fn test_connection_refused_is_unavailable() -> Result<(), Error> {
    // Nothing listens on port 9 locally.
    let gateway = ExecutionGateway::new(test_config("http://127.0.0.1:9".to_string()))?;

    let executed = gateway
        .execute(request("c", "int main(){return 0;}", None))
        .await?;

    match executed.response {
        NormalizedResponse::Failure(failure) => assert_eq!(failure.error, UNAVAILABLE_MESSAGE),
        other => panic!("expected failure, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_invalid_requests_make_no_network_call() -> Result<(), Error> {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let gateway = ExecutionGateway::new(test_config(mock_server.uri()))?;

    let too_big = "#".repeat(50_001);
    let cases = vec![
        (request("python", "", None), "missing code"),
        (request("python", &too_big, None), "code too large"),
        (request("ruby", "puts 1", None), "unsupported language"),
        (
            request("python", code_samples::PYTHON_WITH_INPUT, Some(&"x".repeat(10_001))),
            "input too large",
        ),
    ];

    for (req, expected) in cases {
        match gateway.execute(req).await {
            Err(Error::InvalidInput(reason)) => assert_eq!(reason, expected),
            other => panic!("expected invalid input, got {:?}", other),
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_rate_limit_blocks_remote() -> Result<(), Error> {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/execute"))
        .respond_with(ResponseTemplate::new(200).set_body_json(responses::run_ok(
            "python", "3.10.0", "2\n",
        )))
        .expect(2)
        .mount(&mock_server)
        .await;

    let config = test_config(mock_server.uri()).with_rate_limit(Duration::from_secs(600), 2);
    let gateway = ExecutionGateway::new(config)?;

    for _ in 0..2 {
        gateway
            .execute(request("python", code_samples::PYTHON_ADD, None))
            .await?;
    }

    let third = gateway
        .execute(request("python", code_samples::PYTHON_ADD, None))
        .await;
    assert!(matches!(third, Err(Error::RateLimited { limit: 2, .. })));

    // Other identities keep their own window.
    let other = RequesterId::new("user-7");
    assert!(matches!(
        gateway.rate_limiter().admit(&other),
        crate::Admission::Admitted(_)
    ));
    Ok(())
}

#[tokio::test]
async fn test_health_against_remote() -> Result<(), Error> {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/runtimes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(responses::runtimes(17)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = ExecutionGateway::new(test_config(mock_server.uri()))?;
    let report = gateway.health().await;

    assert!(report.is_healthy());
    assert_eq!(report.remote_runtime_count, Some(17));
    assert_eq!(report.available_languages.len(), 5);
    Ok(())
}

#[tokio::test]
async fn test_health_slow_remote_is_unhealthy() -> Result<(), Error> {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/runtimes"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(responses::runtimes(3))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let gateway = ExecutionGateway::new(test_config(mock_server.uri()))?;
    let report = gateway.health().await;

    assert!(!report.is_healthy());
    assert_eq!(report.remote_runtime_count, None);
    Ok(())
}
