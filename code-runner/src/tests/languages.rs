//! Runs through the built-in toolchain table. Each test is skipped when its
//! toolchain is not installed on the host.

use super::{
    fixtures::{code_samples::*, test_scenarios::*},
    utils::defaults::{default_test_limits, short_timeout_limits, timeout_overhead},
    utils::services::builtin_service,
    utils::skip_if_not_available,
};
use crate::{ExecutionMode, ExecutionRequest, FailureReason, ResourceLimits, Result};
use std::time::{Duration, Instant};

/// JVM start-up and a cold Go build cache need more headroom
fn slow_toolchain_limits() -> ResourceLimits {
    ResourceLimits {
        wall_clock_timeout: Duration::from_secs(60),
        cpu_time: 60,
        ..default_test_limits()
    }
}

async fn run(language: &str, code: &str, stdin: &str, limits: ResourceLimits) -> Result<crate::ExecutionOutcome> {
    let test = builtin_service(ExecutionMode::Local, limits).await?;
    let outcome = test
        .service
        .execute(ExecutionRequest::new(language, code).with_stdin(stdin))
        .await;
    assert!(
        test.leftover_artifacts().is_empty(),
        "leftovers: {:?}",
        test.leftover_artifacts()
    );
    Ok(outcome)
}

#[tokio::test]
async fn test_python_hello() -> Result<()> {
    if skip_if_not_available(&["python3"]) {
        return Ok(());
    }
    let outcome = run("python", PYTHON_HELLO, "", default_test_limits()).await?;
    assert!(outcome.succeeded, "{:?}", outcome);
    assert_eq!(outcome.stdout, "ok");
    Ok(())
}

#[tokio::test]
async fn test_python_echo() -> Result<()> {
    if skip_if_not_available(&["python3"]) {
        return Ok(());
    }
    let outcome = run("py", PYTHON_ECHO, "hello\n", default_test_limits()).await?;
    assert!(outcome.succeeded, "{:?}", outcome);
    assert_eq!(outcome.stdout, "hello");
    Ok(())
}

#[tokio::test]
async fn test_python_runtime_error() -> Result<()> {
    if skip_if_not_available(&["python3"]) {
        return Ok(());
    }
    let outcome = run("python", PYTHON_RUNTIME_ERROR, "", default_test_limits()).await?;
    assert!(!outcome.succeeded);
    assert_eq!(outcome.failure_reason, Some(FailureReason::RuntimeFailure));
    assert!(outcome.error_message().contains("ValueError: boom"));
    Ok(())
}

#[tokio::test]
async fn test_python_infinite_loop() -> Result<()> {
    if skip_if_not_available(&["python3"]) {
        return Ok(());
    }
    let limits = short_timeout_limits();
    let started = Instant::now();
    let outcome = run("python", PYTHON_INFINITE_LOOP, "", limits.clone()).await?;

    assert!(started.elapsed() < limits.wall_clock_timeout + timeout_overhead());
    assert_eq!(outcome.failure_reason, Some(FailureReason::Timeout));
    assert_eq!(outcome.error_message(), "execution timed out");
    Ok(())
}

#[tokio::test]
async fn test_javascript_hello() -> Result<()> {
    if skip_if_not_available(&["node"]) {
        return Ok(());
    }
    let outcome = run("javascript", JS_HELLO, "", default_test_limits()).await?;
    assert!(outcome.succeeded, "{:?}", outcome);
    assert_eq!(outcome.stdout, "ok");
    Ok(())
}

#[tokio::test]
async fn test_javascript_echo() -> Result<()> {
    if skip_if_not_available(&["node"]) {
        return Ok(());
    }
    let outcome = run("node", JS_ECHO, "hello\n", default_test_limits()).await?;
    assert!(outcome.succeeded, "{:?}", outcome);
    assert_eq!(outcome.stdout, "hello");
    Ok(())
}

#[tokio::test]
async fn test_java_hello() -> Result<()> {
    if skip_if_not_available(&["java"]) {
        return Ok(());
    }
    let outcome = run("java", JAVA_HELLO, "", slow_toolchain_limits()).await?;
    assert!(outcome.succeeded, "{:?}", outcome);
    assert_eq!(outcome.stdout, "ok");
    Ok(())
}

#[tokio::test]
async fn test_c_hello() -> Result<()> {
    if skip_if_not_available(&["gcc"]) {
        return Ok(());
    }
    let outcome = run("c", C_HELLO, "", default_test_limits()).await?;
    assert!(outcome.succeeded, "{:?}", outcome);
    assert_eq!(outcome.stdout, "ok");
    Ok(())
}

#[tokio::test]
async fn test_c_echo() -> Result<()> {
    if skip_if_not_available(&["gcc"]) {
        return Ok(());
    }
    let outcome = run("c", C_ECHO, "hello\n", default_test_limits()).await?;
    assert!(outcome.succeeded, "{:?}", outcome);
    assert_eq!(outcome.stdout, "hello");
    Ok(())
}

#[tokio::test]
async fn test_c_compile_error() -> Result<()> {
    if skip_if_not_available(&["gcc"]) {
        return Ok(());
    }
    let outcome = run("c", C_SYNTAX_ERROR, "", default_test_limits()).await?;
    assert!(!outcome.succeeded);
    assert_eq!(outcome.failure_reason, Some(FailureReason::CompileFailure));
    assert!(outcome.error_message().contains("error"));
    Ok(())
}

#[tokio::test]
async fn test_cpp_hello() -> Result<()> {
    if skip_if_not_available(&["g++"]) {
        return Ok(());
    }
    let outcome = run("c++", CPP_HELLO, "", slow_toolchain_limits()).await?;
    assert!(outcome.succeeded, "{:?}", outcome);
    assert_eq!(outcome.stdout, "ok");
    Ok(())
}

#[tokio::test]
async fn test_go_hello() -> Result<()> {
    if skip_if_not_available(&["go"]) {
        return Ok(());
    }
    let outcome = run("go", GO_HELLO, "", slow_toolchain_limits()).await?;
    assert!(outcome.succeeded, "{:?}", outcome);
    assert_eq!(outcome.stdout, "ok");
    Ok(())
}

#[tokio::test]
async fn test_go_compile_error() -> Result<()> {
    if skip_if_not_available(&["go"]) {
        return Ok(());
    }
    let outcome = run("golang", GO_SYNTAX_ERROR, "", slow_toolchain_limits()).await?;
    assert!(!outcome.succeeded);
    assert_eq!(outcome.failure_reason, Some(FailureReason::CompileFailure));
    Ok(())
}
