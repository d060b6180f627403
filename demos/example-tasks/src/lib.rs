//! A small set of example task handlers, registered together under the
//! module name [`MODULE_NAME`]. Demonstrates the handler shapes a real
//! deployment would register: a trivial success path, a default-filled
//! argument, a validation failure, a slow handler for exercising timeouts,
//! and a flaky one for exercising retries.

use serde::{Deserialize, Serialize};
use tasklib_core::{InitError, TaskOverrides, TaskQueue};

/// The name an operator passes to `--task-module` to pull this crate's
/// handlers into a worker or CLI binary.
pub const MODULE_NAME: &str = "example_tasks";

/// Register every handler in this module against `queue`.
pub fn register_tasks(queue: &mut TaskQueue) -> Result<(), InitError> {
    queue.register_fn("add", add, TaskOverrides::default())?;
    queue.register_fn("greet", greet, TaskOverrides::default())?;
    queue.register_fn("process_text", process_text, TaskOverrides::default())?;
    queue.register_fn(
        "slow_task",
        slow_task,
        TaskOverrides {
            max_retries: None,
            timeout_seconds: Some(5),
        },
    )?;
    queue.register_fn(
        "unreliable_task",
        unreliable_task,
        TaskOverrides {
            max_retries: Some(3),
            timeout_seconds: None,
        },
    )?;
    queue.register_fn("validate_positive", validate_positive, TaskOverrides::default())?;
    queue.register_fn("send_email", send_email, TaskOverrides::default())?;
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddArgs {
    pub a: i64,
    pub b: i64,
}

fn add(args: AddArgs) -> Result<i64, anyhow::Error> {
    Ok(args.a + args.b)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GreetArgs {
    pub name: String,
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

fn default_greeting() -> String {
    "Hello".to_string()
}

fn greet(args: GreetArgs) -> Result<String, anyhow::Error> {
    Ok(format!("{}, {}!", args.greeting, args.name))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessTextArgs {
    pub text: String,
}

#[derive(Debug, Serialize)]
struct TextStats {
    length: usize,
    words: usize,
    uppercase: usize,
    lowercase: usize,
}

fn process_text(args: ProcessTextArgs) -> Result<TextStats, anyhow::Error> {
    Ok(TextStats {
        length: args.text.chars().count(),
        words: args.text.split_whitespace().count(),
        uppercase: args.text.chars().filter(|c| c.is_uppercase()).count(),
        lowercase: args.text.chars().filter(|c| c.is_lowercase()).count(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SlowTaskArgs {
    pub seconds: u64,
}

/// Blocks the calling thread for `seconds` — meant to be claimed with a
/// short `timeout_seconds` to exercise the worker's timeout path.
fn slow_task(args: SlowTaskArgs) -> Result<String, anyhow::Error> {
    std::thread::sleep(std::time::Duration::from_secs(args.seconds));
    Ok(format!("slept for {}s", args.seconds))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreliableTaskArgs {
    #[serde(default = "default_success_rate")]
    pub success_rate: f64,
}

fn default_success_rate() -> f64 {
    0.5
}

/// Fails roughly `1 - success_rate` of the time. Useful for exercising the
/// retry path without a deterministic failure count.
fn unreliable_task(args: UnreliableTaskArgs) -> Result<String, anyhow::Error> {
    if fastrand::f64() < args.success_rate {
        Ok("success".to_string())
    } else {
        Err(anyhow::anyhow!("random failure, will retry"))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidatePositiveArgs {
    pub value: i64,
}

fn validate_positive(args: ValidatePositiveArgs) -> Result<bool, anyhow::Error> {
    if args.value < 0 {
        return Err(anyhow::anyhow!("value must be non-negative, got {}", args.value));
    }
    Ok(true)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendEmailArgs {
    pub to: String,
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Serialize)]
struct SendEmailResult {
    to: String,
    subject: String,
    sent: bool,
}

fn send_email(args: SendEmailArgs) -> Result<SendEmailResult, anyhow::Error> {
    Ok(SendEmailResult {
        to: args.to,
        subject: args.subject,
        sent: true,
    })
}
