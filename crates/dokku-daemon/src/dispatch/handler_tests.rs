//! Tests for the dispatch connection handler.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rstest::{fixture, rstest};
use serde_json::{Value, json};

use dokku_patterns::PatternRegistry;

use crate::executor::{
    CommandExecutor, CommandLine, ExecutionError, ExecutionLimiter, ExecutionResult,
};
use crate::transport::ConnectionHandler;

use super::{DispatchConnectionHandler, MAX_REQUEST_BYTES};

const PATTERNS: &str = r#"
commands:
  apps:list:
    skip_lines: 1
    keys: [name]
    regex: '^(\S+)$'
  ps:report:
    keys: [process, status]
    regex: '^(\S+)\s+(\S+)$'
passthrough:
  - version
  - apps:info
  - ps:rebuild
"#;

#[derive(Clone)]
enum Reply {
    Exit {
        stdout: &'static str,
        stderr: &'static str,
        code: i32,
    },
    Timeout,
}

#[derive(Default)]
struct ScriptedExecutor {
    replies: HashMap<&'static str, Reply>,
    calls: Mutex<Vec<CommandLine>>,
}

impl ScriptedExecutor {
    fn reply(mut self, command: &'static str, reply: Reply) -> Self {
        self.replies.insert(command, reply);
        self
    }

    fn calls(&self) -> Vec<CommandLine> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }
}

impl CommandExecutor for ScriptedExecutor {
    fn execute(&self, line: &CommandLine) -> Result<ExecutionResult, ExecutionError> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push(line.clone());
        match self.replies.get(line.command()) {
            Some(Reply::Exit {
                stdout,
                stderr,
                code,
            }) => Ok(ExecutionResult::new(
                line.command(),
                *stdout,
                *stderr,
                Some(*code),
            )),
            Some(Reply::Timeout) => Err(ExecutionError::TimedOut {
                command: line.command().to_owned(),
                timeout: Duration::from_secs(300),
            }),
            None => Ok(ExecutionResult::new(line.command(), "", "", Some(0))),
        }
    }
}

fn success(stdout: &'static str) -> Reply {
    Reply::Exit {
        stdout,
        stderr: "",
        code: 0,
    }
}

struct Harness {
    executor: Arc<ScriptedExecutor>,
    handler: Arc<DispatchConnectionHandler>,
}

impl Harness {
    fn new(executor: ScriptedExecutor) -> Self {
        let registry = PatternRegistry::from_yaml_str(PATTERNS).expect("valid patterns");
        let executor = Arc::new(executor);
        let handler = Arc::new(DispatchConnectionHandler::new(
            Arc::new(registry),
            Arc::clone(&executor) as Arc<dyn CommandExecutor>,
            ExecutionLimiter::new(2),
        ));
        Self { executor, handler }
    }

    /// Writes `input` on a fresh connection, closes the write half, and
    /// returns every response line.
    fn exchange(&self, input: &[u8]) -> Vec<Value> {
        let (mut client, server) = UnixStream::pair().expect("socket pair");
        let handler = Arc::clone(&self.handler);
        let server = thread::spawn(move || handler.handle(server));

        client.write_all(input).expect("write requests");
        client
            .shutdown(std::net::Shutdown::Write)
            .expect("close write half");
        let responses = BufReader::new(&client)
            .lines()
            .map(|line| serde_json::from_str(&line.expect("read line")).expect("json response"))
            .collect();
        server.join().expect("join handler");
        responses
    }
}

#[fixture]
fn harness() -> Harness {
    Harness::new(
        ScriptedExecutor::default()
            .reply("apps:list", success("=====> My Apps\napp1\napp2\n"))
            .reply("ps:report", success("web.1 running\nunparseable\nworker.1 crashed\n"))
            .reply("version", success("dokku version 0.34.4\n"))
            .reply(
                "apps:info",
                Reply::Exit {
                    stdout: "",
                    stderr: "app not found",
                    code: 1,
                },
            )
            .reply("ps:rebuild", Reply::Timeout),
    )
}

#[rstest]
fn structured_commands_answer_with_records(harness: Harness) {
    let responses = harness.exchange(b"apps:list\n");
    assert_eq!(
        responses,
        vec![json!({"status": "success", "output": [{"name": "app1"}, {"name": "app2"}]})]
    );
}

#[rstest]
fn unmatched_lines_keep_their_slot(harness: Harness) {
    let responses = harness.exchange(b"ps:report app1\n");
    assert_eq!(
        responses,
        vec![json!({
            "status": "success",
            "output": [
                {"process": "web.1", "status": "running"},
                {},
                {"process": "worker.1", "status": "crashed"}
            ]
        })]
    );
    assert_eq!(responses[0]["output"][1], json!({}));
}

#[rstest]
fn structured_commands_never_fall_back_to_raw_text() {
    let harness = Harness::new(
        ScriptedExecutor::default().reply("apps:list", success("=====> My Apps\n")),
    );
    let responses = harness.exchange(b"apps:list\n");
    assert_eq!(responses, vec![json!({"status": "success", "output": []})]);
}

#[rstest]
fn passthrough_commands_answer_with_raw_output(harness: Harness) {
    let responses = harness.exchange(b"version\n");
    assert_eq!(
        responses,
        vec![json!({"status": "success", "output": "dokku version 0.34.4\n"})]
    );
}

#[rstest]
fn unknown_commands_never_reach_the_executor(harness: Harness) {
    let responses = harness.exchange(b"frobnicate --all\n");
    assert_eq!(
        responses,
        vec![json!({"status": "error", "output": "Command Not Found"})]
    );
    assert!(harness.executor.calls().is_empty());
}

#[rstest]
fn failures_answer_with_stderr(harness: Harness) {
    let responses = harness.exchange(b"apps:info ghost\n");
    assert_eq!(
        responses,
        vec![json!({"status": "error", "output": "app not found"})]
    );
}

#[rstest]
fn timeouts_answer_with_the_budget(harness: Harness) {
    let responses = harness.exchange(b"ps:rebuild app1\n");
    assert_eq!(
        responses,
        vec![json!({"status": "error", "output": "command timed out after 300 seconds"})]
    );
}

#[rstest]
fn arguments_are_forwarded(harness: Harness) {
    harness.exchange(b"  ps:report   app1  --verbose\n");
    let calls = harness.executor.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].command(), "ps:report");
    assert_eq!(calls[0].arguments(), ["app1", "--verbose"]);
}

#[rstest]
fn one_connection_carries_many_requests_in_order(harness: Harness) {
    let responses = harness.exchange(b"version\n\nfrobnicate\napps:list");
    let statuses: Vec<&str> = responses
        .iter()
        .map(|response| response["status"].as_str().expect("status"))
        .collect();
    assert_eq!(statuses, ["success", "error", "error", "success"]);
    assert_eq!(responses[1]["output"], "empty command");
    assert_eq!(responses[2]["output"], "Command Not Found");
}

#[rstest]
fn oversized_requests_close_the_connection(harness: Harness) {
    let input = vec![b'a'; MAX_REQUEST_BYTES + 1];

    let responses = harness.exchange(&input);

    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["status"], "error");
    let message = responses[0]["output"].as_str().expect("message");
    assert!(message.starts_with("request too large"), "got {message}");
    assert!(harness.executor.calls().is_empty());
}
