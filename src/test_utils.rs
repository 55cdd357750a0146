// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for scripting CLI responses and controlling time.

use crate::command::{CommandOutput, Runner};
use crate::poll::Clock;
use std::cell::RefCell;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

struct Rule {
    command: String,
    responses: Vec<CommandOutput>,
    served: usize,
}

/// A runner that returns predefined outputs based on the command line.
///
/// Commands are matched exactly first, then by the longest registered prefix.
/// A rule with several responses serves them in order and repeats the last.
#[derive(Clone, Default)]
pub struct MockRunner {
    rules: Arc<Mutex<Vec<Rule>>>,
    calls: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to `command` with a fixed output and exit code
    pub fn on(self, command: &str, output: &str, exit_code: i32) -> Self {
        self.on_sequence(command, vec![(output, exit_code)])
    }

    /// Respond to successive calls of `command` with successive outputs
    pub fn on_sequence(self, command: &str, responses: Vec<(&str, i32)>) -> Self {
        self.rules.lock().unwrap().push(Rule {
            command: command.to_string(),
            responses: responses
                .into_iter()
                .map(|(output, code)| CommandOutput::new(output, code))
                .collect(),
            served: 0,
        });
        self
    }

    /// Every command run so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(command, _)| command.clone())
            .collect()
    }

    /// Stdin passed to the most recent call starting with `prefix`
    pub fn stdin_of(&self, prefix: &str) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(command, _)| command.starts_with(prefix))
            .and_then(|(_, stdin)| stdin.clone())
    }

    fn find_response(&self, command: &str) -> Option<CommandOutput> {
        let mut rules = self.rules.lock().unwrap();

        // Try exact match first
        let index = rules.iter().position(|r| r.command == command).or_else(|| {
            rules
                .iter()
                .enumerate()
                .filter(|(_, r)| command.starts_with(&r.command))
                .max_by_key(|(_, r)| r.command.len())
                .map(|(i, _)| i)
        })?;

        let rule = &mut rules[index];
        let response = rule.responses[rule.served.min(rule.responses.len() - 1)].clone();
        rule.served += 1;
        Some(response)
    }
}

impl Runner for MockRunner {
    fn run(&self, command: &str, stdin: Option<&str>) -> CommandOutput {
        self.calls
            .lock()
            .unwrap()
            .push((command.to_string(), stdin.map(str::to_string)));

        // Default failure for unmatched commands
        self.find_response(command).unwrap_or_else(|| {
            CommandOutput::new(format!("Error from server (NotFound): {}", command), 1)
        })
    }
}

/// A clock that advances only when slept on
pub struct FakeClock {
    start: Instant,
    offset: RefCell<Duration>,
    sleeps: RefCell<Vec<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: RefCell::new(Duration::ZERO),
            sleeps: RefCell::new(Vec::new()),
        }
    }

    pub fn elapsed(&self) -> Duration {
        *self.offset.borrow()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.start + *self.offset.borrow()
    }

    fn sleep(&self, duration: Duration) {
        *self.offset.borrow_mut() += duration;
        self.sleeps.borrow_mut().push(duration);
    }
}

/// Create a `{"items": [...]}` list response with the given object names
pub fn list_json(kind: &str, names: &[&str]) -> String {
    let items: Vec<_> = names
        .iter()
        .map(|name| {
            serde_json::json!({
                "kind": kind,
                "metadata": { "name": name, "namespace": "test-ns" }
            })
        })
        .collect();

    serde_json::json!({ "apiVersion": "v1", "kind": "List", "items": items }).to_string()
}

/// Create a deployment JSON response with the given conditions and container env
pub fn deployment_json(name: &str, conditions: &[(&str, &str)], env: &[(&str, &str)]) -> String {
    let conditions: Vec<_> = conditions
        .iter()
        .map(|(t, s)| serde_json::json!({ "type": t, "status": s }))
        .collect();
    let env: Vec<_> = env
        .iter()
        .map(|(n, v)| serde_json::json!({ "name": n, "value": v }))
        .collect();

    serde_json::json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": { "name": name, "namespace": "test-ns", "generation": 2 },
        "spec": {
            "selector": { "matchLabels": { "app": name } },
            "template": {
                "metadata": { "labels": { "app": name } },
                "spec": { "containers": [ { "name": name, "image": "quay.io/app:latest", "env": env } ] }
            }
        },
        "status": { "observedGeneration": 2, "conditions": conditions }
    })
    .to_string()
}

/// Serve the canned `(status line, body)` responses, one per connection, on
/// a local port. Returns `host:port` and a channel yielding each raw request.
pub fn http_server(responses: Vec<(&str, &str)>) -> (String, mpsc::Receiver<String>) {
    http_server_on(TcpListener::bind("127.0.0.1:0").unwrap(), responses)
}

/// Like [`http_server`], on an already bound listener
pub fn http_server_on(listener: TcpListener, responses: Vec<(&str, &str)>) -> (String, mpsc::Receiver<String>) {
    let host = listener.local_addr().unwrap().to_string();
    let responses: Vec<String> = responses
        .into_iter()
        .map(|(status, body)| {
            format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            )
        })
        .collect();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for response in responses {
            let (mut socket, _) = listener.accept().unwrap();
            let request = read_request(&mut socket);
            socket.write_all(response.as_bytes()).unwrap();
            let _ = tx.send(request);
        }
    });

    (host, rx)
}

fn read_request(socket: &mut TcpStream) -> String {
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).unwrap_or(0);
        request.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&request).to_string();
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|line| {
                    let (key, value) = line.split_once(':')?;
                    key.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())?
                })
                .unwrap_or(0);
            if request.len() >= end + 4 + length {
                return text;
            }
        }
        if n == 0 {
            return text;
        }
    }
}
