//! In-memory executor used by unit tests.

use async_trait::async_trait;
use deadpool_redis::redis::{Arg, Cmd, ErrorKind, RedisError, Value};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::{Executor, Result};

/// Returns the arguments of `cmd` as strings, command name first.
pub(crate) fn args_of(cmd: &Cmd) -> Vec<String> {
    cmd.args_iter()
        .filter_map(|arg| match arg {
            Arg::Simple(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            Arg::Cursor => None,
        })
        .collect()
}

/// Matches `*` and `?` the way `SCAN MATCH` does for plain patterns.
pub(crate) fn glob_match(pattern: &str, key: &str) -> bool {
    fn go(p: &[u8], k: &[u8]) -> bool {
        match (p.first(), k.first()) {
            (None, None) => true,
            (Some(b'*'), _) => go(&p[1..], k) || (!k.is_empty() && go(p, &k[1..])),
            (Some(b'?'), Some(_)) => go(&p[1..], &k[1..]),
            (Some(a), Some(b)) if a == b => go(&p[1..], &k[1..]),
            _ => false,
        }
    }
    go(pattern.as_bytes(), key.as_bytes())
}

#[derive(Default)]
struct State {
    data: BTreeMap<String, Vec<u8>>,
    log: Vec<Vec<String>>,
    replies: VecDeque<Result<Value>>,
    failing: HashSet<String>,
    scan_snapshot: Vec<String>,
}

/// A tiny string-only store that understands the commands the cache and
/// pattern-delete helpers issue, and records every command it receives.
///
/// Queued replies take precedence over interpretation, which lets tests
/// check argument marshalling for commands the store does not model.
#[derive(Default)]
pub(crate) struct MemoryExecutor {
    state: Mutex<State>,
}

impl MemoryExecutor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, key: &str, value: impl Into<Vec<u8>>) {
        self.state.lock().data.insert(key.to_string(), value.into());
    }

    pub(crate) fn value(&self, key: &str) -> Option<Vec<u8>> {
        self.state.lock().data.get(key).cloned()
    }

    pub(crate) fn stored_keys(&self) -> Vec<String> {
        self.state.lock().data.keys().cloned().collect()
    }

    pub(crate) fn push_reply(&self, reply: Result<Value>) {
        self.state.lock().replies.push_back(reply);
    }

    /// Makes every command named `name` fail with an I/O error.
    pub(crate) fn fail_on(&self, name: &str) {
        self.state.lock().failing.insert(name.to_ascii_uppercase());
    }

    pub(crate) fn log(&self) -> Vec<Vec<String>> {
        self.state.lock().log.clone()
    }

    pub(crate) fn last(&self) -> Vec<String> {
        self.state.lock().log.last().cloned().unwrap_or_default()
    }

    pub(crate) fn count(&self, name: &str) -> usize {
        self.state
            .lock()
            .log
            .iter()
            .filter(|args| args.first().is_some_and(|n| n.eq_ignore_ascii_case(name)))
            .count()
    }
}

fn bulk(bytes: impl Into<Vec<u8>>) -> Value {
    Value::BulkString(bytes.into())
}

fn interpret(state: &mut State, args: &[String]) -> Result<Value> {
    let name = args[0].to_ascii_uppercase();
    let reply = match name.as_str() {
        "GET" => state
            .data
            .get(&args[1])
            .map(|v| bulk(v.clone()))
            .unwrap_or(Value::Nil),
        "EXISTS" => Value::Int(args[1..].iter().filter(|k| state.data.contains_key(*k)).count() as i64),
        "SET" => {
            let nx = args[3..].iter().any(|a| a.eq_ignore_ascii_case("NX"));
            if nx && state.data.contains_key(&args[1]) {
                Value::Nil
            } else {
                state.data.insert(args[1].clone(), args[2].clone().into_bytes());
                Value::Okay
            }
        }
        "SETEX" => {
            state.data.insert(args[1].clone(), args[3].clone().into_bytes());
            Value::Okay
        }
        "DEL" => Value::Int(args[1..].iter().filter(|k| state.data.remove(*k).is_some()).count() as i64),
        "KEYS" => Value::Array(
            state
                .data
                .keys()
                .filter(|k| glob_match(&args[1], k))
                .map(|k| bulk(k.clone()))
                .collect(),
        ),
        "SCAN" => {
            let cursor: usize = args[1].parse().unwrap_or(0);
            let pattern = option_value(args, "MATCH").unwrap_or("*");
            let count: usize = option_value(args, "COUNT")
                .and_then(|c| c.parse().ok())
                .unwrap_or(10);
            if cursor == 0 {
                state.scan_snapshot = state.data.keys().cloned().collect();
            }
            let end = (cursor + count).min(state.scan_snapshot.len());
            let page = state.scan_snapshot[cursor.min(end)..end]
                .iter()
                .filter(|k| state.data.contains_key(*k) && glob_match(pattern, k))
                .map(|k| bulk(k.clone()))
                .collect();
            let next = if end >= state.scan_snapshot.len() { 0 } else { end };
            Value::Array(vec![bulk(next.to_string()), Value::Array(page)])
        }
        _ => Value::Nil,
    };
    Ok(reply)
}

fn option_value<'a>(args: &'a [String], option: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a.eq_ignore_ascii_case(option))
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

#[async_trait]
impl Executor for MemoryExecutor {
    async fn execute(&self, cmd: &Cmd) -> Result<Value> {
        let args = args_of(cmd);
        let mut state = self.state.lock();
        state.log.push(args.clone());

        if state.failing.contains(&args[0].to_ascii_uppercase()) {
            return Err(RedisError::from((ErrorKind::IoError, "injected failure")).into());
        }
        if let Some(reply) = state.replies.pop_front() {
            return reply;
        }
        interpret(&mut state, &args)
    }
}

#[test]
fn glob_matches_star_and_question_mark() {
    assert!(glob_match("user:*", "user:42"));
    assert!(glob_match("user:?", "user:4"));
    assert!(!glob_match("user:?", "user:42"));
    assert!(glob_match("*:session", "a:b:session"));
    assert!(!glob_match("user:*", "order:1"));
}
