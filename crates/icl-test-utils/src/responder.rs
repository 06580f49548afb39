use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use icl_protocol::Command;
use serde_json::Value;

/// What the fake ICL does in reply to one inbound [`Command`].
#[derive(Debug, Clone)]
pub enum ResponseAction {
    /// Reply immediately with the given `results`/`errors`.
    Reply { results: Value, errors: Vec<String> },
    /// Reply after a delay — used to simulate out-of-order ICL responses.
    ReplyAfter {
        delay: Duration,
        results: Value,
        errors: Vec<String>,
    },
    /// Never reply. Used to exercise `request_with_response` timeouts.
    Ignore,
}

impl ResponseAction {
    pub fn ok(results: Value) -> Self {
        ResponseAction::Reply {
            results,
            errors: Vec::new(),
        }
    }

    pub fn ok_after(delay: Duration, results: Value) -> Self {
        ResponseAction::ReplyAfter {
            delay,
            results,
            errors: Vec::new(),
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        ResponseAction::Reply {
            results: Value::Object(serde_json::Map::new()),
            errors: vec![error.into()],
        }
    }

    pub fn ignore() -> Self {
        ResponseAction::Ignore
    }
}

/// Decides how the fake server reacts to each inbound command.
///
/// Implemented for plain closures via the blanket impl below, so most tests
/// can pass a lambda directly; [`ScriptedResponder`] covers the common case
/// of canned per-command-name replies without writing a closure at all.
pub trait IclResponder: Send + Sync {
    fn respond(&self, command: &Command) -> ResponseAction;
}

impl<F> IclResponder for F
where
    F: Fn(&Command) -> ResponseAction + Send + Sync,
{
    fn respond(&self, command: &Command) -> ResponseAction {
        self(command)
    }
}

/// A responder driven by a table of canned replies keyed on command name.
///
/// Each command name maps to a queue of actions: each matching inbound
/// command consumes one entry from the front of its queue, except the last
/// entry, which repeats for every subsequent call. Command names with no
/// registered script fall back to `on_unscripted`, a bare
/// `{results: {}, errors: []}` success by default — enough for commands the
/// test doesn't care about (e.g. an unrelated `icl_info` during discovery).
pub struct ScriptedResponder {
    scripts: Mutex<HashMap<String, VecDeque<ResponseAction>>>,
    default: ResponseAction,
}

impl ScriptedResponder {
    pub fn new() -> Self {
        ScriptedResponder {
            scripts: Mutex::new(HashMap::new()),
            default: ResponseAction::ok(Value::Object(serde_json::Map::new())),
        }
    }

    /// Queue one or more canned actions for a command name.
    pub fn on(self, command: impl Into<String>, actions: Vec<ResponseAction>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(command.into(), actions.into());
        self
    }

    /// Convenience for a single canned success reply.
    pub fn on_ok(self, command: impl Into<String>, results: Value) -> Self {
        self.on(command, vec![ResponseAction::ok(results)])
    }
}

impl Default for ScriptedResponder {
    fn default() -> Self {
        ScriptedResponder::new()
    }
}

impl IclResponder for ScriptedResponder {
    fn respond(&self, command: &Command) -> ResponseAction {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(&command.command) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| self.default.clone()),
            None => self.default.clone(),
        }
    }
}
