#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use synthdb_generate::prompts::{LEGACY_SYSTEM_PROMPT, SCHEMA_SYSTEM_PROMPT};
use synthdb_generate::{CompletionRequest, LanguageModel, LlmError};

/// A canned model reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(String),
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }

    pub fn json(value: Value) -> Self {
        Reply::Text(value.to_string())
    }
}

#[derive(Default)]
struct Script {
    schema: VecDeque<Reply>,
    legacy: VecDeque<Reply>,
    tables: HashMap<String, VecDeque<Reply>>,
    /// Reply used once a table's queue is empty.
    table_defaults: HashMap<String, Reply>,
}

/// In-memory model that answers from per-table queues and records every
/// request it sees.
#[derive(Default)]
pub struct ScriptedModel {
    script: Mutex<Script>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn schema_reply(&self, reply: Reply) -> &Self {
        self.script.lock().unwrap().schema.push_back(reply);
        self
    }

    pub fn legacy_reply(&self, reply: Reply) -> &Self {
        self.script.lock().unwrap().legacy.push_back(reply);
        self
    }

    pub fn table_reply(&self, table: &str, reply: Reply) -> &Self {
        self.script
            .lock()
            .unwrap()
            .tables
            .entry(table.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn table_default(&self, table: &str, reply: Reply) -> &Self {
        self.script
            .lock()
            .unwrap()
            .table_defaults
            .insert(table.to_string(), reply);
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Prompts sent for `table`, in call order.
    pub fn table_prompts(&self, table: &str) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|request| prompt_table(&request.prompt).as_deref() == Some(table))
            .map(|request| request.prompt)
            .collect()
    }

    /// Tables in the order they were first prompted.
    pub fn table_call_order(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|request| prompt_table(&request.prompt))
            .collect()
    }

    pub fn schema_calls(&self) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.system == SCHEMA_SYSTEM_PROMPT)
            .count()
    }

    fn next_reply(&self, request: &CompletionRequest) -> Reply {
        let mut script = self.script.lock().unwrap();
        let missing = || Reply::Fail("no scripted reply".to_string());

        if request.system == SCHEMA_SYSTEM_PROMPT {
            return script.schema.pop_front().unwrap_or_else(missing);
        }
        if request.system == LEGACY_SYSTEM_PROMPT {
            return script.legacy.pop_front().unwrap_or_else(missing);
        }

        let Some(table) = prompt_table(&request.prompt) else {
            return missing();
        };
        if let Some(reply) = script.tables.get_mut(&table).and_then(VecDeque::pop_front) {
            return reply;
        }
        script.table_defaults.get(&table).cloned().unwrap_or_else(missing)
    }
}

fn prompt_table(prompt: &str) -> Option<String> {
    let rest = prompt.strip_prefix("Generate realistic sample data for the '")?;
    rest.split_once('\'').map(|(table, _)| table.to_string())
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.next_reply(request) {
            Reply::Text(text) => Ok(text),
            Reply::Fail(message) => Err(LlmError::Other(message)),
        }
    }
}

/// `[{"id": 1, ...}, ...]` with `count` rows built by `row`.
pub fn rows(count: usize, row: impl Fn(usize) -> Value) -> Value {
    Value::Array((1..=count).map(row).collect())
}

pub fn id_rows(count: usize) -> Value {
    rows(count, |i| json!({"id": i, "name": format!("row {i}")}))
}

/// Collects every `(message, percent)` progress update.
#[derive(Default)]
pub struct ProgressLog {
    pub updates: Mutex<Vec<(String, f64)>>,
}

impl ProgressLog {
    pub fn percents(&self) -> Vec<f64> {
        self.updates.lock().unwrap().iter().map(|(_, p)| *p).collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.updates.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }
}

impl synthdb_generate::ProgressCallback for ProgressLog {
    fn report(&self, message: &str, percent: f64) {
        self.updates.lock().unwrap().push((message.to_string(), percent));
    }
}

pub const SHOP_SQL: &str = "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT); \
CREATE TABLE orders (id INTEGER PRIMARY KEY, customer_id INTEGER, total DECIMAL(10,2), \
FOREIGN KEY (customer_id) REFERENCES customers(id));";
