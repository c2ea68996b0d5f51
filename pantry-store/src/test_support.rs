//! In-memory [`PantrySource`] used by the engine tests.

use async_trait::async_trait;
use pantry_core::{CountAction, CountTable};
use pantry_fetch::{FetchError, PantrySource};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Remote state served by a [`ScriptedSource`]. `None` fails that endpoint.
#[derive(Debug, Clone, Default)]
pub(crate) struct Script {
    pub categories: Option<Vec<String>>,
    pub products: Option<Vec<Value>>,
    pub counts: Option<CountTable>,
}

impl Script {
    pub fn new(categories: &[&str], products: Value, counts: Value) -> Self {
        Self {
            categories: Some(categories.iter().map(ToString::to_string).collect()),
            products: Some(serde_json::from_value(products).unwrap()),
            counts: Some(serde_json::from_value(counts).unwrap()),
        }
    }

    pub fn without_products(mut self) -> Self {
        self.products = None;
        self
    }

    pub fn without_categories(mut self) -> Self {
        self.categories = None;
        self
    }
}

/// A recorded `update_count` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UpdateCall {
    pub product_name: String,
    pub action: CountAction,
    pub amount: i64,
}

#[derive(Debug, Default)]
pub(crate) struct ScriptedSource {
    script: Mutex<Script>,
    replies: Mutex<VecDeque<Result<i64, FetchError>>>,
    updates: Mutex<Vec<UpdateCall>>,
    fetches: AtomicUsize,
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(script: Script) -> Self {
        Self {
            script: Mutex::new(script),
            ..Self::default()
        }
    }

    pub fn set_script(&self, script: Script) {
        *self.script.lock().unwrap() = script;
    }

    pub fn push_reply(&self, reply: Result<i64, FetchError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn updates(&self) -> Vec<UpdateCall> {
        self.updates.lock().unwrap().clone()
    }

    /// Number of completed snapshot fetches (counted on the counts endpoint).
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    fn failure(path: &str) -> FetchError {
        FetchError::Status {
            status: 503,
            endpoint: path.to_string(),
        }
    }
}

#[async_trait]
impl PantrySource for ScriptedSource {
    fn label(&self) -> &str {
        "scripted"
    }

    async fn fetch_categories(&self) -> Result<Vec<String>, FetchError> {
        let script = self.script.lock().unwrap().clone();
        script.categories.ok_or_else(|| Self::failure("/categories"))
    }

    async fn fetch_products(&self) -> Result<Vec<Value>, FetchError> {
        let script = self.script.lock().unwrap().clone();
        script.products.ok_or_else(|| Self::failure("/products"))
    }

    async fn fetch_counts(&self) -> Result<CountTable, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let script = self.script.lock().unwrap().clone();
        script.counts.ok_or_else(|| Self::failure("/counts"))
    }

    async fn update_count(
        &self,
        product_name: &str,
        action: CountAction,
        amount: i64,
    ) -> Result<i64, FetchError> {
        self.updates.lock().unwrap().push(UpdateCall {
            product_name: product_name.to_string(),
            action,
            amount,
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Rejected("no scripted reply".into())))
    }

    fn close(&self) -> bool {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        !self.closed.swap(true, Ordering::SeqCst)
    }
}
