//! Shared test doubles: a fully scripted browser engine.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use account_orchestrator_portal::{
    BrowserEngine, BrowserPage, BrowserProfile, PageResponse, PortalError, Result,
};

/// One scripted reply for a `"METHOD /path"` key.
pub enum Reply {
    Body(u16, String),
    Error(PortalError),
}

#[derive(Default)]
pub struct ScriptState {
    replies: HashMap<String, VecDeque<Reply>>,
    cookies: HashMap<String, String>,
    calls: Vec<String>,
    json_bodies: Vec<(String, serde_json::Value)>,
    launches: usize,
    closes: usize,
    fail_launch: bool,
}

/// Browser engine whose pages answer from a scripted route table.
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a body reply for `"METHOD /path"`.
    pub fn on(&self, key: &str, status: u16, body: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .replies
            .entry(key.to_string())
            .or_default()
            .push_back(Reply::Body(status, body.to_string()));
        self
    }

    /// Queue a transport-level error for `"METHOD /path"`.
    pub fn on_err(&self, key: &str, err: PortalError) -> &Self {
        self.state
            .lock()
            .unwrap()
            .replies
            .entry(key.to_string())
            .or_default()
            .push_back(Reply::Error(err));
        self
    }

    /// Seed a cookie into the context jar.
    pub fn set_cookie(&self, name: &str, value: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .cookies
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Make the next launch fail as a local browser fault.
    pub fn fail_launch(&self) -> &Self {
        self.state.lock().unwrap().fail_launch = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn json_bodies(&self) -> Vec<(String, serde_json::Value)> {
        self.state.lock().unwrap().json_bodies.clone()
    }

    pub fn launches(&self) -> usize {
        self.state.lock().unwrap().launches
    }

    pub fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }
}

#[async_trait]
impl BrowserEngine for ScriptedEngine {
    async fn launch(&self, _profile: &BrowserProfile) -> Result<Box<dyn BrowserPage>> {
        let mut state = self.state.lock().unwrap();
        if state.fail_launch {
            return Err(PortalError::BrowserError {
                detail: "scripted launch failure".to_string(),
            });
        }
        state.launches += 1;
        Ok(Box::new(ScriptedPage {
            state: Arc::clone(&self.state),
        }))
    }
}

struct ScriptedPage {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedPage {
    fn reply(&self, key: &str) -> Result<PageResponse> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(key.to_string());
        match state.replies.get_mut(key).and_then(VecDeque::pop_front) {
            Some(Reply::Body(status, body)) => Ok(PageResponse { status, body }),
            Some(Reply::Error(e)) => Err(e),
            None => Ok(PageResponse {
                status: 200,
                body: format!(r#"{{"code":404,"message":"no scripted reply for {key}"}}"#),
            }),
        }
    }
}

#[async_trait]
impl BrowserPage for ScriptedPage {
    async fn goto(&mut self, path: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(format!("GOTO {path}"));
        Ok(())
    }

    async fn get(&mut self, path: &str) -> Result<PageResponse> {
        self.reply(&format!("GET {path}"))
    }

    async fn post_json(&mut self, path: &str, body: &serde_json::Value) -> Result<PageResponse> {
        self.state
            .lock()
            .unwrap()
            .json_bodies
            .push((path.to_string(), body.clone()));
        self.reply(&format!("POST {path}"))
    }

    async fn post_form(&mut self, path: &str, _fields: &[(&str, &str)]) -> Result<PageResponse> {
        self.reply(&format!("POST {path}"))
    }

    async fn cookie_value(&self, name: &str) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().cookies.get(name).cloned())
    }

    async fn close(&mut self) -> Result<()> {
        self.state.lock().unwrap().closes += 1;
        Ok(())
    }
}
