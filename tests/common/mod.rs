use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use novanode::wire::{GenerateContentRequest, GenerateContentResponse};
use novanode::{AiGateway, GenerativeModel, ModelRoster, NovaError, Result};
use tokio::sync::Notify;

/// A recorded call: model name and serialized request body
pub type Call = (String, serde_json::Value);

/// Plays back queued replies in order and records every request.
///
/// Replies may be held back behind a gate until the test releases them.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<Call>>,
}

pub enum Reply {
    Ok(GenerateContentResponse),
    Fail(u16),
    Gated(Arc<Notify>, GenerateContentResponse),
}

impl ScriptedModel {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), serde_json::to_value(request).unwrap()));

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Ok(response)) => Ok(response),
            Some(Reply::Fail(status)) => Err(NovaError::Upstream {
                status,
                message: "scripted failure".to_string(),
            }),
            Some(Reply::Gated(gate, response)) => {
                gate.notified().await;
                Ok(response)
            }
            None => panic!("no scripted reply left for model {model}"),
        }
    }
}

pub fn text(text: &str) -> Reply {
    Reply::Ok(GenerateContentResponse::from_text(text))
}

pub fn json(value: serde_json::Value) -> Reply {
    Reply::Ok(serde_json::from_value(value).unwrap())
}

pub fn gateway(model: Arc<ScriptedModel>) -> AiGateway {
    AiGateway::new(model, ModelRoster::default())
}
