//! Scripted collaborators shared by the task-unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use amap::{AmapError, Poi};
use async_trait::async_trait;
use pipeline::{CompletionRequest, LlmError, LlmProvider};

use crate::places::{PlaceAroundQuery, PlacesApi};

pub struct ScriptedOracle {
    reply: Result<String, LlmError>,
    prompts: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedOracle {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_owned()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(error: LlmError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(error),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn last_user_prompt(&self) -> String {
        self.prompts
            .lock()
            .unwrap()
            .last()
            .map(|r| r.user.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for ScriptedOracle {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(request);
        self.reply.clone()
    }
}

pub struct FakePlaces {
    has_key: bool,
    geocode: Result<Option<String>, AmapError>,
    pages: Mutex<VecDeque<Result<Vec<Poi>, AmapError>>>,
    searches: Mutex<Vec<(PlaceAroundQuery, u32)>>,
}

impl FakePlaces {
    fn new(has_key: bool) -> Self {
        Self {
            has_key,
            geocode: Ok(None),
            pages: Mutex::new(VecDeque::new()),
            searches: Mutex::new(Vec::new()),
        }
    }

    pub fn without_key() -> Self {
        Self::new(false)
    }

    pub fn with_geocode(result: Result<Option<String>, AmapError>) -> Self {
        Self {
            geocode: result,
            ..Self::new(true)
        }
    }

    pub fn with_pages(pages: Vec<Result<Vec<Poi>, AmapError>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            ..Self::new(true)
        }
    }

    pub fn searches(&self) -> Vec<(PlaceAroundQuery, u32)> {
        self.searches.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlacesApi for FakePlaces {
    fn has_api_key(&self) -> bool {
        self.has_key
    }

    async fn geocode(
        &self,
        _address: &str,
        _city: Option<&str>,
    ) -> Result<Option<String>, AmapError> {
        self.geocode.clone()
    }

    async fn place_around(
        &self,
        query: &PlaceAroundQuery,
        page: u32,
    ) -> Result<Vec<Poi>, AmapError> {
        self.searches.lock().unwrap().push((query.clone(), page));
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}
