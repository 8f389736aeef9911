//! Wire shapes for the `/sync` admin surface (spec.md §6 "Control API").
//! Kept separate from the handlers so the JSON shape is easy to audit
//! against the spec in one place.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use common::config::{SinkConfig, SourceConfig};

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub addr: String,
    pub user: String,
    #[serde(default)]
    pub pass: String,
    #[serde(default)]
    pub charset: String,
    #[serde(default)]
    pub flavor: String,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub sink_cfg: SinkConfig,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub server_id: u32,
    pub msg: String,
}

#[derive(Debug, Deserialize)]
pub struct ServerIdRequest {
    pub server_id: u32,
}

#[derive(Debug, Serialize)]
pub struct ServerIdResponse {
    pub server_id: u32,
    pub msg: String,
}

#[derive(Debug, Serialize)]
pub struct WorkerStatusDto {
    pub server_id: u32,
    pub is_running: bool,
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub statuses: HashMap<u32, WorkerStatusDto>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub msg: String,
}
