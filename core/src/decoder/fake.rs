//! In-memory stand-in for a real `BinlogDecoder` (SPEC_FULL.md §5). Used
//! only by this workspace's own tests to drive a [`ReplicationWorker`]
//! through its event handler without a live MySQL replication stream. A
//! production deployment plugs a real decoder (e.g. the teacher's
//! `connection` crate) behind the same [`BinlogDecoder`] trait.
//!
//! [`ReplicationWorker`]: crate::worker::ReplicationWorker

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use common::err::CdcResult;

use super::events::{RotateEvent, RowEvent};
use super::{BinlogDecoder, DecoderConfig, DecoderFactory, EventHandler};
use crate::position::SavedPosition;

/// One scripted event the fake decoder replays in order.
#[derive(Debug, Clone)]
pub enum FakeEvent {
    Row(RowEvent),
    Rotate(RotateEvent),
    Xid(u32),
    Ddl(u32),
}

pub struct FakeDecoder {
    handler: Option<Arc<dyn EventHandler>>,
    events: Mutex<VecDeque<FakeEvent>>,
    row_image: String,
    dump_tables: Mutex<Vec<(String, Vec<String>)>>,
    shutdown_calls: Arc<AtomicU32>,
}

impl FakeDecoder {
    pub fn new(events: Vec<FakeEvent>) -> Self {
        FakeDecoder {
            handler: None,
            events: Mutex::new(events.into()),
            row_image: "FULL".to_string(),
            dump_tables: Mutex::new(Vec::new()),
            shutdown_calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn with_row_image(mut self, row_image: impl Into<String>) -> Self {
        self.row_image = row_image.into();
        self
    }

    /// Tables registered via `add_dump_tables` so far; used by tests to
    /// assert on the Source Resolver's output (spec.md §8 S1).
    pub fn dump_tables(&self) -> Vec<(String, Vec<String>)> {
        self.dump_tables.lock().unwrap().clone()
    }

    pub fn shutdown_call_count(&self) -> u32 {
        self.shutdown_calls.load(Ordering::SeqCst)
    }

    async fn drain(&mut self) -> CdcResult<()> {
        let handler = self
            .handler
            .clone()
            .expect("event handler must be attached before run/run_from");

        loop {
            let next = self.events.lock().unwrap().pop_front();
            let Some(event) = next else { break };

            match event {
                FakeEvent::Row(e) => handler.on_row(e).await?,
                FakeEvent::Rotate(e) => handler.on_rotate(e).await?,
                FakeEvent::Xid(pos) => handler.on_xid(pos).await?,
                FakeEvent::Ddl(pos) => handler.on_ddl(pos).await?,
            }
        }

        Ok(())
    }
}

#[async_trait]
impl BinlogDecoder for FakeDecoder {
    fn attach_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handler = Some(handler);
    }

    fn add_dump_tables(&mut self, schema: &str, tables: &[String]) {
        self.dump_tables
            .lock()
            .unwrap()
            .push((schema.to_string(), tables.to_vec()));
    }

    async fn run(&mut self) -> CdcResult<()> {
        self.drain().await
    }

    async fn run_from(&mut self, _pos: SavedPosition) -> CdcResult<()> {
        self.drain().await
    }

    async fn shutdown(&mut self) -> CdcResult<()> {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn binlog_row_image(&self) -> &str {
        &self.row_image
    }
}

/// Builds [`FakeDecoder`]s that all replay the same scripted event
/// sequence; used to construct a [`crate::worker::ReplicationWorker`] in
/// tests without a live MySQL connection.
pub struct FakeDecoderFactory {
    events: Vec<FakeEvent>,
    row_image: String,
}

impl FakeDecoderFactory {
    pub fn new(events: Vec<FakeEvent>) -> Self {
        FakeDecoderFactory {
            events,
            row_image: "FULL".to_string(),
        }
    }

    pub fn with_row_image(mut self, row_image: impl Into<String>) -> Self {
        self.row_image = row_image.into();
        self
    }
}

impl DecoderFactory for FakeDecoderFactory {
    fn create(&self, _cfg: DecoderConfig) -> CdcResult<Box<dyn BinlogDecoder>> {
        Ok(Box::new(
            FakeDecoder::new(self.events.clone()).with_row_image(self.row_image.clone()),
        ))
    }
}
