//! Replication Worker (C5): owns one MySQL replication session, its event
//! handler, its position store, and its checkpoint loop (spec.md §4.5).
//! Grounded on `original_source/domain/entity/syncmanager/syncmanager.go`
//! (`Run`/`Close`/`parseSource`) for the construction and run/close
//! sequencing, and on `savemanager.go`'s throttled-save shape for the
//! checkpoint loop (already implemented in `crate::position`).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use common::config::{DbConfig, DumpConfig, SinkConfig, SourceConfig};
use common::err::{CdcError, CdcResult, ErrorKind};

use crate::cancel::CancelToken;
use crate::decoder::{BinlogDecoder, DecoderConfig, DecoderFactory, EventHandler, RotateEvent, RowEvent};
use crate::id_generator::IdGenerator;
use crate::position::{PositionStore, SavedPosition};
use crate::publisher::{build_publisher, Publisher};
use crate::source::{self, SchemaInspector};
use crate::translate::translate;

const PKG: &str = "core::worker";
const REQUIRED_ROW_IMAGE: &str = "FULL";
const POSITION_CHANNEL_CAPACITY: usize = 4096;
const CHECKPOINT_INTERVAL: Duration = Duration::from_secs(3);

/// The parameters needed to construct one worker; everything an admin
/// `/sync/run` call or a config file `[[source]]` block supplies (spec.md
/// §3 `WorkerConfig`, minus `server_id` which C7 allocates).
#[derive(Debug, Clone)]
pub struct WorkerParams {
    pub db: DbConfig,
    pub dump: DumpConfig,
    pub sources: Vec<SourceConfig>,
    pub sink: SinkConfig,
}

/// Read-only snapshot of a worker's state (spec.md §3 `WorkerStatus`).
#[derive(Debug, Clone)]
pub struct WorkerStatus {
    pub server_id: u32,
    pub is_running: bool,
    pub sources: Vec<SourceConfig>,
}

/// State machine: `Constructed -> Running -> Stopping -> Closed`
/// (spec.md §4.5). `Constructed` and `Running` collapse to the
/// `is_running` flag here; `Stopping`/`Closed` are both reached through
/// [`ReplicationWorker::close`], which is idempotent.
pub struct ReplicationWorker {
    server_id: u32,
    sources: Vec<SourceConfig>,
    cancel: CancelToken,
    is_running: Arc<AtomicBool>,
    position_store: Arc<PositionStore>,
    publisher: Arc<dyn Publisher>,
    decoder: Mutex<Box<dyn BinlogDecoder>>,
    pos_rx: Mutex<Option<mpsc::Receiver<SavedPosition>>>,
    log_file_path: PathBuf,
}

impl ReplicationWorker {
    /// Construction preconditions, in the order spec.md §4.5 lists them:
    /// allocate a server-id, resolve sources, build the decoder config,
    /// instantiate the decoder, verify `FULL` row image, allocate the
    /// position channel, load the saved position, construct the
    /// publisher, attach the event handler.
    #[allow(clippy::too_many_arguments)]
    pub async fn new(
        params: WorkerParams,
        id_gen: &dyn IdGenerator,
        inspector: &dyn SchemaInspector,
        decoder_factory: &dyn DecoderFactory,
        save_dir: &Path,
        log_dir: &Path,
    ) -> CdcResult<Self> {
        let server_id = id_gen.next_id();

        let plan = source::resolve(&params.sources, inspector).await?;

        let dump_exec_path = if params.dump.dump_exec_path.is_empty() {
            None
        } else {
            Some(params.dump.dump_exec_path.clone())
        };

        let decoder_cfg = DecoderConfig {
            server_id,
            addr: params.db.addr.clone(),
            user: params.db.user.clone(),
            password: params.db.pass.clone(),
            charset: params.db.charset.clone(),
            flavor: params.db.flavor.clone(),
            utc_timestamps: true,
            include_table_regex: plan.filters.clone(),
            dump_exec_path,
        };

        let mut decoder = decoder_factory.create(decoder_cfg)?;

        for (schema, table) in &plan.dump_tables {
            decoder.add_dump_tables(schema, std::slice::from_ref(table));
        }

        if decoder.binlog_row_image() != REQUIRED_ROW_IMAGE {
            return Err(CdcError::new(
                ErrorKind::Binlog,
                PKG,
                format!(
                    "source binlog row image must be FULL, got {}",
                    decoder.binlog_row_image()
                ),
            ));
        }

        let (pos_tx, pos_rx) = mpsc::channel(POSITION_CHANNEL_CAPACITY);

        let position_store = Arc::new(PositionStore::load(save_dir, server_id).map_err(|e| {
            CdcError::wrap(ErrorKind::Save, PKG, "fail to load saved position", e)
        })?);

        let publisher = build_publisher(&params.sink)?;

        let cancel = CancelToken::new();

        let handler = Arc::new(WorkerEventHandler {
            cancel: cancel.clone(),
            publisher: publisher.clone(),
            pos_tx,
        });
        decoder.attach_handler(handler);

        let log_file_path = touch_log_file(log_dir, server_id)?;

        Ok(ReplicationWorker {
            server_id,
            sources: params.sources,
            cancel,
            is_running: Arc::new(AtomicBool::new(false)),
            position_store,
            publisher,
            decoder: Mutex::new(decoder),
            pos_rx: Mutex::new(Some(pos_rx)),
            log_file_path,
        })
    }

    pub fn server_id(&self) -> u32 {
        self.server_id
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> WorkerStatus {
        WorkerStatus {
            server_id: self.server_id,
            is_running: self.is_running(),
            sources: self.sources.clone(),
        }
    }

    pub fn log_file_path(&self) -> &Path {
        &self.log_file_path
    }

    /// Runs until the decoder's stream ends, fails, or the worker is
    /// cancelled (spec.md §4.5.3). Spawns the checkpoint loop first, then
    /// blocks on the decoder's `run`/`run_from`.
    pub async fn run(&self, legacy_sync: bool) -> CdcResult<()> {
        self.is_running.store(true, Ordering::SeqCst);

        let Some(pos_rx) = self.pos_rx.lock().await.take() else {
            return Err(CdcError::new(ErrorKind::Param, PKG, "worker already running"));
        };

        let checkpoint_handle = tokio::spawn(checkpoint_loop(
            self.position_store.clone(),
            pos_rx,
            self.cancel.clone(),
        ));

        let saved = self.position_store.position();
        let run_result = {
            let mut decoder = self.decoder.lock().await;
            if legacy_sync {
                decoder.run().await
            } else {
                decoder.run_from(saved).await
            }
        };

        self.cancel.cancel();
        let _ = checkpoint_handle.await;
        self.is_running.store(false, Ordering::SeqCst);

        run_result
    }

    /// `Running -> Stopping -> Closed`: cancels the worker, persists the
    /// final position bypassing the throttle, closes the publisher and
    /// the decoder. Idempotent — safe to call even if `run` already
    /// returned or was never started.
    pub async fn close(&self) -> CdcResult<()> {
        self.cancel.cancel();

        self.position_store.close()?;
        self.publisher.close().await?;
        self.decoder.lock().await.shutdown().await?;

        self.is_running.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// The checkpoint loop (spec.md §4.5.2): decouples position arrival
/// (potentially per-transaction, via `pos_rx`) from disk writes (at most
/// once per tick here, further throttled to >=1s by [`PositionStore`]).
async fn checkpoint_loop(
    position_store: Arc<PositionStore>,
    mut pos_rx: mpsc::Receiver<SavedPosition>,
    cancel: CancelToken,
) {
    let mut ticker = tokio::time::interval(CHECKPOINT_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                // Drain whatever is already buffered rather than dropping
                // it: the event handler may have enqueued a position just
                // before cancellation fired, and `Worker::close`'s final
                // flush should see it.
                while let Ok(pos) = pos_rx.try_recv() {
                    apply_position(&position_store, pos);
                }
                return;
            }

            maybe_pos = pos_rx.recv() => {
                match maybe_pos {
                    Some(pos) => apply_position(&position_store, pos),
                    None => return,
                }
            }

            _ = ticker.tick() => {
                if let Err(e) = position_store.save(position_store.position()) {
                    tracing::error!(error = %e, "checkpoint save failed, cancelling worker");
                    cancel.cancel();
                    return;
                }
            }
        }
    }
}

/// xid/ddl events carry only the next offset, not a file name (spec.md
/// §4.3); keep the last-known name rather than clobbering it with an
/// empty one.
fn apply_position(position_store: &PositionStore, pos: SavedPosition) {
    if pos.name.is_empty() {
        let mut current = position_store.position();
        current.pos = pos.pos;
        position_store.update_in_memory(current);
    } else {
        position_store.update_in_memory(pos);
    }
}

/// The event handler attached to the decoder (spec.md §4.5.1). Holds only
/// a cancellation token, the publisher, and a send-only position channel
/// — no back-pointer to the worker, avoiding the cyclic ownership spec.md
/// §9 calls out.
struct WorkerEventHandler {
    cancel: CancelToken,
    publisher: Arc<dyn Publisher>,
    pos_tx: mpsc::Sender<SavedPosition>,
}

impl WorkerEventHandler {
    fn cancelled_error(&self) -> CdcError {
        CdcError::new(ErrorKind::Event, PKG, "worker cancelled")
    }

    async fn forward(&self, pos: SavedPosition) -> CdcResult<()> {
        if self.cancel.is_cancelled() {
            return Err(self.cancelled_error());
        }

        tokio::select! {
            _ = self.cancel.cancelled() => Err(self.cancelled_error()),
            res = self.pos_tx.send(pos) => res.map_err(|_| self.cancelled_error()),
        }
    }
}

#[async_trait]
impl EventHandler for WorkerEventHandler {
    async fn on_row(&self, event: RowEvent) -> CdcResult<()> {
        // spec.md §4.5.1 says callbacks only return an error on worker
        // cancellation, but also calls a nil event an `EventError`; an
        // empty row vector is the same malformed-event case, so this
        // tears down the decoder on one bad event rather than logging and
        // advancing like a translation failure does.
        if event.rows.is_empty() {
            return Err(CdcError::new(ErrorKind::Event, PKG, "row event has no rows"));
        }

        match translate(&event) {
            Ok(msg) => {
                if let Err(e) = self.publisher.publish(msg).await {
                    tracing::warn!(error = %e, "publish enqueue failed");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "event translation failed, dropping event");
            }
        }

        Ok(())
    }

    async fn on_rotate(&self, event: RotateEvent) -> CdcResult<()> {
        self.forward(SavedPosition {
            name: event.next_log_name,
            pos: event.position,
        })
        .await
    }

    async fn on_xid(&self, next_pos: u32) -> CdcResult<()> {
        self.forward(SavedPosition {
            name: String::new(),
            pos: next_pos,
        })
        .await
    }

    async fn on_ddl(&self, next_pos: u32) -> CdcResult<()> {
        self.forward(SavedPosition {
            name: String::new(),
            pos: next_pos,
        })
        .await
    }
}

fn touch_log_file(log_dir: &Path, server_id: u32) -> CdcResult<PathBuf> {
    std::fs::create_dir_all(log_dir).map_err(|e| {
        CdcError::wrap(
            ErrorKind::Logger,
            PKG,
            format!("fail to create log dir {}", log_dir.display()),
            e,
        )
    })?;

    let path = log_dir.join(format!("canal{}.log", server_id));

    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| {
            CdcError::wrap(
                ErrorKind::Logger,
                PKG,
                format!("fail to open log file {}", path.display()),
                e,
            )
        })?;

    Ok(path)
}
