//! End-to-end worker scenarios driven through the fake decoder (spec.md
//! §8 S5/S6): a worker wired to a controller, fed a scripted event
//! sequence, checkpointing its position and tearing down cleanly.

use cdc_core::controller::{Controller, ControllerDeps};
use cdc_core::decoder::fake::{FakeDecoderFactory, FakeEvent};
use cdc_core::decoder::{Action, ColumnValue, RotateEvent, RowEvent, TableInfo};
use cdc_core::id_generator::GlobalIdGenerator;
use cdc_core::source::FakeSchemaInspector;
use cdc_core::worker::WorkerParams;
use common::config::{DbConfig, DumpConfig, SinkConfig, SourceConfig};

fn params() -> WorkerParams {
    WorkerParams {
        db: DbConfig {
            addr: "127.0.0.1:3306".into(),
            user: "root".into(),
            pass: String::new(),
            charset: "utf8mb4".into(),
            flavor: "mysql".into(),
        },
        dump: DumpConfig::default(),
        sources: vec![SourceConfig {
            schema: "orders".into(),
            tables: vec!["t_order".into()],
        }],
        sink: SinkConfig::Log,
    }
}

fn table() -> TableInfo {
    TableInfo::new("orders", "t_order", vec!["id".into(), "name".into()])
        .with_primary_key(vec!["id".into()])
}

fn controller_with(events: Vec<FakeEvent>) -> (Controller, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let deps = ControllerDeps {
        id_gen: Box::new(GlobalIdGenerator::new()),
        inspector: Box::new(FakeSchemaInspector::new()),
        decoder_factory: Box::new(FakeDecoderFactory::new(events)),
        save_dir: dir.path().join("save"),
        log_dir: dir.path().join("log"),
    };
    (Controller::new(deps), dir)
}

#[tokio::test]
async fn s5_rotate_event_is_checkpointed() {
    common::log::init_test_log();
    let events = vec![FakeEvent::Rotate(RotateEvent {
        next_log_name: "mysql-bin.000042".into(),
        position: 4,
    })];
    let (controller, dir) = controller_with(events);

    let id = controller.create(params()).await.unwrap();
    controller.start(id, false).await.unwrap();

    // Give the spawned run() + checkpoint loop a beat to process the
    // scripted rotate event before we tear down.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    controller.stop(id).await.unwrap();

    let save_path = dir.path().join("save").join(id.to_string()).join("save.info");
    let contents = std::fs::read_to_string(save_path).unwrap();
    assert!(contents.contains("mysql-bin.000042"));
    assert!(contents.contains("4"));
}

#[tokio::test]
async fn s6_graceful_shutdown_stops_all_workers() {
    common::log::init_test_log();
    let (controller, _dir) = controller_with(vec![]);

    let a = controller.create(params()).await.unwrap();
    let b = controller.create(params()).await.unwrap();
    controller.start(a, false).await.unwrap();
    controller.start(b, false).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    controller.close().await.unwrap();

    let status = controller.status().await;
    assert!(status.is_empty());
}

#[tokio::test]
async fn row_events_publish_in_order_before_rotate_checkpoints() {
    let events = vec![
        FakeEvent::Row(RowEvent {
            action: Action::Insert,
            table: table(),
            rows: vec![vec![ColumnValue::Int(1), ColumnValue::Text("a".into())]],
        }),
        FakeEvent::Row(RowEvent {
            action: Action::Insert,
            table: table(),
            rows: vec![vec![ColumnValue::Int(2), ColumnValue::Text("b".into())]],
        }),
        FakeEvent::Rotate(RotateEvent {
            next_log_name: "mysql-bin.000001".into(),
            position: 10,
        }),
    ];
    let (controller, dir) = controller_with(events);

    let id = controller.create(params()).await.unwrap();
    controller.start(id, false).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    controller.stop(id).await.unwrap();

    let save_path = dir.path().join("save").join(id.to_string()).join("save.info");
    let contents = std::fs::read_to_string(save_path).unwrap();
    assert!(contents.contains("mysql-bin.000001"));
}
