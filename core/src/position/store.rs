//! Position Store (C1): durable per-worker binlog coordinate with
//! time-throttled atomic writes. Grounded on
//! `original_source/domain/entity/syncmanager/savemanager/savemanager.go`
//! (`SaveInfo`/`LoadSaveInfo`), translated from its `sync.RWMutex` +
//! `ioutil2.WriteFileAtomic` shape into `std::sync::RwLock` + a
//! write-temp-then-rename on `std::fs`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use common::err::{CdcError, CdcResult, ErrorKind};

const PKG: &str = "core::position";
const THROTTLE: Duration = Duration::from_secs(1);

/// The persisted binlog coordinate: a file name plus a byte offset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPosition {
    #[serde(rename = "bin_name", default)]
    pub name: String,
    #[serde(rename = "bin_pos", default)]
    pub pos: u32,
}

struct Inner {
    current: SavedPosition,
    last_save_time: Option<Instant>,
    file_path: Option<PathBuf>,
}

/// Owns the on-disk `save.info` for one worker. Reads take a shared lock,
/// writes an exclusive one (invariant C1.c).
pub struct PositionStore {
    inner: RwLock<Inner>,
}

impl PositionStore {
    /// Creates `<save_dir>/<server_id>/` if missing and loads `save.info`
    /// if present. Absence of the file is not an error — an empty store is
    /// returned, bound to the path it would be written to.
    pub fn load(save_dir: &Path, server_id: u32) -> CdcResult<Self> {
        let dir = save_dir.join(server_id.to_string());
        fs::create_dir_all(&dir).map_err(|e| {
            CdcError::wrap(
                ErrorKind::File,
                PKG,
                format!("fail to create save dir {}", dir.display()),
                e,
            )
        })?;

        let file_path = dir.join("save.info");

        let current = match fs::read_to_string(&file_path) {
            Ok(data) => toml::from_str(&data).map_err(|e| {
                CdcError::wrap(
                    ErrorKind::File,
                    PKG,
                    format!("fail to decode {}", file_path.display()),
                    e,
                )
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SavedPosition::default(),
            Err(e) => {
                return Err(CdcError::wrap(
                    ErrorKind::File,
                    PKG,
                    format!("fail to read {}", file_path.display()),
                    e,
                ))
            }
        };

        Ok(PositionStore {
            inner: RwLock::new(Inner {
                current,
                last_save_time: None,
                file_path: Some(file_path),
            }),
        })
    }

    /// An in-memory-only store, used by tests and by the fake decoder path
    /// where no backing path is wanted.
    pub fn in_memory() -> Self {
        PositionStore {
            inner: RwLock::new(Inner {
                current: SavedPosition::default(),
                last_save_time: None,
                file_path: None,
            }),
        }
    }

    pub fn position(&self) -> SavedPosition {
        self.inner.read().unwrap().current.clone()
    }

    /// Updates the in-memory position only, without touching disk or the
    /// throttle clock. Used by the checkpoint loop (spec.md §4.5.2) to
    /// record a position arrival immediately — so `Close`'s final save
    /// always sees the latest position even if the next throttled write
    /// hasn't happened yet — while leaving the actual disk write to the
    /// periodic `save` call.
    pub fn update_in_memory(&self, pos: SavedPosition) {
        self.inner.write().unwrap().current = pos;
    }

    /// Updates the in-memory position; throttled to at most one disk write
    /// per wall-second per worker (invariant C1.a). Returns success without
    /// writing when throttled or when the store has no backing path.
    pub fn save(&self, pos: SavedPosition) -> CdcResult<()> {
        self.save_inner(pos, false)
    }

    /// Persists the final position on worker shutdown, bypassing the
    /// throttle (Open Question §9: the throttle must not apply here).
    pub fn close(&self) -> CdcResult<()> {
        let pos = self.position();
        self.save_inner(pos, true)
    }

    fn save_inner(&self, pos: SavedPosition, bypass_throttle: bool) -> CdcResult<()> {
        let mut inner = self.inner.write().unwrap();
        inner.current = pos;

        let Some(file_path) = inner.file_path.clone() else {
            return Ok(());
        };

        let now = Instant::now();
        if !bypass_throttle {
            if let Some(last) = inner.last_save_time {
                if now.duration_since(last) < THROTTLE {
                    return Ok(());
                }
            }
        }

        let encoded = toml::to_string(&inner.current).map_err(|e| {
            CdcError::wrap(ErrorKind::File, PKG, "fail to encode save.info", e)
        })?;

        write_atomic(&file_path, encoded.as_bytes()).map_err(|e| {
            CdcError::wrap(
                ErrorKind::File,
                PKG,
                format!("fail to write {}", file_path.display()),
                e,
            )
        })?;

        inner.last_save_time = Some(now);
        Ok(())
    }
}

/// Write-temp-then-rename: a crash never yields a truncated `save.info`
/// (invariant C1.b).
fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, data)?;
    fs::rename(&tmp_path, path)
}

#[cfg(test)]
mod test {
    use super::*;

    fn temp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn load_on_absent_file_returns_empty_store() {
        let dir = temp_dir();
        let store = PositionStore::load(dir.path(), 7).unwrap();
        assert_eq!(store.position(), SavedPosition::default());
    }

    #[test]
    fn save_then_close_then_reload_round_trips() {
        let dir = temp_dir();
        let store = PositionStore::load(dir.path(), 7).unwrap();

        store
            .save(SavedPosition {
                name: "mysql-bin.000042".into(),
                pos: 4,
            })
            .unwrap();
        store.close().unwrap();

        let reloaded = PositionStore::load(dir.path(), 7).unwrap();
        assert_eq!(
            reloaded.position(),
            SavedPosition {
                name: "mysql-bin.000042".into(),
                pos: 4,
            }
        );
    }

    #[test]
    fn repeated_saves_within_a_second_write_at_most_once() {
        let dir = temp_dir();
        let store = PositionStore::load(dir.path(), 7).unwrap();
        let file_path = dir.path().join("7").join("save.info");

        store
            .save(SavedPosition {
                name: "mysql-bin.000001".into(),
                pos: 10,
            })
            .unwrap();
        let first_mtime = fs::metadata(&file_path).unwrap().modified().unwrap();

        store
            .save(SavedPosition {
                name: "mysql-bin.000001".into(),
                pos: 20,
            })
            .unwrap();
        let second_mtime = fs::metadata(&file_path).unwrap().modified().unwrap();

        assert_eq!(first_mtime, second_mtime);
        // in-memory position still advances even though the write was throttled
        assert_eq!(store.position().pos, 20);
    }

    #[test]
    fn close_always_writes_regardless_of_throttle() {
        let dir = temp_dir();
        let store = PositionStore::load(dir.path(), 7).unwrap();
        let file_path = dir.path().join("7").join("save.info");

        store
            .save(SavedPosition {
                name: "mysql-bin.000001".into(),
                pos: 10,
            })
            .unwrap();
        let first_mtime = fs::metadata(&file_path).unwrap().modified().unwrap();

        std::thread::sleep(Duration::from_millis(5));
        store.close().unwrap();
        let second_mtime = fs::metadata(&file_path).unwrap().modified().unwrap();

        assert!(second_mtime >= first_mtime);
        assert_eq!(store.position().pos, 10);
    }

    #[test]
    fn in_memory_store_never_touches_disk() {
        let store = PositionStore::in_memory();
        store
            .save(SavedPosition {
                name: "x".into(),
                pos: 1,
            })
            .unwrap();
        store.close().unwrap();
        assert_eq!(store.position().pos, 1);
    }
}
