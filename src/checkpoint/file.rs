use super::{
    BackendInitError, CheckpointBackend, CheckpointError, Region, RegionMut, Version,
};
use log::{debug, info};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Backend-specific configuration, read from the file named on the
/// command line.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Directory holding the durable version store.
    pub checkpoint_dir: PathBuf,
}

impl BackendConfig {
    pub fn load(path: &Path) -> Result<Self, BackendInitError> {
        let text = fs::read_to_string(path).map_err(|source| BackendInitError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| BackendInitError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Version store on a shared filesystem, one file per
/// `(run id, rank, version)`. Files are written to the side and
/// renamed into place, so a version either exists completely or not at
/// all and a partial write never counts as durable.
pub struct FileBackend {
    dir: PathBuf,
    rank: usize,
    declared: Vec<(u32, usize)>,
}

impl FileBackend {
    pub fn initialize(config: &BackendConfig, rank: usize) -> Result<Self, BackendInitError> {
        fs::create_dir_all(&config.checkpoint_dir).map_err(|source| {
            BackendInitError::Storage {
                dir: config.checkpoint_dir.clone(),
                source,
            }
        })?;
        debug!(
            "rank {}: checkpoint store at {}",
            rank,
            config.checkpoint_dir.display()
        );
        Ok(FileBackend {
            dir: config.checkpoint_dir.clone(),
            rank,
            declared: Vec::new(),
        })
    }

    fn version_path(&self, run_id: &str, version: Version) -> PathBuf {
        self.dir
            .join(format!("{}.r{}.v{}.ckpt", run_id, self.rank, version))
    }

    fn check_declared(&self, regions: &[Region<'_>]) -> Result<(), CheckpointError> {
        for (id, declared) in &self.declared {
            let region = regions
                .iter()
                .find(|r| r.id == *id)
                .ok_or(CheckpointError::RegionMismatch {
                    id: *id,
                    declared: *declared,
                    got: 0,
                })?;
            if region.bytes.len() != *declared {
                return Err(CheckpointError::RegionMismatch {
                    id: *id,
                    declared: *declared,
                    got: region.bytes.len(),
                });
            }
        }
        Ok(())
    }

    fn scan_versions(&self, run_id: &str) -> Vec<Version> {
        let prefix = format!("{}.r{}.v", run_id, self.rank);
        let mut versions = Vec::new();
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return versions;
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(rest) = name.strip_prefix(&prefix) else {
                continue;
            };
            let Some(version) = rest.strip_suffix(".ckpt") else {
                continue;
            };
            if let Ok(version) = version.parse::<Version>() {
                versions.push(version);
            }
        }
        versions
    }
}

fn take<'a>(
    payload: &'a [u8],
    pos: &mut usize,
    n: usize,
    version: Version,
) -> Result<&'a [u8], CheckpointError> {
    let end = pos
        .checked_add(n)
        .ok_or(CheckpointError::Corrupt { version })?;
    let slice = payload
        .get(*pos..end)
        .ok_or(CheckpointError::Corrupt { version })?;
    *pos = end;
    Ok(slice)
}

impl CheckpointBackend for FileBackend {
    fn protect(&mut self, id: u32, len_bytes: usize) {
        debug_assert!(self.declared.iter().all(|(d, _)| *d != id));
        self.declared.push((id, len_bytes));
    }

    fn checkpoint(
        &mut self,
        run_id: &str,
        version: Version,
        regions: &[Region<'_>],
    ) -> Result<(), CheckpointError> {
        profiling::scope!("checkpoint::write");
        self.check_declared(regions)?;

        let total: usize = regions.iter().map(|r| 12 + r.bytes.len()).sum();
        let mut payload = Vec::with_capacity(4 + total);
        payload.extend_from_slice(&(regions.len() as u32).to_le_bytes());
        for region in regions {
            payload.extend_from_slice(&region.id.to_le_bytes());
            payload.extend_from_slice(&(region.bytes.len() as u64).to_le_bytes());
            payload.extend_from_slice(region.bytes);
        }

        let path = self.version_path(run_id, version);
        let staging = path.with_extension("tmp");
        let write = |source| CheckpointError::Write { version, source };
        fs::write(&staging, &payload).map_err(write)?;
        fs::rename(&staging, &path).map_err(write)?;
        info!(
            "rank {}: checkpoint {} version {} ({} bytes)",
            self.rank,
            run_id,
            version,
            payload.len()
        );
        Ok(())
    }

    fn restart_test(&mut self, run_id: &str, hint: Option<Version>) -> Option<Version> {
        match hint {
            Some(version) => self
                .version_path(run_id, version)
                .exists()
                .then_some(version),
            None => self.latest_version(run_id),
        }
    }

    fn restart(
        &mut self,
        run_id: &str,
        version: Version,
        regions: &mut [RegionMut<'_>],
    ) -> Result<(), CheckpointError> {
        profiling::scope!("checkpoint::read");
        let path = self.version_path(run_id, version);
        let payload = fs::read(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                CheckpointError::MissingVersion { version }
            } else {
                CheckpointError::Read { version, source }
            }
        })?;

        let mut pos = 0usize;
        let count = u32::from_le_bytes(take(&payload, &mut pos, 4, version)?.try_into().unwrap());
        let mut stored: Vec<(u32, &[u8])> = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let id =
                u32::from_le_bytes(take(&payload, &mut pos, 4, version)?.try_into().unwrap());
            let len =
                u64::from_le_bytes(take(&payload, &mut pos, 8, version)?.try_into().unwrap());
            stored.push((id, take(&payload, &mut pos, len as usize, version)?));
        }

        for region in regions {
            let (_, bytes) = stored
                .iter()
                .find(|(id, _)| *id == region.id)
                .ok_or(CheckpointError::MissingRegion {
                    version,
                    id: region.id,
                })?;
            if bytes.len() != region.bytes.len() {
                return Err(CheckpointError::RegionMismatch {
                    id: region.id,
                    declared: region.bytes.len(),
                    got: bytes.len(),
                });
            }
            region.bytes.copy_from_slice(bytes);
        }
        info!(
            "rank {}: restored {} version {}",
            self.rank, run_id, version
        );
        Ok(())
    }

    fn latest_version(&mut self, run_id: &str) -> Option<Version> {
        self.scan_versions(run_id).into_iter().max()
    }

    // No cleanup, later runs restart from what we leave behind.
    fn finalize(&mut self) {
        self.declared.clear();
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    fn backend(dir: &Path) -> FileBackend {
        let config = BackendConfig {
            checkpoint_dir: dir.to_path_buf(),
        };
        FileBackend::initialize(&config, 0).unwrap()
    }

    #[test]
    fn roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = backend(dir.path());
        backend.protect(0, 8);
        backend.protect(1, 4);

        let counter = 7u64.to_le_bytes();
        let data = [1u8, 2, 3, 4];
        backend
            .checkpoint(
                "trip",
                3,
                &[
                    Region {
                        id: 0,
                        bytes: &counter,
                    },
                    Region {
                        id: 1,
                        bytes: &data,
                    },
                ],
            )
            .unwrap();

        let mut counter_out = [0u8; 8];
        let mut data_out = [0u8; 4];
        backend
            .restart(
                "trip",
                3,
                &mut [
                    RegionMut {
                        id: 0,
                        bytes: &mut counter_out,
                    },
                    RegionMut {
                        id: 1,
                        bytes: &mut data_out,
                    },
                ],
            )
            .unwrap();
        assert_eq!(counter_out, counter);
        assert_eq!(data_out, data);
    }

    #[test]
    fn latest_version_tracks_the_newest_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = backend(dir.path());
        backend.protect(0, 1);
        assert_eq!(backend.latest_version("run"), None);

        for version in [2u64, 4, 6] {
            backend
                .checkpoint("run", version, &[Region { id: 0, bytes: &[9] }])
                .unwrap();
            assert_eq!(backend.latest_version("run"), Some(version));
        }

        // Another stream in the same directory is invisible.
        assert_eq!(backend.latest_version("other"), None);
    }

    #[test]
    fn restart_test_hint_selects_an_exact_version() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = backend(dir.path());
        backend.protect(0, 1);
        for version in [2u64, 4] {
            backend
                .checkpoint("run", version, &[Region { id: 0, bytes: &[9] }])
                .unwrap();
        }

        assert_eq!(backend.restart_test("run", None), Some(4));
        assert_eq!(backend.restart_test("run", Some(2)), Some(2));
        assert_eq!(backend.restart_test("run", Some(3)), None);
    }

    #[test]
    fn region_length_must_match_the_declaration() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = backend(dir.path());
        backend.protect(0, 8);
        let short = [1u8; 4];
        let result = backend.checkpoint(
            "run",
            1,
            &[Region {
                id: 0,
                bytes: &short,
            }],
        );
        assert!(matches!(
            result,
            Err(CheckpointError::RegionMismatch {
                id: 0,
                declared: 8,
                got: 4
            })
        ));
    }

    #[test]
    fn restart_of_a_missing_version_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = backend(dir.path());
        let mut out = [0u8; 1];
        let result = backend.restart(
            "run",
            5,
            &mut [RegionMut {
                id: 0,
                bytes: &mut out,
            }],
        );
        assert!(matches!(
            result,
            Err(CheckpointError::MissingVersion { version: 5 })
        ));
    }

    #[test]
    fn ranks_keep_separate_version_streams() {
        let dir = tempfile::tempdir().unwrap();
        let config = BackendConfig {
            checkpoint_dir: dir.path().to_path_buf(),
        };
        let mut rank0 = FileBackend::initialize(&config, 0).unwrap();
        let mut rank1 = FileBackend::initialize(&config, 1).unwrap();
        rank0.protect(0, 1);
        rank0
            .checkpoint("run", 2, &[Region { id: 0, bytes: &[1] }])
            .unwrap();
        assert_eq!(rank0.latest_version("run"), Some(2));
        assert_eq!(rank1.latest_version("run"), None);
    }
}
