//! Test helpers for writing request files and observing backend settings.

use std::cell::RefCell;

use camino::{Utf8Path, Utf8PathBuf};
use fleetroute::{
    BackendConfig, Coordinate, Dispatcher, Load, SolveRequest, Waypoint, dispatcher,
};
use fleetroute_core::test_support::{scenario_matrix, single_vehicle};
use tempfile::TempDir;

use crate::CliError;
use crate::backend::DispatcherBuilder;

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent directories");
    }
    std::fs::write(path, contents).expect("write test file");
}

pub(super) fn workspace() -> (TempDir, Utf8PathBuf) {
    let tmp = TempDir::new().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf-8 workspace");
    (tmp, root)
}

/// The three-node matrix request whose optimal tour costs 12.
pub(super) fn scenario_request(solver: &str) -> SolveRequest {
    SolveRequest::with_matrix(solver, scenario_matrix(), single_vehicle(999))
        .with_demands(vec![Load::zero(), Load::scalar(3), Load::scalar(4)])
}

pub(super) fn write_request(path: &Utf8Path, request: &SolveRequest) {
    let payload = serde_json::to_string_pretty(request).expect("serialise request");
    write_utf8(path, payload.as_bytes());
}

/// A depot in San Francisco with stops in Los Angeles and Las Vegas.
pub(super) fn west_coast() -> Vec<Waypoint> {
    vec![
        Waypoint::depot("sf", Coordinate { x: -122.4194, y: 37.7749 }),
        Waypoint::stop("la", Coordinate { x: -118.2437, y: 34.0522 }),
        Waypoint::stop("lv", Coordinate { x: -115.1398, y: 36.1699 }),
    ]
}

/// Builds the default dispatcher and keeps the settings it was given.
#[derive(Default)]
pub(super) struct RecordingBuilder {
    pub(super) seen: RefCell<Option<BackendConfig>>,
}

impl DispatcherBuilder for RecordingBuilder {
    fn build(&self, config: &BackendConfig) -> Result<Dispatcher, CliError> {
        self.seen.replace(Some(config.clone()));
        Ok(dispatcher(config)?)
    }
}
