/*
 * Test utilities for Fanpilot
 *
 * Fake hwmon directories and an event recorder shared by the unit tests.
 */

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

/// A throwaway directory laid out like an hwmon device
pub struct FakeHwmon {
    dir: TempDir,
}

impl FakeHwmon {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Temperature input holding `millidegrees`
    pub fn add_temp(&self, name: &str, millidegrees: i32) -> PathBuf {
        self.set(name, &format!("{}\n", millidegrees))
    }

    /// PWM file at mid speed, optionally with its `_enable` companion in automatic mode
    pub fn add_pwm(&self, name: &str, with_enable: bool) -> PathBuf {
        if with_enable {
            self.set(&format!("{}_enable", name), "2\n");
        }
        self.set(name, "128\n")
    }

    pub fn set(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, content).expect("failed to write fake hwmon file");
        path
    }

    pub fn remove(&self, name: &str) {
        fs::remove_file(self.path(name)).expect("failed to remove fake hwmon file");
    }

    /// Trimmed file content
    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path(name))
            .expect("failed to read fake hwmon file")
            .trim()
            .to_string()
    }
}

/// Ordered record of what mocks observed, shareable across mock closures
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}
