//! Process environment helpers shared by unit tests that call `Config::load`.

use std::env;
use std::sync::{Mutex, MutexGuard};

static ENV_LOCK: Mutex<()> = Mutex::new(());

pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct EnvGuard {
    key: &'static str,
    old: Option<String>,
}

impl EnvGuard {
    pub fn set(key: &'static str, value: &str) -> Self {
        let old = env::var(key).ok();
        env::set_var(key, value);
        Self { key, old }
    }

    pub fn clear(key: &'static str) -> Self {
        let old = env::var(key).ok();
        env::remove_var(key);
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        if let Some(v) = &self.old {
            env::set_var(self.key, v);
        } else {
            env::remove_var(self.key);
        }
    }
}

pub fn clear_server_env() -> Vec<EnvGuard> {
    vec![
        EnvGuard::clear("ENV"),
        EnvGuard::clear("LISTEN_ADDR"),
        EnvGuard::clear("LOG_LEVEL"),
        EnvGuard::clear("WRAPPING_KEY"),
    ]
}
