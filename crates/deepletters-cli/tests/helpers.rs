#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{self, Cursor, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use deepletters_cli::cli::Deps;
use deepletters_cli::letters::{
    system_rand, ContentKey, KeyWrapService, KeyWrapper, LetterError,
};

pub const TEST_MASTER: [u8; 32] = [0x5A; 32];

/// A shared buffer that implements Write for capturing output.
#[derive(Clone)]
pub struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn new() -> Self {
        SharedBuf(Arc::new(Mutex::new(Vec::new())))
    }

    pub fn to_string(&self) -> String {
        let buf = self.0.lock().unwrap();
        String::from_utf8_lossy(&buf).to_string()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// In-process stand-in for the key service.
pub struct MockWrapApi {
    service: KeyWrapService,
    error: Option<LetterError>,
}

impl KeyWrapper for MockWrapApi {
    fn wrap(&self, content_key: &str) -> Result<String, LetterError> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => self.service.wrap(content_key),
        }
    }

    fn unwrap(&self, wrapped_key: &str) -> Result<String, LetterError> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => self.service.unwrap(wrapped_key),
        }
    }
}

/// Build test Deps with configurable options.
pub struct TestDepsBuilder {
    stdin_data: Vec<u8>,
    is_tty: bool,
    is_stdout_tty: bool,
    env: HashMap<String, String>,
    master: [u8; 32],
    wrap_error: Option<LetterError>,
    rng_error: bool,
    now: DateTime<Utc>,
    api_urls: Arc<Mutex<Vec<String>>>,
}

impl TestDepsBuilder {
    pub fn new() -> Self {
        TestDepsBuilder {
            stdin_data: Vec::new(),
            is_tty: false,
            is_stdout_tty: false,
            env: HashMap::new(),
            master: TEST_MASTER,
            wrap_error: None,
            rng_error: false,
            now: Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
            api_urls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn stdin(mut self, data: &[u8]) -> Self {
        self.stdin_data = data.to_vec();
        self
    }

    pub fn is_tty(mut self, v: bool) -> Self {
        self.is_tty = v;
        self
    }

    pub fn env(mut self, key: &str, val: &str) -> Self {
        self.env.insert(key.to_string(), val.to_string());
        self
    }

    pub fn master(mut self, master: [u8; 32]) -> Self {
        self.master = master;
        self
    }

    pub fn wrap_error(mut self, err: LetterError) -> Self {
        self.wrap_error = Some(err);
        self
    }

    pub fn rng_error(mut self) -> Self {
        self.rng_error = true;
        self
    }

    /// URLs passed to `make_api`, in call order.
    pub fn api_urls(&self) -> Arc<Mutex<Vec<String>>> {
        self.api_urls.clone()
    }

    pub fn build(self) -> (Deps, SharedBuf, SharedBuf) {
        let stdout = SharedBuf::new();
        let stderr = SharedBuf::new();
        let stdout_clone = stdout.clone();
        let stderr_clone = stderr.clone();

        let is_tty = self.is_tty;
        let is_stdout_tty = self.is_stdout_tty;
        let env = self.env;
        let master = self.master;
        let wrap_error = self.wrap_error;
        let rng_error = self.rng_error;
        let now = self.now;
        let api_urls = self.api_urls;

        let deps = Deps {
            stdin: Box::new(Cursor::new(self.stdin_data)),
            stdout: Box::new(stdout_clone),
            stderr: Box::new(stderr_clone),
            is_tty: Box::new(move || is_tty),
            is_stdout_tty: Box::new(move || is_stdout_tty),
            getenv: Box::new(move |key: &str| env.get(key).cloned()),
            rand_bytes: Box::new(move |buf: &mut [u8]| {
                if rng_error {
                    return Err(LetterError::RngError("entropy unavailable".into()));
                }
                system_rand(buf)
            }),
            make_api: Box::new(move |base_url: &str| {
                api_urls.lock().unwrap().push(base_url.to_string());
                let key = ContentKey::from_bytes(&master).unwrap();
                Box::new(MockWrapApi {
                    service: KeyWrapService::new(key),
                    error: wrap_error.clone(),
                }) as Box<dyn KeyWrapper>
            }),
            now: Box::new(move || now),
        };

        (deps, stdout, stderr)
    }
}

/// Helper to build args vec from a slice of &str.
pub fn args(strs: &[&str]) -> Vec<String> {
    strs.iter().map(|s| s.to_string()).collect()
}

/// A fresh, empty per-test directory under the system temp dir.
pub fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "deepletters_cli_{}_{}_{:?}",
        name,
        std::process::id(),
        std::thread::current().id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
