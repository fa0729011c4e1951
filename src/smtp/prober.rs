//! Concurrent credential probing: cartesian generation, a worker pool,
//! aggregation and stop control.
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use log::{debug, warn};
use parking_lot::Mutex;

use crate::error::ProbeResult;
use crate::smtp::config::{ProbeParams, SmtpConfig};
use crate::smtp::connection::{AuthOutcome, Connection};
use crate::smtp::stream::{SmtpStream, TcpSmtpStream};

/// Row-major cartesian walk over usernames × passwords. Every pair is handed
/// out exactly once.
#[derive(Debug)]
pub struct CredentialCursor {
    usernames: Vec<String>,
    passwords: Vec<String>,
    user_idx: usize,
    pass_idx: usize,
}

impl CredentialCursor {
    pub fn new(usernames: &[String], passwords: &[String]) -> Self {
        CredentialCursor {
            usernames: usernames.to_vec(),
            passwords: passwords.to_vec(),
            user_idx: 0,
            pass_idx: 0,
        }
    }

    pub fn total(&self) -> u64 {
        self.usernames.len() as u64 * self.passwords.len() as u64
    }

    /// The next pair in row-major order (outer loop = username).
    pub fn next_pair(&mut self) -> Option<(String, String)> {
        if self.passwords.is_empty() || self.user_idx >= self.usernames.len() {
            return None;
        }

        let pair = (
            self.usernames[self.user_idx].clone(),
            self.passwords[self.pass_idx].clone(),
        );

        self.pass_idx += 1;
        if self.pass_idx == self.passwords.len() {
            self.pass_idx = 0;
            self.user_idx += 1;
        }

        Some(pair)
    }
}

/// How a probe ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeStatus {
    /// every pair was attempted
    Completed,
    /// the stop flag cut the run short
    StoppedEarly,
    /// a worker hit a non-recoverable error
    Aborted(String),
}

#[derive(Debug)]
pub struct ProbeReport {
    /// Successful outcomes, in no particular order.
    pub outcomes: Vec<AuthOutcome>,
    pub attempts: u64,
    pub status: ProbeStatus,
}

pub type SuccessCallback = Arc<dyn Fn(&AuthOutcome) + Send + Sync>;
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;
pub type StreamFactory = Arc<dyn Fn() -> ProbeResult<Box<dyn SmtpStream>> + Send + Sync>;

// everything a worker can reach; each piece takes its own lock
struct ProbeState {
    cursor: Mutex<CredentialCursor>,
    successes: Mutex<Vec<AuthOutcome>>,
    stop: AtomicBool,
    completed: AtomicU64,
    total: u64,
    abort: Mutex<Option<String>>,
}

pub struct Prober {
    config: Arc<SmtpConfig>,
    params: Arc<ProbeParams>,
    state: Arc<ProbeState>,
    factory: StreamFactory,
    on_success: Option<SuccessCallback>,
    on_progress: Option<ProgressCallback>,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl Prober {
    pub fn new(config: SmtpConfig, params: ProbeParams) -> Self {
        let tcp = {
            let config = config.clone();
            move || -> ProbeResult<Box<dyn SmtpStream>> {
                let stream = TcpSmtpStream::connect(&config.host, config.port, config.timeout)?;
                Ok(Box::new(stream) as Box<dyn SmtpStream>)
            }
        };
        Self::with_factory(config, params, Arc::new(tcp))
    }

    /// Inject the stream source; tests drive mock streams through here.
    pub fn with_factory(config: SmtpConfig, params: ProbeParams, factory: StreamFactory) -> Self {
        let cursor = CredentialCursor::new(&params.usernames, &params.passwords);
        let total = cursor.total();

        Prober {
            config: Arc::new(config),
            params: Arc::new(params),
            state: Arc::new(ProbeState {
                cursor: Mutex::new(cursor),
                successes: Mutex::new(Vec::new()),
                stop: AtomicBool::new(false),
                completed: AtomicU64::new(0),
                total,
                abort: Mutex::new(None),
            }),
            factory,
            on_success: None,
            on_progress: None,
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Invoked once per successful outcome. Set before `start`.
    pub fn set_success_callback(&mut self, callback: SuccessCallback) {
        self.on_success = Some(callback);
    }

    /// Invoked after each attempt with `(total_planned, completed)`. Set
    /// before `start`.
    pub fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.on_progress = Some(callback);
    }

    /// Spawn the worker pool and return immediately.
    pub fn start(&self) {
        let parallelism = self.params.parallelism.max(1);
        let mut workers = self.workers.lock();

        for worker_id in 0..parallelism {
            let params = Arc::clone(&self.params);
            let config = Arc::clone(&self.config);
            let state = Arc::clone(&self.state);
            let factory = Arc::clone(&self.factory);
            let on_success = self.on_success.clone();
            let on_progress = self.on_progress.clone();

            workers.push(thread::spawn(move || {
                worker_loop(
                    worker_id,
                    &config,
                    &params,
                    &state,
                    &factory,
                    on_success,
                    on_progress,
                );
            }));
        }
    }

    /// Block until all workers have exited, then assemble the report.
    pub fn wait(&self) -> ProbeReport {
        self.join_workers();

        let outcomes = self.state.successes.lock().clone();
        let attempts = self.state.completed.load(Ordering::Relaxed);
        let status = match self.state.abort.lock().clone() {
            Some(reason) => ProbeStatus::Aborted(reason),
            None if attempts == self.state.total => ProbeStatus::Completed,
            None => ProbeStatus::StoppedEarly,
        };

        ProbeReport {
            outcomes,
            attempts,
            status,
        }
    }

    /// Run to completion on the calling thread.
    pub fn run(&self) -> ProbeReport {
        self.start();
        self.wait()
    }

    /// Request a stop and block until every worker has exited. Idempotent;
    /// in-flight attempts complete normally.
    pub fn stop(&self) {
        self.state.stop.store(true, Ordering::SeqCst);
        self.join_workers();
    }

    fn join_workers(&self) {
        let handles: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in handles {
            // a worker that panicked already released its stream on unwind
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    worker_id: u16,
    config: &SmtpConfig,
    params: &ProbeParams,
    state: &ProbeState,
    factory: &StreamFactory,
    on_success: Option<SuccessCallback>,
    on_progress: Option<ProgressCallback>,
) {
    loop {
        // the stop flag is observed at pull boundaries only
        if state.stop.load(Ordering::SeqCst) {
            debug!("worker {} observed stop", worker_id);
            break;
        }

        // the cursor lock covers just the pull
        let pair = state.cursor.lock().next_pair();
        let (username, password) = match pair {
            Some(pair) => pair,
            None => break,
        };

        let mut connection = Connection::new(config);
        let result = connection.run(factory.as_ref(), &username, &password);

        let attempts = state.completed.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(callback) = &on_progress {
            callback(state.total, attempts);
        }

        match result {
            Ok(outcome) => {
                if outcome.success {
                    if let Some(callback) = &on_success {
                        callback(&outcome);
                    }
                    state.successes.lock().push(outcome);
                    if params.stop_on_first_success {
                        state.stop.store(true, Ordering::SeqCst);
                    }
                }
            }
            Err(e) => {
                warn!("worker {} aborting the probe: {}", worker_id, e);
                let mut abort = state.abort.lock();
                if abort.is_none() {
                    *abort = Some(e.to_string());
                }
                state.stop.store(true, Ordering::SeqCst);
            }
        }
    }
}
