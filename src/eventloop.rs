//! The worker thread a reload session lives on
//!
//! an EventLoop owns one thread running a LocalPool. Tasks sent from other threads are spawned into
//! that pool, tasks and futures added from the thread itself go straight to its LocalSpawner. The
//! session, its ScriptLoader and every completion future stay on this thread.

use crate::error::ReloadError;
use futures::executor::{LocalPool, LocalSpawner};
use futures::task::{LocalSpawnExt, SpawnExt};
use std::cell::RefCell;
use std::fmt::Formatter;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

static LOOP_IDS: AtomicUsize = AtomicUsize::new(0);

type Task = Box<dyn FnOnce() + Send + 'static>;

thread_local! {
    static SPAWNER: RefCell<Option<LocalSpawner>> = RefCell::new(None);
    static LOOP_ID: RefCell<Option<usize>> = RefCell::new(None);
}

pub struct EventLoop {
    tx: Sender<Task>,
    join_handle: Option<JoinHandle<()>>,
    id: usize,
}

impl EventLoop {
    /// start the worker thread
    ///
    /// idle_tick bounds how long the worker waits for a task, futures woken from other threads
    /// are polled at the latest one tick later
    pub fn new(idle_tick: Duration) -> Self {
        let (tx, rx) = channel::<Task>();
        let id = LOOP_IDS.fetch_add(1, Ordering::SeqCst);

        let join_handle = std::thread::spawn(move || Self::run_worker(id, rx, idle_tick));
        log::debug!("EventLoop {} started", id);

        Self {
            tx,
            join_handle: Some(join_handle),
            id,
        }
    }

    fn run_worker(id: usize, rx: Receiver<Task>, idle_tick: Duration) {
        let mut pool = LocalPool::new();
        let spawner = pool.spawner();
        LOOP_ID.with(|rc| *rc.borrow_mut() = Some(id));
        SPAWNER.with(|rc| *rc.borrow_mut() = Some(spawner.clone()));

        loop {
            match rx.recv_timeout(idle_tick) {
                Ok(task) => {
                    if let Err(e) = spawner.spawn(async move { task() }) {
                        log::error!("EventLoop {} could not spawn task: {}", id, e);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    SPAWNER.with(|rc| rc.borrow_mut().take());
                }
            }

            pool.run_until_stalled();

            if SPAWNER.with(|rc| rc.borrow().is_none()) {
                break;
            }
        }
        // completions still pending hold the session's loader, drop them on this thread
        drop(pool);
        log::debug!("EventLoop {} worker done", id);
    }

    /// true if called from the worker thread of this loop
    pub fn is_my_pool_thread(&self) -> bool {
        LOOP_ID.with(|rc| *rc.borrow() == Some(self.id))
    }

    /// true if called from the worker thread of any loop
    pub fn is_a_pool_thread() -> bool {
        SPAWNER.with(|rc| rc.borrow().is_some())
    }

    /// the spawner of the current worker thread, None outside a loop or once it is stopping
    pub fn local_spawner() -> Option<LocalSpawner> {
        SPAWNER.with(|rc| rc.borrow().clone())
    }

    /// add a future to the loop from within a running task
    pub fn add_local_future_void<F: Future<Output = ()> + 'static>(fut: F) {
        match Self::local_spawner() {
            Some(spawner) => {
                if let Err(e) = spawner.spawn_local(fut) {
                    log::error!("EventLoop could not spawn local future: {}", e);
                }
            }
            None => log::error!("EventLoop: no running loop on this thread, dropping future"),
        }
    }

    /// add a task to the loop from within a running task
    pub fn add_local_void<T: FnOnce() + 'static>(task: T) {
        Self::add_local_future_void(async move { task() });
    }

    /// run a task on the worker thread and block until it returns
    ///
    /// called from the worker thread itself the task runs inline
    pub fn exe<R: Send + 'static, T: FnOnce() -> R + Send + 'static>(
        &self,
        task: T,
    ) -> Result<R, ReloadError> {
        if self.is_my_pool_thread() {
            return Ok(task());
        }
        let (tx, rx) = channel();
        self.add_void(move || {
            // the caller may have given up waiting
            let _ = tx.send(task());
        })?;
        rx.recv().map_err(|_| ReloadError::EventLoopStopped)
    }

    /// queue a task without waiting for it
    pub fn add_void<T: FnOnce() + Send + 'static>(&self, task: T) -> Result<(), ReloadError> {
        if self.is_my_pool_thread() {
            Self::add_local_void(task);
            return Ok(());
        }
        self.tx
            .send(Box::new(task))
            .map_err(|_| ReloadError::EventLoopStopped)
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        let stopping = self.exe(|| {
            SPAWNER.with(|rc| rc.borrow_mut().take());
        });
        if let Err(e) = stopping {
            log::debug!("EventLoop {} was already stopped: {}", self.id, e);
        }
        if let Some(join_handle) = self.join_handle.take() {
            let _ = join_handle.join();
        }
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "EventLoop({})", self.id)
    }
}
