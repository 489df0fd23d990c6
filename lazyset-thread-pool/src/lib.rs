use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};

use crossbeam::channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex};

enum Task {
    Action(Box<dyn FnOnce() + Send + 'static>),
    Terminate,
}

/// Submitted-but-unfinished task accounting shared with the workers.
#[derive(Default)]
struct Pending {
    count: Mutex<usize>,
    drained: Condvar,
    panicked: AtomicUsize,
}

impl Pending {
    fn add(&self) {
        *self.count.lock() += 1;
    }

    fn finish(&self) {
        let mut count = self.count.lock();
        *count -= 1;
        if *count == 0 {
            self.drained.notify_all();
        }
    }

    fn wait(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.drained.wait(&mut count);
        }
    }
}

/// Fixed-size pool of worker threads fed over a channel.
pub struct ThreadPool {
    workers: Vec<Worker>,
    sender: Sender<Task>,
    pending: Arc<Pending>,
}

impl ThreadPool {
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "ThreadPool size must be greater than 0.");

        let (sender, receiver) = crossbeam::channel::unbounded();
        let pending = Arc::new(Pending::default());
        let workers = (0..size)
            .map(|id| Worker::new(id, receiver.clone(), pending.clone()))
            .collect();
        Self {
            workers,
            sender,
            pending,
        }
    }

    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pending.add();
        self.sender
            .send(Task::Action(Box::new(f)))
            .expect("Failed to send job.");
    }

    /// Blocks until every task submitted so far has finished.
    pub fn wait(&self) {
        self.pending.wait();
    }

    /// Runs `tasks` across the pool and returns the wall-clock time from the
    /// first submission until the last task finished.
    pub fn run_timed<I, F>(&self, tasks: I) -> Duration
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() + Send + 'static,
    {
        let start = Instant::now();
        for task in tasks {
            self.execute(task);
        }
        self.wait();
        start.elapsed()
    }

    /// Number of tasks that panicked since the pool was created.
    pub fn panicked(&self) -> usize {
        self.pending.panicked.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        for _ in 0..self.len() {
            self.sender
                .send(Task::Terminate)
                .expect("Failed to send termination signal.");
        }

        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                thread.join().expect("Failed to join worker thread.");
            }
        }
    }
}

struct Worker {
    _id: usize,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    fn new(id: usize, recv: Receiver<Task>, pending: Arc<Pending>) -> Self {
        let thread = std::thread::Builder::new()
            .name(format!("worker-{}", id))
            .spawn(move || {
                Self::run_loop(id, recv, pending);
            })
            .expect("Failed to create worker thread.");
        Self {
            _id: id,
            thread: Some(thread),
        }
    }

    fn run_loop(id: usize, recv: Receiver<Task>, pending: Arc<Pending>) {
        loop {
            match recv.recv() {
                Ok(Task::Action(action)) => {
                    tracing::trace!("Worker {} got a job; executing.", id);
                    if panic::catch_unwind(AssertUnwindSafe(action)).is_err() {
                        tracing::error!("Worker {} job panicked.", id);
                        pending.panicked.fetch_add(1, Ordering::SeqCst);
                    }
                    pending.finish();
                }
                Ok(Task::Terminate) => {
                    tracing::debug!("Worker {} terminated; shutting down.", id);
                    break;
                }
                Err(_) => {
                    tracing::error!("Worker {} disconnected; shutting down.", id);
                    break;
                }
            }
        }
    }
}
