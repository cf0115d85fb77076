use std::thread;
use std::cmp::Ordering;
use std::collections::{ BinaryHeap, HashSet };
use std::panic::{ self, AssertUnwindSafe };
use std::sync::atomic::{ AtomicU64, Ordering as AtomicOrdering };

use crossbeam_channel::{ bounded, unbounded, Receiver, Sender };
use log::{ debug, error, trace, warn };

use crate::error::PoolError;

/// A unit of work run by the pool.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Identifies a registered task.
pub type TaskId = u64;

/// Priority used by `register`.
pub const REGISTER_PRIORITY: i32 = 0;

/// Priority used by `submit`.
pub const SUBMIT_PRIORITY: i32 = 1;

/// Lifecycle of a `WorkerPool`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PoolState {
    /// Nothing has been registered yet.
    Idle,

    /// Tasks are queued but the pool is not dispatching them.
    Pending,

    /// Tasks are executing; more may be waiting in the queue.
    Running,

    /// The queue is empty; tasks are still executing.
    Draining,

    /// Everything that was queued has finished.
    Complete,
}

struct Task {
    id: TaskId,
    priority: i32,
    job: Job,
}

/// Higher priorities first; equal priorities in registration order.
impl Ord for Task {
    fn cmp(&self, other: &Task) -> Ordering {
        self.priority.cmp(&other.priority)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Task {
    fn partial_cmp(&self, other: &Task) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Task) -> bool {
        self.id == other.id && self.priority == other.priority
    }
}

impl Eq for Task { }

/// Messages sent to worker threads.
enum Message {
    Run(TaskId, Job),
    Terminate,
}

/// Messages sent to the dispatcher thread.
enum Event {
    Register(Task),
    Start(Sender<Result<(), PoolError>>),
    Finished(TaskId),
    Stop(Sender<bool>),
    Shutdown(Sender<()>),
    State(Sender<PoolState>),
    Terminate,
}

struct Worker {
    id: usize,
    thread: Option<thread::JoinHandle<()>>,
}

impl Worker {
    fn new(id: usize, receiver: Receiver<Message>, events: Sender<Event>)
        -> Worker {
        let thread = thread::spawn(move || loop {
            let message = match receiver.recv() {
                Ok(message) => message,
                Err(_) => break,
            };

            match message {
                Message::Run(task, job) => {
                    trace!("worker {} running task {}", id, task);

                    // A panicking task still counts as finished, otherwise
                    // the pool would never reach `Complete`.
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        error!("task {} panicked on worker {}", task, id);
                    }

                    if events.send(Event::Finished(task)).is_err() {
                        break;
                    }
                },

                Message::Terminate => break,
            }
        });

        Worker { id, thread: Some(thread) }
    }
}

/// Owns the queue, the running set and the pool state. All bookkeeping
/// happens on the dispatcher's own thread, driven by `Event`s.
struct Dispatcher {
    size: usize,
    state: PoolState,
    dispatching: bool,
    queue: BinaryHeap<Task>,
    running: HashSet<TaskId>,
    work: Sender<Message>,
    /// Each stop waiter with the tasks that were running when it arrived.
    stop_waiters: Vec<(HashSet<TaskId>, Sender<bool>)>,
    shutdown_waiters: Vec<Sender<()>>,
}

impl Dispatcher {
    fn run(mut self, events: Receiver<Event>) {
        for event in events.iter() {
            match event {
                Event::Register(task) => {
                    trace!("queued task {} with priority {}", task.id, task.priority);
                    self.queue.push(task);
                },

                Event::Start(reply) => {
                    let result = self.start();
                    let _ = reply.send(result);
                },

                Event::Finished(task) => {
                    self.running.remove(&task);
                    for (in_flight, _) in self.stop_waiters.iter_mut() {
                        in_flight.remove(&task);
                    }
                },

                Event::Stop(reply) => {
                    debug!("stopping dispatch with {} tasks in flight",
                        self.running.len());
                    self.dispatching = false;
                    self.stop_waiters.push((self.running.clone(), reply));
                },

                Event::Shutdown(reply) => {
                    if self.state == PoolState::Idle {
                        let _ = reply.send(());
                        continue;
                    }

                    self.dispatching = true;
                    self.shutdown_waiters.push(reply);
                },

                Event::State(reply) => {
                    let _ = reply.send(self.state);
                    continue;
                },

                Event::Terminate => break,
            }

            self.advance();
        }

        if !self.queue.is_empty() {
            warn!("worker pool dropped with {} queued tasks", self.queue.len());
        }
    }

    fn start(&mut self) -> Result<(), PoolError> {
        if self.queue.is_empty() && self.running.is_empty() {
            warn!("refusing to start a worker pool with an empty queue");
            return Err(PoolError::EmptyQueue);
        }

        self.dispatching = true;
        Ok(())
    }

    /// Fills free worker slots, recomputes the state and wakes up whoever
    /// is waiting on the new state.
    fn advance(&mut self) {
        if self.dispatching {
            while self.running.len() < self.size {
                let task = match self.queue.pop() {
                    Some(task) => task,
                    None => break,
                };

                self.running.insert(task.id);
                if self.work.send(Message::Run(task.id, task.job)).is_err() {
                    error!("no workers left to run task {}", task.id);
                    self.running.remove(&task.id);
                }
            }
        }

        self.state = match (self.running.is_empty(), self.queue.is_empty()) {
            (true, true) if self.state == PoolState::Idle => PoolState::Idle,
            (true, true) => PoolState::Complete,
            (true, false) => PoolState::Pending,
            (false, true) => PoolState::Draining,
            (false, false) => PoolState::Running,
        };

        let drained = self.running.is_empty() && self.queue.is_empty();
        self.stop_waiters.retain(|(in_flight, waiter)| {
            if in_flight.is_empty() {
                let _ = waiter.send(drained);
                false
            } else {
                true
            }
        });

        if self.state == PoolState::Complete {
            if self.dispatching {
                debug!("worker pool complete");
            }

            self.dispatching = false;
            for waiter in self.shutdown_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }
}

/// A fixed-size pool of worker threads running prioritized tasks.
///
/// Tasks are queued with `register` and only run once the pool is started
/// (`start`, `submit` or `shutdown`). At most `size` tasks run at once; as
/// each one finishes, the highest-priority queued task takes its slot.
///
/// # Examples
///
/// ```
/// # use std::sync::Arc;
/// # use std::sync::atomic::{ AtomicUsize, Ordering };
/// # use raycaster::parallel::{ WorkerPool, PoolState };
/// let pool = WorkerPool::new(4).unwrap();
/// let counter = Arc::new(AtomicUsize::new(0));
///
/// for _ in 0..10 {
///     let counter = Arc::clone(&counter);
///     pool.register(move || { counter.fetch_add(1, Ordering::SeqCst); }).unwrap();
/// }
///
/// pool.shutdown().unwrap();
/// assert_eq!(counter.load(Ordering::SeqCst), 10);
/// assert_eq!(pool.state().unwrap(), PoolState::Complete);
/// ```
pub struct WorkerPool {
    next_id: AtomicU64,
    events: Sender<Event>,
    work: Sender<Message>,
    workers: Vec<Worker>,
    dispatcher: Option<thread::JoinHandle<()>>,
}

impl WorkerPool {
    /// Creates a pool with `size` worker threads.
    pub fn new(size: usize) -> Result<WorkerPool, PoolError> {
        // There should be at least one thread to run tasks.
        if size == 0 {
            return Err(PoolError::ZeroSize);
        }

        let (events, event_receiver) = unbounded();
        let (work, work_receiver) = unbounded();

        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            workers.push(Worker::new(id, work_receiver.clone(), events.clone()));
        }

        let dispatcher = Dispatcher {
            size,
            state: PoolState::Idle,
            dispatching: false,
            queue: BinaryHeap::new(),
            running: HashSet::new(),
            work: work.clone(),
            stop_waiters: Vec::new(),
            shutdown_waiters: Vec::new(),
        };
        let dispatcher = thread::spawn(move || dispatcher.run(event_receiver));

        debug!("started worker pool with {} workers", size);
        Ok(WorkerPool {
            next_id: AtomicU64::new(0),
            events,
            work,
            workers,
            dispatcher: Some(dispatcher),
        })
    }

    /// Queues a task at the default registration priority without starting
    /// the pool.
    pub fn register<F>(&self, task: F) -> Result<TaskId, PoolError>
        where F: FnOnce() + Send + 'static {
        self.register_with_priority(task, REGISTER_PRIORITY)
    }

    /// Queues a task. Higher priorities run first.
    ///
    /// If the pool is already running, the task is picked up as soon as a
    /// worker is free.
    pub fn register_with_priority<F>(&self, task: F, priority: i32)
        -> Result<TaskId, PoolError> where F: FnOnce() + Send + 'static {
        let id = self.next_id.fetch_add(1, AtomicOrdering::Relaxed);
        let task = Task { id, priority, job: Box::new(task) };

        self.send(Event::Register(task))?;
        Ok(id)
    }

    /// Queues a task at the default submission priority and starts the pool.
    pub fn submit<F>(&self, task: F) -> Result<TaskId, PoolError>
        where F: FnOnce() + Send + 'static {
        self.submit_with_priority(task, SUBMIT_PRIORITY)
    }

    pub fn submit_with_priority<F>(&self, task: F, priority: i32)
        -> Result<TaskId, PoolError> where F: FnOnce() + Send + 'static {
        let id = self.register_with_priority(task, priority)?;
        self.start()?;
        Ok(id)
    }

    /// Starts dispatching queued tasks.
    ///
    /// Starting a running pool does nothing. Starting a pool with nothing
    /// queued and nothing running fails with `PoolError::EmptyQueue`.
    pub fn start(&self) -> Result<(), PoolError> {
        let (reply, response) = bounded(1);
        self.send(Event::Start(reply))?;
        response.recv().map_err(|_| PoolError::Disconnected)?
    }

    /// Stops dispatching and blocks until the tasks in flight finish.
    ///
    /// Only the tasks running when the call arrives are waited for, even if
    /// the pool is started again meanwhile. Queued tasks stay queued. Returns
    /// `true` if nothing is left to run or running, `false` otherwise (after
    /// an undisturbed stop with tasks queued the pool is `Pending`).
    pub fn stop(&self) -> Result<bool, PoolError> {
        let (reply, response) = bounded(1);
        self.send(Event::Stop(reply))?;
        response.recv().map_err(|_| PoolError::Disconnected)
    }

    /// Runs every queued task and blocks until the pool is `Complete`.
    ///
    /// Returns immediately if nothing was ever registered.
    pub fn shutdown(&self) -> Result<(), PoolError> {
        let (reply, response) = bounded(1);
        self.send(Event::Shutdown(reply))?;
        response.recv().map_err(|_| PoolError::Disconnected)
    }

    pub fn state(&self) -> Result<PoolState, PoolError> {
        let (reply, response) = bounded(1);
        self.send(Event::State(reply))?;
        response.recv().map_err(|_| PoolError::Disconnected)
    }

    fn send(&self, event: Event) -> Result<(), PoolError> {
        self.events.send(event).map_err(|_| PoolError::Disconnected)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        let _ = self.events.send(Event::Terminate);
        if let Some(dispatcher) = self.dispatcher.take() {
            if dispatcher.join().is_err() {
                error!("worker pool dispatcher panicked");
            }
        }

        for _ in &self.workers {
            let _ = self.work.send(Message::Terminate);
        }

        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    error!("worker {} panicked", worker.id);
                }
            }
        }
    }
}

/// Number of workers for a machine with `cores` cores running at the given
/// load factor. Always at least one.
pub fn default_pool_size(cores: usize, load: f64) -> usize {
    ((cores as f64 * load).floor() as usize).max(1)
}

#[test]
fn zero_sized_pool_is_rejected() {
    assert_eq!(WorkerPool::new(0).err(), Some(PoolError::ZeroSize));
}

#[test]
fn pool_sizing() {
    assert_eq!(default_pool_size(8, 0.7), 5);
    assert_eq!(default_pool_size(1, 0.7), 1);
    assert_eq!(default_pool_size(0, 0.7), 1);
    assert_eq!(default_pool_size(16, 1.0), 16);
}

#[test]
fn shutdown_runs_every_task() {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    let pool = WorkerPool::new(4).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..20 {
        let counter = Arc::clone(&counter);
        pool.register(move || {
            counter.fetch_add(1, AtomicOrdering::SeqCst);
        }).unwrap();
    }

    assert_eq!(pool.state().unwrap(), PoolState::Pending);
    pool.shutdown().unwrap();

    assert_eq!(counter.load(AtomicOrdering::SeqCst), 20);
    assert_eq!(pool.state().unwrap(), PoolState::Complete);
}

#[test]
fn start_with_empty_queue_fails() {
    let pool = WorkerPool::new(2).unwrap();

    assert_eq!(pool.start(), Err(PoolError::EmptyQueue));
    assert_eq!(pool.state().unwrap(), PoolState::Idle);
}

#[test]
fn shutdown_idle_pool_returns() {
    let pool = WorkerPool::new(2).unwrap();
    pool.shutdown().unwrap();
    assert_eq!(pool.state().unwrap(), PoolState::Idle);
}

#[test]
fn submit_starts_the_pool() {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    let pool = WorkerPool::new(2).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..5 {
        let counter = Arc::clone(&counter);
        pool.submit(move || {
            counter.fetch_add(1, AtomicOrdering::SeqCst);
        }).unwrap();
    }

    pool.shutdown().unwrap();
    assert_eq!(counter.load(AtomicOrdering::SeqCst), 5);

    // A completed pool can be reused.
    let c = Arc::clone(&counter);
    pool.submit(move || { c.fetch_add(1, AtomicOrdering::SeqCst); }).unwrap();
    pool.shutdown().unwrap();
    assert_eq!(counter.load(AtomicOrdering::SeqCst), 6);
    assert_eq!(pool.state().unwrap(), PoolState::Complete);
}

#[test]
fn stop_leaves_queued_tasks() {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    let pool = WorkerPool::new(1).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..5 {
        let counter = Arc::clone(&counter);
        pool.register(move || {
            thread::sleep(Duration::from_millis(20));
            counter.fetch_add(1, AtomicOrdering::SeqCst);
        }).unwrap();
    }

    pool.start().unwrap();
    let drained = pool.stop().unwrap();

    let done = counter.load(AtomicOrdering::SeqCst);
    assert!(!drained);
    assert!(done >= 1 && done < 5);
    assert_eq!(pool.state().unwrap(), PoolState::Pending);

    pool.shutdown().unwrap();
    assert_eq!(counter.load(AtomicOrdering::SeqCst), 5);
    assert_eq!(pool.state().unwrap(), PoolState::Complete);
}

#[test]
fn higher_priority_runs_first() {
    use std::sync::{ Arc, Mutex };

    let pool = WorkerPool::new(1).unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));

    for &(name, priority) in &[("a", 0), ("b", 5), ("c", 1), ("d", 5), ("e", 0)] {
        let order = Arc::clone(&order);
        pool.register_with_priority(move || {
            order.lock().unwrap().push(name);
        }, priority).unwrap();
    }

    pool.shutdown().unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["b", "d", "c", "a", "e"]);
}

#[test]
fn panicking_task_still_completes_pool() {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    let pool = WorkerPool::new(2).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    pool.register(|| panic!("boom")).unwrap();
    for _ in 0..3 {
        let counter = Arc::clone(&counter);
        pool.register(move || {
            counter.fetch_add(1, AtomicOrdering::SeqCst);
        }).unwrap();
    }

    pool.shutdown().unwrap();
    assert_eq!(counter.load(AtomicOrdering::SeqCst), 3);
    assert_eq!(pool.state().unwrap(), PoolState::Complete);
}

#[test]
fn stop_waits_only_for_tasks_in_flight() {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    let pool = Arc::new(WorkerPool::new(1).unwrap());
    let counter = Arc::new(AtomicUsize::new(0));
    let (release, gate) = bounded::<()>(0);

    pool.register_with_priority(move || { let _ = gate.recv(); }, 1).unwrap();
    for _ in 0..3 {
        let counter = Arc::clone(&counter);
        pool.register(move || {
            thread::sleep(Duration::from_millis(100));
            counter.fetch_add(1, AtomicOrdering::SeqCst);
        }).unwrap();
    }
    pool.start().unwrap();

    let stopper = {
        let pool = Arc::clone(&pool);
        let counter = Arc::clone(&counter);
        thread::spawn(move || {
            let drained = pool.stop().unwrap();
            (drained, counter.load(AtomicOrdering::SeqCst))
        })
    };

    // Restart while the stop is still waiting on the gated task.
    thread::sleep(Duration::from_millis(50));
    pool.start().unwrap();
    release.send(()).unwrap();

    let (drained, done) = stopper.join().unwrap();
    assert!(!drained);
    assert!(done < 3);

    pool.shutdown().unwrap();
    assert_eq!(counter.load(AtomicOrdering::SeqCst), 3);
}
