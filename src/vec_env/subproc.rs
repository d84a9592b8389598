//! The coordinator: N worker threads behind one batched interface.
//!
//! Every operation talks to all workers in index order: send one command
//! to each, then receive one reply from each. Per-channel FIFO is what
//! matches the k-th reply of worker `i` to the k-th command sent to it.
//! Replies are always collected from every worker, even after one of them
//! fails, so no channel is left holding a stale reply.
//!
//! Each worker tracks how many replies it still owes and keeps the reply to
//! the latest command once it has been read. Awaited collection can then be
//! cancelled at any point and picked up again (or drained) later. Replies
//! owed for abandoned commands are skipped when the next one is read.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::JoinHandle;

use async_trait::async_trait;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::PoolConfig;
use super::errors::{ConstructionError, ContractError, PoolError};
use super::traits::{AsyncVecEnv, VecEnv};
use crate::env::{Env, EnvRegistry, EnvSpec, Space, StepBatch, Transition};
use crate::runtime::{self, Command, Duplex, Envelope, Reply, codec, worker};

type EnvReply<E> = Reply<<E as Env>::Obs, <E as Env>::Info>;

struct Worker {
    channel: Duplex,
    thread: Option<JoinHandle<()>>,
    /// Replies still owed for commands already sent.
    owed: usize,
    /// Reply to the latest command, once read off the channel.
    inbox: Option<Result<Vec<u8>, runtime::Error>>,
}

impl Worker {
    fn new(channel: Duplex, thread: JoinHandle<()>) -> Self {
        Self {
            channel,
            thread: Some(thread),
            owed: 0,
            inbox: None,
        }
    }

    /// Send a command. A send to a dead worker still counts as owed so the
    /// receive side reports it.
    fn send_frame(&mut self, frame: Vec<u8>) -> Result<(), runtime::Error> {
        self.inbox = None;
        self.owed += 1;
        self.channel.send_frame(frame)
    }

    fn settle(&mut self, frame: Result<Vec<u8>, runtime::Error>) {
        match frame {
            Ok(frame) => {
                self.owed -= 1;
                if self.owed == 0 {
                    self.inbox = Some(Ok(frame));
                }
            }
            Err(e) => {
                self.owed = 0;
                self.inbox = Some(Err(e));
            }
        }
    }

    /// Block until the reply to the latest command is in the inbox.
    fn receive(&mut self) {
        while self.owed > 0 {
            let frame = self.channel.recv_frame();
            self.settle(frame);
        }
    }

    /// Await the reply to the latest command. Every frame is settled as soon
    /// as it is read, so dropping this future loses nothing.
    async fn receive_async(&mut self) {
        while self.owed > 0 {
            let frame = self.channel.recv_frame_async().await;
            self.settle(frame);
        }
    }

    fn take_reply<O: DeserializeOwned, I: DeserializeOwned>(
        &mut self,
    ) -> Result<Reply<O, I>, runtime::Error> {
        let frame = self
            .inbox
            .take()
            .unwrap_or_else(|| Err(runtime::Error::Protocol("no reply to collect".into())))?;
        codec::decode(&frame)
    }
}

/// Vectorized environment running each instance on its own worker thread.
///
/// Built from one [`EnvSpec`] per worker. Observation and action spaces are
/// taken from worker 0 and are fixed for the lifetime of the pool.
///
/// The blocking methods of [`VecEnv`] must not be called from inside an
/// async runtime; use [`AsyncVecEnv`] there.
pub struct SubprocVecEnv<E: Env> {
    workers: Vec<Worker>,
    observation_space: Space,
    action_space: Space,
    waiting: bool,
    closed: bool,
    pool_id: Uuid,
    _phantom: PhantomData<fn() -> E>,
}

impl<E: Env> fmt::Debug for SubprocVecEnv<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubprocVecEnv")
            .field("pool_id", &self.pool_id)
            .field("num_envs", &self.workers.len())
            .field("observation_space", &self.observation_space)
            .field("action_space", &self.action_space)
            .field("waiting", &self.waiting)
            .field("closed", &self.closed)
            .finish()
    }
}

impl<E: Env> SubprocVecEnv<E> {
    /// Start one worker per spec.
    ///
    /// # Errors
    ///
    /// [`ConstructionError`] if `specs` is empty, a spec cannot be wrapped,
    /// a thread cannot be spawned, a worker fails to build its environment,
    /// or the spaces cannot be fetched. Workers already started are shut
    /// down before the error is returned.
    pub fn new(
        registry: Arc<EnvRegistry<E>>,
        specs: Vec<EnvSpec>,
        config: PoolConfig,
    ) -> Result<Self, PoolError> {
        if specs.is_empty() {
            return Err(ConstructionError::Empty.into());
        }
        let pool_id = Uuid::new_v4();
        let mut workers = Vec::with_capacity(specs.len());

        for (index, spec) in specs.iter().enumerate() {
            let started = Envelope::wrap(spec)
                .map_err(|source| ConstructionError::Serialization { index, source })
                .and_then(|envelope| {
                    worker::spawn(
                        config.thread_builder(index),
                        index,
                        pool_id,
                        Arc::clone(&registry),
                        envelope,
                    )
                    .map_err(|source| ConstructionError::Spawn { index, source })
                });
            match started {
                Ok((channel, thread)) => workers.push(Worker::new(channel, thread)),
                Err(e) => {
                    shutdown(&mut workers, pool_id);
                    return Err(e.into());
                }
            }
        }

        match start::<E>(&mut workers, &config) {
            Ok((observation_space, action_space)) => {
                info!(pool = %pool_id, num_envs = workers.len(), "pool started");
                Ok(Self {
                    workers,
                    observation_space,
                    action_space,
                    waiting: false,
                    closed: false,
                    pool_id,
                    _phantom: PhantomData,
                })
            }
            Err(e) => {
                error!(pool = %pool_id, error = %e, "pool failed to start");
                shutdown(&mut workers, pool_id);
                Err(e.into())
            }
        }
    }

    /// Start `num_envs` copies of `spec`, each with its own derived seed.
    pub fn make(
        registry: Arc<EnvRegistry<E>>,
        spec: &EnvSpec,
        num_envs: usize,
        config: PoolConfig,
    ) -> Result<Self, PoolError> {
        let specs = (0..num_envs).map(|i| spec.for_worker(i)).collect();
        Self::new(registry, specs, config)
    }

    pub fn pool_id(&self) -> Uuid {
        self.pool_id
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn check_open(&self) -> Result<(), PoolError> {
        if self.closed {
            return Err(ContractError::Closed.into());
        }
        Ok(())
    }

    fn broadcast(&mut self, command: Command<()>) -> Result<(), PoolError> {
        for (index, w) in self.workers.iter_mut().enumerate() {
            let frame = codec::encode(&command)
                .map_err(|source| PoolError::Serialization { index, source })?;
            match w.send_frame(frame) {
                Ok(()) => {}
                // A dead worker's receive reports it.
                Err(runtime::Error::Closed) => {
                    debug!(pool = %self.pool_id, worker = index, cmd = command.name(), "worker gone")
                }
                Err(source) => return Err(PoolError::Serialization { index, source }),
            }
        }
        Ok(())
    }

    fn collect<T>(
        &mut self,
        command: &'static str,
        extract: fn(EnvReply<E>) -> Option<T>,
    ) -> Result<Vec<T>, PoolError> {
        self.workers.iter_mut().for_each(Worker::receive);
        self.take_replies(command, extract)
    }

    async fn collect_await<T>(
        &mut self,
        command: &'static str,
        extract: fn(EnvReply<E>) -> Option<T>,
    ) -> Result<Vec<T>, PoolError> {
        join_all(self.workers.iter_mut().map(Worker::receive_async)).await;
        self.take_replies(command, extract)
    }

    fn take_replies<T>(
        &mut self,
        command: &'static str,
        extract: fn(EnvReply<E>) -> Option<T>,
    ) -> Result<Vec<T>, PoolError> {
        let results = self.workers.iter_mut().enumerate().map(|(index, w)| {
            w.take_reply::<E::Obs, E::Info>()
                .map_err(|e| PoolError::from_runtime(index, e))
                .and_then(|reply| interpret(index, command, reply, extract))
        });
        gather(self.pool_id, results)
    }

    fn owes_replies(&self) -> bool {
        self.workers.iter().any(|w| w.owed > 0)
    }

    /// Read and discard every reply still owed.
    fn drain(&mut self) {
        for w in &mut self.workers {
            w.receive();
            w.inbox = None;
        }
        self.waiting = false;
    }

    async fn drain_await(&mut self) {
        join_all(self.workers.iter_mut().map(Worker::receive_async)).await;
        for w in &mut self.workers {
            w.inbox = None;
        }
        self.waiting = false;
    }

    /// Drop a pending step. Its replies are skipped by the next collection.
    fn abandon_step(&mut self, command: &'static str) {
        if self.waiting {
            warn!(pool = %self.pool_id, cmd = command, "step still pending; discarding it");
            self.waiting = false;
        }
    }

    fn finish_close(&mut self) {
        shutdown(&mut self.workers, self.pool_id);
        self.closed = true;
        info!(pool = %self.pool_id, "pool closed");
    }
}

impl<E: Env> VecEnv for SubprocVecEnv<E> {
    type Obs = E::Obs;
    type Act = E::Act;
    type Info = E::Info;

    fn num_envs(&self) -> usize {
        self.workers.len()
    }

    fn observation_space(&self) -> &Space {
        &self.observation_space
    }

    fn action_space(&self) -> &Space {
        &self.action_space
    }

    fn reset(&mut self) -> Result<Vec<E::Obs>, PoolError> {
        self.check_open()?;
        self.abandon_step("reset");
        self.broadcast(Command::Reset)?;
        self.collect("reset", obs_of)
    }

    fn reset_task(&mut self) -> Result<Vec<E::Obs>, PoolError> {
        self.check_open()?;
        self.abandon_step("reset_task");
        self.broadcast(Command::ResetTask)?;
        self.collect("reset_task", obs_of)
    }

    fn step_async(&mut self, actions: Vec<E::Act>) -> Result<(), PoolError> {
        self.check_open()?;
        if self.waiting {
            return Err(ContractError::AlreadyWaiting.into());
        }
        if actions.len() != self.workers.len() {
            return Err(ContractError::ActionCount {
                expected: self.workers.len(),
                got: actions.len(),
            }
            .into());
        }

        // Encode everything first so a bad action leaves the pool untouched.
        let frames = actions
            .iter()
            .enumerate()
            .map(|(index, act)| {
                codec::encode(&Command::Step(act))
                    .map_err(|source| PoolError::Serialization { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (index, (w, frame)) in self.workers.iter_mut().zip(frames).enumerate() {
            if w.send_frame(frame).is_err() {
                debug!(pool = %self.pool_id, worker = index, "worker gone; step_wait will report it");
            }
        }
        self.waiting = true;
        Ok(())
    }

    fn step_wait(&mut self) -> Result<StepBatch<E::Obs, E::Info>, PoolError> {
        self.check_open()?;
        if !self.waiting {
            return Err(ContractError::NotWaiting.into());
        }
        let results = self.collect("step", transition_of);
        self.waiting = false;
        results.map(|ts| ts.into_iter().collect())
    }

    fn close(&mut self) -> Result<(), PoolError> {
        if self.closed {
            return Ok(());
        }
        if self.owes_replies() {
            debug!(pool = %self.pool_id, "draining outstanding replies before close");
            self.drain();
        }
        self.finish_close();
        Ok(())
    }
}

#[async_trait]
impl<E: Env> AsyncVecEnv for SubprocVecEnv<E> {
    async fn reset_await(&mut self) -> Result<Vec<E::Obs>, PoolError> {
        self.check_open()?;
        self.abandon_step("reset");
        self.broadcast(Command::Reset)?;
        self.collect_await("reset", obs_of).await
    }

    async fn reset_task_await(&mut self) -> Result<Vec<E::Obs>, PoolError> {
        self.check_open()?;
        self.abandon_step("reset_task");
        self.broadcast(Command::ResetTask)?;
        self.collect_await("reset_task", obs_of).await
    }

    async fn step_wait_await(&mut self) -> Result<StepBatch<E::Obs, E::Info>, PoolError> {
        self.check_open()?;
        if !self.waiting {
            return Err(ContractError::NotWaiting.into());
        }
        let results = self.collect_await("step", transition_of).await;
        self.waiting = false;
        results.map(|ts| ts.into_iter().collect())
    }

    async fn close_await(&mut self) -> Result<(), PoolError> {
        if self.closed {
            return Ok(());
        }
        if self.owes_replies() {
            debug!(pool = %self.pool_id, "draining outstanding replies before close");
            self.drain_await().await;
        }
        self.finish_close();
        Ok(())
    }
}

/// Shuts the workers down without reading outstanding replies, so dropping
/// a waiting pool never blocks on a receive (and is fine inside a runtime).
impl<E: Env> Drop for SubprocVecEnv<E> {
    fn drop(&mut self) {
        if !self.closed {
            if self.waiting {
                debug!(pool = %self.pool_id, "dropped with a step pending");
            }
            self.finish_close();
        }
    }
}

/// Wait for every worker's startup handshake, then adopt worker 0's spaces.
fn start<E: Env>(
    workers: &mut [Worker],
    config: &PoolConfig,
) -> Result<(Space, Space), ConstructionError> {
    for (index, w) in workers.iter_mut().enumerate() {
        match w.channel.recv::<EnvReply<E>>() {
            Ok(Reply::Ready) => {}
            Ok(Reply::Failed(message)) => return Err(ConstructionError::Startup { index, message }),
            Ok(other) => {
                return Err(ConstructionError::Startup {
                    index,
                    message: format!("unexpected `{}` reply during startup", other.name()),
                });
            }
            Err(e) => {
                return Err(ConstructionError::Startup {
                    index,
                    message: e.to_string(),
                });
            }
        }
    }

    let spaces = fetch_spaces::<E>(&mut workers[0], 0)?;
    if config.verify_spaces {
        for (index, w) in workers.iter_mut().enumerate().skip(1) {
            if fetch_spaces::<E>(w, index)? != spaces {
                return Err(ConstructionError::SpaceMismatch { index });
            }
        }
    }
    Ok(spaces)
}

fn fetch_spaces<E: Env>(w: &mut Worker, index: usize) -> Result<(Space, Space), ConstructionError> {
    let startup = |e: PoolError| ConstructionError::Startup {
        index,
        message: format!("cannot fetch spaces: {e}"),
    };
    w.channel
        .send(&Command::<()>::GetSpaces)
        .map_err(|e| startup(PoolError::from_runtime(index, e)))?;
    let reply = w
        .channel
        .recv::<EnvReply<E>>()
        .map_err(|e| startup(PoolError::from_runtime(index, e)))?;
    interpret(index, "get_spaces", reply, spaces_of).map_err(startup)
}

/// Send `close` to every worker still listening and join every thread.
fn shutdown(workers: &mut [Worker], pool: Uuid) {
    for (index, w) in workers.iter_mut().enumerate() {
        if w.channel.send(&Command::<()>::Close).is_err() {
            debug!(pool = %pool, worker = index, "worker already gone");
        }
        w.channel.close();
    }
    for (index, w) in workers.iter_mut().enumerate() {
        if let Some(thread) = w.thread.take() {
            if thread.join().is_err() {
                warn!(pool = %pool, worker = index, "worker panicked");
            }
        }
    }
}

fn interpret<O, I, T>(
    index: usize,
    command: &'static str,
    reply: Reply<O, I>,
    extract: fn(Reply<O, I>) -> Option<T>,
) -> Result<T, PoolError> {
    match reply {
        Reply::Failed(message) => Err(PoolError::Env { index, message }),
        reply => {
            let name = reply.name();
            extract(reply).ok_or(PoolError::UnexpectedReply {
                index,
                command,
                reply: name,
            })
        }
    }
}

/// Keep every value, or the first error in worker order. Consumes the whole
/// iterator either way.
fn gather<T>(
    pool: Uuid,
    results: impl Iterator<Item = Result<T, PoolError>>,
) -> Result<Vec<T>, PoolError> {
    let mut values = Vec::new();
    let mut first = None;
    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(e) => {
                error!(pool = %pool, error = %e, "worker call failed");
                first.get_or_insert(e);
            }
        }
    }
    match first {
        Some(e) => Err(e),
        None => Ok(values),
    }
}

fn spaces_of<O, I>(reply: Reply<O, I>) -> Option<(Space, Space)> {
    match reply {
        Reply::Spaces {
            observation_space,
            action_space,
        } => Some((observation_space, action_space)),
        _ => None,
    }
}

fn obs_of<O, I>(reply: Reply<O, I>) -> Option<O> {
    match reply {
        Reply::Obs(obs) => Some(obs),
        _ => None,
    }
}

fn transition_of<O, I>(reply: Reply<O, I>) -> Option<Transition<O, I>> {
    match reply {
        Reply::Step(t) => Some(t),
        _ => None,
    }
}
