//! The worker side of a pool: one thread, one environment, one channel.
//!
//! A worker answers exactly one reply per command, in command order, until
//! it is told to close. It stops without replying when it receives a frame
//! it cannot decode, and after reporting the first environment error.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::env::{self, Env, EnvRegistry, EnvSpec};
use crate::runtime::channel::{Duplex, duplex};
use crate::runtime::codec;
use crate::runtime::envelope::Envelope;
use crate::runtime::error::Error;
use crate::runtime::protocol::{Command, Reply};

/// Start a worker thread and return the coordinator's end of its channel.
///
/// The worker opens `envelope`, builds its environment from `registry` and
/// then sends either `Ready` or `Failed` before serving commands.
pub fn spawn<E: Env>(
    builder: thread::Builder,
    index: usize,
    pool: Uuid,
    registry: Arc<EnvRegistry<E>>,
    envelope: Envelope<EnvSpec>,
) -> io::Result<(Duplex, JoinHandle<()>)> {
    let (parent, mut child) = duplex();
    let handle = builder.spawn(move || {
        let span = tracing::info_span!("env_worker", pool = %pool, worker = index);
        let _enter = span.enter();

        let env = match build(&registry, &envelope) {
            Ok(env) => env,
            Err(e) => {
                error!(error = %e, "failed to build environment");
                let _ = child.send(&Reply::<E::Obs, E::Info>::Failed(e.to_string()));
                return;
            }
        };
        if child.send(&Reply::<E::Obs, E::Info>::Ready).is_err() {
            debug!("coordinator gone before startup finished");
            return;
        }
        debug!("serving");

        match run(env, &mut child) {
            Ok(()) => debug!("worker stopped"),
            Err(e) => error!(error = %e, "worker terminated"),
        }
    })?;
    Ok((parent, handle))
}

fn build<E: Env>(registry: &EnvRegistry<E>, envelope: &Envelope<EnvSpec>) -> Result<E, Error> {
    let spec = envelope.open()?;
    debug!(id = %spec.id, seed = ?spec.seed, "building environment");
    Ok(registry.make(&spec)?)
}

/// Serve commands for `env` until `Close`, a hang-up, or a fatal error.
pub fn run<E: Env>(mut env: E, channel: &mut Duplex) -> Result<(), Error> {
    loop {
        let frame = match channel.recv_frame() {
            Ok(frame) => frame,
            Err(Error::Closed) => {
                debug!("coordinator hung up");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let command: Command<E::Act> = codec::decode(&frame)
            .map_err(|e| Error::Protocol(format!("unrecognized command: {e}")))?;
        debug!(cmd = command.name(), "command");

        let reply = match command {
            Command::GetSpaces => Ok(Reply::Spaces {
                observation_space: env.observation_space(),
                action_space: env.action_space(),
            }),
            Command::Reset => env::reset_obs(&mut env).map(Reply::Obs),
            Command::ResetTask => env.reset_task().map(Reply::Obs),
            Command::Step(act) => env::step_with_auto_reset(&mut env, act).map(Reply::Step),
            Command::Close => {
                if let Err(e) = env.close() {
                    warn!(error = %e, "environment close failed");
                }
                channel.close();
                return Ok(());
            }
        };

        let sent = reply
            .map_err(Error::from)
            .and_then(|reply| channel.send(&reply));
        match sent {
            Ok(()) => {}
            Err(Error::Closed) => {
                debug!("coordinator hung up before the reply");
                return Ok(());
            }
            Err(e) => {
                // One report, then this worker is done.
                let _ = channel.send(&Reply::<E::Obs, E::Info>::Failed(e.to_string()));
                return Err(e);
            }
        }
    }
}
