//! Messages exchanged between the coordinator and a worker.
//!
//! The schema is private to one pool; it is not a stable wire format.
//! Variants are encoded by position, so their order is part of the schema.

use serde::{Deserialize, Serialize};

use crate::env::{Space, Transition};

/// Coordinator to worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command<A> {
    GetSpaces,
    Reset,
    ResetTask,
    Step(A),
    Close,
}

impl<A> Command<A> {
    pub fn name(&self) -> &'static str {
        match self {
            Command::GetSpaces => "get_spaces",
            Command::Reset => "reset",
            Command::ResetTask => "reset_task",
            Command::Step(_) => "step",
            Command::Close => "close",
        }
    }
}

/// Worker to coordinator. `Close` gets no reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reply<O, I> {
    /// The environment was built; the worker is serving.
    Ready,
    Spaces {
        observation_space: Space,
        action_space: Space,
    },
    Obs(O),
    Step(Transition<O, I>),
    /// The worker hit an error and is shutting down.
    Failed(String),
}

impl<O, I> Reply<O, I> {
    pub fn name(&self) -> &'static str {
        match self {
            Reply::Ready => "ready",
            Reply::Spaces { .. } => "spaces",
            Reply::Obs(_) => "obs",
            Reply::Step(_) => "step",
            Reply::Failed(_) => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::codec;

    #[test]
    fn unit_commands_decode_for_any_action_type() {
        let frame = codec::encode(&Command::<()>::ResetTask).unwrap();
        let cmd: Command<Vec<f32>> = codec::decode(&frame).unwrap();
        assert_eq!(cmd, Command::ResetTask);
    }

    #[test]
    fn step_reply_keeps_non_finite_values() {
        let reply = Reply::<Vec<f32>, ()>::Step(Transition {
            obs: vec![f32::INFINITY, -1.0],
            rew: f32::NAN,
            done: false,
            info: (),
        });
        let frame = codec::encode(&reply).unwrap();
        match codec::decode::<Reply<Vec<f32>, ()>>(&frame).unwrap() {
            Reply::Step(t) => {
                assert_eq!(t.obs, vec![f32::INFINITY, -1.0]);
                assert!(t.rew.is_nan());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_command_does_not_decode() {
        let frame = codec::encode(&9u32).unwrap();
        assert!(codec::decode::<Command<f32>>(&frame).is_err());
    }
}
