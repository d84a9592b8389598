use serde::{Deserialize, Serialize};

/// Shape of the values an environment produces or accepts.
///
/// Every worker in a pool is expected to report the same pair of spaces.
/// `Box` bounds may be infinite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Space {
    Discrete {
        n: u64,
    },
    Box {
        low: Vec<f32>,
        high: Vec<f32>,
        shape: Vec<usize>,
    },
    MultiDiscrete {
        nvec: Vec<u64>,
    },
    MultiBinary {
        n: usize,
    },
}

impl Space {
    /// A box where every dimension shares the same bounds.
    pub fn uniform_box(low: f32, high: f32, shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Space::Box {
            low: vec![low; len],
            high: vec![high; len],
            shape,
        }
    }
}

/// One normalized step result: the only shape the coordinator ever sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition<O, I> {
    pub obs: O,
    pub rew: f32,
    pub done: bool,
    pub info: I,
}

/// Per-worker step results stacked into index-aligned columns.
///
/// Position `i` of every column came from worker `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct StepBatch<O, I> {
    pub obs: Vec<O>,
    pub rews: Vec<f32>,
    pub dones: Vec<bool>,
    pub infos: Vec<I>,
}

impl<O, I> StepBatch<O, I> {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            obs: Vec::with_capacity(n),
            rews: Vec::with_capacity(n),
            dones: Vec::with_capacity(n),
            infos: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, t: Transition<O, I>) {
        self.obs.push(t.obs);
        self.rews.push(t.rew);
        self.dones.push(t.done);
        self.infos.push(t.info);
    }

    pub fn len(&self) -> usize {
        self.obs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obs.is_empty()
    }

    /// Walk the batch row by row as `(obs, rew, done, info)`.
    pub fn iter(&self) -> impl Iterator<Item = (&O, f32, bool, &I)> + '_ {
        self.obs
            .iter()
            .zip(&self.rews)
            .zip(&self.dones)
            .zip(&self.infos)
            .map(|(((o, r), d), i)| (o, *r, *d, i))
    }
}

impl<O, I> FromIterator<Transition<O, I>> for StepBatch<O, I> {
    fn from_iter<T: IntoIterator<Item = Transition<O, I>>>(iter: T) -> Self {
        let iter = iter.into_iter();
        let mut batch = StepBatch::with_capacity(iter.size_hint().0);
        for t in iter {
            batch.push(t);
        }
        batch
    }
}
