//! Ordered, reliable, bidirectional frame pipe between the coordinator and
//! one worker.
//!
//! Each direction is a tokio unbounded mpsc queue, so sends never block and
//! frames arrive in the order they were sent. Receives come in two flavours:
//! [`Duplex::recv`] parks the calling OS thread and must not be used from
//! inside an async runtime, [`Duplex::recv_async`] awaits.
//!
//! There is no timeout. A receive whose peer never answers waits forever;
//! a receive whose peer has gone away returns [`Error::Closed`].

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

use crate::runtime::codec;
use crate::runtime::error::Error;

#[derive(Debug)]
pub struct Duplex {
    tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

/// Create both ends of a channel.
pub fn duplex() -> (Duplex, Duplex) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();
    (
        Duplex {
            tx: Some(a_tx),
            rx: a_rx,
        },
        Duplex {
            tx: Some(b_tx),
            rx: b_rx,
        },
    )
}

impl Duplex {
    pub fn send_frame(&self, frame: Vec<u8>) -> Result<(), Error> {
        let tx = self.tx.as_ref().ok_or(Error::Closed)?;
        tx.send(frame).map_err(|_| Error::Closed)
    }

    /// Block the current thread until a frame arrives.
    pub fn recv_frame(&mut self) -> Result<Vec<u8>, Error> {
        self.rx.blocking_recv().ok_or(Error::Closed)
    }

    pub async fn recv_frame_async(&mut self) -> Result<Vec<u8>, Error> {
        self.rx.recv().await.ok_or(Error::Closed)
    }

    pub fn send<T: Serialize>(&self, msg: &T) -> Result<(), Error> {
        self.send_frame(codec::encode(msg)?)
    }

    pub fn recv<T: DeserializeOwned>(&mut self) -> Result<T, Error> {
        codec::decode(&self.recv_frame()?)
    }

    pub async fn recv_async<T: DeserializeOwned>(&mut self) -> Result<T, Error> {
        codec::decode(&self.recv_frame_async().await?)
    }

    /// Stop sending and refuse further frames from the peer. Frames already
    /// queued on our side can still be received.
    pub fn close(&mut self) {
        self.tx = None;
        self.rx.close();
    }

    /// True once our side is closed or the peer has dropped its receiver.
    pub fn is_closed(&self) -> bool {
        self.tx.as_ref().is_none_or(|tx| tx.is_closed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn frames_arrive_in_send_order() {
        let (a, mut b) = duplex();
        for i in 0..100u32 {
            a.send(&i).unwrap();
        }
        let got: Vec<u32> = (0..100).map(|_| b.recv().unwrap()).collect();
        assert_eq!(got, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn recv_blocks_until_peer_sends() {
        let (mut a, b) = duplex();
        let peer = thread::spawn(move || {
            thread::sleep(std::time::Duration::from_millis(20));
            b.send(&"late").unwrap();
            b
        });
        let msg: String = a.recv().unwrap();
        assert_eq!(msg, "late");
        peer.join().unwrap();
    }

    #[test]
    fn dropped_peer_reads_as_closed() {
        let (mut a, b) = duplex();
        b.send(&1u8).unwrap();
        drop(b);
        assert_eq!(a.recv::<u8>().unwrap(), 1, "queued frame survives the drop");
        assert!(matches!(a.recv::<u8>(), Err(Error::Closed)));
        assert!(matches!(a.send(&2u8), Err(Error::Closed)));
        assert!(a.is_closed());
    }

    #[test]
    fn close_stops_both_directions() {
        let (mut a, mut b) = duplex();
        a.close();
        assert!(a.is_closed());
        assert!(matches!(a.send(&0u8), Err(Error::Closed)));
        assert!(matches!(b.send(&0u8), Err(Error::Closed)));
        assert!(matches!(b.recv::<u8>(), Err(Error::Closed)));
    }

    #[test]
    fn recv_async_awaits_frame() {
        let (a, mut b) = duplex();
        a.send(&vec![3, 1, 4]).unwrap();
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let got: Vec<i32> = rt.block_on(b.recv_async()).unwrap();
        assert_eq!(got, vec![3, 1, 4]);
    }
}
