//! UDP transport shared by both roles
//!
//! Each transport owns its socket and a private current-thread runtime. Nothing
//! runs in the background: the runtime only makes progress while the owner is
//! inside [`Transport::poll`], [`Transport::recv_until`], a send, or teardown.
//! A single receive task reads datagrams, decodes them and forwards them over a
//! channel; the owner drains that channel on its own thread.

use crate::error::NetworkError;
use crate::packet::Packet;
use log::{debug, error, info};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const RECEIVE_BUFFER_SIZE: usize = 2048;
/// Scheduler rounds per poll; each round lets the I/O driver report readiness
const PUMP_ROUNDS: usize = 8;

/// A decoded packet and the endpoint it came from
#[derive(Debug, Clone)]
pub struct Inbound {
    pub packet: Packet,
    pub from: SocketAddr,
}

/// Strictly increasing sender-local clock in microseconds
#[derive(Debug)]
pub struct SenderClock {
    origin: Instant,
    last: u64,
}

impl SenderClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last: 0,
        }
    }

    pub fn stamp(&mut self) -> u64 {
        let now = self.origin.elapsed().as_micros().min(u64::MAX as u128) as u64;
        self.last = now.max(self.last + 1);
        self.last
    }
}

impl Default for SenderClock {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Transport {
    runtime: Runtime,
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    inbound_rx: mpsc::UnboundedReceiver<Inbound>,
    receiver: Option<JoinHandle<()>>,
    closing: Arc<AtomicBool>,
    ticks: u32,
    tick_divisor: u32,
    clock: SenderClock,
}

impl Transport {
    pub fn bind(addr: SocketAddr, tick_divisor: u32) -> Result<Self, NetworkError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let socket = runtime.block_on(UdpSocket::bind(addr))?;
        let local_addr = socket.local_addr()?;
        info!("Transport bound to {}", local_addr);

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        Ok(Self {
            runtime,
            socket: Arc::new(socket),
            local_addr,
            inbound_tx,
            inbound_rx,
            receiver: None,
            closing: Arc::new(AtomicBool::new(false)),
            ticks: 0,
            tick_divisor: tick_divisor.max(1),
            clock: SenderClock::new(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Resolves `address` to its first IPv4 endpoint
    pub fn resolve(&self, address: &str) -> Result<SocketAddr, NetworkError> {
        let resolved = self
            .runtime
            .block_on(tokio::net::lookup_host(address))
            .map_err(|e| {
                debug!("Lookup of {} failed: {}", address, e);
                NetworkError::Resolve {
                    address: address.to_string(),
                }
            })?;

        resolved
            .into_iter()
            .find(SocketAddr::is_ipv4)
            .ok_or_else(|| NetworkError::Resolve {
                address: address.to_string(),
            })
    }

    pub fn is_listening(&self) -> bool {
        self.receiver.is_some()
    }

    /// Arms the single outstanding receive, which re-arms itself after every
    /// datagram until the transport shuts down
    pub fn listen_for_one(&mut self) {
        if self.receiver.is_some() || self.closing.load(Ordering::Acquire) {
            return;
        }

        let socket = Arc::clone(&self.socket);
        let inbound = self.inbound_tx.clone();
        let closing = Arc::clone(&self.closing);

        self.receiver = Some(
            self.runtime
                .spawn(Self::receive_loop(socket, inbound, closing)),
        );
    }

    async fn receive_loop(
        socket: Arc<UdpSocket>,
        inbound: mpsc::UnboundedSender<Inbound>,
        closing: Arc<AtomicBool>,
    ) {
        let mut buffer = [0u8; RECEIVE_BUFFER_SIZE];

        loop {
            match socket.recv_from(&mut buffer).await {
                Ok((len, from)) => match Packet::decode(&buffer[..len]) {
                    Ok(packet) => {
                        if inbound.send(Inbound { packet, from }).is_err() {
                            break;
                        }
                    }
                    Err(e) => debug!("Dropping datagram from {}: {}", from, e),
                },
                Err(e) => {
                    if closing.load(Ordering::Acquire) {
                        break;
                    }
                    // ICMP errors from earlier sends surface here on some platforms
                    debug!("Error receiving packet: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }

    /// Runs a bounded pump of pending I/O and returns everything received
    pub fn poll(&mut self) -> Vec<Inbound> {
        self.runtime.block_on(async {
            for _ in 0..PUMP_ROUNDS {
                tokio::task::yield_now().await;
            }
        });

        let mut received = Vec::new();
        while let Ok(inbound) = self.inbound_rx.try_recv() {
            received.push(inbound);
        }
        received
    }

    /// Blocks until a packet arrives or `deadline` passes
    pub fn recv_until(&mut self, deadline: Instant) -> Option<Inbound> {
        let inbound = &mut self.inbound_rx;
        let deadline = tokio::time::Instant::from_std(deadline);

        self.runtime.block_on(async move {
            tokio::time::timeout_at(deadline, inbound.recv())
                .await
                .ok()
                .flatten()
        })
    }

    /// Counts one update; true on every `tick_divisor`-th call
    pub fn tick(&mut self) -> bool {
        self.ticks += 1;
        if self.ticks >= self.tick_divisor {
            self.ticks = 0;
            true
        } else {
            false
        }
    }

    /// Stamps and sends a packet; delivery is never confirmed
    pub fn send_to(&mut self, packet: Packet, addr: SocketAddr) -> Result<(), NetworkError> {
        self.send_to_all(packet, &[addr])
    }

    /// Stamps a packet once and sends it to every address.
    ///
    /// Per-address send failures are logged, only encoding errors are returned.
    pub fn send_to_all(&mut self, mut packet: Packet, addrs: &[SocketAddr]) -> Result<(), NetworkError> {
        if self.closing.load(Ordering::Acquire) {
            return Ok(());
        }

        packet.timestamp = self.clock.stamp();
        let data = packet.encode()?;

        for addr in addrs {
            if let Err(e) = self.runtime.block_on(self.socket.send_to(&data, *addr)) {
                error!("Failed to send {:?} to {}: {}", packet.packet_type(), addr, e);
            }
        }
        Ok(())
    }

    /// Cancels the outstanding receive and drains it before the socket goes away.
    ///
    /// Safe to call more than once; also runs on drop.
    pub fn shutdown(&mut self) {
        if self.closing.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(receiver) = self.receiver.take() {
            receiver.abort();
            let _ = self.runtime.block_on(receiver);
        }

        while self.inbound_rx.try_recv().is_ok() {}
        info!("Transport on {} closed", self.local_addr);
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.shutdown();
    }
}
