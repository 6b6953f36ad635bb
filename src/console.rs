//! Operational commands for the host application's console
//!
//! Each command reports human readable progress to a [`Report`] sink and
//! returns the underlying result so callers can react to failures.

use crate::network::Network;
use log::info;
use shared::config::TransportKind;
use shared::error::NetworkError;
use shared::world::{PuppetBehavior, World};

/// Destination for console output
pub trait Report {
    fn report(&mut self, line: &str);
}

impl Report for Vec<String> {
    fn report(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// Forwards console lines to the log at `info` level
#[derive(Debug, Default)]
pub struct LogReport;

impl Report for LogReport {
    fn report(&mut self, line: &str) {
        info!("{}", line);
    }
}

fn finish(out: &mut dyn Report, result: Result<(), NetworkError>, done: &str) -> Result<(), NetworkError> {
    match &result {
        Ok(()) => out.report(done),
        Err(e) => out.report(&e.to_string()),
    }
    result
}

pub fn join(
    network: &mut Network,
    address: &str,
    secret: &str,
    world: &mut dyn World,
    out: &mut dyn Report,
) -> Result<(), NetworkError> {
    out.report(&format!("Connecting to {} ...", address));
    let result = network.connect(address, secret, world);
    finish(out, result, "Connected.")
}

pub fn host(
    network: &mut Network,
    port: u16,
    transport: &str,
    out: &mut dyn Report,
) -> Result<(), NetworkError> {
    let result = transport.parse::<TransportKind>().and_then(|kind| {
        out.report(&format!("Opening a server on port {}.", port));
        network.open_server(port, kind)
    });
    finish(out, result, "Server open.")
}

pub fn leave(network: &mut Network, out: &mut dyn Report) -> Result<(), NetworkError> {
    let result = network.close();
    finish(out, result, "Network closed.")
}

/// Registers a puppet and hands its entity over to the network
pub fn register_puppet(
    network: &mut Network,
    secret: &str,
    entity: &str,
    world: &mut dyn World,
    out: &mut dyn Report,
) -> Result<(), NetworkError> {
    let result = network.create_puppet(secret, entity).and_then(|()| {
        if let Err(e) = world.attach_puppet(entity, PuppetBehavior::new(secret)) {
            network.remove_puppet(secret)?;
            return Err(e.into());
        }
        Ok(())
    });
    finish(out, result, "Created a Networked Puppet.")
}
