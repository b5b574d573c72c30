use std::io::Write;
use std::net::TcpListener;

use log::{debug, info};

use crate::error::Result;
use crate::snapshot::Snapshot;
use crate::wire::SnapshotSerializer;

/// Stream one snapshot into `sink`, slice by slice. A failed write means the
/// client went away; the caller ends the session.
pub fn send_snapshot<W: Write>(sink: &mut W, snapshot: &Snapshot) -> std::io::Result<()> {
    let mut serializer = SnapshotSerializer::new(snapshot);
    loop {
        let piece = serializer.serialize_more();
        if piece.is_empty() {
            return Ok(());
        }
        sink.write_all(piece)?;
    }
}

/// Serve snapshots of `pid` to a single TCP client, back to back, until the
/// connection breaks. Exactly one client is accepted per session; the
/// listener is closed right after the accept so later connection attempts
/// are refused.
pub fn run(port: u16, pid: u32) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))?;
    info!("listening on port {}", port);

    let (mut stream, peer) = listener.accept()?;
    info!("client connected from {}", peer);
    drop(listener);

    loop {
        // snapshot and serializer live only for one transmission; peak
        // memory stays bounded by a single snapshot
        let snapshot = Snapshot::capture(pid);
        if let Err(err) = send_snapshot(&mut stream, &snapshot) {
            debug!("client went away: {}", err);
            break;
        }
    }
    Ok(())
}
