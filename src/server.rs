use std::{
    io::{BufReader, Write},
    net::{TcpListener, TcpStream},
    sync::{Arc, Mutex},
    thread,
};

use crate::{
    dispatch::Dispatcher,
    error::{TowerError, TowerResult},
    request::DrawRequest,
};

/// Accept drawing streams over TCP.
///
/// This is a stand-in for the RPC transport: each connection carries a
/// stream of JSON `DrawRequest` values and receives a single JSON
/// `DrawResponse` once the client shuts down its write side. Streams are
/// serialized through the shared dispatcher, so primitives of concurrent
/// clients never interleave.
pub fn serve(listener: TcpListener, dispatcher: Dispatcher) -> TowerResult<()> {
    let dispatcher = Arc::new(Mutex::new(dispatcher));
    for conn in listener.incoming() {
        match conn {
            Ok(stream) => {
                let dispatcher = Arc::clone(&dispatcher);
                thread::spawn(move || {
                    let peer = stream
                        .peer_addr()
                        .map(|a| a.to_string())
                        .unwrap_or_else(|_| "<unknown>".to_string());
                    log::info!("client connected: {peer}");
                    if let Err(e) = handle_client(stream, &dispatcher) {
                        log::warn!("stream from {peer} aborted: {e}");
                    }
                });
            }
            Err(e) => log::warn!("accept failed: {e}"),
        }
    }
    Ok(())
}

fn handle_client(stream: TcpStream, dispatcher: &Mutex<Dispatcher>) -> TowerResult<()> {
    let reader = BufReader::new(
        stream
            .try_clone()
            .map_err(|e| TowerError::transport(e.to_string()))?,
    );
    let requests = serde_json::Deserializer::from_reader(reader)
        .into_iter::<DrawRequest>()
        .map(|r| r.map_err(|e| TowerError::transport(e.to_string())));

    let response = {
        let mut dispatcher = dispatcher
            .lock()
            .map_err(|_| TowerError::transport("dispatcher poisoned"))?;
        dispatcher.run_stream(requests)?
    };

    let mut stream = stream;
    serde_json::to_writer(&mut stream, &response)
        .map_err(|e| TowerError::transport(e.to_string()))?;
    stream
        .write_all(b"\n")
        .map_err(|e| TowerError::transport(e.to_string()))?;
    Ok(())
}
