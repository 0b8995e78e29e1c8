//! Loopback HTTP fixtures shared by the network tests.

use std::net::TcpListener;

/// Serves a warp filter on an ephemeral loopback port and evaluates to the
/// base URL.
macro_rules! spawn_station {
    ($routes:expr $(,)?) => {{
        let (addr, server) = warp::serve($routes).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        format!("http://{}", addr)
    }};
}

pub(crate) use spawn_station;

/// Base URL of a loopback port with nothing listening on it.
pub fn closed_station() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
