use std::collections::HashMap;
use std::sync::{Arc, Weak};

use census::{Tracked, Tracker};
use tracing::warn;

use super::print_census;
use crate::{AnyResult, Config};

struct Connection {
    peer: String,
    tracker: Tracker<Connection>,
}

census::tracked!(Connection, "examples.connections");

struct Request {
    path: String,
    tracker: Tracker<Request>,
}

census::tracked!(Request, "examples.requests");

fn connect(peer: String) -> Arc<Connection> {
    Arc::new_cyclic(|me: &Weak<Connection>| Connection {
        peer,
        tracker: Tracker::new(me),
    })
}

fn request(path: String) -> Arc<Request> {
    Arc::new_cyclic(|me: &Weak<Request>| Request {
        path,
        tracker: Tracker::new(me),
    })
}

pub fn run(cfg: &Config) -> AnyResult<()> {
    // A cache that is never evicted holds on to every third connection.
    let mut cache: HashMap<String, Arc<Connection>> = HashMap::new();

    for n in 0..cfg.count {
        let conn = connect(format!("10.0.0.{n}"));
        for r in 0..3 {
            let req = request(format!("/items/{n}/{r}"));
            drop(req);
        }
        if n % 3 == 0 {
            cache.insert(conn.peer.clone(), conn);
        }
    }

    let snapshot = census::census::snapshot();
    for suspect in snapshot.non_empty() {
        warn!(
            registry = %suspect.name,
            live = suspect.live,
            released = suspect.released(),
            "instances still alive"
        );
    }

    let still_open: Vec<String> = Connection::registry()
        .snapshot()
        .iter()
        .filter(|c| c.tracker.is_tracking())
        .map(|c| c.peer.clone())
        .collect();
    println!("connections still open: {still_open:?}");
    println!(
        "requests still alive:   {:?}",
        Request::registry()
            .snapshot()
            .iter()
            .filter(|r| r.tracker.is_tracking())
            .map(|r| r.path.clone())
            .collect::<Vec<_>>()
    );

    print_census(cfg)
}
