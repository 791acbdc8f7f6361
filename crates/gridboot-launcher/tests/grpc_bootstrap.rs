//! End to end over real sockets: the launcher talks gRPC to bootstrap
//! servers on loopback.

mod support;

use std::collections::HashMap;
use std::time::Duration;

use gridboot_launcher::{BroadcastError, Launcher, Readiness};
use gridboot_peer::{BootstrapServer, PeerRegistry, RunningServer};

use support::{
    JobScript, LoopbackTransport, ScriptedScheduler, hosts, loopback_settings, request,
};

async fn start_worker() -> RunningServer {
    BootstrapServer::new("127.0.0.1:0".parse().unwrap(), PeerRegistry::new())
        .start()
        .await
        .unwrap()
}

#[tokio::test]
async fn three_workers_share_membership() {
    let mut workers = HashMap::new();
    let mut ports = HashMap::new();
    for host in ["a", "b", "c"] {
        let server = start_worker().await;
        ports.insert(host.to_string(), server.local_addr().port());
        workers.insert(host, server);
    }

    let launcher = Launcher::with_transport(
        ScriptedScheduler::new(vec![
            JobScript::runs_on("a", 0),
            JobScript::runs_on("b", 2),
            JobScript::runs_on("c", 4),
        ]),
        LoopbackTransport {
            ports,
            rpc_timeout: Duration::from_secs(2),
        },
        loopback_settings(),
    );

    let report = launcher.run(&request(3)).await.unwrap();

    assert_eq!(report.membership, hosts(&["a", "b", "c"]));
    for (host, server) in &workers {
        assert_eq!(
            server.registry().current(),
            Some(hosts(&["a", "b", "c"])),
            "{host}"
        );
    }

    for (_, server) in workers {
        server.shutdown().await.unwrap();
    }
}

#[tokio::test]
async fn unreachable_worker_stays_uninitialized() {
    let a = start_worker().await;
    let b = start_worker().await;
    let c = start_worker().await;
    let c_port = c.local_addr().port();
    let c_registry = c.registry().clone();
    // c's job runs but its server is gone by the time of the broadcast.
    c.shutdown().await.unwrap();

    let ports = HashMap::from([
        ("a".to_string(), a.local_addr().port()),
        ("b".to_string(), b.local_addr().port()),
        ("c".to_string(), c_port),
    ]);
    let launcher = Launcher::with_transport(
        ScriptedScheduler::new(vec![
            JobScript::runs_on("a", 0),
            JobScript::runs_on("b", 1),
            JobScript::runs_on("c", 2),
        ]),
        LoopbackTransport {
            ports,
            rpc_timeout: Duration::from_secs(2),
        },
        loopback_settings().with_readiness(Readiness::Delay(Duration::ZERO)),
    );

    let report = launcher.run(&request(3)).await.unwrap();

    assert_eq!(report.membership, hosts(&["a", "b", "c"]));
    assert_eq!(a.registry().current(), Some(hosts(&["a", "b", "c"])));
    assert_eq!(b.registry().current(), Some(hosts(&["a", "b", "c"])));
    assert_eq!(c_registry.current(), None);

    assert_eq!(report.broadcast.delivered, vec!["a", "b"]);
    assert_eq!(report.broadcast.failed[0].host, "c");
    assert!(matches!(
        report.broadcast.failed[0].error,
        BroadcastError::Connect { .. }
    ));

    a.shutdown().await.unwrap();
    b.shutdown().await.unwrap();
}

#[tokio::test]
async fn repeated_run_leaves_registry_unchanged() {
    let a = start_worker().await;
    let ports = HashMap::from([("a".to_string(), a.local_addr().port())]);
    let transport = || LoopbackTransport {
        ports: ports.clone(),
        rpc_timeout: Duration::from_secs(2),
    };

    for _ in 0..2 {
        let launcher = Launcher::with_transport(
            ScriptedScheduler::new(vec![JobScript::runs_on("a", 0)]),
            transport(),
            loopback_settings(),
        );
        let report = launcher.run(&request(1)).await.unwrap();
        assert_eq!(report.broadcast.delivered, vec!["a"]);
    }
    assert_eq!(a.registry().current(), Some(hosts(&["a"])));

    a.shutdown().await.unwrap();
}

#[tokio::test]
async fn grpc_transport_reaches_worker_on_peer_port() {
    let worker = start_worker().await;
    let settings = loopback_settings().with_peer_port(worker.local_addr().port());

    let launcher = Launcher::new(
        ScriptedScheduler::new(vec![JobScript::runs_on("127.0.0.1", 1)]),
        settings,
    );
    let report = launcher.run(&request(1)).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(worker.registry().current(), Some(hosts(&["127.0.0.1"])));

    worker.shutdown().await.unwrap();
}
