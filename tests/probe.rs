//! Prober tests against local fixture servers — no external network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use scrapbox_backup::models::{ExternalLink, Location};
use scrapbox_backup::probe::{probe_external_links, ProbeResponse};
use scrapbox_backup::progress::NoProgress;

/// Tracks how many connections a fixture server is handling at once.
#[derive(Default)]
struct Gauge {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let current = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(current, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

enum ServerBehavior {
    /// Respond with this status line after a short delay.
    Respond(&'static str),
    /// Never respond; hold the connection until the client gives up.
    Hang,
}

/// Minimal HTTP fixture server. Returns its base URL.
async fn spawn_server(behavior: ServerBehavior, gauge: Option<Arc<Gauge>>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let behavior = Arc::new(behavior);
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let behavior = Arc::clone(&behavior);
            let gauge = gauge.clone();
            tokio::spawn(async move {
                if let Some(gauge) = &gauge {
                    gauge.enter();
                }
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                match *behavior {
                    ServerBehavior::Respond(status_line) => {
                        tokio::time::sleep(Duration::from_millis(150)).await;
                        let response = format!(
                            "HTTP/1.1 {}\r\ncontent-type: text/plain\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                            status_line
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    }
                    ServerBehavior::Hang => loop {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => break,
                            Ok(_) => {}
                        }
                    },
                }
                if let Some(gauge) = &gauge {
                    gauge.exit();
                }
            });
        }
    });
    format!("http://{}", addr)
}

fn link(url: &str, title: &str) -> ExternalLink {
    ExternalLink {
        url: url.to_string(),
        locations: vec![Location {
            title: title.to_string(),
            line: 0,
        }],
    }
}

#[tokio::test]
async fn test_batch_never_exceeds_parallel_limit() {
    let gauge = Arc::new(Gauge::default());
    let base = spawn_server(ServerBehavior::Respond("200 OK"), Some(Arc::clone(&gauge))).await;

    let links: Vec<ExternalLink> = (0..5)
        .map(|i| link(&format!("{}/page/{}", base, i), "p"))
        .collect();
    let urls: Vec<String> = links.iter().map(|l| l.url.clone()).collect();

    let logs = probe_external_links(links, 2, Duration::from_secs(5), Arc::new(NoProgress))
        .await
        .unwrap();

    assert_eq!(logs.len(), 5);
    // Input order preserved regardless of completion order.
    let logged: Vec<String> = logs.iter().map(|log| log.url.clone()).collect();
    assert_eq!(logged, urls);
    for log in &logs {
        assert_eq!(
            log.response,
            ProbeResponse::Response(scrapbox_backup::probe::ResponseLog {
                status_code: 200,
                content_type: Some("text/plain".to_string()),
            })
        );
        assert!(log.access_timestamp > 0);
    }
    assert!(
        gauge.max.load(Ordering::SeqCst) <= 2,
        "saw {} concurrent requests",
        gauge.max.load(Ordering::SeqCst)
    );
}

#[tokio::test]
async fn test_timeout_records_error_and_batch_continues() {
    let ok = spawn_server(ServerBehavior::Respond("200 OK"), None).await;
    let hang = spawn_server(ServerBehavior::Hang, None).await;

    let links = vec![
        link(&format!("{}/a", ok), "a"),
        link(&format!("{}/b", ok), "b"),
        link(&format!("{}/stuck", hang), "c"),
        link(&format!("{}/d", ok), "d"),
        link(&format!("{}/e", ok), "e"),
    ];

    let logs = probe_external_links(links, 2, Duration::from_millis(800), Arc::new(NoProgress))
        .await
        .unwrap();

    assert_eq!(logs.len(), 5);
    let errors: Vec<usize> = logs
        .iter()
        .enumerate()
        .filter(|(_, log)| log.response.is_error())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(errors, vec![2], "only the hanging link may fail");
}

#[tokio::test]
async fn test_non_success_status_is_a_result_not_an_error() {
    let not_found = spawn_server(ServerBehavior::Respond("404 Not Found"), None).await;

    let logs = probe_external_links(
        vec![link(&format!("{}/gone", not_found), "p")],
        1,
        Duration::from_secs(5),
        Arc::new(NoProgress),
    )
    .await
    .unwrap();

    match &logs[0].response {
        ProbeResponse::Response(response) => assert_eq!(response.status_code, 404),
        other => panic!("expected a response, got {:?}", other),
    }
}

#[tokio::test]
async fn test_locations_carried_into_log() {
    let ok = spawn_server(ServerBehavior::Respond("200 OK"), None).await;
    let mut probed = link(&format!("{}/x", ok), "some page");
    probed.locations.push(Location {
        title: "other page".to_string(),
        line: 7,
    });

    let logs = probe_external_links(
        vec![probed.clone()],
        1,
        Duration::from_secs(5),
        Arc::new(NoProgress),
    )
    .await
    .unwrap();

    assert_eq!(logs[0].locations, probed.locations);
}
