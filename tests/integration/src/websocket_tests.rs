//! The `/ws` feed over a real socket
//!
//! These run on the wall clock with a fast simulated vehicle, since the
//! server and client exchange real TCP traffic.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use skydrop_broadcast::{spawn_status_loop, FeedEvent, OrderRef};
use skydrop_mission_control::{router, AppState};

use crate::test_utils::*;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve(harness: &Harness) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(AppState::new(harness.runner.clone()));
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, server)
}

async fn connect(addr: SocketAddr, harness: &Harness, expected_subscribers: usize) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    wait_for_subscribers(harness, expected_subscribers).await;
    client
}

async fn wait_for_subscribers(harness: &Harness, expected: usize) {
    tokio::time::timeout(WALL_CLOCK_LIMIT, async {
        while harness.broadcaster().subscriber_count() != expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("subscriber count never settled");
}

async fn next_event(client: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(WALL_CLOCK_LIMIT, client.next())
            .await
            .expect("feed went quiet")
            .expect("feed closed")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn test_launch_over_http_streams_mission_events() {
    let harness = Harness::new(fast_config(), fast_profile());
    let (addr, server) = serve(&harness).await;
    let status_loop = spawn_status_loop(
        harness.runner.registry().clone(),
        harness.broadcaster().clone(),
        Duration::from_millis(50),
    );
    let mut client = connect(addr, &harness, 1).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/launch"))
        .json(&json!({
            "droneId": "D1",
            "connectionString": "sim://1",
            "block": "A",
            "orderId": "ord-77"
        }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let ack: Value = response.json().await.unwrap();
    let mission_id = ack["missionId"].as_i64().unwrap();

    let mut events = Vec::new();
    loop {
        let event = next_event(&mut client).await;
        let done = event["type"] == "mission_completed" || event["type"] == "mission_failed";
        events.push(event);
        if done {
            break;
        }
    }

    let mission = mission_events(&events);
    assert_eq!(
        event_types(&mission),
        vec!["arrived_at_block", "order_delivered", "mission_completed"]
    );
    assert_eq!(mission[0]["order_id"], mission_id);
    assert_eq!(mission[1]["order_id"], "ord-77");
    assert!(events.iter().any(|e| e["type"] == "status_update"));

    let record: Value = reqwest::get(format!("http://{addr}/api/missions/{mission_id}"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(record["status"], "COMPLETED");
    assert_eq!(harness.orders.delivered(), vec!["ord-77".to_string()]);

    status_loop.abort();
    server.abort();
}

#[tokio::test]
async fn test_keepalive_frames_are_ignored() {
    let harness = Harness::new(fast_config(), fast_profile());
    let (addr, server) = serve(&harness).await;
    let mut client = connect(addr, &harness, 1).await;

    client.send(Message::Text("ping".to_string())).await.unwrap();
    client.send(Message::Ping(vec![1, 2, 3])).await.unwrap();

    harness.broadcaster().publish(&FeedEvent::MissionFailed {
        drone_id: "D9".to_string(),
        order_id: OrderRef::Mission(4),
        error: "test".to_string(),
    });
    let event = next_event(&mut client).await;
    assert_eq!(event["type"], "mission_failed");
    assert_eq!(event["drone_id"], "D9");
    assert_eq!(harness.broadcaster().subscriber_count(), 1);

    server.abort();
}

#[tokio::test]
async fn test_close_frame_ends_subscription() {
    let harness = Harness::new(fast_config(), fast_profile());
    let (addr, server) = serve(&harness).await;
    let mut first = connect(addr, &harness, 1).await;
    let mut second = connect(addr, &harness, 2).await;

    first.close(None).await.unwrap();
    wait_for_subscribers(&harness, 1).await;

    harness.broadcaster().publish(&FeedEvent::OrderDelivered {
        drone_id: "D1".to_string(),
        order_id: OrderRef::External("ord-1".to_string()),
    });
    let event = next_event(&mut second).await;
    assert_eq!(event["type"], "order_delivered");

    server.abort();
}
