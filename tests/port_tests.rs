#![cfg(feature = "port")]
//! Integration tests for inbound ports.

use rstest::rstest;
use std::sync::Arc;
use teaflow::prelude::*;

#[derive(Debug, Clone, PartialEq)]
enum Msg {
    Received(String),
    Mute,
}

#[derive(Debug, Clone, Default)]
struct Inbox {
    received: Vec<String>,
    muted: bool,
}

fn inbox(port: Port<String>) -> Program<(), Inbox, Msg> {
    Program::worker(
        |()| (Inbox::default(), Cmd::none()),
        |message, model: &Arc<Inbox>| {
            let mut next = (**model).clone();
            match message {
                Msg::Received(text) => next.received.push(text),
                Msg::Mute => next.muted = true,
            }
            (Arc::new(next), Cmd::none())
        },
        move |model| {
            if model.muted {
                Sub::none()
            } else {
                port.subscribe(Msg::Received)
            }
        },
    )
}

#[rstest]
#[tokio::test]
async fn test_values_arrive_in_send_order() {
    let port = Port::new("chat");
    let handle = inbox(port.clone()).init(());
    handle.settled().await;
    assert!(port.is_connected());

    for text in ["one", "two", "three"] {
        assert!(port.send(text.to_string()));
    }
    handle.settled().await;

    assert_eq!(handle.get_model().received, vec!["one", "two", "three"]);
}

#[rstest]
#[tokio::test]
async fn test_port_disconnects_when_unsubscribed() {
    let port = Port::new("chat");
    let handle = inbox(port.clone()).init(());
    handle.settled().await;

    handle.dispatch(Msg::Mute).unwrap();
    handle.settled().await;

    assert!(!port.is_connected());
    assert!(!port.send("lost".to_string()));
    handle.settled().await;
    assert!(handle.get_model().received.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_every_subscriber_receives_the_value() {
    let port: Port<u8> = Port::new("numbers");
    let subscribed = port.clone();
    let handle = Program::worker(
        |()| (Vec::<u16>::new(), Cmd::none()),
        |n: u16, model: &Arc<Vec<u16>>| {
            let mut next = (**model).clone();
            next.push(n);
            (Arc::new(next), Cmd::none())
        },
        move |_| {
            Sub::batch([
                subscribed.subscribe(u16::from),
                subscribed.subscribe(|n| u16::from(n) * 100),
            ])
        },
    )
    .init(());
    handle.settled().await;

    port.send(3);
    handle.settled().await;

    assert_eq!(*handle.get_model(), vec![3, 300]);
}

#[rstest]
#[tokio::test]
async fn test_port_feeds_every_subscribed_program() {
    let port = Port::new("shared");
    let first = inbox(port.clone()).init(());
    let second = inbox(port.clone()).init(());
    first.settled().await;
    second.settled().await;

    assert!(port.send("both".to_string()));
    first.settled().await;
    second.settled().await;
    assert_eq!(first.get_model().received, vec!["both"]);
    assert_eq!(second.get_model().received, vec!["both"]);

    first.dispatch(Msg::Mute).unwrap();
    first.settled().await;
    assert!(port.is_connected());

    assert!(port.send("second only".to_string()));
    first.settled().await;
    second.settled().await;
    assert_eq!(first.get_model().received, vec!["both"]);
    assert_eq!(second.get_model().received, vec!["both", "second only"]);

    second.dispatch(Msg::Mute).unwrap();
    second.settled().await;
    assert!(!port.is_connected());
    assert!(!port.send("nobody".to_string()));
}

#[rstest]
#[tokio::test]
async fn test_ports_sharing_a_name_stay_independent() {
    let left = Port::new("twin");
    let right = Port::new("twin");
    let subscribed = (left.clone(), right.clone());
    let handle = Program::worker(
        |()| (Vec::<String>::new(), Cmd::none()),
        |text: String, model: &Arc<Vec<String>>| {
            let mut next = (**model).clone();
            next.push(text);
            (Arc::new(next), Cmd::none())
        },
        move |_| {
            Sub::batch([
                subscribed.0.subscribe(|text: String| format!("left:{text}")),
                subscribed.1.subscribe(|text: String| format!("right:{text}")),
            ])
        },
    )
    .init(());
    handle.settled().await;

    assert!(left.is_connected());
    assert!(right.is_connected());
    left.send("a".to_string());
    handle.settled().await;
    right.send("b".to_string());
    handle.settled().await;

    assert_eq!(*handle.get_model(), vec!["left:a", "right:b"]);
}

#[rstest]
fn test_unconnected_port_rejects_values() {
    let port: Port<u8> = Port::new("idle");
    assert!(!port.is_connected());
    assert!(!port.send(1));
}
