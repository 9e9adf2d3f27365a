//! End-to-end scenarios driven against a real, in-process server: a
//! connection is a real WebSocket client, permissions and fan-out run
//! through the actual store and registry.

mod common;

use std::time::Duration;

use common::{TestClient, TestServer};
use serde_json::json;

/// Registers the first account (becomes the server owner) and grants a
/// flag globally to every other account, the way an operator would via
/// `new-group`/`set-flag`/`new-group-holder`.
async fn bootstrap_owner_and_grant(owner: &mut TestClient, group: &str, flags: &[&str]) {
    owner.send(json!({"type": "register", "name": "root", "pass": "hunter2"})).await.unwrap();
    assert_eq!(owner.recv().await.unwrap()["type"], "ok");
    assert_eq!(owner.recv().await.unwrap()["type"], "note");

    owner.send(json!({"type": "new-group", "name": group})).await.unwrap();
    assert_eq!(owner.recv().await.unwrap()["type"], "ok");

    for flag in flags {
        owner.send(json!({"type": "set-flag", "group": group, "name": flag, "flag": true})).await.unwrap();
        assert_eq!(owner.recv().await.unwrap()["type"], "ok");
    }

    owner.send(json!({"type": "new-group-holder", "group": group, "user": "", "channel": ""})).await.unwrap();
    assert_eq!(owner.recv().await.unwrap()["type"], "ok");
}

#[tokio::test]
async fn bootstrap_owner_scenario() {
    let server = TestServer::spawn().await.unwrap();
    let mut a = TestClient::connect(&server.ws_url()).await.unwrap();

    a.send(json!({"type": "register", "name": "root", "pass": "hunter2"})).await.unwrap();

    let ok = a.recv().await.unwrap();
    assert_eq!(ok["type"], "ok");
    assert_eq!(ok["message"], "done; you are now logged in");

    let note = a.recv().await.unwrap();
    assert_eq!(note["type"], "note");
    assert_eq!(note["message"], "you are a server owner now");

    assert!(server.db.accounts().is_owner("root").await.unwrap());
}

#[tokio::test]
async fn permission_denial_scenario() {
    let server = TestServer::spawn().await.unwrap();

    let mut owner = TestClient::connect(&server.ws_url()).await.unwrap();
    owner.send(json!({"type": "register", "name": "root", "pass": "hunter2"})).await.unwrap();
    assert_eq!(owner.recv().await.unwrap()["type"], "ok");
    assert_eq!(owner.recv().await.unwrap()["type"], "note");

    let mut a = TestClient::connect(&server.ws_url()).await.unwrap();
    a.send(json!({"type": "register", "name": "u", "pass": "p"})).await.unwrap();
    assert_eq!(a.recv().await.unwrap()["type"], "ok");

    a.send(json!({"type": "new-channel", "name": "g", "topic": "t"})).await.unwrap();
    let fail = a.recv().await.unwrap();
    assert_eq!(fail["type"], "fail");
    assert_eq!(fail["message"], "no permissions");

    assert!(!server.db.channels().exists("g").await.unwrap());
}

#[tokio::test]
async fn fan_out_scenario() {
    let server = TestServer::spawn().await.unwrap();

    let mut owner = TestClient::connect(&server.ws_url()).await.unwrap();
    bootstrap_owner_and_grant(&mut owner, "everyone", &["perms.subscribe", "perms.post-message"]).await;

    owner.send(json!({"type": "new-channel", "name": "g", "topic": "t"})).await.unwrap();
    assert_eq!(owner.recv().await.unwrap()["type"], "ok");
    assert_eq!(owner.recv().await.unwrap()["type"], "new-channel");

    let mut a = TestClient::connect(&server.ws_url()).await.unwrap();
    a.send(json!({"type": "register", "name": "a", "pass": "p"})).await.unwrap();
    assert_eq!(a.recv().await.unwrap()["type"], "ok");
    assert_eq!(a.recv().await.unwrap()["type"], "register");

    let mut b = TestClient::connect(&server.ws_url()).await.unwrap();
    b.send(json!({"type": "register", "name": "b", "pass": "p"})).await.unwrap();
    assert_eq!(b.recv().await.unwrap()["type"], "ok");
    assert_eq!(b.recv().await.unwrap()["type"], "register");
    assert_eq!(a.recv().await.unwrap()["type"], "register");

    let mut c = TestClient::connect(&server.ws_url()).await.unwrap();
    c.send(json!({"type": "register", "name": "c", "pass": "p"})).await.unwrap();
    assert_eq!(c.recv().await.unwrap()["type"], "ok");
    assert_eq!(c.recv().await.unwrap()["type"], "register");
    assert_eq!(a.recv().await.unwrap()["type"], "register");
    assert_eq!(b.recv().await.unwrap()["type"], "register");

    a.send(json!({"type": "subscribe", "name": "g", "subbed": true})).await.unwrap();
    assert_eq!(a.recv().await.unwrap()["type"], "ok");
    b.send(json!({"type": "subscribe", "name": "g", "subbed": true})).await.unwrap();
    assert_eq!(b.recv().await.unwrap()["type"], "ok");

    a.send(json!({"type": "post-message", "content": "hi", "channel": "g"})).await.unwrap();

    let a_ok = a.recv().await.unwrap();
    assert_eq!(a_ok["type"], "ok");
    let a_event = a.recv().await.unwrap();
    assert_eq!(a_event["type"], "post-message");
    assert_eq!(a_event["channel"], "g");
    assert_eq!(a_event["message"]["content"], "hi");

    let b_event = b.recv().await.unwrap();
    assert_eq!(b_event["type"], "post-message");
    assert_eq!(b_event["message"]["content"], "hi");

    assert!(c.expect_silence(Duration::from_millis(200)).await, "unsubscribed user must not receive post-message");
}

#[tokio::test]
async fn ping_routing_scenario() {
    let server = TestServer::spawn().await.unwrap();

    let mut owner = TestClient::connect(&server.ws_url()).await.unwrap();
    bootstrap_owner_and_grant(&mut owner, "everyone", &["perms.subscribe", "perms.post-message"]).await;

    owner.send(json!({"type": "new-channel", "name": "g", "topic": "t"})).await.unwrap();
    assert_eq!(owner.recv().await.unwrap()["type"], "ok");
    assert_eq!(owner.recv().await.unwrap()["type"], "new-channel");

    let mut bob = TestClient::connect(&server.ws_url()).await.unwrap();
    bob.send(json!({"type": "register", "name": "bob", "pass": "p"})).await.unwrap();
    assert_eq!(bob.recv().await.unwrap()["type"], "ok");
    assert_eq!(bob.recv().await.unwrap()["type"], "register");

    let bob_id = server.db.accounts().get_id("bob").await.unwrap();

    let mut a = TestClient::connect(&server.ws_url()).await.unwrap();
    a.send(json!({"type": "register", "name": "a", "pass": "p"})).await.unwrap();
    assert_eq!(a.recv().await.unwrap()["type"], "ok");
    assert_eq!(a.recv().await.unwrap()["type"], "register");
    assert_eq!(bob.recv().await.unwrap()["type"], "register");

    a.send(json!({"type": "subscribe", "name": "g", "subbed": true})).await.unwrap();
    assert_eq!(a.recv().await.unwrap()["type"], "ok");

    a.send(json!({"type": "post-message", "content": format!("hello <{bob_id}>"), "channel": "g"})).await.unwrap();
    assert_eq!(a.recv().await.unwrap()["type"], "ok");
    let posted = a.recv().await.unwrap();
    assert_eq!(posted["type"], "post-message");
    let posted_id = posted["message"]["id"].as_i64().unwrap();

    let ping = bob.recv().await.unwrap();
    assert_eq!(ping["type"], "ping");
    assert_eq!(ping["message"]["id"].as_i64().unwrap(), posted_id);
}

#[tokio::test]
async fn correlation_id_echo_scenario() {
    let server = TestServer::spawn().await.unwrap();
    let mut a = TestClient::connect(&server.ws_url()).await.unwrap();

    a.send(json!({"type": "login", "name": "u", "pass": "p", "_id": "abc"})).await.unwrap();

    let reply = a.recv().await.unwrap();
    assert_eq!(reply["type"], "fatal");
    assert_eq!(reply["message"], "invalid credentials");
    assert_eq!(reply["_id"], "abc");
}

#[tokio::test]
async fn unsubscribe_stops_future_broadcasts_scenario() {
    let server = TestServer::spawn().await.unwrap();

    let mut owner = TestClient::connect(&server.ws_url()).await.unwrap();
    bootstrap_owner_and_grant(&mut owner, "everyone", &["perms.subscribe", "perms.post-message"]).await;

    owner.send(json!({"type": "new-channel", "name": "g", "topic": "t"})).await.unwrap();
    assert_eq!(owner.recv().await.unwrap()["type"], "ok");
    assert_eq!(owner.recv().await.unwrap()["type"], "new-channel");

    let mut a = TestClient::connect(&server.ws_url()).await.unwrap();
    a.send(json!({"type": "register", "name": "a", "pass": "p"})).await.unwrap();
    assert_eq!(a.recv().await.unwrap()["type"], "ok");
    assert_eq!(a.recv().await.unwrap()["type"], "register");

    a.send(json!({"type": "subscribe", "name": "g", "subbed": true})).await.unwrap();
    assert_eq!(a.recv().await.unwrap()["type"], "ok");
    a.send(json!({"type": "subscribe", "name": "g", "subbed": false})).await.unwrap();
    assert_eq!(a.recv().await.unwrap()["type"], "ok");

    owner.send(json!({"type": "subscribe", "name": "g", "subbed": true})).await.unwrap();
    assert_eq!(owner.recv().await.unwrap()["type"], "ok");

    owner.send(json!({"type": "post-message", "content": "late", "channel": "g"})).await.unwrap();
    assert_eq!(owner.recv().await.unwrap()["type"], "ok");
    assert_eq!(owner.recv().await.unwrap()["type"], "post-message");

    assert!(a.expect_silence(Duration::from_millis(200)).await, "an unsubscribed client must receive no more post-message events");
}

#[tokio::test]
async fn disconnect_broadcasts_user_quit_scenario() {
    let server = TestServer::spawn().await.unwrap();

    let mut a = TestClient::connect(&server.ws_url()).await.unwrap();
    a.send(json!({"type": "register", "name": "a", "pass": "p"})).await.unwrap();
    assert_eq!(a.recv().await.unwrap()["type"], "ok");
    assert_eq!(a.recv().await.unwrap()["type"], "note"); // first account is the owner

    let mut b = TestClient::connect(&server.ws_url()).await.unwrap();
    b.send(json!({"type": "register", "name": "b", "pass": "p"})).await.unwrap();
    assert_eq!(b.recv().await.unwrap()["type"], "ok");
    assert_eq!(a.recv().await.unwrap()["type"], "register");

    b.send(json!({"type": "quit"})).await.unwrap();
    assert_eq!(b.recv().await.unwrap()["type"], "ok");

    let quit_event = a.recv().await.unwrap();
    assert_eq!(quit_event["type"], "user-quit");
    assert_eq!(quit_event["username"], "b");
}
