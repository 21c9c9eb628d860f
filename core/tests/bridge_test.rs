use framebridge_core::messages::types;
use framebridge_core::{
    Bridge, BridgeConfig, BridgeError, ChannelTransport, HandlerError, Inbound, MenuOptions,
    Resolution,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

fn connect() -> (Bridge, mpsc::UnboundedReceiver<Value>) {
    let (to_host, outbound) = ChannelTransport::pair();
    (Bridge::new(Arc::new(to_host), BridgeConfig::default()), outbound)
}

fn state() -> Value {
    json!({
        "playerName": "Alice",
        "tags": ["admin", "editor"],
        "uuid": "5d1c1a2e",
        "roomId": "https://play.example.org/_/global/maps.example.org/office.json",
        "mapUrl": "https://maps.example.org/office.json"
    })
}

#[tokio::test]
async fn outline_query_resolves_on_host_answer() {
    let (bridge, mut outbound) = connect();

    let b = bridge.clone();
    let pending = tokio::spawn(async move { b.player().set_outline_color(255, 0, 0).await });

    let query = outbound.recv().await.unwrap();
    assert_eq!(query["type"], "setPlayerOutline");
    assert_eq!(query["data"], json!({"red": 255, "green": 0, "blue": 0}));
    let id = query["id"].as_str().unwrap().to_string();
    assert_eq!(bridge.pending_count(), 1);

    let answer = json!({"type": "setPlayerOutline", "data": null, "id": id});
    assert_eq!(
        bridge.handle_message(answer.clone()),
        Inbound::Response(Resolution::Resolved)
    );
    pending.await.unwrap().unwrap();

    // A second answer with the same id finds nothing to resolve.
    assert_eq!(
        bridge.handle_message(answer),
        Inbound::Response(Resolution::Unknown)
    );
    assert_eq!(bridge.pending_count(), 0);
}

#[tokio::test]
async fn concurrent_queries_get_distinct_ids() {
    let (bridge, mut outbound) = connect();

    let b1 = bridge.clone();
    let first = tokio::spawn(async move { b1.player().set_outline_color(1, 2, 3).await });
    let b2 = bridge.clone();
    let second = tokio::spawn(async move { b2.player().remove_outline_color().await });

    let q1 = outbound.recv().await.unwrap();
    let q2 = outbound.recv().await.unwrap();
    assert_ne!(q1["id"], q2["id"]);
    assert_eq!(bridge.pending_ids().len(), 2);

    // Answer out of order.
    bridge.handle_message(json!({"type": q2["type"], "data": null, "id": q2["id"]}));
    bridge.handle_message(json!({"type": q1["type"], "data": null, "id": q1["id"]}));
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();
}

#[tokio::test]
async fn invalid_response_keeps_query_pending() {
    let (bridge, mut outbound) = connect();

    let b = bridge.clone();
    let pending = tokio::spawn(async move { b.nav().get_co_websites().await });
    let query = outbound.recv().await.unwrap();
    let id = query["id"].clone();

    let bad = json!({"type": "getCoWebsites", "data": [{"id": 7, "position": 0}], "id": id});
    assert!(matches!(
        bridge.handle_message(bad),
        Inbound::Response(Resolution::Rejected(_))
    ));
    let wrong_type = json!({"type": "getState", "data": [], "id": id});
    assert!(matches!(
        bridge.handle_message(wrong_type),
        Inbound::Response(Resolution::TypeMismatch { .. })
    ));
    assert_eq!(bridge.pending_count(), 1);

    let good = json!({"type": "getCoWebsites", "data": [{"id": "cw-1", "position": 0}], "id": id});
    assert_eq!(
        bridge.handle_message(good),
        Inbound::Response(Resolution::Resolved)
    );
    let sites = pending.await.unwrap().unwrap();
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].id(), "cw-1");
}

#[tokio::test]
async fn host_context_requires_handshake() {
    let (bridge, mut outbound) = connect();

    let err = bridge.player().name().unwrap_err();
    assert!(matches!(err, BridgeError::Uninitialized { .. }));
    assert!(err.to_string().contains("within an on_init callback"));
    assert!(bridge.room().map_url().is_err());

    let b1 = bridge.clone();
    let first = tokio::spawn(async move { b1.on_init().await });
    let b2 = bridge.clone();
    let second = tokio::spawn(async move { b2.on_init().await });

    let query = outbound.recv().await.unwrap();
    assert_eq!(query["type"], "getState");
    bridge.handle_message(json!({"type": "getState", "data": state(), "id": query["id"]}));

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();
    // Only one handshake went out.
    assert!(outbound.try_recv().is_err());

    assert_eq!(bridge.player().name().unwrap(), "Alice");
    assert_eq!(bridge.player().tags().unwrap().len(), 2);
    assert_eq!(bridge.player().id().unwrap(), Some("5d1c1a2e"));
    assert_eq!(bridge.player().user_room_token().unwrap(), None);
    assert_eq!(
        bridge.room().map_url().unwrap(),
        "https://maps.example.org/office.json"
    );

    // Later callers return immediately.
    bridge.on_init().await.unwrap();
}

#[tokio::test]
async fn invalid_inbound_messages_never_reach_callbacks() {
    let (bridge, _outbound) = connect();
    let hits = Arc::new(Mutex::new(0));

    let h = Arc::clone(&hits);
    bridge.room().on_enter_zone("iframeMenu", move || {
        *h.lock().unwrap() += 1;
        Ok(())
    });

    for raw in [
        json!("enterEvent"),
        json!({"data": {"name": "iframeMenu"}}),
        json!({"type": "enterEvent", "data": {"name": 3}}),
        json!({"type": "enterEvent", "data": null}),
        json!({"type": "somethingElse", "data": {}}),
    ] {
        assert!(matches!(bridge.handle_message(raw), Inbound::Dropped(_)));
    }
    assert_eq!(*hits.lock().unwrap(), 0);

    let report = bridge.handle_message(json!({"type": "enterEvent", "data": {"name": "iframeMenu"}}));
    assert!(matches!(report, Inbound::Dispatched(r) if r.delivered == 1));
    assert_eq!(*hits.lock().unwrap(), 1);
}

#[tokio::test]
async fn zone_callbacks_filter_by_name() {
    let (bridge, _outbound) = connect();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let s = Arc::clone(&seen);
    bridge.room().on_enter_zone("iframeMenu", move || {
        s.lock().unwrap().push("enter");
        Ok(())
    });
    let s = Arc::clone(&seen);
    let leave = bridge.room().on_leave_zone("iframeMenu", move || {
        s.lock().unwrap().push("leave");
        Ok(())
    });

    bridge.handle_message(json!({"type": "enterEvent", "data": {"name": "garden"}}));
    bridge.handle_message(json!({"type": "enterEvent", "data": {"name": "iframeMenu"}}));
    bridge.handle_message(json!({"type": "leaveEvent", "data": {"name": "iframeMenu"}}));
    assert!(bridge.off(&leave));
    bridge.handle_message(json!({"type": "leaveEvent", "data": {"name": "iframeMenu"}}));

    assert_eq!(*seen.lock().unwrap(), vec!["enter", "leave"]);
}

#[tokio::test]
async fn failing_callback_does_not_block_others() {
    let (bridge, _outbound) = connect();
    let hits = Arc::new(Mutex::new(0));

    bridge.room().on_enter_zone("hall", || Err(HandlerError::new("not today")));
    bridge.room().on_enter_zone("hall", || panic!("broken script"));
    let h = Arc::clone(&hits);
    bridge.room().on_enter_zone("hall", move || {
        *h.lock().unwrap() += 1;
        Ok(())
    });

    let report = bridge.handle_message(json!({"type": "enterEvent", "data": {"name": "hall"}}));
    assert!(matches!(report, Inbound::Dispatched(r) if r.failed == 2 && r.delivered == 1));
    assert_eq!(*hits.lock().unwrap(), 1);
}

#[tokio::test]
async fn menu_commands_round_trip() {
    let (bridge, mut outbound) = connect();
    let clicks = Arc::new(Mutex::new(Vec::new()));

    let c = Arc::clone(&clicks);
    let menu = bridge
        .ui()
        .register_menu_command(
            "custom callback menu",
            MenuOptions::callback(move |name| {
                c.lock().unwrap().push(name.to_string());
                Ok(())
            }),
        )
        .unwrap();
    bridge
        .ui()
        .register_menu_command(
            "custom iframe menu",
            MenuOptions::iframe("customIframeMenu.html").allow_api(true),
        )
        .unwrap();

    let registered = outbound.recv().await.unwrap();
    assert_eq!(
        registered,
        json!({
            "type": "registerMenu",
            "data": {"name": "custom callback menu", "options": {"allowApi": false}}
        })
    );
    let iframe = outbound.recv().await.unwrap();
    assert_eq!(iframe["data"]["iframe"], "customIframeMenu.html");
    assert_eq!(iframe["data"]["options"]["allowApi"], true);

    let click = json!({"type": "menuItemClicked", "data": {"menuItem": "custom callback menu"}});
    bridge.handle_message(click.clone());
    bridge.handle_message(json!({"type": "menuItemClicked", "data": {"menuItem": "other"}}));
    assert_eq!(*clicks.lock().unwrap(), vec!["custom callback menu".to_string()]);

    menu.remove().unwrap();
    let removed = outbound.recv().await.unwrap();
    assert_eq!(removed["type"], types::UNREGISTER_MENU);
    assert_eq!(removed["data"]["name"], "custom callback menu");

    bridge.handle_message(click);
    assert_eq!(clicks.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn reregistering_menu_replaces_callback() {
    let (bridge, _outbound) = connect();
    let clicks = Arc::new(Mutex::new(Vec::new()));

    for label in ["first", "second"] {
        let c = Arc::clone(&clicks);
        bridge
            .ui()
            .register_menu_command(
                "menu",
                MenuOptions::callback(move |_| {
                    c.lock().unwrap().push(label);
                    Ok(())
                }),
            )
            .unwrap();
    }

    bridge.handle_message(json!({"type": "menuItemClicked", "data": {"menuItem": "menu"}}));
    assert_eq!(*clicks.lock().unwrap(), vec!["second"]);
}

#[tokio::test]
async fn player_move_subscription_notifies_host() {
    let (bridge, mut outbound) = connect();
    let moves = Arc::new(Mutex::new(Vec::new()));

    let m = Arc::clone(&moves);
    bridge
        .player()
        .on_player_move(move |event| {
            m.lock().unwrap().push((event.direction, event.moving));
            Ok(())
        })
        .unwrap();

    let subscribe = outbound.recv().await.unwrap();
    assert_eq!(subscribe["type"], "onPlayerMove");

    bridge.handle_message(json!({
        "type": "hasPlayerMoved",
        "data": {"direction": "left", "moving": true, "x": 12.5, "y": 40.0}
    }));
    assert_eq!(*moves.lock().unwrap(), vec![("left".to_string(), true)]);
}

#[tokio::test]
async fn navigation_commands_are_fire_and_forget() {
    let (bridge, mut outbound) = connect();

    bridge.nav().open_tab("https://workadventu.re/").unwrap();
    bridge.nav().go_to_page("https://example.org/").unwrap();

    assert_eq!(
        outbound.recv().await.unwrap(),
        json!({"type": "openTab", "data": {"url": "https://workadventu.re/"}})
    );
    assert_eq!(outbound.recv().await.unwrap()["type"], "goToPage");
}

#[tokio::test]
async fn close_rejects_pending_and_later_queries() {
    let (bridge, mut outbound) = connect();

    let b = bridge.clone();
    let pending = tokio::spawn(async move { b.player().set_outline_color(0, 0, 255).await });
    let query = outbound.recv().await.unwrap();

    bridge.close();
    assert!(matches!(pending.await.unwrap(), Err(BridgeError::Closed)));
    assert_eq!(bridge.pending_count(), 0);

    // A late answer is ignored.
    assert_eq!(
        bridge.handle_message(json!({"type": "setPlayerOutline", "data": null, "id": query["id"]})),
        Inbound::Response(Resolution::Unknown)
    );
    assert!(matches!(
        bridge.player().remove_outline_color().await,
        Err(BridgeError::Closed)
    ));
    assert!(matches!(bridge.on_init().await, Err(BridgeError::Closed)));
}

#[tokio::test]
async fn dropped_host_side_fails_fast() {
    let (bridge, outbound) = connect();
    drop(outbound);

    assert!(matches!(
        bridge.nav().open_tab("https://example.org"),
        Err(BridgeError::Transport(_))
    ));
    assert!(matches!(
        bridge.player().set_outline_color(1, 1, 1).await,
        Err(BridgeError::Transport(_))
    ));
    assert_eq!(bridge.pending_count(), 0);
}

#[tokio::test]
async fn run_closes_bridge_when_host_goes_away() {
    let (bridge, _outbound) = connect();
    let (to_script, inbound) = mpsc::unbounded_channel();

    let b = bridge.clone();
    let runner = tokio::spawn(async move { b.run(inbound).await });

    to_script
        .send(json!({"type": "enterEvent", "data": {"name": "hall"}}))
        .unwrap();
    drop(to_script);
    runner.await.unwrap();

    assert!(bridge.is_closed());
}

#[tokio::test]
async fn correlation_ids_use_configured_prefix() {
    let (to_host, mut outbound) = ChannelTransport::pair();
    let bridge = Bridge::new(
        Arc::new(to_host),
        BridgeConfig::default().with_id_prefix("menu-frame"),
    );

    let b = bridge.clone();
    let _pending = tokio::spawn(async move { b.nav().get_co_websites().await });
    let query = outbound.recv().await.unwrap();
    assert!(query["id"].as_str().unwrap().starts_with("menu-frame-"));
}
