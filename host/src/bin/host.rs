use std::sync::{Arc, Mutex};

use framebridge_core::messages::{OpenCoWebsiteEvent, PlayerMovedEvent};
use framebridge_core::{init_tracing, BridgeConfig, Menu, MenuOptions};
use framebridge_host::{connect_in_memory, HostConfig, MenuAction};
use tokio::sync::mpsc;
use tracing::info;

/// Runs a scripted session: a script registers menus and zone callbacks, the
/// host plays the player walking around and clicking.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing("info");

    let session = connect_in_memory(HostConfig::load(), BridgeConfig::from_env())?;
    let bridge = session.bridge.clone();
    let host = session.host.clone();

    bridge.on_init().await?;
    info!(
        target: "host",
        player = bridge.player().name()?,
        room = bridge.room().id()?,
        "Script initialized"
    );

    // Script side
    let script = bridge.clone();
    bridge.ui().register_menu_command(
        "custom callback menu",
        MenuOptions::callback(move |_| {
            script.nav().open_tab("https://workadventu.re/")?;
            Ok(())
        }),
    )?;
    bridge
        .ui()
        .register_menu_command("custom iframe menu", MenuOptions::iframe("customIframeMenu.html"))?;

    let (zone_tx, mut zone_rx) = mpsc::unbounded_channel();
    let api_menu: Arc<Mutex<Option<Menu>>> = Arc::new(Mutex::new(None));
    {
        let script = bridge.clone();
        let slot = Arc::clone(&api_menu);
        let tx = zone_tx.clone();
        bridge.room().on_enter_zone("iframeMenu", move || {
            let menu = script.ui().register_menu_command(
                "IFRAME USE API",
                MenuOptions::iframe("customIframeMenuApi.php").allow_api(true),
            )?;
            if let Ok(mut slot) = slot.lock() {
                *slot = Some(menu);
            }
            let _ = tx.send("enter");
            Ok(())
        });
    }
    {
        let slot = Arc::clone(&api_menu);
        let tx = zone_tx;
        bridge.room().on_leave_zone("iframeMenu", move || {
            let menu = slot.lock().ok().and_then(|mut slot| slot.take());
            if let Some(menu) = menu {
                menu.remove()?;
            }
            let _ = tx.send("leave");
            Ok(())
        });
    }
    bridge.player().on_player_move(|event| {
        info!(target: "host", direction = %event.direction, x = event.x, y = event.y, "Script saw a move");
        Ok(())
    })?;
    bridge.player().set_outline_color(255, 0, 0).await?;
    info!(target: "host", outline = ?host.outline().await, "Outline applied");

    // Host side
    host.player_moved(&PlayerMovedEvent {
        direction: "right".into(),
        moving: true,
        x: 32.0,
        y: 64.0,
    })
    .await?;

    host.enter_zone("iframeMenu")?;
    zone_rx.recv().await;
    // Answered after the host has handled everything the script sent before.
    bridge.nav().get_co_websites().await?;
    info!(target: "host", menu = ?host.menu_entries().await, "Menu after entering zone");
    if let MenuAction::OpenIframe(iframe) = host.click_menu("IFRAME USE API").await? {
        info!(target: "host", url = %iframe.url, allow_api = iframe.allow_api, "Host opens menu iframe");
    }

    host.leave_zone("iframeMenu")?;
    zone_rx.recv().await;
    bridge.nav().get_co_websites().await?;
    info!(target: "host", menu = ?host.menu_entries().await, "Menu after leaving zone");

    host.click_menu("custom callback menu").await?;
    let site = bridge
        .nav()
        .open_co_website(OpenCoWebsiteEvent {
            url: "cowebsite.html".into(),
            ..Default::default()
        })
        .await?;
    info!(target: "host", tabs = ?host.opened_tabs().await, "Tabs opened by the script");
    info!(target: "host", id = site.id(), position = site.position(), "Co-website opened");
    site.close().await?;

    bridge.player().remove_outline_color().await?;
    session.shutdown();
    Ok(())
}
