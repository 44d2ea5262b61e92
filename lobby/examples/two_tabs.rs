use std::time::Duration;

use lobby::guest_name::generate_guest_name;
use lobby::session::GameSession;
use lobby::sync_bus::SyncBus;

// Simulates two browser tabs on the same origin agreeing on one room.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let bus = SyncBus::new();
    let host_tab = GameSession::connect(&bus);
    let guest_tab = GameSession::connect(&bus);

    let host = generate_guest_name();
    let guest = generate_guest_name();

    let room_id = host_tab.create_room(&host).await;
    println!("{} opened room {}", host, room_id);
    settle().await;

    guest_tab.join_room(&room_id, &guest).await;
    println!("{} joined from another tab", guest);
    settle().await;

    guest_tab.set_player_ready(&guest).await;
    host_tab.set_player_ready(&host).await;
    host_tab.start_game().await;
    settle().await;

    guest_tab.update_score(&guest, 2, 3).await;
    // the score write is debounced, give it time to fire and propagate
    tokio::time::sleep(Duration::from_millis(600)).await;

    let room = host_tab.current_room().await.expect("room vanished");
    println!("room {} as seen from the host tab:", room.id);
    for player in &room.players {
        println!(
            "  {} {}/{} ready={}",
            player.username, player.score, player.total, player.is_ready
        );
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
