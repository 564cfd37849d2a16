use meshcall::{CallClient, CallEvent, NullCapture};
use std::sync::Arc;

/// Headless client: joins a room and prints call events. Without a capture
/// backend it never offers, but it answers and receives from peers that do.
///
/// Usage: meshcall [ws-url] [room-id]
#[tokio::main]
async fn main() -> Result<(), meshcall::CallError> {
    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .unwrap_or_else(|| "ws://localhost:8080/ws".to_owned());
    let room_id = args.next();

    let (mut client, mut events) = CallClient::connect(&url, Arc::new(NullCapture)).await?;

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                CallEvent::AssignedPeerId(id) => println!("we are {id}"),
                CallEvent::RoomJoined {
                    room_id,
                    is_host,
                    peers,
                } => println!(
                    "joined {room_id} as {} with {} peer(s)",
                    if is_host { "host" } else { "guest" },
                    peers.len().saturating_sub(1)
                ),
                CallEvent::PeerConnected(id) => println!("connected to {id}"),
                CallEvent::PeerLeft(id) => println!("{id} left"),
                CallEvent::RemoteTrack { peer_id, kind } => {
                    println!("receiving {kind} from {peer_id}")
                }
                CallEvent::ConnectionProblem(id) => println!("lost {id}, retrying"),
                other => println!("{other:?}"),
            }
        }
    });

    match room_id {
        Some(room_id) => client.join_room(&room_id),
        None => {
            let room_id = client.create_room();
            println!("created {room_id}");
        }
    }

    client.run().await
}
