use dotenv::dotenv;
use grant_portal::auth::{ActivityEvent, SessionEvent};
use grant_portal::prelude::*;
use std::env;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    pretty_env_logger::init();

    let email = env::var("PORTAL_EMAIL").unwrap_or_else(|_| "staff@example.org".to_string());
    let password = env::var("PORTAL_PASSWORD").unwrap_or_else(|_| "Secret123!".to_string());

    // A short window so the forced sign-out is visible
    let options = ClientOptions::from_env()?.with_idle_timeout(Duration::from_secs(10));
    let portal = Portal::new_with_options(options)?;
    let mut events = portal.sessions().subscribe();

    let session = portal.auth().login(&email, &password).await?;
    println!(
        "Signed in as {}; idle timeout is {:?}",
        session.email,
        portal.sessions().idle_timeout()
    );

    let (tx, rx) = mpsc::channel(16);
    let tracker = portal.sessions().track_activity(rx);

    for _ in 0..3 {
        tokio::time::sleep(Duration::from_secs(5)).await;
        println!("Simulating a key press");
        tx.send(ActivityEvent::KeyDown).await?;
    }
    drop(tx);
    tracker.await?;

    println!("No more activity; waiting for the idle timeout");
    while let Ok(event) = events.recv().await {
        if let SessionEvent::SignedOut { reason } = event {
            println!("Signed out: {:?}", reason);
            break;
        }
    }

    Ok(())
}
