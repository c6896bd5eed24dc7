use dotenv::dotenv;
use grant_portal::auth::FileStore;
use grant_portal::prelude::*;
use log::info;
use std::env;
use std::sync::Arc;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Load PORTAL_* settings and credentials from .env
    dotenv().ok();
    pretty_env_logger::init();

    let email = env::var("PORTAL_EMAIL").unwrap_or_else(|_| "staff@example.org".to_string());
    let password = env::var("PORTAL_PASSWORD").unwrap_or_else(|_| "Secret123!".to_string());
    let store_path = env::var("PORTAL_CREDENTIALS_FILE")
        .unwrap_or_else(|_| ".portal-credentials.json".to_string());

    let options = ClientOptions::from_env()?;
    let portal = Portal::builder(options)
        .store(Arc::new(FileStore::new(store_path)))
        .build()?;

    println!("Starting portal example");

    let auth = portal.auth();
    let session = match auth.restore_session().await? {
        Some(session) => {
            println!("Restored session for {}", session.email);
            session
        }
        None => {
            println!("Signing in as {}", email);
            auth.login(&email, &password).await?
        }
    };
    println!(
        "Signed in as {} ({}) at {}",
        session.name, session.role, session.organization_name
    );

    let projects = portal.projects().list().await?;
    println!(
        "\n{} of {} project(s):",
        projects.content.len(),
        projects.total_elements
    );
    for project in &projects.content {
        println!(
            "  #{} {} [{}] budget {:.2}",
            project.id, project.name, project.status, project.total_budget
        );
    }

    if session.role.is_admin() {
        let pending: Vec<_> = portal
            .applications()
            .list()
            .await?
            .content
            .into_iter()
            .filter(|a| a.is_pending())
            .collect();
        println!("\n{} application(s) awaiting review", pending.len());
    }

    let cities = portal.cities().list(None, Some(10)).await?;
    println!(
        "\nFirst {} of {} cities",
        cities.content.len(),
        cities.total_elements
    );

    println!("\nSigning out");
    auth.logout().await;
    info!("Session state after logout: {:?}", portal.sessions().state());

    println!("Portal example completed");

    Ok(())
}
