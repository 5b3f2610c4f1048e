use adoptly::config::{AdminBootstrap, AdoptionConfig, SecurityConfig};
use adoptly::error::AppError;
use adoptly::marketplace::adoption::{NewAdoptionRequest, StatusChange};
use adoptly::marketplace::messages::OutgoingMessage;
use adoptly::marketplace::moderation::NewReviewReport;
use adoptly::marketplace::pets::NewPet;
use adoptly::marketplace::reviews::NewReview;
use adoptly::marketplace::users::{Registration, User};
use adoptly::marketplace::Marketplace;
use adoptly::store::{MemoryStore, Page};
use chrono::Utc;
use clap::Args;
use std::error::Error;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Have the owner reject the request instead of approving it.
    #[arg(long)]
    pub(crate) reject: bool,
    /// Skip the messaging portion of the demo.
    #[arg(long)]
    pub(crate) skip_messages: bool,
    /// Print the admin dashboard counters as JSON at the end.
    #[arg(long)]
    pub(crate) dashboard: bool,
}

/// Walk one adoption through the marketplace services against an in-memory store.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    println!("Adoptly marketplace demo");
    if let Err(err) = walkthrough(&args) {
        println!("  Demo halted: {err}");
    }
    Ok(())
}

fn walkthrough(args: &DemoArgs) -> Result<(), Box<dyn Error>> {
    let app = Marketplace::new(
        Arc::new(MemoryStore::new()),
        &SecurityConfig::development(),
        AdoptionConfig::default(),
    );
    let now = Utc::now();

    let shelter = register(&app, "harbor_shelter", "Harbor Shelter")?;
    let family = register(&app, "rivera_family", "The Riveras")?;
    let moderator = app.users.bootstrap_admin(
        &AdminBootstrap {
            email: "admin@adoptly.example".to_string(),
            username: "moderator".to_string(),
            password: "moderator-demo-password".to_string(),
        },
        now,
    )?;
    println!(
        "- Accounts: {} (owner), {} (adopter), {} ({:?})",
        shelter.username, family.username, moderator.username, moderator.role
    );

    let pet = app.pets.create(
        &shelter.id,
        NewPet {
            name: "Juniper".to_string(),
            species: "dog".to_string(),
            breed: Some("border collie".to_string()),
            age: 3,
            description: Some("Loves long walks and puzzle toys".to_string()),
            image_urls: vec!["https://images.adoptly.example/juniper.jpg".to_string()],
        },
        now,
    )?;
    println!(
        "- Listed {} the {} ({}), status {}",
        pet.name, pet.breed, pet.species, pet.adoption_status
    );

    let request = app.adoptions.create(
        &family.id,
        NewAdoptionRequest {
            pet_id: pet.id.clone(),
            message: Some("We have a fenced yard and work from home".to_string()),
        },
        now,
    )?;
    println!(
        "- {} requested {} -> request {} is {}",
        family.username,
        pet.name,
        request.id,
        request.status
    );
    println!("  Listing now shows {}", app.pets.get(&pet.id)?.adoption_status);

    if !args.skip_messages {
        app.messages.send(
            &family.id,
            OutgoingMessage {
                receiver_id: shelter.id.clone(),
                body: "Could we meet Juniper this weekend?".to_string(),
            },
            now,
        )?;
        app.messages.send(
            &shelter.id,
            OutgoingMessage {
                receiver_id: family.id.clone(),
                body: "Saturday at 10 works for us.".to_string(),
            },
            now,
        )?;
        println!("\nConversation (stored encrypted, shown to participants)");
        let thread = app
            .messages
            .conversation(&shelter.id, &family.id, Page::default())?;
        for message in &thread.items {
            let from = if message.sender_id == shelter.id {
                &shelter.username
            } else {
                &family.username
            };
            println!("  {from}: {}", message.body);
        }
    }

    let decision = if args.reject { "rejected" } else { "approved" };
    let settled = app.adoptions.update_status(
        &shelter.id,
        &request.id,
        StatusChange {
            status: decision.to_string(),
        },
        now,
    )?;
    println!(
        "\n- Owner {} request {}; listing now {}",
        settled.status,
        settled.id,
        app.pets.get(&pet.id)?.adoption_status
    );

    let review = app.reviews.create(
        &family,
        &pet.id,
        NewReview {
            rating: 5,
            comment: Some("Smooth process and a very happy dog".to_string()),
        },
        now,
    )?;
    let reviews = app.reviews.list_for_pet(&pet.id, Page::default())?;
    println!(
        "- {} left a {}-star review; {} review(s), average {}",
        family.username,
        review.rating,
        reviews.summary.count,
        reviews
            .summary
            .average_rating
            .map(|avg| format!("{avg:.1}"))
            .unwrap_or_else(|| "n/a".to_string())
    );

    let report = app.moderation.report_review(
        &shelter.id,
        NewReviewReport {
            review_id: review.id.clone(),
            reason: "demo report".to_string(),
            details: None,
        },
        now,
    )?;
    println!(
        "- Report {} filed against review {} ({})",
        report.id, review.id, report.status
    );

    if args.dashboard {
        let counts = app.moderation.dashboard(Utc::now())?;
        println!("\nAdmin dashboard\n{}", serde_json::to_string_pretty(&counts)?);
    }

    Ok(())
}

fn register(
    app: &Marketplace<MemoryStore>,
    username: &str,
    full_name: &str,
) -> Result<User, Box<dyn Error>> {
    let user = app.users.register(
        Registration {
            username: username.to_string(),
            email: format!("{username}@adoptly.example"),
            password: "demo-password-123".to_string(),
            full_name: Some(full_name.to_string()),
        },
        Utc::now(),
    )?;
    Ok(user)
}
