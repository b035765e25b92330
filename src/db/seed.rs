//! Demo data for a fresh database.

use chrono::{Duration, Utc};

use super::Repository;
use crate::errors::AppError;
use crate::models::{NewGroup, NewProposal, NewSession};

struct DemoOption {
    name: &'static str,
    link: &'static str,
    cuisine: &'static str,
    price_range: &'static str,
    votes: i64,
}

/// Populate an empty database with one user, three groups, two sessions
/// and a few restaurants. Returns `false` if users already exist.
pub async fn seed_demo_data(repo: &Repository) -> Result<bool, AppError> {
    if repo.count_users().await? > 0 {
        return Ok(false);
    }

    tracing::info!("Seeding demo data");

    let user_id = repo
        .create_user("Alex Johnson", Some("alex@example.com"), Some("🧑‍💻"))
        .await?;

    let groups = [
        ("Work Team", "Weekly lunch decisions for the office", "💼", "#667eea"),
        ("Weekend Squad", "Friends weekend dining adventures", "🎉", "#f093fb"),
        ("Family Dinners", "Sunday family meal planning", "👨‍👩‍👧‍👦", "#4facfe"),
    ];
    let mut group_ids = Vec::with_capacity(groups.len());
    for (name, description, emoji_icon, color_theme) in groups {
        let group = repo
            .create_group(
                &NewGroup {
                    name: name.to_string(),
                    description: Some(description.to_string()),
                    emoji_icon: emoji_icon.to_string(),
                    color_theme: color_theme.to_string(),
                },
                Some(user_id),
            )
            .await?;
        group_ids.push(group.id);
    }

    let work_session = repo
        .create_session(&NewSession {
            title: "Friday Team Lunch".to_string(),
            description: Some("Let's decide where to eat this Friday!".to_string()),
            group_id: group_ids[0],
            deadline: Some(Utc::now() + Duration::days(2)),
        })
        .await?;

    let weekend_session = repo
        .create_session(&NewSession {
            title: "Saturday Night Dinner".to_string(),
            description: Some("Epic dinner spot for Saturday night".to_string()),
            group_id: group_ids[1],
            deadline: None,
        })
        .await?;

    let options = [
        (work_session.id, DemoOption {
            name: "Pasta Paradise",
            link: "https://pastaparadise.com",
            cuisine: "Italian",
            price_range: "$$",
            votes: 3,
        }),
        (work_session.id, DemoOption {
            name: "Taco Fiesta",
            link: "https://tacofiesta.com",
            cuisine: "Mexican",
            price_range: "$",
            votes: 5,
        }),
        (weekend_session.id, DemoOption {
            name: "Sushi Zen",
            link: "https://sushizen.com",
            cuisine: "Japanese",
            price_range: "$$$",
            votes: 2,
        }),
    ];
    for (session_id, demo) in options {
        let option = repo
            .add_option(&NewProposal {
                name: demo.name.to_string(),
                link: demo.link.to_string(),
                image_url: None,
                cuisine: Some(demo.cuisine.to_string()),
                price_range: Some(demo.price_range.to_string()),
                voting_session_id: session_id,
            })
            .await?;
        repo.vote(option.id, demo.votes).await?;
    }

    tracing::info!(user_id, groups = group_ids.len(), "Demo data seeded");
    Ok(true)
}
