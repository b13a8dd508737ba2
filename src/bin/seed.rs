use anyhow::Result;
use chrono::{Duration, Utc};
use clap::Parser;
use discovery_engine::config::StorageBackend;
use discovery_engine::services::store::{InMemoryStore, PgStore};
use discovery_engine::utils::validation::validate_item;
use discovery_engine::{init_tracing, AppState, Config, InteractionEvent, InteractionKind, User};
use discovery_engine::{Category, DiscoveryStyle, DistancePreference, Item};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Generate a synthetic catalog and interaction history",
    long_about = None
)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Snapshot file to write with the memory backend; defaults to the
    /// configured snapshot path
    #[arg(short, long)]
    output: Option<String>,

    #[arg(long, default_value_t = 60)]
    items: usize,

    #[arg(long, default_value_t = 20)]
    users: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

const PLACES: &[(&str, &str, f64, f64)] = &[
    ("Lyon", "Rhône", 45.7640, 4.8357),
    ("Villeurbanne", "Rhône", 45.7719, 4.8902),
    ("Vienne", "Isère", 45.5242, 4.8781),
    ("Grenoble", "Isère", 45.1885, 5.7245),
    ("Annecy", "Haute-Savoie", 45.8992, 6.1294),
    ("Saint-Etienne", "Loire", 45.4397, 4.3872),
    ("Clermont-Ferrand", "Puy-de-Dôme", 45.7772, 3.0870),
    ("Le Puy-en-Velay", "Haute-Loire", 45.0434, 3.8858),
];

const QUALIFIERS: &[&str] = &[
    "Old", "Grand", "Little", "Hidden", "Municipal", "Riverside", "Upper",
];

fn noun(category: Option<Category>, rng: &mut StdRng) -> &'static str {
    let pool: &[&str] = match category {
        Some(Category::Art) => &["Gallery", "Atelier", "Fresco Walk", "Sculpture Garden"],
        Some(Category::History) => &["Castle", "Abbey", "Roman Theatre", "Old Quarter"],
        Some(Category::Science) => &["Observatory", "Planetarium", "Botanical Lab", "Mineral Hall"],
        Some(Category::LocalHeritage) => &["Silk Workshop", "Market Hall", "Mill", "Cheese Cellar"],
        None => &["Landmark", "Curiosity"],
    };
    pool.choose(rng).copied().unwrap_or("Landmark")
}

fn random_item(rng: &mut StdRng, index: usize) -> Item {
    let category = if rng.gen_bool(0.05) {
        None
    } else {
        Category::ALL.choose(rng).copied()
    };
    let qualifier = QUALIFIERS.choose(rng).copied().unwrap_or("Old");
    let name = format!("{} {} {}", qualifier, noun(category, rng), index);

    let mut item = Item::new(Uuid::new_v4(), name, category)
        .with_popularity(rng.gen_range(0..1000));
    let label = category.map(|c| c.as_str()).unwrap_or("uncategorized");
    item.description = format!("Synthetic {} entry", label);

    if let Some(&(city, region, lat, lon)) = PLACES.choose(rng) {
        item = item.with_location(city, region);
        if rng.gen_bool(0.9) {
            item = item.with_coordinates(
                lat + rng.gen_range(-0.05..0.05),
                lon + rng.gen_range(-0.05..0.05),
            );
        }
    }
    item
}

fn random_user(rng: &mut StdRng, references: &[String]) -> User {
    let preferences: Vec<Category> = Category::ALL
        .iter()
        .copied()
        .filter(|_| rng.gen_bool(0.35))
        .collect();
    let style = [
        DiscoveryStyle::Classics,
        DiscoveryStyle::Balanced,
        DiscoveryStyle::HiddenGems,
        DiscoveryStyle::Unset,
    ]
    .choose(rng)
    .copied()
    .unwrap_or_default();

    let mut user = User::new(Uuid::new_v4())
        .with_preferences(preferences)
        .with_style(style);

    if rng.gen_bool(0.6) {
        let band = [
            DistancePreference::Nearby,
            DistancePreference::Medium,
            DistancePreference::FarOk,
        ]
        .choose(rng)
        .copied()
        .unwrap_or_default();
        if let Some(reference) = references.choose(rng) {
            user = user.with_distance(band, reference);
        }
    }
    user
}

fn random_event(rng: &mut StdRng, user_id: Uuid, item_id: Uuid) -> InteractionEvent {
    let kind = [
        InteractionKind::View,
        InteractionKind::View,
        InteractionKind::DetailClick,
        InteractionKind::DetailOpen,
        InteractionKind::Favorite,
        InteractionKind::WebsiteVisit,
    ]
    .choose(rng)
    .copied()
    .unwrap_or(InteractionKind::View);

    let duration = if kind == InteractionKind::DetailOpen {
        rng.gen_range(5.0..400.0)
    } else {
        0.0
    };

    let mut event = InteractionEvent::new(user_id, item_id, kind).with_duration(duration);
    event.timestamp = Utc::now() - Duration::minutes(rng.gen_range(1..60 * 24 * 30));
    event
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing().await;

    let mut config = if Path::new(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, using default configuration");
        Config::default()
    };

    let references: Vec<String> = config.distance.reference_locations.keys().cloned().collect();
    let mut rng = StdRng::seed_from_u64(args.seed);

    let mut items: Vec<Item> = (0..args.items).map(|i| random_item(&mut rng, i)).collect();

    // A crowd favourite with lukewarm votes, and a rarely seen gem everyone approved.
    let flagship = Item::new(Uuid::new_v4(), "Basilica of Fourvière", Some(Category::History))
        .with_location("Lyon", "Rhône")
        .with_coordinates(45.7623, 4.8226)
        .with_popularity(5000);
    let gem = Item::new(Uuid::new_v4(), "Museum of Miniature and Cinema", Some(Category::Art))
        .with_location("Lyon", "Rhône")
        .with_coordinates(45.7629, 4.8272)
        .with_popularity(12);
    items.push(flagship.clone());
    items.push(gem.clone());
    for item in &items {
        validate_item(item)?;
    }

    let backend = config.storage.backend;
    let (state, target) = match backend {
        StorageBackend::Memory => {
            let output = args
                .output
                .or_else(|| config.storage.snapshot_path.clone())
                .unwrap_or_else(|| "data/snapshot.json".to_string());
            config.storage.snapshot_path = Some(output.clone());

            let store = Arc::new(InMemoryStore::new());
            store.batch_insert_items(items.clone()).await;
            (AppState::with_memory_store(config, store), output)
        }
        StorageBackend::Postgres => {
            let store = PgStore::connect(&config.storage.postgres).await?;
            store.ensure_schema().await?;
            store.batch_insert_items(&items).await?;
            (AppState::with_store(config, Arc::new(store)), "postgres".to_string())
        }
    };

    let users: Vec<User> = (0..args.users).map(|_| random_user(&mut rng, &references)).collect();
    for user in &users {
        state.save_profile(user).await?;
    }

    let mut tracked = 0usize;
    let mut votes = 0usize;
    for user in &users {
        let sessions = rng.gen_range(0..12);
        for _ in 0..sessions {
            let Some(item) = items.choose(&mut rng) else {
                break;
            };
            state
                .feedback_service
                .track_interaction(&random_event(&mut rng, user.id, item.id))
                .await?;
            tracked += 1;

            if rng.gen_bool(0.25) {
                let direction = if rng.gen_bool(0.7) { "up" } else { "down" };
                if state
                    .feedback_service
                    .submit_vote(user.id, item.id, direction)
                    .await?
                    .is_recorded()
                {
                    votes += 1;
                }
            }
        }

        let flagship_view = InteractionEvent::new(user.id, flagship.id, InteractionKind::View);
        state.feedback_service.track_interaction(&flagship_view).await?;
        tracked += 1;
        if rng.gen_bool(0.5) {
            let direction = if rng.gen_bool(0.5) { "up" } else { "down" };
            if state
                .feedback_service
                .submit_vote(user.id, flagship.id, direction)
                .await?
                .is_recorded()
            {
                votes += 1;
            }
        }
    }

    for user in users.iter().take(2) {
        if state
            .feedback_service
            .submit_vote(user.id, gem.id, "up")
            .await?
            .is_recorded()
        {
            votes += 1;
        }
    }

    state.persist().await?;

    info!(
        "Seeded {} items, {} users, {} interactions and {} votes into {}",
        items.len(),
        users.len(),
        tracked,
        votes,
        target
    );
    Ok(())
}
