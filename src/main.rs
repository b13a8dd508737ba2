use anyhow::Result;
use clap::{Parser, Subcommand};
use discovery_engine::algorithms::AdaptationContext;
use discovery_engine::services::store::Identity;
use discovery_engine::utils::validation::validate_uuid_string;
use discovery_engine::{init_tracing, AppState, Config, InteractionEvent, InteractionKind, User};
use discovery_engine::{Category, DiscoveryStyle, DistancePreference};
use serde::Serialize;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Personalized ranking sized for the session; --limit overrides, 0 orders
    /// the whole catalog
    Rank {
        #[arg(long, value_parser = parse_id)]
        user: Uuid,
        #[arg(long)]
        limit: Option<usize>,
        /// Minutes the visitor has available
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        connection: Option<String>,
        #[arg(long)]
        user_agent: Option<String>,
    },
    /// Low-exposure, well-approved items
    Gems {
        #[arg(long, value_parser = parse_id)]
        user: Option<Uuid>,
        #[arg(long)]
        limit: Option<usize>,
    },
    Similar {
        #[arg(long, value_parser = parse_id)]
        item: Uuid,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Vote up or down, once per user and item
    Vote {
        #[arg(long, value_parser = parse_id)]
        user: Uuid,
        #[arg(long, value_parser = parse_id)]
        item: Uuid,
        #[arg(long)]
        direction: String,
    },
    Track {
        #[arg(long, value_parser = parse_id)]
        user: Uuid,
        #[arg(long, value_parser = parse_id)]
        item: Uuid,
        #[arg(long)]
        kind: InteractionKind,
        #[arg(long, default_value_t = 0.0)]
        duration: f64,
    },
    /// Show a profile, updating it when any setting is given
    Profile {
        #[arg(long, value_parser = parse_id)]
        user: Uuid,
        #[arg(long, value_delimiter = ',')]
        categories: Option<Vec<Category>>,
        #[arg(long)]
        style: Option<String>,
        #[arg(long)]
        distance: Option<String>,
        #[arg(long)]
        reference: Option<String>,
    },
    /// Delete a profile; interaction history is kept
    Reset {
        #[arg(long, value_parser = parse_id)]
        user: Uuid,
    },
    Categories {
        #[arg(long)]
        category: Option<Category>,
    },
}

#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    message: String,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: "Success".to_string(),
        }
    }

    fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message,
        }
    }
}

#[derive(Debug, Serialize)]
struct ProfileView {
    user: User,
    engagement: discovery_engine::EngagementSummary,
    category_affinity: discovery_engine::CategoryAffinity,
}

fn parse_id(raw: &str) -> std::result::Result<Uuid, String> {
    validate_uuid_string(raw).map_err(|e| e.to_string())
}

fn print_json<T: Serialize>(response: &ApiResponse<T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}

fn emit<T: Serialize>(result: discovery_engine::Result<T>) -> Result<()> {
    match result {
        Ok(data) => print_json(&ApiResponse::success(data)),
        Err(e) => print_json(&ApiResponse::<T>::error(e.to_string())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing with specified log level
    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing().await;

    let config = if Path::new(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, using default configuration");
        Config::default()
    };

    let state = AppState::new(config).await?;

    if run(&state, args.command).await? {
        state.persist().await?;
    }

    info!("Serving stats: {:?}", state.serving_stats());
    Ok(())
}

/// Runs one command and reports whether it may have changed stored state.
async fn run(state: &AppState, command: Command) -> Result<bool> {
    let discovery = &state.discovery_service;

    match command {
        Command::Rank {
            user,
            limit: Some(limit),
            ..
        } => {
            emit(discovery.rank_for_user(user, Some(limit).filter(|n| *n > 0)).await)?;
            Ok(false)
        }
        Command::Rank {
            user,
            limit: None,
            time,
            connection,
            user_agent,
        } => {
            let context = AdaptationContext::detect(
                user_agent.as_deref(),
                connection.as_deref(),
                time.as_deref(),
            );
            emit(discovery.rank_in_context(user, &context).await)?;
            Ok(false)
        }
        Command::Gems { user, limit } => {
            emit(discovery.hidden_gems(user, limit).await)?;
            Ok(false)
        }
        Command::Similar { item, limit } => {
            emit(discovery.similar_items(item, limit).await)?;
            Ok(false)
        }
        Command::Vote { user, item, direction } => {
            let outcome = state.feedback_service.submit_vote(user, item, &direction).await;
            let recorded = outcome.as_ref().is_ok_and(|o| o.is_recorded());
            emit(outcome)?;
            Ok(recorded)
        }
        Command::Track { user, item, kind, duration } => {
            let event = InteractionEvent::new(user, item, kind).with_duration(duration);
            let tracked = state.feedback_service.track_interaction(&event).await;
            let ok = tracked.is_ok();
            emit(tracked.map(|_| event))?;
            Ok(ok)
        }
        Command::Profile {
            user,
            categories,
            style,
            distance,
            reference,
        } => {
            let mut profile = state
                .store
                .user(user)
                .await?
                .unwrap_or_else(|| User::new(user));
            let changed = categories.is_some()
                || style.is_some()
                || distance.is_some()
                || reference.is_some();

            if let Some(categories) = categories {
                profile.preferences = categories.into_iter().collect();
            }
            if let Some(style) = style {
                profile.discovery_style = DiscoveryStyle::from_label(&style);
            }
            if let Some(distance) = distance {
                profile.distance_preference = DistancePreference::from_label(&distance);
            }
            if let Some(reference) = reference {
                let reference = reference.trim();
                profile.reference_location = (!reference.is_empty()).then(|| reference.to_string());
            }

            if changed {
                if let Err(e) = state.save_profile(&profile).await {
                    emit::<ProfileView>(Err(e))?;
                    return Ok(false);
                }
            }

            let view = async {
                Ok::<_, discovery_engine::DiscoveryError>(ProfileView {
                    engagement: state.engagement_service.engagement_for_user(user).await?,
                    category_affinity: state.engagement_service.category_affinity(user).await?,
                    user: profile,
                })
            };
            emit(view.await)?;
            Ok(changed)
        }
        Command::Reset { user } => {
            let reset = state.reset_profile(user).await;
            let changed = reset.as_ref().is_ok_and(|existed| *existed);
            emit(reset)?;
            Ok(changed)
        }
        Command::Categories { category } => {
            match category {
                Some(category) => emit(discovery.items_by_category(category).await)?,
                None => emit(discovery.categories().await)?,
            }
            Ok(false)
        }
    }
}
