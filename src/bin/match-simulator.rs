//! Match Simulator CLI Tool
//!
//! Drives the matching engine in-process with synthetic players so matching
//! behaviour can be inspected without any external services.
//!
//! Usage:
//!   cargo run --bin match-simulator -- --help
//!   cargo run --bin match-simulator singles --skills 3.5,4.0
//!   cargo run --bin match-simulator doubles --skills 3.0,3.5,4.0,4.5
//!   cargo run --bin match-simulator concurrent --joiners 12 --triggers 8
//!   cargo run --bin match-simulator lifecycle

use anyhow::{anyhow, Result};
use chrono::Duration as ChronoDuration;
use clap::{Parser, Subcommand};
use court_matcher::config::{validate_config, AppConfig, MatchingSettings};
use court_matcher::metrics::MetricsCollector;
use court_matcher::session::SessionManager;
use court_matcher::types::{
    FeedbackSubmission, GameType, MatchSessionDetails, MatchingStatus, NewMatchSession,
    UserProfile,
};
use court_matcher::utils::{current_timestamp, generate_id};
use court_matcher::{
    InMemorySessionStore, InMemoryUserDirectory, MatchingOutcome, TracingEventPublisher, UserId,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "match-simulator")]
#[command(about = "Run synthetic players through the court-matcher engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Player count at which joins dispatch a background matching pass
    #[arg(long, default_value = "2")]
    auto_trigger_threshold: usize,

    /// +/- skill range for compatibility scoring
    #[arg(long, default_value = "0.5")]
    skill_range: f64,

    /// Show engine logs
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill a singles session and show the resulting pairing
    Singles {
        /// Comma-separated NTRP skill levels; the first player creates the session
        #[arg(short, long, value_delimiter = ',', default_value = "3.5,4.0")]
        skills: Vec<f64>,
    },
    /// Fill a doubles session and show the resulting pairing
    Doubles {
        /// Comma-separated NTRP skill levels; the first player creates the session
        #[arg(short, long, value_delimiter = ',', default_value = "3.0,3.5,4.0,4.5")]
        skills: Vec<f64>,
    },
    /// Race many joins and manual triggers against one doubles session
    Concurrent {
        /// Users attempting to join at once
        #[arg(short, long, default_value = "12")]
        joiners: usize,
        /// Manual matching triggers fired alongside the joins
        #[arg(short, long, default_value = "8")]
        triggers: usize,
    },
    /// Create, match, confirm and complete a session, then leave feedback
    Lifecycle,
}

struct Simulation {
    manager: SessionManager,
    directory: Arc<InMemoryUserDirectory>,
    worker: tokio::task::JoinHandle<()>,
}

impl Simulation {
    fn new(settings: MatchingSettings) -> Result<Self> {
        let directory = Arc::new(InMemoryUserDirectory::new());
        let metrics = Arc::new(MetricsCollector::new()?);
        let (manager, worker) = SessionManager::new(
            Arc::new(InMemorySessionStore::new()),
            directory.clone(),
            Arc::new(TracingEventPublisher::new()),
            settings,
            metrics,
        );

        Ok(Self {
            manager,
            directory,
            worker: worker.spawn(),
        })
    }

    fn add_player(&self, index: usize, skill_level: f64) -> Result<UserId> {
        let profile = UserProfile {
            id: generate_id(),
            name: format!("player-{}", index + 1),
            skill_level,
        };
        let id = profile.id;
        self.directory.upsert_user(profile)?;
        Ok(id)
    }

    fn session_spec(game_type: GameType, skill_level: f64) -> NewMatchSession {
        let start_time = current_timestamp() + ChronoDuration::days(1);
        NewMatchSession {
            court_id: generate_id(),
            start_time,
            end_time: start_time + ChronoDuration::hours(1),
            game_type,
            skill_level,
        }
    }

    /// Poll until the background worker has moved the session out of Pending
    async fn wait_for_match(&self, details: &MatchSessionDetails) -> Result<MatchSessionDetails> {
        let session_id = details.session.id;
        for _ in 0..50 {
            let current = self.manager.get_session(session_id).await?;
            if current.session.status != MatchingStatus::Pending {
                return Ok(current);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Ok(self.manager.get_session(session_id).await?)
    }

    async fn shutdown(self) {
        drop(self.manager);
        let _ = self.worker.await;
    }
}

fn display_name(details: &MatchSessionDetails, user_id: UserId) -> String {
    match details.profiles.get(&user_id) {
        Some(profile) => format!("{} ({:.1})", profile.name, profile.skill_level),
        None => user_id.to_string(),
    }
}

fn print_session(details: &MatchSessionDetails) {
    let session = &details.session;
    println!(
        "📋 Session {} ({}, skill {:.1}) - status: {}",
        session.id, session.game_type, session.skill_level, session.status
    );
    println!(
        "   Players: {}/{}",
        details.players.len(),
        session.max_players()
    );
    for player in &details.players {
        println!(
            "     • {} priority {}",
            display_name(details, player.user_id),
            player.priority
        );
    }
    if details.pairings.is_empty() {
        println!("   No pairings");
    }
    for pairing in &details.pairings {
        println!(
            "   🎾 Pairing {} - score {:.3}",
            pairing.id, pairing.compatibility_score
        );
        for user_id in pairing.player_ids() {
            println!("     • {}", display_name(details, user_id));
        }
    }
}

async fn run_fill(sim: &Simulation, game_type: GameType, skills: &[f64]) -> Result<()> {
    let (creator_skill, others) = skills
        .split_first()
        .ok_or_else(|| anyhow!("At least one skill level is required"))?;

    let creator = sim.add_player(0, *creator_skill)?;
    let details = sim
        .manager
        .create_session(creator, Simulation::session_spec(game_type, *creator_skill))
        .await?;
    println!("✅ Created {} session {}", game_type, details.session.id);

    for (i, skill) in others.iter().enumerate() {
        let user_id = sim.add_player(i + 1, *skill)?;
        match sim.manager.join_session(details.session.id, user_id).await {
            Ok(player) => println!(
                "➕ Player {} (skill {:.1}) joined with priority {}",
                i + 2,
                skill,
                player.priority
            ),
            Err(e) => println!("❌ Player {} (skill {:.1}) rejected: {}", i + 2, skill, e),
        }
    }

    let details = sim.wait_for_match(&details).await?;
    print_session(&details);
    Ok(())
}

async fn run_concurrent(sim: &Simulation, joiners: usize, triggers: usize) -> Result<()> {
    let creator = sim.add_player(0, 4.0)?;
    let details = sim
        .manager
        .create_session(creator, Simulation::session_spec(GameType::Doubles, 4.0))
        .await?;
    let session_id = details.session.id;

    let mut users = Vec::with_capacity(joiners);
    for i in 0..joiners {
        users.push(sim.add_player(i + 1, 3.0 + (i % 5) as f64 * 0.25)?);
    }

    println!(
        "🏁 Racing {} joins and {} triggers on session {}",
        joiners, triggers, session_id
    );

    let joins = users.into_iter().map(|user_id| {
        let manager = sim.manager.clone();
        tokio::spawn(async move { manager.join_session(session_id, user_id).await.is_ok() })
    });
    let manual = (0..triggers).map(|_| {
        let manager = sim.manager.clone();
        tokio::spawn(async move { manager.trigger_matching(session_id).await })
    });
    let joins: Vec<_> = joins.collect();
    let manual: Vec<_> = manual.collect();

    let mut admitted = 1;
    for handle in joins {
        if handle.await? {
            admitted += 1;
        }
    }

    let mut committed = 0;
    for handle in manual {
        match handle.await? {
            Ok(MatchingOutcome::Committed { .. }) => committed += 1,
            Ok(outcome) => println!("   trigger finished: {}", outcome.as_label()),
            Err(e) => println!("   trigger failed: {}", e),
        }
    }

    let details = sim.wait_for_match(&details).await?;
    println!(
        "📊 Admitted {} of {} users, {} manual trigger(s) committed",
        admitted,
        joiners + 1,
        committed
    );
    print_session(&details);

    if details.players.len() > details.session.max_players() {
        return Err(anyhow!("Session capacity exceeded"));
    }
    Ok(())
}

async fn run_lifecycle(sim: &Simulation) -> Result<()> {
    let creator = sim.add_player(0, 4.0)?;
    let partner = sim.add_player(1, 4.0)?;

    let details = sim
        .manager
        .create_session(creator, Simulation::session_spec(GameType::Singles, 4.0))
        .await?;
    let session_id = details.session.id;
    sim.manager.join_session(session_id, partner).await?;

    let details = sim.wait_for_match(&details).await?;
    print_session(&details);

    let pairing = details
        .pairings
        .first()
        .ok_or_else(|| anyhow!("Session {} produced no pairing", session_id))?;

    for status in [MatchingStatus::Confirmed, MatchingStatus::Completed] {
        let session = sim.manager.update_session_status(session_id, status).await?;
        println!("🔄 Session is now {}", session.status);
    }

    let feedback = sim
        .manager
        .submit_feedback(FeedbackSubmission {
            pairing_id: pairing.id,
            from_user_id: creator,
            to_user_id: partner,
            rating: 5,
            court_rating: Some(4),
            match_quality: Some(5),
            comments: Some("Great rallies".to_string()),
            court_comments: None,
        })
        .await?;
    println!("⭐ Feedback recorded: rating {}", feedback.rating);

    let stats = sim.manager.matching_stats(partner).await?;
    println!(
        "📈 Partner stats - matches: {}, average rating: {:?}",
        stats.total_matches, stats.average_rating
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .init();

    let settings = MatchingSettings {
        auto_trigger_threshold: cli.auto_trigger_threshold,
        skill_level_range: cli.skill_range,
        ..MatchingSettings::default()
    };
    validate_config(&AppConfig {
        matching: settings.clone(),
        ..AppConfig::default()
    })?;
    let sim = Simulation::new(settings)?;

    let result = match cli.command {
        Commands::Singles { skills } => run_fill(&sim, GameType::Singles, &skills).await,
        Commands::Doubles { skills } => run_fill(&sim, GameType::Doubles, &skills).await,
        Commands::Concurrent { joiners, triggers } => {
            run_concurrent(&sim, joiners, triggers).await
        }
        Commands::Lifecycle => run_lifecycle(&sim).await,
    };

    if let Ok(stats) = sim.manager.stats().await {
        println!(
            "🧮 Engine: {} session(s), {} join(s), {} rejected, {} pass(es), {} pairing(s)",
            stats.sessions_created,
            stats.players_joined,
            stats.joins_rejected,
            stats.matching.passes,
            stats.matching.pairings_created
        );
    }
    sim.shutdown().await;

    if let Err(e) = result {
        eprintln!("❌ Simulation failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
