use std::{env, fs, process::ExitCode};

use anyhow::{Context, Result, bail};
use chrono::Duration;
use clap::{Parser, Subcommand};
use lateplate::{
    Algorithm, BearerAuth, Claims, ClusteringRequest, ClusteringService, Config, GeoPoint,
    Restaurant, RestaurantDB, ServiceError,
    clusterer::{DEFAULT_EPS_KM, DEFAULT_MIN_PTS},
    config::JWT_SECRET_VAR,
    service::{DEFAULT_K, ErrorBody},
};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable holding the raw bearer token
const TOKEN_VAR: &str = "LATEPLATE_TOKEN";

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// SQLite database path (overrides LATEPLATE_DB)
    #[arg(long, global = true)]
    db: Option<String>,

    /// Bearer token presented with the request (falls back to LATEPLATE_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load restaurants from a JSON array file
    Import { path: String },

    /// Run a clustering pass and store the result
    Cluster {
        #[arg(long, value_enum, default_value_t = Algorithm::Kmeans)]
        algorithm: Algorithm,

        #[arg(long, default_value_t = DEFAULT_K)]
        k: usize,

        /// DBSCAN radius in km
        #[arg(long, default_value_t = DEFAULT_EPS_KM)]
        eps: f64,

        #[arg(long, default_value_t = DEFAULT_MIN_PTS)]
        min_pts: usize,

        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,

        /// K-means seed (overrides LATEPLATE_SEED)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Recent runs and usage analytics
    History,

    /// Most recent run
    Latest,

    /// Sign a session token with LATEPLATE_JWT_SECRET
    Token {
        #[arg(long)]
        user_id: String,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        role: Option<String>,

        /// Lifetime in hours
        #[arg(long, default_value_t = 24 * 7)]
        ttl_hours: i64,
    },
}

fn main() -> Result<ExitCode> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = Config::load()?;
    if let Some(db) = args.db {
        config.db_path = db;
    }

    let authorization = args
        .token
        .or_else(|| env::var(TOKEN_VAR).ok())
        .map(|token| format!("Bearer {}", token));

    match args.command {
        Command::Token {
            user_id,
            email,
            role,
            ttl_hours,
        } => {
            let claims = Claims {
                user_id: Some(user_id),
                email,
                role,
                ..Claims::default()
            };
            let token = bearer_auth(&config)?
                .issue(claims, Duration::hours(ttl_hours))
                .context("Failed to issue token")?;
            println!("{}", token);
            Ok(ExitCode::SUCCESS)
        }
        Command::Import { path } => {
            let raw = fs::read_to_string(&path).context(format!("Failed to read {}", path))?;
            let restaurants: Vec<Restaurant> = serde_json::from_str(&raw)
                .context(format!("Invalid restaurant JSON in {}", path))?;

            let mut db = RestaurantDB::open(&config.db_path)?;
            let imported = db.insert_restaurants(&restaurants)?;
            let total = db.restaurant_count()?;
            info!(imported, total, path = %path, "restaurants imported");

            print_json(&serde_json::json!({
                "success": true,
                "imported": imported,
                "totalRestaurants": total,
            }))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Cluster {
            algorithm,
            k,
            eps,
            min_pts,
            lat,
            lng,
            seed,
        } => {
            let service = build_service(&config)?;
            let request = ClusteringRequest {
                algorithm,
                k,
                eps,
                min_pts,
                location: lat.zip(lng).map(|(lat, lng)| GeoPoint::new(lat, lng)),
                seed,
            };
            respond(service.cluster(authorization.as_deref(), &request))
        }
        Command::History => {
            let service = build_service(&config)?;
            respond(service.history(authorization.as_deref()))
        }
        Command::Latest => {
            let service = build_service(&config)?;
            respond(service.latest(authorization.as_deref()))
        }
    }
}

fn bearer_auth(config: &Config) -> Result<BearerAuth> {
    let Some(secret) = config.jwt_secret.as_deref() else {
        bail!("{} is not set; refusing to handle tokens", JWT_SECRET_VAR);
    };
    BearerAuth::from_secret(secret).context("Invalid JWT secret")
}

fn build_service(config: &Config) -> Result<ClusteringService> {
    let auth = bearer_auth(config)?;
    let db = RestaurantDB::open(&config.db_path)?;
    Ok(ClusteringService::new(db, auth).with_default_seed(config.seed))
}

/// Print the success body or an error body, mapping failures to an exit code
fn respond<T: Serialize>(result: Result<T, ServiceError>) -> Result<ExitCode> {
    match result {
        Ok(body) => {
            print_json(&body)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(status = e.status_code(), "{:#}", e);
            print_json(&ErrorBody {
                error: e.public_message(),
            })?;
            Ok(exit_code_for(e.status_code()))
        }
    }
}

fn exit_code_for(status: u16) -> ExitCode {
    match status {
        401 => ExitCode::from(3),
        404 => ExitCode::from(4),
        400 => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render JSON")?;
    println!("{}", rendered);
    Ok(())
}
