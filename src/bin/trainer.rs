use anyhow::Result;
use clap::Parser;
use movierec::services::training::TrainingService;
use movierec::{init_tracing, Config};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Build the ratings matrix and fit the NMF model", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(long)]
    ratings: Option<PathBuf>,

    #[arg(long)]
    movies: Option<PathBuf>,

    #[arg(long)]
    max_rows: Option<usize>,

    /// Where the trained artifact is written.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Train from the cached joined table instead of the source CSVs.
    #[arg(long)]
    from_cache: bool,

    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing();

    let mut config = Config::load_or_default(&args.config)?;
    if let Some(ratings) = args.ratings {
        config.data.ratings_path = ratings;
    }
    if let Some(movies) = args.movies {
        config.data.movies_path = movies;
    }
    if let Some(max_rows) = args.max_rows {
        config.data.max_rows = max_rows;
    }
    if let Some(output) = args.output {
        config.data.model_path = output;
    }

    info!("Training configuration loaded: {:?}", config.training);
    let trainer = TrainingService::new(&config.training);

    let artifact = if args.from_cache {
        let artifact = trainer.train_from_cache(&config.data.cache_path)?;
        artifact.save(&config.data.model_path)?;
        artifact
    } else {
        trainer.run_pipeline(&config.data)?
    };

    let (users, titles) = artifact.ratings.shape();
    info!(
        "Trained model on {} users x {} titles, reconstruction error {:.4}, written to {}",
        users,
        titles,
        artifact.model.reconstruction_err,
        config.data.model_path.display()
    );

    Ok(())
}
