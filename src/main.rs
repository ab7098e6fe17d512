//! geowarp - fit a georeferencing transform from ground control points
//!
//! Reads control points and fitting options from a TOML file, fits the
//! highest-order polynomial transform the points support and prints a JSON
//! report with the coefficients, error metrics and any requested probes.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use geowarp::config::Config;
use geowarp::genetic;
use geowarp::report::{FitReport, Solver};
use geowarp::{Order, PixelPoint, SolveMethod, TransformFactory, Vincenty};

/// geowarp - polynomial georeferencing transforms
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "geowarp.toml")]
    config: PathBuf,

    /// Highest polynomial order to try (1-8)
    #[arg(long)]
    order: Option<u8>,

    /// Least-squares solver (svd, qr, normal-equations, normal-inverse)
    #[arg(short, long)]
    method: Option<SolveMethod>,

    /// Skip least squares and run the genetic search directly
    #[arg(long)]
    genetic: bool,

    /// Pixel position to map, as x,y (repeatable)
    #[arg(short, long, value_parser = parse_probe)]
    probe: Vec<PixelPoint>,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_probe(s: &str) -> std::result::Result<PixelPoint, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{}'", s))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid coordinate '{}': {}", v, e))
    };
    Ok(PixelPoint::new(parse(x)?, parse(y)?))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    info!("geowarp v{}", env!("CARGO_PKG_VERSION"));

    // Load or create configuration, CLI args override
    let mut config = Config::load_or_create(&args.config)?;
    if let Some(order) = args.order {
        config.fit.order = Order::new(order).context("Invalid --order")?;
    }
    if let Some(method) = args.method {
        config.fit.method = method;
    }
    config.probes.extend(args.probe);

    if config.gcps.is_empty() {
        bail!("No ground control points in {:?}", args.config);
    }

    info!(
        "Fitting up to order {} with {} from {} control points",
        config.fit.order,
        config.fit.method,
        config.gcps.len()
    );

    let geodesic = Vincenty::default();
    let fitted = if args.genetic {
        None
    } else {
        TransformFactory::new(config.fit.method, Order::MAX)
            .create_highest_feasible_with(&config.gcps, config.fit.order, &geodesic)
            .context("Least-squares fit failed")?
    };

    let report = match fitted {
        Some(transform) => {
            FitReport::new(&transform, Solver::LeastSquares, &config.probes, &geodesic)
        }
        None if args.genetic || config.fit.genetic_fallback => {
            if !args.genetic {
                warn!("No least-squares fit possible, falling back to genetic search");
            }
            let fit = genetic::evolve_first_order(&config.gcps, &config.genetic, &geodesic)
                .context("Genetic search failed")?;
            if !fit.converged() {
                warn!(
                    "Genetic search did not converge (lon {:?}, lat {:?})",
                    fit.lon.state, fit.lat.state
                );
            }
            let transform = fit
                .to_transform(&config.gcps, config.fit.method)
                .context("Failed to build transform from genetic result")?;
            FitReport::new(&transform, Solver::Genetic, &config.probes, &geodesic)
                .with_genetic(fit)
        }
        None => bail!(
            "No transform could be fitted from {} control points",
            config.gcps.len()
        ),
    };

    info!(
        "Order {} transform: rmse {:.3e} deg, rmse_meters {:.3}, max error {:.3} m, fingerprint {}",
        report.transform.order(),
        report.metrics.rmse,
        report.metrics.rmse_meters,
        report.metrics.max_meters_error,
        report.fingerprint
    );

    let json = report.to_json().context("Failed to serialize report")?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write report to {:?}", path))?;
            info!("Wrote report to {:?}", path);
        }
        None => println!("{}", json),
    }

    Ok(())
}
