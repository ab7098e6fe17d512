//! Configuration management for geowarp

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::gcp::{GroundControlPoint, PixelPoint};
use crate::genetic::GeneticConfig;
use crate::polynomial::Order;
use crate::solve::SolveMethod;

/// Least-squares fitting options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FitConfig {
    /// Highest order to try; lowered automatically when the points don't support it
    pub order: Order,
    pub method: SolveMethod,
    /// Run the genetic search when no least-squares fit succeeds
    pub genetic_fallback: bool,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            order: Order::MAX,
            method: SolveMethod::default(),
            genetic_fallback: true,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub fit: FitConfig,

    #[serde(default)]
    pub genetic: GeneticConfig,

    /// Ground control points
    #[serde(default)]
    pub gcps: Vec<GroundControlPoint>,

    /// Pixel positions to report geographic coordinates for
    #[serde(default)]
    pub probes: Vec<PixelPoint>,
}

impl Config {
    /// Load configuration from a file, or create default if it doesn't exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", path))?;
            config
                .genetic
                .validate()
                .with_context(|| format!("Invalid [genetic] section in {:?}", path))?;
            tracing::info!("Loaded configuration from {:?}", path);
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            tracing::info!("Created default configuration at {:?}", path);
            Ok(config)
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.fit.order, Order::MAX);
        assert_eq!(config.fit.method, SolveMethod::Svd);
        assert!(config.gcps.is_empty());
        assert_eq!(config.genetic.mutation_probability, 0.8);
    }

    #[test]
    fn test_parse_partial_file() {
        let text = r#"
            [fit]
            order = 2
            method = "normal-equations"

            [genetic]
            population = 50
            seed = 7

            [[gcps]]
            pixel_x = 0.0
            pixel_y = 0.0
            lon = 10.0
            lat = 50.0

            [[gcps]]
            pixel_x = 100.0
            pixel_y = 0.0
            lon = 10.1
            lat = 50.0

            [[probes]]
            x = 50.0
            y = 25.0
        "#;
        let config: Config = toml::from_str(text).unwrap();

        assert_eq!(config.fit.order.get(), 2);
        assert_eq!(config.fit.method, SolveMethod::NormalEquations);
        assert!(config.fit.genetic_fallback);
        assert_eq!(config.genetic.population, 50);
        assert_eq!(config.genetic.seed, Some(7));
        assert_eq!(config.genetic.max_generations, GeneticConfig::default().max_generations);
        assert_eq!(config.gcps.len(), 2);
        assert_eq!(config.gcps[1].lon, 10.1);
        assert_eq!(config.probes, vec![PixelPoint::new(50.0, 25.0)]);
    }

    #[test]
    fn test_invalid_order_rejected() {
        assert!(toml::from_str::<Config>("[fit]\norder = 9\n").is_err());
        assert!(toml::from_str::<Config>("[fit]\nmethod = \"lu\"\n").is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = std::env::temp_dir().join(format!("geowarp-config-{}", std::process::id()));
        let path = dir.join("nested").join("geowarp.toml");

        let mut config = Config::default();
        config.fit.method = SolveMethod::Qr;
        config.gcps.push(GroundControlPoint::new(1.0, 2.0, 3.5, -4.25));
        config.save(&path).unwrap();

        let loaded = Config::load_or_create(&path).unwrap();
        assert_eq!(loaded, config);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_created() {
        let dir = std::env::temp_dir().join(format!("geowarp-default-{}", std::process::id()));
        let path = dir.join("geowarp.toml");

        let config = Config::load_or_create(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_invalid_genetic_section_rejected() {
        let dir = std::env::temp_dir().join(format!("geowarp-genetic-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("geowarp.toml");
        std::fs::write(&path, "[genetic]\nmutation_probability = 1.5\n").unwrap();

        let err = Config::load_or_create(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("mutation_probability"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
