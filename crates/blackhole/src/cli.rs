use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use sceneconfig::{parse_antialias, AntialiasSetting};

#[derive(Parser, Debug)]
#[command(
    name = "blackhole",
    author,
    version,
    about = "Real-time black hole with accretion disk, lensing and bloom"
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Options shared by the window and every subcommand.
///
/// Tunables are taken as text so that out-of-range or non-numeric input is
/// clamped the same way a config file value would be.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Scene configuration file (defaults to `<config dir>/scene.toml`).
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Target particle count (100-5000).
    #[arg(long, value_name = "COUNT", global = true)]
    pub particles: Option<String>,

    /// Disk rotation speed multiplier (0.1-5).
    #[arg(long, value_name = "SPEED", global = true)]
    pub rotation_speed: Option<String>,

    /// Lensing intensity (0-2).
    #[arg(long, value_name = "INTENSITY", global = true)]
    pub lensing: Option<String>,

    /// Camera sensitivity (0.1-2).
    #[arg(long, value_name = "SENSITIVITY", global = true)]
    pub sensitivity: Option<String>,

    /// Bloom strength (0-3); 0 disables the bloom chain.
    #[arg(long, value_name = "STRENGTH", global = true)]
    pub bloom: Option<String>,

    /// Performance mode: `high`, `medium`, or `low`.
    #[arg(long, value_name = "MODE", global = true)]
    pub performance: Option<String>,

    /// Additional `KEY=VALUE` overrides, applied after every other flag.
    #[arg(long = "set", value_name = "KEY=VALUE", global = true)]
    pub overrides: Vec<String>,

    /// Override the window or surface size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", global = true)]
    pub size: Option<String>,

    /// Seed for particles and stars; omitted means a fresh random scene.
    #[arg(long, value_name = "SEED", global = true)]
    pub seed: Option<u64>,

    /// Anti-aliasing policy: `auto`, `off`, or an MSAA sample count (2/4/8/16).
    #[arg(long, value_name = "MODE", value_parser = parse_antialias, global = true)]
    pub antialias: Option<AntialiasSetting>,

    /// Present without waiting for vertical sync.
    #[arg(long, global = true)]
    pub no_vsync: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the simulation without a window or GPU and print statistics.
    Headless(HeadlessArgs),
    /// Print the resolved configuration and where it came from.
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct HeadlessArgs {
    /// Number of frames to simulate.
    #[arg(long, default_value_t = 600)]
    pub ticks: u32,

    /// Simulated seconds per frame.
    #[arg(long, value_name = "SECONDS", default_value_t = 1.0 / 60.0)]
    pub dt: f32,

    /// Frame time reported to the performance governor; defaults to `--dt`.
    #[arg(long, value_name = "MILLISECONDS")]
    pub frame_ms: Option<f64>,

    /// Emit the report as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Emit JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_accepted_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "blackhole",
            "headless",
            "--ticks",
            "10",
            "--particles",
            "250",
            "--set",
            "bloom_strength=0",
            "--set",
            "lensing=2",
        ])
        .unwrap();
        assert_eq!(cli.run.particles.as_deref(), Some("250"));
        assert_eq!(cli.run.overrides, vec!["bloom_strength=0", "lensing=2"]);
        match cli.command {
            Some(Command::Headless(args)) => {
                assert_eq!(args.ticks, 10);
                assert!(!args.json);
                assert!(args.frame_ms.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn window_mode_is_the_default() {
        let cli = Cli::try_parse_from(["blackhole", "--antialias", "8", "--no-vsync"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.antialias, Some(AntialiasSetting::Samples8));
        assert!(cli.run.no_vsync);
    }

    #[test]
    fn bad_antialias_is_rejected() {
        assert!(Cli::try_parse_from(["blackhole", "--antialias", "3"]).is_err());
    }
}
