//! # lumisync
//!
//! Real-time lamp-pattern and audio playback engine for an 8-lamp GPIO
//! display. See [`lumisync`] for the library surface; this binary only
//! wires together the CLI (§6), GPIO window, signal handling, and the
//! chosen run mode (direct song, one-shot switch, or interactive menu).

use clap::Parser;
use lumisync::config::RunConfig;
use lumisync::control::menu;
use lumisync::gpio::{GpioSink, GpioWindow};
use lumisync::pattern::LAMP_LINES;
use lumisync::signal::{self, StopFlag};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "lumisync")]
#[command(about = "Real-time lamp-pattern and audio playback engine")]
#[command(version)]
struct Args {
    /// Verbose mode: print GPIO/audio timing stats to a CSV report
    #[arg(short, long)]
    verbose: bool,

    /// Music directory (default: /home/linux/music/)
    #[arg(short = 'm', long = "music-dir")]
    music_dir: Option<String>,

    /// Turn all lamps on or off and exit
    #[arg(short, long)]
    switch: Option<String>,

    /// Play this song directly, without the .wav/.txt extension
    songname: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            if args.verbose {
                "lumisync=debug".into()
            } else {
                "lumisync=info".into()
            }
        }))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let config = RunConfig::new(args.verbose, args.music_dir, args.switch, args.songname)
        .map_err(|e| anyhow::anyhow!(e))?;

    info!("initializing GPIO");
    let gpio = GpioWindow::open()?;
    gpio.configure_as_output(&LAMP_LINES);

    if let Some(mode) = config.switch {
        run_switch_mode(&gpio, mode);
        return Ok(());
    }

    gpio.all_off(&LAMP_LINES);

    let stop = StopFlag::new();
    signal::install(stop.clone())?;

    let gpio: Arc<dyn GpioSink> = Arc::new(gpio);

    match &config.song {
        Some(name) => {
            let base = config.song_base(name);
            match lumisync::playback::play_song(&base, gpio.clone(), stop, config.verbose) {
                Ok(outcome) => info!(?outcome, "playback finished"),
                Err(e) => error!(error = %e, "playback failed"),
            }
        }
        None => menu::run(&config, gpio.clone(), stop),
    }

    gpio.clear_bits(lumisync::pattern::lamp_mask());
    info!("gpio cleaned up, goodbye");
    Ok(())
}

fn run_switch_mode(gpio: &GpioWindow, mode: lumisync::config::SwitchMode) {
    use lumisync::config::SwitchMode;
    let mask = lumisync::pattern::lamp_mask();
    match mode {
        SwitchMode::On => {
            info!("turning all lamps on");
            gpio.set_bits(mask);
        }
        SwitchMode::Off => {
            info!("turning all lamps off");
            gpio.clear_bits(mask);
        }
    }
}
