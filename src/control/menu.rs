//! Interactive menu (§6), matching
//! `examples/original_source/src/main.c`'s four-option loop: play a song by
//! name, receive one via UDP JSON, exit, or replay a file of UDP
//! emulation lines.

use crate::config::RunConfig;
use crate::control::udp;
use crate::gpio::GpioSink;
use crate::playback::coordinator;
use crate::signal::StopFlag;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

const EMULATION_FILE: &str = "udp_emulation.json";

pub fn run(config: &RunConfig, gpio: Arc<dyn GpioSink>, stop: StopFlag) {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!(
            "\n=== LED + Music Sequencer ===\n\
             1) Play song manually\n\
             2) Receive song name via UDP JSON\n\
             3) Exit\n\
             4) Emulate UDP from file\n> "
        );
        let _ = io::stdout().flush();

        let choice = match lines.next() {
            Some(Ok(line)) => line,
            _ => break,
        };

        match parse_choice(&choice) {
            Some(1) => {
                if let Some(name) = read_song_name(&mut lines) {
                    play_one(config, gpio.clone(), stop.clone(), &name);
                }
            }
            Some(2) => match udp::receive_udp_song() {
                Some(name) => {
                    println!("UDP provided song: '{name}'");
                    if confirm(&mut lines, "Play this song? (y/n): ") {
                        play_one(config, gpio.clone(), stop.clone(), &name);
                    } else {
                        println!("Canceled, returning to menu.");
                    }
                }
                None => println!("No valid UDP song received (timeout or error)."),
            },
            Some(3) => {
                println!("Exiting program.");
                break;
            }
            Some(4) => {
                replay_emulation_file(config, gpio.clone(), stop.clone());
            }
            _ => println!("Invalid choice. Try again."),
        }
    }
}

fn parse_choice(raw: &str) -> Option<u32> {
    raw.trim().parse().ok()
}

fn read_song_name(lines: &mut impl Iterator<Item = io::Result<String>>) -> Option<String> {
    print!("Enter song base name (without .wav/.txt): ");
    let _ = io::stdout().flush();
    let name = lines.next()?.ok()?;
    let name = name.trim().to_string();
    if name.is_empty() {
        println!("Empty name, returning to menu.");
        None
    } else {
        Some(name)
    }
}

fn confirm(lines: &mut impl Iterator<Item = io::Result<String>>, prompt: &str) -> bool {
    print!("{prompt}");
    let _ = io::stdout().flush();
    match lines.next() {
        Some(Ok(line)) => matches!(line.trim().chars().next(), Some('y') | Some('Y')),
        _ => false,
    }
}

fn replay_emulation_file(config: &RunConfig, gpio: Arc<dyn GpioSink>, stop: StopFlag) {
    match udp::emulate_udp_from_file(std::path::Path::new(EMULATION_FILE)) {
        Ok(songs) => {
            for song in songs {
                println!("Emulated UDP: received song '{song}'");
                play_one(config, gpio.clone(), stop.clone(), &song);
            }
        }
        Err(e) => tracing::warn!(error = %e, file = EMULATION_FILE, "emulate_udp_from_file open failed"),
    }
}

fn play_one(config: &RunConfig, gpio: Arc<dyn GpioSink>, stop: StopFlag, name: &str) {
    let base = config.song_base(name);
    println!("\n=== Starting playback of '{name}' ===");
    match coordinator::play_song(&base, gpio, stop, config.verbose) {
        Ok(outcome) => println!("Playback finished for '{name}': {outcome:?}"),
        Err(e) => eprintln!("Playback of '{name}' failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_digit_choices() {
        assert_eq!(parse_choice("1\n"), Some(1));
        assert_eq!(parse_choice("4"), Some(4));
    }

    #[test]
    fn rejects_non_numeric_choices() {
        assert_eq!(parse_choice("abc"), None);
    }

    #[test]
    fn read_song_name_trims_and_rejects_blank() {
        let mut lines = vec![Ok("  jingle_bells  ".to_string())].into_iter();
        assert_eq!(read_song_name(&mut lines), Some("jingle_bells".to_string()));

        let mut blank = vec![Ok("   ".to_string())].into_iter();
        assert_eq!(read_song_name(&mut blank), None);
    }

    #[test]
    fn confirm_accepts_only_y_or_capital_y() {
        let mut yes = vec![Ok("y".to_string())].into_iter();
        assert!(confirm(&mut yes, ""));
        let mut no = vec![Ok("n".to_string())].into_iter();
        assert!(!confirm(&mut no, ""));
    }
}
