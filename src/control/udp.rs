//! UDP song ingress (§6) and its file-based emulation mode.
//!
//! Grounded on `examples/original_source/src/udp.c`'s `receive_udp_song`/
//! `emulate_udp_from_file`: a single `{"song": "..."}` datagram (or line)
//! names the next song to play. This is explicitly external to the
//! real-time core, so it gets light coverage — parsing only, no real
//! socket in tests.

use serde::Deserialize;
use std::io::BufRead;
use std::net::UdpSocket;
use std::path::Path;
use std::time::Duration;

pub const UDP_PORT: u16 = 5005;
const RECV_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct SongRequest {
    song: String,
}

/// Bind `0.0.0.0:UDP_PORT`, wait up to 30 s for a single `{"song": "..."}`
/// datagram, reply with an ack, and return the song name. `None` on
/// timeout, a malformed payload, or any socket error — the caller treats
/// all three the same way (stay in the menu).
pub fn receive_udp_song() -> Option<String> {
    let socket = UdpSocket::bind(("0.0.0.0", UDP_PORT))
        .map_err(|e| tracing::warn!(error = %e, "udp bind failed"))
        .ok()?;
    socket.set_read_timeout(Some(RECV_TIMEOUT)).ok()?;

    let mut buf = [0u8; 1024];
    tracing::info!(port = UDP_PORT, "waiting for udp json");
    let (n, src) = socket
        .recv_from(&mut buf)
        .map_err(|e| tracing::info!(error = %e, "no udp song received (timeout or error)"))
        .ok()?;

    let song = parse_song_json(&buf[..n])?;

    let ack = format!("{{\"ack\":\"ok\",\"song\":\"{song}\"}}");
    let _ = socket.send_to(ack.as_bytes(), src);

    tracing::info!(song = %song, "parsed udp song name");
    Some(song)
}

fn parse_song_json(bytes: &[u8]) -> Option<String> {
    let req: SongRequest = serde_json::from_slice(bytes).ok()?;
    if req.song.is_empty() {
        None
    } else {
        Some(req.song)
    }
}

/// Read one JSON object per line from `path`, returning every valid song
/// name in order. Lines that don't parse are skipped, matching the
/// original's best-effort line scanner.
pub fn emulate_udp_from_file(path: &Path) -> std::io::Result<Vec<String>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut songs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if let Some(song) = parse_song_json(line.as_bytes()) {
            songs.push(song);
        }
    }
    Ok(songs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_song_request() {
        let song = parse_song_json(br#"{"song": "jingle_bells"}"#.as_ref());
        assert_eq!(song.as_deref(), Some("jingle_bells"));
    }

    #[test]
    fn rejects_missing_song_field() {
        assert!(parse_song_json(br#"{"ack": "ok"}"#.as_ref()).is_none());
    }

    #[test]
    fn rejects_empty_song_name() {
        assert!(parse_song_json(br#"{"song": ""}"#.as_ref()).is_none());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_song_json(b"not really json").is_none());
    }

    #[test]
    fn emulate_from_file_collects_every_valid_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("udp_emulation.json");
        std::fs::write(&path, "{\"song\":\"first\"}\nnot json\n{\"song\":\"second\"}\n").unwrap();

        let songs = emulate_udp_from_file(&path).unwrap();
        assert_eq!(songs, vec!["first".to_string(), "second".to_string()]);
    }
}
