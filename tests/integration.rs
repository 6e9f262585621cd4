//! Integration tests against an in-process mock speaker.
//!
//! The mock implements just enough of the control protocol to exercise the
//! client end to end: GETs answer from a command/value table, SETs store the
//! payload and answer with the acknowledgement frame.

use kef_wireless::{
    BlockingSpeaker, CableMode, Command, Connection, ConnectionConfig, KefError, Orientation,
    PlaybackState, Request, Source, Speaker, StandbyTime, SubPolarity,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

type SharedState = Arc<Mutex<HashMap<u8, Vec<u8>>>>;

fn initial_state() -> HashMap<u8, Vec<u8>> {
    let mut state = HashMap::new();
    state.insert(0x25, vec![0x32]); // volume 50, unmuted
    state.insert(0x30, vec![0x02]); // WiFi, on, 20 min standby, normal orientation
    state.insert(0x31, vec![0x84]); // stopped
    state.insert(0x27, vec![0x05]); // desk + phase, standard bass, normal polarity
    state.insert(0x28, vec![0x86]); // desk: -3.0 dB
    state.insert(0x29, vec![0x86]); // wall: -3.0 dB
    state.insert(0x2A, vec![0x84]); // treble: 0.0 dB
    state.insert(0x2B, vec![0x80]); // high pass: 50 Hz
    state.insert(0x2C, vec![0x80]); // sub out: 40 Hz
    state.insert(0x2D, vec![0x8A]); // sub gain: 0 dB
    state.insert(0x26, vec![0x9E]); // balance centered (30 | 0x80)
    state.insert(0x3D, vec![0x64]); // volume limit 100, disabled
    state.insert(0x41, vec![0x01]); // wired
    state.insert(0x20, b"Test Speaker\x00".to_vec());
    state
}

async fn process(data: &[u8], state: &SharedState) -> Vec<u8> {
    if data.len() < 3 {
        return vec![0x52, 0x00, 0xFF];
    }
    let cmd = data[1];
    match data[0] {
        // GET
        0x47 => match state.lock().await.get(&cmd) {
            Some(value) if value.len() == 1 => vec![0x52, cmd, 0x81, value[0]],
            Some(value) => {
                let mut reply = vec![0x52, cmd, value.len() as u8 | 0x80];
                reply.extend_from_slice(value);
                reply
            }
            None => vec![0x52, cmd, 0x81, 0xFF],
        },
        // SET
        0x53 => {
            if data.len() >= 4 {
                state.lock().await.insert(cmd, data[3..].to_vec());
            }
            vec![0x52, 0x11, 0xFF]
        }
        _ => vec![0x52, 0x00, 0xFF],
    }
}

async fn handle_client(mut stream: TcpStream, state: SharedState) {
    let mut buf = [0u8; 128];
    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        let reply = process(&buf[..n], &state).await;
        if stream.write_all(&reply).await.is_err() {
            return;
        }
    }
}

/// Start a mock speaker and return the port it listens on.
async fn spawn_mock() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let state: SharedState = Arc::new(Mutex::new(initial_state()));
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(handle_client(stream, state.clone()));
        }
    });
    port
}

fn test_config(port: u16) -> ConnectionConfig {
    // Keepalive long enough that functional tests never race the idle timer
    ConnectionConfig::new("127.0.0.1")
        .with_port(port)
        .with_keepalive(Duration::from_secs(30))
}

async fn mock_speaker() -> Speaker {
    let port = spawn_mock().await;
    Speaker::with_config(test_config(port))
}

/// Volume reads decode magnitude and mute flag.
#[tokio::test]
async fn get_volume() {
    let speaker = mock_speaker().await;
    let volume = speaker.get_volume().await.unwrap();
    assert_eq!(volume.volume, 50);
    assert!(!volume.is_muted);
}

/// Setting the volume keeps the current mute flag.
#[tokio::test]
async fn set_volume_preserves_mute_state() {
    let speaker = mock_speaker().await;

    speaker.set_volume(75).await.unwrap();
    let volume = speaker.get_volume().await.unwrap();
    assert_eq!(volume.volume, 75);
    assert!(!volume.is_muted);

    speaker.mute().await.unwrap();
    speaker.set_volume(60).await.unwrap();
    let volume = speaker.get_volume().await.unwrap();
    assert_eq!(volume.volume, 60);
    assert!(volume.is_muted);
}

/// Mute and unmute toggle only the flag bit.
#[tokio::test]
async fn mute_and_unmute() {
    let speaker = mock_speaker().await;

    speaker.mute().await.unwrap();
    let volume = speaker.get_volume().await.unwrap();
    assert!(volume.is_muted);
    assert_eq!(volume.volume, 50);

    speaker.unmute().await.unwrap();
    assert!(!speaker.get_volume().await.unwrap().is_muted);
}

/// The state byte decodes into source, standby, orientation and power.
#[tokio::test]
async fn get_state() {
    let speaker = mock_speaker().await;
    let state = speaker.get_state().await.unwrap();
    assert_eq!(state.source, Source::Wifi);
    assert!(state.is_on);
    assert_eq!(state.standby_time, StandbyTime::Minutes20);
    assert_eq!(state.orientation, Orientation::Normal);
}

/// Switching source rewrites only the source bits of the state byte.
#[tokio::test]
async fn set_source_roundtrip() {
    let speaker = mock_speaker().await;
    speaker.set_source(Source::Bluetooth).await.unwrap();
    assert_eq!(speaker.get_source().await.unwrap(), Source::Bluetooth);

    let state = speaker.get_state().await.unwrap();
    assert!(state.is_on);
    assert_eq!(state.standby_time, StandbyTime::Minutes20);
}

/// Standby time and orientation read-modify-write the shared state byte.
#[tokio::test]
async fn set_standby_time_and_orientation() {
    let speaker = mock_speaker().await;

    speaker.set_standby_time(StandbyTime::Never).await.unwrap();
    assert_eq!(
        speaker.get_standby_time().await.unwrap(),
        StandbyTime::Never
    );

    speaker
        .set_orientation(Orientation::Inverted)
        .await
        .unwrap();
    assert_eq!(
        speaker.get_orientation().await.unwrap(),
        Orientation::Inverted
    );
    // Earlier standby change survives the orientation write
    assert_eq!(
        speaker.get_standby_time().await.unwrap(),
        StandbyTime::Never
    );
}

/// Power off and on settle via the polled power bit.
#[tokio::test]
async fn turn_off_and_on() {
    let speaker = mock_speaker().await;
    assert!(speaker.is_on().await.unwrap());

    speaker.turn_off().await.unwrap();
    assert!(!speaker.is_on().await.unwrap());

    speaker.turn_on().await.unwrap();
    assert!(speaker.is_on().await.unwrap());
}

/// Playback state reads and transport controls.
#[tokio::test]
async fn playback_controls() {
    let speaker = mock_speaker().await;
    assert_eq!(
        speaker.get_playback_state().await.unwrap(),
        PlaybackState::Stopped
    );

    speaker.play().await.unwrap();
    assert_eq!(
        speaker.get_playback_state().await.unwrap(),
        PlaybackState::Playing
    );

    speaker.pause().await.unwrap();
    assert_eq!(
        speaker.get_playback_state().await.unwrap(),
        PlaybackState::Paused
    );
}

/// EQ mode flags decode and write back with the SET bit applied.
#[tokio::test]
async fn eq_mode_roundtrip() {
    let speaker = mock_speaker().await;

    let mode = speaker.get_eq_mode().await.unwrap();
    assert!(mode.desk_mode);
    assert!(mode.phase_correction);
    assert!(!mode.wall_mode);
    assert_eq!(mode.sub_polarity, SubPolarity::Normal);

    let mut updated = mode;
    updated.desk_mode = false;
    updated.wall_mode = true;
    speaker.set_eq_mode(updated).await.unwrap();

    let mode = speaker.get_eq_mode().await.unwrap();
    assert!(!mode.desk_mode);
    assert!(mode.wall_mode);
}

/// Scaled EQ parameters decode to display values and encode back.
#[tokio::test]
async fn scaled_eq_parameters() {
    let speaker = mock_speaker().await;

    assert_eq!(speaker.get_desk_db().await.unwrap(), -3.0);
    assert_eq!(speaker.get_treble_db().await.unwrap(), 0.0);
    assert_eq!(speaker.get_high_pass_hz().await.unwrap(), 50.0);
    assert_eq!(speaker.get_sub_gain_db().await.unwrap(), 0.0);

    speaker.set_desk_db(-1.5).await.unwrap();
    assert_eq!(speaker.get_desk_db().await.unwrap(), -1.5);

    speaker.set_sub_out_hz(120.0).await.unwrap();
    assert_eq!(speaker.get_sub_out_hz().await.unwrap(), 120.0);
}

/// Balance is centered at 30 and masks the flag bit on read.
#[tokio::test]
async fn balance_roundtrip() {
    let speaker = mock_speaker().await;
    assert_eq!(speaker.get_balance().await.unwrap(), 30);

    speaker.set_balance(45).await.unwrap();
    assert_eq!(speaker.get_balance().await.unwrap(), 45);
}

/// Volume limit magnitude and enable flag round-trip.
#[tokio::test]
async fn volume_limit_roundtrip() {
    let speaker = mock_speaker().await;

    let limit = speaker.get_volume_limit().await.unwrap();
    assert_eq!(limit.limit, 100);
    assert!(!limit.enabled);

    speaker.set_volume_limit(80, true).await.unwrap();
    let limit = speaker.get_volume_limit().await.unwrap();
    assert_eq!(limit.limit, 80);
    assert!(limit.enabled);
}

/// LSX cable mode decodes its enumerant.
#[tokio::test]
async fn cable_mode() {
    let speaker = mock_speaker().await;
    assert_eq!(speaker.get_cable_mode().await.unwrap(), CableMode::Wired);
}

/// Device name is a NUL-terminated string command in both directions.
#[tokio::test]
async fn device_name_roundtrip() {
    let speaker = mock_speaker().await;
    assert_eq!(speaker.get_device_name().await.unwrap(), "Test Speaker");

    speaker.set_device_name("Living Room").await.unwrap();
    assert_eq!(speaker.get_device_name().await.unwrap(), "Living Room");
}

/// Closing the session is safe at any time; the next call reconnects.
#[tokio::test]
async fn close_and_reuse() {
    let speaker = mock_speaker().await;
    assert_eq!(speaker.get_volume().await.unwrap().volume, 50);

    speaker.close().await;
    speaker.close().await;

    assert_eq!(speaker.get_volume().await.unwrap().volume, 50);
}

/// Connect retries with exponential backoff, then reports the last cause.
#[tokio::test]
async fn connect_retries_with_backoff_then_fails() {
    // Bind and drop to get a port nothing is listening on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let connection = Connection::new(
        ConnectionConfig::new("127.0.0.1")
            .with_port(port)
            .with_max_retries(3)
            .with_retry_delay(Duration::from_millis(20))
            .with_timeout(Duration::from_millis(500)),
    );

    let started = Instant::now();
    let err = connection.connect().await.unwrap_err();
    assert!(matches!(err, KefError::Connection { .. }));
    // Two backoff waits (20 ms, 40 ms), none after the final attempt
    assert!(started.elapsed() >= Duration::from_millis(60));
    assert!(!connection.is_connected().await);
}

/// A reply that never arrives is a connection error, and the dead session
/// is dropped so the next call reconnects.
#[tokio::test]
async fn response_timeout_drops_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 16];
        let _ = stream.read(&mut buf).await;
        // Hold the socket open without answering
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let connection = Connection::new(
        ConnectionConfig::new("127.0.0.1")
            .with_port(port)
            .with_timeout(Duration::from_millis(100)),
    );

    let err = connection
        .send(&Request::get(Command::Volume))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("response timeout"));
    assert!(!connection.is_connected().await);
}

/// The peer closing mid-exchange is a connection error.
#[tokio::test]
async fn peer_close_is_a_connection_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 16];
        let _ = stream.read(&mut buf).await;
        // Close without replying
    });

    let connection = Connection::new(ConnectionConfig::new("127.0.0.1").with_port(port));
    let err = connection
        .send(&Request::get(Command::Volume))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("connection closed by speaker"));
}

/// Two concatenated reply frames in one read; the requested command wins.
#[tokio::test]
async fn concatenated_reply_frames() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 16];
        let _ = stream.read(&mut buf).await;
        let reply = [0x52, 0x30, 0x81, 0x02, 0x52, 0x25, 0x81, 0x32];
        let _ = stream.write_all(&reply).await;
    });

    let connection = Connection::new(ConnectionConfig::new("127.0.0.1").with_port(port));
    let frame = connection
        .send(&Request::get(Command::Volume))
        .await
        .unwrap();
    assert_eq!(frame.command(), 0x25);
    assert_eq!(frame.payload(), &[0x32]);
}

/// A SET answered with something other than the acknowledgement fails the
/// command.
#[tokio::test]
async fn unacknowledged_set_is_a_command_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 16];
        let _ = stream.read(&mut buf).await;
        let _ = stream.write_all(&[0x52, 0x31, 0x81, 0x84]).await;
    });

    let speaker = Speaker::with_config(ConnectionConfig::new("127.0.0.1").with_port(port));
    let err = speaker.play().await.unwrap_err();
    assert!(matches!(err, KefError::Command(_)));
}

/// The idle timer closes an unused session; the next exchange reconnects.
#[tokio::test]
async fn idle_timeout_closes_and_reconnects() {
    let port = spawn_mock().await;
    let connection = Connection::new(
        ConnectionConfig::new("127.0.0.1")
            .with_port(port)
            .with_keepalive(Duration::from_millis(200)),
    );

    connection.connect().await.unwrap();
    assert!(connection.is_connected().await);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(!connection.is_connected().await);

    let frame = connection
        .send(&Request::get(Command::Volume))
        .await
        .unwrap();
    assert_eq!(frame.value_byte().unwrap(), 0x32);
    assert!(connection.is_connected().await);
}

/// Every successful exchange re-arms the idle timer.
#[tokio::test]
async fn exchange_rearms_idle_timer() {
    let port = spawn_mock().await;
    let connection = Connection::new(
        ConnectionConfig::new("127.0.0.1")
            .with_port(port)
            .with_keepalive(Duration::from_millis(500)),
    );

    connection.connect().await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    connection
        .send(&Request::get(Command::Volume))
        .await
        .unwrap();

    // 600 ms after connect but only 300 ms after the exchange
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(connection.is_connected().await);

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert!(!connection.is_connected().await);
}

/// connect and disconnect are idempotent.
#[tokio::test]
async fn connect_and_disconnect_idempotent() {
    let port = spawn_mock().await;
    let connection = Connection::new(test_config(port));

    connection.connect().await.unwrap();
    connection.connect().await.unwrap();
    assert!(connection.is_connected().await);

    connection.disconnect().await;
    connection.disconnect().await;
    assert!(!connection.is_connected().await);
}

/// Concurrent callers queue on the session lock; every exchange completes.
#[tokio::test]
async fn concurrent_sends_are_serialized() {
    let port = spawn_mock().await;
    let connection = Arc::new(Connection::new(test_config(port)));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let connection = Arc::clone(&connection);
        handles.push(tokio::spawn(async move {
            connection
                .send(&Request::get(Command::Volume))
                .await
                .unwrap()
                .value_byte()
                .unwrap()
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), 0x32);
    }
}

/// The blocking facade runs each call to completion and disconnects after.
#[test]
fn blocking_speaker_smoke() {
    let server = tokio::runtime::Runtime::new().unwrap();
    let port = server.block_on(spawn_mock());

    let speaker = BlockingSpeaker::with_config(test_config(port)).unwrap();

    assert_eq!(speaker.get_volume().unwrap().volume, 50);
    speaker.set_volume(20).unwrap();
    assert_eq!(speaker.get_volume().unwrap().volume, 20);
    assert_eq!(speaker.get_device_name().unwrap(), "Test Speaker");
    assert_eq!(speaker.get_source().unwrap(), Source::Wifi);
}
