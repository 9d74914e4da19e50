//! Turn pipeline integration tests
//!
//! Drives complete turns against scripted gateways and a recording player.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tutor_voice::voice::{AudioInput, Release, TalkSession};
use tutor_voice::{ConversationTurn, Error, SynthesizedAudio, TurnPipeline, TurnState};

mod common;
use common::{FakeInput, RecordingPlayer, ScriptedGateways, test_clip};

const HOLD: Duration = Duration::from_millis(500);

fn session(
    gateways: &Arc<ScriptedGateways>,
    input: FakeInput,
    player: &RecordingPlayer,
) -> TalkSession<FakeInput> {
    let pipeline = TurnPipeline::new(gateways.gateways(), Box::new(player.clone()));
    TalkSession::new(input.controller(), pipeline, HOLD)
}

fn drain(events: &mut broadcast::Receiver<TurnState>) -> Vec<TurnState> {
    let mut seen = Vec::new();
    while let Ok(state) = events.try_recv() {
        seen.push(state);
    }
    seen
}

#[tokio::test]
async fn test_successful_turn_commits_exchange() {
    let gateways = ScriptedGateways::new();
    gateways.push_transcript(Ok("I go school yesterday".to_string()));
    gateways.push_feedback(Ok(
        "You went to school yesterday! Great try! What did you learn?".to_string(),
    ));
    let player = RecordingPlayer::default();
    let mut pipeline = TurnPipeline::new(gateways.gateways(), Box::new(player.clone()));

    assert!(pipeline.begin_capture());
    let outcome = pipeline.complete_turn(test_clip()).await.unwrap();

    assert_eq!(outcome.transcript, "I go school yesterday");
    assert!(outcome.feedback.contains("went"));
    assert_eq!(outcome.audio_bytes, 4);

    let turns = pipeline.history().turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0], ConversationTurn::user("I go school yesterday"));
    assert_eq!(
        turns[1],
        ConversationTurn::assistant("You went to school yesterday! Great try! What did you learn?")
    );
    assert_eq!(player.started(), 1);
    assert_eq!(pipeline.state(), &TurnState::Idle);
}

#[tokio::test]
async fn test_states_follow_turn_order() {
    let gateways = ScriptedGateways::new();
    let mut pipeline =
        TurnPipeline::new(gateways.gateways(), Box::new(RecordingPlayer::default()));
    let mut events = pipeline.subscribe();

    pipeline.begin_capture();
    pipeline.complete_turn(test_clip()).await.unwrap();

    assert_eq!(
        drain(&mut events),
        vec![
            TurnState::Capturing,
            TurnState::Transcribing,
            TurnState::GeneratingFeedback,
            TurnState::Synthesizing,
            TurnState::Playing,
            TurnState::Idle,
        ]
    );
}

#[tokio::test]
async fn test_transcription_failure_stops_turn() {
    let gateways = ScriptedGateways::new();
    gateways.push_transcript(Err(Error::Transcription(
        "Whisper API error 500 Internal Server Error".to_string(),
    )));
    let player = RecordingPlayer::default();
    let mut pipeline = TurnPipeline::new(gateways.gateways(), Box::new(player.clone()));

    pipeline.begin_capture();
    let mut events = pipeline.subscribe();
    let err = pipeline.complete_turn(test_clip()).await.unwrap_err();

    assert!(matches!(err, Error::Transcription(_)));
    assert_eq!(gateways.calls(), (1, 0, 0));
    assert!(pipeline.history().is_empty());
    assert_eq!(player.started(), 0);

    let seen = drain(&mut events);
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0], TurnState::Transcribing);
    assert!(matches!(&seen[1], TurnState::Errored { message } if message.contains("500")));
    assert_eq!(seen[2], TurnState::Idle);
}

#[tokio::test]
async fn test_blank_transcript_is_an_error() {
    let gateways = ScriptedGateways::new();
    gateways.push_transcript(Ok("   ".to_string()));
    let mut pipeline =
        TurnPipeline::new(gateways.gateways(), Box::new(RecordingPlayer::default()));

    pipeline.begin_capture();
    let err = pipeline.complete_turn(test_clip()).await.unwrap_err();

    assert!(matches!(err, Error::Transcription(_)));
    assert_eq!(gateways.calls(), (1, 0, 0));
    assert!(pipeline.history().is_empty());
}

#[tokio::test]
async fn test_feedback_failure_leaves_history_unchanged() {
    let gateways = ScriptedGateways::new();
    let mut pipeline =
        TurnPipeline::new(gateways.gateways(), Box::new(RecordingPlayer::default()));

    pipeline.begin_capture();
    pipeline.complete_turn(test_clip()).await.unwrap();
    let before = pipeline.history().clone();

    gateways.push_feedback(Err(Error::Feedback("OpenAI API error 429".to_string())));
    pipeline.begin_capture();
    let err = pipeline.complete_turn(test_clip()).await.unwrap_err();

    assert!(matches!(err, Error::Feedback(_)));
    assert_eq!(pipeline.history(), &before);
    assert_eq!(gateways.calls(), (2, 2, 1));
    assert!(pipeline.state().is_idle());
}

#[tokio::test]
async fn test_synthesis_failure_leaves_history_unchanged() {
    let gateways = ScriptedGateways::new();
    gateways.push_audio(Err(Error::Config(
        "ElevenLabs Voice ID not configured".to_string(),
    )));
    let player = RecordingPlayer::default();
    let mut pipeline = TurnPipeline::new(gateways.gateways(), Box::new(player.clone()));

    pipeline.begin_capture();
    let err = pipeline.complete_turn(test_clip()).await.unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert!(pipeline.history().is_empty());
    assert_eq!(player.started(), 0);
}

#[tokio::test]
async fn test_empty_audio_is_a_synthesis_error() {
    let gateways = ScriptedGateways::new();
    gateways.push_audio(Ok(SynthesizedAudio::mpeg(Vec::new())));
    let mut pipeline =
        TurnPipeline::new(gateways.gateways(), Box::new(RecordingPlayer::default()));

    pipeline.begin_capture();
    let err = pipeline.complete_turn(test_clip()).await.unwrap_err();

    assert!(matches!(err, Error::Synthesis(_)));
    assert!(pipeline.history().is_empty());
}

#[tokio::test]
async fn test_second_turn_sees_prior_history() {
    let gateways = ScriptedGateways::new();
    gateways.push_transcript(Ok("I like cat".to_string()));
    gateways.push_feedback(Ok("You like cats! What is your cat's name?".to_string()));
    gateways.push_transcript(Ok("His name Tom".to_string()));
    let mut pipeline =
        TurnPipeline::new(gateways.gateways(), Box::new(RecordingPlayer::default()));

    for _ in 0..2 {
        assert!(pipeline.begin_capture());
        pipeline.complete_turn(test_clip()).await.unwrap();
    }

    let seen = gateways.seen_histories.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].is_empty());
    assert_eq!(
        seen[1],
        vec![
            ConversationTurn::user("I like cat"),
            ConversationTurn::assistant("You like cats! What is your cat's name?"),
        ]
    );
    assert_eq!(pipeline.history().len(), 4);
    assert_eq!(pipeline.history().turns()[2].text(), "His name Tom");
}

#[tokio::test]
async fn test_playback_failure_keeps_committed_exchange() {
    let gateways = ScriptedGateways::new();
    let mut pipeline =
        TurnPipeline::new(gateways.gateways(), Box::new(RecordingPlayer::failing()));

    pipeline.begin_capture();
    let mut events = pipeline.subscribe();
    let err = pipeline.complete_turn(test_clip()).await.unwrap_err();

    assert!(matches!(err, Error::Audio(_)));
    assert_eq!(pipeline.history().len(), 2);

    let seen = drain(&mut events);
    assert_eq!(seen[seen.len() - 3], TurnState::Playing);
    assert!(matches!(seen[seen.len() - 2], TurnState::Errored { .. }));
    assert_eq!(seen[seen.len() - 1], TurnState::Idle);
}

#[tokio::test]
async fn test_capture_ignored_unless_idle() {
    let gateways = ScriptedGateways::new();
    let mut pipeline =
        TurnPipeline::new(gateways.gateways(), Box::new(RecordingPlayer::default()));

    assert!(pipeline.begin_capture());
    assert!(!pipeline.begin_capture());
    assert_eq!(pipeline.state(), &TurnState::Capturing);

    pipeline.cancel_capture();
    assert!(pipeline.state().is_idle());
    assert!(pipeline.begin_capture());
}

#[tokio::test]
async fn test_complete_without_capture_is_invalid() {
    let gateways = ScriptedGateways::new();
    let mut pipeline =
        TurnPipeline::new(gateways.gateways(), Box::new(RecordingPlayer::default()));

    let err = pipeline.complete_turn(test_clip()).await.unwrap_err();

    assert!(matches!(err, Error::InvalidState(_)));
    assert_eq!(gateways.calls(), (0, 0, 0));
    assert!(pipeline.state().is_idle());
}

#[tokio::test]
async fn test_tap_makes_no_clip_and_no_gateway_calls() {
    let gateways = ScriptedGateways::new();
    let mic = FakeInput::with_samples(vec![0.2; 1600]);
    let player = RecordingPlayer::default();
    let mut talk = session(&gateways, mic.clone(), &player);
    let t0 = Instant::now();

    assert_eq!(talk.press(t0), Some(t0 + HOLD));
    assert!(!talk.poll(t0 + Duration::from_millis(200)).unwrap());
    assert_eq!(talk.release().await.unwrap(), Release::Cancelled);

    assert_eq!(gateways.calls(), (0, 0, 0));
    assert_eq!(mic.starts(), 0);
    assert_eq!(player.started(), 0);
    assert!(talk.pipeline().history().is_empty());
    assert!(talk.pipeline().state().is_idle());
    assert!(!talk.is_holding());
}

#[tokio::test]
async fn test_release_before_deadline_handled_is_a_tap() {
    let gateways = ScriptedGateways::new();
    let mic = FakeInput::with_samples(vec![0.2; 1600]);
    let mut talk = session(&gateways, mic.clone(), &RecordingPlayer::default());
    let t0 = Instant::now();

    // The release arrives after the deadline passed but before it was polled
    talk.press(t0);
    assert_eq!(talk.release().await.unwrap(), Release::Cancelled);
    assert!(!talk.poll(t0 + HOLD * 2).unwrap());

    assert_eq!(mic.starts(), 0);
    assert_eq!(gateways.calls(), (0, 0, 0));
    assert!(talk.pipeline().state().is_idle());
}

#[tokio::test]
async fn test_hold_runs_one_turn() {
    let gateways = ScriptedGateways::new();
    gateways.push_transcript(Ok("I have two dog".to_string()));
    let mic = FakeInput::with_samples(vec![0.2; 1600]);
    let player = RecordingPlayer::default();
    let mut talk = session(&gateways, mic.clone(), &player);
    let t0 = Instant::now();

    talk.press(t0);
    assert!(talk.poll(t0 + HOLD).unwrap());
    assert!(mic.is_capturing());
    assert_eq!(talk.pipeline().state(), &TurnState::Capturing);
    assert_eq!(talk.press(t0 + Duration::from_secs(1)), None);

    let Release::Completed(outcome) = talk.release().await.unwrap() else {
        panic!("expected a completed turn");
    };

    assert_eq!(outcome.transcript, "I have two dog");
    assert_eq!(gateways.calls(), (1, 1, 1));
    assert_eq!(mic.starts(), 1);
    assert!(!mic.is_capturing());
    assert_eq!(player.started(), 1);
    assert_eq!(talk.pipeline().history().len(), 2);
    assert!(talk.pipeline().state().is_idle());
}

#[tokio::test]
async fn test_empty_hold_reaches_no_gateway() {
    let gateways = ScriptedGateways::new();
    let mut talk = session(&gateways, FakeInput::default(), &RecordingPlayer::default());
    let t0 = Instant::now();

    talk.press(t0);
    assert!(talk.poll(t0 + HOLD).unwrap());
    let err = talk.release().await.unwrap_err();

    assert!(matches!(err, Error::InputMissing(_)));
    assert_eq!(gateways.calls(), (0, 0, 0));
    assert!(talk.pipeline().state().is_idle());
}

#[tokio::test]
async fn test_denied_microphone_returns_to_idle() {
    let gateways = ScriptedGateways::new();
    let mut talk = session(&gateways, FakeInput::denied(), &RecordingPlayer::default());
    let t0 = Instant::now();

    talk.press(t0);
    let err = talk.poll(t0 + HOLD).unwrap_err();

    assert!(matches!(err, Error::MicrophoneUnavailable(_)));
    assert!(!talk.is_holding());
    assert!(talk.pipeline().state().is_idle());
    let later = t0 + Duration::from_secs(1);
    assert_eq!(talk.press(later), Some(later + HOLD));
}

#[tokio::test]
async fn test_presses_during_turn_are_dropped() {
    let gateways = ScriptedGateways::new();
    let mic = FakeInput::with_samples(vec![0.2; 1600]);
    let mut talk = session(&gateways, mic.clone(), &RecordingPlayer::default());
    let t0 = Instant::now();

    // Two Enters typed while the tutor is thinking
    let mut input = BufReader::new(&b"\n\n"[..]).lines();

    talk.press(t0);
    assert!(talk.poll(t0 + HOLD).unwrap());
    let release = talk.release_discarding_input(&mut input).await.unwrap();

    assert!(matches!(release, Release::Completed(_)));
    assert_eq!(input.next_line().await.unwrap(), None);
    assert_eq!(gateways.calls(), (1, 1, 1));
    assert_eq!(mic.starts(), 1);
    assert!(!talk.is_holding());
    assert!(talk.pipeline().state().is_idle());
}
