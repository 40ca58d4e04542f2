use dj_master::audio::{read_audio_file, write_wav_file};
use dj_master::mastering::CEILING;
use dj_master::render::{Composition, CompositionSource};
use dj_master::{AudioBuffer, Error, MasteringStyle, Pipeline, PipelineConfig};

const TRACK: &str = r#"{
    "title": "Pipeline Test",
    "genre": "techno",
    "variation": 0.5,
    "instructions": [
        { "instrument": "kick", "start_seconds": 0.0 },
        { "instrument": "kick", "start_seconds": 0.5 },
        { "instrument": "kick", "start_seconds": 1.0 },
        { "instrument": "kick", "start_seconds": 1.5 },
        { "instrument": "hihat", "start_seconds": 0.25, "pan": -0.4 },
        { "instrument": "open-hihat", "start_seconds": 0.75, "pan": 0.4 },
        { "instrument": "clap", "start_seconds": 0.5 },
        { "instrument": "clap", "start_seconds": 1.5 },
        { "instrument": "sub-bass", "note": "A1", "start_seconds": 0.0, "duration_seconds": 2.0 },
        { "instrument": "synth", "note": "A4", "start_seconds": 0.0, "duration_seconds": 1.0, "pan": 0.3 },
        { "instrument": "piano", "note": "E4", "start_seconds": 1.0, "duration_seconds": 1.0, "pan": -0.3 }
    ]
}"#;

fn config() -> PipelineConfig {
    PipelineConfig {
        sample_rate: 22_050,
        max_regeneration_attempts: 2,
        ..PipelineConfig::default()
    }
}

#[test]
fn produce_renders_masters_and_reports() {
    let composition = Composition::from_json(TRACK).unwrap();
    let genre = composition.genre;
    let source = CompositionSource::new(composition, 22_050);
    let production = Pipeline::new(config()).produce(&source, genre).unwrap();

    assert_eq!(production.style, MasteringStyle::Bright);
    assert_eq!(production.buffer.channels, 2);
    assert_eq!(production.buffer.sample_rate, 22_050);
    assert!(!production.attempts.is_empty() && production.attempts.len() <= 2);
    assert!(production.best_attempt.is_some());

    let peak = production.buffer.samples.iter().flatten().fold(0.0_f32, |m, s| m.max(s.abs()));
    assert!(peak <= CEILING + 1e-6);

    let report = production.report.as_ref().unwrap();
    assert!((0.0..=100.0).contains(&report.overall_score));
    assert_eq!(report.duration_seconds, production.buffer.duration_secs());

    let json = serde_json::to_string(&production).unwrap();
    assert!(json.contains("\"attempts\""));
}

#[test]
fn disabling_quality_control_skips_regeneration_and_report() {
    let composition = Composition::from_json(TRACK).unwrap();
    let genre = composition.genre;
    let source = CompositionSource::new(composition, 22_050);
    let production = Pipeline::new(PipelineConfig {
        quality_control: false,
        humanize: false,
        ..config()
    })
    .produce(&source, genre)
    .unwrap();

    assert!(production.report.is_none());
    assert!(production.attempts.is_empty());
    assert!(production.best_attempt.is_none());
    assert!(production.fixes.is_empty());
}

#[test]
fn unmastered_output_is_still_clipped_for_export() {
    let hot = AudioBuffer::from_mono((0..22_050).map(|i| 1.5 * (i as f32 * 0.05).sin()).collect(), 22_050);
    let pipeline = Pipeline::new(PipelineConfig {
        master: false,
        ..config()
    });
    let (output, report) = pipeline.master_only(&hot, MasteringStyle::Balanced).unwrap();
    assert!(output.samples[0].iter().all(|s| s.abs() <= 1.0));
    assert!(report.is_some());
}

#[test]
fn empty_input_is_rejected() {
    let pipeline = Pipeline::new(config());
    assert!(matches!(
        pipeline.master_only(&AudioBuffer::new(2, 22_050), MasteringStyle::Warm),
        Err(Error::EmptyBuffer)
    ));
}

#[test]
fn mastered_wav_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("input.wav");
    let output_path = dir.path().join("mastered.wav");

    let left: Vec<f32> = (0..44_100).map(|i| 0.3 * (i as f32 * 0.03).sin()).collect();
    let right: Vec<f32> = (0..44_100).map(|i| 0.3 * (i as f32 * 0.045).sin()).collect();
    write_wav_file(&AudioBuffer::from_stereo(left, right, 44_100), &input_path, 24).unwrap();

    let input = read_audio_file(&input_path).unwrap();
    let pipeline = Pipeline::new(PipelineConfig::default());
    let (mastered, _) = pipeline.master_only(&input, MasteringStyle::Balanced).unwrap();
    write_wav_file(&mastered, &output_path, 24).unwrap();

    let decoded = read_audio_file(&output_path).unwrap();
    assert_eq!(decoded.channels, 2);
    assert_eq!(decoded.frame_count(), 44_100);
    for (a, b) in decoded.samples[0].iter().zip(&mastered.samples[0]) {
        assert!((a - b).abs() < 1e-5);
    }
}
