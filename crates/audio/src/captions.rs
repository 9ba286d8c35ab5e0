//! Caption segmentation and SRT/VTT output.

use std::path::Path;

use demoreel_common::error::{DemoreelError, DemoreelResult};
use demoreel_script_model::{CaptionCue, Script, TimingMetadata};

/// Words per caption cue.
pub const DEFAULT_WORDS_PER_CUE: usize = 12;

/// Split narration into cues using [`DEFAULT_WORDS_PER_CUE`].
pub fn segment(script: &Script, timing: &TimingMetadata) -> Vec<CaptionCue> {
    segment_with(script, timing, DEFAULT_WORDS_PER_CUE)
}

/// Split every narrated section window into equal slices of at most
/// `words_per_cue` words each.
///
/// Cue indices run from 1 across the whole script. Slice boundaries are
/// `start + span * i / n`, so slices tile the window exactly. Windows are
/// paired with the script section at the same position when the ids agree,
/// so repeated ids keep their own narration; otherwise by id.
pub fn segment_with(
    script: &Script,
    timing: &TimingMetadata,
    words_per_cue: usize,
) -> Vec<CaptionCue> {
    let words_per_cue = words_per_cue.max(1);
    let mut cues = Vec::new();

    for (position, window) in timing.sections().iter().enumerate() {
        if window.narration.trim().is_empty() {
            continue;
        }
        let section = script
            .sections
            .get(position)
            .filter(|s| s.id == window.id)
            .or_else(|| script.section(&window.id));
        let Some(section) = section else {
            tracing::debug!(section = %window.id, "No script section for timing window");
            continue;
        };

        let words: Vec<&str> = section.narration.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }
        let chunks: Vec<&[&str]> = words.chunks(words_per_cue).collect();
        let n = chunks.len() as u64;
        let span = window.duration_ms();

        for (i, chunk) in chunks.iter().enumerate() {
            let i = i as u64;
            cues.push(CaptionCue {
                index: cues.len() + 1,
                start_time_ms: window.start_time_ms + span * i / n,
                end_time_ms: window.start_time_ms + span * (i + 1) / n,
                text: chunk.join(" "),
            });
        }
    }

    cues
}

/// SRT document for `cues`.
pub fn generate_srt(cues: &[CaptionCue]) -> String {
    let mut output = String::new();

    for cue in cues {
        output.push_str(&format!("{}\n", cue.index));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(cue.start_time_ms),
            format_srt_time(cue.end_time_ms),
        ));
        output.push_str(&cue.text);
        output.push_str("\n\n");
    }

    output
}

/// WebVTT document for `cues`.
pub fn generate_vtt(cues: &[CaptionCue]) -> String {
    let mut output = String::from("WEBVTT\n\n");

    for cue in cues {
        output.push_str(&format!(
            "{} --> {}\n",
            format_vtt_time(cue.start_time_ms),
            format_vtt_time(cue.end_time_ms),
        ));
        output.push_str(&cue.text);
        output.push_str("\n\n");
    }

    output
}

/// `HH:MM:SS,mmm`
pub fn format_srt_time(ms: u64) -> String {
    let (h, m, s, millis) = split_ms(ms);
    format!("{h:02}:{m:02}:{s:02},{millis:03}")
}

/// `HH:MM:SS.mmm`
pub fn format_vtt_time(ms: u64) -> String {
    let (h, m, s, millis) = split_ms(ms);
    format!("{h:02}:{m:02}:{s:02}.{millis:03}")
}

fn split_ms(total_ms: u64) -> (u64, u64, u64, u64) {
    (
        total_ms / 3_600_000,
        (total_ms % 3_600_000) / 60_000,
        (total_ms % 60_000) / 1000,
        total_ms % 1000,
    )
}

/// Write cues to `path`; `.vtt` selects WebVTT, anything else SRT.
pub fn save_captions(cues: &[CaptionCue], path: &Path) -> DemoreelResult<()> {
    let content = match path.extension().and_then(|e| e.to_str()) {
        Some("vtt") => generate_vtt(cues),
        _ => generate_srt(cues),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content).map_err(|e| {
        DemoreelError::caption(format!("Failed to write {}: {e}", path.display()))
    })?;
    tracing::info!(path = %path.display(), cues = cues.len(), "Captions written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use demoreel_script_model::{Section, TimingBuilder};
    use proptest::prelude::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    fn fixture(narrations: &[(&str, &str, u64)]) -> (Script, TimingMetadata) {
        let mut builder = TimingBuilder::new();
        let mut sections = Vec::new();
        for (id, text, end) in narrations {
            builder.push(*id, *end, *text).unwrap();
            sections.push(Section::new(*id, *text, 0.0));
        }
        let script = Script {
            title: None,
            start_url: None,
            sections,
        };
        (script, builder.finish())
    }

    #[test]
    fn test_single_short_section_is_one_cue() {
        let (script, timing) = fixture(&[("s1", "Hello world this is a test", 5000)]);
        let cues = segment(&script, &timing);
        assert_eq!(
            cues,
            vec![CaptionCue {
                index: 1,
                start_time_ms: 0,
                end_time_ms: 5000,
                text: "Hello world this is a test".to_string(),
            }]
        );
        assert!(generate_srt(&cues).contains("1\n00:00:00,000 --> 00:00:05,000\nHello world"));
    }

    #[test]
    fn test_indices_continue_across_sections() {
        let text = words(25);
        let (script, timing) = fixture(&[
            ("a", text.as_str(), 9000),
            ("quiet", "", 10_000),
            ("b", "Bye now", 12_000),
        ]);
        let cues = segment(&script, &timing);

        let indices: Vec<usize> = cues.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
        assert_eq!(
            cues.iter().map(|c| (c.start_time_ms, c.end_time_ms)).collect::<Vec<_>>(),
            vec![(0, 3000), (3000, 6000), (6000, 9000), (10_000, 12_000)]
        );
        assert_eq!(cues[2].text, "w24");
    }

    #[test]
    fn test_window_without_script_section_is_skipped() {
        let (mut script, timing) = fixture(&[("a", "One two", 1000)]);
        script.sections.clear();
        assert!(segment(&script, &timing).is_empty());
    }

    #[test]
    fn test_repeated_section_ids_keep_their_own_narration() {
        let (script, timing) = fixture(&[
            ("step", "Open the menu", 2000),
            ("step", "Pick a plan", 4000),
        ]);
        let cues = segment(&script, &timing);
        let texts: Vec<(&str, u64)> = cues
            .iter()
            .map(|c| (c.text.as_str(), c.start_time_ms))
            .collect();
        assert_eq!(texts, vec![("Open the menu", 0), ("Pick a plan", 2000)]);
    }

    #[test]
    fn test_custom_chunk_size() {
        let (script, timing) = fixture(&[("a", "one two three four five", 1000)]);
        let cues = segment_with(&script, &timing, 2);
        assert_eq!(cues.len(), 3);
        assert_eq!(cues[2].text, "five");
        assert_eq!((cues[1].start_time_ms, cues[1].end_time_ms), (333, 666));
    }

    #[test]
    fn test_time_formatting() {
        assert_eq!(format_srt_time(0), "00:00:00,000");
        assert_eq!(format_srt_time(3_661_500), "01:01:01,500");
        assert_eq!(format_vtt_time(3_661_500), "01:01:01.500");
    }

    #[test]
    fn test_vtt_generation() {
        let cues = vec![CaptionCue {
            index: 1,
            start_time_ms: 61_500,
            end_time_ms: 63_000,
            text: "One minute in".to_string(),
        }];
        let vtt = generate_vtt(&cues);
        assert!(vtt.starts_with("WEBVTT\n"));
        assert!(vtt.contains("00:01:01.500 --> 00:01:03.000"));
    }

    #[test]
    fn test_save_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let (script, timing) = fixture(&[("a", "Hello there", 2000)]);
        let cues = segment(&script, &timing);

        let srt = dir.path().join("captions.srt");
        let vtt = dir.path().join("nested/captions.vtt");
        save_captions(&cues, &srt).unwrap();
        save_captions(&cues, &vtt).unwrap();

        assert!(std::fs::read_to_string(srt).unwrap().starts_with("1\n"));
        assert!(std::fs::read_to_string(vtt).unwrap().starts_with("WEBVTT"));
    }

    proptest! {
        #[test]
        fn prop_cues_tile_each_window(
            word_count in 1usize..80,
            start in 0u64..60_000,
            span in 0u64..30_000,
        ) {
            let text = words(word_count);
            let (script, timing) =
                fixture(&[("pad", "", start), ("s", text.as_str(), start + span)]);
            let cues = segment(&script, &timing);

            prop_assert_eq!(cues.len(), word_count.div_ceil(DEFAULT_WORDS_PER_CUE));
            prop_assert_eq!(cues[0].start_time_ms, start);
            prop_assert_eq!(cues[cues.len() - 1].end_time_ms, start + span);
            for pair in cues.windows(2) {
                prop_assert_eq!(pair[0].end_time_ms, pair[1].start_time_ms);
                prop_assert_eq!(pair[0].index + 1, pair[1].index);
            }
            let lengths: Vec<u64> = cues.iter().map(|c| c.end_time_ms - c.start_time_ms).collect();
            let (min, max) = (lengths.iter().min().unwrap(), lengths.iter().max().unwrap());
            prop_assert!(max - min <= 1);
        }
    }
}
