//! Parsing of generated transcripts
//!
//! Auto mode returns the whole conversation as newline-delimited
//! `Speaker: text` lines plus a parallel array of retrieved info.

use crate::chat_api::RetrievedInfo;
use crate::state_machine::Speaker;
use serde::{Deserialize, Serialize};

/// One parsed transcript line, ready to be revealed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub speaker: Speaker,
    pub text: String,
    pub retrieved_info: Option<RetrievedInfo>,
}

/// Split a single line on its first colon.
///
/// Lines without a colon, or with nothing before it, are attributed to
/// `System` with the whole trimmed line as text.
pub fn parse_line(line: &str) -> (Speaker, String) {
    let line = line.trim();
    match line.split_once(':') {
        Some((speaker, text)) if !speaker.trim().is_empty() => {
            (Speaker::from_label(speaker.trim()), text.trim().to_string())
        }
        _ => (Speaker::System, line.to_string()),
    }
}

/// Parse a transcript, pairing surviving line `i` with `retrieved_info[i]`
pub fn parse_transcript(
    transcript: &str,
    retrieved_info: &[Option<RetrievedInfo>],
) -> Vec<TranscriptLine> {
    transcript
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(i, line)| {
            let (speaker, text) = parse_line(line);
            TranscriptLine {
                speaker,
                text,
                retrieved_info: retrieved_info.get(i).cloned().flatten(),
            }
        })
        .collect()
}
