//! Synthèse vocale via le service "translate_tts" de Google Translate
//!
//! Le service n'accepte que des textes courts : le texte est découpé en
//! morceaux d'au plus [`MAX_CHUNK_CHARS`] caractères aux frontières de mots,
//! et les MP3 obtenus sont concaténés.

use std::time::Duration;

use heraldcore::Voice;
use tracing::{debug, warn};
use ureq::Agent;

use crate::error::{Result, VoiceError};

pub const MAX_CHUNK_CHARS: usize = 100;

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:67.0) Gecko/20100101 Firefox/67.0";

pub struct GoogleTts {
    agent: Agent,
}

impl std::fmt::Debug for GoogleTts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleTts").finish()
    }
}

impl Default for GoogleTts {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleTts {
    pub fn new() -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(HTTP_TIMEOUT))
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }

    /// Speaks `text` with `voice` and returns the MP3 bytes.
    pub fn synthesize(&self, text: &str, voice: &Voice) -> Result<Vec<u8>> {
        let chunks = split_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(VoiceError::EmptyText);
        }

        let url = endpoint(&voice.tld);
        let total = chunks.len().to_string();
        let mut audio = Vec::new();

        for (index, chunk) in chunks.iter().enumerate() {
            debug!(lang = %voice.language, tld = %voice.tld, index, "GET {}", url);

            let idx = index.to_string();
            let textlen = chunk.chars().count().to_string();
            let mut response = self
                .agent
                .get(&url)
                .header("User-Agent", USER_AGENT)
                .query_pairs([
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", voice.language.as_str()),
                    ("q", chunk.as_str()),
                    ("total", total.as_str()),
                    ("idx", idx.as_str()),
                    ("textlen", textlen.as_str()),
                ])
                .call()?;

            let status = response.status();
            if !status.is_success() {
                let message = response.body_mut().read_to_string().unwrap_or_default();
                warn!("Speech service error ({}): {}", status.as_u16(), message);
                return Err(VoiceError::Synthesis {
                    code: status.as_u16(),
                    message: format!("{} for language '{}'", status, voice.language),
                });
            }

            audio.extend(response.body_mut().read_to_vec()?);
        }

        debug!(bytes = audio.len(), chunks = chunks.len(), "Speech synthesized");
        Ok(audio)
    }
}

/// URL of the speech endpoint for a regional Google domain.
pub fn endpoint(tld: &str) -> String {
    format!("https://translate.google.{}/translate_tts", tld)
}

/// Splits `text` into pieces of at most `max_chars` characters, cutting at
/// whitespace. A single word longer than the limit is cut inside the word.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if current_len > 0 && current_len + 1 + word_len > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if word_len > max_chars {
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                if piece.len() == max_chars {
                    chunks.push(piece.iter().collect());
                } else {
                    current = piece.iter().collect();
                    current_len = piece.len();
                }
            }
            continue;
        }

        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if current_len > 0 {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_follows_tld() {
        assert_eq!(
            endpoint("co.uk"),
            "https://translate.google.co.uk/translate_tts"
        );
        assert_eq!(endpoint("fr"), "https://translate.google.fr/translate_tts");
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(
            split_text("  Joni Mitchell. River. ", MAX_CHUNK_CHARS),
            vec!["Joni Mitchell. River."]
        );
        assert!(split_text("   ", MAX_CHUNK_CHARS).is_empty());
    }

    #[test]
    fn test_long_text_splits_on_words() {
        let text = "one two three four five six";
        assert_eq!(
            split_text(text, 9),
            vec!["one two", "three", "four five", "six"]
        );
        for chunk in split_text(&"word ".repeat(60), MAX_CHUNK_CHARS) {
            assert!(chunk.chars().count() <= MAX_CHUNK_CHARS);
        }
    }

    #[test]
    fn test_overlong_word_is_cut() {
        assert_eq!(split_text("abcdefgh ij", 3), vec!["abc", "def", "gh", "ij"]);
        assert_eq!(split_text("abcdefg", 3), vec!["abc", "def", "g"]);
    }
}
