//! Speakable renderings of assistant replies
//!
//! Synthesis itself belongs to the host (a browser voice, an OS engine). This
//! module only decides *what* gets spoken and which voice the host should
//! prefer.

use serde::{Deserialize, Serialize};

/// Voice preferences handed to the host speech engine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    /// Speaking rate (1.0 = normal)
    pub rate: f32,

    /// Pitch (1.0 = normal)
    pub pitch: f32,

    /// BCP-47 tag of the preferred voice language
    pub preferred_lang: String,
}

impl Default for VoiceProfile {
    fn default() -> Self {
        Self {
            rate: 0.9,
            pitch: 1.0,
            preferred_lang: "en-IN".to_string(),
        }
    }
}

impl VoiceProfile {
    /// Whether a host voice is acceptable for this profile.
    ///
    /// Accepts the preferred language, a voice named "indian", or any
    /// English voice named "male".
    pub fn matches(&self, voice_name: &str, voice_lang: &str) -> bool {
        let name = voice_name.to_lowercase();
        voice_lang.contains(&self.preferred_lang)
            || name.contains("indian")
            || (name.contains("male") && voice_lang.contains("en"))
    }

    /// Pick the first acceptable voice from `(name, lang)` pairs
    pub fn choose<'a, I>(&self, voices: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        voices
            .into_iter()
            .find(|(name, lang)| self.matches(name, lang))
            .map(|(name, _)| name)
    }
}

/// Text ready to be spoken, plus the voice to speak it with
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub text: String,
    pub voice: VoiceProfile,
}

impl Utterance {
    /// Build an utterance from reply text; `None` if nothing speakable remains
    pub fn from_reply(reply: &str) -> Option<Self> {
        let text = normalize_text_for_speech(reply);
        if text.is_empty() {
            return None;
        }
        Some(Self {
            text,
            voice: VoiceProfile::default(),
        })
    }
}

/// Normalize reply text for a speech engine
pub fn normalize_text_for_speech(text: &str) -> String {
    let mut result = text.to_string();

    let abbreviations = [
        ("e.g.", "for example"),
        ("i.e.", "that is"),
        ("etc.", "etcetera"),
        ("vs.", "versus"),
        ("approx.", "approximately"),
        ("Dr.", "Doctor"),
        ("Mr.", "Mister"),
        ("Ms.", "Miss"),
    ];

    for (abbrev, expansion) in abbreviations {
        result = result.replace(abbrev, expansion);
    }

    result = result.replace('&', " and ");
    result = result.replace('%', " percent");
    result = result.replace('+', " plus ");
    result = result.replace('@', " at ");

    // Markdown emphasis and code fences read badly aloud.
    result = result
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || ".,!?;:'-\"()/".contains(*c))
        .collect();

    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_symbols_and_markdown() {
        let text = normalize_text_for_speech("**AI** & ML are 100% `fun`!");
        assert_eq!(text, "AI and ML are 100 percent fun!");
    }

    #[test]
    fn test_normalize_abbreviations() {
        let text = normalize_text_for_speech("Tools, e.g. Deepseek, etc.");
        assert_eq!(text, "Tools, for example Deepseek, etcetera");
    }

    #[test]
    fn test_normalize_drops_emoji() {
        assert_eq!(normalize_text_for_speech("Namaste 🙏  friend 🤖"), "Namaste friend");
    }

    #[test]
    fn test_utterance_from_reply() {
        let utterance = Utterance::from_reply("Hi there!").unwrap();
        assert_eq!(utterance.text, "Hi there!");
        assert_eq!(utterance.voice.rate, 0.9);
        assert!(Utterance::from_reply("🤖 ``` ").is_none());
    }

    #[test]
    fn test_voice_selection() {
        let profile = VoiceProfile::default();
        let voices = [
            ("Samantha", "en-US"),
            ("Google Daniel Male", "en-GB"),
            ("Rishi", "en-IN"),
        ];

        assert!(profile.matches("Rishi", "en-IN"));
        assert!(profile.matches("Indian English", "hi-IN"));
        assert!(!profile.matches("Samantha", "en-US"));
        assert_eq!(profile.choose(voices), Some("Google Daniel Male"));
        assert_eq!(profile.choose([("Amelie", "fr-FR")]), None);
    }
}
