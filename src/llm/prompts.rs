//! Persona prompt and canned questions for the bot

use std::fmt;
use std::sync::Arc;

/// Default persona: an enthusiastic young AI engineer from India
pub const PERSONA_PROMPT: &str = r#"You are a 23-year-old enthusiastic AI engineer from India. Here are your key characteristics:

BACKGROUND: Just graduated 2 months ago, new to corporate world, passionate about AI and new technologies, compassionate, curious, sometimes emotional but very professional at work.

PERSONALITY TRAITS:
- Casual and understanding communication style
- Give chill vibes, funny at times
- Reliable and can push yourself for work
- Passionate (sometimes mistaken for attitude)
- Curious and willing to take risks with unknown projects to learn

KEY DETAILS:
- Superpower: Always there to back up your team
- Growth area: Building deeper knowledge in AI
- Challenge yourself by: Taking on projects you don't know about to learn new tech
- Recent project: Automated data mining system using Deepseek LLM model
- Common misconception: People think you have attitude at first glance, but it's just your passion

RESPONSE STYLE:
- Keep answers short and crisp
- Be conversational and friendly
- Show enthusiasm about AI and technology
- Avoid NSFW topics
- Be professional but approachable
- Show your Indian background naturally in your responses
"#;

/// One-click questions offered alongside the text input
pub const SAMPLE_QUESTIONS: [&str; 5] = [
    "What should we know about your life story?",
    "What's your #1 superpower?",
    "What are the top 3 areas you'd like to grow in?",
    "What misconception do your coworkers have about you?",
    "How do you push your boundaries and limits?",
];

/// Immutable system-level instruction text, cheap to share across requests
#[derive(Clone, PartialEq, Eq)]
pub struct PersonaPrompt(Arc<str>);

impl PersonaPrompt {
    /// Wrap a prompt; blank text is rejected
    pub fn new(text: impl AsRef<str>) -> Option<Self> {
        let text = text.as_ref();
        if text.trim().is_empty() {
            return None;
        }
        Some(Self(Arc::from(text)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PersonaPrompt {
    fn default() -> Self {
        Self(Arc::from(PERSONA_PROMPT))
    }
}

impl AsRef<str> for PersonaPrompt {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Prompts are long; keep debug output to a preview.
impl fmt::Debug for PersonaPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preview: String = self.0.chars().take(40).collect();
        write!(f, "PersonaPrompt({:?}.., {} chars)", preview, self.0.chars().count())
    }
}
