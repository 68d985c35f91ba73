use crate::translator::TranslationError;

pub const LANGUAGES: &[&str] = &[
    "English",
    "Chinese",
    "Japanese",
    "Korean",
    "French",
    "German",
    "Spanish",
    "Italian",
    "Portuguese",
    "Russian",
    "Arabic",
];

pub const PENDING_TEXT: &str = "Translating...";

/// What the worker needs to run one translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationJob {
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
    pub credential: String,
    pub model: String,
}

/// Session-only state behind the two text panes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub source_lang: String,
    pub target_lang: String,
    pub source_text: String,
    pub target_text: String,
    busy: bool,
}

impl Default for Workspace {
    fn default() -> Self {
        Self {
            source_lang: "English".to_string(),
            target_lang: "Chinese".to_string(),
            source_text: String::new(),
            target_text: String::new(),
            busy: false,
        }
    }
}

impl Workspace {
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Texts follow the languages only once there is a translation to swap in.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.source_lang, &mut self.target_lang);
        if !self.target_text.is_empty() {
            std::mem::swap(&mut self.source_text, &mut self.target_text);
        }
    }

    pub fn clear(&mut self) {
        self.source_text.clear();
        self.target_text.clear();
    }

    /// Idle -> Busy. The credential and model are checked by the caller.
    pub fn begin(&mut self, credential: &str, model: &str) -> Result<TranslationJob, TranslationError> {
        if self.busy {
            return Err(TranslationError::Busy);
        }
        let text = self.source_text.trim();
        if text.is_empty() {
            return Err(TranslationError::EmptyInput);
        }
        let job = TranslationJob {
            text: text.to_string(),
            source_lang: self.source_lang.clone(),
            target_lang: self.target_lang.clone(),
            credential: credential.to_string(),
            model: model.to_string(),
        };
        self.busy = true;
        self.target_text = PENDING_TEXT.to_string();
        Ok(job)
    }

    /// Busy -> Idle.
    pub fn finish(&mut self, result: &Result<String, TranslationError>) {
        match result {
            Ok(text) => {
                self.busy = false;
                self.target_text = text.clone();
            }
            Err(_) => self.abort(),
        }
    }

    pub fn abort(&mut self) {
        self.busy = false;
        self.target_text.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> Workspace {
        Workspace {
            source_text: "Good morning".into(),
            target_text: "早上好".into(),
            ..Workspace::default()
        }
    }

    #[test]
    fn swap_exchanges_languages_and_texts() {
        let original = filled();
        let mut ws = original.clone();
        ws.swap();
        assert_eq!(ws.source_lang, "Chinese");
        assert_eq!(ws.target_lang, "English");
        assert_eq!(ws.source_text, "早上好");
        assert_eq!(ws.target_text, "Good morning");
        ws.swap();
        assert_eq!(ws, original);
    }

    #[test]
    fn swap_keeps_source_text_when_target_is_empty() {
        let mut ws = Workspace { source_text: "draft".into(), ..Workspace::default() };
        ws.swap();
        assert_eq!(ws.source_lang, "Chinese");
        assert_eq!(ws.source_text, "draft");
        assert!(ws.target_text.is_empty());
    }

    #[test]
    fn clear_empties_both_panes() {
        let mut ws = filled();
        ws.clear();
        assert!(ws.source_text.is_empty());
        assert!(ws.target_text.is_empty());
        assert_eq!(ws.source_lang, "English");
    }

    #[test]
    fn begin_and_finish_toggle_busy() {
        let mut ws = Workspace { source_text: "  hi  ".into(), ..Workspace::default() };
        let job = ws.begin("key", "openai/gpt-4o-mini").unwrap();
        assert_eq!(job.text, "hi");
        assert_eq!(job.target_lang, "Chinese");
        assert!(ws.is_busy());
        assert_eq!(ws.target_text, PENDING_TEXT);
        assert!(matches!(ws.begin("key", "m"), Err(TranslationError::Busy)));

        ws.finish(&Ok("你好".to_string()));
        assert!(!ws.is_busy());
        assert_eq!(ws.target_text, "你好");
    }

    #[test]
    fn failure_clears_target() {
        let mut ws = Workspace { source_text: "hi".into(), ..Workspace::default() };
        ws.begin("key", "m").unwrap();
        ws.finish(&Err(TranslationError::Remote { status: 500, reason: "Internal Server Error".into() }));
        assert!(!ws.is_busy());
        assert!(ws.target_text.is_empty());
    }

    #[test]
    fn blank_source_does_not_start() {
        let mut ws = Workspace { source_text: " \n ".into(), ..Workspace::default() };
        assert!(matches!(ws.begin("key", "m"), Err(TranslationError::EmptyInput)));
        assert!(!ws.is_busy());
        assert!(ws.target_text.is_empty());
    }
}
