use once_cell::sync::Lazy;
use regex::Regex;

use super::state::ProcessState;

/// Only this many trailing lines of captured output are considered.
pub const DEFAULT_OUTPUT_LINES: usize = 20;

/// A single output pattern and the state it implies.
#[derive(Debug, Clone)]
pub struct StatePattern {
    pub regex: Regex,
    pub state: ProcessState,
    /// Static weight; the highest matching weight wins.
    pub confidence: f32,
}

impl StatePattern {
    pub fn new(pattern: &str, state: ProcessState, confidence: f32) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            state,
            confidence,
        })
    }
}

/// Ordered table of output patterns.
///
/// On equal confidence, the entry that appears first wins.
#[derive(Debug, Clone)]
pub struct PatternTable {
    patterns: Vec<StatePattern>,
    window: usize,
}

static DEFAULT_PATTERNS: Lazy<Vec<StatePattern>> = Lazy::new(|| {
    vec![
        // Error dominates everything else it co-occurs with
        StatePattern::new(
            r"(?m)(Error:|Exception:|Failed:|panicked at|^FATAL)",
            ProcessState::Error,
            0.95,
        )
        .unwrap(),
        StatePattern::new(
            r"(?i)(waiting for input|\[y/n\]|\(y/n\)|press enter|do you want to)",
            ProcessState::Waiting,
            0.85,
        )
        .unwrap(),
        StatePattern::new(
            r"(?mi)(processing|loading|generating|analyzing|thinking\.{3}|working\.{3}|[⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏])",
            ProcessState::Busy,
            0.8,
        )
        .unwrap(),
        StatePattern::new(
            r"(?m)(claude>|ready for input|^\s*[$❯>]\s*$)",
            ProcessState::Idle,
            0.7,
        )
        .unwrap(),
    ]
});

impl PatternTable {
    pub fn new(patterns: Vec<StatePattern>) -> Self {
        Self {
            patterns,
            window: DEFAULT_OUTPUT_LINES,
        }
    }

    /// Consider a different number of trailing lines.
    pub fn with_window(mut self, lines: usize) -> Self {
        self.window = lines;
        self
    }

    pub fn patterns(&self) -> &[StatePattern] {
        &self.patterns
    }

    /// Classify captured pane content.
    pub fn analyze(&self, content: &str) -> ProcessState {
        let lines: Vec<&str> = content.lines().rev().take(self.window).collect();
        let recent_content = lines.into_iter().rev().collect::<Vec<_>>().join("\n");

        let mut best: Option<&StatePattern> = None;
        for pattern in &self.patterns {
            if !pattern.regex.is_match(&recent_content) {
                continue;
            }
            match best {
                Some(current) if current.confidence >= pattern.confidence => {}
                _ => best = Some(pattern),
            }
        }

        best.map(|p| p.state).unwrap_or(ProcessState::Unknown)
    }
}

impl Default for PatternTable {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERNS.clone())
    }
}

/// Classify output with the default table.
pub fn analyze_output(content: &str) -> ProcessState {
    static TABLE: Lazy<PatternTable> = Lazy::new(PatternTable::default);
    TABLE.analyze(content)
}
