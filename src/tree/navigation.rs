use crate::tree::sync::{RowId, TreeSyncEngine};

/// Rows reachable through a label: one per letter.
const LABEL_KEYS: std::ops::RangeInclusive<char> = 'a'..='z';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum NavState {
    #[default]
    Idle,
    AwaitingSecondKey,
}

/// Result of feeding one key to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavOutcome {
    /// The key belonged to quick navigation.
    pub consumed: bool,
    /// A labeled row was selected.
    pub selection_made: bool,
}

/// Two-key jump labels over the visible rows.
///
/// `show` labels up to 26 visible rows `a`..`z`. Pressing the major key and
/// then a letter selects the row carrying that letter.
#[derive(Debug, Clone)]
pub struct QuickNavController {
    major_key: char,
    state: NavState,
    labels: Vec<(char, RowId)>,
}

impl QuickNavController {
    pub fn new(major_key: char) -> Self {
        Self {
            major_key: major_key.to_ascii_lowercase(),
            state: NavState::Idle,
            labels: Vec::new(),
        }
    }

    pub fn major_key(&self) -> char {
        self.major_key
    }

    /// Whether the next key completes a jump.
    pub fn is_awaiting(&self) -> bool {
        self.state == NavState::AwaitingSecondKey
    }

    /// Label the visible rows of `engine`. A hidden tree gets no labels.
    pub fn show(&mut self, engine: &TreeSyncEngine, visible: bool) {
        self.hide();
        if !visible {
            return;
        }
        self.labels = LABEL_KEYS.zip(engine.visible_rows()).collect();
    }

    /// Drop every label.
    pub fn hide(&mut self) {
        self.labels.clear();
        self.state = NavState::Idle;
    }

    /// Display strings (`"<major><letter>"`) with their rows.
    pub fn labels(&self) -> impl Iterator<Item = (String, RowId)> + '_ {
        self.labels
            .iter()
            .map(move |(key, row)| (format!("{}{}", self.major_key, key), *row))
    }

    /// Display string of the label on `row`, if it has one.
    pub fn label_for(&self, row: RowId) -> Option<String> {
        self.labels
            .iter()
            .find(|(_, r)| *r == row)
            .map(|(key, _)| format!("{}{}", self.major_key, key))
    }

    pub fn handle_key(&mut self, engine: &mut TreeSyncEngine, key: char) -> NavOutcome {
        let key = key.to_ascii_lowercase();
        match self.state {
            NavState::AwaitingSecondKey => {
                self.state = NavState::Idle;
                let target = self
                    .labels
                    .iter()
                    .find(|(label, _)| *label == key)
                    .map(|(_, row)| *row)
                    .filter(|row| engine.row(*row).is_some());
                if let Some(row) = target {
                    engine.set_current(Some(row));
                }
                NavOutcome {
                    consumed: true,
                    selection_made: target.is_some(),
                }
            }
            NavState::Idle if key == self.major_key => {
                if !self.labels.is_empty() {
                    self.state = NavState::AwaitingSecondKey;
                }
                NavOutcome {
                    consumed: true,
                    selection_made: false,
                }
            }
            NavState::Idle => NavOutcome::default(),
        }
    }
}
