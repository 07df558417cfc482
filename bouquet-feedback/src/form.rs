//! Form controller
//!
//! Owns the transient draft (including star-widget hover) and drives the
//! `Editing → Submitting → Submitted | Failed` state machine on top of the
//! submission pipeline. Nothing here is persisted.

use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::error::SubmitError;
use crate::pipeline::{SubmissionOutcome, SubmissionPipeline};
use crate::record::{Rating, Satisfaction};
use crate::schema::Draft;

/// Language of the rating labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Pl,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "pl" => Ok(Locale::Pl),
            other => Err(format!("unsupported locale '{}'", other)),
        }
    }
}

/// Caption shown under the stars
pub fn rating_label(rating: Rating, locale: Locale) -> &'static str {
    match (locale, rating.value()) {
        (Locale::Pl, 1) => "Bardzo niezadowolony/a",
        (Locale::Pl, 2) => "Niezadowolony/a",
        (Locale::Pl, 3) => "Neutralny/a",
        (Locale::Pl, 4) => "Zadowolony/a",
        (Locale::Pl, _) => "Bardzo zadowolony/a",
        (Locale::En, 1) => "Very dissatisfied",
        (Locale::En, 2) => "Dissatisfied",
        (Locale::En, 3) => "Neutral",
        (Locale::En, 4) => "Satisfied",
        (Locale::En, _) => "Very satisfied",
    }
}

/// In-progress form values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftState {
    pub subject_name: String,
    pub satisfied: Option<Satisfaction>,
    /// 0 = no star chosen
    pub rating: u8,
    /// Star under the pointer, 0 = none
    pub hover: u8,
    pub comment: String,
}

impl DraftState {
    /// Stars to highlight: the hovered star wins over the chosen one
    pub fn displayed_rating(&self) -> u8 {
        if self.hover > 0 {
            self.hover
        } else {
            self.rating
        }
    }

    pub fn to_draft(&self) -> Draft {
        Draft::new()
            .with("subjectName", self.subject_name.as_str())
            .with("satisfied", self.satisfied.map(|s| s.as_str()).unwrap_or(""))
            .with("rating", self.rating)
            .with("comment", self.comment.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum SubmissionState {
    Editing,
    Submitting,
    Submitted(SubmissionOutcome),
    /// Validation or schema failure; the draft is kept for correction
    Failed(SubmitError),
}

pub struct FormController {
    pipeline: Arc<SubmissionPipeline>,
    draft: DraftState,
    state: SubmissionState,
    locale: Locale,
}

impl FormController {
    pub fn new(pipeline: Arc<SubmissionPipeline>, locale: Locale) -> Self {
        Self {
            pipeline,
            draft: DraftState::default(),
            state: SubmissionState::Editing,
            locale,
        }
    }

    pub fn draft(&self) -> &DraftState {
        &self.draft
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    /// Inputs accept edits while editing or after a failed attempt
    pub fn is_editable(&self) -> bool {
        matches!(
            self.state,
            SubmissionState::Editing | SubmissionState::Failed(_)
        )
    }

    fn edit(&mut self, apply: impl FnOnce(&mut DraftState)) -> bool {
        if !self.is_editable() {
            debug!("Ignoring edit outside of editing state");
            return false;
        }
        apply(&mut self.draft);
        true
    }

    pub fn set_subject_name(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        self.edit(|d| d.subject_name = name)
    }

    pub fn set_satisfied(&mut self, satisfied: Satisfaction) -> bool {
        self.edit(|d| d.satisfied = Some(satisfied))
    }

    /// Choose a star; out-of-range values are reported by `submit`
    pub fn set_rating(&mut self, stars: u8) -> bool {
        self.edit(|d| d.rating = stars)
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) -> bool {
        let comment = comment.into();
        self.edit(|d| d.comment = comment)
    }

    pub fn hover_rating(&mut self, stars: u8) {
        self.draft.hover = stars.min(Rating::MAX);
    }

    pub fn clear_hover(&mut self) {
        self.draft.hover = 0;
    }

    pub fn displayed_rating(&self) -> u8 {
        self.draft.displayed_rating()
    }

    /// Label for the chosen rating, if any
    pub fn rating_label(&self) -> Option<&'static str> {
        Rating::new(self.draft.rating)
            .ok()
            .map(|r| rating_label(r, self.locale))
    }

    /// Run the pipeline on the current draft
    ///
    /// A no-op once submitted; call [`Self::submit_another`] first.
    pub async fn submit(&mut self) -> &SubmissionState {
        if !self.is_editable() {
            return &self.state;
        }

        self.state = SubmissionState::Submitting;
        let draft = self.draft.to_draft();

        self.state = match self.pipeline.submit(&draft).await {
            Ok(outcome) => {
                self.draft = DraftState::default();
                SubmissionState::Submitted(outcome)
            }
            Err(e) => SubmissionState::Failed(e),
        };
        &self.state
    }

    /// Leave the thank-you state with an empty form
    pub fn submit_another(&mut self) {
        self.draft = DraftState::default();
        self.state = SubmissionState::Editing;
    }

    /// Gates the export action
    pub async fn has_history(&self) -> bool {
        !self.pipeline.history().is_empty().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Field;
    use crate::history::HistoryStore;
    use crate::relay::NoopRelay;
    use crate::storage::MemoryKeyValueStore;

    async fn controller() -> FormController {
        let history = Arc::new(
            HistoryStore::open(Arc::new(MemoryKeyValueStore::new()), "clientFeedback")
                .await
                .unwrap(),
        );
        let pipeline = Arc::new(SubmissionPipeline::new(history, Arc::new(NoopRelay)));
        FormController::new(pipeline, Locale::Pl)
    }

    fn fill(form: &mut FormController) {
        form.set_subject_name("Spring Mix");
        form.set_satisfied(Satisfaction::Yes);
        form.set_rating(5);
        form.set_comment("Lovely");
    }

    #[test]
    fn test_rating_labels() {
        let five = Rating::new(5).unwrap();
        let one = Rating::new(1).unwrap();
        assert_eq!(rating_label(five, Locale::Pl), "Bardzo zadowolony/a");
        assert_eq!(rating_label(one, Locale::Pl), "Bardzo niezadowolony/a");
        assert_eq!(rating_label(five, Locale::En), "Very satisfied");
        assert_eq!(rating_label(Rating::new(3).unwrap(), Locale::En), "Neutral");
    }

    #[test]
    fn test_locale_parse() {
        assert_eq!("PL".parse::<Locale>(), Ok(Locale::Pl));
        assert_eq!("en".parse::<Locale>(), Ok(Locale::En));
        assert!("de".parse::<Locale>().is_err());
    }

    #[test]
    fn test_hover_overrides_displayed_rating() {
        let mut draft = DraftState {
            rating: 2,
            ..DraftState::default()
        };
        assert_eq!(draft.displayed_rating(), 2);
        draft.hover = 4;
        assert_eq!(draft.displayed_rating(), 4);
    }

    #[tokio::test]
    async fn test_successful_submit_clears_draft() {
        let mut form = controller().await;
        assert!(!form.has_history().await);
        fill(&mut form);
        assert_eq!(form.rating_label(), Some("Bardzo zadowolony/a"));

        let state = form.submit().await;
        assert!(matches!(state, SubmissionState::Submitted(o) if o.accepted));

        assert_eq!(form.draft(), &DraftState::default());
        assert!(!form.is_editable());
        assert!(form.has_history().await);
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_draft_editable() {
        let mut form = controller().await;
        form.set_subject_name("Spring Mix");
        form.set_satisfied(Satisfaction::No);
        form.set_comment("Too small");

        match form.submit().await {
            SubmissionState::Failed(SubmitError::Validation(e)) => {
                assert_eq!(e.fields(), vec![Field::Rating]);
            }
            other => panic!("expected validation failure, got {:?}", other),
        }

        assert!(form.is_editable());
        assert_eq!(form.draft().comment, "Too small");
        assert!(form.set_rating(3));
        assert!(matches!(form.submit().await, SubmissionState::Submitted(_)));
    }

    #[tokio::test]
    async fn test_edits_ignored_after_submit_until_submit_another() {
        let mut form = controller().await;
        fill(&mut form);
        form.submit().await;

        assert!(!form.set_comment("late edit"));
        assert_eq!(form.draft().comment, "");

        // A second submit in the thank-you state does nothing
        form.submit().await;
        assert_eq!(form.pipeline.history().len().await, 1);

        form.submit_another();
        assert!(matches!(form.state(), SubmissionState::Editing));
        fill(&mut form);
        form.submit().await;
        assert_eq!(form.pipeline.history().len().await, 2);
    }

    #[tokio::test]
    async fn test_out_of_range_rating_fails_validation() {
        let mut form = controller().await;
        fill(&mut form);
        form.set_rating(9);
        assert_eq!(form.rating_label(), None);

        match form.submit().await {
            SubmissionState::Failed(SubmitError::Validation(e)) => {
                assert_eq!(e.fields(), vec![Field::Rating]);
            }
            other => panic!("expected validation failure, got {:?}", other),
        }

        assert!(!form.has_history().await);
        assert_eq!(form.draft().rating, 9);
    }
}
