//! View/edit/save/cancel cycle over a [`UserProfile`].

use super::{ProfileUpdater, UserProfile};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Failure,
}

/// User-facing outcome of a save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Failure,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == NoticeKind::Success
    }
}

/// Holds the saved profile and, while editing, a draft copy.
#[derive(Debug, Clone)]
pub struct ProfileEditor {
    saved: UserProfile,
    draft: Option<UserProfile>,
}

impl ProfileEditor {
    pub fn new(profile: UserProfile) -> Self {
        Self {
            saved: profile,
            draft: None,
        }
    }

    /// The profile as last saved.
    pub fn profile(&self) -> &UserProfile {
        &self.saved
    }

    pub fn is_editing(&self) -> bool {
        self.draft.is_some()
    }

    /// Enter edit mode. A draft already in progress is kept.
    pub fn edit(&mut self) -> &mut UserProfile {
        self.draft.get_or_insert_with(|| self.saved.clone())
    }

    pub fn draft(&self) -> Option<&UserProfile> {
        self.draft.as_ref()
    }

    /// Drop the draft and return to the saved profile.
    pub fn cancel(&mut self) {
        self.draft = None;
    }

    /// Hand the draft to `updater`. On failure the draft is kept so the user
    /// can retry.
    pub async fn save(&mut self, updater: &dyn ProfileUpdater) -> Notice {
        let Some(draft) = self.draft.as_mut() else {
            return Notice::failure("Aucune modification à enregistrer.");
        };
        // The email identifies the profile and is not editable.
        draft.email = self.saved.email.clone();

        if let Err(e) = draft.validate() {
            warn!(email = %draft.email, error = %e, "profile draft rejected");
            return Notice::failure("Impossible de mettre à jour le profil : informations incomplètes.");
        }

        match updater.update_profile(draft).await {
            Ok(stored) => {
                info!(email = %stored.email, "profile updated");
                self.saved = stored;
                self.draft = None;
                Notice::success("Profil mis à jour avec succès.")
            }
            Err(e) => {
                warn!(email = %draft.email, error = %e, "profile update failed");
                Notice::failure("Impossible de mettre à jour le profil. Veuillez réessayer.")
            }
        }
    }
}
