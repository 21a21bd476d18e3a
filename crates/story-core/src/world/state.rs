use contracts::FolderCounts;

use super::*;

/// Field-level patch for `update_email`. Only the mutable trio is
/// patchable; everything else on an email is fixed at creation.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailPatch {
    pub folder: Option<Folder>,
    pub read: Option<bool>,
    pub replied: Option<bool>,
}

impl GameWorld {
    /// Append an email. Inbox-bound arrivals emit `email_delivered`;
    /// player-sent mail is announced by the action that created it.
    pub(super) fn add_email(&mut self, email: Email) {
        let announce = email.folder != Folder::Sent;
        let details = json!({
            "email_id": email.id,
            "folder": email.folder,
            "role": email.role,
            "viewing_inbox": self.current_folder == Folder::Inbox,
        });
        self.emails.push(email);
        if announce {
            self.push_event(StoryEventKind::EmailDelivered, Some(details));
        }
    }

    /// Merge a patch into the matching email. Unknown ids are a sequencing
    /// bug upstream, so this stays a silent no-op rather than an error.
    pub fn update_email(&mut self, email_id: &str, patch: EmailPatch) {
        let Some(email) = self.emails.iter_mut().find(|email| email.id == email_id) else {
            return;
        };
        if let Some(folder) = patch.folder {
            email.folder = folder;
        }
        if let Some(read) = patch.read {
            email.read = read;
        }
        if let Some(replied) = patch.replied {
            email.replied = replied;
        }
    }

    pub fn get_email_by_id(&self, email_id: &str) -> Option<&Email> {
        self.emails.iter().find(|email| email.id == email_id)
    }

    /// Emails in a folder, unsorted. Display order (timestamp descending)
    /// is the caller's concern.
    pub fn get_emails_for_folder(&self, folder: Folder) -> Vec<&Email> {
        self.emails
            .iter()
            .filter(|email| email.folder == folder)
            .collect()
    }

    pub fn emails(&self) -> &[Email] {
        &self.emails
    }

    /// "Deleting" an email only ever moves it to trash; unknown ids no-op
    /// like any other update.
    pub fn delete_email(&mut self, email_id: &str) {
        self.update_email(
            email_id,
            EmailPatch {
                folder: Some(Folder::Trash),
                ..EmailPatch::default()
            },
        );
    }

    pub fn mark_read(&mut self, email_id: &str) {
        self.update_email(
            email_id,
            EmailPatch {
                read: Some(true),
                ..EmailPatch::default()
            },
        );
    }

    pub fn set_current_folder(&mut self, folder: Folder) {
        self.current_folder = folder;
    }

    /// Per-folder unread counts, recomputed from the email collection on
    /// every call so they can never drift from the source of truth.
    pub fn unread_counts(&self) -> FolderCounts {
        let mut counts = FolderCounts::default();
        for email in &self.emails {
            if !email.read {
                counts.bump(email.folder);
            }
        }
        counts
    }

    pub fn folder_counts(&self) -> FolderCounts {
        let mut counts = FolderCounts::default();
        for email in &self.emails {
            counts.bump(email.folder);
        }
        counts
    }
}
