/// Ownership guard
///
/// Every mutating operation loads its resource, fails with `NotFound` when
/// it is absent, and only then compares the acting user with the owner.
use crate::{
    db::models::{Comment, Playlist, Tweet, Video},
    error::{HubError, HubResult},
};

/// Outcome of an ownership check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
}

impl Access {
    pub fn is_allowed(self) -> bool {
        self == Access::Allow
    }

    /// Map `Deny` to `HubError::Unauthorized`
    pub fn into_result(self, message: impl Into<String>) -> HubResult<()> {
        match self {
            Access::Allow => Ok(()),
            Access::Deny => Err(HubError::Unauthorized(message.into())),
        }
    }
}

/// Decide whether `actor_id` may mutate a resource owned by `owner_id`
pub fn authorize(actor_id: &str, owner_id: &str) -> Access {
    if actor_id == owner_id {
        Access::Allow
    } else {
        Access::Deny
    }
}

/// Resources that carry a single declared owner
pub trait Owned {
    /// Human-readable name used in error messages
    const KIND: &'static str;

    fn owner_id(&self) -> &str;
}

impl Owned for Video {
    const KIND: &'static str = "video";

    fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

impl Owned for Comment {
    const KIND: &'static str = "comment";

    fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

impl Owned for Tweet {
    const KIND: &'static str = "tweet";

    fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

impl Owned for Playlist {
    const KIND: &'static str = "playlist";

    fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

/// Resolve a looked-up resource and check that `actor_id` owns it
///
/// Absence wins over ownership: a missing resource is always `NotFound`.
pub fn require_owner<T: Owned>(actor_id: &str, resource: Option<T>) -> HubResult<T> {
    let resource =
        resource.ok_or_else(|| HubError::NotFound(format!("{} not found", T::KIND)))?;

    authorize(actor_id, resource.owner_id())
        .into_result(format!("only the owner can modify this {}", T::KIND))?;

    Ok(resource)
}

/// Transitive check for playlist membership changes
///
/// The actor must own the playlist, and the video must belong to the same
/// owner as the playlist. Owning the playlist alone is not enough.
pub fn require_same_owner(actor_id: &str, playlist: &Playlist, video: &Video) -> HubResult<()> {
    authorize(actor_id, &playlist.owner_id)
        .into_result("only the owner can modify this playlist")?;

    authorize(&playlist.owner_id, &video.owner_id)
        .into_result("playlist and video must belong to the same owner")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn playlist(owner: &str) -> Playlist {
        Playlist {
            id: "p1".to_string(),
            owner_id: owner.to_string(),
            name: "mix".to_string(),
            description: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn video(owner: &str) -> Video {
        Video {
            id: "v1".to_string(),
            owner_id: owner.to_string(),
            title: "T".to_string(),
            description: "D".to_string(),
            video_file: "http://cdn/v1.mp4".to_string(),
            thumbnail: String::new(),
            duration: 0.0,
            views: 0,
            is_published: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_authorize_is_plain_equality() {
        assert_eq!(authorize("a", "a"), Access::Allow);
        assert_eq!(authorize("a", "b"), Access::Deny);
        assert!(!authorize("", "a").is_allowed());
    }

    #[test]
    fn test_missing_resource_is_not_found_before_ownership() {
        let result = require_owner::<Video>("anyone", None);
        assert!(matches!(result, Err(HubError::NotFound(_))));
    }

    #[test]
    fn test_non_owner_is_unauthorized() {
        let result = require_owner("mallory", Some(video("alice")));
        assert!(matches!(result, Err(HubError::Unauthorized(_))));

        let owned = require_owner("alice", Some(video("alice"))).unwrap();
        assert_eq!(owned.id, "v1");
    }

    #[test]
    fn test_playlist_owner_cannot_add_foreign_video() {
        let result = require_same_owner("alice", &playlist("alice"), &video("bob"));
        assert!(matches!(result, Err(HubError::Unauthorized(_))));
    }

    #[test]
    fn test_non_owner_cannot_touch_playlist_even_with_matching_video() {
        let result = require_same_owner("mallory", &playlist("alice"), &video("alice"));
        assert!(matches!(result, Err(HubError::Unauthorized(_))));
    }

    #[test]
    fn test_same_owner_allowed() {
        assert!(require_same_owner("alice", &playlist("alice"), &video("alice")).is_ok());
    }
}
