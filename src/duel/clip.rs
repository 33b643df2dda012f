use super::Reject;
use crate::Knobs;
use crate::MAX_TRICK_DESCRIPTION;
use crate::Millis;
use serde::Deserialize;
use serde::Serialize;

/// A submitted take: trick description plus the uploaded clip reference.
/// Upload, transcoding and URL signing happen upstream; this service only
/// checks the contract at the door.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clip {
    pub description: String,
    pub video_url: String,
    pub duration_ms: Millis,
    pub thumbnail_url: Option<String>,
}

impl Clip {
    /// Entry validation: description 1..=500 chars, duration in (0, cap],
    /// URL on the trusted storage host.
    pub fn validate(&self, knobs: &Knobs, host: &str) -> Result<(), Reject> {
        if self.description.is_empty() || self.description.chars().count() > MAX_TRICK_DESCRIPTION {
            return Err(Reject::Validation(format!(
                "trick description must be 1-{} characters",
                MAX_TRICK_DESCRIPTION
            )));
        }
        if self.duration_ms <= 0 {
            return Err(Reject::Validation(String::from(
                "video duration must be positive",
            )));
        }
        if self.duration_ms > knobs.video_cap_ms {
            return Err(Reject::VideoTooLong);
        }
        if !trusted(&self.video_url, host) {
            return Err(Reject::Validation(format!(
                "video url must reference {}",
                host
            )));
        }
        if let Some(ref thumb) = self.thumbnail_url {
            if !trusted(thumb, host) {
                return Err(Reject::Validation(format!(
                    "thumbnail url must reference {}",
                    host
                )));
            }
        }
        Ok(())
    }
}

/// True when `url` is https on exactly `host`.
fn trusted(url: &str, host: &str) -> bool {
    url.strip_prefix("https://")
        .map(|rest| rest.split('/').next() == Some(host))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: &str = "media.example.com";

    fn clip(duration_ms: Millis) -> Clip {
        Clip {
            description: String::from("kickflip"),
            video_url: format!("https://{}/clips/abc.mp4", HOST),
            duration_ms,
            thumbnail_url: None,
        }
    }

    #[test]
    fn accepts_a_clean_clip() {
        assert!(clip(10_000).validate(&Knobs::default(), HOST).is_ok());
    }
    #[test]
    fn rejects_overlong_video() {
        assert_eq!(
            clip(20_000).validate(&Knobs::default(), HOST),
            Err(Reject::VideoTooLong)
        );
    }
    #[test]
    fn rejects_zero_duration() {
        assert!(matches!(
            clip(0).validate(&Knobs::default(), HOST),
            Err(Reject::Validation(_))
        ));
    }
    #[test]
    fn rejects_untrusted_hosts() {
        let mut c = clip(5_000);
        c.video_url = String::from("https://evil.example.net/clips/abc.mp4");
        assert!(matches!(
            c.validate(&Knobs::default(), HOST),
            Err(Reject::Validation(_))
        ));
        c.video_url = format!("http://{}/clips/abc.mp4", HOST);
        assert!(matches!(
            c.validate(&Knobs::default(), HOST),
            Err(Reject::Validation(_))
        ));
        c.video_url = format!("https://{}.evil.net/clips/abc.mp4", HOST);
        assert!(matches!(
            c.validate(&Knobs::default(), HOST),
            Err(Reject::Validation(_))
        ));
    }
    #[test]
    fn rejects_empty_and_oversized_descriptions() {
        let mut c = clip(5_000);
        c.description = String::new();
        assert!(c.validate(&Knobs::default(), HOST).is_err());
        c.description = "x".repeat(501);
        assert!(c.validate(&Knobs::default(), HOST).is_err());
        c.description = "x".repeat(500);
        assert!(c.validate(&Knobs::default(), HOST).is_ok());
    }
}
