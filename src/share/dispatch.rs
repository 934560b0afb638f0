//! Platform hand-off for a rendered card: deep-link URLs for the
//! social platforms plus a save-to-disk export. Nothing here talks to
//! the network; the URLs are handed to the user to open.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use super::card::CardImage;
use super::record::ShareRecord;

pub const SITE_URL: &str = "https://digitspantest.online";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    X,
    Reddit,
    Facebook,
    LinkedIn,
}

impl Platform {
    pub const ALL: [Platform; 4] =
        [Platform::X, Platform::Reddit, Platform::Facebook, Platform::LinkedIn];

    pub fn label(self) -> &'static str {
        match self {
            Platform::X => "X (Twitter)",
            Platform::Reddit => "Reddit",
            Platform::Facebook => "Facebook",
            Platform::LinkedIn => "LinkedIn",
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("writing card: {0}")]
    Io(#[from] std::io::Error),
}

/// The boast line that accompanies a shared card.
pub fn share_text(record: &ShareRecord) -> String {
    format!(
        "I scored {} points ({}) on the Digit Span Test, ranking in the top {}%! Challenge your memory:",
        record.score,
        record.tier.as_str(),
        record.percentile
    )
}

/// Platform deep link carrying the share text and site URL.
/// X and Reddit take both; Facebook and LinkedIn only accept the URL.
pub fn share_url(platform: Platform, record: &ShareRecord) -> String {
    let text = urlencoding::encode(&share_text(record)).into_owned();
    let url = urlencoding::encode(SITE_URL).into_owned();
    match platform {
        Platform::X => {
            format!("https://twitter.com/intent/tweet?text={text}&url={url}")
        }
        Platform::Reddit => {
            format!("https://www.reddit.com/submit?title={text}&url={url}")
        }
        Platform::Facebook => {
            format!("https://www.facebook.com/sharer/sharer.php?u={url}")
        }
        Platform::LinkedIn => {
            format!("https://www.linkedin.com/sharing/share-offsite/?url={url}")
        }
    }
}

/// Write the card PNG under `dir`, named by its content hash.
/// Creates the directory if needed.
pub fn save_card(image: &CardImage, dir: &Path) -> Result<PathBuf, DispatchError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("digit-span-test-{}.png", image.hash));
    fs::write(&path, &image.png)?;
    info!(path = %path.display(), bytes = image.png.len(), "card saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::scoring::Tier;
    use crate::share::record::ChartData;

    fn record() -> ShareRecord {
        ShareRecord {
            score: 275,
            tier: Tier::Excellent,
            percentile: 70,
            error_rate: 10,
            completion_time: "2:30".into(),
            suggestions: vec![],
            chart: ChartData { memory: 55, attention: 45, speed: 68 },
        }
    }

    #[test]
    fn share_text_carries_score_tier_percentile() {
        let text = share_text(&record());
        assert!(text.contains("275 points"));
        assert!(text.contains("(Excellent)"));
        assert!(text.contains("top 70%"));
    }

    #[test]
    fn urls_are_percent_encoded() {
        let url = share_url(Platform::X, &record());
        assert!(url.starts_with("https://twitter.com/intent/tweet?text="));
        assert!(!url.contains(' '));
        assert!(url.contains("url=https%3A%2F%2Fdigitspantest.online"));

        let reddit = share_url(Platform::Reddit, &record());
        assert!(reddit.starts_with("https://www.reddit.com/submit?title="));
    }

    #[test]
    fn url_only_platforms_skip_the_text() {
        let fb = share_url(Platform::Facebook, &record());
        assert_eq!(
            fb,
            "https://www.facebook.com/sharer/sharer.php?u=https%3A%2F%2Fdigitspantest.online"
        );
        let li = share_url(Platform::LinkedIn, &record());
        assert!(li.starts_with("https://www.linkedin.com/sharing/share-offsite/?url="));
    }

    #[test]
    fn save_card_writes_hash_named_png() {
        let image = CardImage {
            png: b"\x89PNG\r\n\x1a\nfake".to_vec(),
            data_url: String::new(),
            hash: "deadbeef".into(),
        };
        let dir = std::env::temp_dir().join("digitspan-dispatch-test");
        let path = save_card(&image, &dir).unwrap();
        assert!(path.ends_with("digit-span-test-deadbeef.png"));
        assert_eq!(fs::read(&path).unwrap(), image.png);
        fs::remove_file(&path).unwrap();
    }
}
