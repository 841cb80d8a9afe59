// src/services/media.rs

//! Media detection inside a post container.

use scraper::{ElementRef, Selector};

use crate::error::{AppError, Result};

const AVATAR_HINTS: &[&str] = &["profile", "プロフィール", "avatar", "アバター", "icon", "アイコン"];

/// Finds post media while ignoring avatars and interface icons.
#[derive(Debug)]
pub struct MediaDetector {
    video: Selector,
    images: Selector,
    avatar_max_px: u32,
}

impl MediaDetector {
    pub fn new(avatar_max_px: u32) -> Result<Self> {
        let parse = |s: &str| Selector::parse(s).map_err(|e| AppError::selector(s, e));
        Ok(Self {
            video: parse("video")?,
            images: parse("img")?,
            avatar_max_px,
        })
    }

    /// Whether the container carries an image or video that is not an avatar or icon.
    pub fn has_media(&self, container: ElementRef<'_>) -> bool {
        if container.select(&self.video).next().is_some() {
            return true;
        }
        container
            .select(&self.images)
            .any(|img| !self.is_avatar_or_icon(img))
    }

    fn is_avatar_or_icon(&self, img: ElementRef<'_>) -> bool {
        let attr = |name: &str| img.value().attr(name).unwrap_or("").to_lowercase();
        let labels = format!("{} {}", attr("alt"), attr("class"));
        if AVATAR_HINTS.iter().any(|hint| labels.contains(hint)) {
            return true;
        }
        let dimension = |name: &str| {
            img.value()
                .attr(name)
                .and_then(|v| v.trim_end_matches("px").trim().parse::<u32>().ok())
        };
        match (dimension("width"), dimension("height")) {
            (Some(w), Some(h)) => w <= self.avatar_max_px && h <= self.avatar_max_px,
            (Some(side), None) | (None, Some(side)) => side <= self.avatar_max_px,
            (None, None) => false,
        }
    }
}
