//! Emotion-driven color palettes for theming collaborators.
//!
//! Only the selection rule lives here: a palette change is proposed when the
//! primary face settles on a new stable channel. Applying it is up to the
//! renderer.

use crate::pipeline::FrameResult;
use crate::types::Emotion;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub accent: &'static str,
    pub accent_secondary: &'static str,
    pub background: &'static str,
    pub glow: &'static str,
}

pub const DEFAULT_PALETTE: Palette = Palette {
    accent: "#6c5ce7",
    accent_secondary: "#a29bfe",
    background: "rgba(108, 92, 231, 0.1)",
    glow: "rgba(108, 92, 231, 0.3)",
};

pub fn palette_for(emotion: Emotion) -> &'static Palette {
    match emotion {
        Emotion::Neutral => &DEFAULT_PALETTE,
        Emotion::Happy => &Palette {
            accent: "#00cec9",
            accent_secondary: "#81ecec",
            background: "rgba(0, 206, 201, 0.1)",
            glow: "rgba(0, 206, 201, 0.3)",
        },
        Emotion::Sad => &Palette {
            accent: "#74b9ff",
            accent_secondary: "#a9d4ff",
            background: "rgba(116, 185, 255, 0.1)",
            glow: "rgba(116, 185, 255, 0.3)",
        },
        Emotion::Angry => &Palette {
            accent: "#ff7675",
            accent_secondary: "#ffb8b8",
            background: "rgba(255, 118, 117, 0.1)",
            glow: "rgba(255, 118, 117, 0.3)",
        },
        Emotion::Fearful => &Palette {
            accent: "#fdcb6e",
            accent_secondary: "#ffeaa7",
            background: "rgba(253, 203, 110, 0.1)",
            glow: "rgba(253, 203, 110, 0.3)",
        },
        Emotion::Disgusted => &Palette {
            accent: "#55efc4",
            accent_secondary: "#a8f0dc",
            background: "rgba(85, 239, 196, 0.1)",
            glow: "rgba(85, 239, 196, 0.3)",
        },
        Emotion::Surprised => &Palette {
            accent: "#e17055",
            accent_secondary: "#f0a694",
            background: "rgba(225, 112, 85, 0.1)",
            glow: "rgba(225, 112, 85, 0.3)",
        },
    }
}

/// Tracks which channel's palette is applied.
#[derive(Debug, Clone)]
pub struct ThemeSelector {
    enabled: bool,
    current: Option<Emotion>,
}

impl Default for ThemeSelector {
    fn default() -> Self {
        Self {
            enabled: true,
            current: None,
        }
    }
}

impl ThemeSelector {
    /// Returns the palette to switch to, if this frame warrants a change.
    pub fn observe(&mut self, result: &FrameResult) -> Option<&'static Palette> {
        if !self.enabled || !result.is_stable {
            return None;
        }
        let emotion = result.dominant_emotion?;
        if self.current == Some(emotion) {
            return None;
        }
        self.current = Some(emotion);
        Some(palette_for(emotion))
    }

    /// Disabling drops back to the default palette, which is returned.
    pub fn set_enabled(&mut self, enabled: bool) -> Option<&'static Palette> {
        self.enabled = enabled;
        if enabled {
            return None;
        }
        self.current = None;
        Some(&DEFAULT_PALETTE)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn current_palette(&self) -> &'static Palette {
        self.current.map(palette_for).unwrap_or(&DEFAULT_PALETTE)
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(emotion: Option<Emotion>, is_stable: bool) -> FrameResult {
        FrameResult {
            timestamp_ms: 0,
            face_count: 1,
            faces: Vec::new(),
            is_stable,
            dominant_emotion: emotion,
            confidence: 0.9,
            attention: true,
            is_blinking: false,
            is_yawning: false,
        }
    }

    #[test]
    fn test_unstable_frame_ignored() {
        let mut t = ThemeSelector::default();
        assert!(t.observe(&frame(Some(Emotion::Happy), false)).is_none());
        assert_eq!(t.current_palette(), &DEFAULT_PALETTE);
    }

    #[test]
    fn test_switches_once_per_channel() {
        let mut t = ThemeSelector::default();
        let p = t.observe(&frame(Some(Emotion::Happy), true)).unwrap();
        assert_eq!(p.accent, "#00cec9");
        assert!(t.observe(&frame(Some(Emotion::Happy), true)).is_none());
        let p = t.observe(&frame(Some(Emotion::Angry), true)).unwrap();
        assert_eq!(p.accent, "#ff7675");
    }

    #[test]
    fn test_no_dominant_keeps_palette() {
        let mut t = ThemeSelector::default();
        t.observe(&frame(Some(Emotion::Sad), true));
        assert!(t.observe(&frame(None, true)).is_none());
        assert_eq!(t.current_palette().accent, "#74b9ff");
    }

    #[test]
    fn test_disable_resets() {
        let mut t = ThemeSelector::default();
        t.observe(&frame(Some(Emotion::Sad), true));
        assert_eq!(t.set_enabled(false), Some(&DEFAULT_PALETTE));
        assert!(t.observe(&frame(Some(Emotion::Happy), true)).is_none());
        assert!(t.set_enabled(true).is_none());
        assert!(t.observe(&frame(Some(Emotion::Happy), true)).is_some());
    }
}
